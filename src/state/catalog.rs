//! Read-only queries against the bundled `looks` / `products` catalog.
//!
//! The catalog ships with the app and is never written. Each lookup comes in
//! two flavors: `try_*` returns the storage error, the plain variant logs it
//! and degrades to an empty result so a screen can show "no data" instead of
//! failing.

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OptionalExtension, Row};
use std::collections::HashMap;

use super::data::{GarmentKey, Look, Product};
use crate::error::Result;

/// Keeps `IN (...)` lists under SQLite's bound-parameter limit
const MAX_IDS_PER_QUERY: usize = 500;

pub struct CatalogReader<'a> {
    conn: &'a Connection,
}

impl<'a> CatalogReader<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn try_look(&self, look_id: i64) -> Result<Option<Look>> {
        let look = self
            .conn
            .query_row(
                "SELECT id, items FROM looks WHERE id = ?1",
                [look_id],
                |row| {
                    Ok(Look {
                        id: row.get(0)?,
                        items: text_column(row, 1).unwrap_or_default(),
                    })
                },
            )
            .optional()?;
        Ok(look)
    }

    /// Product ids of a look in listed order, duplicates kept.
    /// An absent look or an empty list gives an empty vector.
    pub fn try_item_ids(&self, look_id: i64) -> Result<Vec<i64>> {
        match self.try_look(look_id)? {
            Some(look) => {
                let ids = look.item_ids();
                if ids.is_empty() {
                    tracing::debug!("Look {} lists no usable product ids", look_id);
                }
                Ok(ids)
            }
            None => {
                tracing::debug!("Look {} not found in catalog", look_id);
                Ok(Vec::new())
            }
        }
    }

    pub fn get_item_ids(&self, look_id: i64) -> Vec<i64> {
        self.try_item_ids(look_id).unwrap_or_else(|e| {
            tracing::warn!("Failed to read items for look {}: {}", look_id, e);
            Vec::new()
        })
    }

    /// Products for the given ids, in the order requested, one entry per
    /// requested id. Ids without a product row are skipped.
    pub fn try_products(&self, product_ids: &[i64]) -> Result<Vec<Product>> {
        let mut found: HashMap<i64, Product> = HashMap::new();

        let mut unique = product_ids.to_vec();
        unique.sort_unstable();
        unique.dedup();

        for chunk in unique.chunks(MAX_IDS_PER_QUERY) {
            let placeholders = vec!["?"; chunk.len()].join(",");
            let sql = format!(
                "SELECT id, name, type, color, price, store, url FROM products WHERE id IN ({placeholders})"
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(chunk.iter()), product_from_row)?;
            for product in rows {
                let product = product?;
                found.insert(product.id, product);
            }
        }

        let products = product_ids
            .iter()
            .filter_map(|id| {
                let product = found.get(id).cloned();
                if product.is_none() {
                    tracing::warn!("Catalog has no product {}, skipping", id);
                }
                product
            })
            .collect();
        Ok(products)
    }

    /// Normalized (type, color) pair for each resolvable id.
    ///
    /// Duplicated ids yield duplicated pairs. Missing products and products
    /// with a null or blank type/color are skipped.
    pub fn try_type_color_pairs(&self, product_ids: &[i64]) -> Result<Vec<GarmentKey>> {
        let pairs = self
            .try_products(product_ids)?
            .into_iter()
            .filter_map(|product| {
                let key = product.key();
                if key.is_none() {
                    tracing::warn!("Product {} has no type/color, skipping", product.id);
                }
                key
            })
            .collect();
        Ok(pairs)
    }

    pub fn get_type_color_pairs(&self, product_ids: &[i64]) -> Vec<GarmentKey> {
        self.try_type_color_pairs(product_ids).unwrap_or_else(|e| {
            tracing::warn!("Failed to resolve {} products: {}", product_ids.len(), e);
            Vec::new()
        })
    }

    /// Full product rows making up a look, for the look detail screen
    pub fn products_for_look(&self, look_id: i64) -> Vec<Product> {
        let result = self
            .try_item_ids(look_id)
            .and_then(|ids| self.try_products(&ids));
        result.unwrap_or_else(|e| {
            tracing::warn!("Failed to load products for look {}: {}", look_id, e);
            Vec::new()
        })
    }

    /// Every look id in the catalog
    pub fn try_look_ids(&self) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare("SELECT id FROM looks ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    pub fn look_ids(&self) -> Vec<i64> {
        self.try_look_ids().unwrap_or_else(|e| {
            tracing::warn!("Failed to list looks: {}", e);
            Vec::new()
        })
    }
}

/// Read a column as text whatever its storage class. The bundled data is not
/// consistently typed.
fn text_column(row: &Row<'_>, idx: usize) -> Option<String> {
    match row.get_ref(idx).ok()? {
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Integer(value) => Some(value.to_string()),
        ValueRef::Real(value) => Some(value.to_string()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    }
}

fn number_column(row: &Row<'_>, idx: usize) -> Option<f64> {
    match row.get_ref(idx).ok()? {
        ValueRef::Integer(value) => Some(value as f64),
        ValueRef::Real(value) => Some(value),
        ValueRef::Text(bytes) => std::str::from_utf8(bytes).ok()?.trim().parse().ok(),
        ValueRef::Null | ValueRef::Blob(_) => None,
    }
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        name: text_column(row, 1),
        kind: text_column(row, 2),
        color: text_column(row, 3),
        price: number_column(row, 4),
        store: text_column(row, 5),
        url: text_column(row, 6),
    })
}
