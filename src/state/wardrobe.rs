//! Wardrobe store: durable CRUD for the user's garments.
//!
//! The store only keeps the photo's path. Deleting the photo itself is up to
//! the caller (see [`crate::images`]).

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSqlError, Type};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::data::{normalize, GarmentKey, NewWardrobeItem, WardrobeItem};
use super::palette;
use crate::error::{Error, Result};

const ITEM_COLUMNS: &str = "id, color, type, image_path, created_at";

/// Wardrobe table accessor, borrowed from a [`super::library::Library`] or a
/// transaction on its connection
pub struct WardrobeStore<'a> {
    conn: &'a Connection,
}

impl<'a> WardrobeStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Persist a new item and return it with its assigned id.
    ///
    /// Type and color are normalized again here so nothing un-normalized
    /// reaches the table. A single INSERT either lands completely or not at all.
    pub fn insert(&self, item: &NewWardrobeItem) -> Result<WardrobeItem> {
        let kind = normalize(&item.kind);
        let color = normalize(&item.color);
        let image_path = item.image_path.trim();

        if kind.is_empty() {
            return Err(Error::InvalidInput("garment type is empty".to_string()));
        }
        if color.is_empty() {
            return Err(Error::InvalidInput("garment color is empty".to_string()));
        }
        if image_path.is_empty() {
            return Err(Error::InvalidInput("image path is empty".to_string()));
        }

        if !palette::is_known_type(&kind) {
            tracing::warn!("Garment type '{}' is outside the known vocabulary", kind);
        }
        if !palette::is_known_color(&color) {
            tracing::warn!("Color '{}' is outside the known palette", color);
        }

        let created_at = Utc::now().timestamp();
        self.conn.execute(
            "INSERT INTO wardrobe (color, type, image_path, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![color, kind, image_path, created_at],
        )?;
        let id = self.conn.last_insert_rowid();

        tracing::info!("👕 Added wardrobe item {} ({} / {})", id, kind, color);

        Ok(WardrobeItem {
            id,
            color,
            kind,
            image_path: image_path.to_string(),
            created_at: timestamp_to_datetime(created_at).unwrap_or_else(Utc::now),
        })
    }

    /// Every wardrobe item, oldest first (primary key order)
    pub fn fetch_all(&self) -> Result<Vec<WardrobeItem>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ITEM_COLUMNS} FROM wardrobe ORDER BY id"))?;
        let items = stmt
            .query_map([], item_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    /// Items matching the given type and/or color (normalized equality).
    /// `None` leaves that column unfiltered.
    pub fn fetch_filtered(&self, kind: Option<&str>, color: Option<&str>) -> Result<Vec<WardrobeItem>> {
        let kind = kind.map(normalize);
        let color = color.map(normalize);

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM wardrobe
             WHERE (?1 IS NULL OR type = ?1) AND (?2 IS NULL OR color = ?2)
             ORDER BY id"
        ))?;
        let items = stmt
            .query_map(params![kind, color], item_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    pub fn get(&self, id: i64) -> Result<Option<WardrobeItem>> {
        let item = self
            .conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM wardrobe WHERE id = ?1"),
                [id],
                item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    /// Remove an item by id.
    ///
    /// Deleting an id that is already gone is not an error; the returned flag
    /// tells whether a row was actually removed.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let removed = self.conn.execute("DELETE FROM wardrobe WHERE id = ?1", [id])?;
        if removed > 0 {
            tracing::info!("🗑️  Removed wardrobe item {}", id);
        } else {
            tracing::debug!("Wardrobe item {} already absent", id);
        }
        Ok(removed > 0)
    }

    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM wardrobe", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Normalized (type, color) key of every item, one entry per item
    pub fn keys(&self) -> Result<Vec<GarmentKey>> {
        let mut stmt = self.conn.prepare("SELECT type, color FROM wardrobe")?;
        let keys = stmt
            .query_map([], |row| {
                let kind: String = row.get(0)?;
                let color: String = row.get(1)?;
                Ok(GarmentKey::new(&kind, &color))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(keys)
    }
}

fn timestamp_to_datetime(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(seconds, 0)
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<WardrobeItem> {
    let seconds: i64 = row.get(4)?;
    let created_at = timestamp_to_datetime(seconds).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            Type::Integer,
            Box::new(FromSqlError::OutOfRange(seconds)),
        )
    })?;

    Ok(WardrobeItem {
        id: row.get(0)?,
        color: row.get(1)?,
        kind: row.get(2)?,
        image_path: row.get(3)?,
        created_at,
    })
}
