//! Shared data structures for the wardrobe and the bundled catalog
//!
//! These structs represent the data model that flows between
//! the database layer and whatever renders it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalize a free-form type or color value: trimmed and lower-cased.
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Matching key for ownership: the normalized (type, color) pair.
///
/// Two distinct products with the same type and color produce the same key,
/// so the scorer cannot tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GarmentKey {
    #[serde(rename = "type")]
    pub kind: String,
    pub color: String,
}

impl GarmentKey {
    pub fn new(kind: &str, color: &str) -> Self {
        Self {
            kind: normalize(kind),
            color: normalize(color),
        }
    }
}

/// A garment the user owns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WardrobeItem {
    /// Assigned by the store, never reused
    pub id: i64,
    pub color: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Relative path to the photo. The store never reads the bytes.
    pub image_path: String,
    pub created_at: DateTime<Utc>,
}

impl WardrobeItem {
    pub fn key(&self) -> GarmentKey {
        GarmentKey::new(&self.kind, &self.color)
    }
}

/// A wardrobe item that has not been persisted yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWardrobeItem {
    pub color: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub image_path: String,
}

impl NewWardrobeItem {
    /// Build a new item, normalizing type and color
    pub fn new(kind: &str, color: &str, image_path: impl Into<String>) -> Self {
        Self {
            color: normalize(color),
            kind: normalize(kind),
            image_path: image_path.into().trim().to_string(),
        }
    }
}

/// Outfit definition from the bundled catalog (read-only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Look {
    pub id: i64,
    /// Comma-separated product ids, exactly as stored in the catalog
    pub items: String,
}

impl Look {
    pub fn item_ids(&self) -> Vec<i64> {
        parse_item_ids(&self.items)
    }
}

/// Parse a look's comma-separated product list.
///
/// Whitespace around each entry is ignored, non-numeric tokens are dropped,
/// duplicates and order are preserved.
pub fn parse_item_ids(items: &str) -> Vec<i64> {
    items
        .split(',')
        .filter_map(|token| token.trim().parse::<i64>().ok())
        .collect()
}

/// Catalog garment (read-only). Any column may be null in the bundled data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub color: Option<String>,
    pub price: Option<f64>,
    pub store: Option<String>,
    pub url: Option<String>,
}

impl Product {
    /// Matching key, or None when type or color is missing or blank
    pub fn key(&self) -> Option<GarmentKey> {
        let key = GarmentKey::new(self.kind.as_deref()?, self.color.as_deref()?);
        if key.kind.is_empty() || key.color.is_empty() {
            return None;
        }
        Some(key)
    }
}
