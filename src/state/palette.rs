//! Known color palette and garment vocabulary
//!
//! Wardrobe values are free-form, but the capture screen offers these
//! choices, so anything else usually points at a typo or a stale client.

use super::data::normalize;

/// Colors offered when confirming a captured garment
pub const PALETTE: &[&str] = &[
    "black",
    "white",
    "gray",
    "blue",
    "light blue",
    "green",
    "yellow",
    "beige",
    "brown",
    "purple",
    "red",
    "pink",
    "orange",
];

/// Garment types used by the catalog
pub const GARMENT_TYPES: &[&str] = &[
    "outerwear",
    "t-shirt",
    "shirt",
    "sweater",
    "trousers",
    "jeans",
    "skirt",
    "dress",
    "shoes",
    "accessory",
];

pub fn is_known_color(color: &str) -> bool {
    let color = normalize(color);
    PALETTE.contains(&color.as_str())
}

pub fn is_known_type(kind: &str) -> bool {
    let kind = normalize(kind);
    GARMENT_TYPES.contains(&kind.as_str())
}
