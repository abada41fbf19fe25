//! # Wardrobe
//!
//! Local wardrobe store and look ownership scoring:
//! - SQLite-backed wardrobe of the user's garments
//! - Read-only access to the bundled catalog of looks and products
//! - Ownership ratio of a look and its display tier
//! - Photo housekeeping for wardrobe items

pub mod config;
pub mod error;
pub mod images;
pub mod logging;
pub mod state;

pub use error::{Error, Result};
pub use state::catalog::CatalogReader;
pub use state::data::{GarmentKey, Look, NewWardrobeItem, Product, WardrobeItem};
pub use state::library::Library;
pub use state::scoring::{score_looks, OwnershipScorer, OwnershipTier, ScoreOutcome};
pub use state::wardrobe::WardrobeStore;
