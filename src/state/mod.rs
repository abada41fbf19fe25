//! State management module
//!
//! This module handles all persisted state:
//! - Database connection and schema lifecycle (library.rs)
//! - Shared data structures (data.rs)
//! - The user's wardrobe (wardrobe.rs)
//! - Read-only bundled catalog of looks and products (catalog.rs)
//! - Ownership scoring of looks against the wardrobe (scoring.rs)

pub mod catalog;
pub mod data;
pub mod library;
pub mod palette;
pub mod scoring;
pub mod wardrobe;
