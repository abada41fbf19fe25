//! Ownership scoring: what fraction of a look the user already owns.
//!
//! A look's products are reduced to a multiset of normalized (type, color)
//! keys and intersected with the wardrobe's multiset. Product identity never
//! matters, only the key.

use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::catalog::CatalogReader;
use super::data::GarmentKey;
use super::library::Library;
use super::wardrobe::WardrobeStore;
use crate::error::Result;

/// Display tier for an ownership ratio.
///
/// Selection picks the largest threshold not above the ratio, so 0.6 lands
/// on `Half`, not `Full`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipTier {
    None,
    Third,
    Half,
    Full,
}

impl OwnershipTier {
    /// Tiers from highest threshold to lowest
    pub const ALL: [OwnershipTier; 4] = [
        OwnershipTier::Full,
        OwnershipTier::Half,
        OwnershipTier::Third,
        OwnershipTier::None,
    ];

    pub fn threshold(self) -> f64 {
        match self {
            OwnershipTier::Full => 1.0,
            OwnershipTier::Half => 0.5,
            OwnershipTier::Third => 1.0 / 3.0,
            OwnershipTier::None => 0.0,
        }
    }

    /// Bucket a ratio. Anything below zero, or NaN, is `None`.
    pub fn from_ratio(ratio: f64) -> Self {
        Self::ALL
            .into_iter()
            .find(|tier| ratio >= tier.threshold())
            .unwrap_or(OwnershipTier::None)
    }
}

/// Result of scoring one look.
///
/// `Degraded` means a storage or catalog read failed and the score could not
/// be computed; its ratio still reads as 0.0 for display, but callers can
/// tell it apart from a genuine zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScoreOutcome {
    Scored { matched: usize, total: usize },
    Degraded { reason: String },
}

impl ScoreOutcome {
    /// Fraction of the look owned, in [0.0, 1.0]
    pub fn ratio(&self) -> f64 {
        match self {
            ScoreOutcome::Scored { total: 0, .. } => 0.0,
            ScoreOutcome::Scored { matched, total } => *matched as f64 / *total as f64,
            ScoreOutcome::Degraded { .. } => 0.0,
        }
    }

    pub fn tier(&self) -> OwnershipTier {
        OwnershipTier::from_ratio(self.ratio())
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ScoreOutcome::Degraded { .. })
    }
}

/// Size of the multiset intersection of `required` and `owned`.
///
/// Each owned garment can satisfy at most one required slot, so a look
/// needing two black t-shirts against a wardrobe with one scores 1.
pub fn count_matches(required: &[GarmentKey], owned: &[GarmentKey]) -> usize {
    let mut remaining: HashMap<&GarmentKey, usize> = HashMap::new();
    for key in required {
        *remaining.entry(key).or_insert(0) += 1;
    }

    owned
        .iter()
        .filter(|key| match remaining.get_mut(key) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        })
        .count()
}

pub struct OwnershipScorer<'a> {
    conn: &'a Connection,
}

impl<'a> OwnershipScorer<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Score a look against the wardrobe. Never fails: any read error is
    /// logged and reported as [`ScoreOutcome::Degraded`].
    pub fn score_ownership(&self, look_id: i64) -> ScoreOutcome {
        match self.try_score(look_id) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("Scoring look {} degraded: {}", look_id, e);
                ScoreOutcome::Degraded {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Score a look, surfacing read errors.
    ///
    /// The catalog lookup and the wardrobe fetch share one read transaction,
    /// so a concurrent insert or delete is seen entirely or not at all.
    pub fn try_score(&self, look_id: i64) -> Result<ScoreOutcome> {
        let tx = self.conn.unchecked_transaction()?;

        let catalog = CatalogReader::new(&tx);
        let ids = catalog.try_item_ids(look_id)?;
        if ids.is_empty() {
            return Ok(ScoreOutcome::Scored { matched: 0, total: 0 });
        }

        let required = catalog.try_type_color_pairs(&ids)?;
        if required.is_empty() {
            return Ok(ScoreOutcome::Scored { matched: 0, total: 0 });
        }

        let owned = WardrobeStore::new(&tx).keys()?;
        tx.commit()?;

        let matched = count_matches(&required, &owned);
        tracing::debug!(
            "Look {}: {}/{} items owned ({} in wardrobe)",
            look_id,
            matched,
            required.len(),
            owned.len()
        );

        Ok(ScoreOutcome::Scored {
            matched,
            total: required.len(),
        })
    }
}

/// Upper bound on reader connections a batch keeps open at once
pub const MAX_SCORING_READERS: usize = 8;

/// Score many looks concurrently, e.g. for a list screen.
///
/// The ids are split into at most [`MAX_SCORING_READERS`] contiguous chunks.
/// Each chunk runs on one blocking thread with one read-only connection,
/// because a `Connection` cannot be shared across threads, so a batch of any
/// size holds a bounded number of file handles. Results come back in the
/// order of `look_ids`.
pub async fn score_looks(
    db_path: PathBuf,
    look_ids: Vec<i64>,
    busy_timeout: Duration,
) -> Vec<(i64, ScoreOutcome)> {
    if look_ids.is_empty() {
        return Vec::new();
    }

    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, MAX_SCORING_READERS);
    let chunk_size = look_ids.len().div_ceil(workers);

    let handles: Vec<_> = look_ids
        .chunks(chunk_size)
        .map(|chunk| {
            let chunk = chunk.to_vec();
            let db_path = db_path.clone();
            let handle = tokio::task::spawn_blocking({
                let chunk = chunk.clone();
                move || score_chunk(&db_path, &chunk, busy_timeout)
            });
            (chunk, handle)
        })
        .collect();

    let mut results = Vec::with_capacity(look_ids.len());
    for (chunk, handle) in handles {
        match handle.await {
            Ok(scored) => results.extend(scored),
            Err(e) => {
                let reason = format!("Task join error: {}", e);
                results.extend(chunk.into_iter().map(|look_id| {
                    (look_id, ScoreOutcome::Degraded { reason: reason.clone() })
                }));
            }
        }
    }
    results
}

/// Score a run of looks over a single reader connection
fn score_chunk(
    db_path: &Path,
    look_ids: &[i64],
    busy_timeout: Duration,
) -> Vec<(i64, ScoreOutcome)> {
    match Library::open_reader(db_path, busy_timeout) {
        Ok(library) => {
            let scorer = library.scorer();
            look_ids
                .iter()
                .map(|&look_id| (look_id, scorer.score_ownership(look_id)))
                .collect()
        }
        Err(e) => {
            tracing::warn!("Could not open reader for {} looks: {}", look_ids.len(), e);
            let reason = e.to_string();
            look_ids
                .iter()
                .map(|&look_id| (look_id, ScoreOutcome::Degraded { reason: reason.clone() }))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::catalog::tests::seed_catalog;
    use crate::state::data::NewWardrobeItem;
    use crate::state::library::DEFAULT_BUSY_TIMEOUT;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn library() -> Library {
        let library = Library::open_in_memory().unwrap();
        seed_catalog(library.connection());
        library
    }

    fn own(library: &Library, kind: &str, color: &str) -> i64 {
        library
            .wardrobe()
            .insert(&NewWardrobeItem::new(kind, color, format!("{kind}.jpg")))
            .unwrap()
            .id
    }

    #[test]
    fn test_tier_selection() {
        assert_eq!(OwnershipTier::from_ratio(1.0), OwnershipTier::Full);
        assert_eq!(OwnershipTier::from_ratio(0.6), OwnershipTier::Half);
        assert_eq!(OwnershipTier::from_ratio(0.5), OwnershipTier::Half);
        assert_eq!(OwnershipTier::from_ratio(2.0 / 3.0), OwnershipTier::Half);
        assert_eq!(OwnershipTier::from_ratio(1.0 / 3.0), OwnershipTier::Third);
        assert_eq!(OwnershipTier::from_ratio(0.25), OwnershipTier::None);
        assert_eq!(OwnershipTier::from_ratio(0.0), OwnershipTier::None);
        assert_eq!(OwnershipTier::from_ratio(f64::NAN), OwnershipTier::None);
    }

    #[test]
    fn test_count_matches_is_multiset_intersection() {
        let tee = GarmentKey::new("t-shirt", "black");
        let jeans = GarmentKey::new("jeans", "blue");

        assert_eq!(count_matches(&[tee.clone(), tee.clone()], &[tee.clone()]), 1);
        assert_eq!(
            count_matches(&[tee.clone(), tee.clone()], &[tee.clone(), tee.clone(), tee.clone()]),
            2
        );
        assert_eq!(count_matches(&[tee.clone(), jeans.clone()], &[jeans.clone()]), 1);
        assert_eq!(count_matches(&[], &[tee.clone()]), 0);
        assert_eq!(count_matches(&[tee], &[]), 0);
    }

    #[test]
    fn test_partial_look() {
        let library = library();
        own(&library, "shirt", "blue");
        own(&library, "shoes", "white");

        let outcome = library.scorer().score_ownership(5);
        assert_eq!(outcome, ScoreOutcome::Scored { matched: 2, total: 3 });
        assert!((outcome.ratio() - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(outcome.tier(), OwnershipTier::Half);
    }

    #[test]
    fn test_empty_look_scores_zero() {
        let library = library();
        own(&library, "shirt", "blue");

        for look_id in [6, 9, 404] {
            let outcome = library.scorer().score_ownership(look_id);
            assert_eq!(outcome.ratio(), 0.0);
            assert!(!outcome.is_degraded());
        }
    }

    #[test]
    fn test_duplicate_requirements_need_distinct_items() {
        let library = library();
        own(&library, "t-shirt", "black");
        assert_eq!(library.scorer().score_ownership(8).ratio(), 0.5);

        own(&library, "T-Shirt", " Black ");
        assert_eq!(library.scorer().score_ownership(8).ratio(), 1.0);

        own(&library, "t-shirt", "black");
        assert_eq!(library.scorer().score_ownership(8).ratio(), 1.0);
    }

    #[test]
    fn test_normalized_matching() {
        let library = library();
        // product 11 is stored as ('jeans', ' blue ')
        own(&library, " JEANS", "Blue");
        let outcome = library.scorer().score_ownership(5);
        assert_eq!(outcome, ScoreOutcome::Scored { matched: 1, total: 3 });
    }

    #[test]
    fn test_unresolvable_products_are_skipped() {
        let library = library();
        own(&library, "shoes", "white");
        own(&library, "shirt", "blue");

        // look 7 lists 12, 99 (missing), 13 (null type), 10
        let outcome = library.scorer().score_ownership(7);
        assert_eq!(outcome, ScoreOutcome::Scored { matched: 2, total: 2 });
        assert_eq!(outcome.tier(), OwnershipTier::Full);
    }

    #[test]
    fn test_scoring_is_idempotent_and_bounded() {
        let library = library();
        own(&library, "shirt", "blue");
        own(&library, "shirt", "blue");
        own(&library, "jeans", "blue");

        for look_id in library.catalog().look_ids() {
            let first = library.scorer().score_ownership(look_id);
            let second = library.scorer().score_ownership(look_id);
            assert_eq!(first, second);
            assert!((0.0..=1.0).contains(&first.ratio()));
        }
    }

    #[test]
    fn test_missing_catalog_is_degraded_not_zero() {
        let library = Library::open_in_memory().unwrap();
        own(&library, "shirt", "blue");

        let outcome = library.scorer().score_ownership(5);
        assert!(outcome.is_degraded());
        assert_eq!(outcome.ratio(), 0.0);
        assert_eq!(outcome.tier(), OwnershipTier::None);
    }

    #[test]
    fn test_outcome_serializes_with_status() {
        let json = serde_json::to_value(ScoreOutcome::Scored { matched: 1, total: 2 }).unwrap();
        assert_eq!(json["status"], "scored");
        assert_eq!(json["matched"], 1);
    }

    #[tokio::test]
    async fn test_score_looks_concurrently() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("app.db");

        let library = Library::open(&db_path, DEFAULT_BUSY_TIMEOUT).unwrap();
        seed_catalog(library.connection());
        own(&library, "shirt", "blue");
        own(&library, "shoes", "white");

        let results = score_looks(db_path.clone(), vec![5, 6, 8, 5], DEFAULT_BUSY_TIMEOUT).await;
        let ids: Vec<i64> = results.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![5, 6, 8, 5]);

        assert_eq!(results[0].1, ScoreOutcome::Scored { matched: 2, total: 3 });
        assert_eq!(results[1].1.ratio(), 0.0);
        assert_eq!(results[2].1, ScoreOutcome::Scored { matched: 0, total: 2 });
        assert_eq!(results[3].1, results[0].1);
    }

    #[tokio::test]
    async fn test_score_looks_with_missing_database_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("absent.db");

        let results = score_looks(db_path, vec![1], DEFAULT_BUSY_TIMEOUT).await;
        assert!(results[0].1.is_degraded());
    }

    #[tokio::test]
    async fn test_score_looks_large_batch_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("app.db");

        let library = Library::open(&db_path, DEFAULT_BUSY_TIMEOUT).unwrap();
        seed_catalog(library.connection());
        // Uneven count so the last chunk is short
        let look_ids: Vec<i64> = (1_000..4_001).collect();
        {
            let tx = library.connection().unchecked_transaction().unwrap();
            {
                let mut stmt = tx.prepare("INSERT INTO looks (id, items) VALUES (?1, '10')").unwrap();
                for look_id in &look_ids {
                    stmt.execute([look_id]).unwrap();
                }
            }
            tx.commit().unwrap();
        }
        own(&library, "shirt", "blue");

        let results = score_looks(db_path.clone(), look_ids.clone(), DEFAULT_BUSY_TIMEOUT).await;

        assert_eq!(results.len(), look_ids.len());
        let ids: Vec<i64> = results.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, look_ids);
        for (look_id, outcome) in &results {
            assert_eq!(
                *outcome,
                ScoreOutcome::Scored { matched: 1, total: 1 },
                "look {look_id}"
            );
        }
    }

    #[tokio::test]
    async fn test_score_looks_empty_batch() {
        let dir = tempfile::tempdir().unwrap();
        let results = score_looks(dir.path().join("app.db"), Vec::new(), DEFAULT_BUSY_TIMEOUT).await;
        assert!(results.is_empty());
    }

    #[test]
    fn test_readers_see_whole_writes_during_churn() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("app.db");

        let library = Library::open(&db_path, DEFAULT_BUSY_TIMEOUT).unwrap();
        seed_catalog(library.connection());

        let done = Arc::new(AtomicBool::new(false));

        // Adds and removes the shirt and jeans of look 5 together, so a
        // reader must see both of them or neither.
        let writer = {
            let db_path = db_path.clone();
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                let library = Library::open(&db_path, DEFAULT_BUSY_TIMEOUT).unwrap();
                for _ in 0..150 {
                    let tx = library.connection().unchecked_transaction().unwrap();
                    let ids = {
                        let store = WardrobeStore::new(&tx);
                        [
                            store.insert(&NewWardrobeItem::new("shirt", "blue", "s.jpg")).unwrap().id,
                            store.insert(&NewWardrobeItem::new("jeans", "blue", "j.jpg")).unwrap().id,
                        ]
                    };
                    tx.commit().unwrap();

                    let tx = library.connection().unchecked_transaction().unwrap();
                    {
                        let store = WardrobeStore::new(&tx);
                        for id in ids {
                            assert!(store.delete(id).unwrap());
                        }
                    }
                    tx.commit().unwrap();
                }
                done.store(true, Ordering::SeqCst);
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let db_path = db_path.clone();
                let done = Arc::clone(&done);
                std::thread::spawn(move || {
                    let reader = Library::open_reader(&db_path, DEFAULT_BUSY_TIMEOUT).unwrap();
                    let mut seen = 0;
                    loop {
                        let finished = done.load(Ordering::SeqCst);
                        let outcome = reader.scorer().try_score(5).unwrap();
                        match outcome {
                            ScoreOutcome::Scored { matched, total } => {
                                assert_eq!(total, 3);
                                assert!(matched <= total);
                                assert!(matched == 0 || matched == 2, "torn read: {matched}/3");
                            }
                            other => panic!("unexpected outcome {other:?}"),
                        }
                        seen += 1;
                        if finished {
                            break;
                        }
                    }
                    seen
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            assert!(reader.join().unwrap() > 0);
        }
        assert_eq!(library.wardrobe().count().unwrap(), 0);
    }
}
