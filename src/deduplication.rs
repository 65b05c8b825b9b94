// 🔍 Duplicate Detection - flag new items that likely repeat a recent movement
// Keyword similarity ranks candidates; a quantity gate keeps only comparable amounts

use crate::cache::LookupCache;
use crate::config::IntakeConfig;
use crate::keywords::KeywordExtractor;
use crate::movement::{BatchItem, ParseResult};
use crate::similarity::SimilarityScorer;
use crate::store::{HistoricalMovement, MovementHistoryStore};
use crate::units::QuantityNormalizer;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

// ============================================================================
// MATCH TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Same normalized name
    Exact,

    /// Keyword overlap above the threshold
    Similar,
}

// ============================================================================
// RESULTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PotentialDuplicate {
    pub candidate_name: String,
    pub candidate_quantity: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_unit: Option<String>,

    /// Similarity score (0.0 - 1.0)
    pub similarity_score: f64,

    pub source_movement_id: String,
    pub timestamp: DateTime<Utc>,
    pub match_type: MatchType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Relative quantity difference to the queried item (0.07 = 7%)
    pub quantity_difference: f64,
}

impl PotentialDuplicate {
    fn from_history(movement: &HistoricalMovement, score: f64, match_type: MatchType) -> Self {
        PotentialDuplicate {
            candidate_name: movement.name.clone(),
            candidate_quantity: movement.quantity,
            candidate_unit: movement.unit.clone(),
            similarity_score: score,
            source_movement_id: movement.id.clone(),
            timestamp: movement.timestamp,
            match_type,
            location: movement.location.clone(),
            category: movement.category.clone(),
            user: movement.user.clone(),
            quantity_difference: 0.0,
        }
    }
}

/// Candidates found for one queried entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDuplicates {
    pub entry_index: usize,
    pub item_name: String,
    pub quantity: f64,
    pub candidates: Vec<PotentialDuplicate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateDetectionResult {
    pub has_duplicates: bool,

    /// All candidates of all entries, score descending
    pub candidates: Vec<PotentialDuplicate>,

    pub requires_confirmation: bool,

    /// Only entries that have at least one candidate
    #[serde(default)]
    pub entries: Vec<EntryDuplicates>,
}

impl DuplicateDetectionResult {
    pub fn empty() -> Self {
        DuplicateDetectionResult {
            has_duplicates: false,
            candidates: Vec::new(),
            requires_confirmation: false,
            entries: Vec::new(),
        }
    }

    fn from_entries(entries: Vec<EntryDuplicates>) -> Self {
        let mut candidates: Vec<PotentialDuplicate> = entries
            .iter()
            .flat_map(|e| e.candidates.iter().cloned())
            .collect();
        sort_by_score(&mut candidates);

        let has_duplicates = !candidates.is_empty();
        DuplicateDetectionResult {
            has_duplicates,
            candidates,
            requires_confirmation: has_duplicates,
            entries,
        }
    }
}

/// Score descending; stable, so equal scores keep store (recency) order
fn sort_by_score(candidates: &mut [PotentialDuplicate]) {
    candidates.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
}

/// Scored (pre quantity gate) candidates per normalized query name
pub type CandidateCache = LookupCache<Vec<PotentialDuplicate>>;

/// Recent history, fetched lazily and at most once per call
#[derive(Debug, Default)]
enum HistorySlot {
    #[default]
    NotFetched,
    Fetched(Vec<HistoricalMovement>),
    Unavailable,
}

// ============================================================================
// DETECTION SERVICE
// ============================================================================

pub struct DuplicateDetectionService<S> {
    store: S,

    /// Minimum similarity for a candidate (default: 0.7)
    pub similarity_threshold: f64,

    /// Relative quantity difference still "similar" (default: 0.10)
    pub quantity_tolerance: f64,

    /// How far back history is consulted (default: 7 days)
    pub lookback: Duration,

    cache: Option<Arc<CandidateCache>>,
}

impl<S: MovementHistoryStore> DuplicateDetectionService<S> {
    /// Create service with default thresholds and no cache
    pub fn new(store: S) -> Self {
        DuplicateDetectionService {
            store,
            similarity_threshold: 0.7,
            quantity_tolerance: 0.1,
            lookback: Duration::hours(24 * 7),
            cache: None,
        }
    }

    /// Thresholds from config; a cache is built when enabled
    pub fn from_config(store: S, config: &IntakeConfig) -> Self {
        let detection = &config.detection;
        DuplicateDetectionService {
            store,
            similarity_threshold: detection.similarity_threshold,
            quantity_tolerance: detection.quantity_tolerance,
            lookback: Duration::hours(detection.lookback_hours),
            cache: CandidateCache::from_config(&config.cache).map(Arc::new),
        }
    }

    pub fn with_cache(mut self, cache: Arc<CandidateCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Candidates for one item, scored ≥ threshold and passing the quantity gate
    pub async fn find_candidates(&self, name: &str, quantity: f64) -> Vec<PotentialDuplicate> {
        let mut history = HistorySlot::default();
        let scored = self.scored_candidates(name, &mut history).await;
        self.apply_quantity_gate(name, quantity, scored)
    }

    /// Check every entry; history is fetched at most once per call
    pub async fn check_batch(&self, entries: &[BatchItem]) -> DuplicateDetectionResult {
        let mut history = HistorySlot::default();
        let mut found = Vec::new();

        for (index, entry) in entries.iter().enumerate() {
            let scored = self.scored_candidates(&entry.name, &mut history).await;
            let candidates = self.apply_quantity_gate(&entry.name, entry.quantity, scored);

            if !candidates.is_empty() {
                found.push(EntryDuplicates {
                    entry_index: index,
                    item_name: entry.name.clone(),
                    quantity: entry.quantity,
                    candidates,
                });
            }
        }

        let result = DuplicateDetectionResult::from_entries(found);
        info!(
            entries = entries.len(),
            flagged = result.entries.len(),
            candidates = result.candidates.len(),
            "duplicate check complete"
        );
        result
    }

    /// All items of a parse result, in batch order
    pub async fn check_parse_result(&self, result: &ParseResult) -> DuplicateDetectionResult {
        let items: Vec<BatchItem> = result.items().map(|(_, item)| item.clone()).collect();
        self.check_batch(&items).await
    }

    /// Drop cached lookups that could involve `name` (call after its stock changes)
    pub fn invalidate_item(&self, name: &str) -> usize {
        let Some(cache) = &self.cache else {
            return 0;
        };

        let removed = cache.invalidate_where(|key| {
            SimilarityScorer::score(key, name) > 0.0 || SimilarityScorer::score(name, key) > 0.0
        });
        debug!(item = name, removed, "invalidated cached duplicate lookups");
        removed
    }

    // ------------------------------------------------------------------------

    /// Name-scored candidates (no quantity gate), from cache or history
    async fn scored_candidates(
        &self,
        name: &str,
        history: &mut HistorySlot,
    ) -> Vec<PotentialDuplicate> {
        let key = KeywordExtractor::normalize(name);

        if let Some(cached) = self.cache.as_ref().and_then(|c| c.get(&key)) {
            debug!(query = %key, "duplicate lookup served from cache");
            return cached;
        }

        if let HistorySlot::NotFetched = history {
            *history = match self.fetch_history().await {
                Some(movements) => HistorySlot::Fetched(movements),
                None => HistorySlot::Unavailable,
            };
        }

        // Degraded: no caching, no candidates
        let HistorySlot::Fetched(movements) = history else {
            return Vec::new();
        };
        let scored = self.score_history(name, movements);

        if let Some(cache) = &self.cache {
            cache.insert(key, scored.clone());
        }
        scored
    }

    /// Store failures degrade to "no history"
    async fn fetch_history(&self) -> Option<Vec<HistoricalMovement>> {
        let cutoff = Utc::now() - self.lookback;
        match self.store.get_movements_since(cutoff).await {
            Ok(movements) => {
                debug!(count = movements.len(), "fetched recent movements");
                Some(movements)
            }
            Err(e) => {
                warn!(error = %e, "movement history unavailable; skipping duplicate check");
                None
            }
        }
    }

    fn score_history(&self, name: &str, history: &[HistoricalMovement]) -> Vec<PotentialDuplicate> {
        let query_norm = KeywordExtractor::normalize(name);

        let mut scored: Vec<PotentialDuplicate> = history
            .iter()
            .filter_map(|movement| {
                let score = SimilarityScorer::score(name, &movement.name);
                if score <= 0.0 || score < self.similarity_threshold {
                    return None;
                }

                let match_type = if KeywordExtractor::normalize(&movement.name) == query_norm {
                    MatchType::Exact
                } else {
                    MatchType::Similar
                };
                Some(PotentialDuplicate::from_history(movement, score, match_type))
            })
            .collect();

        sort_by_score(&mut scored);
        scored
    }

    fn apply_quantity_gate(
        &self,
        name: &str,
        quantity: f64,
        scored: Vec<PotentialDuplicate>,
    ) -> Vec<PotentialDuplicate> {
        let query = QuantityNormalizer::normalize(name, quantity);

        scored
            .into_iter()
            .filter_map(|mut candidate| {
                let other =
                    QuantityNormalizer::normalize(&candidate.candidate_name, candidate.candidate_quantity);
                if !QuantityNormalizer::similar(&query, &other, self.quantity_tolerance) {
                    return None;
                }
                candidate.quantity_difference =
                    QuantityNormalizer::relative_difference(query.count, other.count);
                Some(candidate)
            })
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
