// 🏗️ Movement Assembler - validated ParseResult → canonical StockMovement records

use crate::cache::LookupCache;
use crate::classifier::CategoryClassifier;
use crate::error::{IntakeError, Result};
use crate::keywords::KeywordExtractor;
use crate::movement::{GlobalParameters, MovementKind, ParamKey, ParseResult};
use crate::parser::validate::parse_date;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// StockMovement - one item of one batch, ready to be committed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    /// Identity (new for every assembly)
    pub id: Uuid,

    pub kind: MovementKind,
    pub batch_number: u32,

    pub item_name: String,

    /// Quantity as typed (signed only for ADJUST)
    pub quantity: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_size: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Batch parameters with per-item overrides applied
    pub parameters: GlobalParameters,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    pub movement_date: NaiveDate,
    pub logged_by: String,
    pub created_at: DateTime<Utc>,

    /// Hash of the semantic content, stable across re-submissions
    pub fingerprint: String,
}

impl StockMovement {
    /// Signed change applied to stock on hand
    pub fn stock_delta(&self) -> f64 {
        self.quantity * self.kind.stock_direction()
    }

    /// Compute idempotency fingerprint
    /// Identity = id (UUID), Deduplication = fingerprint
    pub fn compute_fingerprint(&self) -> String {
        let params = self
            .parameters
            .iter()
            .filter(|(key, _)| *key != ParamKey::LoggedBy)
            .map(|(key, value)| format!("{}={}", key.name(), value.trim().to_lowercase()))
            .collect::<Vec<_>>()
            .join(";");

        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{}|{}|{}|{}|{}",
            self.kind.verb(),
            self.batch_number,
            KeywordExtractor::normalize(&self.item_name),
            self.quantity,
            self.unit.as_deref().unwrap_or(""),
            self.movement_date,
            params
        ));
        format!("{:x}", hasher.finalize())
    }
}

pub struct MovementAssembler {
    classifier: Option<Arc<dyn CategoryClassifier>>,
    category_cache: Option<Arc<LookupCache<String>>>,
}

impl MovementAssembler {
    pub fn new() -> Self {
        MovementAssembler {
            classifier: None,
            category_cache: None,
        }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn CategoryClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Memoize classifier answers per normalized item name
    pub fn with_category_cache(mut self, cache: Arc<LookupCache<String>>) -> Self {
        self.category_cache = Some(cache);
        self
    }

    /// Build one StockMovement per item. Only valid results can be assembled.
    pub fn assemble(&self, result: &ParseResult, logged_by: &str) -> Result<Vec<StockMovement>> {
        if !result.is_valid {
            let reasons = if result.errors.is_empty() {
                "no items".to_string()
            } else {
                result.error_messages().join("; ")
            };
            return Err(IntakeError::Validation(format!(
                "Cannot assemble an invalid command: {}",
                reasons
            )));
        }

        let created_at = Utc::now();
        let mut movements = Vec::with_capacity(result.total_items);

        for (batch, item) in result.items() {
            let mut parameters = batch.parameters.overridden_by(&item.overrides);
            if let Some(key) = result.kind.ignored_param() {
                parameters.remove(key);
            }

            let movement_date = parameters
                .get(ParamKey::Date)
                .and_then(parse_date)
                .unwrap_or_else(|| created_at.date_naive());

            let logged_by = parameters
                .get(ParamKey::LoggedBy)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(logged_by)
                .to_string();

            let category = match parameters.get(ParamKey::Category) {
                Some(c) if !c.trim().is_empty() => Some(c.trim().to_string()),
                _ => self.classify(&item.name),
            };

            let mut movement = StockMovement {
                id: Uuid::new_v4(),
                kind: result.kind,
                batch_number: batch.batch_number,
                item_name: item.name.clone(),
                quantity: item.quantity,
                unit: item.unit.clone(),
                unit_size: item.unit_size,
                unit_type: item.unit_type.clone(),
                note: item.note.clone(),
                parameters,
                category,
                movement_date,
                logged_by,
                created_at,
                fingerprint: String::new(),
            };
            movement.fingerprint = movement.compute_fingerprint();
            movements.push(movement);
        }

        debug!(count = movements.len(), kind = %result.kind, "assembled movements");
        Ok(movements)
    }

    /// Classifier lookup; failures are logged and leave the category unset
    fn classify(&self, item_name: &str) -> Option<String> {
        let classifier = self.classifier.as_ref()?;
        let key = KeywordExtractor::normalize(item_name);

        if let Some(cached) = self.category_cache.as_ref().and_then(|c| c.get(&key)) {
            return Some(cached);
        }

        match classifier.classify(item_name) {
            Ok(category) => {
                if let Some(cache) = &self.category_cache {
                    cache.insert(key, category.clone());
                }
                Some(category)
            }
            Err(e) => {
                warn!(item = item_name, error = %e, "category classification failed");
                None
            }
        }
    }
}

impl Default for MovementAssembler {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
