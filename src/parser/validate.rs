// ✅ Batch Validator - enforces batch and item invariants
// Errors accumulate; nothing here stops the rest of the command from being checked

use crate::config::ParserConfig;
use crate::error::BatchError;
use crate::movement::{Batch, BatchItem, GlobalParameters, MovementKind, ParamKey};
use chrono::NaiveDate;
use std::collections::HashMap;

pub const DATE_SUGGESTION: &str = "Use YYYY-MM-DD or MM/DD/YYYY";

pub type ValidationResult = Result<(), Vec<BatchError>>;

/// Parse date from string (supports YYYY-MM-DD and MM/DD/YYYY)
pub fn parse_date(date_str: &str) -> Option<NaiveDate> {
    let date_str = date_str.trim();

    if let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(date_str, "%m/%d/%Y") {
        return Some(date);
    }

    None
}

pub struct BatchValidator {
    /// Maximum items per batch (default: 20)
    pub max_items_per_batch: usize,

    /// Quantities above this are flagged with a warning (default: 10 000)
    pub large_quantity_warning: f64,
}

impl BatchValidator {
    pub fn new() -> Self {
        Self::from_config(&ParserConfig::default())
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        BatchValidator {
            max_items_per_batch: config.max_items_per_batch,
            large_quantity_warning: config.large_quantity_warning,
        }
    }

    /// Validate a whole batch: emptiness, cap, in-batch duplicates, then every item
    pub fn validate_batch(&self, kind: MovementKind, batch: &Batch) -> ValidationResult {
        let mut errors = Vec::new();
        let number = batch.batch_number;

        if batch.items.is_empty() {
            errors.push(
                BatchError::validation("No items found")
                    .in_batch(number)
                    .with_suggestion("Add at least one line: item, quantity unit"),
            );
        }

        if batch.items.len() > self.max_items_per_batch {
            errors.push(
                BatchError::validation(format!(
                    "Too many items ({}); the maximum is {} per batch",
                    batch.items.len(),
                    self.max_items_per_batch
                ))
                .in_batch(number)
                .with_suggestion("Split the items into several -batch N- sections"),
            );
        }

        let duplicates = Self::duplicate_names(&batch.items);
        if !duplicates.is_empty() {
            errors.push(
                BatchError::validation(format!(
                    "Duplicate items found in command: {}",
                    duplicates.join(", ")
                ))
                .in_batch(number)
                .with_suggestion("Combine the quantities into a single line"),
            );
        }

        if let Err(e) = Self::validate_parameters(&batch.parameters) {
            errors.extend(e.into_iter().map(|err| err.in_batch(number)));
        }

        for (index, item) in batch.items.iter().enumerate() {
            if let Err(e) = Self::validate_item(kind, item) {
                errors.extend(
                    e.into_iter()
                        .map(|err| err.in_batch(number).at_entry(index, item.name.clone())),
                );
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Name present, quantity rule of the kind, override date
    pub fn validate_item(kind: MovementKind, item: &BatchItem) -> ValidationResult {
        let mut errors = Vec::new();

        if item.name.trim().is_empty() {
            errors.push(
                BatchError::validation("Item name is missing")
                    .with_suggestion("Start the line with the item name"),
            );
        }

        if kind.allows_signed_quantity() {
            if item.quantity == 0.0 {
                errors.push(
                    BatchError::validation("Adjustment quantity cannot be zero")
                        .with_suggestion("Use a positive or negative amount, e.g. -5"),
                );
            }
        } else if item.quantity <= 0.0 {
            errors.push(
                BatchError::validation(format!(
                    "Quantity must be greater than zero, got {}",
                    item.quantity
                ))
                .with_suggestion("Use /adjust for corrections"),
            );
        }

        if let Err(e) = Self::validate_parameters(&item.overrides) {
            errors.extend(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Only the date has a checkable format
    pub fn validate_parameters(parameters: &GlobalParameters) -> ValidationResult {
        match parameters.get(ParamKey::Date) {
            Some(date) if !date.trim().is_empty() && parse_date(date).is_none() => {
                Err(vec![BatchError::validation(format!("Invalid date '{}'", date))
                    .with_suggestion(DATE_SUGGESTION)])
            }
            _ => Ok(()),
        }
    }

    /// Names appearing more than once (case-normalized), in first-seen order
    pub fn duplicate_names(items: &[BatchItem]) -> Vec<String> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut order: Vec<String> = Vec::new();

        for item in items {
            let key = item.normalized_name();
            if key.is_empty() {
                continue;
            }
            let count = counts.entry(key.clone()).or_insert(0);
            *count += 1;
            if *count == 2 {
                order.push(key);
            }
        }

        order
    }

    /// Non-blocking notices for unusually large quantities
    pub fn warnings(&self, batch: &Batch) -> Vec<String> {
        batch
            .items
            .iter()
            .filter(|item| item.quantity.abs() > self.large_quantity_warning)
            .map(|item| {
                format!(
                    "Batch {}: '{}' has a very large quantity ({}); please double-check",
                    batch.batch_number, item.name, item.quantity
                )
            })
            .collect()
    }
}

impl Default for BatchValidator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
