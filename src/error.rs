// ⚠️ Error Taxonomy - VALIDATION / PARSING / DATABASE
// Parse problems are collected as data (BatchError); operational failures are typed errors

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// ERROR KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input was understood but breaks a rule (empty batch, bad quantity, ...)
    Validation,

    /// Input matches no recognized grammar
    Parsing,

    /// Raised while talking to the record store (generated by callers)
    Database,
}

impl ErrorKind {
    pub fn name(&self) -> &str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Parsing => "parsing",
            ErrorKind::Database => "database",
        }
    }

    /// Classify a free-text message produced outside this crate,
    /// returning the kind plus a generic suggestion.
    pub fn categorize(message: &str) -> (ErrorKind, &'static str) {
        let lower = message.to_lowercase();

        if ["database", "connection", "timeout", "rate limit", "store"]
            .iter()
            .any(|k| lower.contains(k))
        {
            return (ErrorKind::Database, "Please try again later or with fewer items.");
        }

        if ["parse", "format", "syntax", "invalid input"]
            .iter()
            .any(|k| lower.contains(k))
        {
            return (ErrorKind::Parsing, "Check the format of your command.");
        }

        (ErrorKind::Validation, "Please verify your input and try again.")
    }
}

// ============================================================================
// BATCH ERROR (accumulated, never thrown)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchError {
    pub kind: ErrorKind,
    pub message: String,

    /// Batch the error belongs to (None = whole command)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_number: Option<u32>,

    /// Zero-based entry index inside the batch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_index: Option<usize>,

    /// Offending input text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl BatchError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        BatchError {
            kind,
            message: message.into(),
            batch_number: None,
            entry_index: None,
            entry_text: None,
            suggestion: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn parsing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parsing, message)
    }

    /// Wrap an externally generated message, categorizing it automatically
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let (kind, suggestion) = ErrorKind::categorize(&message);
        Self::new(kind, message).with_suggestion(suggestion)
    }

    pub fn in_batch(mut self, batch_number: u32) -> Self {
        self.batch_number = Some(batch_number);
        self
    }

    pub fn at_entry(mut self, index: usize, text: impl Into<String>) -> Self {
        self.entry_index = Some(index);
        self.entry_text = Some(text.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.batch_number, self.entry_index) {
            (Some(batch), Some(entry)) => write!(f, "Batch {}, Entry #{}: ", batch, entry + 1)?,
            (Some(batch), None) => write!(f, "Batch {}: ", batch)?,
            (None, Some(entry)) => write!(f, "Entry #{}: ", entry + 1)?,
            (None, None) => {}
        }

        write!(f, "{}", self.message)?;

        if let Some(text) = &self.entry_text {
            write!(f, " ('{}')", text)?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, " Suggestion: {}", suggestion)?;
        }

        Ok(())
    }
}

/// Overall advice for a list of errors, led by the most operational kind present
pub fn recovery_suggestion(errors: &[BatchError]) -> Option<&'static str> {
    let has = |kind: ErrorKind| errors.iter().any(|e| e.kind == kind);

    if errors.is_empty() {
        None
    } else if has(ErrorKind::Database) {
        Some("There were database connection issues. Try again later or with fewer items.")
    } else if has(ErrorKind::Parsing) {
        Some("There were issues with the format of your command. Check syntax and try again.")
    } else {
        Some("Please check your input data and ensure all required fields are provided correctly.")
    }
}

// ============================================================================
// OPERATIONAL ERRORS
// ============================================================================

/// Failures from a MovementHistoryStore implementation
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Crate-level error for operations that do return Result
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Parsing error: {0}")]
    Parsing(String),

    /// Kept distinct so callers can tell store trouble from bad input
    #[error("Database error: {0}")]
    Database(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IntakeError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            IntakeError::Validation(_) => Some(ErrorKind::Validation),
            IntakeError::Parsing(_) => Some(ErrorKind::Parsing),
            IntakeError::Database(_) => Some(ErrorKind::Database),
            IntakeError::Config(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, IntakeError>;

// ============================================================================
// TESTS
// ============================================================================
