// 📦 Movement Model - kinds, parameters, batches and parse results

use crate::error::BatchError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Value every kind uses for an unspecified project/driver/origin
pub const NOT_DESCRIBED: &str = "not described";

/// Default destination of an OUT movement
pub const EXTERNAL: &str = "external";

// ============================================================================
// MOVEMENT KIND
// ============================================================================

/// MovementKind - closed set of movement commands.
/// Each kind carries its own defaults and quantity rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementKind {
    /// Receipt into stock
    In,
    /// Issue out of stock
    Out,
    /// Signed correction
    Adjust,
}

impl MovementKind {
    pub const ALL: [MovementKind; 3] = [MovementKind::In, MovementKind::Out, MovementKind::Adjust];

    /// Human-readable name for display
    pub fn name(&self) -> &str {
        match self {
            MovementKind::In => "In",
            MovementKind::Out => "Out",
            MovementKind::Adjust => "Adjust",
        }
    }

    /// Command verb as typed in chat
    pub fn verb(&self) -> &str {
        match self {
            MovementKind::In => "in",
            MovementKind::Out => "out",
            MovementKind::Adjust => "adjust",
        }
    }

    /// Match a verb token ("in", "/OUT", "Adjust")
    pub fn from_verb(token: &str) -> Option<Self> {
        let token = token.trim().trim_start_matches('/').to_lowercase();
        MovementKind::ALL.into_iter().find(|k| k.verb() == token)
    }

    /// Values written into unset parameters of every batch
    pub fn defaults(&self) -> &'static [(ParamKey, &'static str)] {
        match self {
            MovementKind::In => &[
                (ParamKey::Project, NOT_DESCRIBED),
                (ParamKey::Driver, NOT_DESCRIBED),
                (ParamKey::From, NOT_DESCRIBED),
            ],
            MovementKind::Out => &[
                (ParamKey::Project, NOT_DESCRIBED),
                (ParamKey::Driver, NOT_DESCRIBED),
                (ParamKey::To, EXTERNAL),
            ],
            MovementKind::Adjust => &[
                (ParamKey::Project, NOT_DESCRIBED),
                (ParamKey::Driver, NOT_DESCRIBED),
            ],
        }
    }

    /// Location key that has no meaning for this kind (IN has no destination,
    /// OUT no origin)
    pub fn ignored_param(&self) -> Option<ParamKey> {
        match self {
            MovementKind::In => Some(ParamKey::To),
            MovementKind::Out => Some(ParamKey::From),
            MovementKind::Adjust => None,
        }
    }

    /// ADJUST accepts negative quantities; IN/OUT must be strictly positive
    pub fn allows_signed_quantity(&self) -> bool {
        matches!(self, MovementKind::Adjust)
    }

    /// Sign applied to stock on commit
    pub fn stock_direction(&self) -> f64 {
        match self {
            MovementKind::In | MovementKind::Adjust => 1.0,
            MovementKind::Out => -1.0,
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// GLOBAL PARAMETERS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKey {
    Project,
    Driver,
    From,
    To,
    Date,
    LoggedBy,
    Category,
}

impl ParamKey {
    pub const ALL: [ParamKey; 7] = [
        ParamKey::Project,
        ParamKey::Driver,
        ParamKey::From,
        ParamKey::To,
        ParamKey::Date,
        ParamKey::LoggedBy,
        ParamKey::Category,
    ];

    pub fn name(&self) -> &str {
        match self {
            ParamKey::Project => "project",
            ParamKey::Driver => "driver",
            ParamKey::From => "from",
            ParamKey::To => "to",
            ParamKey::Date => "date",
            ParamKey::LoggedBy => "logged_by",
            ParamKey::Category => "category",
        }
    }

    /// Recognize a key as typed: "Project", "logged by", "logged-by"
    pub fn parse(raw: &str) -> Option<Self> {
        let key: String = raw
            .trim()
            .to_lowercase()
            .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("_");

        ParamKey::ALL.into_iter().find(|k| k.name() == key)
    }
}

/// GlobalParameters - recognized "key: value" pairs of one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GlobalParameters(BTreeMap<ParamKey, String>);

impl GlobalParameters {
    pub fn new() -> Self {
        GlobalParameters(BTreeMap::new())
    }

    pub fn get(&self, key: ParamKey) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    /// A key counts as set only when its value is non-blank
    pub fn is_set(&self, key: ParamKey) -> bool {
        self.get(key).map_or(false, |v| !v.trim().is_empty())
    }

    pub fn insert(&mut self, key: ParamKey, value: impl Into<String>) -> Option<String> {
        self.0.insert(key, value.into())
    }

    pub fn remove(&mut self, key: ParamKey) -> Option<String> {
        self.0.remove(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamKey, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Copy every set key of `inherited` that is unset here
    pub fn inherit_from(&mut self, inherited: &GlobalParameters) {
        for (key, value) in inherited.iter() {
            if !self.is_set(key) && !value.trim().is_empty() {
                self.insert(key, value);
            }
        }
    }

    /// New map where set keys of `overrides` win over self
    pub fn overridden_by(&self, overrides: &GlobalParameters) -> GlobalParameters {
        let mut merged = self.clone();
        for (key, value) in overrides.iter() {
            if !value.trim().is_empty() {
                merged.insert(key, value);
            }
        }
        merged
    }
}

impl FromIterator<(ParamKey, String)> for GlobalParameters {
    fn from_iter<I: IntoIterator<Item = (ParamKey, String)>>(iter: I) -> Self {
        GlobalParameters(iter.into_iter().collect())
    }
}

// ============================================================================
// BATCH ITEM / BATCH
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub name: String,
    pub quantity: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Size encoded in the name ("Paint 20ltrs" → 20.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_size: Option<f64>,

    /// Unit of that size ("ltr")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_type: Option<String>,

    /// Per-item "key: value" clauses, winning over batch parameters
    #[serde(default, skip_serializing_if = "GlobalParameters::is_empty")]
    pub overrides: GlobalParameters,
}

impl BatchItem {
    pub fn new(name: impl Into<String>, quantity: f64) -> Self {
        BatchItem {
            name: name.into(),
            quantity,
            unit: None,
            note: None,
            unit_size: None,
            unit_type: None,
            overrides: GlobalParameters::new(),
        }
    }

    /// Builder pattern: add unit
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Builder pattern: add note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Builder pattern: add inferred size
    pub fn with_size(mut self, size: f64, unit_type: impl Into<String>) -> Self {
        self.unit_size = Some(size);
        self.unit_type = Some(unit_type.into());
        self
    }

    /// Name used for in-batch duplicate checks
    pub fn normalized_name(&self) -> String {
        self.name
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub batch_number: u32,
    pub parameters: GlobalParameters,
    pub items: Vec<BatchItem>,
}

impl Batch {
    pub fn new(batch_number: u32) -> Self {
        Batch {
            batch_number,
            parameters: GlobalParameters::new(),
            items: Vec::new(),
        }
    }

    pub fn param(&self, key: ParamKey) -> Option<&str> {
        self.parameters.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ============================================================================
// PARSE RESULT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseFormat {
    Single,
    Newline,
    Semicolon,
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    pub kind: MovementKind,
    pub format: ParseFormat,
    pub batches: Vec<Batch>,
    pub total_items: usize,
    pub errors: Vec<BatchError>,

    /// Non-blocking notices (e.g. unusually large quantities)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    pub is_valid: bool,
}

impl ParseResult {
    /// Build a result, deriving total_items and is_valid from the parts
    pub fn new(
        kind: MovementKind,
        format: ParseFormat,
        batches: Vec<Batch>,
        errors: Vec<BatchError>,
        warnings: Vec<String>,
    ) -> Self {
        let total_items = batches.iter().map(|b| b.items.len()).sum();
        let is_valid =
            errors.is_empty() && !batches.is_empty() && batches.iter().all(|b| !b.is_empty());

        ParseResult {
            kind,
            format,
            batches,
            total_items,
            errors,
            warnings,
            is_valid,
        }
    }

    /// Errors rendered for display
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.to_string()).collect()
    }

    pub fn items(&self) -> impl Iterator<Item = (&Batch, &BatchItem)> {
        self.batches
            .iter()
            .flat_map(|b| b.items.iter().map(move |i| (b, i)))
    }

    /// Confirmation text shown to the user before committing
    pub fn summary(&self) -> String {
        if self.batches.is_empty() {
            return "No batches found".to_string();
        }

        let param = |b: &Batch, key: ParamKey| b.param(key).unwrap_or(NOT_DESCRIBED).to_string();

        let mut lines = vec![format!("Found {} batch(es):", self.batches.len())];
        for batch in &self.batches {
            let direction = match self.kind {
                MovementKind::Out => format!("to {}", param(batch, ParamKey::To)),
                MovementKind::In => format!("from {}", param(batch, ParamKey::From)),
                MovementKind::Adjust => "adjusted".to_string(),
            };
            lines.push(format!(
                "  Batch {}: {} items {} (Project: {}, Driver: {})",
                batch.batch_number,
                batch.items.len(),
                direction,
                param(batch, ParamKey::Project),
                param(batch, ParamKey::Driver),
            ));
        }
        lines.push(format!("\nTotal items: {}", self.total_items));

        lines.join("\n")
    }
}

// ============================================================================
// TESTS
// ============================================================================
