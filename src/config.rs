// ⚙️ Configuration - thresholds, caps and cache policy
// Loaded from TOML, then overridden by STOCK_INTAKE_* environment variables

use crate::error::{IntakeError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct IntakeConfig {
    pub parser: ParserConfig,
    pub detection: DetectionConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Maximum items allowed in one batch
    pub max_items_per_batch: usize,

    /// Quantities above this produce a warning (never an error)
    pub large_quantity_warning: f64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            max_items_per_batch: 20,
            large_quantity_warning: 10_000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum similarity score for a candidate (0.0 - 1.0)
    pub similarity_threshold: f64,

    /// Relative quantity difference still considered "similar" (0.1 = 10%)
    pub quantity_tolerance: f64,

    /// How far back to look for recent movements
    pub lookback_hours: i64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        DetectionConfig {
            similarity_threshold: 0.7,
            quantity_tolerance: 0.1,
            lookback_hours: 24 * 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            enabled: true,
            ttl_secs: 30 * 60,
            capacity: 512,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl IntakeConfig {
    /// Parse a TOML file; missing keys fall back to defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            IntakeError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: IntakeConfig = toml::from_str(content)
            .map_err(|e| IntakeError::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// File (if given) → environment overrides → validation
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => IntakeConfig::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (std::env::var in production)
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(key: &str, raw: String) -> Result<T> {
            raw.trim()
                .parse()
                .map_err(|_| IntakeError::Config(format!("{} has invalid value '{}'", key, raw)))
        }

        if let Some(v) = lookup("STOCK_INTAKE_MAX_ITEMS") {
            self.parser.max_items_per_batch = parsed("STOCK_INTAKE_MAX_ITEMS", v)?;
        }
        if let Some(v) = lookup("STOCK_INTAKE_SIMILARITY_THRESHOLD") {
            self.detection.similarity_threshold = parsed("STOCK_INTAKE_SIMILARITY_THRESHOLD", v)?;
        }
        if let Some(v) = lookup("STOCK_INTAKE_QUANTITY_TOLERANCE") {
            self.detection.quantity_tolerance = parsed("STOCK_INTAKE_QUANTITY_TOLERANCE", v)?;
        }
        if let Some(v) = lookup("STOCK_INTAKE_LOOKBACK_HOURS") {
            self.detection.lookback_hours = parsed("STOCK_INTAKE_LOOKBACK_HOURS", v)?;
        }
        if let Some(v) = lookup("STOCK_INTAKE_CACHE_TTL_SECS") {
            self.cache.ttl_secs = parsed("STOCK_INTAKE_CACHE_TTL_SECS", v)?;
        }
        if let Some(v) = lookup("STOCK_INTAKE_CACHE_ENABLED") {
            self.cache.enabled = parsed("STOCK_INTAKE_CACHE_ENABLED", v)?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let d = &self.detection;

        if !(0.0..=1.0).contains(&d.similarity_threshold) {
            return Err(IntakeError::Config(format!(
                "similarity_threshold must be between 0.0 and 1.0, got {}",
                d.similarity_threshold
            )));
        }
        if !(0.0..=1.0).contains(&d.quantity_tolerance) {
            return Err(IntakeError::Config(format!(
                "quantity_tolerance must be between 0.0 and 1.0, got {}",
                d.quantity_tolerance
            )));
        }
        if d.lookback_hours <= 0 {
            return Err(IntakeError::Config("lookback_hours must be positive".to_string()));
        }
        if self.parser.max_items_per_batch == 0 {
            return Err(IntakeError::Config("max_items_per_batch must be at least 1".to_string()));
        }
        if self.cache.enabled && self.cache.capacity == 0 {
            return Err(IntakeError::Config("cache capacity must be at least 1".to_string()));
        }

        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = IntakeConfig::default();
        assert_eq!(config.detection.similarity_threshold, 0.7);
        assert_eq!(config.detection.quantity_tolerance, 0.1);
        assert_eq!(config.parser.max_items_per_batch, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = IntakeConfig::from_toml_str(
            r#"
            [detection]
            similarity_threshold = 0.8
            "#,
        )
        .unwrap();

        assert_eq!(config.detection.similarity_threshold, 0.8);
        assert_eq!(config.detection.quantity_tolerance, 0.1);
        assert_eq!(config.cache.ttl_secs, 1800);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[parser]\nmax_items_per_batch = 5").unwrap();

        let config = IntakeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.parser.max_items_per_batch, 5);
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let result = IntakeConfig::from_toml_str("[detection]\nsimilarity_threshold = 1.5");
        assert!(matches!(result, Err(IntakeError::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("STOCK_INTAKE_QUANTITY_TOLERANCE", "0.05"),
            ("STOCK_INTAKE_CACHE_ENABLED", "false"),
        ]
        .into_iter()
        .collect();

        let mut config = IntakeConfig::default();
        config
            .apply_env_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.detection.quantity_tolerance, 0.05);
        assert!(!config.cache.enabled);
    }

    #[test]
    fn test_env_override_bad_value() {
        let mut config = IntakeConfig::default();
        let result = config.apply_env_overrides(|k| {
            (k == "STOCK_INTAKE_MAX_ITEMS").then(|| "many".to_string())
        });
        assert!(result.is_err());
    }
}
