// 🏷️ Category Classifier - Rules as Data
// Keyword/wildcard rules mapping item names to inventory categories

use crate::keywords::KeywordExtractor;
use anyhow::{anyhow, Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Optional enrichment consulted by the assembler; failures are non-fatal
pub trait CategoryClassifier: Send + Sync {
    fn classify(&self, item_name: &str) -> Result<String>;
}

// ============================================================================
// RULE DEFINITION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Rule ID for tracking
    pub id: String,

    /// Keyword ("pipe") or wildcard pattern ("steel*bar")
    pub pattern: String,

    pub category: String,

    pub description: Option<String>,

    /// Priority (higher = applied first)
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_priority() -> i32 {
    0
}

impl CategoryRule {
    pub fn new(id: impl Into<String>, pattern: impl Into<String>, category: impl Into<String>) -> Self {
        CategoryRule {
            id: id.into(),
            pattern: pattern.into(),
            category: category.into(),
            description: None,
            priority: default_priority(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Wildcard patterns match the whole lowercase name in order;
    /// plain keywords match a whole word, singular or plural.
    pub fn matches(&self, text: &str) -> bool {
        let pattern_lower = self.pattern.to_lowercase();
        let text_lower = text.to_lowercase();

        if pattern_lower.contains('*') {
            let parts: Vec<&str> = pattern_lower.split('*').collect();

            if !parts[0].is_empty() && !text_lower.starts_with(parts[0]) {
                return false;
            }
            let last = parts[parts.len() - 1];
            if !last.is_empty() && !text_lower.ends_with(last) {
                return false;
            }

            let mut current_pos = parts[0].len();
            for part in &parts[1..parts.len() - 1] {
                if part.is_empty() {
                    continue;
                }
                match text_lower[current_pos..].find(part) {
                    Some(pos) => current_pos += pos + part.len(),
                    None => return false,
                }
            }

            true
        } else {
            KeywordExtractor::normalize(&text_lower).split(' ').any(|word| {
                word == pattern_lower
                    || word.strip_suffix('s') == Some(pattern_lower.as_str())
                    || word.strip_suffix("es") == Some(pattern_lower.as_str())
            })
        }
    }
}

/// keyword → category, checked in order
const DEFAULT_KEYWORDS: &[(&str, &str)] = &[
    ("paint", "Paint"),
    ("coating", "Paint"),
    ("varnish", "Paint"),
    ("primer", "Paint"),
    ("enamel", "Paint"),
    ("wire", "Electrical > Cables"),
    ("cable", "Electrical > Cables"),
    ("switch", "Electrical > Switches"),
    ("outlet", "Electrical > Outlets"),
    ("socket", "Electrical > Outlets"),
    ("fuse", "Electrical > Components"),
    ("breaker", "Electrical > Components"),
    ("connector", "Electrical > Components"),
    ("bulb", "Lamps and Bulbs"),
    ("lamp", "Lamps and Bulbs"),
    ("light", "Lamps and Bulbs"),
    ("led", "Lamps and Bulbs"),
    ("floodlight", "Lamps and Bulbs"),
    ("adapter", "Adapters"),
    ("pipe", "Plumbing"),
    ("fitting", "Plumbing"),
    ("valve", "Plumbing"),
    ("tap", "Plumbing"),
    ("sink", "Plumbing"),
    ("toilet", "Toilet Items"),
    ("hammer", "Tools"),
    ("screwdriver", "Tools"),
    ("wrench", "Tools"),
    ("pliers", "Tools"),
    ("drill", "Tools"),
    ("saw", "Tools"),
    ("tape", "Tools"),
    ("helmet", "Safety Equipment"),
    ("glove", "Safety Equipment"),
    ("goggle", "Safety Equipment"),
    ("vest", "Safety Equipment"),
    ("boot", "Safety Equipment"),
    ("harness", "Safety Equipment"),
    ("wood", "Carpentry"),
    ("plywood", "Carpentry"),
    ("timber", "Carpentry"),
    ("board", "Carpentry"),
    ("nail", "Carpentry"),
    ("screw", "Carpentry"),
    ("bolt", "Carpentry"),
    ("steel", "Steel"),
    ("iron", "Steel"),
    ("beam", "Steel"),
    ("plate", "Steel"),
    ("sheet", "Steel"),
    ("bar", "Steel"),
    ("cement", "Construction Materials"),
    ("concrete", "Construction Materials"),
    ("sand", "Construction Materials"),
    ("gravel", "Construction Materials"),
    ("brick", "Construction Materials"),
    ("block", "Construction Materials"),
    ("tile", "Construction Materials"),
    ("mortar", "Construction Materials"),
];

// ============================================================================
// RULE CLASSIFIER
// ============================================================================

pub struct RuleCategoryClassifier {
    rules: Vec<CategoryRule>,

    /// When no rule matches, title-case the first descriptive word
    pub fallback_to_name: bool,
}

impl RuleCategoryClassifier {
    /// Create a classifier with no rules
    pub fn new() -> Self {
        RuleCategoryClassifier {
            rules: Vec::new(),
            fallback_to_name: true,
        }
    }

    /// Built-in construction-materials table
    pub fn with_default_rules() -> Self {
        let rules = DEFAULT_KEYWORDS
            .iter()
            .map(|(keyword, category)| CategoryRule::new(format!("default-{}", keyword), *keyword, *category))
            .collect();
        Self::from_rules(rules)
    }

    /// Load rules from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read category rules file: {:?}", path.as_ref()))?;

        let rules: Vec<CategoryRule> =
            serde_json::from_str(&content).context("Failed to parse category rules JSON")?;

        Ok(Self::from_rules(rules))
    }

    /// Stable sort: equal priorities keep their listed order
    pub fn from_rules(mut rules: Vec<CategoryRule>) -> Self {
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        RuleCategoryClassifier {
            rules,
            fallback_to_name: true,
        }
    }

    pub fn add_rule(&mut self, rule: CategoryRule) {
        self.rules.push(rule);
        self.rules.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// First matching rule, highest priority first
    pub fn matching_rule(&self, item_name: &str) -> Option<&CategoryRule> {
        self.rules.iter().find(|rule| rule.matches(item_name))
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    fn fallback(item_name: &str) -> Option<String> {
        let word = KeywordExtractor::keywords(item_name)
            .into_iter()
            .find(|w| w.chars().all(char::is_alphabetic))?;

        let mut chars = word.chars();
        let first = chars.next()?;
        Some(first.to_uppercase().chain(chars).collect())
    }
}

impl Default for RuleCategoryClassifier {
    fn default() -> Self {
        Self::with_default_rules()
    }
}

impl CategoryClassifier for RuleCategoryClassifier {
    fn classify(&self, item_name: &str) -> Result<String> {
        if let Some(rule) = self.matching_rule(item_name) {
            return Ok(rule.category.clone());
        }

        if self.fallback_to_name {
            if let Some(category) = Self::fallback(item_name) {
                return Ok(category);
            }
        }

        Err(anyhow!("No category rule matches '{}'", item_name))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_keyword_rule_matches_words_and_plurals() {
        let rule = CategoryRule::new("nails", "nail", "Carpentry");
        assert!(rule.matches("Roofing Nails 3 inch"));
        assert!(rule.matches("nail"));
        assert!(!rule.matches("Fingernail clippers"));
    }

    #[test]
    fn test_wildcard_pattern() {
        let rule = CategoryRule::new("rebar", "steel*bar*", "Steel");
        assert!(rule.matches("Steel bar 12mm"));
        assert!(rule.matches("steel flat bar"));
        assert!(!rule.matches("Bar of steel"));
    }

    #[test]
    fn test_default_table() {
        let classifier = RuleCategoryClassifier::with_default_rules();
        assert_eq!(classifier.classify("Paint 20ltrs").unwrap(), "Paint");
        assert_eq!(classifier.classify("Cable 2.5sqmm").unwrap(), "Electrical > Cables");
        assert_eq!(classifier.classify("Cement").unwrap(), "Construction Materials");
        assert_eq!(classifier.classify("Insulation tape").unwrap(), "Tools");
    }

    #[test]
    fn test_priority_wins() {
        let mut classifier = RuleCategoryClassifier::with_default_rules();
        classifier.add_rule(CategoryRule::new("pvc", "pvc*pipe*", "Plumbing > PVC").with_priority(10));

        assert_eq!(classifier.classify("PVC pipe 20mm").unwrap(), "Plumbing > PVC");
        assert_eq!(classifier.classify("Copper pipe").unwrap(), "Plumbing");
    }

    #[test]
    fn test_fallback_to_first_word() {
        let classifier = RuleCategoryClassifier::with_default_rules();
        assert_eq!(classifier.classify("the 2 wheelbarrows").unwrap(), "Wheelbarrows");
    }

    #[test]
    fn test_no_match_without_fallback() {
        let mut classifier = RuleCategoryClassifier::new();
        classifier.fallback_to_name = false;
        assert!(classifier.classify("Wheelbarrow").is_err());
        assert!(RuleCategoryClassifier::new().classify("  ").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "solar", "pattern": "solar*", "category": "Solar", "description": null, "priority": 5}}]"#
        )
        .unwrap();

        let classifier = RuleCategoryClassifier::from_file(file.path()).unwrap();
        assert_eq!(classifier.rule_count(), 1);
        assert_eq!(classifier.classify("Solar floodlight").unwrap(), "Solar");
    }
}
