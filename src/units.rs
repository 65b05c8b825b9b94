// 📏 Units - known unit suffixes, size inference and quantity normalization
// Shared by the item parser (size in names) and the duplicate engine (quantity gate)

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Fallback unit when nothing better is known
pub const DEFAULT_UNIT: &str = "piece";

// ============================================================================
// UNIT TABLE
// ============================================================================

/// alias → canonical unit
const UNIT_ALIASES: &[(&str, &str)] = &[
    ("ltr", "ltr"),
    ("ltrs", "ltr"),
    ("lt", "ltr"),
    ("lts", "ltr"),
    ("liter", "ltr"),
    ("liters", "ltr"),
    ("litre", "ltr"),
    ("litres", "ltr"),
    ("kg", "kg"),
    ("kgs", "kg"),
    ("kilo", "kg"),
    ("kilos", "kg"),
    ("kilogram", "kg"),
    ("kilograms", "kg"),
    ("m", "m"),
    ("meter", "m"),
    ("meters", "m"),
    ("metre", "m"),
    ("metres", "m"),
    ("mm", "mm"),
    ("cm", "cm"),
    ("ton", "ton"),
    ("tons", "ton"),
    ("tonne", "ton"),
    ("tonnes", "ton"),
    ("piece", "piece"),
    ("pieces", "piece"),
    ("pcs", "piece"),
    ("pc", "piece"),
    ("bag", "bag"),
    ("bags", "bag"),
    ("box", "box"),
    ("boxes", "box"),
    ("set", "set"),
    ("sets", "set"),
];

/// Canonical form of a unit word, if it is in the table
pub fn canonical_unit(raw: &str) -> Option<&'static str> {
    let raw = raw.trim().to_lowercase();
    UNIT_ALIASES
        .iter()
        .find(|(alias, _)| *alias == raw)
        .map(|(_, canonical)| *canonical)
}

/// "<number><letters>" tokens, e.g. "20ltrs", "12 mm", "2.5sqmm"
static SIZE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d+(?:\.\d+)?)\s*([A-Za-z]+)\b").expect("valid size regex"));

/// First size encoded in a name whose suffix is a known unit.
/// "Paint 20ltrs" → (20.0, "ltr"); "Cable 2.5sqmm" → None
pub fn infer_size(name: &str) -> Option<(f64, &'static str)> {
    SIZE_TOKEN.captures_iter(name).find_map(|caps| {
        let unit = canonical_unit(&caps[2])?;
        let size: f64 = caps[1].parse().ok()?;
        (size > 0.0).then_some((size, unit))
    })
}

// ============================================================================
// QUANTITY NORMALIZER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedQuantity {
    /// Supplied quantity (instances of the unit)
    pub count: f64,

    /// Size embedded in the name, if any ("Paint 20ltrs" → 20.0)
    pub size: Option<f64>,

    /// Embedded unit when present, otherwise "piece"
    pub unit: String,
}

impl NormalizedQuantity {
    pub fn is_sized(&self) -> bool {
        self.size.is_some()
    }
}

pub struct QuantityNormalizer;

impl QuantityNormalizer {
    /// An embedded "<number><unit>" in the name gives the size and unit;
    /// otherwise the supplied quantity is counted in pieces.
    pub fn normalize(name: &str, supplied: f64) -> NormalizedQuantity {
        match infer_size(name) {
            Some((size, unit)) => NormalizedQuantity {
                count: supplied,
                size: Some(size),
                unit: unit.to_string(),
            },
            None => NormalizedQuantity {
                count: supplied,
                size: None,
                unit: DEFAULT_UNIT.to_string(),
            },
        }
    }

    /// |a-b| / max(|a|,|b|); 0.0 when both are zero, 1.0 when only one is
    pub fn relative_difference(a: f64, b: f64) -> f64 {
        let (a, b) = (a.abs(), b.abs());
        if a == 0.0 && b == 0.0 {
            return 0.0;
        }
        if a == 0.0 || b == 0.0 {
            return 1.0;
        }
        (a - b).abs() / a.max(b)
    }

    /// Equal, or within `tolerance` relative difference in either direction.
    /// Zero is only similar to zero.
    pub fn values_similar(a: f64, b: f64, tolerance: f64) -> bool {
        if a == b {
            return true;
        }
        if a == 0.0 || b == 0.0 {
            return false;
        }
        // Epsilon absorbs float noise at exactly the tolerance boundary
        Self::relative_difference(a, b) <= tolerance + 1e-9
    }

    /// Counts must be similar; when both names embed a size, the units must
    /// agree and the sizes must be similar too.
    pub fn similar(a: &NormalizedQuantity, b: &NormalizedQuantity, tolerance: f64) -> bool {
        if let (Some(size_a), Some(size_b)) = (a.size, b.size) {
            if a.unit != b.unit || !Self::values_similar(size_a, size_b, tolerance) {
                return false;
            }
        }
        Self::values_similar(a.count, b.count, tolerance)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_normalization() {
        assert_eq!(canonical_unit("ltrs"), Some("ltr"));
        assert_eq!(canonical_unit("PCS"), Some("piece"));
        assert_eq!(canonical_unit("Boxes"), Some("box"));
        assert_eq!(canonical_unit("sheets"), None);
    }

    #[test]
    fn test_infer_size_from_name() {
        assert_eq!(infer_size("Paint 20ltrs"), Some((20.0, "ltr")));
        assert_eq!(infer_size("Steel Bar 12mm"), Some((12.0, "mm")));
        assert_eq!(infer_size("Wire 2.5 m roll"), Some((2.5, "m")));
    }

    #[test]
    fn test_infer_size_ignores_unknown_suffix_and_codes() {
        assert_eq!(infer_size("Cable 2.5sqmm black"), None);
        assert_eq!(infer_size("Solar floodlight FS-SFL800"), None);
        assert_eq!(infer_size("Cement"), None);
    }

    #[test]
    fn test_infer_size_skips_to_first_known() {
        assert_eq!(infer_size("Cable 2.5sqmm 100m"), Some((100.0, "m")));
    }

    #[test]
    fn test_normalize_prefers_embedded_unit() {
        let q = QuantityNormalizer::normalize("Cement 50kg", 3.0);
        assert_eq!(q.count, 3.0);
        assert_eq!(q.size, Some(50.0));
        assert_eq!(q.unit, "kg");

        let q = QuantityNormalizer::normalize("Cement", 3.0);
        assert_eq!(q.count, 3.0);
        assert!(!q.is_sized());
        assert_eq!(q.unit, "piece");
    }

    #[test]
    fn test_similar_within_tolerance() {
        let a = QuantityNormalizer::normalize("Cement", 30.0);
        let b = QuantityNormalizer::normalize("Cement", 28.0);
        assert!(QuantityNormalizer::similar(&a, &b, 0.1));
        assert!(QuantityNormalizer::similar(&b, &a, 0.1));
    }

    #[test]
    fn test_similar_rejects_large_difference() {
        let a = QuantityNormalizer::normalize("Cement", 30.0);
        let b = QuantityNormalizer::normalize("Cement", 5.0);
        assert!(!QuantityNormalizer::similar(&a, &b, 0.1));
    }

    #[test]
    fn test_zero_only_matches_zero() {
        let zero = QuantityNormalizer::normalize("Cement", 0.0);
        let other_zero = QuantityNormalizer::normalize("Cement", 0.0);
        let one = QuantityNormalizer::normalize("Cement", 1.0);
        assert!(QuantityNormalizer::similar(&zero, &other_zero, 0.1));
        assert!(!QuantityNormalizer::similar(&zero, &one, 0.1));
    }

    #[test]
    fn test_embedded_units_must_agree() {
        let kg = QuantityNormalizer::normalize("Nails 5kg", 1.0);
        let box_ = QuantityNormalizer::normalize("Nails 5 box", 1.0);
        assert!(!QuantityNormalizer::similar(&kg, &box_, 0.1));
    }

    #[test]
    fn test_embedded_sizes_must_be_similar() {
        let big = QuantityNormalizer::normalize("Paint 20ltrs", 4.0);
        let small = QuantityNormalizer::normalize("Paint 5ltrs", 4.0);
        let same = QuantityNormalizer::normalize("Paint 20 litres", 4.0);
        assert!(!QuantityNormalizer::similar(&big, &small, 0.1));
        assert!(QuantityNormalizer::similar(&big, &same, 0.1));
    }

    #[test]
    fn test_counts_compared_even_when_sized() {
        let four = QuantityNormalizer::normalize("Paint 20ltrs", 4.0);
        let forty = QuantityNormalizer::normalize("Paint 20ltrs", 40.0);
        assert!(!QuantityNormalizer::similar(&four, &forty, 0.1));

        let plain = QuantityNormalizer::normalize("Paint", 4.0);
        assert!(QuantityNormalizer::similar(&four, &plain, 0.1));
    }
}
