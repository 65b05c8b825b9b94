// 📐 Similarity Scorer - keyword-overlap scoring between item names
// Exact normalized match short-circuits to 1.0; otherwise weighted overlap plus bonuses

use crate::keywords::KeywordExtractor;
use crate::units::QuantityNormalizer;

/// Weight of the exact keyword-overlap ratio
pub const EXACT_WEIGHT: f64 = 0.8;

/// Weight of the partial (substring) keyword-overlap ratio
pub const PARTIAL_WEIGHT: f64 = 0.4;

pub const STARTS_WITH_BONUS: f64 = 0.2;
pub const SUBSTRING_BONUS: f64 = 0.1;
pub const ALL_EXACT_BONUS: f64 = 0.1;

/// Keyword overlap counts of a query against a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeywordOverlap {
    /// Query keywords present verbatim in the candidate
    pub exact: usize,

    /// Remaining query keywords that contain, or are contained in, a candidate keyword
    pub partial: usize,

    /// Number of query keywords
    pub total: usize,
}

impl KeywordOverlap {
    pub fn between(query: &[String], candidate: &[String]) -> Self {
        let mut overlap = KeywordOverlap {
            total: query.len(),
            ..Default::default()
        };

        for q in query {
            if candidate.iter().any(|c| c == q) {
                overlap.exact += 1;
            } else if candidate
                .iter()
                .any(|c| c.contains(q.as_str()) || q.contains(c.as_str()))
            {
                overlap.partial += 1;
            }
        }

        overlap
    }

    pub fn is_empty(&self) -> bool {
        self.exact + self.partial == 0
    }
}

pub struct SimilarityScorer;

impl SimilarityScorer {
    /// Score in [0, 1] of how much `candidate` looks like `query`.
    /// Equal non-empty normalized names score 1; names sharing no keyword score 0.
    pub fn score(query: &str, candidate: &str) -> f64 {
        let query_norm = KeywordExtractor::normalize(query);
        if query_norm.is_empty() {
            return 0.0;
        }

        let candidate_norm = KeywordExtractor::normalize(candidate);
        if query_norm == candidate_norm {
            return 1.0;
        }

        let query_keywords = KeywordExtractor::keywords(query);
        if query_keywords.is_empty() {
            return 0.0;
        }

        let candidate_keywords = KeywordExtractor::keywords(candidate);
        let overlap = KeywordOverlap::between(&query_keywords, &candidate_keywords);
        if overlap.is_empty() {
            return 0.0;
        }

        let total = overlap.total as f64;
        let mut score = EXACT_WEIGHT * (overlap.exact as f64 / total)
            + PARTIAL_WEIGHT * (overlap.partial as f64 / total);

        if candidate_norm.starts_with(&query_norm) {
            score += STARTS_WITH_BONUS;
        }
        if candidate_norm.contains(&query_norm) {
            score += SUBSTRING_BONUS;
        }
        if overlap.exact == overlap.total {
            score += ALL_EXACT_BONUS;
        }

        score.min(1.0)
    }

    /// Quantity gate: compares normalized quantities of both sides
    pub fn quantities_similar(
        query_name: &str,
        query_quantity: f64,
        candidate_name: &str,
        candidate_quantity: f64,
        tolerance: f64,
    ) -> bool {
        let a = QuantityNormalizer::normalize(query_name, query_quantity);
        let b = QuantityNormalizer::normalize(candidate_name, candidate_quantity);
        QuantityNormalizer::similar(&a, &b, tolerance)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_exact_match_case_insensitive() {
        assert_eq!(SimilarityScorer::score("Cement", "CEMENT"), 1.0);
        assert_eq!(SimilarityScorer::score("steel  bar", "Steel-Bar"), 1.0);
    }

    #[test]
    fn test_zero_overlap_scores_zero() {
        assert_eq!(SimilarityScorer::score("Cement", "Paint brush"), 0.0);
    }

    #[test]
    fn test_exact_match_without_keywords() {
        assert_eq!(SimilarityScorer::score("X", "x"), 1.0);
        assert_eq!(SimilarityScorer::score("the", "THE"), 1.0);
    }

    #[test]
    fn test_query_without_keywords_scores_zero() {
        assert_eq!(SimilarityScorer::score("the", "the cement"), 0.0);
        assert_eq!(SimilarityScorer::score(" ,; ", ""), 0.0);
    }

    #[test]
    fn test_prefix_candidate_gets_bonuses() {
        // 1/1 exact → 0.8, +0.2 starts with, +0.1 substring, +0.1 all exact → capped
        assert_eq!(SimilarityScorer::score("Cement", "Cement 50kg bag"), 1.0);
    }

    #[test]
    fn test_partial_overlap() {
        // "steel" exact, "bars" partial against "bar": 0.8*0.5 + 0.4*0.5 = 0.6
        let score = SimilarityScorer::score("steel bars", "Steel Bar 12mm");
        assert!(approx(score, 0.6), "score was {}", score);
    }

    #[test]
    fn test_half_exact_without_bonus() {
        // "paint" exact, "white" missing: 0.8*0.5 = 0.4
        let score = SimilarityScorer::score("white paint", "Paint 20ltrs");
        assert!(approx(score, 0.4), "score was {}", score);
    }

    #[test]
    fn test_all_exact_reordered() {
        // both exact (0.8) + all-exact bonus (0.1), no prefix/substring
        let score = SimilarityScorer::score("bar steel", "steel bar");
        assert!(approx(score, 0.9), "score was {}", score);
    }

    #[test]
    fn test_overlap_counts() {
        let q = vec!["steel".to_string(), "bars".to_string(), "blue".to_string()];
        let c = vec!["steel".to_string(), "bar".to_string()];
        let overlap = KeywordOverlap::between(&q, &c);
        assert_eq!(overlap, KeywordOverlap { exact: 1, partial: 1, total: 3 });
    }

    #[test]
    fn test_quantity_gate() {
        assert!(SimilarityScorer::quantities_similar("Cement", 30.0, "Cement", 28.0, 0.1));
        assert!(!SimilarityScorer::quantities_similar("Cement", 30.0, "Cement", 5.0, 0.1));
    }
}
