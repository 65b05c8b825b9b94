// 🔑 Keyword Extractor - name normalization and significant-word extraction
// Used to compare item names without a fixed schema

/// Words that carry no identity in an item name
const STOP_WORDS: &[&str] = &[
    "the", "and", "or", "of", "in", "on", "at", "to", "for", "with", "by", "a", "an", "is", "are",
    "was", "were", "be", "been", "being", "have", "has", "had", "do", "does", "did", "will",
    "would", "could", "should",
];

pub struct KeywordExtractor;

impl KeywordExtractor {
    /// Lowercase, strip punctuation and collapse whitespace.
    /// A '.' between two digits survives so "2.5" stays one token.
    pub fn normalize(name: &str) -> String {
        let chars: Vec<char> = name.chars().collect();
        let mut cleaned = String::with_capacity(name.len());

        for (i, &c) in chars.iter().enumerate() {
            if c.is_alphanumeric() {
                cleaned.extend(c.to_lowercase());
            } else if c == '.' && Self::between_digits(&chars, i) {
                cleaned.push('.');
            } else {
                cleaned.push(' ');
            }
        }

        cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn between_digits(chars: &[char], i: usize) -> bool {
        i > 0
            && chars[i - 1].is_ascii_digit()
            && chars.get(i + 1).map_or(false, |c| c.is_ascii_digit())
    }

    /// Significant words of a name, in order, without repeats.
    /// Numeric tokens are always kept; stop-words and 1-char words are dropped.
    pub fn keywords(name: &str) -> Vec<String> {
        let normalized = Self::normalize(name);
        let mut keywords: Vec<String> = Vec::new();

        for token in normalized.split(' ').filter(|t| !t.is_empty()) {
            let numeric = Self::is_numeric(token);
            if !numeric && (token.chars().count() < 2 || STOP_WORDS.contains(&token)) {
                continue;
            }
            if !keywords.iter().any(|k| k == token) {
                keywords.push(token.to_string());
            }
        }

        keywords
    }

    pub fn is_numeric(token: &str) -> bool {
        !token.is_empty() && token.parse::<f64>().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_punctuation() {
        assert_eq!(
            KeywordExtractor::normalize("  Steel-Bar,  12mm (Grade A) "),
            "steel bar 12mm grade a"
        );
    }

    #[test]
    fn test_normalize_keeps_decimal_points() {
        assert_eq!(KeywordExtractor::normalize("Cable 2.5sqmm."), "cable 2.5sqmm");
        assert_eq!(KeywordExtractor::normalize("Bolt M8.Zinc"), "bolt m8 zinc");
    }

    #[test]
    fn test_keywords_drop_stop_words_and_short_tokens() {
        assert_eq!(
            KeywordExtractor::keywords("Box of the x nails"),
            vec!["box", "nails"]
        );
    }

    #[test]
    fn test_keywords_keep_numbers() {
        assert_eq!(
            KeywordExtractor::keywords("Pipe 4 inch 4"),
            vec!["pipe", "4", "inch"]
        );
    }

    #[test]
    fn test_keywords_empty_name() {
        assert!(KeywordExtractor::keywords("  ,;  ").is_empty());
        assert!(KeywordExtractor::keywords("the and of").is_empty());
    }
}
