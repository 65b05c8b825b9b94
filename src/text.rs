// 🧹 Text Normalizer - whitespace/case cleanup and verb stripping

use crate::movement::MovementKind;

pub struct TextNormalizer;

impl TextNormalizer {
    /// Unify line endings, collapse runs of spaces/tabs and drop blank lines.
    /// Case is preserved: item names keep what the user typed.
    pub fn normalize(text: &str) -> String {
        text.replace("\r\n", "\n")
            .replace('\r', "\n")
            .lines()
            .map(Self::collapse_whitespace)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn collapse_whitespace(s: &str) -> String {
        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Case-folded, whitespace-collapsed form for comparisons
    pub fn fold(s: &str) -> String {
        Self::collapse_whitespace(s).to_lowercase()
    }

    /// Remove a leading movement verb ("in", "/out", "/adjust@StockBot").
    /// Returns the recognized kind (if any) and the remaining text.
    pub fn strip_verb(text: &str) -> (Option<MovementKind>, String) {
        let trimmed = text.trim_start();
        let token_end = trimmed
            .find(char::is_whitespace)
            .unwrap_or(trimmed.len());
        let token = &trimmed[..token_end];

        // Chat clients may suffix commands with the bot handle
        let verb = match token.split_once('@') {
            Some((head, _)) if head.starts_with('/') => head,
            _ => token,
        };

        match MovementKind::from_verb(verb) {
            Some(kind) => (Some(kind), trimmed[token_end..].trim_start().to_string()),
            None => (None, trimmed.to_string()),
        }
    }
}
