// 🧾 Line Item Parser - "item, quantity unit, [note]" entries
//
// Grammar (one entry):
//   entry    := clause ("," clause)*
//   quantity := the LAST clause whose first non-space char starts a number
//   name     := clauses before the quantity clause, re-joined with ", "
//   trailing := clauses after it; "key: value" → per-item override, else note
//   qty      := sign? (digits ("." digits)? | "." digits) ws* unit?
//
// Anchoring at the last numeric clause lets names carry numbers
// ("Steel Bar 12mm, 5 pieces").

use crate::error::BatchError;
use crate::movement::{BatchItem, GlobalParameters};
use crate::parser::params::GlobalParameterExtractor;
use crate::units::{self, DEFAULT_UNIT};

pub const FORMAT_SUGGESTION: &str = "Check format: item, quantity unit, [note]";

/// Split an item region into entries on newlines and semicolons
pub fn split_entries(region: &str) -> Vec<String> {
    region
        .split(|c: char| c == '\n' || c == ';')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// QUANTITY CLAUSE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct QuantityClause {
    pub value: f64,
    pub unit: Option<String>,
}

struct Cursor<'a> {
    chars: Vec<char>,
    pos: usize,
    src: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Cursor {
            chars: src.chars().collect(),
            pos: 0,
            src,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek().filter(|c| pred(*c)) {
            out.push(c);
            self.pos += 1;
        }
        out
    }

    fn rest(&self) -> String {
        self.chars[self.pos.min(self.chars.len())..].iter().collect()
    }
}

/// True when a clause begins with something that reads as a number
pub fn starts_with_numeral(clause: &str) -> bool {
    let cursor = Cursor::new(clause.trim_start());
    let mut offset = 0;
    if matches!(cursor.peek(), Some('+') | Some('-')) {
        offset = 1;
    }
    match cursor.peek_at(offset) {
        Some(c) if c.is_ascii_digit() => true,
        Some('.') => cursor.peek_at(offset + 1).map_or(false, |c| c.is_ascii_digit()),
        _ => false,
    }
}

/// Parse "50 bags", "-3", "2.5kg". Unit aliases are normalized when known.
pub fn parse_quantity_clause(clause: &str) -> Result<QuantityClause, String> {
    let trimmed = clause.trim();
    let mut cursor = Cursor::new(trimmed);

    let mut number = String::new();
    if let Some(sign) = cursor.peek().filter(|c| *c == '+' || *c == '-') {
        cursor.bump();
        if sign == '-' {
            number.push('-');
        }
    }

    number.push_str(&cursor.eat_while(|c| c.is_ascii_digit()));
    if cursor.peek() == Some('.') {
        cursor.bump();
        let fraction = cursor.eat_while(|c| c.is_ascii_digit());
        if fraction.is_empty() {
            return Err(format!("Invalid quantity '{}'", cursor.src));
        }
        number.push('.');
        number.push_str(&fraction);
    }

    // "5.3.1", "5..3"
    if cursor.peek() == Some('.') {
        return Err(format!("Invalid quantity '{}'", cursor.src));
    }

    let value: f64 = number
        .parse()
        .map_err(|_| format!("Invalid quantity '{}'", cursor.src))?;
    if !value.is_finite() {
        return Err(format!("Invalid quantity '{}'", cursor.src));
    }

    let unit_text = cursor.rest();
    let unit_text = unit_text.trim();
    let unit = if unit_text.is_empty() {
        None
    } else {
        Some(
            units::canonical_unit(unit_text)
                .map(str::to_string)
                .unwrap_or_else(|| unit_text.to_string()),
        )
    };

    Ok(QuantityClause { value, unit })
}

// ============================================================================
// ENTRY PARSER
// ============================================================================

pub struct LineItemParser;

impl LineItemParser {
    /// Parse one entry. Errors carry the suggestion but no batch/entry position;
    /// callers attach those.
    pub fn parse_entry(entry: &str) -> Result<BatchItem, BatchError> {
        let clauses: Vec<&str> = entry.split(',').map(str::trim).collect();

        let Some(qty_index) = clauses.iter().rposition(|c| starts_with_numeral(c)) else {
            return Err(BatchError::parsing("Could not find a quantity")
                .with_suggestion(FORMAT_SUGGESTION));
        };

        let quantity = parse_quantity_clause(clauses[qty_index])
            .map_err(|msg| BatchError::parsing(msg).with_suggestion(FORMAT_SUGGESTION))?;

        let name = clauses[..qty_index]
            .iter()
            .filter(|c| !c.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", ");
        let name = Self::clean_name(&name);

        let mut note_parts: Vec<&str> = Vec::new();
        let mut overrides = GlobalParameters::new();
        for clause in clauses[qty_index + 1..].iter().filter(|c| !c.is_empty()) {
            match GlobalParameterExtractor::parse_pair(clause) {
                Some((key, value)) => {
                    overrides.insert(key, value);
                }
                None => note_parts.push(clause),
            }
        }

        let mut item = BatchItem::new(name, quantity.value);
        item.overrides = overrides;
        if !note_parts.is_empty() {
            item = item.with_note(note_parts.join(", "));
        }

        let size = units::infer_size(&item.name);
        item.unit = match (quantity.unit, size) {
            (Some(unit), _) => Some(unit),
            (None, Some(_)) => Some(DEFAULT_UNIT.to_string()),
            (None, None) => None,
        };
        if let Some((size, unit_type)) = size {
            item = item.with_size(size, unit_type);
        }

        Ok(item)
    }

    /// Collapse whitespace and drop list bullets ("- ", "* ", "• ")
    fn clean_name(raw: &str) -> String {
        let trimmed = raw
            .trim()
            .trim_start_matches(|c: char| c == '-' || c == '*' || c == '•')
            .trim();
        trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::movement::ParamKey;

    #[test]
    fn test_split_entries_mixed_separators() {
        let entries = split_entries("cement, 5\nsand, 2; stones, 3;\n\n");
        assert_eq!(entries, vec!["cement, 5", "sand, 2", "stones, 3"]);
    }

    #[test]
    fn test_simple_entry() {
        let item = LineItemParser::parse_entry("cement, 50 bags").unwrap();
        assert_eq!(item.name, "cement");
        assert_eq!(item.quantity, 50.0);
        assert_eq!(item.unit.as_deref(), Some("bag"));
        assert!(item.note.is_none());
    }

    #[test]
    fn test_name_with_numbers_anchors_on_last_numeric_clause() {
        let item = LineItemParser::parse_entry("Steel Bar 12mm, 5 pieces").unwrap();
        assert_eq!(item.name, "Steel Bar 12mm");
        assert_eq!(item.quantity, 5.0);
        assert_eq!(item.unit.as_deref(), Some("piece"));
        assert_eq!(item.unit_size, Some(12.0));
        assert_eq!(item.unit_type.as_deref(), Some("mm"));
    }

    #[test]
    fn test_size_in_name_defaults_unit_to_piece() {
        let item = LineItemParser::parse_entry("Paint 20ltrs, 4").unwrap();
        assert_eq!(item.unit.as_deref(), Some("piece"));
        assert_eq!(item.unit_size, Some(20.0));
        assert_eq!(item.unit_type.as_deref(), Some("ltr"));
    }

    #[test]
    fn test_note_and_override_clauses() {
        let item =
            LineItemParser::parse_entry("Cement, 10 bags, for slab, to: Site B, urgent").unwrap();
        assert_eq!(item.note.as_deref(), Some("for slab, urgent"));
        assert_eq!(item.overrides.get(ParamKey::To), Some("Site B"));
    }

    #[test]
    fn test_decimal_and_signed_quantities() {
        assert_eq!(LineItemParser::parse_entry("Wire, 2.5 m").unwrap().quantity, 2.5);
        assert_eq!(LineItemParser::parse_entry("Sand, -3").unwrap().quantity, -3.0);
        assert_eq!(LineItemParser::parse_entry("Sand, .5").unwrap().quantity, 0.5);
    }

    #[test]
    fn test_free_text_unit_kept() {
        let item = LineItemParser::parse_entry("Timber, 6 lengths").unwrap();
        assert_eq!(item.unit.as_deref(), Some("lengths"));
    }

    #[test]
    fn test_missing_quantity_is_parsing_error() {
        let err = LineItemParser::parse_entry("cement fifty bags").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parsing);
        assert_eq!(err.suggestion.as_deref(), Some(FORMAT_SUGGESTION));
    }

    #[test]
    fn test_malformed_number_is_parsing_error() {
        let err = LineItemParser::parse_entry("cement, 5..3 bags").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parsing);
        assert!(err.message.contains("Invalid quantity"));
    }

    #[test]
    fn test_missing_name_parses_empty() {
        let item = LineItemParser::parse_entry("50 bags").unwrap();
        assert!(item.name.is_empty());
    }

    #[test]
    fn test_bullets_stripped() {
        let item = LineItemParser::parse_entry("- cement, 5").unwrap();
        assert_eq!(item.name, "cement");
    }
}
