// 🏗️ Command Parser - chat text → batches of movement items
//
// text → normalize → strip verb → segment on "-batch N-" → parameters per
// segment → item entries → defaults → validation. Errors are accumulated,
// never raised: a malformed entry costs one error, not the command.

pub mod assemble;
pub mod defaults;
pub mod items;
pub mod params;
pub mod segment;
pub mod validate;

pub use assemble::{MovementAssembler, StockMovement};
pub use defaults::DefaultsResolver;
pub use items::LineItemParser;
pub use params::GlobalParameterExtractor;
pub use segment::BatchSegmenter;
pub use validate::BatchValidator;

use crate::config::ParserConfig;
use crate::error::{BatchError, IntakeError, Result};
use crate::movement::{Batch, GlobalParameters, MovementKind, ParseFormat, ParseResult};
use crate::text::TextNormalizer;
use tracing::debug;

pub const MISSING_VERB: &str =
    "Could not determine movement type. Please start with /in, /out, or /adjust.";

/// Separators seen in the item regions of a command
#[derive(Debug, Default, Clone, Copy)]
struct FormatTracker {
    item_lines: usize,
    semicolons: bool,
}

impl FormatTracker {
    fn format(&self) -> ParseFormat {
        match (self.item_lines > 1, self.semicolons) {
            (true, true) => ParseFormat::Mixed,
            (true, false) => ParseFormat::Newline,
            (false, true) => ParseFormat::Semicolon,
            (false, false) => ParseFormat::Single,
        }
    }
}

pub struct CommandParser {
    validator: BatchValidator,
}

impl CommandParser {
    pub fn new() -> Self {
        CommandParser {
            validator: BatchValidator::new(),
        }
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        CommandParser {
            validator: BatchValidator::from_config(config),
        }
    }

    /// Parse with the kind taken from the leading verb
    pub fn parse_command(&self, text: &str) -> Result<ParseResult> {
        let normalized = TextNormalizer::normalize(text);
        match TextNormalizer::strip_verb(&normalized) {
            (Some(kind), _) => Ok(self.parse(text, kind)),
            (None, _) => Err(IntakeError::Validation(MISSING_VERB.to_string())),
        }
    }

    /// Parse a command for `kind`. Never fails: problems land in `errors`.
    pub fn parse(&self, text: &str, kind: MovementKind) -> ParseResult {
        let mut errors: Vec<BatchError> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();
        let mut tracker = FormatTracker::default();

        let normalized = TextNormalizer::normalize(text);
        let (verb, remainder) = TextNormalizer::strip_verb(&normalized);
        if let Some(verb) = verb.filter(|v| *v != kind) {
            errors.push(
                BatchError::validation(format!(
                    "Command verb '{}' does not match movement type {}",
                    verb.verb(),
                    kind.name().to_uppercase()
                ))
                .with_suggestion(format!("Start the command with /{}", kind.verb())),
            );
        }

        let segmentation = BatchSegmenter::split(&remainder);

        let mut shared = GlobalParameters::new();
        if !segmentation.preamble.is_empty() {
            let lines: Vec<&str> = segmentation.preamble.lines().collect();
            let extracted = GlobalParameterExtractor::extract(&lines);
            shared = extracted.parameters;

            if !extracted.item_lines.is_empty() {
                errors.push(
                    BatchError::parsing(format!(
                        "Items found before the first batch marker: '{}'",
                        extracted.item_lines.join("; ")
                    ))
                    .with_suggestion("Place items after a -batch N- marker"),
                );
            }
        }

        let mut batches = Vec::with_capacity(segmentation.segments.len());
        for segment in &segmentation.segments {
            let number = segment.batch_number();

            if segment.has_invalid_label() {
                errors.push(
                    BatchError::parsing(format!(
                        "Invalid batch number '{}', using {}",
                        segment.label.as_deref().unwrap_or_default(),
                        number
                    ))
                    .in_batch(number)
                    .with_suggestion("Number batches like -batch 1-, -batch 2-"),
                );
            }

            let batch = self.parse_segment(kind, number, &segment.body, &shared, &mut tracker, &mut errors);

            if let Err(e) = self.validator.validate_batch(kind, &batch) {
                errors.extend(e);
            }
            warnings.extend(self.validator.warnings(&batch));
            batches.push(batch);
        }

        let format = tracker.format();
        if !errors.is_empty() && format == ParseFormat::Mixed {
            warnings.push(
                "Tip: For clearer batch commands, try using either all newlines or all semicolons, not mixed format."
                    .to_string(),
            );
        }

        let result = ParseResult::new(kind, format, batches, errors, warnings);
        debug!(
            kind = %kind,
            format = ?result.format,
            batches = result.batches.len(),
            items = result.total_items,
            errors = result.errors.len(),
            "parsed command"
        );
        result
    }

    /// Parameters, entries and defaults of one batch
    fn parse_segment(
        &self,
        kind: MovementKind,
        number: u32,
        body: &str,
        shared: &GlobalParameters,
        tracker: &mut FormatTracker,
        errors: &mut Vec<BatchError>,
    ) -> Batch {
        let lines: Vec<&str> = body.lines().collect();
        let extracted = GlobalParameterExtractor::extract(&lines);

        let mut batch = Batch::new(number);
        batch.parameters = extracted.parameters;
        batch.parameters.inherit_from(shared);

        let mut index = 0;
        for (line_no, line) in extracted.item_lines.iter().enumerate() {
            // The first line may be the leftover of the last parameter line
            let misplaced = if line_no == 0 {
                GlobalParameterExtractor::is_parameter_line(line)
            } else {
                GlobalParameterExtractor::scan_line(line).is_some()
            };
            if misplaced {
                errors.push(
                    BatchError::parsing(format!("Parameter line found after items: '{}'", line))
                        .in_batch(number)
                        .with_suggestion("Move key: value lines to the top of the batch"),
                );
                continue;
            }

            let entries = items::split_entries(line);
            if entries.is_empty() {
                continue;
            }
            tracker.item_lines += 1;
            tracker.semicolons |= line.contains(';');

            for entry in entries {
                let (verb, remainder) = TextNormalizer::strip_verb(&entry);
                match verb {
                    Some(other) if other != kind => {
                        errors.push(
                            BatchError::validation(format!(
                                "Movement type {} differs from first entry type {}",
                                other.name().to_uppercase(),
                                kind.name().to_uppercase()
                            ))
                            .in_batch(number)
                            .at_entry(index, entry.clone())
                            .with_suggestion("All entries must use the same movement type"),
                        );
                    }
                    _ => match LineItemParser::parse_entry(&remainder) {
                        Ok(item) => batch.items.push(item),
                        Err(e) => errors.push(e.in_batch(number).at_entry(index, entry.clone())),
                    },
                }
                index += 1;
            }
        }

        let defaulted = DefaultsResolver::resolve(kind, &mut batch.parameters);
        if !defaulted.is_empty() {
            debug!(batch = number, defaulted = ?defaulted, "applied movement defaults");
        }

        batch
    }
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::movement::{ParamKey, NOT_DESCRIBED};

    #[test]
    fn test_single_line_with_parameters() {
        let parser = CommandParser::new();
        let result = parser.parse("in project: Bridge, cement, 50 bags", MovementKind::In);

        assert!(result.is_valid, "{:?}", result.errors);
        assert_eq!(result.format, ParseFormat::Single);
        assert_eq!(result.batches[0].param(ParamKey::Project), Some("Bridge"));
        assert_eq!(result.batches[0].items[0].name, "cement");
    }

    #[test]
    fn test_semicolon_format() {
        let parser = CommandParser::new();
        let result = parser.parse("/out cement, 5; sand, 2 bags; stones, 1", MovementKind::Out);

        assert!(result.is_valid);
        assert_eq!(result.format, ParseFormat::Semicolon);
        assert_eq!(result.total_items, 3);
    }

    #[test]
    fn test_mixed_format() {
        let parser = CommandParser::new();
        let result = parser.parse("in cement, 5; sand, 2\nstones, 1", MovementKind::In);

        assert_eq!(result.format, ParseFormat::Mixed);
        assert_eq!(result.total_items, 3);
    }

    #[test]
    fn test_malformed_entry_does_not_abort() {
        let parser = CommandParser::new();
        let result = parser.parse("in cement, 5\nsand lots\nstones, 2", MovementKind::In);

        assert!(!result.is_valid);
        assert_eq!(result.total_items, 2);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::Parsing);
        assert_eq!(result.errors[0].entry_index, Some(1));
    }

    #[test]
    fn test_verb_mismatch() {
        let parser = CommandParser::new();
        let result = parser.parse("out cement, 5", MovementKind::In);

        assert!(!result.is_valid);
        assert_eq!(result.errors[0].kind, ErrorKind::Validation);
        assert_eq!(result.total_items, 1);
    }

    #[test]
    fn test_parse_command_infers_kind() {
        let parser = CommandParser::new();
        let result = parser.parse_command("/adjust cement, -3").unwrap();
        assert_eq!(result.kind, MovementKind::Adjust);
        assert!(result.is_valid);

        let err = parser.parse_command("cement, 3").unwrap_err();
        assert!(err.to_string().contains("Could not determine movement type"));
    }

    #[test]
    fn test_preamble_inherited_by_batches() {
        let parser = CommandParser::new();
        let text = "out driver: Banda\n-batch 1-\nto: Site A\nCement, 5\n-batch 2-\nSteel, 3";
        let result = parser.parse(text, MovementKind::Out);

        assert!(result.is_valid, "{:?}", result.errors);
        assert_eq!(result.batches[0].param(ParamKey::Driver), Some("Banda"));
        assert_eq!(result.batches[0].param(ParamKey::To), Some("Site A"));
        assert_eq!(result.batches[1].param(ParamKey::Driver), Some("Banda"));
        assert_eq!(result.batches[1].param(ParamKey::To), Some("external"));
    }

    #[test]
    fn test_items_before_first_marker() {
        let parser = CommandParser::new();
        let result = parser.parse("in cement, 5\n-batch 1-\nsand, 2", MovementKind::In);

        assert!(!result.is_valid);
        assert!(result.errors[0].message.contains("before the first batch marker"));
    }

    #[test]
    fn test_invalid_batch_number() {
        let parser = CommandParser::new();
        let result = parser.parse("in -batch x-\ncement, 5", MovementKind::In);

        assert!(!result.is_valid);
        assert_eq!(result.batches[0].batch_number, 1);
        assert!(result.errors[0].message.contains("Invalid batch number 'x'"));
    }

    #[test]
    fn test_parameter_after_items() {
        let parser = CommandParser::new();
        let result = parser.parse("out cement, 5\nto: Site B", MovementKind::Out);

        assert!(!result.is_valid);
        assert_eq!(result.errors[0].kind, ErrorKind::Parsing);
        assert!(result.errors[0].suggestion.as_deref().unwrap().contains("top of the batch"));
    }

    #[test]
    fn test_parameter_with_items_after_items() {
        let parser = CommandParser::new();
        let result = parser.parse("out cement, 5\nto: Site B, sand, 2", MovementKind::Out);

        assert!(!result.is_valid);
        assert_eq!(result.total_items, 1);
        assert!(result.errors[0].message.contains("Parameter line found after items"));
    }

    #[test]
    fn test_leftover_of_parameter_line_is_items() {
        let parser = CommandParser::new();
        let result = parser.parse("out to: Site B, sand, 2\ncement, 5", MovementKind::Out);

        assert!(result.is_valid, "{:?}", result.errors);
        assert_eq!(result.total_items, 2);
    }

    #[test]
    fn test_entry_with_other_verb_is_rejected() {
        let parser = CommandParser::new();
        let result = parser.parse("/in cement, 5\n/out sand, 2", MovementKind::In);

        assert!(!result.is_valid);
        assert_eq!(result.total_items, 1);
        assert_eq!(result.batches[0].items[0].name, "cement");
        assert_eq!(result.errors[0].kind, ErrorKind::Validation);
        assert_eq!(result.errors[0].entry_index, Some(1));
        assert!(result.errors[0]
            .message
            .contains("Movement type OUT differs from first entry type IN"));
    }

    #[test]
    fn test_entry_with_same_verb_is_stripped() {
        let parser = CommandParser::new();
        let result = parser.parse("/in cement, 5\nin sand, 2; /IN stones, 1", MovementKind::In);

        assert!(result.is_valid, "{:?}", result.errors);
        let names: Vec<_> = result.batches[0].items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["cement", "sand", "stones"]);
    }

    #[test]
    fn test_adjust_defaults() {
        let parser = CommandParser::new();
        let result = parser.parse("adjust cement, -2", MovementKind::Adjust);

        assert!(result.is_valid);
        assert_eq!(result.batches[0].param(ParamKey::Project), Some(NOT_DESCRIBED));
        assert_eq!(result.batches[0].param(ParamKey::From), None);
    }

    #[test]
    fn test_large_quantity_warns() {
        let parser = CommandParser::new();
        let result = parser.parse("in nails, 20000", MovementKind::In);

        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_configured_cap() {
        let parser = CommandParser::from_config(&ParserConfig {
            max_items_per_batch: 1,
            ..ParserConfig::default()
        });
        let result = parser.parse("in cement, 5; sand, 2", MovementKind::In);
        assert!(!result.is_valid);
    }
}
