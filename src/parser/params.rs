// 🏷️ Global Parameter Extractor - leading "key: value" pairs of a segment

use crate::movement::{GlobalParameters, ParamKey};
use once_cell::sync::Lazy;
use regex::Regex;

/// "key: value" where key is a short run of letters/spaces/dashes
static PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z][A-Za-z _-]{0,20}?)\s*:\s*(.*?)\s*$").expect("valid pair regex")
});

/// One line scanned for parameters
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamLine {
    pub pairs: Vec<(ParamKey, String)>,

    /// Text after the last pair (start of the item region)
    pub rest: Option<String>,
}

/// Parameters at the head of a segment plus where the items begin
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractedParameters {
    pub parameters: GlobalParameters,

    /// Item region: leftover of the last parameter line followed by the remaining lines
    pub item_lines: Vec<String>,
}

pub struct GlobalParameterExtractor;

impl GlobalParameterExtractor {
    /// Recognize a single "key: value" clause
    pub fn parse_pair(clause: &str) -> Option<(ParamKey, String)> {
        let caps = PAIR.captures(clause)?;
        let key = ParamKey::parse(&caps[1])?;
        Some((key, caps[2].to_string()))
    }

    /// Scan a line clause by clause (',' or ';'), collecting pairs until the
    /// first clause that is not a recognized pair. None when the line does not
    /// start with a recognized key.
    pub fn scan_line(line: &str) -> Option<ParamLine> {
        let mut result = ParamLine::default();
        let mut start = 0;

        loop {
            let end = line[start..]
                .find(|c: char| c == ',' || c == ';')
                .map(|i| start + i)
                .unwrap_or(line.len());

            match Self::parse_pair(&line[start..end]) {
                Some(pair) => result.pairs.push(pair),
                None => {
                    let rest = line[start..].trim();
                    if !rest.is_empty() {
                        result.rest = Some(rest.to_string());
                    }
                    break;
                }
            }

            if end >= line.len() {
                break;
            }
            start = end + 1;
        }

        if result.pairs.is_empty() {
            None
        } else {
            Some(result)
        }
    }

    /// Consume leading parameter lines; the first non-parameter line (or the
    /// leftover text of a parameter line) starts the item region.
    pub fn extract(lines: &[&str]) -> ExtractedParameters {
        let mut extracted = ExtractedParameters::default();
        let mut index = 0;

        while index < lines.len() {
            let Some(scanned) = Self::scan_line(lines[index]) else {
                break;
            };
            index += 1;

            for (key, value) in scanned.pairs {
                extracted.parameters.insert(key, value);
            }
            if let Some(rest) = scanned.rest {
                extracted.item_lines.push(rest);
                break;
            }
        }

        extracted
            .item_lines
            .extend(lines[index..].iter().map(|l| l.to_string()));
        extracted
    }

    /// True if the line looks like a parameter line (used to flag misplaced ones)
    pub fn is_parameter_line(line: &str) -> bool {
        Self::scan_line(line).map_or(false, |p| p.rest.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pair() {
        assert_eq!(
            GlobalParameterExtractor::parse_pair(" Project : Mzuzu Bridge "),
            Some((ParamKey::Project, "Mzuzu Bridge".to_string()))
        );
        assert_eq!(
            GlobalParameterExtractor::parse_pair("logged by: Chisomo"),
            Some((ParamKey::LoggedBy, "Chisomo".to_string()))
        );
        assert_eq!(GlobalParameterExtractor::parse_pair("colour: red"), None);
        assert_eq!(GlobalParameterExtractor::parse_pair("cement"), None);
    }

    #[test]
    fn test_scan_line_multiple_pairs() {
        let scanned = GlobalParameterExtractor::scan_line("driver: J, to: Site A").unwrap();
        assert_eq!(scanned.pairs.len(), 2);
        assert_eq!(scanned.pairs[1], (ParamKey::To, "Site A".to_string()));
        assert!(scanned.rest.is_none());
    }

    #[test]
    fn test_scan_line_with_trailing_items() {
        let scanned =
            GlobalParameterExtractor::scan_line("project: Bridge, cement, 50 bags; sand, 2").unwrap();
        assert_eq!(scanned.pairs, vec![(ParamKey::Project, "Bridge".to_string())]);
        assert_eq!(scanned.rest.as_deref(), Some("cement, 50 bags; sand, 2"));
    }

    #[test]
    fn test_scan_line_not_a_parameter() {
        assert!(GlobalParameterExtractor::scan_line("cement, 50 bags").is_none());
    }

    #[test]
    fn test_blank_value_is_kept_but_unset() {
        let extracted = GlobalParameterExtractor::extract(&["project:", "cement, 5"]);
        assert_eq!(extracted.parameters.get(ParamKey::Project), Some(""));
        assert!(!extracted.parameters.is_set(ParamKey::Project));
        assert_eq!(extracted.item_lines, vec!["cement, 5"]);
    }

    #[test]
    fn test_extract_stops_at_first_item_line() {
        let lines = ["project: mzuzu", "driver: Banda", "Cement, 5", "to: Site B"];
        let extracted = GlobalParameterExtractor::extract(&lines);

        assert_eq!(extracted.parameters.get(ParamKey::Project), Some("mzuzu"));
        assert_eq!(extracted.parameters.get(ParamKey::Driver), Some("Banda"));
        assert_eq!(extracted.item_lines, vec!["Cement, 5", "to: Site B"]);
        assert!(GlobalParameterExtractor::is_parameter_line(&extracted.item_lines[1]));
    }
}
