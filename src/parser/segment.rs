// ✂️ Batch Segmenter - split text on "-batch N-" markers

use once_cell::sync::Lazy;
use regex::Regex;

/// "-batch 2-", "- Batch 3 -", "-batch two-"
static BATCH_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)-\s*batch\s*([A-Za-z0-9]*)\s*-").expect("valid batch marker regex")
});

/// One segment of text belonging to a single batch
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// 1-based position among the segments
    pub ordinal: u32,

    /// Label as written in the marker ("2", "two", ""); None without markers
    pub label: Option<String>,

    pub body: String,
}

impl Segment {
    /// Number from the marker when it is a positive integer
    pub fn declared_number(&self) -> Option<u32> {
        self.label
            .as_deref()
            .and_then(|l| l.parse::<u32>().ok())
            .filter(|n| *n > 0)
    }

    /// Declared number, or the ordinal when the marker is missing or unusable
    pub fn batch_number(&self) -> u32 {
        self.declared_number().unwrap_or(self.ordinal)
    }

    /// True when a marker was present but its number could not be used
    pub fn has_invalid_label(&self) -> bool {
        self.label.is_some() && self.declared_number().is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Segmentation {
    /// Text before the first marker (empty when there are no markers)
    pub preamble: String,
    pub segments: Vec<Segment>,
}

impl Segmentation {
    pub fn has_markers(&self) -> bool {
        self.segments.iter().any(|s| s.label.is_some())
    }
}

pub struct BatchSegmenter;

impl BatchSegmenter {
    pub fn has_markers(text: &str) -> bool {
        BATCH_MARKER.is_match(text)
    }

    /// Without markers the whole text is batch 1
    pub fn split(text: &str) -> Segmentation {
        let markers: Vec<_> = BATCH_MARKER.captures_iter(text).collect();

        if markers.is_empty() {
            return Segmentation {
                preamble: String::new(),
                segments: vec![Segment {
                    ordinal: 1,
                    label: None,
                    body: text.trim().to_string(),
                }],
            };
        }

        let mut segmentation = Segmentation::default();
        let mut cursor = 0;
        let mut pending_label: Option<String> = None;

        for caps in &markers {
            // Group 0 always exists for a match
            let Some(whole) = caps.get(0) else { continue };
            let chunk = text[cursor..whole.start()].trim();

            match pending_label.take() {
                None => segmentation.preamble = chunk.to_string(),
                Some(label) => segmentation.segments.push(Segment {
                    ordinal: segmentation.segments.len() as u32 + 1,
                    label: Some(label),
                    body: chunk.to_string(),
                }),
            }

            pending_label = Some(caps[1].to_string());
            cursor = whole.end();
        }

        if let Some(label) = pending_label {
            segmentation.segments.push(Segment {
                ordinal: segmentation.segments.len() as u32 + 1,
                label: Some(label),
                body: text[cursor..].trim().to_string(),
            });
        }

        segmentation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_markers_is_single_batch() {
        let seg = BatchSegmenter::split("cement, 50 bags\nsteel bars, 100 pieces");
        assert_eq!(seg.segments.len(), 1);
        assert_eq!(seg.segments[0].batch_number(), 1);
        assert!(seg.preamble.is_empty());
        assert!(!seg.has_markers());
    }

    #[test]
    fn test_split_on_markers() {
        let text = "-batch 1-\nproject: mzuzu\nCement, 5\n-batch 2-\nproject: lilongwe\nSteel, 3";
        let seg = BatchSegmenter::split(text);

        assert_eq!(seg.segments.len(), 2);
        assert_eq!(seg.segments[0].batch_number(), 1);
        assert_eq!(seg.segments[0].body, "project: mzuzu\nCement, 5");
        assert_eq!(seg.segments[1].batch_number(), 2);
        assert_eq!(seg.segments[1].body, "project: lilongwe\nSteel, 3");
    }

    #[test]
    fn test_preamble_before_first_marker() {
        let text = "driver: Banda\n-batch 1-\nCement, 5";
        let seg = BatchSegmenter::split(text);

        assert_eq!(seg.preamble, "driver: Banda");
        assert_eq!(seg.segments.len(), 1);
    }

    #[test]
    fn test_marker_case_and_spacing() {
        let seg = BatchSegmenter::split("- BATCH 3 -\nSand, 2");
        assert_eq!(seg.segments[0].batch_number(), 3);
        assert_eq!(seg.segments[0].body, "Sand, 2");
    }

    #[test]
    fn test_invalid_label_falls_back_to_ordinal() {
        let seg = BatchSegmenter::split("-batch 1-\nCement, 5\n-batch two-\nSteel, 3");

        let second = &seg.segments[1];
        assert!(second.has_invalid_label());
        assert_eq!(second.batch_number(), 2);
        assert_eq!(second.label.as_deref(), Some("two"));
    }

    #[test]
    fn test_zero_is_invalid() {
        let seg = BatchSegmenter::split("-batch 0-\nCement, 5");
        assert!(seg.segments[0].has_invalid_label());
        assert_eq!(seg.segments[0].batch_number(), 1);
    }
}
