use crate::model::{HeadingCandidate, HeadingLevel};

use super::normalize::normalize_punctuation;
use super::{OutlineParser, starts_with_lowercase};

// `#` and `##` both land on H1: the outline is one level flatter than the Markdown.
const HEADING_PREFIXES: [(&str, HeadingLevel); 4] = [
    ("# ", HeadingLevel::H1),
    ("## ", HeadingLevel::H1),
    ("### ", HeadingLevel::H2),
    ("#### ", HeadingLevel::H3),
];

impl OutlineParser {
    /// Decides whether one source line is a heading, and at which outline level.
    pub fn classify_line(&self, raw_line: &str, page: usize) -> Option<HeadingCandidate> {
        let trimmed = raw_line.trim();
        if self.separator_line.is_match(trimmed) {
            return None;
        }

        let line = normalize_punctuation(trimmed);
        let (level, segment) = self.heading_segment(&line)?;

        let text = self.clean_heading_text(segment);
        if text.is_empty() || starts_with_lowercase(&text) {
            return None;
        }

        Some(HeadingCandidate { level, text, page })
    }

    fn heading_segment<'a>(&self, line: &'a str) -> Option<(HeadingLevel, &'a str)> {
        for (prefix, level) in HEADING_PREFIXES {
            if let Some(rest) = line.strip_prefix(prefix) {
                return Some((level, rest.trim()));
            }
        }

        if self.bold_line.is_match(line) {
            return Some((HeadingLevel::H3, line));
        }

        None
    }
}
