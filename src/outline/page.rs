use crate::model::HeadingCandidate;

use super::OutlineParser;

impl OutlineParser {
    /// Heading candidates of one page in line order, stamped with the 1-based page number.
    pub fn extract_page_headings(&self, page_text: &str, page_index: usize) -> Vec<HeadingCandidate> {
        self.lines(page_text)
            .filter_map(|line| self.classify_line(line, page_index + 1))
            .collect()
    }
}
