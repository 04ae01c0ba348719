use crate::model::{HeadingCandidate, HeadingLevel, TocEntry};

use super::{OutlineParser, starts_with_lowercase};

impl OutlineParser {
    /// Appends bookmark entries that the Markdown pass did not already find on this page.
    ///
    /// Deduplication is by exact cleaned text against everything already kept for the page,
    /// so a bookmark repeated on the same page is only added once.
    pub fn reconcile_toc(
        &self,
        page_headings: Vec<HeadingCandidate>,
        toc_entries: &[TocEntry],
        page_index: usize,
    ) -> Vec<HeadingCandidate> {
        let mut merged = page_headings;

        for entry in toc_entries {
            let text = self.clean_heading_text(&entry.text);
            if text.is_empty() || starts_with_lowercase(&text) {
                continue;
            }
            if merged.iter().any(|heading| heading.text == text) {
                continue;
            }

            merged.push(HeadingCandidate {
                level: HeadingLevel::from_toc_level(entry.level),
                text,
                page: page_index + 1,
            });
        }

        merged
    }
}
