use tracing::debug;

use crate::model::{DocumentOutline, PageRecord, UNTITLED};

use super::normalize::normalize_punctuation;
use super::{OutlineParser, starts_with_lowercase};

const TITLE_PREFIX: &str = "# ";

/// Where the document title was found.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TitleMatch {
    pub text: String,
    pub page_index: usize,
    pub line_index: usize,
}

impl OutlineParser {
    /// First top-level `# ` line of the document with a usable cleaned text.
    ///
    /// `##` and deeper prefixes or bold-only lines never qualify, even though they can be
    /// H1 entries of the outline.
    pub fn detect_title(&self, pages: &[PageRecord]) -> Option<TitleMatch> {
        for (page_index, page) in pages.iter().enumerate() {
            for (line_index, raw_line) in self.lines(&page.text).enumerate() {
                let line = normalize_punctuation(raw_line.trim());
                let Some(rest) = line.strip_prefix(TITLE_PREFIX) else {
                    continue;
                };

                let candidate = self.clean_heading_text(rest.trim());
                if candidate.is_empty() || starts_with_lowercase(&candidate) {
                    continue;
                }

                return Some(TitleMatch {
                    text: candidate,
                    page_index,
                    line_index,
                });
            }
        }

        None
    }

    pub fn build_outline(&self, pages: &[PageRecord]) -> DocumentOutline {
        let title = self.detect_title(pages);
        let mut outline = Vec::new();

        for (page_index, page) in pages.iter().enumerate() {
            let headings = self.extract_page_headings(&page.text, page_index);
            let markdown_count = headings.len();
            let mut merged = self.reconcile_toc(headings, &page.toc_items, page_index);
            let toc_count = merged.len() - markdown_count;

            // The title line is an H1 candidate too. It still dedups bookmarks that repeat
            // the title, and only then leaves the outline.
            if let Some(found) = title.as_ref().filter(|found| found.page_index == page_index) {
                let position = self.title_position(&page.text, found.line_index);
                if position < markdown_count {
                    merged.remove(position);
                }
            }

            debug!(
                page = page_index + 1,
                markdown_headings = markdown_count,
                toc_headings = toc_count,
                "page outline assembled"
            );
            outline.extend(merged);
        }

        DocumentOutline {
            title: title
                .map(|found| found.text)
                .unwrap_or_else(|| UNTITLED.to_string()),
            outline,
        }
    }

    /// Index of the title's own candidate among the page's Markdown headings.
    fn title_position(&self, page_text: &str, title_line: usize) -> usize {
        self.lines(page_text)
            .take(title_line)
            .filter(|line| self.classify_line(line, 1).is_some())
            .count()
    }
}
