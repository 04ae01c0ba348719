//! Heading outline recovery from Markdown-flavored page text.
//!
//! Every line is classified on its own; embedded bookmark entries are folded in per page
//! after the Markdown-derived headings.

use anyhow::{Context, Result};
use regex::Regex;

mod classify;
mod document;
mod normalize;
mod page;
#[cfg(test)]
mod tests;
mod toc;


/// Compiled heuristics shared by every outline operation.
#[derive(Debug, Clone)]
pub struct OutlineParser {
    line_break: Regex,
    separator_line: Regex,
    inline_code: Regex,
    bold_span: Regex,
    bold_line: Regex,
    trailing_page_number: Regex,
    punctuation_run: Regex,
}

impl OutlineParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            line_break: Regex::new(r"\r\n|[\n\r\x0B\x0C\x1C-\x1E\x{85}\x{2028}\x{2029}]")
                .context("failed to compile line break regex")?,
            separator_line: Regex::new(r#"^[.\-*,="']{2,}\s*$"#)
                .context("failed to compile separator line regex")?,
            inline_code: Regex::new(r"`([^`]+)`").context("failed to compile inline code regex")?,
            bold_span: Regex::new(r"_?\*\*(.*?)\*\*_?")
                .context("failed to compile bold span regex")?,
            bold_line: Regex::new(r"^_?\*\*(.*?)\*\*_?$")
                .context("failed to compile bold line regex")?,
            trailing_page_number: Regex::new(r"\b\d+$")
                .context("failed to compile trailing page number regex")?,
            punctuation_run: Regex::new(r#"[.\-,"=]{2,}"#)
                .context("failed to compile punctuation run regex")?,
        })
    }

    /// Splits page text on every Unicode line boundary, not just `\n` and `\r\n`.
    fn lines<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> {
        self.line_break.split(text)
    }
}

/// Title Case and CAPS lines pass; a lowercase ASCII start marks body text.
fn starts_with_lowercase(text: &str) -> bool {
    text.chars()
        .next()
        .map(|character| character.is_ascii_lowercase())
        .unwrap_or(false)
}
