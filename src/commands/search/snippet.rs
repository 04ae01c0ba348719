use anyhow::{Context, Result};
use regex::Regex;

const SNIPPET_WINDOW_CHARS: usize = 200;

const LIGATURES: [(char, &str); 7] = [
    ('\u{fb00}', "ff"),
    ('\u{fb01}', "fi"),
    ('\u{fb02}', "fl"),
    ('\u{fb03}', "ffi"),
    ('\u{fb04}', "ffl"),
    ('\u{fb05}', "ft"),
    ('\u{fb06}', "st"),
];

/// Turns raw extracted chunk text into a readable single-line snippet.
pub(super) struct SnippetCleaner {
    heading_marks: Regex,
    inline_code: Regex,
    bold: Regex,
    italic_star: Regex,
    italic_underscore: Regex,
    space_run: Regex,
    line_breaks: Regex,
}

impl SnippetCleaner {
    pub(super) fn new() -> Result<Self> {
        Ok(Self {
            heading_marks: Regex::new(r"#+").context("failed to compile heading mark regex")?,
            inline_code: Regex::new(r"`([^`]+)`").context("failed to compile inline code regex")?,
            bold: Regex::new(r"\*\*([^*]+)\*\*").context("failed to compile bold regex")?,
            italic_star: Regex::new(r"\*([^*]+)\*").context("failed to compile italic regex")?,
            italic_underscore: Regex::new(r"_([^_]+)_")
                .context("failed to compile underscore emphasis regex")?,
            space_run: Regex::new(r"[ ]{2,}").context("failed to compile space run regex")?,
            line_breaks: Regex::new(r"\s*\n+\s*").context("failed to compile line break regex")?,
        })
    }

    pub(super) fn clean(&self, text: &str) -> String {
        let mut text = text.to_string();
        for (ligature, replacement) in LIGATURES {
            if text.contains(ligature) {
                text = text.replace(ligature, replacement);
            }
        }

        // Some extractors leave the bullet escape in the text literally.
        let text = text
            .replace("\\u2022", "-")
            .replace('\u{2022}', "-")
            .replace("-.", "-")
            .replace('\u{2019}', "'")
            .replace(['\u{201c}', '\u{201d}'], "\"");

        let text = self.heading_marks.replace_all(&text, "");
        let text = self.inline_code.replace_all(&text, "$1");
        let text = self.bold.replace_all(&text, "$1");
        let text = self.italic_star.replace_all(&text, "$1");
        let text = self.italic_underscore.replace_all(&text, "$1");
        let text = self.space_run.replace_all(&text, " ");
        let text = self.line_breaks.replace_all(&text, " ");

        let joined = text
            .split(". ")
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<&str>>()
            .join(". ");

        capitalize_first(joined.trim_matches([' ', '.']))
    }
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// The first 200 characters of a chunk, cut back to the last full stop inside them.
pub(super) fn snippet_window(text: &str) -> &str {
    let end = text
        .char_indices()
        .nth(SNIPPET_WINDOW_CHARS)
        .map(|(index, _)| index)
        .unwrap_or(text.len());
    super::chunking::trim_to_last_period(&text[..end])
}

/// First non-blank line of a chunk, trimmed.
pub(super) fn section_title(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string()
}
