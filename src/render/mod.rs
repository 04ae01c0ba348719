//! PDF to page text conversion through the poppler command line tools.
//!
//! `pdftohtml -xml` gives positioned text with font sizes and the bookmark tree; from that
//! we produce Markdown-flavored page text (font-size headings, bold-only lines) plus the
//! bookmark entries pointing at each page. `pdftotext` supplies plain page text for search.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use regex::Regex;
use tracing::debug;

use crate::model::{PageRecord, TocEntry, ToolVersions};


const HEADING_MARKERS: [&str; 4] = ["#", "##", "###", "####"];
const HEADING_MAX_CHARS: usize = 160;

#[derive(Debug, Clone)]
struct TextFragment {
    top: i64,
    font_id: String,
    text: String,
    bold: bool,
}

#[derive(Debug, Clone)]
struct RenderedLine {
    size_key: i64,
    text: String,
    bold: bool,
}

pub struct PdfRenderer {
    fontspec: Regex,
    page_block: Regex,
    text_fragment: Regex,
    outline_token: Regex,
    bold_segment: Regex,
    markup_tag: Regex,
}

impl PdfRenderer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            fontspec: Regex::new(r#"<fontspec\s+id="([^"]+)"\s+size="(-?\d+(?:\.\d+)?)""#)
                .context("failed to compile fontspec regex")?,
            page_block: Regex::new(r#"(?s)<page\s+number="(\d+)"[^>]*>(.*?)</page>"#)
                .context("failed to compile page block regex")?,
            text_fragment: Regex::new(
                r#"(?s)<text\s+top="(-?\d+(?:\.\d+)?)"[^>]*?\sfont="([^"]+)"[^>]*>(.*?)</text>"#,
            )
            .context("failed to compile text fragment regex")?,
            outline_token: Regex::new(r#"(?s)<outline>|</outline>|<item\s+page="(\d+)"[^>]*>(.*?)</item>"#)
                .context("failed to compile outline item regex")?,
            bold_segment: Regex::new(r"(?s)<b>.*?</b>").context("failed to compile bold regex")?,
            markup_tag: Regex::new(r"</?[A-Za-z][^>]*>").context("failed to compile markup regex")?,
        })
    }

    pub fn render_pdf(&self, pdf_path: &Path, max_pages: Option<usize>) -> Result<Vec<PageRecord>> {
        let xml = run_pdftohtml(pdf_path, max_pages)?;
        let pages = self.pages_from_xml(&xml);
        debug!(path = %pdf_path.display(), pages = pages.len(), "rendered pdf pages");
        Ok(pages)
    }

    /// Converts `pdftohtml -xml` output into per-page Markdown text and bookmark entries.
    pub fn pages_from_xml(&self, xml: &str) -> Vec<PageRecord> {
        let font_sizes = self.font_sizes(xml);

        let mut page_numbers = Vec::<i64>::new();
        let mut page_lines = Vec::<Vec<RenderedLine>>::new();
        for captures in self.page_block.captures_iter(xml) {
            let number = captures
                .get(1)
                .and_then(|value| value.as_str().parse::<i64>().ok())
                .unwrap_or((page_numbers.len() + 1) as i64);
            let body = captures.get(2).map(|value| value.as_str()).unwrap_or_default();

            page_numbers.push(number);
            page_lines.push(self.page_lines(body, &font_sizes));
        }

        let body_size = body_size_key(&page_lines);
        let heading_sizes = heading_size_ranks(&page_lines, body_size);

        let mut pages = page_lines
            .iter()
            .map(|lines| {
                let text = lines
                    .iter()
                    .map(|line| render_markdown_line(line, body_size, &heading_sizes))
                    .collect::<Vec<String>>()
                    .join("\n");
                PageRecord::new(text, Vec::new())
            })
            .collect::<Vec<PageRecord>>();

        for (page_number, entry) in self.outline_entries(xml) {
            let Some(index) = page_numbers.iter().position(|number| *number == page_number) else {
                continue;
            };
            if let Some(page) = pages.get_mut(index) {
                page.toc_items.push(entry);
            }
        }

        pages
    }

    fn font_sizes(&self, xml: &str) -> HashMap<String, i64> {
        let mut sizes = HashMap::new();
        for captures in self.fontspec.captures_iter(xml) {
            let (Some(id), Some(size)) = (captures.get(1), captures.get(2)) else {
                continue;
            };
            let Ok(size) = size.as_str().parse::<f64>() else {
                continue;
            };
            sizes
                .entry(id.as_str().to_string())
                .or_insert_with(|| size_key(size));
        }
        sizes
    }

    fn page_lines(&self, body: &str, font_sizes: &HashMap<String, i64>) -> Vec<RenderedLine> {
        let mut fragments = Vec::<TextFragment>::new();
        for captures in self.text_fragment.captures_iter(body) {
            let top = captures
                .get(1)
                .and_then(|value| value.as_str().parse::<f64>().ok())
                .map(|value| value.round() as i64)
                .unwrap_or_default();
            let font_id = captures
                .get(2)
                .map(|value| value.as_str().to_string())
                .unwrap_or_default();
            let inner = captures.get(3).map(|value| value.as_str()).unwrap_or_default();

            let text = self.plain_text(inner);
            if text.is_empty() {
                continue;
            }
            let outside_bold = self.plain_text(&self.bold_segment.replace_all(inner, ""));

            fragments.push(TextFragment {
                top,
                font_id,
                text,
                bold: outside_bold.is_empty(),
            });
        }

        let mut lines = Vec::<(i64, String, RenderedLine)>::new();
        for fragment in fragments {
            let size = font_sizes.get(&fragment.font_id).copied().unwrap_or_default();
            if let Some((top, font_id, line)) = lines.last_mut() {
                if *top == fragment.top && *font_id == fragment.font_id {
                    line.text.push(' ');
                    line.text.push_str(&fragment.text);
                    line.bold = line.bold && fragment.bold;
                    continue;
                }
            }

            lines.push((
                fragment.top,
                fragment.font_id,
                RenderedLine {
                    size_key: size,
                    text: fragment.text,
                    bold: fragment.bold,
                },
            ));
        }

        lines.into_iter().map(|(_, _, line)| line).collect()
    }

    fn outline_entries(&self, xml: &str) -> Vec<(i64, TocEntry)> {
        let mut depth = 0i64;
        let mut entries = Vec::new();

        for captures in self.outline_token.captures_iter(xml) {
            let token = captures.get(0).map(|value| value.as_str()).unwrap_or_default();
            if token == "<outline>" {
                depth += 1;
                continue;
            }
            if token == "</outline>" {
                depth = (depth - 1).max(0);
                continue;
            }

            let Some(page_number) = captures
                .get(1)
                .and_then(|value| value.as_str().parse::<i64>().ok())
            else {
                continue;
            };
            let label = self.plain_text(captures.get(2).map(|value| value.as_str()).unwrap_or_default());
            if label.is_empty() {
                continue;
            }

            entries.push((page_number, TocEntry::new(depth.max(1), label)));
        }

        entries
    }

    fn plain_text(&self, markup: &str) -> String {
        let stripped = self.markup_tag.replace_all(markup, "");
        decode_entities(&stripped)
            .split_whitespace()
            .collect::<Vec<&str>>()
            .join(" ")
    }
}

fn size_key(size: f64) -> i64 {
    (size * 10.0).round() as i64
}

/// The font size carrying the most characters is the body size.
fn body_size_key(pages: &[Vec<RenderedLine>]) -> i64 {
    let mut chars_by_size = HashMap::<i64, usize>::new();
    for line in pages.iter().flatten() {
        *chars_by_size.entry(line.size_key).or_insert(0) += line.text.chars().count();
    }

    chars_by_size
        .into_iter()
        .max_by(|left, right| left.1.cmp(&right.1).then(right.0.cmp(&left.0)))
        .map(|(size, _)| size)
        .unwrap_or_default()
}

fn heading_size_ranks(pages: &[Vec<RenderedLine>], body_size: i64) -> Vec<i64> {
    let mut sizes = pages
        .iter()
        .flatten()
        .filter(|line| line.size_key > body_size && is_heading_length(&line.text))
        .map(|line| line.size_key)
        .collect::<Vec<i64>>();
    sizes.sort_unstable_by(|left, right| right.cmp(left));
    sizes.dedup();
    sizes
}

fn is_heading_length(text: &str) -> bool {
    text.chars().count() <= HEADING_MAX_CHARS
}

fn render_markdown_line(line: &RenderedLine, body_size: i64, heading_sizes: &[i64]) -> String {
    if line.size_key > body_size && is_heading_length(&line.text) {
        if let Some(rank) = heading_sizes.iter().position(|size| *size == line.size_key) {
            let marker = HEADING_MARKERS[rank.min(HEADING_MARKERS.len() - 1)];
            return format!("{} {}", marker, line.text);
        }
    }

    if line.bold {
        return format!("**{}**", line.text);
    }

    line.text.clone()
}

fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let decoded = tail
            .find(';')
            .filter(|end| *end <= 10)
            .and_then(|end| decode_entity(&tail[1..end]).map(|value| (value, end)));

        match decoded {
            Some((value, end)) => {
                out.push(value);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse::<u32>().ok()?,
            };
            let character = char::from_u32(code)?;
            if character == '\u{00a0}' {
                Some(' ')
            } else {
                Some(character)
            }
        }
    }
}

fn run_pdftohtml(pdf_path: &Path, max_pages: Option<usize>) -> Result<String> {
    let mut command = Command::new("pdftohtml");
    command
        .arg("-xml")
        .arg("-i")
        .arg("-q")
        .arg("-stdout")
        .arg("-enc")
        .arg("UTF-8")
        .arg("-f")
        .arg("1");
    if let Some(max_pages) = max_pages {
        command.arg("-l").arg(max_pages.to_string());
    }
    command.arg(pdf_path);

    let output = command
        .output()
        .with_context(|| format!("failed to execute pdftohtml for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftohtml returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    Ok(String::from_utf8_lossy(&output.stdout).replace('\u{0000}', ""))
}

/// Plain text of every page, in page order.
pub fn extract_plain_pages(pdf_path: &Path, max_pages: Option<usize>) -> Result<Vec<String>> {
    let mut command = Command::new("pdftotext");
    command.arg("-enc").arg("UTF-8").arg("-f").arg("1");
    if let Some(max_pages) = max_pages {
        command.arg("-l").arg(max_pages.to_string());
    }
    command.arg(pdf_path).arg("-");

    let output = command
        .output()
        .with_context(|| format!("failed to execute pdftotext for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftotext returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    Ok(split_form_feed_pages(&String::from_utf8_lossy(&output.stdout)))
}

fn split_form_feed_pages(raw: &str) -> Vec<String> {
    let mut pages: Vec<String> = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect();

    while let Some(last_page) = pages.last() {
        if last_page.trim().is_empty() {
            pages.pop();
            continue;
        }
        break;
    }

    pages
}

/// Pages rendered ahead of time by another converter, as a JSON array of page objects.
pub fn load_pages_json(path: &Path) -> Result<Vec<PageRecord>> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let pages: Vec<PageRecord> = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse page records from {}", path.display()))?;
    Ok(pages)
}

pub fn collect_tool_versions() -> ToolVersions {
    ToolVersions {
        pdftotext: command_version_optional("pdftotext", &["-v"]),
        pdftohtml: command_version_optional("pdftohtml", &["-v"]),
    }
}

fn command_version_optional(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim()
    } else {
        stdout.trim()
    };

    source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
}
