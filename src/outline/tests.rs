use proptest::prelude::*;

use super::normalize::normalize_punctuation;
use super::*;
use crate::model::{DocumentOutline, HeadingCandidate, HeadingLevel, PageRecord, TocEntry};

fn parser() -> OutlineParser {
    OutlineParser::new().expect("outline regexes should compile")
}

fn heading(level: HeadingLevel, text: &str, page: usize) -> HeadingCandidate {
    HeadingCandidate {
        level,
        text: text.to_string(),
        page,
    }
}

#[test]
fn normalize_punctuation_maps_smart_quotes_dashes_and_ellipsis() {
    assert_eq!(
        normalize_punctuation("\u{2018}a\u{2019} \u{201C}b\u{201D} c\u{2013}d\u{2014}e\u{2026}"),
        "'a' \"b\" c-d-e..."
    );
    assert_eq!(normalize_punctuation(""), "");
    assert_eq!(normalize_punctuation("Plain ASCII"), "Plain ASCII");
    assert_eq!(normalize_punctuation("Zürich • 東京"), "Zürich • 東京");
}

#[test]
fn clean_heading_text_unwraps_code_and_bold() {
    let parser = parser();
    assert_eq!(parser.clean_heading_text("**Bold text** with `backticks`"), "Bold text with backticks");
    assert_eq!(parser.clean_heading_text("_**Overview**_"), "Overview");
    assert_eq!(parser.clean_heading_text("Stray ` tick"), "Stray tick");
}

#[test]
fn clean_heading_text_strips_trailing_page_numbers() {
    let parser = parser();
    assert_eq!(parser.clean_heading_text("Introduction 12"), "Introduction");
    assert_eq!(parser.clean_heading_text("Chapter12"), "Chapter12");
    assert_eq!(parser.clean_heading_text("2024"), "");
}

#[test]
fn clean_heading_text_drops_leader_dots_and_separators() {
    let parser = parser();
    assert_eq!(parser.clean_heading_text("Scope ........ 4"), "Scope");
    assert_eq!(parser.clean_heading_text("Results == Summary"), "Results Summary");
    assert_eq!(parser.clean_heading_text("Mid\u{2026}way"), "Midway");
    assert_eq!(parser.clean_heading_text("   \t "), "");
}

#[test]
fn clean_heading_text_reaches_a_fixed_point() {
    let parser = parser();
    assert_eq!(parser.clean_heading_text("Intro 3 4"), "Intro");
    assert_eq!(parser.clean_heading_text("Intro 3.."), "Intro");
}

#[test]
fn classify_line_maps_markdown_prefixes_to_outline_levels() {
    let parser = parser();
    assert_eq!(
        parser.classify_line("# Introduction 3", 1),
        Some(heading(HeadingLevel::H1, "Introduction", 1))
    );
    assert_eq!(
        parser.classify_line("## Scope", 2),
        Some(heading(HeadingLevel::H1, "Scope", 2))
    );
    assert_eq!(
        parser.classify_line("### Background", 2),
        Some(heading(HeadingLevel::H2, "Background", 2))
    );
    assert_eq!(
        parser.classify_line("   #### Details   ", 3),
        Some(heading(HeadingLevel::H3, "Details", 3))
    );
    assert_eq!(parser.classify_line("##### Too deep", 1), None);
    assert_eq!(parser.classify_line("#NoSpace", 1), None);
}

#[test]
fn classify_line_rejects_lowercase_starts() {
    let parser = parser();
    assert_eq!(parser.classify_line("### background information", 1), None);
    assert_eq!(parser.classify_line("**continued from above**", 1), None);
    assert!(parser.classify_line("# 1. overview", 1).is_some());
}

#[test]
fn classify_line_treats_bold_only_lines_as_h3() {
    let parser = parser();
    assert_eq!(
        parser.classify_line("**Summary**", 4),
        Some(heading(HeadingLevel::H3, "Summary", 4))
    );
    assert_eq!(
        parser.classify_line("_**Key Findings**_", 4),
        Some(heading(HeadingLevel::H3, "Key Findings", 4))
    );
    assert_eq!(parser.classify_line("**Note:** see below", 4), None);
    assert_eq!(parser.classify_line("Plain body text.", 4), None);
}

#[test]
fn classify_line_discards_separator_artifacts() {
    let parser = parser();
    for line in ["....................", "----", "**", "'''", ",,", "  \"\"\"  ", "=-=-"] {
        assert_eq!(parser.classify_line(line, 1), None, "line {line:?}");
    }
    assert_eq!(parser.classify_line("# ........", 1), None);
}

#[test]
fn classify_line_normalizes_unicode_punctuation_in_text() {
    let parser = parser();
    assert_eq!(
        parser.classify_line("## Authors\u{2019} Notes \u{2014} Draft", 1),
        Some(heading(HeadingLevel::H1, "Authors' Notes - Draft", 1))
    );
}

#[test]
fn extract_page_headings_keeps_line_order_and_page_number() {
    let parser = parser();
    let text = "Intro paragraph\n## First\nbody\n**Second**\n### third lower\n#### Fourth";
    let headings = parser.extract_page_headings(text, 2);
    assert_eq!(
        headings,
        vec![
            heading(HeadingLevel::H1, "First", 3),
            heading(HeadingLevel::H3, "Second", 3),
            heading(HeadingLevel::H3, "Fourth", 3),
        ]
    );
    assert!(parser.extract_page_headings("", 0).is_empty());
}

#[test]
fn extract_page_headings_splits_on_every_line_boundary() {
    let parser = parser();
    assert_eq!(
        parser.extract_page_headings("## Alpha\r## Beta\r**Gamma**", 0),
        vec![
            heading(HeadingLevel::H1, "Alpha", 1),
            heading(HeadingLevel::H1, "Beta", 1),
            heading(HeadingLevel::H3, "Gamma", 1),
        ]
    );
    assert_eq!(
        parser.extract_page_headings("## One\u{2028}### Two\x0c#### Three\u{85}body", 1),
        vec![
            heading(HeadingLevel::H1, "One", 2),
            heading(HeadingLevel::H2, "Two", 2),
            heading(HeadingLevel::H3, "Three", 2),
        ]
    );
}

#[test]
fn reconcile_toc_appends_only_new_entries() {
    let parser = parser();
    let page_headings = vec![heading(HeadingLevel::H1, "Results", 1)];
    let toc = vec![TocEntry::new(2, "Results"), TocEntry::new(1, "Appendix")];

    let merged = parser.reconcile_toc(page_headings, &toc, 0);
    assert_eq!(
        merged,
        vec![
            heading(HeadingLevel::H1, "Results", 1),
            heading(HeadingLevel::H1, "Appendix", 1),
        ]
    );
}

#[test]
fn reconcile_toc_clamps_levels_and_filters_entries() {
    let parser = parser();
    let toc = vec![
        TocEntry::new(3, "Deep Section 7"),
        TocEntry::new(5, "Deeper Still"),
        TocEntry::new(0, "Zero Level"),
        TocEntry::new(1, "lowercase entry"),
        TocEntry::new(1, "......"),
        TocEntry::new(2, "Repeated"),
        TocEntry::new(1, "Repeated"),
    ];

    let merged = parser.reconcile_toc(Vec::new(), &toc, 4);
    assert_eq!(
        merged,
        vec![
            heading(HeadingLevel::H3, "Deep Section", 5),
            heading(HeadingLevel::H3, "Deeper Still", 5),
            heading(HeadingLevel::H3, "Zero Level", 5),
            heading(HeadingLevel::H2, "Repeated", 5),
        ]
    );
}

#[test]
fn reconcile_toc_dedup_is_exact_match_only() {
    let parser = parser();
    let page_headings = vec![heading(HeadingLevel::H2, "Methods", 1)];
    let toc = vec![TocEntry::new(2, "METHODS"), TocEntry::new(2, "Methods 9")];

    let merged = parser.reconcile_toc(page_headings, &toc, 0);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[1], heading(HeadingLevel::H2, "METHODS", 1));
}

#[test]
fn build_outline_uses_first_top_level_heading_as_title() {
    let parser = parser();
    let pages = vec![PageRecord::new("# My Document\nBody text.\n## Section One", Vec::new())];

    assert_eq!(
        parser.build_outline(&pages),
        DocumentOutline {
            title: "My Document".to_string(),
            outline: vec![heading(HeadingLevel::H1, "Section One", 1)],
        }
    );
}

#[test]
fn build_outline_defaults_to_untitled() {
    let parser = parser();
    let pages = vec![
        PageRecord::new("## Only Second Level\n**Bold Line**", Vec::new()),
        PageRecord::new("# lowercase title", Vec::new()),
    ];

    let outline = parser.build_outline(&pages);
    assert_eq!(outline.title, "Untitled");
    assert_eq!(outline.outline.len(), 2);

    assert_eq!(parser.build_outline(&[]).title, "Untitled");
}

#[test]
fn build_outline_finds_title_on_later_page() {
    let parser = parser();
    let pages = vec![
        PageRecord::new("cover art\n# \n# ....", Vec::new()),
        PageRecord::new("# Annual Report 2\n# Overview", Vec::new()),
    ];

    let outline = parser.build_outline(&pages);
    assert_eq!(outline.title, "Annual Report");
    assert_eq!(outline.outline, vec![heading(HeadingLevel::H1, "Overview", 2)]);

    let found = parser.detect_title(&pages).expect("title should be found");
    assert_eq!(found.page_index, 1);
    assert_eq!(found.line_index, 0);
}

#[test]
fn build_outline_orders_pages_then_markdown_then_toc() {
    let parser = parser();
    let pages = vec![
        PageRecord::new(
            "# Guide\n## Setup\n### Install",
            vec![TocEntry::new(1, "Setup"), TocEntry::new(2, "Requirements")],
        ),
        PageRecord::new("", vec![TocEntry::new(1, "Usage")]),
        PageRecord::new("## Reference\n**Flags**", vec![TocEntry::new(4, "Exit Codes")]),
    ];

    let outline = parser.build_outline(&pages);
    assert_eq!(outline.title, "Guide");
    assert_eq!(
        outline.outline,
        vec![
            heading(HeadingLevel::H1, "Setup", 1),
            heading(HeadingLevel::H2, "Install", 1),
            heading(HeadingLevel::H2, "Requirements", 1),
            heading(HeadingLevel::H1, "Usage", 2),
            heading(HeadingLevel::H1, "Reference", 3),
            heading(HeadingLevel::H3, "Flags", 3),
            heading(HeadingLevel::H3, "Exit Codes", 3),
        ]
    );
}

#[test]
fn build_outline_keeps_repeated_top_level_headings_after_the_title() {
    let parser = parser();
    let pages = vec![PageRecord::new("# Handbook\n# Handbook", Vec::new())];

    let outline = parser.build_outline(&pages);
    assert_eq!(outline.title, "Handbook");
    assert_eq!(outline.outline, vec![heading(HeadingLevel::H1, "Handbook", 1)]);
}

#[test]
fn build_outline_splits_title_page_on_carriage_returns() {
    let parser = parser();
    let pages = vec![PageRecord::new("# Title\r## Section", Vec::new())];

    let outline = parser.build_outline(&pages);
    assert_eq!(outline.title, "Title");
    assert_eq!(outline.outline, vec![heading(HeadingLevel::H1, "Section", 1)]);
}

#[test]
fn build_outline_does_not_re_add_a_bookmark_matching_the_title() {
    let parser = parser();
    let pages = vec![PageRecord::new(
        "# Guide\n## Setup",
        vec![TocEntry::new(1, "Guide"), TocEntry::new(2, "Appendix")],
    )];

    let outline = parser.build_outline(&pages);
    assert_eq!(outline.title, "Guide");
    assert_eq!(
        outline.outline,
        vec![
            heading(HeadingLevel::H1, "Setup", 1),
            heading(HeadingLevel::H2, "Appendix", 1),
        ]
    );
}

#[test]
fn build_outline_removes_only_the_title_line_itself() {
    let parser = parser();
    let pages = vec![PageRecord::new("## Guide\n**Notes**\n# Guide\nIntro", Vec::new())];

    let outline = parser.build_outline(&pages);
    assert_eq!(outline.title, "Guide");
    assert_eq!(
        outline.outline,
        vec![
            heading(HeadingLevel::H1, "Guide", 1),
            heading(HeadingLevel::H3, "Notes", 1),
        ]
    );
}

#[test]
fn document_outline_serializes_to_wire_shape() {
    let outline = DocumentOutline {
        title: "Doc".to_string(),
        outline: vec![heading(HeadingLevel::H2, "Part", 3)],
    };

    let value = serde_json::to_value(&outline).expect("outline should serialize");
    assert_eq!(
        value,
        serde_json::json!({
            "title": "Doc",
            "outline": [{"level": "H2", "text": "Part", "page": 3}]
        })
    );
}

proptest! {
    #[test]
    fn clean_heading_text_is_idempotent(text in "\\PC{0,80}") {
        let parser = parser();
        let once = parser.clean_heading_text(&text);
        prop_assert_eq!(parser.clean_heading_text(&once), once);
    }

    #[test]
    fn clean_heading_text_is_idempotent_on_markdown_noise(text in "[#*_`.,=\"' a-zA-Z0-9\u{2019}\u{2014}\u{2026}-]{0,60}") {
        let parser = parser();
        let once = parser.clean_heading_text(&text);
        prop_assert_eq!(parser.clean_heading_text(&once), once);
    }

    #[test]
    fn normalize_punctuation_leaves_no_smart_punctuation(text in "\\PC{0,120}") {
        let normalized = normalize_punctuation(&text);
        let smart = ['\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2013}', '\u{2014}', '\u{2026}'];
        prop_assert!(!normalized.contains(smart), "smart punctuation left in {:?}", normalized);
    }

    #[test]
    fn separator_only_lines_are_never_headings(line in "[.*,=\"'-]{2,40}") {
        let parser = parser();
        prop_assert_eq!(parser.classify_line(&line, 1), None);
    }

    #[test]
    fn classified_headings_satisfy_text_invariants(line in "\\PC{0,80}") {
        let parser = parser();
        if let Some(candidate) = parser.classify_line(&line, 1) {
            prop_assert!(!candidate.text.is_empty());
            prop_assert!(!candidate.text.starts_with(|c: char| c.is_ascii_lowercase()));
            prop_assert!(!candidate.text.contains('`'));
            prop_assert_eq!(parser.clean_heading_text(&candidate.text), candidate.text);
        }
    }
}
