use serde::{Deserialize, Deserializer, Serialize};

pub const UNTITLED: &str = "Untitled";

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
}

impl HeadingLevel {
    /// Bookmark depths 1..=3 keep their level, anything else is folded into H3.
    pub fn from_toc_level(level: i64) -> Self {
        match level {
            1 => Self::H1,
            2 => Self::H2,
            _ => Self::H3,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct HeadingCandidate {
    pub level: HeadingLevel,
    pub text: String,
    pub page: usize,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct DocumentOutline {
    pub title: String,
    pub outline: Vec<HeadingCandidate>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TocEntry {
    pub level: i64,
    pub text: String,
}

impl TocEntry {
    pub fn new(level: i64, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }

    fn from_json(value: &serde_json::Value) -> Option<Self> {
        let items = value.as_array()?;
        if items.len() < 2 {
            return None;
        }

        let level = items[0].as_i64()?;
        let text = items[1].as_str()?;
        Some(Self::new(level, text))
    }
}

impl Serialize for TocEntry {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        (self.level, &self.text).serialize(serializer)
    }
}

/// One rendered page as handed over by the PDF converter.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    #[serde(default)]
    pub text: String,
    #[serde(
        default,
        alias = "tocItems",
        deserialize_with = "deserialize_toc_items"
    )]
    pub toc_items: Vec<TocEntry>,
}

impl PageRecord {
    pub fn new(text: impl Into<String>, toc_items: Vec<TocEntry>) -> Self {
        Self {
            text: text.into(),
            toc_items,
        }
    }
}

// Converters emit `[level, title, page, ...]` arrays; anything else is dropped.
fn deserialize_toc_items<'de, D>(deserializer: D) -> Result<Vec<TocEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .iter()
        .filter_map(TocEntry::from_json)
        .collect())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchMetadata {
    pub input_documents: Vec<String>,
    pub persona: String,
    pub job_to_be_done: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedSection {
    pub document: String,
    pub section_title: String,
    pub rank: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubsectionAnalysis {
    pub document: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub metadata: SearchMetadata,
    pub extracted_sections: Vec<ExtractedSection>,
    pub subsection_analysis: Vec<SubsectionAnalysis>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolVersions {
    pub pdftotext: Option<String>,
    pub pdftohtml: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexedPdf {
    pub filename: String,
    pub sha256: String,
    pub page_count: usize,
    pub chunk_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexCounts {
    pub pdf_count: usize,
    pub page_count: usize,
    pub chunk_count: usize,
    pub embedded_chunks: usize,
    pub skipped_empty_chunks: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchIndexManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub started_at: String,
    pub completed_at: String,
    pub data_dir: String,
    pub index_path: String,
    pub model_id: String,
    pub model_name: String,
    pub embedding_dim: usize,
    pub backend: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub tool_versions: ToolVersions,
    pub counts: IndexCounts,
    pub pdfs: Vec<IndexedPdf>,
    pub warnings: Vec<String>,
}
