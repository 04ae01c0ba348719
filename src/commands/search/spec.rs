use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::model::SearchMetadata;
use crate::util::file_name_string;

const COMMON_DATA_DIRS: [&str; 5] = ["data", "PDFs", "pdfs", "documents", "docs"];

#[derive(Debug, Default, Deserialize)]
struct SearchSpec {
    query: Option<String>,
    challenge_info: Option<ChallengeInfo>,
    data_path: Option<String>,
    persist_dir: Option<String>,
    #[serde(default)]
    documents: Vec<serde_json::Value>,
    persona: Option<Persona>,
    job_to_be_done: Option<JobToBeDone>,
}

#[derive(Debug, Default, Deserialize)]
struct ChallengeInfo {
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Persona {
    role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct JobToBeDone {
    task: Option<String>,
}

/// A search spec with every path made absolute against the spec's own directory.
#[derive(Debug, Clone)]
pub(super) struct ResolvedSearchSpec {
    pub(super) query: String,
    pub(super) data_dir: PathBuf,
    pub(super) persist_dir: Option<PathBuf>,
    pub(super) metadata: SearchMetadata,
}

pub(super) fn load_search_spec(path: &Path) -> Result<ResolvedSearchSpec> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let spec: SearchSpec = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse search spec {}", path.display()))?;

    let spec_dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    resolve_search_spec(spec, &spec_dir)
}

fn resolve_search_spec(spec: SearchSpec, spec_dir: &Path) -> Result<ResolvedSearchSpec> {
    let query = spec
        .query
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .or_else(|| {
            spec.challenge_info
                .as_ref()
                .and_then(|info| info.description.as_deref())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        })
        .map(str::to_string);
    let Some(query) = query else {
        bail!("search spec must include a 'query' field or a 'challenge_info.description'");
    };

    let data_dir = match spec.data_path.as_deref() {
        Some(data_path) => resolve_relative(spec_dir, data_path),
        None => COMMON_DATA_DIRS
            .iter()
            .map(|name| spec_dir.join(name))
            .find(|candidate| candidate.exists())
            .unwrap_or_else(|| spec_dir.join("data")),
    };
    if !data_dir.is_dir() {
        bail!("data directory not found: {}", data_dir.display());
    }

    let persist_dir = spec
        .persist_dir
        .as_deref()
        .map(|value| resolve_relative(spec_dir, value));

    let metadata = SearchMetadata {
        input_documents: spec.documents.iter().filter_map(document_name).collect(),
        persona: spec
            .persona
            .and_then(|persona| persona.role)
            .unwrap_or_default(),
        job_to_be_done: spec
            .job_to_be_done
            .and_then(|job| job.task)
            .unwrap_or_default(),
    };

    Ok(ResolvedSearchSpec {
        query,
        data_dir,
        persist_dir,
        metadata,
    })
}

fn resolve_relative(base: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn document_name(value: &serde_json::Value) -> Option<String> {
    let raw = match value {
        serde_json::Value::String(name) => name.as_str(),
        serde_json::Value::Object(fields) => fields.get("filename")?.as_str()?,
        _ => return None,
    };
    Some(file_name_string(Path::new(raw)))
}
