use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Result, bail};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cli::{IndexArgs, SearchArgs};
use crate::model::{
    ExtractedSection, IndexCounts, IndexedPdf, SearchIndexManifest, SearchMetadata, SearchReport,
    SubsectionAnalysis,
};
use crate::render::{collect_tool_versions, extract_plain_pages};
use crate::semantic::{MODEL_ID_ENV, SemanticModelConfig, resolve_model_config};
use crate::util::{
    discover_pdfs, ensure_directory, file_name_string, now_utc_string, sha256_file,
    utc_compact_string, write_json_pretty,
};

use super::chunking::{PageDocument, RecursiveSplitter, chunk_documents};
use super::snippet::{SnippetCleaner, section_title, snippet_window};
use super::spec::load_search_spec;
use super::store::{
    ScoredChunk, count_chunks, insert_chunks, open_store, register_model, reset_store,
    similarity_search,
};

const INDEX_FILE_NAME: &str = "search_index.sqlite";

struct IndexOptions<'a> {
    data_dir: &'a Path,
    cache_root: &'a Path,
    index_path: &'a Path,
    chunk_size: usize,
    chunk_overlap: usize,
    max_pages_per_doc: Option<usize>,
}

pub fn run_index(args: IndexArgs) -> Result<()> {
    let model = resolve_model_config(
        args.model_id.as_deref(),
        std::env::var(MODEL_ID_ENV).ok().as_deref(),
    );
    if !args.data_dir.is_dir() {
        bail!("data directory not found: {}", args.data_dir.display());
    }

    let index_path = args
        .index_path
        .clone()
        .unwrap_or_else(|| args.cache_root.join(INDEX_FILE_NAME));

    let manifest = build_index(
        &IndexOptions {
            data_dir: &args.data_dir,
            cache_root: &args.cache_root,
            index_path: &index_path,
            chunk_size: args.chunk_size,
            chunk_overlap: args.chunk_overlap,
            max_pages_per_doc: args.max_pages_per_doc,
        },
        &model,
    )?;

    info!(
        index = %index_path.display(),
        pdfs = manifest.counts.pdf_count,
        chunks = manifest.counts.embedded_chunks,
        warnings = manifest.warnings.len(),
        "search index ready"
    );
    Ok(())
}

pub fn run(args: SearchArgs) -> Result<()> {
    let model = resolve_model_config(
        args.model_id.as_deref(),
        std::env::var(MODEL_ID_ENV).ok().as_deref(),
    );
    if !args.input.exists() {
        bail!("input file not found: {}", args.input.display());
    }

    let spec = load_search_spec(&args.input)?;
    let index_path = match (spec.persist_dir.as_deref(), args.index_path.as_deref()) {
        (Some(persist_dir), _) => persist_dir.join(INDEX_FILE_NAME),
        (None, Some(index_path)) => index_path.to_path_buf(),
        (None, None) => args.cache_root.join(INDEX_FILE_NAME),
    };

    if args.reuse_index && index_path.exists() {
        info!(index = %index_path.display(), "reusing existing search index");
    } else {
        build_index(
            &IndexOptions {
                data_dir: &spec.data_dir,
                cache_root: &args.cache_root,
                index_path: &index_path,
                chunk_size: args.chunk_size,
                chunk_overlap: args.chunk_overlap,
                max_pages_per_doc: None,
            },
            &model,
        )?;
    }

    let connection = open_store(&index_path)?;
    let stored = count_chunks(&connection, &model.model_id)?;
    if stored == 0 {
        warn!(
            index = %index_path.display(),
            model_id = %model.model_id,
            "search index holds no chunks for this model"
        );
    }

    let started = Instant::now();
    let hits = similarity_search(&connection, &spec.query, &model, args.top_k)?;
    for hit in &hits {
        debug!(chunk_id = %hit.chunk_id, page = hit.page, score = hit.score, "search hit");
    }
    let cleaner = SnippetCleaner::new()?;
    let report = format_report(spec.metadata, &hits, &cleaner);

    write_json_pretty(&args.output, &report)?;
    info!(
        output = %args.output.display(),
        hits = hits.len(),
        duration_ms = started.elapsed().as_millis(),
        "search results written"
    );
    Ok(())
}

fn build_index(options: &IndexOptions<'_>, model: &SemanticModelConfig) -> Result<SearchIndexManifest> {
    let started_at = now_utc_string();
    let started = Instant::now();
    let run_id = format!("index-{}", utc_compact_string(Utc::now()));

    let pdfs = discover_pdfs(options.data_dir)?;
    if pdfs.is_empty() {
        warn!(data_dir = %options.data_dir.display(), "no PDFs found to index");
    }

    let splitter = RecursiveSplitter::new(options.chunk_size, options.chunk_overlap);
    let mut warnings = Vec::<String>::new();
    let mut indexed = Vec::<IndexedPdf>::new();
    let mut chunks = Vec::new();

    for pdf_path in &pdfs {
        let filename = file_name_string(pdf_path);
        let pages = match extract_plain_pages(pdf_path, options.max_pages_per_doc) {
            Ok(pages) => pages,
            Err(error) => {
                warn!(path = %pdf_path.display(), error = %error, "skipping unreadable pdf");
                warnings.push(format!("{filename}: {error:#}"));
                continue;
            }
        };

        let documents = pages
            .into_iter()
            .enumerate()
            .map(|(index, text)| PageDocument {
                source: filename.clone(),
                page: index + 1,
                text,
            })
            .collect::<Vec<PageDocument>>();
        let pdf_chunks = chunk_documents(&documents, &splitter);

        indexed.push(IndexedPdf {
            filename: filename.clone(),
            sha256: sha256_file(pdf_path)?,
            page_count: documents.len(),
            chunk_count: pdf_chunks.len(),
        });
        info!(
            pdf = %filename,
            pages = documents.len(),
            chunks = pdf_chunks.len(),
            "pdf chunked"
        );
        chunks.extend(pdf_chunks);
    }

    if let Some(parent) = options.index_path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_directory(parent)?;
        }
    }
    let mut connection = reset_store(options.index_path)?;
    register_model(&connection, model)?;
    let inserted = insert_chunks(&mut connection, &chunks, model)?;

    let manifest = SearchIndexManifest {
        manifest_version: 1,
        run_id,
        started_at,
        completed_at: now_utc_string(),
        data_dir: options.data_dir.display().to_string(),
        index_path: options.index_path.display().to_string(),
        model_id: model.model_id.clone(),
        model_name: model.model_name.clone(),
        embedding_dim: model.dimensions,
        backend: model.backend.clone(),
        chunk_size: options.chunk_size,
        chunk_overlap: options.chunk_overlap,
        tool_versions: collect_tool_versions(),
        counts: IndexCounts {
            pdf_count: indexed.len(),
            page_count: indexed.iter().map(|pdf| pdf.page_count).sum(),
            chunk_count: chunks.len(),
            embedded_chunks: inserted.embedded,
            skipped_empty_chunks: inserted.skipped_empty,
        },
        pdfs: indexed,
        warnings,
    };

    let manifest_path = manifest_path(options.cache_root, &manifest.run_id);
    write_json_pretty(&manifest_path, &manifest)?;
    info!(
        manifest = %manifest_path.display(),
        embedded = inserted.embedded,
        skipped_empty = inserted.skipped_empty,
        duration_ms = started.elapsed().as_millis(),
        "search index built"
    );

    Ok(manifest)
}

fn manifest_path(cache_root: &Path, run_id: &str) -> PathBuf {
    let stamp = run_id.strip_prefix("index-").unwrap_or(run_id);
    cache_root
        .join("manifests")
        .join(format!("search_index_{stamp}.json"))
}

/// Ranks are 1-based and follow the hit order; both lists cover the same hits.
pub(super) fn format_report(
    metadata: SearchMetadata,
    hits: &[ScoredChunk],
    cleaner: &SnippetCleaner,
) -> SearchReport {
    let extracted_sections = hits
        .iter()
        .enumerate()
        .map(|(index, hit)| ExtractedSection {
            document: hit.source.clone(),
            section_title: section_title(&hit.text),
            rank: index + 1,
        })
        .collect();

    let subsection_analysis = hits
        .iter()
        .map(|hit| SubsectionAnalysis {
            document: hit.source.clone(),
            text: cleaner.clean(snippet_window(&hit.text)),
        })
        .collect();

    SearchReport {
        metadata,
        extracted_sections,
        subsection_analysis,
    }
}
