use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags, params};

use crate::semantic::{
    SemanticModelConfig, chunk_payload_for_embedding, cosine_similarity, decode_embedding_blob,
    embedding_text_hash, encode_embedding_blob,
};
use crate::util::now_utc_string;

use super::chunking::TextChunk;

pub(super) const STORE_SCHEMA_VERSION: &str = "1";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) struct InsertCounts {
    pub(super) embedded: usize,
    pub(super) skipped_empty: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct ScoredChunk {
    pub(super) chunk_id: String,
    pub(super) source: String,
    pub(super) page: usize,
    pub(super) text: String,
    pub(super) score: f64,
}

/// Deletes any previous index at `path` and opens a fresh one.
pub(super) fn reset_store(path: &Path) -> Result<Connection> {
    for stale in [
        path.to_path_buf(),
        sidecar_path(path, "-wal"),
        sidecar_path(path, "-shm"),
    ] {
        if stale.exists() {
            fs::remove_file(&stale)
                .with_context(|| format!("failed to remove stale index: {}", stale.display()))?;
        }
    }

    let connection = Connection::open(path)
        .with_context(|| format!("failed to create search index: {}", path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;
    Ok(connection)
}

pub(super) fn open_store(path: &Path) -> Result<Connection> {
    let connection = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("failed to open search index: {}", path.display()))?;
    configure_connection(&connection)?;
    ensure_schema(&connection)?;
    Ok(connection)
}

fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(suffix);
    PathBuf::from(raw)
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

pub(super) fn ensure_schema(connection: &Connection) -> Result<()> {
    connection.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS embedding_models (
          model_id TEXT PRIMARY KEY,
          backend TEXT NOT NULL,
          model_name TEXT NOT NULL,
          dimensions INTEGER NOT NULL,
          normalize INTEGER NOT NULL,
          created_at TEXT NOT NULL,
          config_json TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chunks (
          chunk_id TEXT PRIMARY KEY,
          source TEXT NOT NULL,
          page INTEGER NOT NULL,
          chunk_seq INTEGER NOT NULL,
          text TEXT NOT NULL,
          text_hash TEXT NOT NULL,
          embedding BLOB NOT NULL,
          embedding_dim INTEGER NOT NULL,
          model_id TEXT NOT NULL,
          FOREIGN KEY (model_id) REFERENCES embedding_models(model_id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_chunks_model ON chunks(model_id);
        CREATE INDEX IF NOT EXISTS idx_chunks_source_page ON chunks(source, page);
        ",
    )?;

    connection.execute(
        "
        INSERT INTO metadata(key, value) VALUES('schema_version', ?1)
        ON CONFLICT(key) DO UPDATE SET value=excluded.value
        ",
        [STORE_SCHEMA_VERSION],
    )?;

    Ok(())
}

pub(super) fn register_model(connection: &Connection, model: &SemanticModelConfig) -> Result<()> {
    let config_json = serde_json::to_string(model).context("failed to serialize model config")?;

    connection.execute(
        "
        INSERT INTO embedding_models(model_id, backend, model_name, dimensions, normalize, created_at, config_json)
        VALUES(?1, ?2, ?3, ?4, 1, ?5, ?6)
        ON CONFLICT(model_id) DO UPDATE SET
          backend=excluded.backend,
          model_name=excluded.model_name,
          dimensions=excluded.dimensions,
          normalize=excluded.normalize,
          config_json=excluded.config_json
        ",
        params![
            model.model_id,
            model.backend,
            model.model_name,
            model.dimensions as i64,
            now_utc_string(),
            config_json,
        ],
    )?;

    Ok(())
}

/// Embeds and stores every chunk in one transaction. Chunks with no embeddable text are
/// counted and left out.
pub(super) fn insert_chunks(
    connection: &mut Connection,
    chunks: &[TextChunk],
    model: &SemanticModelConfig,
) -> Result<InsertCounts> {
    let mut counts = InsertCounts::default();
    let tx = connection.transaction()?;

    {
        let mut statement = tx.prepare(
            "
            INSERT INTO chunks(chunk_id, source, page, chunk_seq, text, text_hash, embedding, embedding_dim, model_id)
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(chunk_id) DO UPDATE SET
              source=excluded.source,
              page=excluded.page,
              chunk_seq=excluded.chunk_seq,
              text=excluded.text,
              text_hash=excluded.text_hash,
              embedding=excluded.embedding,
              embedding_dim=excluded.embedding_dim,
              model_id=excluded.model_id
            ",
        )?;

        for chunk in chunks {
            let Some(payload) = chunk_payload_for_embedding(&chunk.text) else {
                counts.skipped_empty += 1;
                continue;
            };

            let embedding = model.embed(&payload);
            statement.execute(params![
                chunk.chunk_id,
                chunk.source,
                chunk.page as i64,
                chunk.seq as i64,
                chunk.text,
                embedding_text_hash(&payload),
                encode_embedding_blob(&embedding),
                embedding.len() as i64,
                model.model_id,
            ])?;
            counts.embedded += 1;
        }
    }

    tx.commit()?;
    Ok(counts)
}

/// Scores every stored chunk of `model` against the query and keeps the best `top_k`,
/// highest score first with ties broken by chunk id.
pub(super) fn similarity_search(
    connection: &Connection,
    query: &str,
    model: &SemanticModelConfig,
    top_k: usize,
) -> Result<Vec<ScoredChunk>> {
    if top_k == 0 {
        return Ok(Vec::new());
    }

    let query_embedding = model.embed(query);
    let mut statement = connection.prepare(
        "
        SELECT chunk_id, source, page, text, embedding, embedding_dim
        FROM chunks
        WHERE model_id = ?1
        ORDER BY chunk_id ASC
        ",
    )?;

    let mut rows = statement.query([&model.model_id])?;
    let mut scored = Vec::<ScoredChunk>::new();

    while let Some(row) = rows.next()? {
        let blob: Vec<u8> = row.get(4)?;
        let embedding_dim = row.get::<_, i64>(5)?.max(0) as usize;
        let Some(embedding) = decode_embedding_blob(&blob, embedding_dim) else {
            continue;
        };

        scored.push(ScoredChunk {
            chunk_id: row.get(0)?,
            source: row.get(1)?,
            page: row.get::<_, i64>(2)?.max(0) as usize,
            text: row.get(3)?,
            score: cosine_similarity(&query_embedding, &embedding),
        });
    }

    scored.sort_by(|left, right| {
        right
            .score
            .total_cmp(&left.score)
            .then_with(|| left.chunk_id.cmp(&right.chunk_id))
    });
    scored.truncate(top_k);

    Ok(scored)
}

pub(super) fn count_chunks(connection: &Connection, model_id: &str) -> Result<usize> {
    let count: i64 = connection.query_row(
        "SELECT COUNT(*) FROM chunks WHERE model_id = ?1",
        [model_id],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as usize)
}
