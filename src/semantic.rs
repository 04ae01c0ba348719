//! Local sentence embedding used by the search index.
//!
//! Feature hashing over word unigrams and bigrams, L2-normalized. Deterministic, offline,
//! and cheap enough to embed a few thousand chunks per run.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const DEFAULT_MODEL_ID: &str = "miniLM-L6-v2-local-v1";
pub const DEFAULT_MODEL_NAME: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_EMBEDDING_DIM: usize = 384;
pub const DEFAULT_NORMALIZATION: &str = "l2";
pub const DEFAULT_BACKEND: &str = "local-hash-v2";
pub const MODEL_ID_ENV: &str = "PDFOUTLINE_EMBEDDING_MODEL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticModelConfig {
    pub model_id: String,
    pub model_name: String,
    pub dimensions: usize,
    pub normalization: String,
    pub backend: String,
}

impl SemanticModelConfig {
    pub fn embed(&self, payload: &str) -> Vec<f32> {
        embed_text_local(payload, self.dimensions)
    }
}

/// Picks the model from the command line, then the environment, then the default.
pub fn resolve_model_config(cli_model_id: Option<&str>, env_model_id: Option<&str>) -> SemanticModelConfig {
    let requested = cli_model_id
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .or_else(|| env_model_id.map(str::trim).filter(|value| !value.is_empty()))
        .unwrap_or(DEFAULT_MODEL_ID);

    let model_name = if requested == DEFAULT_MODEL_ID {
        DEFAULT_MODEL_NAME
    } else {
        requested
    };

    SemanticModelConfig {
        model_id: requested.to_string(),
        model_name: model_name.to_string(),
        dimensions: DEFAULT_EMBEDDING_DIM,
        normalization: DEFAULT_NORMALIZATION.to_string(),
        backend: DEFAULT_BACKEND.to_string(),
    }
}

pub fn normalize_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Text that gets embedded for a chunk, or `None` when there is nothing to embed.
pub fn chunk_payload_for_embedding(text: &str) -> Option<String> {
    let payload = normalize_whitespace(text);
    if payload.is_empty() { None } else { Some(payload) }
}

pub fn embedding_text_hash(payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn embed_text_local(payload: &str, dimensions: usize) -> Vec<f32> {
    let dims = dimensions.max(8);
    let mut vector = vec![0_f32; dims];
    let tokens = tokenize_payload(payload);

    if tokens.is_empty() {
        return vector;
    }

    for token in &tokens {
        let hash = stable_hash(token);
        let index = (hash % dims as u64) as usize;
        let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
        let weight = 1.0 + (((hash >> 48) & 0xFF) as f32 / 255.0);
        vector[index] += sign * weight;
    }

    normalize_vector(&mut vector);
    vector
}

pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f64 {
    if left.len() != right.len() || left.is_empty() {
        return 0.0;
    }

    left.iter()
        .zip(right.iter())
        .map(|(left_value, right_value)| f64::from(*left_value) * f64::from(*right_value))
        .sum::<f64>()
}

pub fn encode_embedding_blob(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::<u8>::with_capacity(values.len() * 4);
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

pub fn decode_embedding_blob(blob: &[u8], expected_dim: usize) -> Option<Vec<f32>> {
    if expected_dim == 0 || blob.len() != expected_dim.saturating_mul(4) {
        return None;
    }

    Some(
        blob.chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}

// Sha256 rather than DefaultHasher: stored vectors must not change with the toolchain.
fn stable_hash(value: &str) -> u64 {
    let digest = Sha256::digest(value.as_bytes());
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

fn tokenize_payload(payload: &str) -> Vec<String> {
    let words = payload
        .split_whitespace()
        .map(|value| {
            value
                .chars()
                .filter(|character| character.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|value| !value.is_empty())
        .collect::<Vec<String>>();

    let mut features = Vec::<String>::with_capacity(words.len() * 2);
    for (index, word) in words.iter().enumerate() {
        features.push(format!("w:{word}"));
        if let Some(next) = words.get(index + 1) {
            features.push(format!("b:{word}_{next}"));
        }
    }
    features
}

fn normalize_vector(values: &mut [f32]) {
    let squared_norm = values
        .iter()
        .map(|value| f64::from(*value) * f64::from(*value))
        .sum::<f64>();

    if squared_norm <= 0.0 {
        return;
    }

    let norm = squared_norm.sqrt() as f32;
    for value in values {
        *value /= norm;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_model_config_prefers_cli_then_env_then_default() {
        assert_eq!(resolve_model_config(None, None).model_id, DEFAULT_MODEL_ID);
        assert_eq!(resolve_model_config(None, None).model_name, DEFAULT_MODEL_NAME);
        assert_eq!(resolve_model_config(None, Some("env-model")).model_id, "env-model");
        assert_eq!(
            resolve_model_config(Some("cli-model"), Some("env-model")).model_id,
            "cli-model"
        );
        assert_eq!(resolve_model_config(Some("  "), Some("env-model")).model_id, "env-model");
    }

    #[test]
    fn embeddings_are_normalized_and_deterministic() {
        let first = embed_text_local("Plan a four day trip for college friends", 64);
        let second = embed_text_local("Plan a four day trip for college friends", 64);
        assert_eq!(first, second);

        let norm = first.iter().map(|value| f64::from(*value).powi(2)).sum::<f64>();
        assert!((norm - 1.0).abs() < 1e-5);
        assert!((cosine_similarity(&first, &second) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn related_text_scores_above_unrelated_text() {
        let query = embed_text_local("coastal adventures and beach activities", 384);
        let related = embed_text_local("The coastal towns offer beach activities and water sports", 384);
        let unrelated = embed_text_local("Quarterly tax filing deadlines for corporations", 384);

        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[test]
    fn empty_payload_embeds_to_zero_vector() {
        let vector = embed_text_local("  ... ", 16);
        assert_eq!(vector.len(), 16);
        assert!(vector.iter().all(|value| *value == 0.0));
        assert_eq!(chunk_payload_for_embedding(" \n\t"), None);
    }

    #[test]
    fn embedding_blob_round_trips_and_rejects_wrong_width() {
        let values = vec![0.25_f32, -1.5, 3.0];
        let blob = encode_embedding_blob(&values);
        assert_eq!(decode_embedding_blob(&blob, 3), Some(values));
        assert_eq!(decode_embedding_blob(&blob, 4), None);
        assert_eq!(decode_embedding_blob(&[], 0), None);
    }

    #[test]
    fn mismatched_vectors_have_zero_similarity() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }
}
