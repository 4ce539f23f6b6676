use fastembed::{EmbeddingModel as FastEmbedModel, InitOptions, TextEmbedding};
use folio_common::{FolioError, Result};
use std::sync::OnceLock;

static EMBEDDING_MODEL: OnceLock<TextEmbedding> = OnceLock::new();

/// Sentence embeddings for passage search
pub struct EmbeddingModel;

impl EmbeddingModel {
    /// Loads the model on first use and keeps it for the process lifetime
    fn get_model() -> Result<&'static TextEmbedding> {
        if let Some(model) = EMBEDDING_MODEL.get() {
            return Ok(model);
        }

        tracing::info!("Initializing embedding model (all-MiniLM-L6-v2)...");
        let model = TextEmbedding::try_new(
            InitOptions::new(FastEmbedModel::AllMiniLML6V2).with_show_download_progress(false),
        )
        .map_err(|e| FolioError::IndexError(format!("cannot load embedding model: {}", e)))?;
        tracing::info!("Embedding model initialized successfully");

        Ok(EMBEDDING_MODEL.get_or_init(|| model))
    }

    pub fn embed(text: &str) -> Result<Vec<f32>> {
        Self::embed_batch(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| FolioError::IndexError("no embedding generated".to_string()))
    }

    pub fn embed_batch(texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Self::get_model()?
            .embed(texts.to_vec(), None)
            .map_err(|e| FolioError::IndexError(format!("failed to generate embeddings: {}", e)))
    }

    /// Cosine similarity in `[-1, 1]`. Mismatched or zero vectors score 0.
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            tracing::warn!("Vector dimension mismatch: {} vs {}", a.len(), b.len());
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot_product / (norm_a * norm_b)
    }
}
