//! Passage index over exported documents.
//!
//! A document's markdown is cut into passages of at most `chunk_size`
//! characters. Re-indexing a document replaces its passages. Search scores
//! passages by keyword frequency, or by embedding similarity when the
//! `embeddings` feature is on.

use crate::export::wrap;
use folio_common::{FolioError, Result};
use std::collections::HashSet;

#[cfg(feature = "embeddings")]
use crate::embeddings::EmbeddingModel;

#[derive(Debug, Clone)]
struct Passage {
    document_key: String,
    text: String,
    #[cfg(feature = "embeddings")]
    vector: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub document_key: String,
    pub text: String,
    pub score: f32,
}

#[derive(Debug)]
pub struct PassageIndex {
    chunk_size: usize,
    passages: Vec<Passage>,
}

fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Splits markdown into passages, keeping blocks whole where they fit
pub fn chunk(markdown: &str, chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for block in markdown.split("\n\n").map(str::trim).filter(|b| !b.is_empty()) {
        let pieces: Vec<String> = if block.chars().count() > chunk_size {
            wrap(block, chunk_size).lines().map(str::to_string).collect()
        } else {
            vec![block.to_string()]
        };

        for piece in pieces {
            let joined = current.chars().count() + 2 + piece.chars().count();
            if !current.is_empty() && joined > chunk_size {
                chunks.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(&piece);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

impl PassageIndex {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            passages: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Keys of the documents that have passages, sorted
    pub fn document_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .passages
            .iter()
            .map(|p| p.document_key.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        keys.sort();
        keys
    }

    /// Replaces the passages of `document_key`. Returns the passage count.
    #[tracing::instrument(skip(self, markdown))]
    pub fn index_document(&mut self, document_key: &str, markdown: &str) -> Result<usize> {
        let chunks = chunk(markdown, self.chunk_size);

        #[cfg(feature = "embeddings")]
        let vectors = EmbeddingModel::embed_batch(&chunks)?;

        self.passages.retain(|p| p.document_key != document_key);

        #[cfg(feature = "embeddings")]
        let added: Vec<Passage> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(text, vector)| Passage {
                document_key: document_key.to_string(),
                text,
                vector,
            })
            .collect();
        #[cfg(not(feature = "embeddings"))]
        let added: Vec<Passage> = chunks
            .into_iter()
            .map(|text| Passage {
                document_key: document_key.to_string(),
                text,
            })
            .collect();

        let count = added.len();
        self.passages.extend(added);
        tracing::info!("Indexed {} passages for {}", count, document_key);
        Ok(count)
    }

    #[cfg(not(feature = "embeddings"))]
    fn scores(&self, query: &str) -> Result<Vec<f32>> {
        let query_terms: HashSet<String> = terms(query).into_iter().collect();
        if query_terms.is_empty() {
            return Err(FolioError::ValidationError(
                "search query has no searchable terms".to_string(),
            ));
        }

        Ok(self
            .passages
            .iter()
            .map(|passage| {
                let passage_terms = terms(&passage.text);
                if passage_terms.is_empty() {
                    return 0.0;
                }
                let hits = passage_terms
                    .iter()
                    .filter(|t| query_terms.contains(*t))
                    .count();
                hits as f32 / (passage_terms.len() as f32).sqrt()
            })
            .collect())
    }

    #[cfg(feature = "embeddings")]
    fn scores(&self, query: &str) -> Result<Vec<f32>> {
        if terms(query).is_empty() {
            return Err(FolioError::ValidationError(
                "search query has no searchable terms".to_string(),
            ));
        }
        let query_vector = EmbeddingModel::embed(query)?;
        Ok(self
            .passages
            .iter()
            .map(|p| EmbeddingModel::cosine_similarity(&query_vector, &p.vector))
            .collect())
    }

    /// Best `top_k` passages for `query`, highest score first
    #[tracing::instrument(skip(self))]
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        if self.passages.is_empty() {
            return Err(FolioError::EmptyIndex);
        }

        let mut hits: Vec<SearchHit> = self
            .scores(query)?
            .into_iter()
            .zip(&self.passages)
            .filter(|(score, _)| *score > 0.0)
            .map(|(score, passage)| SearchHit {
                document_key: passage.document_key.clone(),
                text: passage.text.clone(),
                score,
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        Ok(hits)
    }
}
