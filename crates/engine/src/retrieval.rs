//! Passage retrieval: embed, similarity search, keyword fallback.

use crate::error::EngineError;
use selah_core::provider::{EmbeddingRequest, Provider};
use selah_core::{Passage, VerseIndex};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Scripture block used when nothing relevant was found.
pub const NO_VERSES_FOUND: &str = "No directly relevant verses found for this specific query.";

/// At most this many passages are surfaced to the caller as sources.
pub const MAX_SOURCES: usize = 5;

/// Outcome of one retrieval.
#[derive(Debug, Clone, Default)]
pub struct Retrieved {
    pub passages: Vec<Passage>,
}

impl Retrieved {
    /// One citation line per passage, or [`NO_VERSES_FOUND`].
    pub fn scripture_block(&self) -> String {
        if self.passages.is_empty() {
            return NO_VERSES_FOUND.to_string();
        }
        self.passages
            .iter()
            .map(Passage::citation_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn sources(&self) -> Vec<selah_core::SourceCitation> {
        self.passages
            .iter()
            .take(MAX_SOURCES)
            .map(Passage::to_citation)
            .collect()
    }
}

/// Finds passages for a query. Failures degrade to an empty result; only
/// cancellation is reported.
#[derive(Clone)]
pub struct RetrievalEngine {
    provider: Arc<dyn Provider>,
    index: Arc<dyn VerseIndex>,
    embedding_model: String,
    top_k: usize,
    min_similarity: f32,
}

impl RetrievalEngine {
    pub fn new(
        provider: Arc<dyn Provider>,
        index: Arc<dyn VerseIndex>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            index,
            embedding_model: embedding_model.into(),
            top_k: 8,
            min_similarity: 0.35,
        }
    }

    pub fn with_limits(mut self, top_k: usize, min_similarity: f32) -> Self {
        self.top_k = top_k;
        self.min_similarity = min_similarity;
        self
    }

    pub async fn retrieve(
        &self,
        query: &str,
        translation: &str,
        cancel: &CancellationToken,
    ) -> Result<Retrieved, EngineError> {
        if query.trim().is_empty() {
            return Ok(Retrieved::default());
        }

        if let Some(embedding) = until_cancelled(cancel, self.embed(query)).await? {
            let search = self.index.similarity_search(
                &embedding,
                self.top_k,
                translation,
                self.min_similarity,
            );
            match until_cancelled(cancel, search).await? {
                Ok(passages) if !passages.is_empty() => {
                    debug!(count = passages.len(), "Similarity search matched");
                    return Ok(Retrieved { passages });
                }
                Ok(_) => debug!("Similarity search empty, falling back to keywords"),
                Err(e) => warn!(error = %e, "Similarity search failed, falling back to keywords"),
            }
        }

        let keyword = self.index.keyword_search(query, self.top_k, translation);
        let passages = match until_cancelled(cancel, keyword).await? {
            Ok(passages) => passages,
            Err(e) => {
                warn!(error = %e, "Keyword search failed");
                Vec::new()
            }
        };
        debug!(count = passages.len(), "Keyword search finished");
        Ok(Retrieved { passages })
    }

    async fn embed(&self, query: &str) -> Option<Vec<f32>> {
        let request = EmbeddingRequest {
            model: self.embedding_model.clone(),
            inputs: vec![query.to_string()],
        };
        match self.provider.embed(request).await {
            Ok(response) => response.embeddings.into_iter().next(),
            Err(e) => {
                warn!(error = %e, "Query embedding failed");
                None
            }
        }
    }
}

/// Race `fut` against cancellation.
pub(crate) async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, EngineError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(EngineError::Cancelled),
        out = fut => Ok(out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::SequentialMockProvider;
    use selah_store::InMemoryStore;

    fn verse(book: &str, chapter: u32, verse: u32, text: &str) -> Passage {
        Passage {
            book: book.into(),
            chapter,
            verse,
            text: text.into(),
            translation: "kjv".into(),
            score: 0.0,
        }
    }

    async fn corpus() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .insert_verse(
                verse("Philippians", 4, 6, "Be careful for nothing; but in every thing by prayer"),
                vec![1.0, 0.0, 0.0],
            )
            .await;
        store
            .insert_verse(
                verse("Matthew", 6, 34, "Take therefore no thought for the morrow"),
                vec![0.0, 1.0, 0.0],
            )
            .await;
        store
    }

    #[tokio::test]
    async fn similarity_hits_are_used() {
        let provider = Arc::new(SequentialMockProvider::new(vec![]).with_embedding(vec![1.0, 0.1, 0.0]));
        let engine = RetrievalEngine::new(provider, Arc::new(corpus().await), "embed");
        let got = engine
            .retrieve("anxious", "kjv", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(got.passages.len(), 1);
        assert!(got.scripture_block().starts_with("Philippians 4:6 (KJV): \""));
    }

    #[tokio::test]
    async fn falls_back_to_keywords_when_embedding_fails() {
        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let engine = RetrievalEngine::new(provider, Arc::new(corpus().await), "embed");
        let got = engine
            .retrieve("thought for tomorrow", "kjv", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(got.passages[0].book, "Matthew");
    }

    #[tokio::test]
    async fn empty_results_use_sentinel() {
        let provider = Arc::new(SequentialMockProvider::new(vec![]).with_embedding(vec![0.0, 0.0, 1.0]));
        let engine = RetrievalEngine::new(provider, Arc::new(corpus().await), "embed");
        let got = engine
            .retrieve("zzzz qqqq", "kjv", &CancellationToken::new())
            .await
            .unwrap();
        assert!(got.passages.is_empty());
        assert_eq!(got.scripture_block(), NO_VERSES_FOUND);
        assert!(got.sources().is_empty());
    }

    #[tokio::test]
    async fn other_translations_are_excluded() {
        let provider = Arc::new(SequentialMockProvider::new(vec![]).with_embedding(vec![1.0, 0.0, 0.0]));
        let engine = RetrievalEngine::new(provider, Arc::new(corpus().await), "embed");
        let got = engine
            .retrieve("prayer", "esv", &CancellationToken::new())
            .await
            .unwrap();
        assert!(got.passages.is_empty());
    }

    #[tokio::test]
    async fn cancellation_is_reported() {
        let provider = Arc::new(SequentialMockProvider::new(vec![]).with_embedding(vec![1.0, 0.0, 0.0]));
        let engine = RetrievalEngine::new(provider, Arc::new(corpus().await), "embed");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = engine.retrieve("prayer", "kjv", &cancel).await.unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
    }

    #[test]
    fn sources_are_capped() {
        let retrieved = Retrieved {
            passages: (1..=8).map(|v| verse("Psalms", 119, v, "word")).collect(),
        };
        assert_eq!(retrieved.sources().len(), MAX_SOURCES);
        assert_eq!(retrieved.scripture_block().lines().count(), 8);
    }
}
