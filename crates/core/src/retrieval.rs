//! Retrieval collaborator: ranked lookup over the scripture corpus.

use crate::domain::SourceCitation;
use crate::error::RetrievalError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One verse returned by a ranked lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
    pub translation: String,
    /// Similarity or keyword rank; higher is better.
    #[serde(default)]
    pub score: f32,
}

impl Passage {
    /// `Book Chapter:Verse (TRANSLATION): "text"`
    pub fn citation_line(&self) -> String {
        format!(
            "{} {}:{} ({}): \"{}\"",
            self.book,
            self.chapter,
            self.verse,
            self.translation.to_uppercase(),
            self.text
        )
    }

    pub fn to_citation(&self) -> SourceCitation {
        SourceCitation {
            book: self.book.clone(),
            chapter: self.chapter,
            verse: self.verse,
            translation: self.translation.to_uppercase(),
            text: self.text.clone(),
        }
    }
}

/// Opaque ranked-retrieval service.
#[async_trait]
pub trait VerseIndex: Send + Sync {
    fn name(&self) -> &str;

    /// Passages whose similarity to `embedding` is at least `min_similarity`,
    /// best first, restricted to `translation`.
    async fn similarity_search(
        &self,
        embedding: &[f32],
        limit: usize,
        translation: &str,
        min_similarity: f32,
    ) -> Result<Vec<Passage>, RetrievalError>;

    /// Keyword-ranked passages, best first, restricted to `translation`.
    async fn keyword_search(
        &self,
        query: &str,
        limit: usize,
        translation: &str,
    ) -> Result<Vec<Passage>, RetrievalError>;
}
