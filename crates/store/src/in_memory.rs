//! In-memory backend: useful for testing and ephemeral sessions.

use crate::vector;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use selah_core::error::{RetrievalError, StoreError};
use selah_core::store::*;
use selah_core::{Passage, VerseIndex};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    profiles: HashMap<String, Profile>,
    moments: Vec<Moment>,
    prayers: Vec<PrayerRequest>,
    steps: Vec<ObedienceStep>,
    memory_verses: Vec<MemoryVerse>,
    onboarding: Vec<OnboardingAnswer>,
    corpus: Vec<(Passage, Vec<f32>)>,
}

/// Keeps every table in process memory behind one lock.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a verse to the retrieval corpus. An empty embedding makes the
    /// verse reachable by keyword search only.
    pub async fn insert_verse(&self, passage: Passage, embedding: Vec<f32>) {
        self.tables.write().await.corpus.push((passage, embedding));
    }

    pub async fn verse_count(&self) -> usize {
        self.tables.read().await.corpus.len()
    }

    /// Every moment stored for a user, newest first.
    pub async fn moments_for(&self, user_id: &str) -> Vec<Moment> {
        self.recent_moments(user_id, usize::MAX)
            .await
            .unwrap_or_default()
    }

    /// Every prayer request stored for a user, in insertion order.
    pub async fn prayers_for(&self, user_id: &str) -> Vec<PrayerRequest> {
        self.tables
            .read()
            .await
            .prayers
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect()
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Lowercase alphanumeric words of three or more letters.
fn keywords(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
        .collect()
}

/// Fraction of distinct query words that prefix some word of `text`.
fn keyword_score(query_words: &[String], text: &str) -> f32 {
    if query_words.is_empty() {
        return 0.0;
    }
    let words = keywords(text);
    let hits = query_words
        .iter()
        .filter(|q| words.iter().any(|w| w.starts_with(q.as_str())))
        .count();
    hits as f32 / query_words.len() as f32
}

#[async_trait]
impl SpiritualStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(self.tables.read().await.profiles.get(user_id).cloned())
    }

    async fn upsert_profile(&self, profile: Profile) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .profiles
            .insert(profile.user_id.clone(), profile);
        Ok(())
    }

    async fn recent_moments(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Moment>, StoreError> {
        let tables = self.tables.read().await;
        let mut moments: Vec<Moment> = tables
            .moments
            .iter()
            .rev()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        // Stable sort keeps newest-inserted first among equal timestamps.
        moments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        moments.truncate(limit);
        Ok(moments)
    }

    async fn insert_moment(&self, moment: NewMoment) -> Result<String, StoreError> {
        let id = new_id();
        self.tables.write().await.moments.push(Moment {
            id: id.clone(),
            user_id: moment.user_id,
            kind: moment.kind,
            title: moment.title,
            content: moment.content,
            themes: moment.themes,
            struggles: moment.struggles,
            scripture_refs: moment.scripture_refs,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn active_prayers(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<PrayerRequest>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .prayers
            .iter()
            .rev()
            .filter(|p| p.user_id == user_id && p.status == PrayerStatus::Active)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn insert_prayer_request(
        &self,
        request: NewPrayerRequest,
    ) -> Result<String, StoreError> {
        let id = new_id();
        self.tables.write().await.prayers.push(PrayerRequest {
            id: id.clone(),
            user_id: request.user_id,
            title: request.title,
            details: request.details,
            category: request.category,
            status: PrayerStatus::Active,
            answer_reflection: None,
            created_at: Utc::now(),
            answered_at: None,
        });
        Ok(id)
    }

    async fn mark_prayer_answered(
        &self,
        user_id: &str,
        prayer_id: &str,
        reflection: Option<String>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let prayer = tables
            .prayers
            .iter_mut()
            .find(|p| p.id == prayer_id && p.user_id == user_id)
            .ok_or_else(|| StoreError::NotFound(format!("prayer request {prayer_id}")))?;
        prayer.status = PrayerStatus::Answered;
        prayer.answer_reflection = reflection;
        prayer.answered_at = Some(Utc::now());
        Ok(())
    }

    async fn due_memory_verses(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<MemoryVerse>, StoreError> {
        let tables = self.tables.read().await;
        let mut due: Vec<MemoryVerse> = tables
            .memory_verses
            .iter()
            .filter(|v| v.user_id == user_id && v.next_review_at <= now)
            .cloned()
            .collect();
        due.sort_by_key(|v| v.next_review_at);
        due.truncate(limit);
        Ok(due)
    }

    async fn insert_memory_verse(&self, mut verse: MemoryVerse) -> Result<String, StoreError> {
        if verse.id.is_empty() {
            verse.id = new_id();
        }
        let id = verse.id.clone();
        self.tables.write().await.memory_verses.push(verse);
        Ok(id)
    }

    async fn pending_obedience_steps(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ObedienceStep>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .steps
            .iter()
            .filter(|s| s.user_id == user_id && !s.completed)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn insert_obedience_step(&self, step: NewObedienceStep) -> Result<String, StoreError> {
        let id = new_id();
        self.tables.write().await.steps.push(ObedienceStep {
            id: id.clone(),
            user_id: step.user_id,
            action: step.action,
            scripture_ref: step.scripture_ref,
            due_date: step.due_date,
            completed: false,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn onboarding_answers(
        &self,
        user_id: &str,
    ) -> Result<Vec<OnboardingAnswer>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .onboarding
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_onboarding_answer(&self, answer: OnboardingAnswer) -> Result<(), StoreError> {
        self.tables.write().await.onboarding.push(answer);
        Ok(())
    }
}

#[async_trait]
impl VerseIndex for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn similarity_search(
        &self,
        embedding: &[f32],
        limit: usize,
        translation: &str,
        min_similarity: f32,
    ) -> Result<Vec<Passage>, RetrievalError> {
        let tables = self.tables.read().await;
        let candidates = tables
            .corpus
            .iter()
            .filter(|(p, e)| !e.is_empty() && p.translation.eq_ignore_ascii_case(translation))
            .map(|(p, e)| (p, e.as_slice()));
        Ok(vector::rank_by_similarity(
            candidates,
            embedding,
            limit,
            min_similarity,
        ))
    }

    async fn keyword_search(
        &self,
        query: &str,
        limit: usize,
        translation: &str,
    ) -> Result<Vec<Passage>, RetrievalError> {
        let mut query_words = keywords(query);
        query_words.sort();
        query_words.dedup();

        let tables = self.tables.read().await;
        let mut hits: Vec<Passage> = tables
            .corpus
            .iter()
            .filter(|(p, _)| p.translation.eq_ignore_ascii_case(translation))
            .filter_map(|(p, _)| {
                let score = keyword_score(&query_words, &p.text);
                (score > 0.0).then(|| Passage {
                    score,
                    ..p.clone()
                })
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }
}
