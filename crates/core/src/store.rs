//! Persistence collaborator: per-user rows owned outside the engine.
//!
//! Reads feed the context aggregator; inserts and updates are issued by the
//! tool dispatcher. No cross-table transaction is assumed.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Profile preferences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub preferred_translation: Option<String>,
    pub maturity_level: Option<String>,
    pub current_season: Option<String>,
}

/// Kind of a recorded moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentKind {
    Journal,
    Gratitude,
    Prayer,
    Reflection,
}

impl MomentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Journal => "journal",
            Self::Gratitude => "gratitude",
            Self::Prayer => "prayer",
            Self::Reflection => "reflection",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "journal" => Some(Self::Journal),
            "gratitude" => Some(Self::Gratitude),
            "prayer" => Some(Self::Prayer),
            "reflection" => Some(Self::Reflection),
            _ => None,
        }
    }
}

/// A recorded moment (journal entry, gratitude log, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Moment {
    pub id: String,
    pub user_id: String,
    pub kind: MomentKind,
    pub title: Option<String>,
    pub content: String,
    pub themes: Vec<String>,
    pub struggles: Vec<String>,
    pub scripture_refs: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for a moment about to be inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMoment {
    pub user_id: String,
    pub kind: MomentKind,
    pub title: Option<String>,
    pub content: String,
    pub themes: Vec<String>,
    pub struggles: Vec<String>,
    pub scripture_refs: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrayerStatus {
    Active,
    Answered,
}

impl PrayerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Answered => "answered",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrayerRequest {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub details: Option<String>,
    pub category: Option<String>,
    pub status: PrayerStatus,
    pub answer_reflection: Option<String>,
    pub created_at: DateTime<Utc>,
    pub answered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPrayerRequest {
    pub user_id: String,
    pub title: String,
    pub details: Option<String>,
    pub category: Option<String>,
}

/// A commitment the user made to act on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObedienceStep {
    pub id: String,
    pub user_id: String,
    pub action: String,
    pub scripture_ref: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewObedienceStep {
    pub user_id: String,
    pub action: String,
    pub scripture_ref: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

/// A verse in the user's memorization queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryVerse {
    pub id: String,
    pub user_id: String,
    pub reference: String,
    pub text: String,
    pub next_review_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingAnswer {
    pub user_id: String,
    pub question: String,
    pub answer: String,
}

/// The persistence collaborator. Every call is scoped by user id.
#[async_trait]
pub trait SpiritualStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "memory").
    fn name(&self) -> &str;

    async fn profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError>;

    async fn upsert_profile(&self, profile: Profile) -> Result<(), StoreError>;

    /// Most recent moments first.
    async fn recent_moments(&self, user_id: &str, limit: usize)
    -> Result<Vec<Moment>, StoreError>;

    async fn insert_moment(&self, moment: NewMoment) -> Result<String, StoreError>;

    /// Active requests, most recent first.
    async fn active_prayers(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<PrayerRequest>, StoreError>;

    async fn insert_prayer_request(&self, request: NewPrayerRequest)
    -> Result<String, StoreError>;

    /// Flip a request to answered. `NotFound` when the id is not the user's.
    async fn mark_prayer_answered(
        &self,
        user_id: &str,
        prayer_id: &str,
        reflection: Option<String>,
    ) -> Result<(), StoreError>;

    /// Verses with `next_review_at <= now`, soonest first.
    async fn due_memory_verses(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<MemoryVerse>, StoreError>;

    async fn insert_memory_verse(&self, verse: MemoryVerse) -> Result<String, StoreError>;

    /// Incomplete steps, oldest first.
    async fn pending_obedience_steps(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ObedienceStep>, StoreError>;

    async fn insert_obedience_step(&self, step: NewObedienceStep) -> Result<String, StoreError>;

    async fn onboarding_answers(&self, user_id: &str)
    -> Result<Vec<OnboardingAnswer>, StoreError>;

    async fn insert_onboarding_answer(&self, answer: OnboardingAnswer) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moment_kind_round_trips() {
        for kind in [
            MomentKind::Journal,
            MomentKind::Gratitude,
            MomentKind::Prayer,
            MomentKind::Reflection,
        ] {
            assert_eq!(MomentKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(MomentKind::parse("sermon"), None);
    }
}
