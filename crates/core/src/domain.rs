//! Request-scoped domain types.
//!
//! Everything here lives for one chat request and is discarded once the
//! response is delivered. Persisted rows are described in [`crate::store`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default translation code when neither profile nor request names one.
pub const DEFAULT_TRANSLATION: &str = "kjv";

/// Default maturity level for users without a profile.
pub const DEFAULT_MATURITY: &str = "growing";

// ── Chat mode ─────────────────────────────────────────────────────────────

/// Conversational context selector. Picks the mode template and the
/// suggested quick replies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    #[default]
    Auto,
    Devotional,
    Prayer,
    Journal,
    Lectio,
    Examen,
    Memory,
    Confession,
    Gratitude,
    Celebration,
}

impl ChatMode {
    pub const ALL: [ChatMode; 10] = [
        ChatMode::Auto,
        ChatMode::Devotional,
        ChatMode::Prayer,
        ChatMode::Journal,
        ChatMode::Lectio,
        ChatMode::Examen,
        ChatMode::Memory,
        ChatMode::Confession,
        ChatMode::Gratitude,
        ChatMode::Celebration,
    ];

    /// Resolve a caller-supplied mode. Absent, blank, or unknown values are `Auto`.
    pub fn resolve(raw: Option<&str>) -> Self {
        raw.map(|s| s.trim().to_ascii_lowercase())
            .and_then(|s| Self::ALL.into_iter().find(|m| m.as_str() == s))
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Devotional => "devotional",
            Self::Prayer => "prayer",
            Self::Journal => "journal",
            Self::Lectio => "lectio",
            Self::Examen => "examen",
            Self::Memory => "memory",
            Self::Confession => "confession",
            Self::Gratitude => "gratitude",
            Self::Celebration => "celebration",
        }
    }
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Wit level ─────────────────────────────────────────────────────────────

/// Tone-intensity dial for generated text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WitLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl WitLevel {
    /// Resolve a caller-supplied level; unknown values fall back to `Medium`.
    pub fn resolve(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("low") => Self::Low,
            Some("high") => Self::High,
            _ => Self::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for WitLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Quota ─────────────────────────────────────────────────────────────────

/// Caller-supplied allowance state for the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaContext {
    pub is_premium: bool,
    pub is_free_tier: bool,
    pub seeds_remaining: Option<u32>,
    pub total_seeds: Option<u32>,
    pub is_last_seed: bool,
}

/// The single tier that applies to a request. Exactly one variant holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaTier {
    Premium,
    LastSeed,
    LowRemaining,
    None,
}

/// At or below this many remaining seeds, replies are asked to be comprehensive.
pub const LOW_SEED_THRESHOLD: u32 = 2;

impl QuotaContext {
    /// Classify the request. Precedence: premium, then last seed, then low
    /// remaining; anything else (including non-free, non-premium) is `None`.
    pub fn tier(&self) -> QuotaTier {
        if self.is_premium {
            QuotaTier::Premium
        } else if self.is_free_tier && self.is_last_seed {
            QuotaTier::LastSeed
        } else if self.is_free_tier
            && self
                .seeds_remaining
                .is_some_and(|left| left <= LOW_SEED_THRESHOLD)
        {
            QuotaTier::LowRemaining
        } else {
            QuotaTier::None
        }
    }
}

// ── Caller-supplied context ───────────────────────────────────────────────

/// Today's devotional, supplied by the caller and never derived.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevotionalContext {
    pub series_title: Option<String>,
    pub day_number: Option<u32>,
    pub scripture_refs: Vec<String>,
    pub reflection_questions: Vec<String>,
    pub prayer_focus: Option<String>,
}

/// The passage a reading screen currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BibleContext {
    pub book: Option<String>,
    pub chapter: Option<u32>,
    pub verse: Option<u32>,
}

impl BibleContext {
    /// Human reference such as `Psalm 23:4` or `John 3`; `None` without a book.
    pub fn reference(&self) -> Option<String> {
        let book = self.book.as_deref()?.trim();
        if book.is_empty() {
            return None;
        }
        Some(match (self.chapter, self.verse) {
            (Some(c), Some(v)) => format!("{book} {c}:{v}"),
            (Some(c), None) => format!("{book} {c}"),
            _ => book.to_string(),
        })
    }
}

// ── Aggregated user state ─────────────────────────────────────────────────

/// An active prayer request as shown to the model. The id is what
/// `mark_prayer_answered` takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivePrayer {
    pub id: String,
    pub title: String,
}

/// Snapshot of one user's state, built fresh per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub preferred_translation: String,
    pub maturity_level: String,
    /// ≤5, ranked by frequency over the recent moment window
    pub recent_themes: Vec<String>,
    /// ≤3
    pub recent_struggles: Vec<String>,
    /// ≤10 active prayer requests
    pub active_prayers: Vec<ActivePrayer>,
    /// ≤5 references due for review
    pub verses_due_for_review: Vec<String>,
    /// ≤5 incomplete commitments
    pub pending_obedience_steps: Vec<String>,
    pub current_season: Option<String>,
    pub onboarding_responses: Vec<(String, String)>,
}

impl Default for UserContext {
    fn default() -> Self {
        Self {
            preferred_translation: DEFAULT_TRANSLATION.into(),
            maturity_level: DEFAULT_MATURITY.into(),
            recent_themes: Vec::new(),
            recent_struggles: Vec::new(),
            active_prayers: Vec::new(),
            verses_due_for_review: Vec::new(),
            pending_obedience_steps: Vec::new(),
            current_season: None,
            onboarding_responses: Vec::new(),
        }
    }
}

// ── Response decorations ──────────────────────────────────────────────────

/// A passage surfaced to the caller as a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCitation {
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
    pub translation: String,
    pub text: String,
}

/// A quick-reply chip. Static per mode, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub label: String,
    pub prompt: String,
    pub icon: String,
}

/// A non-persisted celebration for the client to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CelebrationDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

/// What kind of row a tool created or updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    JournalEntry,
    PrayerRequest,
    AnsweredPrayer,
    ObedienceStep,
    GratitudeLog,
}

/// Identifier of a persisted spiritual artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedArtifact {
    pub kind: ArtifactKind,
    pub id: String,
}
