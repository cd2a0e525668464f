//! Builds a [`UserContext`] from concurrent store reads.

use chrono::Utc;
use selah_config::AggregationPolicy;
use selah_core::error::StoreError;
use selah_core::store::SpiritualStore;
use selah_core::{ActivePrayer, UserContext};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

const MAX_THEMES: usize = 5;
const MAX_STRUGGLES: usize = 3;
const MAX_PRAYERS: usize = 10;
const MAX_DUE_VERSES: usize = 5;
const MAX_PENDING_STEPS: usize = 5;

/// Reads a user's profile and recent activity in one concurrent fan-out.
///
/// Under [`AggregationPolicy::SettleAll`] a failed read contributes its
/// default and aggregation never fails. Under [`AggregationPolicy::FailFast`]
/// the first failure aborts the request.
#[derive(Clone)]
pub struct ContextAggregator {
    store: Arc<dyn SpiritualStore>,
    policy: AggregationPolicy,
    moment_window: usize,
    default_translation: String,
}

impl ContextAggregator {
    pub fn new(store: Arc<dyn SpiritualStore>) -> Self {
        Self {
            store,
            policy: AggregationPolicy::default(),
            moment_window: 20,
            default_translation: selah_core::domain::DEFAULT_TRANSLATION.into(),
        }
    }

    pub fn with_policy(mut self, policy: AggregationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_moment_window(mut self, window: usize) -> Self {
        self.moment_window = window;
        self
    }

    pub fn with_default_translation(mut self, translation: impl Into<String>) -> Self {
        self.default_translation = translation.into();
        self
    }

    /// Aggregate context for `user_id`. Anonymous requests get defaults
    /// without touching the store.
    pub async fn aggregate(&self, user_id: Option<&str>) -> Result<UserContext, StoreError> {
        let Some(user_id) = user_id else {
            return Ok(self.defaults());
        };

        let store = &self.store;
        let now = Utc::now();
        let profile = store.profile(user_id);
        let moments = store.recent_moments(user_id, self.moment_window);
        let prayers = store.active_prayers(user_id, MAX_PRAYERS);
        let verses = store.due_memory_verses(user_id, now, MAX_DUE_VERSES);
        let steps = store.pending_obedience_steps(user_id, MAX_PENDING_STEPS);
        let onboarding = store.onboarding_answers(user_id);

        let (profile, moments, prayers, verses, steps, onboarding) = match self.policy {
            AggregationPolicy::FailFast => {
                tokio::try_join!(profile, moments, prayers, verses, steps, onboarding)?
            }
            AggregationPolicy::SettleAll => {
                let (profile, moments, prayers, verses, steps, onboarding) =
                    tokio::join!(profile, moments, prayers, verses, steps, onboarding);
                (
                    settle("profile", profile),
                    settle("recent_moments", moments),
                    settle("active_prayers", prayers),
                    settle("due_memory_verses", verses),
                    settle("pending_obedience_steps", steps),
                    settle("onboarding_answers", onboarding),
                )
            }
        };

        let mut ctx = self.defaults();
        if let Some(profile) = profile {
            if let Some(t) = profile.preferred_translation.filter(|t| !t.trim().is_empty()) {
                ctx.preferred_translation = t;
            }
            if let Some(m) = profile.maturity_level.filter(|m| !m.trim().is_empty()) {
                ctx.maturity_level = m;
            }
            ctx.current_season = profile.current_season;
        }
        ctx.recent_themes = rank_by_frequency(moments.iter().map(|m| &m.themes), MAX_THEMES);
        ctx.recent_struggles =
            rank_by_frequency(moments.iter().map(|m| &m.struggles), MAX_STRUGGLES);
        ctx.active_prayers = prayers
            .into_iter()
            .map(|p| ActivePrayer {
                id: p.id,
                title: p.title,
            })
            .collect();
        ctx.verses_due_for_review = verses.into_iter().map(|v| v.reference).collect();
        ctx.pending_obedience_steps = steps.into_iter().map(|s| s.action).collect();
        ctx.onboarding_responses = onboarding
            .into_iter()
            .map(|a| (a.question, a.answer))
            .collect();

        debug!(
            user_id,
            moments = moments.len(),
            themes = ctx.recent_themes.len(),
            prayers = ctx.active_prayers.len(),
            "Aggregated user context"
        );
        Ok(ctx)
    }

    fn defaults(&self) -> UserContext {
        UserContext {
            preferred_translation: self.default_translation.clone(),
            ..UserContext::default()
        }
    }
}

fn settle<T: Default>(read: &str, result: Result<T, StoreError>) -> T {
    result.unwrap_or_else(|e| {
        warn!(read, error = %e, "Context read failed, using default");
        T::default()
    })
}

/// Tags ordered by how often they occur, ties broken by first appearance.
/// Matching is case-insensitive; the first spelling seen is kept.
fn rank_by_frequency<'a, I>(lists: I, cap: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a Vec<String>>,
{
    let mut counts: HashMap<String, (usize, usize, &'a str)> = HashMap::new();
    let mut order = 0;
    for tag in lists.into_iter().flatten() {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            continue;
        }
        let entry = counts
            .entry(trimmed.to_lowercase())
            .or_insert((0, order, trimmed));
        entry.0 += 1;
        order += 1;
    }

    let mut ranked: Vec<_> = counts.into_values().collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    ranked
        .into_iter()
        .take(cap)
        .map(|(_, _, tag)| tag.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::FlakyStore;
    use selah_core::store::*;
    use selah_store::InMemoryStore;

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .upsert_profile(Profile {
                user_id: "u1".into(),
                preferred_translation: Some("esv".into()),
                maturity_level: Some("mature".into()),
                current_season: Some("waiting".into()),
            })
            .await
            .unwrap();
        for (themes, struggles) in [
            (vec!["Trust", "rest"], vec!["anxiety"]),
            (vec!["trust", "hope"], vec!["anxiety", "fear"]),
            (vec!["rest"], vec!["doubt"]),
        ] {
            store
                .insert_moment(NewMoment {
                    user_id: "u1".into(),
                    kind: MomentKind::Journal,
                    title: None,
                    content: "entry".into(),
                    themes: themes.into_iter().map(String::from).collect(),
                    struggles: struggles.into_iter().map(String::from).collect(),
                    scripture_refs: vec![],
                })
                .await
                .unwrap();
        }
        store
            .insert_prayer_request(NewPrayerRequest {
                user_id: "u1".into(),
                title: "Mom's surgery".into(),
                details: None,
                category: None,
            })
            .await
            .unwrap();
        store
            .insert_obedience_step(NewObedienceStep {
                user_id: "u1".into(),
                action: "Call my brother".into(),
                scripture_ref: None,
                due_date: None,
            })
            .await
            .unwrap();
        store
            .insert_onboarding_answer(OnboardingAnswer {
                user_id: "u1".into(),
                question: "What brings you here?".into(),
                answer: "Grief".into(),
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn anonymous_gets_defaults() {
        let agg = ContextAggregator::new(Arc::new(InMemoryStore::new()));
        let ctx = agg.aggregate(None).await.unwrap();
        assert_eq!(ctx, UserContext::default());
    }

    #[tokio::test]
    async fn aggregates_profile_and_activity() {
        let agg = ContextAggregator::new(Arc::new(seeded().await));
        let ctx = agg.aggregate(Some("u1")).await.unwrap();

        assert_eq!(ctx.preferred_translation, "esv");
        assert_eq!(ctx.maturity_level, "mature");
        assert_eq!(ctx.current_season.as_deref(), Some("waiting"));
        assert_eq!(ctx.recent_themes.len(), 3);
        assert!(ctx.recent_themes[..2].iter().any(|t| t.eq_ignore_ascii_case("trust")));
        assert!(ctx.recent_themes[..2].iter().any(|t| t == "rest"));
        assert_eq!(ctx.recent_struggles[0], "anxiety");
        assert_eq!(ctx.active_prayers.len(), 1);
        assert_eq!(ctx.active_prayers[0].title, "Mom's surgery");
        assert!(!ctx.active_prayers[0].id.is_empty());
        assert_eq!(ctx.pending_obedience_steps, vec!["Call my brother"]);
        assert_eq!(
            ctx.onboarding_responses,
            vec![("What brings you here?".to_string(), "Grief".to_string())]
        );
    }

    #[tokio::test]
    async fn unknown_user_uses_configured_translation() {
        let agg =
            ContextAggregator::new(Arc::new(InMemoryStore::new())).with_default_translation("niv");
        let ctx = agg.aggregate(Some("nobody")).await.unwrap();
        assert_eq!(ctx.preferred_translation, "niv");
        assert_eq!(ctx.maturity_level, "growing");
    }

    #[tokio::test]
    async fn settle_all_tolerates_failed_reads() {
        let store = FlakyStore::new(seeded().await).failing_reads();
        let agg = ContextAggregator::new(Arc::new(store));
        let ctx = agg.aggregate(Some("u1")).await.unwrap();

        // Profile read succeeds; activity reads fall back to empty
        assert_eq!(ctx.preferred_translation, "esv");
        assert!(ctx.recent_themes.is_empty());
        assert!(ctx.active_prayers.is_empty());
    }

    #[tokio::test]
    async fn fail_fast_propagates_first_error() {
        let store = FlakyStore::new(seeded().await).failing_reads();
        let agg = ContextAggregator::new(Arc::new(store)).with_policy(AggregationPolicy::FailFast);
        assert!(agg.aggregate(Some("u1")).await.is_err());
    }

    #[test]
    fn frequency_ranking_caps_and_orders() {
        let lists = vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["B".to_string(), "c".to_string()],
            vec!["d".to_string(), " ".to_string()],
        ];
        let ranked = rank_by_frequency(&lists, 3);
        assert_eq!(ranked, vec!["b", "a", "c"]);
    }
}
