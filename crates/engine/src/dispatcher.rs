//! Executes model-requested tool calls with per-call failure isolation.

use selah_core::domain::{CelebrationDescriptor, SavedArtifact};
use selah_core::message::MessageToolCall;
use selah_core::tool::{ToolCall, ToolContext, ToolEffect, ToolRegistry};
use std::sync::Arc;
use tracing::{debug, warn};

/// What a batch of tool calls produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchOutcome {
    /// Every requested tool name, in call order, including failed calls.
    pub tools_used: Vec<String>,
    pub saved: Vec<SavedArtifact>,
    /// The first celebration requested in the batch.
    pub celebration: Option<CelebrationDescriptor>,
    pub failed: Vec<String>,
}

#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run `calls` sequentially. A failing call is logged and skipped; the
    /// rest still run.
    pub async fn dispatch(&self, ctx: &ToolContext, calls: &[MessageToolCall]) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        for call in calls {
            outcome.tools_used.push(call.name.clone());

            let arguments = match parse_arguments(&call.arguments) {
                Ok(args) => args,
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "Unparseable tool arguments");
                    outcome.failed.push(call.name.clone());
                    continue;
                }
            };
            let tool_call = ToolCall {
                id: call.id.clone(),
                name: call.name.clone(),
                arguments,
            };

            match self.registry.execute(ctx, &tool_call).await {
                Ok(result) => {
                    debug!(tool = %call.name, output = %result.output, "Tool executed");
                    match result.effect {
                        ToolEffect::Persisted(artifact) => outcome.saved.push(artifact),
                        ToolEffect::Celebration(c) => {
                            outcome.celebration.get_or_insert(c);
                        }
                    }
                }
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "Tool call failed");
                    outcome.failed.push(call.name.clone());
                }
            }
        }

        outcome
    }
}

/// Empty argument strings mean "no arguments".
fn parse_arguments(raw: &str) -> Result<serde_json::Value, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(serde_json::json!({}));
    }
    serde_json::from_str(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FlakyStore, make_tool_call};
    use selah_core::domain::ArtifactKind;
    use selah_core::store::SpiritualStore;
    use selah_store::InMemoryStore;
    use serde_json::json;

    fn dispatcher(store: Arc<dyn SpiritualStore>) -> ToolDispatcher {
        ToolDispatcher::new(Arc::new(selah_tools::catalog_registry(store)))
    }

    #[tokio::test]
    async fn failures_do_not_stop_later_calls() {
        let inner = InMemoryStore::new();
        let store = Arc::new(FlakyStore::new(inner.clone()).failing_prayer_inserts());
        let d = dispatcher(store);
        let ctx = ToolContext::for_user(Some("u1".into()));

        let calls = vec![
            make_tool_call("c1", "save_journal_entry", json!({"content": "Rested today"})),
            make_tool_call("c2", "create_prayer_request", json!({"title": "Job search"})),
            make_tool_call("c3", "log_gratitude", json!({"content": "My sister"})),
        ];
        let outcome = d.dispatch(&ctx, &calls).await;

        assert_eq!(
            outcome.tools_used,
            vec!["save_journal_entry", "create_prayer_request", "log_gratitude"]
        );
        assert_eq!(outcome.failed, vec!["create_prayer_request"]);
        let kinds: Vec<_> = outcome.saved.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![ArtifactKind::JournalEntry, ArtifactKind::GratitudeLog]);
        assert_eq!(inner.moments_for("u1").await.len(), 2);
    }

    #[tokio::test]
    async fn celebration_is_returned_not_saved() {
        let d = dispatcher(Arc::new(InMemoryStore::new()));
        let ctx = ToolContext::for_user(None);
        let calls = vec![
            make_tool_call(
                "c1",
                "trigger_celebration",
                json!({"type": "answered_prayer", "message": "He came through!"}),
            ),
            make_tool_call(
                "c2",
                "trigger_celebration",
                json!({"type": "milestone", "message": "Second"}),
            ),
        ];
        let outcome = d.dispatch(&ctx, &calls).await;
        let c = outcome.celebration.unwrap();
        assert_eq!(c.kind, "answered_prayer");
        assert!(outcome.saved.is_empty());
    }

    #[tokio::test]
    async fn anonymous_persistence_calls_fail_in_isolation() {
        let d = dispatcher(Arc::new(InMemoryStore::new()));
        let ctx = ToolContext::for_user(None);
        let calls = vec![make_tool_call(
            "c1",
            "save_journal_entry",
            json!({"content": "x"}),
        )];
        let outcome = d.dispatch(&ctx, &calls).await;
        assert_eq!(outcome.tools_used, vec!["save_journal_entry"]);
        assert_eq!(outcome.failed, vec!["save_journal_entry"]);
    }

    #[tokio::test]
    async fn bad_json_and_unknown_tools_are_skipped() {
        let d = dispatcher(Arc::new(InMemoryStore::new()));
        let ctx = ToolContext::for_user(Some("u1".into()));
        let calls = vec![
            MessageToolCall {
                id: "c1".into(),
                name: "log_gratitude".into(),
                arguments: "{not json".into(),
            },
            make_tool_call("c2", "summon_angels", json!({})),
            make_tool_call("c3", "log_gratitude", json!({"content": "Sunrise"})),
        ];
        let outcome = d.dispatch(&ctx, &calls).await;
        assert_eq!(outcome.tools_used.len(), 3);
        assert_eq!(outcome.failed.len(), 2);
        assert_eq!(outcome.saved.len(), 1);
    }

    #[test]
    fn empty_arguments_are_an_empty_object() {
        assert_eq!(parse_arguments("  ").unwrap(), json!({}));
    }
}
