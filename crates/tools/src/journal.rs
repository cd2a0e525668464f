//! `save_journal_entry`: records a journal moment for the user.

use crate::args;
use async_trait::async_trait;
use selah_core::domain::{ArtifactKind, SavedArtifact};
use selah_core::error::ToolError;
use selah_core::store::{MomentKind, NewMoment};
use selah_core::tool::{Tool, ToolContext, ToolEffect, ToolResult};
use selah_core::SpiritualStore;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

const NAME: &str = "save_journal_entry";

#[derive(Debug, Deserialize)]
struct Args {
    content: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    themes: Vec<String>,
    #[serde(default)]
    struggles: Vec<String>,
    #[serde(default)]
    scripture_refs: Vec<String>,
}

pub struct SaveJournalEntryTool {
    store: Arc<dyn SpiritualStore>,
}

impl SaveJournalEntryTool {
    pub fn new(store: Arc<dyn SpiritualStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for SaveJournalEntryTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Save a journal entry when the user shares a reflection, experience, or processing \
         worth keeping. Tag it with the themes and struggles it touches."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "content": { "type": "string", "description": "The entry, in the user's own words where possible" },
                "title": { "type": "string", "description": "Short title" },
                "themes": { "type": "array", "items": { "type": "string" }, "description": "Spiritual themes, e.g. trust, surrender" },
                "struggles": { "type": "array", "items": { "type": "string" }, "description": "Struggles named, e.g. anxiety" },
                "scripture_refs": { "type": "array", "items": { "type": "string" }, "description": "Related references, e.g. Psalm 23:4" }
            },
            "required": ["content"]
        })
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: serde_json::Value,
    ) -> Result<ToolResult, ToolError> {
        let user_id = ctx.require_user(NAME)?;
        let args: Args = args::parse(NAME, arguments)?;

        let id = self
            .store
            .insert_moment(NewMoment {
                user_id: user_id.to_string(),
                kind: MomentKind::Journal,
                title: args::optional(args.title),
                content: args::required("content", args.content)?,
                themes: args.themes,
                struggles: args.struggles,
                scripture_refs: args.scripture_refs,
            })
            .await?;

        debug!(moment_id = %id, "Journal entry saved");
        Ok(ToolResult {
            call_id: String::new(),
            output: "Journal entry saved.".into(),
            effect: ToolEffect::Persisted(SavedArtifact {
                kind: ArtifactKind::JournalEntry,
                id,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selah_store::InMemoryStore;

    #[tokio::test]
    async fn saves_journal_moment() {
        let store = Arc::new(InMemoryStore::new());
        let tool = SaveJournalEntryTool::new(store.clone());
        let result = tool
            .execute(
                &ToolContext::for_user(Some("u1".into())),
                serde_json::json!({
                    "content": "Felt God's peace on the walk today",
                    "themes": ["peace"],
                }),
            )
            .await
            .unwrap();

        let moments = store.moments_for("u1").await;
        assert_eq!(moments.len(), 1);
        assert_eq!(moments[0].kind, MomentKind::Journal);
        assert_eq!(moments[0].themes, vec!["peace"]);
        assert!(
            matches!(result.effect, ToolEffect::Persisted(ref a) if a.id == moments[0].id && a.kind == ArtifactKind::JournalEntry)
        );
    }

    #[tokio::test]
    async fn refuses_without_user() {
        let tool = SaveJournalEntryTool::new(Arc::new(InMemoryStore::new()));
        let err = tool
            .execute(&ToolContext::default(), serde_json::json!({"content": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::MissingUser(_)));
    }

    #[tokio::test]
    async fn rejects_missing_content() {
        let tool = SaveJournalEntryTool::new(Arc::new(InMemoryStore::new()));
        let err = tool
            .execute(
                &ToolContext::for_user(Some("u1".into())),
                serde_json::json!({"title": "no body"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
