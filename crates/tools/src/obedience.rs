//! `create_obedience_step`: records a concrete commitment to act.

use crate::args;
use async_trait::async_trait;
use selah_core::domain::{ArtifactKind, SavedArtifact};
use selah_core::error::ToolError;
use selah_core::store::NewObedienceStep;
use selah_core::tool::{Tool, ToolContext, ToolEffect, ToolResult};
use selah_core::SpiritualStore;
use serde::Deserialize;
use std::sync::Arc;

const NAME: &str = "create_obedience_step";

#[derive(Debug, Deserialize)]
struct Args {
    action: String,
    #[serde(default)]
    scripture_ref: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
}

pub struct CreateObedienceStepTool {
    store: Arc<dyn SpiritualStore>,
}

impl CreateObedienceStepTool {
    pub fn new(store: Arc<dyn SpiritualStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreateObedienceStepTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Record a specific, doable step the user commits to in response to scripture."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "action": { "type": "string", "description": "The concrete action" },
                "scripture_ref": { "type": "string", "description": "The passage prompting it" },
                "due_date": { "type": "string", "description": "YYYY-MM-DD or RFC 3339" }
            },
            "required": ["action"]
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
            .insert_obedience_step(NewObedienceStep {
                user_id: user_id.to_string(),
                action: args::required("action", args.action)?,
                scripture_ref: args::optional(args.scripture_ref),
                due_date: args::due_date(args.due_date)?,
            })
            .await?;

        Ok(ToolResult {
            call_id: String::new(),
            output: "Commitment saved.".into(),
            effect: ToolEffect::Persisted(SavedArtifact {
                kind: ArtifactKind::ObedienceStep,
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
    async fn creates_pending_step() {
        let store = Arc::new(InMemoryStore::new());
        CreateObedienceStepTool::new(store.clone())
            .execute(
                &ToolContext::for_user(Some("u1".into())),
                serde_json::json!({"action": "Apologize to Sam", "due_date": "2026-11-01"}),
            )
            .await
            .unwrap();
        let steps = store.pending_obedience_steps("u1", 5).await.unwrap();
        assert_eq!(steps[0].action, "Apologize to Sam");
        assert!(steps[0].due_date.is_some());
    }

    #[tokio::test]
    async fn bad_due_date_is_invalid_arguments() {
        let tool = CreateObedienceStepTool::new(Arc::new(InMemoryStore::new()));
        let err = tool
            .execute(
                &ToolContext::for_user(Some("u1".into())),
                serde_json::json!({"action": "Fast", "due_date": "someday"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
