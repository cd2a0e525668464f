//! Prayer tools: `create_prayer_request` and `mark_prayer_answered`.

use crate::args;
use async_trait::async_trait;
use selah_core::domain::{ArtifactKind, SavedArtifact};
use selah_core::error::ToolError;
use selah_core::store::NewPrayerRequest;
use selah_core::tool::{Tool, ToolContext, ToolEffect, ToolResult};
use selah_core::SpiritualStore;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

const CREATE: &str = "create_prayer_request";
const ANSWERED: &str = "mark_prayer_answered";

#[derive(Debug, Deserialize)]
struct CreateArgs {
    title: String,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

/// Inserts an active prayer request.
pub struct CreatePrayerRequestTool {
    store: Arc<dyn SpiritualStore>,
}

impl CreatePrayerRequestTool {
    pub fn new(store: Arc<dyn SpiritualStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreatePrayerRequestTool {
    fn name(&self) -> &str {
        CREATE
    }

    fn description(&self) -> &str {
        "Create a prayer request when the user asks for prayer or names something to keep \
         bringing before God."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "title": { "type": "string", "description": "Short summary of the request" },
                "details": { "type": "string" },
                "category": {
                    "type": "string",
                    "description": "e.g. family, health, work, faith, relationships"
                }
            },
            "required": ["title"]
        })
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: serde_json::Value,
    ) -> Result<ToolResult, ToolError> {
        let user_id = ctx.require_user(CREATE)?;
        let args: CreateArgs = args::parse(CREATE, arguments)?;

        let id = self
            .store
            .insert_prayer_request(NewPrayerRequest {
                user_id: user_id.to_string(),
                title: args::required("title", args.title)?,
                details: args::optional(args.details),
                category: args::optional(args.category),
            })
            .await?;

        debug!(prayer_id = %id, "Prayer request created");
        Ok(ToolResult {
            call_id: String::new(),
            output: "Prayer request saved.".into(),
            effect: ToolEffect::Persisted(SavedArtifact {
                kind: ArtifactKind::PrayerRequest,
                id,
            }),
        })
    }
}

#[derive(Debug, Deserialize)]
struct AnsweredArgs {
    prayer_id: String,
    #[serde(default)]
    reflection: Option<String>,
}

/// Flips one of the user's prayer requests to answered.
pub struct MarkPrayerAnsweredTool {
    store: Arc<dyn SpiritualStore>,
}

impl MarkPrayerAnsweredTool {
    pub fn new(store: Arc<dyn SpiritualStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for MarkPrayerAnsweredTool {
    fn name(&self) -> &str {
        ANSWERED
    }

    fn description(&self) -> &str {
        "Mark one of the user's active prayer requests as answered, with their reflection on \
         how it was answered."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "prayer_id": { "type": "string", "description": "Id of the active prayer request" },
                "reflection": { "type": "string", "description": "How the prayer was answered" }
            },
            "required": ["prayer_id"]
        })
    }

    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: serde_json::Value,
    ) -> Result<ToolResult, ToolError> {
        let user_id = ctx.require_user(ANSWERED)?;
        let args: AnsweredArgs = args::parse(ANSWERED, arguments)?;
        let prayer_id = args::required("prayer_id", args.prayer_id)?;

        self.store
            .mark_prayer_answered(user_id, &prayer_id, args::optional(args.reflection))
            .await?;

        Ok(ToolResult {
            call_id: String::new(),
            output: "Prayer marked as answered.".into(),
            effect: ToolEffect::Persisted(SavedArtifact {
                kind: ArtifactKind::AnsweredPrayer,
                id: prayer_id,
            }),
        })
    }
}
