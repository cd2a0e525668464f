//! `log_gratitude`: records a gratitude moment.

use crate::args;
use async_trait::async_trait;
use selah_core::domain::{ArtifactKind, SavedArtifact};
use selah_core::error::ToolError;
use selah_core::store::{MomentKind, NewMoment};
use selah_core::tool::{Tool, ToolContext, ToolEffect, ToolResult};
use selah_core::SpiritualStore;
use serde::Deserialize;
use std::sync::Arc;

const NAME: &str = "log_gratitude";

#[derive(Debug, Deserialize)]
struct Args {
    content: String,
    #[serde(default)]
    themes: Vec<String>,
}

pub struct LogGratitudeTool {
    store: Arc<dyn SpiritualStore>,
}

impl LogGratitudeTool {
    pub fn new(store: Arc<dyn SpiritualStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for LogGratitudeTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Log something the user is thankful for."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "content": { "type": "string", "description": "What the user is grateful for" },
                "themes": { "type": "array", "items": { "type": "string" } }
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
                kind: MomentKind::Gratitude,
                title: Some("Gratitude".into()),
                content: args::required("content", args.content)?,
                themes: args.themes,
                struggles: Vec::new(),
                scripture_refs: Vec::new(),
            })
            .await?;

        Ok(ToolResult {
            call_id: String::new(),
            output: "Gratitude logged.".into(),
            effect: ToolEffect::Persisted(SavedArtifact {
                kind: ArtifactKind::GratitudeLog,
                id,
            }),
        })
    }
}
