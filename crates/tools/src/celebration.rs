//! `trigger_celebration`: describes a celebration for the client to show.
//! Nothing is persisted and no user is required.

use crate::args;
use async_trait::async_trait;
use selah_core::domain::CelebrationDescriptor;
use selah_core::error::ToolError;
use selah_core::tool::{Tool, ToolContext, ToolEffect, ToolResult};
use serde::Deserialize;

const NAME: &str = "trigger_celebration";

#[derive(Debug, Deserialize)]
struct Args {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

pub struct TriggerCelebrationTool;

#[async_trait]
impl Tool for TriggerCelebrationTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Celebrate a milestone with the user: an answered prayer, a breakthrough, a streak, \
         or a kept commitment."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "type": {
                    "type": "string",
                    "enum": ["answered_prayer", "breakthrough", "streak", "milestone", "obedience"]
                },
                "message": { "type": "string", "description": "One warm sentence to display" }
            },
            "required": ["type", "message"]
        })
    }

    async fn execute(
        &self,
        _ctx: &ToolContext,
        arguments: serde_json::Value,
    ) -> Result<ToolResult, ToolError> {
        let args: Args = args::parse(NAME, arguments)?;
        let celebration = CelebrationDescriptor {
            kind: args::required("type", args.kind)?,
            message: args::required("message", args.message)?,
        };
        Ok(ToolResult {
            call_id: String::new(),
            output: "Celebration shown.".into(),
            effect: ToolEffect::Celebration(celebration),
        })
    }
}
