//! Tool trait: the side-effecting actions the model may request.
//!
//! Every catalog entry (save a journal entry, create a prayer request, ...)
//! implements [`Tool`]. Tools are registered in a [`ToolRegistry`], whose
//! definitions are sent to the model and whose `execute` runs a call.

use crate::domain::{CelebrationDescriptor, SavedArtifact};
use crate::error::ToolError;
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the model's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// Per-request facts a tool needs besides its arguments.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// The signed-in user, if any. Persisting tools refuse to run without one.
    pub user_id: Option<String>,
}

impl ToolContext {
    pub fn for_user(user_id: Option<String>) -> Self {
        Self { user_id }
    }

    /// The user id, or a `MissingUser` error naming the tool.
    pub fn require_user(&self, tool_name: &str) -> Result<&str, ToolError> {
        self.user_id
            .as_deref()
            .ok_or_else(|| ToolError::MissingUser(tool_name.to_string()))
    }
}

/// What executing a tool did to the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolEffect {
    /// A row was created or updated by the persistence collaborator.
    Persisted(SavedArtifact),
    /// A celebration for the client to render; nothing was stored.
    Celebration(CelebrationDescriptor),
}

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// Short human-readable summary, fed back to the model
    pub output: String,

    /// The side effect produced
    pub effect: ToolEffect,
}

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "save_journal_entry").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(
        &self,
        ctx: &ToolContext,
        arguments: serde_json::Value,
    ) -> Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the model.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools, in registration order.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions (for sending to the model).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.to_definition())
            .collect()
    }

    /// Execute a tool call.
    pub async fn execute(
        &self,
        ctx: &ToolContext,
        call: &ToolCall,
    ) -> Result<ToolResult, ToolError> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        let mut result = tool.execute(ctx, call.arguments.clone()).await?;
        result.call_id = call.id.clone();
        Ok(result)
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CheerTool;

    #[async_trait]
    impl Tool for CheerTool {
        fn name(&self) -> &str {
            "cheer"
        }
        fn description(&self) -> &str {
            "Celebrates"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": { "message": { "type": "string" } },
                "required": ["message"]
            })
        }
        async fn execute(
            &self,
            _ctx: &ToolContext,
            arguments: serde_json::Value,
        ) -> Result<ToolResult, ToolError> {
            let message = arguments["message"].as_str().unwrap_or("").to_string();
            Ok(ToolResult {
                call_id: String::new(),
                output: "cheered".into(),
                effect: ToolEffect::Celebration(CelebrationDescriptor {
                    kind: "milestone".into(),
                    message,
                }),
            })
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(CheerTool));
        registry.register(Box::new(CheerTool));
        assert!(registry.get("cheer").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.definitions()[0].name, "cheer");
    }

    #[tokio::test]
    async fn registry_execute_stamps_call_id() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(CheerTool));
        let call = ToolCall {
            id: "call_9".into(),
            name: "cheer".into(),
            arguments: serde_json::json!({"message": "well done"}),
        };
        let result = registry
            .execute(&ToolContext::default(), &call)
            .await
            .unwrap();
        assert_eq!(result.call_id, "call_9");
        assert!(matches!(result.effect, ToolEffect::Celebration(_)));
    }

    #[tokio::test]
    async fn registry_execute_missing_tool() {
        let registry = ToolRegistry::new();
        let call = ToolCall {
            id: "call_1".into(),
            name: "nonexistent".into(),
            arguments: serde_json::json!({}),
        };
        let err = registry
            .execute(&ToolContext::default(), &call)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn require_user_reports_tool() {
        let ctx = ToolContext::default();
        let err = ctx.require_user("log_gratitude").unwrap_err();
        assert!(matches!(err, ToolError::MissingUser(name) if name == "log_gratitude"));
        let ctx = ToolContext::for_user(Some("u1".into()));
        assert_eq!(ctx.require_user("log_gratitude").unwrap(), "u1");
    }
}
