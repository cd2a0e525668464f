//! The canonical, already-normalized chat request.

use selah_core::message::{Message, Role};
use selah_core::{BibleContext, ChatMode, DevotionalContext, QuotaContext, WitLevel};
use serde::{Deserialize, Serialize};

/// One prior turn supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

impl HistoryTurn {
    pub fn to_message(&self) -> Message {
        match self.role {
            Role::Assistant => Message::assistant(&self.content),
            _ => Message::user(&self.content),
        }
    }
}

/// A chat turn with every field resolved to one canonical value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatRequest {
    pub user_id: Option<String>,
    pub message: String,
    pub history: Vec<HistoryTurn>,
    pub mode: ChatMode,
    pub wit_level: WitLevel,
    pub bible: Option<BibleContext>,
    pub devotional: Option<DevotionalContext>,
    pub quota: QuotaContext,
    pub stream: bool,
    pub thread_id: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_mode(mut self, mode: ChatMode) -> Self {
        self.mode = mode;
        self
    }

    /// Text used for retrieval: the message, plus the passage being read.
    pub fn retrieval_query(&self) -> String {
        match self.bible.as_ref().and_then(BibleContext::reference) {
            Some(reference) => format!("{} {}", self.message.trim(), reference),
            None => self.message.trim().to_string(),
        }
    }
}
