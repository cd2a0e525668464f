//! Events emitted on the streaming path.

use selah_core::{SourceCitation, SuggestedAction, WitLevel};
use serde::{Deserialize, Serialize};

/// One server-sent event. A stream is exactly one `meta`, then zero or more
/// `content`, then exactly one `done` or `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatStreamEvent {
    #[serde(rename_all = "camelCase")]
    Meta {
        sources: Vec<SourceCitation>,
        suggested_actions: Vec<SuggestedAction>,
        thread_id: String,
        wit_level: WitLevel,
    },

    Content { content: String },

    #[serde(rename_all = "camelCase")]
    Done { full_text: String },

    Error { message: String },
}

impl ChatStreamEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Meta { .. } => "meta",
            Self::Content { .. } => "content",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}
