//! The Selah conversation engine.
//!
//! One chat turn runs:
//!
//! 1. **Aggregate** the user's context from the store (concurrent reads)
//! 2. **Retrieve** supporting passages (embed, similarity search, keyword fallback)
//! 3. **Compose** the system instruction from mode, tone, tier, and context
//! 4. **Complete** with the tool catalog, or stream tokens without it
//! 5. **Dispatch** returned tool calls, each isolated from the others
//! 6. **Deliver** a buffered [`ChatReply`] or an ordered [`ChatStreamEvent`] stream
//!
//! No state is shared between requests; every collaborator is behind a trait
//! from `selah-core`.

pub mod aggregator;
pub mod dispatcher;
pub mod error;
pub mod orchestrator;
pub mod prompt;
pub mod request;
pub mod retrieval;
pub mod settings;
pub mod stream_event;
pub mod suggestions;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use aggregator::ContextAggregator;
pub use dispatcher::{DispatchOutcome, ToolDispatcher};
pub use error::EngineError;
pub use orchestrator::{ChatEngine, ChatReply};
pub use prompt::{PromptInputs, PromptPlan, TierBlock};
pub use request::{ChatRequest, HistoryTurn};
pub use retrieval::{NO_VERSES_FOUND, RetrievalEngine, Retrieved};
pub use settings::EngineSettings;
pub use stream_event::ChatStreamEvent;
pub use suggestions::{suggested_actions, suggested_actions_for};
