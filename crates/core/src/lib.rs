//! # Selah Core
//!
//! Domain types, collaborator traits, and error definitions for the Selah
//! conversation engine. This crate has **no framework dependencies**: it
//! defines the model every other crate implements against.
//!
//! ## Collaborators
//!
//! The engine talks to three outside systems, each defined here as a trait:
//! - [`Provider`]: the generative completion + embedding service
//! - [`SpiritualStore`]: per-user persistence (profile, moments, prayers, ...)
//! - [`VerseIndex`]: ranked retrieval over the scripture corpus
//!
//! Implementations live in `selah-providers` and `selah-store`, so tests can
//! swap in scripted stubs.

pub mod domain;
pub mod error;
pub mod message;
pub mod provider;
pub mod retrieval;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use domain::{
    ActivePrayer, BibleContext, CelebrationDescriptor, ChatMode, DevotionalContext, QuotaContext, QuotaTier,
    SourceCitation, SuggestedAction, UserContext, WitLevel,
};
pub use error::{Error, Result};
pub use message::{Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk, ToolDefinition};
pub use retrieval::{Passage, VerseIndex};
pub use store::SpiritualStore;
pub use tool::{Tool, ToolCall, ToolContext, ToolRegistry, ToolResult};
