//! Completion and embedding providers for Selah.
//!
//! All providers implement the `selah_core::Provider` trait.
//! The router selects the configured backend.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
