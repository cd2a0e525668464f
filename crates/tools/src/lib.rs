//! The tool catalog: side-effecting actions the model may request.
//!
//! Five tools persist an artifact through the [`SpiritualStore`]; one
//! (`trigger_celebration`) only describes a celebration for the client.
//! Persisting tools refuse to run without a signed-in user.

mod args;
pub mod celebration;
pub mod gratitude;
pub mod journal;
pub mod obedience;
pub mod prayer;

use selah_core::SpiritualStore;
use selah_core::tool::ToolRegistry;
use std::sync::Arc;

pub use celebration::TriggerCelebrationTool;
pub use gratitude::LogGratitudeTool;
pub use journal::SaveJournalEntryTool;
pub use obedience::CreateObedienceStepTool;
pub use prayer::{CreatePrayerRequestTool, MarkPrayerAnsweredTool};

/// Names of every catalog tool, in the order they are offered to the model.
pub const CATALOG: [&str; 6] = [
    "save_journal_entry",
    "create_prayer_request",
    "mark_prayer_answered",
    "create_obedience_step",
    "log_gratitude",
    "trigger_celebration",
];

/// Build a registry holding the full catalog, backed by `store`.
pub fn catalog_registry(store: Arc<dyn SpiritualStore>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(SaveJournalEntryTool::new(store.clone())));
    registry.register(Box::new(CreatePrayerRequestTool::new(store.clone())));
    registry.register(Box::new(MarkPrayerAnsweredTool::new(store.clone())));
    registry.register(Box::new(CreateObedienceStepTool::new(store.clone())));
    registry.register(Box::new(LogGratitudeTool::new(store)));
    registry.register(Box::new(TriggerCelebrationTool));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use selah_store::InMemoryStore;

    #[test]
    fn registry_offers_catalog_in_order() {
        let registry = catalog_registry(Arc::new(InMemoryStore::new()));
        assert_eq!(registry.names(), CATALOG.to_vec());
        for def in registry.definitions() {
            assert_eq!(def.parameters["type"], "object", "{} schema", def.name);
            assert!(!def.description.is_empty());
        }
    }
}
