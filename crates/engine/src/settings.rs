//! Engine tunables, lifted from [`AppConfig`].

use selah_config::{AggregationPolicy, AppConfig};

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub model: String,
    pub embedding_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub follow_up_max_tokens: u32,
    pub top_k: usize,
    pub min_similarity: f32,
    pub default_translation: String,
    pub history_limit: usize,
    pub aggregation: AggregationPolicy,
    pub moment_window: usize,
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let model = config
            .providers
            .get(&config.default_provider)
            .and_then(|p| p.default_model.clone())
            .unwrap_or_else(|| config.default_model.clone());

        Self {
            model,
            embedding_model: config.embedding_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            follow_up_max_tokens: config.follow_up_max_tokens,
            top_k: config.retrieval.top_k,
            min_similarity: config.retrieval.min_similarity,
            default_translation: config.retrieval.default_translation.clone(),
            history_limit: config.conversation.history_limit,
            aggregation: config.context.aggregation,
            moment_window: config.context.moment_window,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}
