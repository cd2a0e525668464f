//! The chat pipeline, buffered and streaming.

use crate::aggregator::ContextAggregator;
use crate::dispatcher::{DispatchOutcome, ToolDispatcher};
use crate::error::EngineError;
use crate::prompt::{self, PromptInputs};
use crate::request::ChatRequest;
use crate::retrieval::{RetrievalEngine, Retrieved, until_cancelled};
use crate::settings::EngineSettings;
use crate::stream_event::ChatStreamEvent;
use crate::suggestions::suggested_actions;
use selah_core::domain::{CelebrationDescriptor, SavedArtifact};
use selah_core::message::Message;
use selah_core::provider::{Provider, ProviderRequest, ToolDefinition};
use selah_core::store::SpiritualStore;
use selah_core::tool::{ToolContext, ToolRegistry};
use selah_core::{SourceCitation, SuggestedAction, VerseIndex, WitLevel};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Reply used when the pipeline fails on the buffered path.
pub const APOLOGY: &str = "I'm sorry, I'm having trouble responding right now. \
Please try again in a moment.";

/// Reply used when tools ran but the follow-up completion failed.
pub const FOLLOW_UP_FALLBACK: &str = "Done. I've taken care of that for you.";

/// Synthetic tool result fed back for the follow-up completion.
const TOOL_ACK: &str = "Action completed successfully.";

/// Terminal `error` message on the streaming path.
const STREAM_FAILED: &str = "Something went wrong while responding. Please try again.";

const STREAM_BUFFER: usize = 64;

/// The buffered response payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub response: String,
    /// At most five, in retrieval order.
    pub sources: Vec<SourceCitation>,
    pub tools_used: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub celebration: Option<CelebrationDescriptor>,
    pub suggested_actions: Vec<SuggestedAction>,
    pub saved_data: Vec<SavedArtifact>,
    pub thread_id: String,
    pub wit_level: WitLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatReply {
    /// The apology payload for a failed turn. Lists are empty.
    pub fn apology(thread_id: impl Into<String>, wit_level: WitLevel, error: &EngineError) -> Self {
        Self {
            response: APOLOGY.into(),
            sources: Vec::new(),
            tools_used: Vec::new(),
            celebration: None,
            suggested_actions: Vec::new(),
            saved_data: Vec::new(),
            thread_id: thread_id.into(),
            wit_level,
            error: Some(error.to_string()),
        }
    }
}

/// Everything computed before the model is called.
struct Prepared {
    messages: Vec<Message>,
    retrieved: Retrieved,
}

/// Runs chat turns. Cheap to clone; every collaborator is shared.
#[derive(Clone)]
pub struct ChatEngine {
    provider: Arc<dyn Provider>,
    aggregator: ContextAggregator,
    retrieval: RetrievalEngine,
    dispatcher: ToolDispatcher,
    settings: Arc<EngineSettings>,
}

impl ChatEngine {
    pub fn new(
        provider: Arc<dyn Provider>,
        store: Arc<dyn SpiritualStore>,
        index: Arc<dyn VerseIndex>,
        registry: Arc<ToolRegistry>,
        settings: EngineSettings,
    ) -> Self {
        let aggregator = ContextAggregator::new(store)
            .with_policy(settings.aggregation)
            .with_moment_window(settings.moment_window)
            .with_default_translation(settings.default_translation.clone());
        let retrieval = RetrievalEngine::new(provider.clone(), index, &settings.embedding_model)
            .with_limits(settings.top_k, settings.min_similarity);

        Self {
            provider,
            aggregator,
            retrieval,
            dispatcher: ToolDispatcher::new(registry),
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.dispatcher.registry().definitions()
    }

    /// Caller-supplied thread id, or a fresh one.
    pub fn thread_id_for(request: &ChatRequest) -> String {
        request
            .thread_id
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }

    /// Run one buffered turn, tools included.
    pub async fn respond(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> Result<ChatReply, EngineError> {
        let thread_id = Self::thread_id_for(&request);
        info!(
            thread_id = %thread_id,
            mode = %request.mode,
            wit = %request.wit_level,
            signed_in = request.user_id.is_some(),
            history = request.history.len(),
            "Chat turn started"
        );

        let prepared = self.prepare(&request, &cancel).await?;

        let completion = ProviderRequest {
            model: self.settings.model.clone(),
            messages: prepared.messages.clone(),
            temperature: self.settings.temperature,
            max_tokens: Some(self.settings.max_tokens),
            tools: self.tool_definitions(),
            stream: false,
        };
        let response = until_cancelled(&cancel, self.provider.complete(completion)).await??;

        let mut text = response.message.content.trim().to_string();
        let mut outcome = DispatchOutcome::default();
        if !response.message.tool_calls.is_empty() {
            let ctx = ToolContext::for_user(request.user_id.clone());
            outcome = self
                .dispatcher
                .dispatch(&ctx, &response.message.tool_calls)
                .await;
            if text.is_empty() {
                text = self
                    .follow_up(prepared.messages, response.message, &cancel)
                    .await?;
            }
        }

        info!(
            thread_id = %thread_id,
            tools = outcome.tools_used.len(),
            saved = outcome.saved.len(),
            sources = prepared.retrieved.passages.len(),
            "Chat turn complete"
        );

        Ok(ChatReply {
            response: text,
            sources: prepared.retrieved.sources(),
            tools_used: outcome.tools_used,
            celebration: outcome.celebration,
            suggested_actions: suggested_actions(request.mode),
            saved_data: outcome.saved,
            thread_id,
            wit_level: request.wit_level,
            error: None,
        })
    }

    /// Run one streaming turn. Tools are not offered on this path.
    ///
    /// The receiver yields `meta` first, then content deltas, then exactly
    /// one `done` or `error`. Cancelling `cancel` or dropping the receiver
    /// stops the turn and closes the channel without a terminal event.
    pub fn respond_stream(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<ChatStreamEvent> {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let engine = self.clone();
        tokio::spawn(async move {
            engine.run_stream(request, cancel, tx).await;
        });
        rx
    }

    async fn run_stream(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
        tx: mpsc::Sender<ChatStreamEvent>,
    ) {
        let thread_id = Self::thread_id_for(&request);
        info!(
            thread_id = %thread_id,
            mode = %request.mode,
            wit = %request.wit_level,
            signed_in = request.user_id.is_some(),
            "Streaming chat turn started"
        );

        let meta = |sources: Vec<SourceCitation>| ChatStreamEvent::Meta {
            sources,
            suggested_actions: suggested_actions(request.mode),
            thread_id: thread_id.clone(),
            wit_level: request.wit_level,
        };

        let prepared = match self.prepare(&request, &cancel).await {
            Ok(p) => p,
            Err(EngineError::Cancelled) => return,
            Err(e) => {
                warn!(thread_id = %thread_id, error = %e, "Streaming turn failed before completion");
                let _ = tx.send(meta(Vec::new())).await;
                let _ = tx.send(stream_error()).await;
                return;
            }
        };

        if tx.send(meta(prepared.retrieved.sources())).await.is_err() {
            return;
        }

        let completion = ProviderRequest {
            model: self.settings.model.clone(),
            messages: prepared.messages,
            temperature: self.settings.temperature,
            max_tokens: Some(self.settings.max_tokens),
            tools: Vec::new(),
            stream: true,
        };
        let mut chunks = match until_cancelled(&cancel, self.provider.stream(completion)).await {
            Err(_) => return,
            Ok(Ok(rx)) => rx,
            Ok(Err(e)) => {
                warn!(thread_id = %thread_id, error = %e, "Stream could not start");
                let _ = tx.send(stream_error()).await;
                return;
            }
        };

        let mut full_text = String::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(thread_id = %thread_id, "Stream cancelled");
                    return;
                }
                _ = tx.closed() => {
                    debug!(thread_id = %thread_id, "Stream receiver dropped");
                    return;
                }
                next = chunks.recv() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    if let Some(delta) = chunk.content.filter(|c| !c.is_empty()) {
                        full_text.push_str(&delta);
                        if tx.send(ChatStreamEvent::Content { content: delta }).await.is_err() {
                            return;
                        }
                    }
                    if chunk.done {
                        break;
                    }
                }
                Some(Err(e)) => {
                    warn!(thread_id = %thread_id, error = %e, "Stream interrupted");
                    let _ = tx.send(stream_error()).await;
                    return;
                }
                None => break,
            }
        }

        info!(thread_id = %thread_id, chars = full_text.len(), "Streaming chat turn complete");
        let _ = tx.send(ChatStreamEvent::Done { full_text }).await;
    }

    /// Aggregate, retrieve, compose, and assemble the message list.
    async fn prepare(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<Prepared, EngineError> {
        let user = until_cancelled(cancel, self.aggregator.aggregate(request.user_id.as_deref()))
            .await??;

        let retrieved = self
            .retrieval
            .retrieve(
                &request.retrieval_query(),
                &user.preferred_translation,
                cancel,
            )
            .await?;
        let scripture = retrieved.scripture_block();

        let plan = prompt::compose(&PromptInputs {
            mode: request.mode,
            wit_level: request.wit_level,
            quota: &request.quota,
            devotional: request.devotional.as_ref(),
            bible: request.bible.as_ref(),
            user: &user,
            scripture: &scripture,
            signed_in: request.user_id.is_some(),
        });
        debug!(mode = %plan.mode, tier = ?plan.tier, sections = plan.sections.len(), "Prompt composed");

        let limit = self.settings.history_limit;
        let skip = request.history.len().saturating_sub(limit);
        let mut messages = Vec::with_capacity(limit + 2);
        messages.push(Message::system(plan.render()));
        messages.extend(
            request
                .history
                .iter()
                .skip(skip)
                .filter(|t| !t.content.trim().is_empty())
                .map(|t| t.to_message()),
        );
        messages.push(Message::user(request.message.trim()));

        Ok(Prepared {
            messages,
            retrieved,
        })
    }

    /// Ask the model for a natural-language reply after tools ran.
    async fn follow_up(
        &self,
        mut messages: Vec<Message>,
        assistant: Message,
        cancel: &CancellationToken,
    ) -> Result<String, EngineError> {
        let acks: Vec<Message> = assistant
            .tool_calls
            .iter()
            .map(|c| Message::tool_result(&c.id, TOOL_ACK))
            .collect();
        messages.push(assistant);
        messages.extend(acks);

        let request = ProviderRequest {
            model: self.settings.model.clone(),
            messages,
            temperature: self.settings.temperature,
            max_tokens: Some(self.settings.follow_up_max_tokens),
            tools: Vec::new(),
            stream: false,
        };

        match until_cancelled(cancel, self.provider.complete(request)).await? {
            Ok(r) if !r.message.content.trim().is_empty() => Ok(r.message.content.trim().to_string()),
            Ok(_) => Ok(FOLLOW_UP_FALLBACK.into()),
            Err(e) => {
                warn!(error = %e, "Follow-up completion failed");
                Ok(FOLLOW_UP_FALLBACK.into())
            }
        }
    }
}

fn stream_error() -> ChatStreamEvent {
    ChatStreamEvent::Error {
        message: STREAM_FAILED.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::HistoryTurn;
    use crate::retrieval::NO_VERSES_FOUND;
    use crate::test_helpers::*;
    use selah_config::AggregationPolicy;
    use selah_core::domain::ArtifactKind;
    use selah_core::error::ProviderError;
    use selah_core::message::Role;
    use selah_core::{ChatMode, Passage};
    use selah_store::InMemoryStore;
    use serde_json::json;

    async fn corpus() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .insert_verse(
                Passage {
                    book: "Philippians".into(),
                    chapter: 4,
                    verse: 6,
                    text: "Be careful for nothing; but in every thing by prayer".into(),
                    translation: "kjv".into(),
                    score: 0.0,
                },
                vec![1.0, 0.0],
            )
            .await;
        store
    }

    fn engine_with(
        provider: Arc<SequentialMockProvider>,
        store: Arc<dyn SpiritualStore>,
        index: InMemoryStore,
        settings: EngineSettings,
    ) -> ChatEngine {
        let registry = Arc::new(selah_tools::catalog_registry(store.clone()));
        ChatEngine::new(provider, store, Arc::new(index), registry, settings)
    }

    fn engine(provider: Arc<SequentialMockProvider>, store: InMemoryStore) -> ChatEngine {
        engine_with(
            provider,
            Arc::new(store.clone()),
            store,
            EngineSettings::default(),
        )
    }

    async fn drain(mut rx: mpsc::Receiver<ChatStreamEvent>) -> Vec<ChatStreamEvent> {
        let mut events = Vec::new();
        while let Some(e) = rx.recv().await {
            events.push(e);
        }
        events
    }

    #[tokio::test]
    async fn buffered_reply_carries_sources_and_suggestions() {
        let provider = Arc::new(
            SequentialMockProvider::single_text("Cast your cares on Him.")
                .with_embedding(vec![1.0, 0.0]),
        );
        let engine = engine(provider.clone(), corpus().await);

        let reply = engine
            .respond(
                ChatRequest::new("I'm anxious").with_mode(ChatMode::Prayer),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(reply.response, "Cast your cares on Him.");
        assert_eq!(reply.sources.len(), 1);
        assert_eq!(reply.sources[0].book, "Philippians");
        assert_eq!(reply.suggested_actions, suggested_actions(ChatMode::Prayer));
        assert!(reply.tools_used.is_empty());
        assert!(uuid::Uuid::parse_str(&reply.thread_id).is_ok());
        assert_eq!(reply.wit_level, WitLevel::Medium);

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].tools.len(), 6);
        assert_eq!(requests[0].max_tokens, Some(1200));
        let system = &requests[0].messages[0];
        assert_eq!(system.role, Role::System);
        assert!(system.content.contains("MODE: PRAYER"));
        assert!(system.content.contains("Philippians 4:6 (KJV)"));
    }

    #[tokio::test]
    async fn sentinel_is_used_when_nothing_matches() {
        let provider = Arc::new(SequentialMockProvider::single_text("Peace."));
        let engine = engine(provider.clone(), InMemoryStore::new());
        let reply = engine
            .respond(ChatRequest::new("hello"), CancellationToken::new())
            .await
            .unwrap();
        assert!(reply.sources.is_empty());
        assert!(provider.requests()[0].messages[0].content.contains(NO_VERSES_FOUND));
    }

    #[tokio::test]
    async fn tool_calls_without_text_get_a_follow_up() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(make_tool_call_response(
                vec![make_tool_call(
                    "call_1",
                    "create_prayer_request",
                    json!({"title": "Dad's health"}),
                )],
                "",
            )),
            Ok(make_text_response("I've added your dad to your prayer list.")),
        ]));
        let store = InMemoryStore::new();
        let engine = engine(provider.clone(), store.clone());

        let reply = engine
            .respond(
                ChatRequest::new("Please pray for my dad's health").with_user("u1"),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(reply.response, "I've added your dad to your prayer list.");
        assert_eq!(reply.tools_used, vec!["create_prayer_request"]);
        assert_eq!(reply.saved_data.len(), 1);
        assert_eq!(reply.saved_data[0].kind, ArtifactKind::PrayerRequest);
        assert_eq!(store.prayers_for("u1").await.len(), 1);

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        let follow_up = &requests[1];
        assert!(follow_up.tools.is_empty());
        assert_eq!(follow_up.max_tokens, Some(500));
        let tail = &follow_up.messages[follow_up.messages.len() - 2..];
        assert_eq!(tail[0].role, Role::Assistant);
        assert_eq!(tail[0].tool_calls.len(), 1);
        assert_eq!(tail[1].role, Role::Tool);
        assert_eq!(tail[1].tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn failed_follow_up_uses_fixed_confirmation() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(make_tool_call_response(
                vec![make_tool_call(
                    "call_1",
                    "log_gratitude",
                    json!({"content": "Morning coffee"}),
                )],
                "",
            )),
            Err(ProviderError::Network("reset".into())),
        ]));
        let engine = engine(provider, InMemoryStore::new());
        let reply = engine
            .respond(
                ChatRequest::new("Grateful for coffee").with_user("u1"),
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(reply.response, FOLLOW_UP_FALLBACK);
        assert_eq!(reply.saved_data.len(), 1);
    }

    #[tokio::test]
    async fn tool_calls_with_text_skip_follow_up() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Ok(
            make_tool_call_response(
                vec![make_tool_call(
                    "call_1",
                    "trigger_celebration",
                    json!({"type": "milestone", "message": "30 days!"}),
                )],
                "Thirty days of prayer, well done!",
            ),
        )]));
        let engine = engine(provider.clone(), InMemoryStore::new());
        let reply = engine
            .respond(ChatRequest::new("30 days in a row"), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(provider.call_count(), 1);
        assert_eq!(reply.celebration.unwrap().kind, "milestone");
        assert!(reply.saved_data.is_empty());
    }

    #[tokio::test]
    async fn provider_failure_is_an_error() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Err(
            ProviderError::RateLimited {
                retry_after_secs: 5,
            },
        )]));
        let engine = engine(provider, InMemoryStore::new());
        let err = engine
            .respond(ChatRequest::new("hi"), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Provider(_)));

        let apology = ChatReply::apology("t", WitLevel::Low, &err);
        assert_eq!(apology.response, APOLOGY);
        assert!(apology.sources.is_empty() && apology.suggested_actions.is_empty());
        assert!(apology.error.is_some());
    }

    #[tokio::test]
    async fn caller_thread_id_is_kept() {
        let provider = Arc::new(SequentialMockProvider::single_text("ok"));
        let engine = engine(provider, InMemoryStore::new());
        let mut request = ChatRequest::new("hi");
        request.thread_id = Some("thread-42".into());
        let reply = engine.respond(request, CancellationToken::new()).await.unwrap();
        assert_eq!(reply.thread_id, "thread-42");
    }

    #[tokio::test]
    async fn history_is_truncated_to_limit() {
        let provider = Arc::new(SequentialMockProvider::single_text("ok"));
        let engine = engine(provider.clone(), InMemoryStore::new());
        let mut request = ChatRequest::new("latest");
        request.history = (0..15)
            .map(|i| HistoryTurn {
                role: if i % 2 == 0 { Role::User } else { Role::Assistant },
                content: format!("turn {i}"),
            })
            .collect();
        engine.respond(request, CancellationToken::new()).await.unwrap();

        let messages = &provider.requests()[0].messages;
        assert_eq!(messages.len(), 12);
        assert_eq!(messages[1].content, "turn 5");
        assert_eq!(messages[11].content, "latest");
    }

    #[tokio::test]
    async fn fail_fast_context_error_aborts() {
        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let flaky: Arc<dyn SpiritualStore> =
            Arc::new(FlakyStore::new(InMemoryStore::new()).failing_reads());
        let settings = EngineSettings {
            aggregation: AggregationPolicy::FailFast,
            ..EngineSettings::default()
        };
        let engine = engine_with(provider, flaky, InMemoryStore::new(), settings);
        let err = engine
            .respond(ChatRequest::new("hi").with_user("u1"), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Context(_)));
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let engine = engine(provider.clone(), InMemoryStore::new());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = engine.respond(ChatRequest::new("hi"), cancel).await.unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn stream_emits_meta_content_done() {
        let provider = Arc::new(
            SequentialMockProvider::new(vec![])
                .with_embedding(vec![1.0, 0.0])
                .with_stream(vec![text_chunk("Be "), text_chunk("still."), done_chunk()]),
        );
        let engine = engine(provider.clone(), corpus().await);
        let mut request = ChatRequest::new("anxious").with_mode(ChatMode::Lectio);
        request.wit_level = WitLevel::Low;
        let events = drain(engine.respond_stream(request, CancellationToken::new())).await;

        assert_eq!(events.len(), 4);
        match &events[0] {
            ChatStreamEvent::Meta {
                sources,
                suggested_actions: actions,
                wit_level,
                ..
            } => {
                assert_eq!(sources.len(), 1);
                assert_eq!(actions, &suggested_actions(ChatMode::Lectio));
                assert_eq!(*wit_level, WitLevel::Low);
            }
            other => panic!("expected meta first, got {other:?}"),
        }
        assert_eq!(
            events[3],
            ChatStreamEvent::Done {
                full_text: "Be still.".into()
            }
        );

        let request = &provider.requests()[0];
        assert!(request.stream);
        assert!(request.tools.is_empty());
    }

    #[tokio::test]
    async fn stream_start_failure_emits_meta_then_error() {
        let provider = Arc::new(
            SequentialMockProvider::new(vec![])
                .with_stream_failure(ProviderError::AuthenticationFailed("bad key".into())),
        );
        let engine = engine(provider, InMemoryStore::new());
        let events = drain(engine.respond_stream(ChatRequest::new("hi"), CancellationToken::new())).await;
        let types: Vec<_> = events.iter().map(|e| e.event_type()).collect();
        assert_eq!(types, vec!["meta", "error"]);
    }

    #[tokio::test]
    async fn mid_stream_failure_ends_with_error() {
        let provider = Arc::new(SequentialMockProvider::new(vec![]).with_stream(vec![
            text_chunk("Grace "),
            Err(ProviderError::StreamInterrupted("eof".into())),
            text_chunk("never sent"),
        ]));
        let engine = engine(provider, InMemoryStore::new());
        let events = drain(engine.respond_stream(ChatRequest::new("hi"), CancellationToken::new())).await;
        let types: Vec<_> = events.iter().map(|e| e.event_type()).collect();
        assert_eq!(types, vec!["meta", "content", "error"]);
    }

    #[tokio::test]
    async fn closed_stream_without_done_chunk_still_finishes() {
        let provider = Arc::new(
            SequentialMockProvider::new(vec![]).with_stream(vec![text_chunk("Selah")]),
        );
        let engine = engine(provider, InMemoryStore::new());
        let events = drain(engine.respond_stream(ChatRequest::new("hi"), CancellationToken::new())).await;
        assert_eq!(
            events.last(),
            Some(&ChatStreamEvent::Done {
                full_text: "Selah".into()
            })
        );
    }

    #[tokio::test]
    async fn cancelling_a_stream_closes_it_without_terminal_event() {
        let provider = Arc::new(
            SequentialMockProvider::new(vec![])
                .with_stream(vec![text_chunk("Wait")])
                .holding_stream_open(),
        );
        let engine = engine(provider, InMemoryStore::new());
        let cancel = CancellationToken::new();
        let mut rx = engine.respond_stream(ChatRequest::new("hi"), cancel.clone());

        assert_eq!(rx.recv().await.unwrap().event_type(), "meta");
        assert_eq!(rx.recv().await.unwrap().event_type(), "content");
        cancel.cancel();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn stream_context_failure_emits_meta_then_error() {
        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let flaky: Arc<dyn SpiritualStore> =
            Arc::new(FlakyStore::new(InMemoryStore::new()).failing_reads());
        let settings = EngineSettings {
            aggregation: AggregationPolicy::FailFast,
            ..EngineSettings::default()
        };
        let engine = engine_with(provider, flaky, InMemoryStore::new(), settings);
        let events = drain(
            engine.respond_stream(ChatRequest::new("hi").with_user("u1"), CancellationToken::new()),
        )
        .await;
        let types: Vec<_> = events.iter().map(|e| e.event_type()).collect();
        assert_eq!(types, vec!["meta", "error"]);
    }
}
