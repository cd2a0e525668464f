//! Scripted collaborators for engine tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use selah_core::error::{ProviderError, StoreError};
use selah_core::message::{Message, MessageToolCall};
use selah_core::provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse,
    StreamChunk, Usage,
};
use selah_core::store::*;
use selah_store::InMemoryStore;
use std::sync::Mutex;
use tokio::sync::mpsc;

type StreamItem = Result<StreamChunk, ProviderError>;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue and
/// records the request. Panics if more calls are made than responses
/// provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    call_count: Mutex<usize>,
    requests: Mutex<Vec<ProviderRequest>>,
    embedding: Option<Vec<f32>>,
    stream_script: Mutex<Option<Result<Vec<StreamItem>, ProviderError>>>,
    hold_stream_open: bool,
    held: Mutex<Vec<mpsc::Sender<StreamItem>>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
            embedding: None,
            stream_script: Mutex::new(None),
            hold_stream_open: false,
            held: Mutex::new(Vec::new()),
        }
    }

    pub fn single_text(text: &str) -> Self {
        Self::new(vec![Ok(make_text_response(text))])
    }

    /// Answer `embed` with this vector instead of failing.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Stream these chunks, in order, from `stream`.
    pub fn with_stream(self, chunks: Vec<StreamItem>) -> Self {
        *self.stream_script.lock().unwrap() = Some(Ok(chunks));
        self
    }

    /// Fail `stream` before any chunk is produced.
    pub fn with_stream_failure(self, error: ProviderError) -> Self {
        *self.stream_script.lock().unwrap() = Some(Err(error));
        self
    }

    /// Keep the stream channel open after the scripted chunks.
    pub fn holding_stream_open(mut self) -> Self {
        self.hold_stream_open = true;
        self
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let mut count = self.call_count.lock().unwrap();
        let responses = self.responses.lock().unwrap();

        if *count >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                *count,
                responses.len()
            );
        }

        let response = responses[*count].clone();
        *count += 1;
        response
    }

    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> Result<mpsc::Receiver<StreamItem>, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let script = self
            .stream_script
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| Ok(Vec::new()));
        let chunks = script?;

        let (tx, rx) = mpsc::channel(chunks.len().max(1));
        for chunk in chunks {
            tx.try_send(chunk).unwrap();
        }
        if self.hold_stream_open {
            self.held.lock().unwrap().push(tx);
        }
        Ok(rx)
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        match &self.embedding {
            Some(e) => Ok(EmbeddingResponse {
                embeddings: request.inputs.iter().map(|_| e.clone()).collect(),
                model: request.model,
            }),
            None => Err(ProviderError::Network("embedding unavailable".into())),
        }
    }
}

pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, text: &str) -> ProviderResponse {
    let mut message = Message::assistant(text);
    message.tool_calls = tool_calls;
    ProviderResponse {
        message,
        usage: None,
        model: "mock-model".into(),
    }
}

pub fn make_tool_call(id: &str, name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: id.into(),
        name: name.into(),
        arguments: args.to_string(),
    }
}

pub fn text_chunk(text: &str) -> StreamItem {
    Ok(StreamChunk {
        content: Some(text.into()),
        tool_calls: vec![],
        done: false,
        usage: None,
    })
}

pub fn done_chunk() -> StreamItem {
    Ok(StreamChunk {
        content: None,
        tool_calls: vec![],
        done: true,
        usage: None,
    })
}

/// An in-memory store whose chosen operations fail.
pub struct FlakyStore {
    inner: InMemoryStore,
    fail_reads: bool,
    fail_prayer_inserts: bool,
}

impl FlakyStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            fail_reads: false,
            fail_prayer_inserts: false,
        }
    }

    /// Fail every activity read; the profile read still succeeds.
    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_prayer_inserts(mut self) -> Self {
        self.fail_prayer_inserts = true;
        self
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads {
            Err(StoreError::QueryFailed("read refused".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SpiritualStore for FlakyStore {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn profile(&self, user_id: &str) -> Result<Option<Profile>, StoreError> {
        self.inner.profile(user_id).await
    }

    async fn upsert_profile(&self, profile: Profile) -> Result<(), StoreError> {
        self.inner.upsert_profile(profile).await
    }

    async fn recent_moments(&self, user_id: &str, limit: usize) -> Result<Vec<Moment>, StoreError> {
        self.check_read()?;
        self.inner.recent_moments(user_id, limit).await
    }

    async fn insert_moment(&self, moment: NewMoment) -> Result<String, StoreError> {
        self.inner.insert_moment(moment).await
    }

    async fn active_prayers(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<PrayerRequest>, StoreError> {
        self.check_read()?;
        self.inner.active_prayers(user_id, limit).await
    }

    async fn insert_prayer_request(
        &self,
        request: NewPrayerRequest,
    ) -> Result<String, StoreError> {
        if self.fail_prayer_inserts {
            return Err(StoreError::Storage("disk full".into()));
        }
        self.inner.insert_prayer_request(request).await
    }

    async fn mark_prayer_answered(
        &self,
        user_id: &str,
        prayer_id: &str,
        reflection: Option<String>,
    ) -> Result<(), StoreError> {
        self.inner
            .mark_prayer_answered(user_id, prayer_id, reflection)
            .await
    }

    async fn due_memory_verses(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<MemoryVerse>, StoreError> {
        self.check_read()?;
        self.inner.due_memory_verses(user_id, now, limit).await
    }

    async fn insert_memory_verse(&self, verse: MemoryVerse) -> Result<String, StoreError> {
        self.inner.insert_memory_verse(verse).await
    }

    async fn pending_obedience_steps(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ObedienceStep>, StoreError> {
        self.check_read()?;
        self.inner.pending_obedience_steps(user_id, limit).await
    }

    async fn insert_obedience_step(&self, step: NewObedienceStep) -> Result<String, StoreError> {
        self.inner.insert_obedience_step(step).await
    }

    async fn onboarding_answers(&self, user_id: &str) -> Result<Vec<OnboardingAnswer>, StoreError> {
        self.check_read()?;
        self.inner.onboarding_answers(user_id).await
    }

    async fn insert_onboarding_answer(&self, answer: OnboardingAnswer) -> Result<(), StoreError> {
        self.inner.insert_onboarding_answer(answer).await
    }
}
