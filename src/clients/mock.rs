use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::core::{ClientFactory, GenerationRequest, LowLevelClient};
use crate::error::{AIError, GeminiError};

/// What a mock credential does when used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    /// Generation succeeds with this raw text
    Text(String),
    /// Generation fails with this error
    Fail(AIError),
}

impl MockResponse {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }
}

/// One recorded call against the mock, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Probe { key: String },
    Generate { key: String, request: GenerationRequest },
}

#[derive(Debug, Clone)]
struct KeyScript {
    probe: Result<(), AIError>,
    response: MockResponse,
}

/// Shared control and inspection handle for a `MockFactory`.
///
/// Keys without a script fail both probe and generation with an
/// authentication error.
#[derive(Debug, Default)]
pub struct MockHandle {
    scripts: Mutex<HashMap<String, KeyScript>>,
    calls: Mutex<Vec<MockCall>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockHandle {
    /// Script the generation result for `key`; its probe succeeds.
    pub fn set_response(&self, key: impl Into<String>, response: MockResponse) {
        lock(&self.scripts).insert(key.into(), KeyScript { probe: Ok(()), response });
    }

    /// Make the probe for `key` fail while leaving its generation result alone.
    pub fn fail_probe(&self, key: impl Into<String>, error: AIError) {
        let mut scripts = lock(&self.scripts);
        let script = scripts.entry(key.into()).or_insert_with(unscripted);
        script.probe = Err(error);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    /// Keys used for generation calls, in call order
    pub fn generate_keys(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                MockCall::Generate { key, .. } => Some(key.clone()),
                MockCall::Probe { .. } => None,
            })
            .collect()
    }

    /// Keys probed, in call order
    pub fn probed_keys(&self) -> Vec<String> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                MockCall::Probe { key } => Some(key.clone()),
                MockCall::Generate { .. } => None,
            })
            .collect()
    }

    fn script_for(&self, key: &str) -> KeyScript {
        lock(&self.scripts).get(key).cloned().unwrap_or_else(unscripted)
    }

    fn record(&self, call: MockCall) {
        lock(&self.calls).push(call);
    }
}

fn unscripted() -> KeyScript {
    KeyScript {
        probe: Err(GeminiError::Authentication.into()),
        response: MockResponse::Fail(GeminiError::Authentication.into()),
    }
}

/// Mock client bound to one key; behaviour comes from the shared handle.
#[derive(Debug, Clone)]
pub struct MockClient {
    key: String,
    handle: Arc<MockHandle>,
}

#[async_trait]
impl LowLevelClient for MockClient {
    async fn generate_content(&self, request: GenerationRequest) -> Result<String, AIError> {
        self.handle.record(MockCall::Generate { key: self.key.clone(), request });
        match self.handle.script_for(&self.key).response {
            MockResponse::Text(text) => Ok(text),
            MockResponse::Fail(e) => Err(e),
        }
    }

    async fn probe(&self) -> Result<(), AIError> {
        self.handle.record(MockCall::Probe { key: self.key.clone() });
        self.handle.script_for(&self.key).probe
    }
}

/// Factory handing out `MockClient`s that share one `MockHandle`.
#[derive(Debug, Clone)]
pub struct MockFactory {
    handle: Arc<MockHandle>,
}

impl MockFactory {
    pub fn new() -> (Self, Arc<MockHandle>) {
        let handle = Arc::new(MockHandle::default());
        (Self { handle: handle.clone() }, handle)
    }

    /// Factory where every key in `responses` is scripted up front
    pub fn with_responses<K: Into<String>>(responses: impl IntoIterator<Item = (K, MockResponse)>) -> (Self, Arc<MockHandle>) {
        let (factory, handle) = Self::new();
        for (key, response) in responses {
            handle.set_response(key, response);
        }
        (factory, handle)
    }
}

impl ClientFactory for MockFactory {
    type Client = MockClient;

    fn client_for(&self, api_key: &str) -> MockClient {
        MockClient { key: api_key.to_string(), handle: self.handle.clone() }
    }
}
