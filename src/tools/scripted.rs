// src/tools/scripted.rs

use crate::tools::llm::{ChatRequest, LlmClient, TransportError};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replays canned responses in order. Once the script runs out every call
/// fails with a transport error.
#[derive(Clone, Default)]
pub struct ScriptedClient {
    responses: Arc<Mutex<VecDeque<Result<String, TransportError>>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedClient {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::default();
        for response in responses {
            client.push_ok(response);
        }
        client
    }

    pub fn push_ok(&self, response: impl Into<String>) -> &Self {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(Ok(response.into()));
        }
        self
    }

    pub fn push_err(&self, error: TransportError) -> &Self {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(Err(error));
        }
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl LlmClient for ScriptedClient {
    fn complete(&self, request: &ChatRequest) -> Result<String, TransportError> {
        if let Ok(mut log) = self.requests.lock() {
            log.push(request.clone());
        }
        self.responses
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or_else(|| Err(TransportError::Request("script exhausted".into())))
    }
}
