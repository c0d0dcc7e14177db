//! Shared test doubles for orchestrator and campaign tests.

use async_trait::async_trait;
use outreach_core::error::{GenerationError, RetrievalError};
use outreach_core::generation::{BackendInput, GenerationBackend};
use outreach_core::knowledge::{KnowledgeEntry, RetrievedContext, Retriever};
use std::sync::Mutex;

/// Returns the same text on every call.
pub struct ScriptedBackend {
    text: String,
    call_count: Mutex<usize>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            call_count: Mutex::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    #[allow(dead_code)]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(&self, input: BackendInput<'_>) -> Result<String, GenerationError> {
        *self.call_count.lock().unwrap() += 1;
        self.prompts.lock().unwrap().push(input.prompt.to_string());
        Ok(self.text.clone())
    }
}

/// Fails every call with the same error.
pub struct FailingBackend {
    error: GenerationError,
    call_count: Mutex<usize>,
}

impl FailingBackend {
    pub fn new(error: GenerationError) -> Self {
        Self {
            error,
            call_count: Mutex::new(0),
        }
    }

    #[allow(dead_code)]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait]
impl GenerationBackend for FailingBackend {
    async fn generate(&self, _input: BackendInput<'_>) -> Result<String, GenerationError> {
        *self.call_count.lock().unwrap() += 1;
        Err(self.error.clone())
    }
}

/// Always retrieves the same entry, or always fails.
pub struct FixedRetriever {
    result: Result<KnowledgeEntry, RetrievalError>,
}

impl FixedRetriever {
    pub fn new(entry: KnowledgeEntry) -> Self {
        Self { result: Ok(entry) }
    }

    pub fn failing(error: RetrievalError) -> Self {
        Self { result: Err(error) }
    }
}

#[async_trait]
impl Retriever for FixedRetriever {
    async fn retrieve(&self, _query: &str) -> Result<RetrievedContext, RetrievalError> {
        self.result.clone().map(RetrievedContext::from_entry)
    }
}
