//! Deterministic completion providers for tests and offline runs.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use cvmatch_core::types::CompletionRequest;
use cvmatch_core::{CompletionProvider, Error, Result};

type Rule = (String, Result<String>);

/// Answers by the first rule whose needle occurs in the prompt, falling back
/// to a queue of canned replies. Records every prompt it sees.
#[derive(Default)]
pub struct ScriptedCompletion {
    rules: Vec<Rule>,
    queue: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `response` whenever the prompt contains `needle`.
    pub fn when(mut self, needle: &str, response: &str) -> Self {
        self.rules.push((needle.to_string(), Ok(response.to_string())));
        self
    }

    /// Fail whenever the prompt contains `needle`.
    pub fn fail_when(mut self, needle: &str) -> Self {
        self.rules.push((needle.to_string(), Err(Error::CompletionUnavailable(format!("scripted failure for {needle}")))));
        self
    }

    pub fn then_reply(self, response: &str) -> Self {
        self.queue.lock().push_back(Ok(response.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

impl CompletionProvider for ScriptedCompletion {
    fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(request.prompt.clone());
        if let Some((_, response)) = self.rules.iter().find(|(needle, _)| request.prompt.contains(needle.as_str())) {
            return response.clone();
        }
        self.queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Error::CompletionUnavailable("no scripted reply".into())))
    }
}
