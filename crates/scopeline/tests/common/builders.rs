//! Builders for scripted model responses used across integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use scopeline::cancel::CancelFlag;
use scopeline::gateway::{ChatMessage, GatewayError, LlmGateway};

/// A valid generation response: one section, three items. Matches the
/// shapes the assembler expects.
pub fn draft_response() -> String {
    r#"Here is the breakdown:
{"sections": [
  {"title": "Authentication", "items": [
    {"itemName": "Login form", "itemDetail": "Email and password login", "category": "frontend"},
    {"itemName": "Session handling", "itemDetail": "Token issuance and refresh", "category": "backend"},
    {"itemName": "Password reset", "itemDetail": "Reset mail flow", "category": "backend"}
  ]}
]}"#
    .to_string()
}

/// A valid estimation response covering all three items of
/// `draft_response`.
pub fn estimates_response() -> String {
    r#"{"estimates": [
  {"section": "Authentication", "item": "Login form", "hours": {"development": 8, "testing": 2}},
  {"section": "Authentication", "item": "Session handling", "hours": {"development": 12, "testing": 4}},
  {"section": "Authentication", "item": "Password reset", "hours": {"development": 6, "testing": 2}}
]}"#
    .to_string()
}

/// An estimation response with one valid entry and one hallucinated item.
pub fn estimates_with_phantom_response() -> String {
    r#"{"estimates": [
  {"section": "Authentication", "item": "Login form", "hours": {"development": 8}},
  {"section": "Billing", "item": "Invented item", "hours": {"development": 99}}
]}"#
    .to_string()
}

/// The estimation columns the harness configures.
pub fn columns() -> Vec<String> {
    vec!["development".to_string(), "testing".to_string()]
}

/// Gateway that replays a fixed script of responses and records every
/// prompt it was asked to complete.
pub struct ScriptedGateway {
    responses: Mutex<VecDeque<Result<String, GatewayError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn new(script: Vec<Result<String, GatewayError>>) -> Self {
        Self {
            responses: Mutex::new(script.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Number of completions the pipeline requested so far.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl LlmGateway for ScriptedGateway {
    fn complete(
        &self,
        prompt: &str,
        _history: &[ChatMessage],
        cancel: &CancelFlag,
    ) -> Result<String, GatewayError> {
        if cancel.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(GatewayError::Provider {
                    status: 500,
                    body: "scripted gateway exhausted".to_string(),
                })
            })
    }
}

/// Gateway that answers by prompt kind instead of a fixed script: draft
/// JSON for generation prompts, estimate JSON for estimation prompts.
/// Robust to any interleaving, which makes it the right double for
/// concurrency tests.
pub struct RoutedGateway;

impl LlmGateway for RoutedGateway {
    fn complete(
        &self,
        prompt: &str,
        _history: &[ChatMessage],
        cancel: &CancelFlag,
    ) -> Result<String, GatewayError> {
        if cancel.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }
        if prompt.contains("estimator") {
            Ok(estimates_response())
        } else {
            Ok(draft_response())
        }
    }
}

/// Boxable handle to a shared `ScriptedGateway` so tests can keep a probe.
pub struct SharedGateway(pub Arc<ScriptedGateway>);

impl LlmGateway for SharedGateway {
    fn complete(
        &self,
        prompt: &str,
        history: &[ChatMessage],
        cancel: &CancelFlag,
    ) -> Result<String, GatewayError> {
        self.0.complete(prompt, history, cancel)
    }
}
