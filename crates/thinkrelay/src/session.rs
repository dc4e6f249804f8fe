//! Chat session controller.
//!
//! [`ChatSession`] owns the conversation history and the response currently
//! being streamed. A submission folds the finished response and the new user
//! message into a *copy* of the history, budgets it, and only commits the
//! copy once a prompt fits. A rejected submission leaves the session exactly
//! as it was, so the user can shorten the message and try again.

use serde::Serialize;
use tracing::{debug, info};

use crate::annotation::{ExtractionResult, extract};
use crate::config::ChatConfig;
use crate::context::{BudgetError, PromptBudgeter};
use crate::prompt::{CharRatioCounter, PromptTemplate, TemplateFamily, TokenCounter};
use crate::stream::{ResponseBuffer, ResponseMetrics};
use crate::{Role, Turn};

/// Request body for the completion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub system_prompt: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    /// Whether older turns were dropped to fit the budget.
    #[serde(skip)]
    pub truncated: bool,
}

/// One conversation: history, in-flight response and timings.
#[derive(Debug)]
pub struct ChatSession<T = TemplateFamily, C = CharRatioCounter> {
    config: ChatConfig,
    budgeter: PromptBudgeter,
    template: T,
    counter: C,
    history: Vec<Turn>,
    response: ResponseBuffer,
    metrics: ResponseMetrics,
}

impl ChatSession {
    /// Session using the configured model's template and the default counter.
    pub fn new(config: ChatConfig) -> Self {
        let template = config.template();
        let counter = config.counter();
        Self::with_collaborators(config, template, counter)
    }
}

impl<T: PromptTemplate, C: TokenCounter> ChatSession<T, C> {
    /// Session with an explicit template and token counter.
    pub fn with_collaborators(config: ChatConfig, template: T, counter: C) -> Self {
        let budgeter = PromptBudgeter::new(config.budget.clone());
        let response = ResponseBuffer::new(config.budget.markers.clone());
        Self {
            config,
            budgeter,
            template,
            counter,
            history: Vec::new(),
            response,
            metrics: ResponseMetrics::default(),
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Replace the system prompt used by later submissions.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.config.system_prompt = prompt.into();
    }

    /// Committed history, oldest first.
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn metrics(&self) -> &ResponseMetrics {
        &self.metrics
    }

    /// Build the next request from `user_text`.
    ///
    /// The finished response (if any) and the user turn are appended to a
    /// copy of the history which is then budgeted. On success the copy,
    /// possibly truncated, replaces the history and the response buffer is
    /// cleared for the next stream. On failure nothing changes.
    pub fn submit(
        &mut self,
        user_text: impl Into<String>,
    ) -> Result<CompletionRequest, BudgetError> {
        let mut candidate = self.history.clone();
        if !self.response.is_empty() {
            candidate.push(Turn::assistant(self.response.text()));
        }
        candidate.push(Turn::user(user_text));

        let built = self.budgeter.build(
            &self.config.system_prompt,
            &candidate,
            &self.template,
            &self.counter,
        )?;
        debug!("{}", built.to_log_string());
        if built.truncated {
            info!(
                "Dropped {} earlier turn(s) to fit {} tokens",
                built.dropped_turns, self.config.budget.max_tokens
            );
        }

        self.history = built.history;
        self.response.clear();
        self.metrics = ResponseMetrics::start();

        Ok(CompletionRequest {
            model: self.config.model.clone(),
            prompt: built.prompt_text,
            system_prompt: self.config.system_prompt.clone(),
            temperature: self.config.generation.temperature,
            top_p: self.config.generation.top_p,
            max_tokens: self.config.generation.max_new_tokens,
            truncated: built.truncated,
        })
    }

    /// Append a streamed delta and return the split of the whole response.
    ///
    /// An empty delta changes nothing, including the first-chunk time.
    pub fn push_chunk(&mut self, delta: &str) -> ExtractionResult {
        if delta.is_empty() {
            return self.response.snapshot();
        }
        self.metrics.mark_first_chunk();
        self.response.push(delta)
    }

    /// Mark the in-flight response as complete.
    pub fn finish(&mut self) -> &ResponseMetrics {
        self.metrics.mark_complete();
        debug!("{}", self.metrics.to_log_string());
        &self.metrics
    }

    /// Split of the in-flight response.
    pub fn current_response(&self) -> ExtractionResult {
        self.response.snapshot()
    }

    /// Committed turns split into their channels, followed by the
    /// in-flight response when there is one.
    pub fn transcript(&self) -> Vec<(Role, ExtractionResult)> {
        let markers = &self.config.budget.markers;
        let mut entries: Vec<(Role, ExtractionResult)> = self
            .history
            .iter()
            .map(|turn| (turn.role, extract(&turn.text, markers)))
            .collect();
        if !self.response.is_empty() {
            entries.push((Role::Assistant, self.response.snapshot()));
        }
        entries
    }

    /// Forget the conversation.
    pub fn reset(&mut self) {
        self.history.clear();
        self.response.clear();
        self.metrics = ResponseMetrics::default();
    }
}
