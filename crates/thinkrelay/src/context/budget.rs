//! Prompt budgeting: fits a growing conversation into a model's token limit.
//!
//! The prompt is rendered from the system instruction plus the whole
//! history. While it is over budget, the oldest complete exchange after the
//! pinned first turn is dropped and the prompt is rendered again, prefixed
//! with an elision marker so the model can tell earlier context is missing.
//!
//! The first turn stays pinned as a topic anchor even though it is the
//! oldest, and the most recent exchange is never dropped. If the history
//! gets shorter than `min_history_length` and is still too large, budgeting
//! fails instead of sending an oversized prompt.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::annotation::{Markers, strip_annotation};
use crate::prompt::{CollaboratorError, PromptTemplate, TokenCounter};
use crate::{ChatMessage, Role, Turn};

/// Default prompt ceiling in tokens.
pub const DEFAULT_MAX_TOKENS: usize = 8192;

/// History shorter than this cannot be truncated further.
pub const DEFAULT_MIN_HISTORY_LENGTH: usize = 3;

/// Turns at the head of the history that are never dropped.
pub const DEFAULT_PINNED_TURNS: usize = 1;

/// Turns dropped per truncation step (one user/assistant exchange).
pub const DEFAULT_DROP_PER_STEP: usize = 2;

/// Literal prefixed to a prompt whose history was truncated.
pub const DEFAULT_ELISION_MARKER: &str = "<!-- snip -->";

/// Message shown to the user when even the shortest history does not fit.
pub const PROMPT_TOO_LARGE_MESSAGE: &str =
    "Your message is too long. Please try again with a shorter message.";

/// Truncation policy and limits for [`PromptBudgeter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Ceiling for the rendered prompt, as measured by the token counter.
    pub max_tokens: usize,
    /// Truncation stops (and fails) once history is shorter than this.
    pub min_history_length: usize,
    /// Leading turns kept regardless of age.
    pub pinned_turns: usize,
    /// Turns removed per truncation step.
    pub drop_per_step: usize,
    /// Prefix signalling omitted context.
    pub elision_marker: String,
    /// Annotation markers stripped from every turn before rendering.
    pub markers: Markers,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            min_history_length: DEFAULT_MIN_HISTORY_LENGTH,
            pinned_turns: DEFAULT_PINNED_TURNS,
            drop_per_step: DEFAULT_DROP_PER_STEP,
            elision_marker: DEFAULT_ELISION_MARKER.to_string(),
            markers: Markers::default(),
        }
    }
}

impl BudgetConfig {
    /// Override the prompt ceiling (in tokens).
    pub fn with_max_tokens(mut self, max: usize) -> Self {
        self.max_tokens = max;
        self
    }

    pub fn with_min_history_length(mut self, len: usize) -> Self {
        self.min_history_length = len;
        self
    }

    /// Set how many leading turns are pinned and how many turns each
    /// truncation step removes.
    pub fn with_truncation_policy(mut self, pinned_turns: usize, drop_per_step: usize) -> Self {
        self.pinned_turns = pinned_turns;
        self.drop_per_step = drop_per_step;
        self
    }

    pub fn with_elision_marker(mut self, marker: impl Into<String>) -> Self {
        self.elision_marker = marker.into();
        self
    }

    pub fn with_markers(mut self, markers: Markers) -> Self {
        self.markers = markers;
        self
    }
}

/// Budgeting failure.
#[derive(Debug, Error)]
pub enum BudgetError {
    /// History cannot be shortened further and the prompt is still over budget.
    #[error(
        "prompt needs ~{tokens} tokens but the budget is {max_tokens} ({turns} turn(s) left in history)"
    )]
    PromptTooLarge {
        tokens: usize,
        max_tokens: usize,
        turns: usize,
    },
    /// The injected template failed.
    #[error(transparent)]
    Template(CollaboratorError),
    /// The injected token counter failed.
    #[error(transparent)]
    Tokenizer(CollaboratorError),
}

impl BudgetError {
    /// Text suitable for showing to the end user.
    pub fn user_message(&self) -> String {
        match self {
            BudgetError::PromptTooLarge { .. } => PROMPT_TOO_LARGE_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

/// A prompt that fits the budget, plus the history it was rendered from.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptBuildResult {
    /// Prompt ready to send to the model.
    pub prompt_text: String,
    /// Turns actually used, with their original (unstripped) text.
    pub history: Vec<Turn>,
    /// Whether any turns were dropped.
    pub truncated: bool,
    /// Number of turns dropped.
    pub dropped_turns: usize,
    /// Whether the newest turn, the one being answered, was dropped.
    pub latest_dropped: bool,
    /// Token count of `prompt_text`.
    pub tokens: usize,
}

impl PromptBuildResult {
    /// Format as a short log-friendly string.
    pub fn to_log_string(&self) -> String {
        format!(
            "prompt: {} tokens, {} turn(s), {} dropped{}",
            self.tokens,
            self.history.len(),
            self.dropped_turns,
            if self.latest_dropped { " (including the latest)" } else { "" },
        )
    }
}

/// Assembles prompts that fit a token ceiling.
///
/// # Example
///
/// ```
/// use thinkrelay::context::{BudgetConfig, PromptBudgeter};
/// use thinkrelay::prompt::{FnCounter, LlamaTemplate};
/// use thinkrelay::Turn;
///
/// let budgeter = PromptBudgeter::new(BudgetConfig::default().with_max_tokens(4096));
/// let history = vec![Turn::user("What is 2 + 2?")];
/// let built = budgeter
///     .build("You are helpful.", &history, &LlamaTemplate, &FnCounter::new(|s: &str| s.len() / 4))
///     .unwrap();
/// assert!(!built.truncated);
/// assert!(built.prompt_text.ends_with('\n'));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PromptBudgeter {
    config: BudgetConfig,
}

impl PromptBudgeter {
    pub fn new(config: BudgetConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    /// Render `system_prompt` + `history` and truncate until it fits.
    ///
    /// `history` is never modified; the returned result carries the
    /// possibly-shortened copy that was used. Template and counter errors
    /// are returned as-is.
    pub fn build<T, C>(
        &self,
        system_prompt: &str,
        history: &[Turn],
        template: &T,
        counter: &C,
    ) -> Result<PromptBuildResult, BudgetError>
    where
        T: PromptTemplate + ?Sized,
        C: TokenCounter + ?Sized,
    {
        let markers = &self.config.markers;
        let system = ChatMessage::new(Role::System, strip_annotation(system_prompt, markers));

        let mut kept: Vec<Turn> = history.to_vec();
        let mut stripped: Vec<ChatMessage> = kept
            .iter()
            .map(|turn| ChatMessage::new(turn.role, strip_annotation(&turn.text, markers)))
            .collect();

        let mut prompt = self.render(&system, &stripped, template, false)?;
        let mut tokens = counter.count(&prompt).map_err(BudgetError::Tokenizer)?;
        let mut dropped_turns = 0;
        let mut latest_dropped = false;

        debug!(
            "Budgeting {} turn(s): ~{tokens} tokens (max {})",
            kept.len(),
            self.config.max_tokens
        );

        while tokens > self.config.max_tokens {
            if kept.len() < self.config.min_history_length {
                warn!(
                    "Prompt still over budget with {} turn(s): {tokens} > {}",
                    kept.len(),
                    self.config.max_tokens
                );
                return Err(self.too_large(tokens, kept.len()));
            }

            let range = self.drop_range(kept.len());
            if range.is_empty() {
                warn!("Truncation policy cannot remove any of {} turn(s)", kept.len());
                return Err(self.too_large(tokens, kept.len()));
            }

            if range.end == kept.len() && !latest_dropped {
                warn!(
                    "Dropping the latest turn to fit {} tokens; the prompt no longer holds it",
                    self.config.max_tokens
                );
                latest_dropped = true;
            }

            let removed = range.len();
            kept.drain(range.clone());
            stripped.drain(range);
            dropped_turns += removed;

            prompt = self.render(&system, &stripped, template, true)?;
            tokens = counter.count(&prompt).map_err(BudgetError::Tokenizer)?;
            trace!(
                "Dropped {removed} turn(s), {} left: ~{tokens} tokens",
                kept.len()
            );
        }

        if dropped_turns > 0 {
            debug!("History truncated by {dropped_turns} turn(s) to fit the budget");
        }

        Ok(PromptBuildResult {
            prompt_text: prompt,
            history: kept,
            truncated: dropped_turns > 0,
            dropped_turns,
            latest_dropped,
            tokens,
        })
    }

    /// Indices of the oldest unpinned exchange, clamped to the history.
    fn drop_range(&self, len: usize) -> std::ops::Range<usize> {
        let start = self.config.pinned_turns.min(len);
        let end = start.saturating_add(self.config.drop_per_step).min(len);
        start..end
    }

    fn render<T: PromptTemplate + ?Sized>(
        &self,
        system: &ChatMessage,
        turns: &[ChatMessage],
        template: &T,
        elided: bool,
    ) -> Result<String, BudgetError> {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        messages.push(system.clone());
        messages.extend_from_slice(turns);

        let rendered = template.render(&messages).map_err(BudgetError::Template)?;
        if elided {
            Ok(format!("{}\n{rendered}\n", self.config.elision_marker))
        } else {
            Ok(format!("{rendered}\n"))
        }
    }

    fn too_large(&self, tokens: usize, turns: usize) -> BudgetError {
        BudgetError::PromptTooLarge {
            tokens,
            max_tokens: self.config.max_tokens,
            turns,
        }
    }
}
