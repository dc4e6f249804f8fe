//! Reasoning-aware chat relay core.
//!
//! `thinkrelay` holds the logic that sits between a chat front end and a
//! remote text-generation model that emits its chain of thought inline,
//! wrapped in `<think>` … `</think>` markers. Two problems live here:
//!
//! 1. **Splitting a live stream.** The model's output arrives in arbitrary
//!    chunks. After every chunk the full buffer is re-split into an
//!    *annotation* channel (the reasoning trace) and a *visible* channel (the
//!    answer). See [`annotation::extract`] and [`stream::ResponseBuffer`].
//!
//! 2. **Fitting history into a token budget.** Each submission renders the
//!    system prompt plus the conversation through a model-specific
//!    [`PromptTemplate`](prompt::PromptTemplate), measures it with a
//!    [`TokenCounter`](prompt::TokenCounter), and drops the oldest exchange
//!    (keeping the first turn pinned) until it fits. See
//!    [`PromptBudgeter`](context::PromptBudgeter).
//!
//! Earlier reasoning traces never re-enter the prompt: the budgeter strips
//! annotation regions from every turn before rendering.
//!
//! # Getting started
//!
//! ```
//! use thinkrelay::prelude::*;
//!
//! let history = vec![Turn::user("hi")];
//! let budgeter = PromptBudgeter::new(BudgetConfig::default());
//! let built = budgeter
//!     .build("You are helpful.", &history, &LlamaTemplate, &CharRatioCounter::default())
//!     .unwrap();
//! assert!(!built.truncated);
//!
//! let split = thinkrelay::annotation::extract("<think>hmm</think> Hello!", &Markers::default());
//! assert_eq!(split.annotation, "hmm");
//! assert_eq!(split.visible, "Hello!");
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`annotation`] | Marker pair, extraction of annotation/visible channels, stripping helper |
//! | [`context`] | [`PromptBudgeter`](context::PromptBudgeter), budget config and errors |
//! | [`prompt`] | Chat templates (Llama 2, Llama 3, closures) and token counters |
//! | [`stream`] | Incremental response buffer, async chunk consumption, response metrics |
//! | [`session`] | [`ChatSession`](session::ChatSession) controller tying the pieces together |
//! | [`models`] | Model catalog and template-family selection |
//! | [`config`] | [`ChatConfig`](config::ChatConfig) and generation settings |

pub mod annotation;
pub mod config;
pub mod context;
pub mod models;
pub mod prelude;
pub mod prompt;
pub mod session;
pub mod stream;

use serde::{Deserialize, Serialize};

// ── Constants ──────────────────────────────────────────────────────

/// Default model id for all requests.
pub const DEFAULT_MODEL: &str = "deepseek-ai/deepseek-r1";

/// Default system prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

// ── Conversation types ─────────────────────────────────────────────

/// Role of a participant in the conversation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in a conversation, exactly as typed by the user or streamed
/// by the model. `text` may still contain annotation markers.
///
/// Turns are never edited once appended to a history; they are only
/// removed (truncation, reset) or appended.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// A `{role, content}` pair handed to a [`PromptTemplate`](prompt::PromptTemplate).
///
/// Unlike [`Turn`], `content` has already had its annotation region removed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_displays_lowercase() {
        assert_eq!(Role::System.to_string(), "system");
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn turn_round_trips_through_json() {
        let turn = Turn::assistant("<think>x</think> y");
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains(r#""role":"assistant""#));
        let back: Turn = serde_json::from_str(&json).unwrap();
        assert_eq!(back, turn);
    }

    #[test]
    fn turn_constructors_set_role() {
        assert!(Turn::user("a").is_user());
        assert!(!Turn::assistant("a").is_user());
        assert_eq!(Turn::system("s").role, Role::System);
    }
}
