//! Convenience re-exports for common `thinkrelay` types.
//!
//! ```
//! use thinkrelay::prelude::*;
//! ```
//!
//! Pulls in the conversation types, the budgeter and its config, the
//! annotation markers, the built-in templates and counters, and the session
//! controller. Streaming helpers live in [`crate::stream`].

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{ChatMessage, Role, Turn};

// ── Annotation channel ──────────────────────────────────────────────
pub use crate::annotation::{ExtractionResult, Markers, extract, strip_annotation};

// ── Budgeting ───────────────────────────────────────────────────────
pub use crate::context::{BudgetConfig, BudgetError, PromptBudgeter, PromptBuildResult};

// ── Templates and counters ──────────────────────────────────────────
pub use crate::prompt::{
    CharRatioCounter, FnCounter, FnTemplate, Llama3Template, LlamaTemplate, PromptTemplate,
    TemplateFamily, TokenCounter,
};

// ── Session ─────────────────────────────────────────────────────────
pub use crate::config::ChatConfig;
pub use crate::session::{ChatSession, CompletionRequest};
