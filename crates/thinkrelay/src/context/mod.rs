//! Context window management for completion-style prompts.
//!
//! A completion endpoint sees the whole conversation as one string, so every
//! submission re-renders the history and must fit the model's window.
//! [`PromptBudgeter`] does that with a fixed, deterministic policy:
//!
//! - **Pinned prefix** — the first turn is kept as a topic anchor.
//! - **Oldest exchange first** — two turns (one exchange) are dropped per step.
//! - **Newest exchange kept** — the turn being answered always survives.
//!
//! Truncated prompts carry an elision marker so the omission is visible to
//! the model and to anyone reading logs.

pub mod budget;

// Re-export commonly used items at the module level.
pub use budget::{
    BudgetConfig, BudgetError, PROMPT_TOO_LARGE_MESSAGE, PromptBudgeter, PromptBuildResult,
};
