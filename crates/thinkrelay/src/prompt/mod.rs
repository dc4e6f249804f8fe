//! Prompt rendering collaborators: chat templates and token counters.
//!
//! The [`PromptBudgeter`](crate::context::PromptBudgeter) treats both as
//! black boxes behind two traits:
//!
//! 1. **[`PromptTemplate`]** — turns an ordered list of [`ChatMessage`](crate::ChatMessage)
//!    into one prompt string in a model family's chat format. Built-ins:
//!    [`LlamaTemplate`], [`Llama3Template`], the name-selected
//!    [`TemplateFamily`], and [`FnTemplate`] for closures.
//!
//! 2. **[`TokenCounter`]** — estimates how many tokens a string occupies.
//!    Built-ins: [`CharRatioCounter`] and [`FnCounter`].
//!
//! Both must be deterministic. A counter must also be monotone: removing
//! text never increases the count, or truncation may not converge.

pub mod template;
pub mod tokens;

pub use template::{FnTemplate, Llama3Template, LlamaTemplate, PromptTemplate, TemplateFamily};
pub use tokens::{CharRatioCounter, DEFAULT_CHARS_PER_TOKEN, FnCounter, TokenCounter};

/// Error raised by an injected template or counter. Passed through to the
/// caller untouched.
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;
