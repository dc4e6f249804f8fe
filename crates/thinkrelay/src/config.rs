//! Configuration for a [`ChatSession`](crate::session::ChatSession).
//!
//! Everything the front end used to keep in mutable UI state (system prompt,
//! sampling parameters, token budget) is an explicit value here and is
//! passed into the core on every call.
//!
//! # Examples
//!
//! Defaults:
//!
//! ```
//! let config = thinkrelay::config::ChatConfig::default();
//! assert_eq!(config.budget.max_tokens, 8192);
//! ```
//!
//! Builder methods:
//!
//! ```
//! use thinkrelay::config::ChatConfig;
//!
//! let config = ChatConfig::default()
//!     .with_system_prompt("You are terse.")
//!     .with_max_tokens(4096)
//!     .with_temperature(0.2);
//! assert_eq!(config.generation.temperature, 0.2);
//! ```
//!
//! From a JSON file (all fields optional):
//!
//! ```json
//! { "model": "deepseek-ai/deepseek-r1", "budget": { "max_tokens": 4096 } }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::BudgetConfig;
use crate::prompt::{CharRatioCounter, DEFAULT_CHARS_PER_TOKEN, TemplateFamily};

/// Sampling parameters forwarded with each request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub top_p: f32,
    /// Maximum tokens the model may generate in its response.
    pub max_new_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.75,
            top_p: 0.9,
            max_new_tokens: 800,
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Provider model id.
    pub model: String,
    pub system_prompt: String,
    pub generation: GenerationSettings,
    pub budget: BudgetConfig,
    /// Ratio used by the default token counter.
    pub chars_per_token: f64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: crate::DEFAULT_MODEL.to_string(),
            system_prompt: crate::DEFAULT_SYSTEM_PROMPT.to_string(),
            generation: GenerationSettings::default(),
            budget: BudgetConfig::default(),
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
        }
    }
}

/// Failure loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ChatConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Override the prompt token ceiling.
    pub fn with_max_tokens(mut self, max: usize) -> Self {
        self.budget.max_tokens = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.generation.temperature = temperature;
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.generation.top_p = top_p;
        self
    }

    pub fn with_max_new_tokens(mut self, max: u32) -> Self {
        self.generation.max_new_tokens = max;
        self
    }

    pub fn with_budget(mut self, budget: BudgetConfig) -> Self {
        self.budget = budget;
        self
    }

    /// Template family for the configured model.
    pub fn template(&self) -> TemplateFamily {
        crate::models::template_for(&self.model)
    }

    /// Default token counter for this configuration.
    pub fn counter(&self) -> CharRatioCounter {
        CharRatioCounter::with_ratio(self.chars_per_token)
    }
}
