//! Model catalog.
//!
//! Each entry pairs a provider model id with the display metadata the front
//! end shows in its model picker. The display name also decides which chat
//! template the prompt is rendered with.

use serde::Serialize;

use crate::prompt::TemplateFamily;

/// A model the front end can talk to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    /// Provider model id, sent with every request.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Short display name for narrow layouts.
    pub shortened: &'static str,
    pub emoji: &'static str,
    pub description: &'static str,
    /// Flag for a "new" badge.
    pub is_new: bool,
}

impl ModelInfo {
    /// Chat template family for this model, chosen by display name.
    pub fn template(&self) -> TemplateFamily {
        TemplateFamily::for_model_name(self.name)
    }
}

/// Models offered by default. The first entry is the default selection.
pub const MODELS: &[ModelInfo] = &[ModelInfo {
    id: crate::DEFAULT_MODEL,
    name: "DeepSeek R1",
    shortened: "DeepSeek",
    emoji: "🐳",
    description: "The most accurate and powerful LLM.",
    is_new: true,
}];

/// Look up a catalog entry by provider id.
pub fn find_model(id: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.id == id)
}

/// The default catalog entry.
pub fn default_model() -> &'static ModelInfo {
    &MODELS[0]
}

/// Template for a model id. Unknown ids are matched by the id itself, so
/// a `"meta/Llama 3 …"` style name still selects the right family.
pub fn template_for(id: &str) -> TemplateFamily {
    find_model(id)
        .map(ModelInfo::template)
        .unwrap_or_else(|| TemplateFamily::for_model_name(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_is_deepseek() {
        let model = default_model();
        assert_eq!(model.id, "deepseek-ai/deepseek-r1");
        assert_eq!(model.shortened, "DeepSeek");
        assert_eq!(model.template(), TemplateFamily::Llama);
    }

    #[test]
    fn find_model_by_id() {
        assert!(find_model(crate::DEFAULT_MODEL).is_some());
        assert!(find_model("nope/unknown").is_none());
    }

    #[test]
    fn template_for_unknown_model_uses_name_match() {
        assert_eq!(template_for("meta/Llama 3 8B"), TemplateFamily::Llama3);
        assert_eq!(template_for("mistral/7b"), TemplateFamily::Llama);
    }
}
