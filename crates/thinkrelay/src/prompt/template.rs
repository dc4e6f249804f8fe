//! Chat templates for completion-style models.
//!
//! Completion endpoints take a single prompt string, so the conversation has
//! to be flattened into whatever chat grammar the model was tuned on. Each
//! model family gets its own [`PromptTemplate`]; [`TemplateFamily`] picks one
//! from a model's display name.

use super::CollaboratorError;
use crate::{ChatMessage, Role};

/// Converts an ordered list of messages into a single prompt string.
///
/// Implementations must be deterministic: identical input, identical output.
pub trait PromptTemplate {
    fn render(&self, messages: &[ChatMessage]) -> Result<String, CollaboratorError>;
}

impl<T: PromptTemplate + ?Sized> PromptTemplate for &T {
    fn render(&self, messages: &[ChatMessage]) -> Result<String, CollaboratorError> {
        (**self).render(messages)
    }
}

impl<T: PromptTemplate + ?Sized> PromptTemplate for Box<T> {
    fn render(&self, messages: &[ChatMessage]) -> Result<String, CollaboratorError> {
        (**self).render(messages)
    }
}

// ── Llama 2 ────────────────────────────────────────────────────────

/// Llama 2 chat format.
///
/// ```text
/// <s>[INST] <<SYS>>
/// {system}
/// <</SYS>>
///
/// {user} [/INST] {assistant} </s><s>[INST] {user} [/INST]
/// ```
///
/// The system block is folded into the first user instruction that follows
/// it and omitted when empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct LlamaTemplate;

impl PromptTemplate for LlamaTemplate {
    fn render(&self, messages: &[ChatMessage]) -> Result<String, CollaboratorError> {
        let mut out = String::new();
        let mut pending_system: Option<&str> = None;

        for msg in messages {
            match msg.role {
                Role::System => {
                    if !msg.content.is_empty() {
                        pending_system = Some(&msg.content);
                    }
                }
                Role::User => {
                    out.push_str("<s>[INST] ");
                    if let Some(system) = pending_system.take() {
                        out.push_str(&format!("<<SYS>>\n{system}\n<</SYS>>\n\n"));
                    }
                    out.push_str(&msg.content);
                    out.push_str(" [/INST]");
                }
                Role::Assistant => {
                    out.push_str(&format!(" {} </s>", msg.content));
                }
            }
        }

        Ok(out)
    }
}

// ── Llama 3 ────────────────────────────────────────────────────────

/// Llama 3 header/eot format, ending with an open assistant header so the
/// model continues as the assistant.
#[derive(Debug, Clone, Copy, Default)]
pub struct Llama3Template;

impl PromptTemplate for Llama3Template {
    fn render(&self, messages: &[ChatMessage]) -> Result<String, CollaboratorError> {
        let mut out = String::from("<|begin_of_text|>");
        for msg in messages {
            if msg.role == Role::System && msg.content.is_empty() {
                continue;
            }
            out.push_str(&format!(
                "<|start_header_id|>{}<|end_header_id|>\n\n{}<|eot_id|>",
                msg.role, msg.content
            ));
        }
        out.push_str("<|start_header_id|>assistant<|end_header_id|>\n\n");
        Ok(out)
    }
}

// ── Family selection ───────────────────────────────────────────────

/// Template family, selected from a model's display name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemplateFamily {
    #[default]
    Llama,
    Llama3,
}

impl TemplateFamily {
    /// Names containing `"Llama 3"` use the Llama 3 format; everything else
    /// falls back to the Llama 2 format.
    pub fn for_model_name(name: &str) -> Self {
        if name.contains("Llama 3") {
            TemplateFamily::Llama3
        } else {
            TemplateFamily::Llama
        }
    }
}

impl PromptTemplate for TemplateFamily {
    fn render(&self, messages: &[ChatMessage]) -> Result<String, CollaboratorError> {
        match self {
            TemplateFamily::Llama => LlamaTemplate.render(messages),
            TemplateFamily::Llama3 => Llama3Template.render(messages),
        }
    }
}

// ── Closures ───────────────────────────────────────────────────────

/// Wraps an infallible closure as a [`PromptTemplate`].
///
/// ```
/// use thinkrelay::prompt::{FnTemplate, PromptTemplate};
/// use thinkrelay::ChatMessage;
///
/// let plain = FnTemplate::new(|msgs: &[ChatMessage]| {
///     msgs.iter().map(|m| format!("{}: {}", m.role, m.content)).collect::<Vec<_>>().join("\n")
/// });
/// let out = plain.render(&[ChatMessage::new(thinkrelay::Role::User, "hi")]).unwrap();
/// assert_eq!(out, "user: hi");
/// ```
pub struct FnTemplate<F> {
    f: F,
}

impl<F> FnTemplate<F>
where
    F: Fn(&[ChatMessage]) -> String,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> PromptTemplate for FnTemplate<F>
where
    F: Fn(&[ChatMessage]) -> String,
{
    fn render(&self, messages: &[ChatMessage]) -> Result<String, CollaboratorError> {
        Ok((self.f)(messages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation() -> Vec<ChatMessage> {
        vec![
            ChatMessage::new(Role::System, "Be brief."),
            ChatMessage::new(Role::User, "hi"),
            ChatMessage::new(Role::Assistant, "hello"),
            ChatMessage::new(Role::User, "how are you?"),
        ]
    }

    #[test]
    fn llama_folds_system_into_first_instruction() {
        let out = LlamaTemplate.render(&conversation()).unwrap();
        assert_eq!(
            out,
            "<s>[INST] <<SYS>>\nBe brief.\n<</SYS>>\n\nhi [/INST] hello </s>\
             <s>[INST] how are you? [/INST]"
        );
    }

    #[test]
    fn llama_skips_empty_system() {
        let msgs = vec![
            ChatMessage::new(Role::System, ""),
            ChatMessage::new(Role::User, "hi"),
        ];
        assert_eq!(LlamaTemplate.render(&msgs).unwrap(), "<s>[INST] hi [/INST]");
    }

    #[test]
    fn llama3_wraps_every_message_in_headers() {
        let out = Llama3Template.render(&conversation()).unwrap();
        assert!(out.starts_with("<|begin_of_text|><|start_header_id|>system<|end_header_id|>"));
        assert_eq!(out.matches("<|eot_id|>").count(), 4);
        assert!(out.ends_with("<|start_header_id|>assistant<|end_header_id|>\n\n"));
    }

    #[test]
    fn family_selection_by_name() {
        assert_eq!(
            TemplateFamily::for_model_name("Meta Llama 3 70B"),
            TemplateFamily::Llama3
        );
        assert_eq!(
            TemplateFamily::for_model_name("DeepSeek R1"),
            TemplateFamily::Llama
        );
        assert_eq!(
            TemplateFamily::for_model_name("llama 3"),
            TemplateFamily::Llama
        );
    }

    #[test]
    fn family_dispatches_to_concrete_template() {
        let msgs = conversation();
        assert_eq!(
            TemplateFamily::Llama3.render(&msgs).unwrap(),
            Llama3Template.render(&msgs).unwrap()
        );
        assert_eq!(
            TemplateFamily::Llama.render(&msgs).unwrap(),
            LlamaTemplate.render(&msgs).unwrap()
        );
    }

    #[test]
    fn templates_are_deterministic() {
        let msgs = conversation();
        assert_eq!(
            LlamaTemplate.render(&msgs).unwrap(),
            LlamaTemplate.render(&msgs).unwrap()
        );
    }

    #[test]
    fn boxed_and_borrowed_templates_render() {
        let boxed: Box<dyn PromptTemplate> = Box::new(Llama3Template);
        let borrowed = &LlamaTemplate;
        assert!(boxed.render(&conversation()).is_ok());
        assert!(borrowed.render(&conversation()).is_ok());
    }
}
