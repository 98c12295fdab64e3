//! Prompt templates and placeholder substitution.

use crate::coerce;
use crate::protocol::{Content, GetPromptResult, Prompt, PromptArgument, PromptMessage, Role};
use serde_json::{Map, Value};

/// Registered prompt.
#[derive(Debug, Clone)]
pub struct PromptEntry {
    pub name: String,
    pub description: String,
    pub template: String,
    /// Declared placeholders, in registration order.
    pub arguments: Vec<PromptArgument>,
}

impl PromptEntry {
    pub fn definition(&self) -> Prompt {
        Prompt {
            name: self.name.clone(),
            description: self.description.clone(),
            arguments: self.arguments.clone(),
        }
    }

    /// Fill the template and wrap it as a single user message.
    pub fn render(&self, arguments: &Map<String, Value>) -> GetPromptResult {
        GetPromptResult {
            description: Some(self.description.clone()),
            messages: vec![PromptMessage {
                role: Role::User,
                content: Content::text(substitute(&self.template, arguments)),
            }],
        }
    }
}

/// Replace each `{key}` with the text of `arguments[key]`.
///
/// The template is scanned once from left to right, so text produced by a
/// substitution is never itself substituted. Placeholders without a matching
/// argument are left as they are.
pub fn substitute(template: &str, arguments: &Map<String, Value>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];

        let replacement = tail[1..]
            .find('}')
            .and_then(|close| arguments.get(&tail[1..=close]).map(|v| (close, v)));

        match replacement {
            Some((close, value)) => {
                out.push_str(&coerce::to_text(value));
                rest = &tail[close + 2..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}
