use std::sync::Arc;

use crate::action::{parse_response, ParsedResponse};
use crate::backend::{BackendError, LanguageModel, RetryPolicy};
use crate::core::ConversationTurn;
use crate::tools::{ToolError, ToolRegistry};

/// Everything that goes into a tool-calling prompt
#[derive(Debug, Clone, Copy)]
pub struct PromptParts<'a> {
    /// Persona or tier instruction block
    pub instruction: &'a str,
    pub memory: &'a str,
    pub history: &'a [ConversationTurn],
    pub tools: &'a str,
    pub language: &'a str,
    pub command: &'a str,
}

pub fn build_prompt(parts: &PromptParts<'_>) -> String {
    let mut prompt = String::new();
    prompt.push_str(parts.instruction.trim());
    prompt.push_str("\n\n");

    if !parts.memory.trim().is_empty() {
        prompt.push_str(parts.memory.trim_end());
        prompt.push_str("\n\n");
    }

    prompt.push_str("Conversation History:\n");
    for turn in parts.history {
        prompt.push_str(&turn.prompt_line());
        prompt.push('\n');
    }

    prompt.push_str("\nTOOLS:\n");
    prompt.push_str(parts.tools);
    prompt.push_str(&format!(
        "\n\nINSTRUCTIONS:\n\
         - If an action is needed, reply with a ```json block holding a list like \
         [{{\"tool\": \"name\", \"args\": \"value\"}}]. Use a list for several arguments.\n\
         - Otherwise answer normally in {}.\n\
         - Be concise.\n",
        parts.language
    ));

    prompt.push_str(&format!("\nUSER COMMAND: {}", parts.command));
    prompt
}

pub struct ToolDriver {
    registry: Arc<ToolRegistry>,
    retry: RetryPolicy,
}

impl ToolDriver {
    pub fn new(registry: Arc<ToolRegistry>, retry: RetryPolicy) -> Self {
        Self { registry, retry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Generate, then execute any requested actions.
    ///
    /// `fast` disables retries; `max_actions` caps how many parsed actions
    /// run (the rest are dropped).
    pub async fn run(
        &self,
        backend: &dyn LanguageModel,
        prompt: &str,
        fast: bool,
        max_actions: Option<usize>,
    ) -> Result<String, BackendError> {
        tracing::debug!(backend = backend.name(), fast, "generating");
        let raw = self.retry.generate(backend, prompt, fast).await?;
        Ok(self.dispatch(&raw, max_actions).await)
    }

    pub async fn dispatch(&self, raw: &str, max_actions: Option<usize>) -> String {
        let actions = match parse_response(raw) {
            ParsedResponse::PlainText(text) => return text,
            ParsedResponse::Actions(actions) => actions,
        };

        let limit = max_actions.unwrap_or(actions.len());
        if actions.len() > limit {
            tracing::debug!(requested = actions.len(), limit, "dropping extra actions");
        }

        let mut results = Vec::new();
        for action in actions.iter().take(limit) {
            let line = match self.registry.invoke(action).await {
                Ok(result) => format!("Tool '{}' returned: {}", action.tool, result),
                Err(e @ ToolError::UnknownTool(_)) => {
                    tracing::warn!(tool = %action.tool, "model asked for an unknown tool");
                    e.to_string()
                }
                Err(e) => {
                    tracing::warn!(error = %e, "tool arguments rejected");
                    e.to_string()
                }
            };
            results.push(line);
        }

        format!("I have executed the requested actions: {}", results.join(", "))
    }
}
