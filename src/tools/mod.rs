use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::action::{ToolAction, ToolArgs};

pub mod desktop;
pub mod research;
pub mod routines;

pub use desktop::{Desktop, SystemDesktop};
pub use research::{Research, WebResearcher};
pub use routines::{ClockTool, RoutineTool};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("Tool '{0}' is not available.")]
    UnknownTool(String),

    #[error("Tool '{tool}' expects ({expected}) but got {got} argument(s).")]
    InvalidArguments {
        tool: String,
        expected: String,
        got: usize,
    },
}

/// Positional parameters of a tool: required first, then optional
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgShape {
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

impl ArgShape {
    pub const NONE: ArgShape = ArgShape {
        required: &[],
        optional: &[],
    };

    pub const fn new(required: &'static [&'static str], optional: &'static [&'static str]) -> Self {
        Self { required, optional }
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.required.len() && count <= self.required.len() + self.optional.len()
    }

    /// "action, amount?"
    pub fn render(&self) -> String {
        self.required
            .iter()
            .map(|p| p.to_string())
            .chain(self.optional.iter().map(|p| format!("{p}?")))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn shape(&self) -> ArgShape;

    /// Run the tool. Failures are reported inside the returned sentence.
    async fn execute(&self, args: &ToolArgs) -> String;
}

/// Closed set of tools; shapes are checked before a tool runs
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full tool set wired to the given collaborators
    pub fn standard(desktop: Arc<dyn Desktop>, research: Arc<dyn Research>) -> Self {
        let mut registry = Self::new();
        desktop::register(&mut registry, desktop.clone());
        research::register(&mut registry, research);
        registry.register(Arc::new(RoutineTool::new(desktop)));
        registry.register(Arc::new(ClockTool::time()));
        registry.register(Arc::new(ClockTool::date()));
        registry
    }

    /// Replaces any tool already registered under the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Sorted tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// One "- name(params): description" line per tool, for prompts
    pub fn prompt_listing(&self) -> String {
        self.tools
            .values()
            .map(|t| format!("- {}({}): {}", t.name(), t.shape().render(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub async fn invoke(&self, action: &ToolAction) -> Result<String, ToolError> {
        let tool = self
            .get(&action.tool)
            .ok_or_else(|| ToolError::UnknownTool(action.tool.clone()))?;

        let shape = tool.shape();
        if !shape.accepts(action.args.len()) {
            return Err(ToolError::InvalidArguments {
                tool: action.tool.clone(),
                expected: shape.render(),
                got: action.args.len(),
            });
        }

        tracing::debug!(tool = %action.tool, args = %action.args.joined(), "invoking tool");
        Ok(tool.execute(&action.args).await)
    }

    /// Like [`invoke`](Self::invoke), folding errors into the reply text
    pub async fn invoke_or_report(&self, action: &ToolAction) -> String {
        match self.invoke(action).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "tool call rejected");
                e.to_string()
            }
        }
    }
}
