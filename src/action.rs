use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

const FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

/// Arguments of a tool call, normalised to strings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ToolArgs {
    #[default]
    None,
    One(String),
    Many(Vec<String>),
}

impl ToolArgs {
    pub fn one(value: impl Into<String>) -> Self {
        ToolArgs::One(value.into())
    }

    pub fn many<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ToolArgs::Many(values.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        match self {
            ToolArgs::None => 0,
            ToolArgs::One(_) => 1,
            ToolArgs::Many(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Positional argument, if present
    pub fn get(&self, index: usize) -> Option<&str> {
        match self {
            ToolArgs::None => None,
            ToolArgs::One(value) => (index == 0).then_some(value.as_str()),
            ToolArgs::Many(values) => values.get(index).map(String::as_str),
        }
    }

    /// All arguments joined with spaces
    pub fn joined(&self) -> String {
        match self {
            ToolArgs::None => String::new(),
            ToolArgs::One(value) => value.clone(),
            ToolArgs::Many(values) => values.join(" "),
        }
    }

    fn from_json(value: Option<&Value>) -> Option<Self> {
        match value {
            None | Some(Value::Null) => Some(ToolArgs::None),
            Some(Value::Array(items)) => items
                .iter()
                .map(scalar_text)
                .collect::<Option<Vec<_>>>()
                .map(ToolArgs::Many),
            Some(other) => scalar_text(other).map(ToolArgs::One),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// One requested tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolAction {
    pub tool: String,
    pub args: ToolArgs,
}

impl ToolAction {
    pub fn new(tool: impl Into<String>, args: ToolArgs) -> Self {
        Self {
            tool: tool.into(),
            args,
        }
    }

    fn from_json(record: &Value) -> Option<Self> {
        let tool = record.get("tool")?.as_str()?.trim();
        if tool.is_empty() {
            return None;
        }
        let args = ToolArgs::from_json(record.get("args"))?;
        Some(Self::new(tool, args))
    }
}

impl fmt::Display for ToolAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.tool, self.args.joined())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedResponse {
    Actions(Vec<ToolAction>),
    PlainText(String),
}

/// Contents of the first ```` ```json ```` block, if any
pub fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find(FENCE_OPEN)? + FENCE_OPEN.len();
    let rest = &text[start..];
    let end = rest.find(FENCE_CLOSE).unwrap_or(rest.len());
    Some(rest[..end].trim())
}

/// Parse a model reply. A missing, unparsable or empty action block makes the
/// whole reply plain text.
pub fn parse_response(text: &str) -> ParsedResponse {
    let plain = || ParsedResponse::PlainText(text.trim().to_string());

    let Some(block) = extract_json_block(text) else {
        return plain();
    };

    let value: Value = match serde_json::from_str(block) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "tool block did not parse, answering with raw text");
            return plain();
        }
    };

    let records = match value {
        Value::Array(items) => items,
        record @ Value::Object(_) => vec![record],
        _ => {
            tracing::warn!("tool block is not a list of records");
            return plain();
        }
    };

    let mut actions = Vec::with_capacity(records.len());
    for record in &records {
        match ToolAction::from_json(record) {
            Some(action) => actions.push(action),
            None => tracing::warn!(%record, "dropping malformed tool record"),
        }
    }

    if actions.is_empty() {
        plain()
    } else {
        ParsedResponse::Actions(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_without_block() {
        assert_eq!(
            parse_response("  Paris is the capital.  "),
            ParsedResponse::PlainText("Paris is the capital.".to_string())
        );
    }

    #[test]
    fn test_parses_action_list() {
        let text = "Sure.\n```json\n[{\"tool\": \"open_app\", \"args\": \"spotify\"},\n {\"tool\": \"volume_control\", \"args\": [\"set\", 40]}]\n```";
        let ParsedResponse::Actions(actions) = parse_response(text) else {
            panic!("expected actions");
        };
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0], ToolAction::new("open_app", ToolArgs::one("spotify")));
        assert_eq!(actions[1].args, ToolArgs::many(["set", "40"]));
    }

    #[test]
    fn test_single_record_and_missing_args() {
        let ParsedResponse::Actions(actions) =
            parse_response("```json\n{\"tool\": \"take_screenshot\"}\n```")
        else {
            panic!("expected actions");
        };
        assert_eq!(actions, vec![ToolAction::new("take_screenshot", ToolArgs::None)]);
    }

    #[test]
    fn test_malformed_block_falls_back_to_text() {
        let text = "```json\n[{\"tool\": \"open_app\", \"args\": \n```";
        assert_eq!(parse_response(text), ParsedResponse::PlainText(text.to_string()));
    }

    #[test]
    fn test_invalid_records_are_dropped() {
        let text = "```json\n[{\"args\": \"x\"}, {\"tool\": \"open_app\", \"args\": {\"a\": 1}}, {\"tool\": \"media_control\", \"args\": \"pause\"}]\n```";
        assert_eq!(
            parse_response(text),
            ParsedResponse::Actions(vec![ToolAction::new("media_control", ToolArgs::one("pause"))])
        );

        let none_valid = "```json\n[{\"args\": \"x\"}]\n```";
        assert!(matches!(parse_response(none_valid), ParsedResponse::PlainText(_)));
    }

    #[test]
    fn test_unclosed_fence_reads_to_end() {
        assert_eq!(
            extract_json_block("```json\n[{\"tool\": \"a\"}]"),
            Some("[{\"tool\": \"a\"}]")
        );
    }

    #[test]
    fn test_args_accessors() {
        let args = ToolArgs::many(["set", "40"]);
        assert_eq!(args.get(1), Some("40"));
        assert_eq!(args.get(2), None);
        assert_eq!(args.joined(), "set 40");
        assert_eq!(ToolArgs::one("x").get(0), Some("x"));
        assert!(ToolArgs::None.is_empty());
    }
}
