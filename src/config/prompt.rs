//! Interactive prompting for values that are still missing.
//!
//! The loader hands a [`Prompter`] the full ordered list of questions once and
//! gets back a single key → value response map.

use crate::error::PromptError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::IsTerminal;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// One interactive question.
///
/// Fields beyond `name`, `type` and `message` are kept in `extra` and passed
/// through to the prompting backend (e.g. `default`, `choices`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptDescriptor {
    /// Config key the answer is stored under.
    pub name: String,
    /// Prompt kind: `input`, `password`, `number`, `confirm` or `select`.
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub message: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_kind() -> String {
    "input".to_string()
}

impl PromptDescriptor {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            message: message.into(),
            extra: Map::new(),
        }
    }

    /// The descriptor synthesized for a key nobody described.
    pub fn fallback(key: &str) -> Self {
        Self::new(key, "input", format!("Please specify value for \"{key}\""))
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn with_default(self, value: Value) -> Self {
        self.with_extra("default", value)
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.extra.get("default")
    }

    fn choices(&self) -> Vec<Value> {
        self.extra
            .get("choices")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }
}

/// Order the questions for `keys`.
///
/// Keys described in `prompts` come first, in the order `prompts` lists them;
/// the rest follow in their order within `keys`, each with a fallback
/// descriptor. Descriptors for keys outside `keys` are dropped.
pub fn build_prompt_list(keys: &[String], prompts: &[PromptDescriptor]) -> Vec<PromptDescriptor> {
    let mut ordered: Vec<PromptDescriptor> = Vec::with_capacity(keys.len());

    for descriptor in prompts {
        let wanted = keys.iter().any(|key| *key == descriptor.name);
        let seen = ordered.iter().any(|d| d.name == descriptor.name);
        if wanted && !seen {
            ordered.push(descriptor.clone());
        }
    }

    for key in keys {
        if !ordered.iter().any(|d| d.name == *key) {
            ordered.push(PromptDescriptor::fallback(key));
        }
    }

    ordered
}

/// Collects answers for a list of prompts.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Ask every question, in order, and return the answers keyed by name.
    async fn prompt(&self, prompts: &[PromptDescriptor]) -> Result<Map<String, Value>, PromptError>;
}

/// Whether the streams [`TerminalPrompter`] talks to, stdin and stderr, are
/// both attached to a terminal. Stdout may be redirected.
pub fn is_interactive() -> bool {
    streams_are_terminals(&std::io::stdin(), &std::io::stderr())
}

fn streams_are_terminals(input: &impl IsTerminal, output: &impl IsTerminal) -> bool {
    input.is_terminal() && output.is_terminal()
}

/// Line-based prompter on stdin/stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompter;

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn prompt(&self, prompts: &[PromptDescriptor]) -> Result<Map<String, Value>, PromptError> {
        let mut reader = BufReader::new(tokio::io::stdin());
        let mut writer = tokio::io::stderr();
        prompt_lines(prompts, &mut reader, &mut writer).await
    }
}

/// Ask each question on `writer` and read one answer line from `reader`.
///
/// Invalid answers are reported and asked again; end of input cancels.
pub async fn prompt_lines<R, W>(
    prompts: &[PromptDescriptor],
    reader: &mut R,
    writer: &mut W,
) -> Result<Map<String, Value>, PromptError>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let mut answers = Map::new();

    for descriptor in prompts {
        loop {
            writer.write_all(render_question(descriptor).as_bytes()).await?;
            writer.flush().await?;

            let mut line = String::new();
            if reader.read_line(&mut line).await? == 0 {
                return Err(PromptError::Cancelled);
            }

            match parse_answer(descriptor, line.trim_end_matches(['\r', '\n'])) {
                Ok(value) => {
                    answers.insert(descriptor.name.clone(), value);
                    break;
                }
                Err(PromptError::InvalidAnswer { message, .. }) => {
                    writer.write_all(format!("  {message}\n").as_bytes()).await?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    Ok(answers)
}

fn render_question(descriptor: &PromptDescriptor) -> String {
    let mut question = if descriptor.message.is_empty() {
        descriptor.name.clone()
    } else {
        descriptor.message.clone()
    };

    if descriptor.kind == "select" {
        for (index, choice) in descriptor.choices().iter().enumerate() {
            question.push_str(&format!("\n  {}) {}", index + 1, display_value(choice)));
        }
        question.push('\n');
    }

    match (descriptor.kind.as_str(), descriptor.default_value()) {
        ("confirm", Some(Value::Bool(true))) => question.push_str(" (Y/n)"),
        ("confirm", _) => question.push_str(" (y/N)"),
        ("password", _) => {}
        (_, Some(default)) => question.push_str(&format!(" ({})", display_value(default))),
        _ => {}
    }

    question.push_str(": ");
    question
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn invalid(descriptor: &PromptDescriptor, message: impl Into<String>) -> PromptError {
    PromptError::InvalidAnswer {
        name: descriptor.name.clone(),
        message: message.into(),
    }
}

/// Interpret one answer line according to the prompt's kind.
pub fn parse_answer(descriptor: &PromptDescriptor, answer: &str) -> Result<Value, PromptError> {
    let trimmed = answer.trim();
    let default = descriptor.default_value().cloned();

    match descriptor.kind.as_str() {
        "confirm" => match trimmed.to_ascii_lowercase().as_str() {
            "" => Ok(default.unwrap_or(Value::Bool(false))),
            "y" | "yes" | "true" => Ok(Value::Bool(true)),
            "n" | "no" | "false" => Ok(Value::Bool(false)),
            _ => Err(invalid(descriptor, "please answer y or n")),
        },
        "number" => {
            if trimmed.is_empty() {
                if let Some(default) = default {
                    return Ok(default);
                }
            }
            match serde_json::from_str::<Value>(trimmed) {
                Ok(number @ Value::Number(_)) => Ok(number),
                _ => Err(invalid(descriptor, "please enter a number")),
            }
        }
        "select" => {
            let choices = descriptor.choices();
            if trimmed.is_empty() {
                return default.ok_or_else(|| invalid(descriptor, "please pick one of the choices"));
            }
            if let Ok(index) = trimmed.parse::<usize>() {
                if let Some(choice) = index.checked_sub(1).and_then(|i| choices.get(i)) {
                    return Ok(choice.clone());
                }
            }
            choices
                .into_iter()
                .find(|choice| display_value(choice) == trimmed)
                .ok_or_else(|| invalid(descriptor, "please pick one of the choices"))
        }
        // Passwords keep surrounding whitespace.
        "password" => Ok(Value::String(answer.to_string())),
        _ => {
            if trimmed.is_empty() {
                if let Some(default) = default {
                    return Ok(default);
                }
            }
            Ok(Value::String(trimmed.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_prompt_list_ordering() {
        let prompts = vec![
            PromptDescriptor::new("c", "input", "C?"),
            PromptDescriptor::new("a", "number", "A?"),
        ];
        let ordered = build_prompt_list(&keys(&["a", "b", "c"]), &prompts);
        let names: Vec<&str> = ordered.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
        assert_eq!(ordered[1].kind, "number");
        assert_eq!(ordered[2], PromptDescriptor::fallback("b"));
    }

    #[test]
    fn test_prompt_list_drops_unrelated_descriptors() {
        let prompts = vec![
            PromptDescriptor::new("z", "input", "Z?"),
            PromptDescriptor::new("a", "input", "first"),
            PromptDescriptor::new("a", "input", "second"),
        ];
        let ordered = build_prompt_list(&keys(&["a"]), &prompts);
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].message, "first");
    }

    #[test]
    fn test_redirected_stream_is_not_interactive() {
        let input = tempfile::tempfile().unwrap();
        let output = tempfile::tempfile().unwrap();
        assert!(!streams_are_terminals(&input, &output));
        assert!(!streams_are_terminals(&input, &std::io::stderr()));
    }

    #[test]
    fn test_fallback_message() {
        let descriptor = PromptDescriptor::fallback("apiKey");
        assert_eq!(descriptor.kind, "input");
        assert_eq!(descriptor.message, "Please specify value for \"apiKey\"");
    }

    #[test]
    fn test_descriptor_serde_shape() {
        let descriptor: PromptDescriptor = serde_json::from_value(json!({
            "name": "port",
            "type": "number",
            "message": "Port?",
            "default": 8080
        }))
        .unwrap();
        assert_eq!(descriptor.kind, "number");
        assert_eq!(descriptor.default_value(), Some(&json!(8080)));

        let bare: PromptDescriptor = serde_json::from_value(json!({"name": "x"})).unwrap();
        assert_eq!(bare.kind, "input");
    }

    #[test]
    fn test_parse_answers_by_kind() {
        let confirm = PromptDescriptor::new("ok", "confirm", "");
        assert_eq!(parse_answer(&confirm, "Y").unwrap(), json!(true));
        assert_eq!(parse_answer(&confirm, "").unwrap(), json!(false));
        assert!(parse_answer(&confirm, "maybe").is_err());

        let number = PromptDescriptor::new("n", "number", "").with_default(json!(3));
        assert_eq!(parse_answer(&number, "42").unwrap(), json!(42));
        assert_eq!(parse_answer(&number, "").unwrap(), json!(3));
        assert!(parse_answer(&number, "abc").is_err());

        let input = PromptDescriptor::fallback("name");
        assert_eq!(parse_answer(&input, "  bob ").unwrap(), json!("bob"));
        assert_eq!(parse_answer(&input, "").unwrap(), json!(""));

        let select = PromptDescriptor::new("env", "select", "")
            .with_extra("choices", json!(["dev", "prod"]));
        assert_eq!(parse_answer(&select, "2").unwrap(), json!("prod"));
        assert_eq!(parse_answer(&select, "dev").unwrap(), json!("dev"));
        assert!(parse_answer(&select, "qa").is_err());
    }

    #[tokio::test]
    async fn test_prompt_lines_reads_in_order() {
        let prompts = vec![
            PromptDescriptor::new("port", "number", "Port"),
            PromptDescriptor::fallback("host"),
        ];
        let mut input: &[u8] = b"not-a-number\n8080\nexample.com\n";
        let mut output = Vec::new();

        let answers = prompt_lines(&prompts, &mut input, &mut output).await.unwrap();

        assert_eq!(answers.get("port"), Some(&json!(8080)));
        assert_eq!(answers.get("host"), Some(&json!("example.com")));
        let transcript = String::from_utf8(output).unwrap();
        assert!(transcript.contains("please enter a number"));
        assert!(transcript.contains("Please specify value for \"host\""));
    }

    #[tokio::test]
    async fn test_prompt_lines_eof_cancels() {
        let prompts = vec![PromptDescriptor::fallback("a"), PromptDescriptor::fallback("b")];
        let mut input: &[u8] = b"only-one\n";
        let mut output = Vec::new();

        let err = prompt_lines(&prompts, &mut input, &mut output).await.unwrap_err();
        assert!(matches!(err, PromptError::Cancelled));
    }
}
