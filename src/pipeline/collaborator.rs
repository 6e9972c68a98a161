//! Generation collaborator
//!
//! The external text generator behind the pipeline. Implementations perform a
//! single call; retries and time boxing belong to the orchestrator.

use std::process::Stdio;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::types::{
    ErrorCategory, ErrorClassifier, FactKey, GenerationError, Result, log_filter_error,
};

/// What a collaborator is asked to produce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    /// JSON schema the answer should satisfy
    pub schema: Value,
}

/// Section text as returned by a collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedText {
    pub text: String,
    #[serde(default)]
    pub facts_used: Vec<FactKey>,
}

impl GeneratedText {
    /// Accepts `{text, facts_used?}` or a bare string
    pub fn from_value(value: Value) -> Result<Self> {
        let generated = match value {
            Value::String(text) => Self {
                text,
                facts_used: Vec::new(),
            },
            Value::Object(_) => serde_json::from_value(value)?,
            other => {
                return Err(GenerationError::new(
                    ErrorCategory::InvalidOutput,
                    format!("Expected an object or string, got {}", other),
                )
                .into());
            }
        };
        if generated.text.trim().is_empty() {
            return Err(GenerationError::new(ErrorCategory::InvalidOutput, "Empty section text").into());
        }
        Ok(generated)
    }
}

#[async_trait]
pub trait GenerationCollaborator: Send + Sync {
    /// Single-shot call returning the structured answer
    async fn generate(&self, request: &GenerationRequest) -> Result<Value>;

    fn name(&self) -> &str;
}

// =============================================================================
// External command
// =============================================================================

/// Runs an external program per call.
///
/// The request is written to stdin as JSON. Stdout is parsed as JSON when it
/// is JSON and passed through as a string otherwise. The child is killed when
/// the call is dropped, so an outer timeout cancels it.
pub struct CommandCollaborator {
    program: String,
    args: Vec<String>,
}

impl CommandCollaborator {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn parse_stdout(stdout: &str) -> Value {
        let trimmed = stdout.trim();
        match serde_json::from_str::<Value>(trimmed) {
            Ok(value @ (Value::Object(_) | Value::String(_))) => value,
            _ => Value::String(trimmed.to_string()),
        }
    }
}

#[async_trait]
impl GenerationCollaborator for CommandCollaborator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Value> {
        let payload = serde_json::to_vec(request)?;

        debug!(program = %self.program, bytes = payload.len(), "Spawning generation command");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                GenerationError::new(
                    ErrorCategory::Unavailable,
                    format!("Failed to spawn {}: {}", self.program, e),
                )
                .collaborator(self.name())
            })?;

        // Feed stdin concurrently so a chatty child cannot fill its stdout pipe
        let writer = child.stdin.take().map(|mut stdin| {
            tokio::spawn(async move {
                stdin.write_all(&payload).await?;
                stdin.shutdown().await
            })
        });

        let output = child.wait_with_output().await?;

        if let Some(writer) = writer
            && let Ok(result) = writer.await
        {
            // A child that exits without reading stdin is judged by its status
            log_filter_error(result, "Writing generation request to stdin");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = if stderr.trim().is_empty() {
                format!("Process exited with {}", output.status)
            } else {
                stderr.trim().to_string()
            };
            return Err(ErrorClassifier::classify(&message, self.name()).into());
        }

        Ok(Self::parse_stdout(&String::from_utf8_lossy(&output.stdout)))
    }

    fn name(&self) -> &str {
        &self.program
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> GenerationRequest {
        GenerationRequest {
            system_prompt: "system".to_string(),
            user_prompt: "user".to_string(),
            schema: json!({"type": "object"}),
        }
    }

    #[test]
    fn test_generated_text_from_value() {
        let text = GeneratedText::from_value(json!({"text": "Body", "facts_used": ["architecture"]}))
            .unwrap();
        assert_eq!(text.facts_used, vec![FactKey::from("architecture")]);

        let plain = GeneratedText::from_value(json!("Body")).unwrap();
        assert!(plain.facts_used.is_empty());

        assert!(GeneratedText::from_value(json!(42)).is_err());
        assert!(GeneratedText::from_value(json!({"text": "  "})).is_err());
        assert!(GeneratedText::from_value(json!({"facts_used": []})).is_err());
    }

    #[test]
    fn test_parse_stdout() {
        assert_eq!(
            CommandCollaborator::parse_stdout("{\"text\":\"a\"}\n"),
            json!({"text": "a"})
        );
        assert_eq!(CommandCollaborator::parse_stdout("# Title\nBody\n"), json!("# Title\nBody"));
        assert_eq!(CommandCollaborator::parse_stdout("[1,2]"), json!("[1,2]"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_collaborator_echoes_stdin() {
        let collaborator = CommandCollaborator::new("cat", vec![]);
        let value = collaborator.generate(&request()).await.unwrap();
        assert_eq!(value["system_prompt"], "system");
        assert_eq!(value["schema"]["type"], "object");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_collaborator_failure_is_classified() {
        let collaborator = CommandCollaborator::new(
            "sh",
            vec!["-c".to_string(), "cat >/dev/null; echo 'rate limit exceeded' >&2; exit 3".to_string()],
        );
        let err = collaborator.generate(&request()).await.unwrap_err();
        assert_eq!(err.classify("sh").category, ErrorCategory::RateLimit);
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let collaborator = CommandCollaborator::new("factweave-no-such-program", vec![]);
        let err = collaborator.generate(&request()).await.unwrap_err();
        assert_eq!(err.classify("x").category, ErrorCategory::Unavailable);
    }
}
