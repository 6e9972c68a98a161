//! Unified Error Type System
//!
//! Centralized error types for the entire crate.
//! Generation failures are classified so the orchestrator can decide
//! whether a section is worth another attempt.
//!
//! ## Propagation
//!
//! - **Facet failures** (`Detector`): absorbed by the aggregator into `partial`
//! - **Source unreadable**: fatal for the whole analysis
//! - **Budget too small / grounding**: surfaced to the caller immediately
//! - **Generation / timeout**: retried at the orchestrator, then isolated to one section

use std::time::Duration;
use thiserror::Error;

use crate::validation::GroundingViolation;

// =============================================================================
// Error Categories
// =============================================================================

/// Categories for generation failures, used for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited - wait then retry
    RateLimit,
    /// The call did not finish inside its time box
    Timeout,
    /// Prompt exceeded what the collaborator accepts - retrying is pointless
    InputTooLarge,
    /// Collaborator answered but the output did not match the schema
    InvalidOutput,
    /// Authentication failed - fail fast
    Auth,
    /// Server-side collaborator failure
    Provider,
    /// Collaborator could not be reached or started
    Unavailable,
    /// Unknown error - conservative retry
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::InputTooLarge => write!(f, "INPUT_TOO_LARGE"),
            Self::InvalidOutput => write!(f, "INVALID_OUTPUT"),
            Self::Auth => write!(f, "AUTH"),
            Self::Provider => write!(f, "PROVIDER"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Check if another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::InputTooLarge | Self::Auth)
    }

    /// Get recommended retry delay for this category
    pub fn recommended_delay(&self) -> Duration {
        match self {
            Self::RateLimit => Duration::from_secs(8),
            Self::Unavailable => Duration::from_secs(2),
            Self::Provider | Self::Timeout => Duration::from_secs(1),
            _ => Duration::from_millis(500),
        }
    }
}

// =============================================================================
// Generation Error
// =============================================================================

/// Failure reported by (or about) the external generation collaborator
#[derive(Debug, Clone)]
pub struct GenerationError {
    pub category: ErrorCategory,
    pub message: String,
    /// Collaborator that produced the error
    pub collaborator: Option<String>,
    /// Suggested wait time before retry (if known)
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(collaborator) = &self.collaborator {
            write!(f, "[{}:{}] {}", collaborator, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for GenerationError {}

impl GenerationError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            collaborator: None,
            retry_after: None,
        }
    }

    /// Attach the collaborator name
    pub fn collaborator(mut self, name: impl Into<String>) -> Self {
        self.collaborator = Some(name.into());
        self
    }

    /// Add suggested retry delay
    pub fn retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }

    pub fn recommended_delay(&self) -> Duration {
        self.retry_after
            .unwrap_or_else(|| self.category.recommended_delay())
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps free-form collaborator messages to a category
pub struct ErrorClassifier;

impl ErrorClassifier {
    pub fn classify(message: &str, collaborator: &str) -> GenerationError {
        let lower = message.to_lowercase();

        let category = if lower.contains("rate limit")
            || lower.contains("429")
            || lower.contains("too many requests")
        {
            ErrorCategory::RateLimit
        } else if lower.contains("timed out") || lower.contains("timeout") {
            ErrorCategory::Timeout
        } else if lower.contains("context length")
            || lower.contains("too large")
            || (lower.contains("token") && lower.contains("limit"))
        {
            ErrorCategory::InputTooLarge
        } else if lower.contains("401")
            || lower.contains("403")
            || lower.contains("unauthorized")
            || lower.contains("api key")
        {
            ErrorCategory::Auth
        } else if lower.contains("500")
            || lower.contains("502")
            || lower.contains("503")
            || lower.contains("server error")
            || lower.contains("overloaded")
        {
            ErrorCategory::Provider
        } else if lower.contains("not found")
            || lower.contains("failed to spawn")
            || lower.contains("connection")
        {
            ErrorCategory::Unavailable
        } else if lower.contains("json") || lower.contains("schema") || lower.contains("parse") {
            ErrorCategory::InvalidOutput
        } else {
            ErrorCategory::Unknown
        };

        GenerationError::new(category, message).collaborator(collaborator)
    }

    /// Classify an HTTP-like status code reported by a collaborator.
    /// A missing status is treated as a provider failure.
    pub fn classify_status(status: Option<u16>, message: &str) -> GenerationError {
        let category = match status {
            Some(429) => ErrorCategory::RateLimit,
            Some(401 | 403) => ErrorCategory::Auth,
            Some(413) => ErrorCategory::InputTooLarge,
            Some(408 | 504) => ErrorCategory::Timeout,
            Some(s) if s >= 500 => ErrorCategory::Provider,
            None => ErrorCategory::Provider,
            Some(_) => ErrorCategory::Unknown,
        };
        GenerationError::new(category, message)
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum FactweaveError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    // -------------------------------------------------------------------------
    // Analysis Errors
    // -------------------------------------------------------------------------
    /// The source tree itself cannot be read; the whole analysis fails
    #[error("Source unreadable at {path}: {reason}")]
    SourceUnreadable { path: String, reason: String },

    /// A single detector failed; recorded as a partial facet
    #[error("Detector '{facet}' failed: {message}")]
    Detector { facet: String, message: String },

    #[error("Invalid pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    // -------------------------------------------------------------------------
    // Context Errors
    // -------------------------------------------------------------------------
    /// Mandatory facts alone exceed the budget
    #[error("Budget too small: mandatory facts need {required} tokens, budget is {budget}")]
    BudgetTooSmall { required: usize, budget: usize },

    #[error("Fact not found: {0}")]
    UnknownFact(String),

    // -------------------------------------------------------------------------
    // Pipeline Errors
    // -------------------------------------------------------------------------
    #[error("Generation error: {0}")]
    Generation(GenerationError),

    /// Operation timeout with context
    #[error("Timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// A section was asked to generate before its dependencies were ready
    #[error("Section {section} is blocked on: {missing}")]
    Blocked { section: String, missing: String },

    #[error("Unknown section kind: {0}")]
    UnknownSection(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // -------------------------------------------------------------------------
    // Validation Errors
    // -------------------------------------------------------------------------
    #[error("Grounding rejected: {}", describe_violations(.0))]
    Grounding(Vec<GroundingViolation>),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Context(String),
}

fn describe_violations(violations: &[GroundingViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<GenerationError> for FactweaveError {
    fn from(err: GenerationError) -> Self {
        FactweaveError::Generation(err)
    }
}

pub type Result<T> = std::result::Result<T, FactweaveError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl FactweaveError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    pub fn source_unreadable(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::SourceUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn detector(facet: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Detector {
            facet: facet.into(),
            message: message.into(),
        }
    }

    /// Compile a regex, mapping failures to a pattern error
    pub fn compile(pattern: &str) -> Result<regex::Regex> {
        regex::Regex::new(pattern).map_err(|e| Self::Pattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
    }

    /// Generation failure view of any error raised around a collaborator call
    pub fn classify(&self, collaborator: &str) -> GenerationError {
        match self {
            Self::Generation(e) => e.clone(),
            Self::Timeout { .. } => {
                GenerationError::new(ErrorCategory::Timeout, self.to_string()).collaborator(collaborator)
            }
            Self::Json(_) | Self::Yaml(_) => {
                GenerationError::new(ErrorCategory::InvalidOutput, self.to_string())
                    .collaborator(collaborator)
            }
            other => ErrorClassifier::classify(&other.to_string(), collaborator),
        }
    }

    /// Check if another attempt at the same operation may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Generation(e) => e.is_retryable(),
            Self::Timeout { .. } => true,
            Self::Io(_) => true,
            _ => false,
        }
    }
}

/// Context extension trait for adding context to errors
pub trait ResultExt<T> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T>;

    /// Add context using a closure (lazy evaluation)
    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| FactweaveError::Context(format!("{}: {}", context.into(), e)))
    }

    fn with_context_fn<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| FactweaveError::Context(format!("{}: {}", f().into(), e)))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(ErrorCategory::InputTooLarge.to_string(), "INPUT_TOO_LARGE");
        assert_eq!(ErrorCategory::Timeout.to_string(), "TIMEOUT");
    }

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::RateLimit.is_retryable());
        assert!(ErrorCategory::Timeout.is_retryable());
        assert!(ErrorCategory::Provider.is_retryable());
        assert!(ErrorCategory::InvalidOutput.is_retryable());
        assert!(!ErrorCategory::InputTooLarge.is_retryable());
        assert!(!ErrorCategory::Auth.is_retryable());
    }

    #[test]
    fn test_classify_messages() {
        let err = ErrorClassifier::classify("Rate limit exceeded", "cli");
        assert_eq!(err.category, ErrorCategory::RateLimit);

        let err = ErrorClassifier::classify("request timed out after 30s", "cli");
        assert_eq!(err.category, ErrorCategory::Timeout);

        let err = ErrorClassifier::classify("maximum context length is 8192 tokens", "cli");
        assert_eq!(err.category, ErrorCategory::InputTooLarge);
        assert!(!err.is_retryable());

        let err = ErrorClassifier::classify("Something weird happened", "cli");
        assert_eq!(err.category, ErrorCategory::Unknown);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(
            ErrorClassifier::classify_status(Some(503), "down").category,
            ErrorCategory::Provider
        );
        assert_eq!(
            ErrorClassifier::classify_status(None, "no status").category,
            ErrorCategory::Provider
        );
        assert_eq!(
            ErrorClassifier::classify_status(Some(413), "big").category,
            ErrorCategory::InputTooLarge
        );
        assert_eq!(
            ErrorClassifier::classify_status(Some(418), "teapot").category,
            ErrorCategory::Unknown
        );
    }

    #[test]
    fn test_generation_error_display() {
        let err = GenerationError::new(ErrorCategory::Provider, "boom").collaborator("mock");
        assert_eq!(err.to_string(), "[mock:PROVIDER] boom");

        let err = GenerationError::new(ErrorCategory::Timeout, "slow");
        assert_eq!(err.to_string(), "[TIMEOUT] slow");
    }

    #[test]
    fn test_recommended_delay_override() {
        let err = GenerationError::new(ErrorCategory::Unknown, "x")
            .retry_after(Duration::from_secs(100));
        assert_eq!(err.recommended_delay(), Duration::from_secs(100));
    }

    #[test]
    fn test_recoverable() {
        assert!(FactweaveError::timeout("gen", Duration::from_secs(1)).is_recoverable());
        assert!(
            !FactweaveError::BudgetTooSmall {
                required: 10,
                budget: 5
            }
            .is_recoverable()
        );
    }

    #[test]
    fn test_classify_application_errors() {
        let err = FactweaveError::timeout("generation", Duration::from_millis(10));
        assert_eq!(err.classify("cmd").category, ErrorCategory::Timeout);

        let err: FactweaveError = serde_json::from_str::<u8>("nope").unwrap_err().into();
        assert_eq!(err.classify("cmd").category, ErrorCategory::InvalidOutput);

        let err: FactweaveError = GenerationError::new(ErrorCategory::Auth, "denied").into();
        assert!(!err.classify("cmd").is_retryable());
    }

    #[test]
    fn test_compile_invalid_pattern() {
        let err = FactweaveError::compile("(unclosed").unwrap_err();
        assert!(matches!(err, FactweaveError::Pattern { .. }));
    }
}
