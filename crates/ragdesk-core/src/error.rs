use serde_json::{json, Value};
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the orchestrator to whatever boundary drives it.
///
/// Every capability fault collapses into [`Error::DependencyFailure`]; the
/// original error is kept both as the error source and as a rendered string
/// under `details.original_error`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported input for '{filename}': {reason}")]
    InputFormat { filename: String, reason: String },

    #[error("{message}")]
    DependencyFailure {
        message: String,
        original_error: String,
        #[source]
        source: BoxError,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub fn dependency<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::DependencyFailure {
            message: message.into(),
            original_error: source.to_string(),
            source: Box::new(source),
        }
    }

    /// Stable machine-readable code for the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InputFormat { .. } => "UNSUPPORTED_FORMAT",
            Self::DependencyFailure { .. } => "BAD_GATEWAY",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::InvalidConfig(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// HTTP-style status a transport layer would map this error to.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InputFormat { .. } => 400,
            Self::DependencyFailure { .. } => 502,
            Self::InvalidInput(_) => 422,
            Self::InvalidConfig(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    pub fn original_error(&self) -> Option<&str> {
        match self {
            Self::DependencyFailure { original_error, .. } => Some(original_error),
            _ => None,
        }
    }

    pub fn details(&self) -> Value {
        match self {
            Self::InputFormat { filename, reason } => json!({ "filename": filename, "reason": reason }),
            Self::DependencyFailure { original_error, .. } => json!({ "original_error": original_error }),
            Self::InvalidInput(_) | Self::InvalidConfig(_) => json!({}),
        }
    }

    /// `{"error": {"code", "message", "details"}}`
    pub fn envelope(&self) -> Value {
        json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
                "details": self.details(),
            }
        })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the text extraction capability.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Could not decode '{filename}': {reason}")]
    Decode { filename: String, reason: String },

    #[error("Could not parse '{filename}': {reason}")]
    Parse { filename: String, reason: String },
}

/// Failures of the embedding/generation capability.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Network faults, timeouts, rate limiting and server-side errors.
    #[error("transient model failure: {0}")]
    Transient(String),

    #[error("model API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid model response: {0}")]
    InvalidResponse(String),

    #[error("inference failed: {0}")]
    Inference(String),
}

impl ModelError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Failures of the vector storage capability.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no embedding available for {0}")]
    MissingEmbedding(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_failure_keeps_original_error() {
        let err = Error::dependency("Failed to process RAG query", ModelError::Transient("API Down".into()));
        assert_eq!(err.to_string(), "Failed to process RAG query");
        assert_eq!(err.code(), "BAD_GATEWAY");
        assert_eq!(err.status_code(), 502);
        assert!(err.original_error().unwrap_or_default().contains("API Down"));
        assert_eq!(err.details()["original_error"], "transient model failure: API Down");
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("transient model failure: API Down"));
    }

    #[test]
    fn input_format_is_a_client_error() {
        let err = Error::InputFormat { filename: "a.docx".into(), reason: "Unsupported file type: a.docx".into() };
        assert!(err.is_client_error());
        assert_eq!(err.envelope()["error"]["code"], "UNSUPPORTED_FORMAT");
        assert_eq!(err.envelope()["error"]["details"]["filename"], "a.docx");
    }

    #[test]
    fn only_transient_model_errors_are_retryable() {
        assert!(ModelError::Transient("timeout".into()).is_transient());
        assert!(!ModelError::Api { status: 401, message: "bad key".into() }.is_transient());
        assert!(!ModelError::InvalidResponse("empty".into()).is_transient());
    }
}
