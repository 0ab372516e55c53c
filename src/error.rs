use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse error classification used by hosts to decide how to respond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or unauthorized request; rejected before any state mutation.
    Validation,
    /// Upstream collaborator unavailable; safe to retry with the same inputs.
    Transient,
    /// Persistence failure; the commit unit was aborted and left no effects.
    Storage,
    /// Invariant violation inside the engine.
    Internal,
}

/// Unified error type for the engine.
/// All fallible engine functions return Result<T, EngineError>.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineError {
    pub message: String,
    pub kind: ErrorKind,
    pub stage: String,
    pub context: Option<String>,
    pub source: Option<String>,
}

impl EngineError {
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S, stage: &'static str) -> Self {
        EngineError {
            message: message.into(),
            kind,
            stage: stage.to_string(),
            context: None,
            source: None,
        }
    }

    pub fn validation<S: Into<String>>(message: S, stage: &'static str) -> Self {
        Self::new(ErrorKind::Validation, message, stage)
    }

    pub fn transient<S: Into<String>>(message: S, stage: &'static str) -> Self {
        Self::new(ErrorKind::Transient, message, stage)
    }

    pub fn storage<S: Into<String>>(message: S, stage: &'static str) -> Self {
        Self::new(ErrorKind::Storage, message, stage)
    }

    pub fn internal<S: Into<String>>(message: S, stage: &'static str) -> Self {
        Self::new(ErrorKind::Internal, message, stage)
    }

    /// Add additional context information
    pub fn with_context<S: Into<String>>(mut self, context: S) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add source error information
    pub fn with_source<S: Into<String>>(mut self, source: S) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::Transient
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)?;
        if let Some(ref context) = self.context {
            write!(f, " (context: {})", context)?;
        }
        if let Some(ref source) = self.source {
            write!(f, " (source: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::storage(format!("I/O error: {}", err), "io").with_source("std::io")
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::storage(format!("JSON error: {}", err), "json").with_source("serde_json")
    }
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        EngineError::internal(err.to_string(), "collaborator").with_source("anyhow")
    }
}
