//! Structured error types shared across cosmochain crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`CosmoError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (paths, parameter names, line numbers).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Adds the display form of a filesystem path as the `path` context entry.
    pub fn with_path(self, path: &Path) -> Self {
        self.with_context("path", path.display().to_string())
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for chain loading, analysis and likelihood scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum CosmoError {
    /// A metadata or nuisance line matched a definition pattern but was malformed.
    #[error("parse error: {0}")]
    Parse(ErrorInfo),
    /// The requested name is not part of the parameter catalog.
    #[error("unknown parameter: {0}")]
    UnknownParameter(ErrorInfo),
    /// The operation is not meaningful for the parameter's classification.
    #[error("not applicable: {0}")]
    NotApplicable(ErrorInfo),
    /// No usable sample rows were found for a chain.
    #[error("empty chain: {0}")]
    EmptyChain(ErrorInfo),
    /// Sample files disagree on their column layout.
    #[error("malformed chain: {0}")]
    MalformedChain(ErrorInfo),
    /// A path token resolved to a file that does not exist.
    #[error("missing reference: {0}")]
    MissingReference(ErrorInfo),
    /// A requested precomputed artifact is absent.
    #[error("missing artifact: {0}")]
    MissingArtifact(ErrorInfo),
    /// Likelihood aggregation failures (unset nuisance values, short spectra).
    #[error("likelihood error: {0}")]
    Likelihood(ErrorInfo),
    /// Filesystem failures.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Invalid options or configuration files.
    #[error("config error: {0}")]
    Config(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl CosmoError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            CosmoError::Parse(info)
            | CosmoError::UnknownParameter(info)
            | CosmoError::NotApplicable(info)
            | CosmoError::EmptyChain(info)
            | CosmoError::MalformedChain(info)
            | CosmoError::MissingReference(info)
            | CosmoError::MissingArtifact(info)
            | CosmoError::Likelihood(info)
            | CosmoError::Io(info)
            | CosmoError::Config(info) => info,
        }
    }

    /// Wraps an I/O failure on `path` under the given error code.
    pub fn io(code: &str, path: &Path, err: io::Error) -> Self {
        CosmoError::Io(ErrorInfo::new(code, err.to_string()).with_path(path))
    }

    /// Builds the error returned for names missing from a parameter catalog.
    pub fn unknown_parameter(name: &str) -> Self {
        CosmoError::UnknownParameter(
            ErrorInfo::new("unknown-parameter", format!("unrecognized parameter '{name}'"))
                .with_context("parameter", name),
        )
    }
}

/// Convenience alias used throughout the workspace.
pub type CosmoResult<T> = Result<T, CosmoError>;
