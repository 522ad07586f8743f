use std::path::PathBuf;

use thiserror::Error; // Import the `Error` derive macro from the `thiserror` crate

/// Malformed template text. Always fatal to the parse that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("parse error at line {line}, column {column}: {message}")]
pub struct ParseError {
    pub message: String,
    /// 1-based line of the offending token or marker.
    pub line: usize,
    /// 1-based column (in characters) of the offending token or marker.
    pub column: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

// Failures raised while evaluating a parsed template against a context
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    // A referenced path is absent at the point of use
    #[error("undefined variable: `{path}`")]
    Undefined { path: String },

    // An operation was applied to a value of the wrong shape
    #[error("type error: cannot apply {operation} to {value_kind}")]
    TypeError {
        operation: String,
        value_kind: String,
    },
}

impl RenderError {
    pub fn undefined(path: impl Into<String>) -> Self {
        RenderError::Undefined { path: path.into() }
    }

    pub fn type_error(operation: impl Into<String>, value_kind: impl Into<String>) -> Self {
        RenderError::TypeError {
            operation: operation.into(),
            value_kind: value_kind.into(),
        }
    }
}

/// Failures of the YAML-backed parameter store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot access `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in `{}`: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("`{}` must contain a mapping of parameters at its top level", .path.display())]
    NotAMapping { path: PathBuf },

    #[error("`{}` uses a {kind} as a parameter name; names must be scalars", .path.display())]
    UnsupportedKey { path: PathBuf, kind: &'static str },
}

// Define an enum to represent every failure the crate surfaces to callers
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    // Call-time overrides must be written as `key=value`
    #[error("parameter must be in key=value format: {0}")]
    InvalidParam(String),
}

// Type alias for results that use `Error` as the error type
pub type Result<T> = std::result::Result<T, Error>;
