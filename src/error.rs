//! Error types for route declaration, loading, and request binding.

use std::path::PathBuf;

use http::Method;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::types::Source;

/// Errors in a route or schema declaration.
///
/// These are authoring defects. They surface when a route is registered,
/// before any request is bound against it.
#[derive(Debug, Clone, Error)]
pub enum SpecError {
    #[error("parameter '{name}' is declared in both {first} and {second}")]
    SourceConflict {
        name: String,
        first: Source,
        second: Source,
    },

    #[error("{source_kind} parameter '{name}' is declared more than once")]
    DuplicateParameter { name: String, source_kind: Source },

    #[error("schema '{schema}' declares field '{name}' more than once")]
    DuplicateField { schema: String, name: String },

    #[error("body parameter '{name}' must use a structured schema, got {actual}")]
    BodyNotStructured { name: String, actual: String },

    #[error("{source_kind} parameter '{name}' must be a primitive, got {actual}")]
    NotPrimitive {
        name: String,
        source_kind: Source,
        actual: String,
    },

    #[error("path parameter '{name}' cannot be optional or carry a default")]
    OptionalPathParameter { name: String },

    #[error("path parameter '{name}' does not appear in template {path}")]
    UnknownPathParameter { name: String, path: String },

    #[error("template {path} placeholder '{name}' has no path parameter declared")]
    UndeclaredPathParameter { name: String, path: String },

    #[error("invalid path template {path}: {message}")]
    InvalidPathTemplate { path: String, message: String },

    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("constraint '{constraint}' on '{name}' does not apply to {actual}")]
    ConstraintNotApplicable {
        name: String,
        constraint: String,
        actual: String,
    },

    #[error("'{name}' is required but declares a default")]
    RequiredWithDefault { name: String },

    #[error("invalid default for '{name}': {message}")]
    InvalidDefault { name: String, message: String },

    #[error("route {method} {path} is already registered")]
    DuplicateRoute { method: Method, path: String },

    #[error("invalid HTTP method '{method}'")]
    InvalidMethod { method: String },

    #[error("unknown type '{name}': expected string, integer, number, or boolean")]
    UnknownType { name: String },

    #[error("unknown schema '{name}'")]
    UnknownSchema { name: String },

    #[error("schema '{name}' references itself")]
    RecursiveSchema { name: String },
}

impl SpecError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors while loading route declarations.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid route document: {source}")]
    InvalidDocument {
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Spec(#[from] SpecError),
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Category of a single binding failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Required parameter or field absent, with no default.
    MissingRequiredParameter,
    /// Raw value could not be converted to the declared type.
    TypeConversionError,
    /// Well-typed value failed a length, pattern, or numeric bound.
    ConstraintViolation,
    /// Multiple values where one was declared, or the reverse.
    MultiplicityError,
    /// Member not declared by a strict schema.
    UnknownField,
}

/// One failed parameter, with enough context to fix the request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamError {
    pub kind: ErrorKind,
    /// Where the parameter was read from.
    #[serde(rename = "in")]
    pub source: Source,
    /// Declared parameter name.
    pub name: String,
    /// JSON Pointer to the offending value, rooted at its source
    /// (e.g. `/query/item-query`, `/body/price`).
    pub path: String,
    /// Violated constraint, for constraint failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
    /// Human-readable reason.
    pub message: String,
}

impl ParamError {
    pub(crate) fn missing(source: Source, name: &str, path: &str) -> Self {
        Self {
            kind: ErrorKind::MissingRequiredParameter,
            source,
            name: name.to_string(),
            path: path.to_string(),
            constraint: None,
            message: "missing required parameter".to_string(),
        }
    }

    pub(crate) fn invalid_type(source: Source, name: &str, path: &str, message: String) -> Self {
        Self {
            kind: ErrorKind::TypeConversionError,
            source,
            name: name.to_string(),
            path: path.to_string(),
            constraint: None,
            message: format!("invalid type: {}", message),
        }
    }

    pub(crate) fn constraint(
        source: Source,
        name: &str,
        path: &str,
        constraint: &str,
        message: String,
    ) -> Self {
        Self {
            kind: ErrorKind::ConstraintViolation,
            source,
            name: name.to_string(),
            path: path.to_string(),
            constraint: Some(constraint.to_string()),
            message,
        }
    }

    pub(crate) fn multiplicity(source: Source, name: &str, path: &str, message: String) -> Self {
        Self {
            kind: ErrorKind::MultiplicityError,
            source,
            name: name.to_string(),
            path: path.to_string(),
            constraint: None,
            message,
        }
    }

    pub(crate) fn unknown_field(source: Source, name: &str, path: &str) -> Self {
        Self {
            kind: ErrorKind::UnknownField,
            source,
            name: name.to_string(),
            path: path.to_string(),
            constraint: None,
            message: "unknown field".to_string(),
        }
    }
}

impl std::fmt::Display for ParamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Aggregated binding failure. Never empty.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("request validation failed with {} error(s)", errors.len())]
pub struct ValidationError {
    errors: Vec<ParamError>,
}

impl ValidationError {
    pub(crate) fn new(errors: Vec<ParamError>) -> Self {
        debug_assert!(!errors.is_empty(), "validation error without failures");
        Self { errors }
    }

    /// All failures, in declaration order.
    pub fn errors(&self) -> &[ParamError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ParamError> {
        self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Failures recorded against the named parameter.
    pub fn for_parameter<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ParamError> {
        self.errors.iter().filter(move |e| e.name == name)
    }

    /// Returns true if the named parameter failed with the given kind.
    pub fn has(&self, kind: ErrorKind, name: &str) -> bool {
        self.for_parameter(name).any(|e| e.kind == kind)
    }

    /// Machine-readable rendering: `{"detail": [ ... ]}`.
    pub fn to_detail(&self) -> Value {
        serde_json::json!({ "detail": self.errors })
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Errors from matching a request to a route and binding it.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("no route matches {path}")]
    NotFound { path: String },

    #[error("method {method} not allowed for {path}")]
    MethodNotAllowed { method: Method, path: String },

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl RouteError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
