//! Core types shared by declarations and the binder.

use std::borrow::Cow;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SpecError;
use crate::schema::ObjectSchema;

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Escape a key for use as a JSON Pointer segment (RFC 6901).
pub(crate) fn pointer_segment(key: &str) -> Cow<'_, str> {
    if key.contains(['~', '/']) {
        Cow::Owned(key.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(key)
    }
}

/// Where a parameter's value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Path,
    Query,
    Body,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Path => "path",
            Source::Query => "query",
            Source::Body => "body",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of a parameter or body field.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    String,
    /// Signed 64-bit integer.
    Integer,
    /// Finite 64-bit float.
    Number,
    Boolean,
    Array(Box<ParamType>),
    Object(Arc<ObjectSchema>),
}

impl ParamType {
    /// Parse a primitive type name.
    ///
    /// Returns `None` for anything that is not a primitive.
    pub fn parse_primitive(s: &str) -> Option<Self> {
        match s {
            "string" => Some(ParamType::String),
            "integer" => Some(ParamType::Integer),
            "number" => Some(ParamType::Number),
            "boolean" => Some(ParamType::Boolean),
            _ => None,
        }
    }

    /// Shorthand for `Array(Box::new(item))`.
    pub fn array(item: ParamType) -> Self {
        ParamType::Array(Box::new(item))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            ParamType::String | ParamType::Integer | ParamType::Number | ParamType::Boolean
        )
    }

    /// Primitive, or an array of primitives.
    pub fn is_query_compatible(&self) -> bool {
        match self {
            ParamType::Array(item) => item.is_primitive(),
            other => other.is_primitive(),
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, ParamType::Object(_))
    }

    /// Element type for arrays, the type itself otherwise.
    pub fn item_type(&self) -> &ParamType {
        match self {
            ParamType::Array(item) => item,
            other => other,
        }
    }

    /// Type name used in messages, e.g. `array<string>` or `object<Item>`.
    pub fn name(&self) -> String {
        match self {
            ParamType::String => "string".to_string(),
            ParamType::Integer => "integer".to_string(),
            ParamType::Number => "number".to_string(),
            ParamType::Boolean => "boolean".to_string(),
            ParamType::Array(item) => format!("array<{}>", item.name()),
            ParamType::Object(schema) => format!("object<{}>", schema.name()),
        }
    }
}

/// Compiled regex constraint.
///
/// The value must match the whole pattern, so `abc` does not satisfy
/// `b` even though it contains it.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "String")]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile a pattern.
    ///
    /// # Errors
    ///
    /// Returns `SpecError::InvalidPattern` if the regex does not compile.
    pub fn new(source: &str) -> Result<Self, SpecError> {
        let regex =
            Regex::new(&anchor(source)).map_err(|source_err| SpecError::InvalidPattern {
                pattern: source.to_string(),
                source: source_err,
            })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    /// The pattern as declared.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The pattern with full-match anchors applied.
    pub fn anchored(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

fn anchor(source: &str) -> String {
    format!("^(?:{})$", source)
}

impl TryFrom<String> for Pattern {
    type Error = SpecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Pattern::new(&value)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// Validation rules applied after type conversion.
///
/// Length bounds count characters for strings and items for arrays.
/// Patterns apply to each string (each item for arrays). Numeric bounds
/// apply to integers and numbers (each item for arrays).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Constraints {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Pattern>,
    /// Greater than or equal.
    pub ge: Option<f64>,
    /// Strictly greater than.
    pub gt: Option<f64>,
    /// Less than or equal.
    pub le: Option<f64>,
    /// Strictly less than.
    pub lt: Option<f64>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn pattern(mut self, pattern: Pattern) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn ge(mut self, bound: f64) -> Self {
        self.ge = Some(bound);
        self
    }

    pub fn gt(mut self, bound: f64) -> Self {
        self.gt = Some(bound);
        self
    }

    pub fn le(mut self, bound: f64) -> Self {
        self.le = Some(bound);
        self
    }

    pub fn lt(mut self, bound: f64) -> Self {
        self.lt = Some(bound);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check these constraints make sense for `ty`.
    ///
    /// # Errors
    ///
    /// Returns `SpecError::ConstraintNotApplicable` naming the first
    /// constraint that does not apply.
    pub(crate) fn check_applicable(&self, name: &str, ty: &ParamType) -> Result<(), SpecError> {
        let not_applicable = |constraint: &str| SpecError::ConstraintNotApplicable {
            name: name.to_string(),
            constraint: constraint.to_string(),
            actual: ty.name(),
        };

        let lengthy = matches!(ty, ParamType::String | ParamType::Array(_));
        if self.min_length.is_some() && !lengthy {
            return Err(not_applicable("min_length"));
        }
        if self.max_length.is_some() && !lengthy {
            return Err(not_applicable("max_length"));
        }
        if self.pattern.is_some() && *ty.item_type() != ParamType::String {
            return Err(not_applicable("pattern"));
        }

        let numeric = matches!(ty.item_type(), ParamType::Integer | ParamType::Number);
        for (constraint, bound) in [
            ("ge", self.ge),
            ("gt", self.gt),
            ("le", self.le),
            ("lt", self.lt),
        ] {
            if bound.is_some() && !numeric {
                return Err(not_applicable(constraint));
            }
        }
        Ok(())
    }
}
