//! Declared handler parameters.

use std::sync::Arc;

use serde_json::Value;

use crate::schema::ObjectSchema;
use crate::types::{Constraints, ParamType, Source};

/// One declared handler parameter.
///
/// Built with the constructor for its source and then refined:
///
/// ```
/// use param_binder::{Constraints, ParamType, ParameterSpec, Pattern};
///
/// let q = ParameterSpec::query("q", ParamType::String)
///     .alias("item-query")
///     .optional()
///     .constraints(
///         Constraints::new()
///             .min_length(3)
///             .max_length(50)
///             .pattern(Pattern::new("^fixedquery$").unwrap()),
///     );
/// assert_eq!(q.lookup_key(), "item-query");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub source: Source,
    pub ty: ParamType,
    pub required: bool,
    pub default: Option<Value>,
    pub constraints: Constraints,
    /// Lookup key overriding `name`.
    pub alias: Option<String>,
    /// Documentation only; never affects binding.
    pub deprecated: bool,
    /// Documentation only; never affects binding.
    pub visible: bool,
    pub description: Option<String>,
}

impl ParameterSpec {
    /// A required, visible parameter with no constraints.
    pub fn new(name: impl Into<String>, source: Source, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            source,
            ty,
            required: true,
            default: None,
            constraints: Constraints::default(),
            alias: None,
            deprecated: false,
            visible: true,
            description: None,
        }
    }

    pub fn path(name: impl Into<String>, ty: ParamType) -> Self {
        Self::new(name, Source::Path, ty)
    }

    pub fn query(name: impl Into<String>, ty: ParamType) -> Self {
        Self::new(name, Source::Query, ty)
    }

    pub fn body(name: impl Into<String>, schema: Arc<ObjectSchema>) -> Self {
        Self::new(name, Source::Body, ParamType::Object(schema))
    }

    /// Bind null instead of failing when absent.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Set a default. Implies the parameter is optional.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.required = false;
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = deprecated;
        self
    }

    /// Hide from generated documentation.
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Key used to find this parameter in its source.
    pub fn lookup_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_defaults() {
        let spec = ParameterSpec::query("q", ParamType::String);
        assert!(spec.required);
        assert!(spec.visible);
        assert!(!spec.deprecated);
        assert!(spec.constraints.is_empty());
        assert_eq!(spec.lookup_key(), "q");
    }

    #[test]
    fn with_default_implies_optional() {
        let spec = ParameterSpec::query("skip", ParamType::Integer).with_default(0);
        assert!(!spec.required);
        assert_eq!(spec.default, Some(json!(0)));
    }

    #[test]
    fn metadata_builders() {
        let spec = ParameterSpec::query("q", ParamType::String)
            .deprecated(true)
            .hidden()
            .description("search text");
        assert!(spec.deprecated);
        assert!(!spec.visible);
        assert_eq!(spec.description.as_deref(), Some("search text"));
    }
}
