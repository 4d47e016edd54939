//! Route declarations - a method, a path template, and its parameters.

use std::collections::{HashMap, HashSet};

use http::Method;
use serde_json::Value;

use crate::binder::{bind, BoundRequest};
use crate::error::{SpecError, ValidationError};
use crate::request::{decode_segment, PathValues, QueryValues};
use crate::schema::check_declaration;
use crate::spec::ParameterSpec;
use crate::types::Source;

/// One segment of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Literal(String),
    Param(String),
}

/// Parsed path template such as `/items/{item_id}`.
///
/// Empty segments are ignored, so `/items/` and `/items` are the same
/// template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub(crate) fn parse(raw: &str) -> Result<Self, SpecError> {
        let invalid = |message: &str| SpecError::InvalidPathTemplate {
            path: raw.to_string(),
            message: message.to_string(),
        };

        if !raw.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }

        let mut segments = Vec::new();
        let mut seen = HashSet::new();
        for part in raw.split('/').filter(|s| !s.is_empty()) {
            if let Some(name) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                if name.is_empty() || name.contains(['{', '}']) {
                    return Err(invalid("placeholder must be a non-empty {name}"));
                }
                if !seen.insert(name.to_string()) {
                    return Err(invalid(&format!("placeholder '{}' appears twice", name)));
                }
                segments.push(Segment::Param(name.to_string()));
            } else if part.contains(['{', '}']) {
                return Err(invalid("placeholders must span a whole segment"));
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.raw
    }

    pub(crate) fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Number of literal segments; more literals is a more specific match.
    pub(crate) fn specificity(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    /// True if both templates match exactly the same paths.
    pub(crate) fn same_shape(&self, other: &PathTemplate) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Literal(a), Segment::Literal(b)) => a == b,
                    (Segment::Param(_), Segment::Param(_)) => true,
                    _ => false,
                })
    }

    /// Match a request path, returning percent-decoded placeholder values.
    pub(crate) fn matches(&self, path: &str) -> Option<PathValues> {
        let rest = path.strip_prefix('/').unwrap_or(path);
        let rest = rest.strip_suffix('/').unwrap_or(rest);
        let parts: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split('/').collect()
        };
        // One trailing slash is tolerated; any other empty segment is not.
        if parts.len() != self.segments.len() || parts.iter().any(|p| p.is_empty()) {
            return None;
        }

        let mut values = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) => {
                    if literal != part {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    values.insert(name.clone(), decode_segment(part));
                }
            }
        }
        Some(values)
    }
}

/// A registered route. Immutable and shareable across threads.
#[derive(Debug, Clone)]
pub struct Route {
    method: Method,
    template: PathTemplate,
    params: Vec<ParameterSpec>,
}

impl Route {
    pub fn builder(method: Method, path: impl Into<String>) -> RouteBuilder {
        RouteBuilder {
            method,
            path: path.into(),
            params: Vec::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The path template as declared.
    pub fn path(&self) -> &str {
        self.template.as_str()
    }

    /// Parameters in declaration order.
    pub fn params(&self) -> &[ParameterSpec] {
        &self.params
    }

    /// Match a request path against this route's template.
    pub fn matches(&self, path: &str) -> Option<PathValues> {
        self.template.matches(path)
    }

    /// Bind request values against this route's parameters.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` listing every failed parameter.
    pub fn bind(
        &self,
        path_values: &PathValues,
        query_values: &QueryValues,
        body: Option<&Value>,
    ) -> Result<BoundRequest, ValidationError> {
        bind(&self.params, path_values, query_values, body)
    }

    pub(crate) fn template(&self) -> &PathTemplate {
        &self.template
    }
}

/// Builder for [`Route`]. All declaration checks run in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct RouteBuilder {
    method: Method,
    path: String,
    params: Vec<ParameterSpec>,
}

impl RouteBuilder {
    pub fn param(mut self, param: ParameterSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn params(mut self, params: impl IntoIterator<Item = ParameterSpec>) -> Self {
        self.params.extend(params);
        self
    }

    /// Validate the declaration and freeze it.
    ///
    /// # Errors
    ///
    /// Returns `SpecError` if the template is malformed, a name is claimed
    /// by two sources or twice by one source, a type does not suit its
    /// source, path placeholders and path parameters disagree, or a
    /// constraint or default does not fit its type.
    pub fn build(self) -> Result<Route, SpecError> {
        let template = PathTemplate::parse(&self.path)?;

        let mut sources: HashMap<&str, Source> = HashMap::new();
        let mut keys: HashSet<(Source, &str)> = HashSet::new();
        for param in &self.params {
            if let Some(first) = sources.insert(&param.name, param.source) {
                return Err(if first == param.source {
                    SpecError::DuplicateParameter {
                        name: param.name.clone(),
                        source_kind: param.source,
                    }
                } else {
                    SpecError::SourceConflict {
                        name: param.name.clone(),
                        first,
                        second: param.source,
                    }
                });
            }
            if !keys.insert((param.source, param.lookup_key())) {
                return Err(SpecError::DuplicateParameter {
                    name: param.lookup_key().to_string(),
                    source_kind: param.source,
                });
            }
            check_source_type(param)?;
        }

        let declared: HashSet<&str> = self
            .params
            .iter()
            .filter(|p| p.source == Source::Path)
            .map(|p| p.lookup_key())
            .collect();
        let placeholders: HashSet<&str> = template.placeholders().collect();
        if let Some(name) = placeholders.iter().find(|n| !declared.contains(*n)) {
            return Err(SpecError::UndeclaredPathParameter {
                name: name.to_string(),
                path: self.path.clone(),
            });
        }
        if let Some(name) = declared.iter().find(|n| !placeholders.contains(*n)) {
            return Err(SpecError::UnknownPathParameter {
                name: name.to_string(),
                path: self.path.clone(),
            });
        }

        let mut params = self.params;
        for param in &mut params {
            param.default = check_declaration(
                &param.name,
                &param.ty,
                param.required,
                param.default.take(),
                &param.constraints,
            )?;
        }

        Ok(Route {
            method: self.method,
            template,
            params,
        })
    }
}

fn check_source_type(param: &ParameterSpec) -> Result<(), SpecError> {
    match param.source {
        Source::Body if !param.ty.is_structured() => Err(SpecError::BodyNotStructured {
            name: param.name.clone(),
            actual: param.ty.name(),
        }),
        Source::Path if !param.ty.is_primitive() => Err(SpecError::NotPrimitive {
            name: param.name.clone(),
            source_kind: param.source,
            actual: param.ty.name(),
        }),
        Source::Path if !param.required || param.default.is_some() => {
            Err(SpecError::OptionalPathParameter {
                name: param.name.clone(),
            })
        }
        Source::Query if !param.ty.is_query_compatible() => Err(SpecError::NotPrimitive {
            name: param.name.clone(),
            source_kind: param.source,
            actual: param.ty.name(),
        }),
        _ => Ok(()),
    }
}
