//! Documentation metadata for routes.
//!
//! This is where `visible`, `deprecated` and `description` end up: the
//! descriptors produced here feed an external documentation generator.
//! Binding never looks at them.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::router::Router;
use crate::schema::ObjectSchema;
use crate::spec::ParameterSpec;
use crate::types::{Constraints, ParamType, Source};

/// Documentation for one route.
#[derive(Debug, Clone, Serialize)]
pub struct RouteDoc {
    pub method: String,
    pub path: String,
    pub parameters: Vec<ParamDoc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<BodyDoc>,
}

/// Documentation for one path or query parameter.
#[derive(Debug, Clone, Serialize)]
pub struct ParamDoc {
    /// Lookup key (the alias when one is declared).
    pub name: String,
    #[serde(rename = "in")]
    pub source: Source,
    pub required: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    pub schema: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Documentation for the request body.
#[derive(Debug, Clone, Serialize)]
pub struct BodyDoc {
    pub required: bool,
    pub schema: Value,
}

/// Describe every route. Hidden parameters are left out.
pub fn describe(router: &Router) -> Vec<RouteDoc> {
    router
        .routes()
        .iter()
        .map(|route| {
            let visible: Vec<&ParameterSpec> = route.params().iter().filter(|p| p.visible).collect();
            let all_bodies = route
                .params()
                .iter()
                .filter(|p| p.source == Source::Body)
                .count();

            let parameters = visible
                .iter()
                .filter(|p| p.source != Source::Body)
                .map(|p| ParamDoc {
                    name: p.lookup_key().to_string(),
                    source: p.source,
                    required: p.required,
                    deprecated: p.deprecated,
                    schema: param_schema(p),
                    description: p.description.clone(),
                })
                .collect();

            let bodies: Vec<&ParameterSpec> = visible
                .iter()
                .copied()
                .filter(|p| p.source == Source::Body)
                .collect();
            let request_body = body_doc(&bodies, all_bodies > 1);

            RouteDoc {
                method: route.method().to_string(),
                path: route.path().to_string(),
                parameters,
                request_body,
            }
        })
        .collect()
}

fn body_doc(bodies: &[&ParameterSpec], embedded: bool) -> Option<BodyDoc> {
    match bodies {
        [] => None,
        [single] if !embedded => Some(BodyDoc {
            required: single.required,
            schema: param_schema(single),
        }),
        many => {
            let mut properties = Map::new();
            let mut required = Vec::new();
            for p in many {
                properties.insert(p.lookup_key().to_string(), param_schema(p));
                if p.required {
                    required.push(Value::String(p.lookup_key().to_string()));
                }
            }
            Some(BodyDoc {
                required: !required.is_empty(),
                schema: json!({
                    "type": "object",
                    "properties": properties,
                    "required": required,
                }),
            })
        }
    }
}

fn param_schema(p: &ParameterSpec) -> Value {
    let mut schema = constrained_schema(&p.ty, &p.constraints);
    if let (Some(default), Value::Object(map)) = (&p.default, &mut schema) {
        map.insert("default".to_string(), default.clone());
    }
    if p.deprecated {
        if let Value::Object(map) = &mut schema {
            map.insert("deprecated".to_string(), Value::Bool(true));
        }
    }
    schema
}

/// Render a type as JSON Schema, without constraints.
pub fn type_schema(ty: &ParamType) -> Value {
    match ty {
        ParamType::String => json!({ "type": "string" }),
        ParamType::Integer => json!({ "type": "integer" }),
        ParamType::Number => json!({ "type": "number" }),
        ParamType::Boolean => json!({ "type": "boolean" }),
        ParamType::Array(item) => json!({ "type": "array", "items": type_schema(item) }),
        ParamType::Object(schema) => object_schema(schema),
    }
}

/// Render a structured schema as JSON Schema.
///
/// Properties are keyed by lookup key. Strict schemas close
/// `additionalProperties`.
pub fn object_schema(schema: &ObjectSchema) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in schema.fields() {
        let mut prop = constrained_schema(&field.ty, &field.constraints);
        if let Value::Object(map) = &mut prop {
            if let Some(default) = &field.default {
                map.insert("default".to_string(), default.clone());
            }
            if let Some(description) = &field.description {
                map.insert("description".to_string(), Value::String(description.clone()));
            }
        }
        properties.insert(field.lookup_key().to_string(), prop);
        if field.required {
            required.push(Value::String(field.lookup_key().to_string()));
        }
    }

    let mut result = Map::new();
    result.insert("title".to_string(), Value::String(schema.name().to_string()));
    result.insert("type".to_string(), Value::String("object".to_string()));
    result.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        result.insert("required".to_string(), Value::Array(required));
    }
    if schema.is_strict() {
        result.insert("additionalProperties".to_string(), Value::Bool(false));
    }
    Value::Object(result)
}

fn constrained_schema(ty: &ParamType, constraints: &Constraints) -> Value {
    let mut schema = type_schema(ty);
    let Value::Object(map) = &mut schema else {
        return schema;
    };

    let is_array = matches!(ty, ParamType::Array(_));
    let (min_key, max_key) = if is_array {
        ("minItems", "maxItems")
    } else {
        ("minLength", "maxLength")
    };
    if let Some(min) = constraints.min_length {
        map.insert(min_key.to_string(), Value::from(min));
    }
    if let Some(max) = constraints.max_length {
        map.insert(max_key.to_string(), Value::from(max));
    }

    // Per-item rules live under "items" for arrays
    let target = if is_array {
        map.get_mut("items").and_then(Value::as_object_mut)
    } else {
        Some(map)
    };
    if let Some(target) = target {
        if let Some(pattern) = &constraints.pattern {
            target.insert("pattern".to_string(), Value::String(pattern.anchored().to_string()));
        }
        for (key, bound) in [
            ("minimum", constraints.ge),
            ("exclusiveMinimum", constraints.gt),
            ("maximum", constraints.le),
            ("exclusiveMaximum", constraints.lt),
        ] {
            if let Some(bound) = bound {
                target.insert(key.to_string(), json!(bound));
            }
        }
    }
    schema
}
