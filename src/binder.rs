//! Parameter binding - resolves declared parameters against a request.

use std::cmp::Ordering;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::error::{ParamError, ValidationError};
use crate::request::{PathValues, QueryValues};
use crate::schema::ObjectSchema;
use crate::spec::ParameterSpec;
use crate::types::{json_type_name, pointer_segment, Constraints, ParamType, Source};

/// Validated parameter values keyed by declared name.
///
/// Holds exactly one entry per declared parameter, in declaration order.
/// Optional parameters that were absent and have no default bind as null.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BoundRequest {
    values: Map<String, Value>,
}

impl BoundRequest {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Deserialize one value into a concrete type.
    ///
    /// An unknown name deserializes from null, so `Option<T>` yields `None`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, serde_json::Error> {
        T::deserialize(self.values.get(name).unwrap_or(&Value::Null))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.values)
    }
}

/// Bind a request against declared parameters.
///
/// Parameters are resolved in declaration order. Every failure across every
/// parameter is collected; binding succeeds only if there are none.
///
/// A single body parameter receives the whole payload. With several body
/// parameters the payload must be an object and each one is read from the
/// member named by its lookup key.
///
/// # Errors
///
/// Returns `ValidationError` listing every failed parameter.
pub fn bind(
    specs: &[ParameterSpec],
    path_values: &PathValues,
    query_values: &QueryValues,
    body: Option<&Value>,
) -> Result<BoundRequest, ValidationError> {
    let mut values = Map::new();
    let mut errors = Vec::new();

    let body_params = specs.iter().filter(|s| s.source == Source::Body).count();
    let embedded = body_params > 1;
    let body = body.filter(|b| !b.is_null());
    let mut body_rejected = false;

    if embedded {
        if let Some(other) = body.filter(|b| !b.is_object()) {
            let name = specs
                .iter()
                .find(|s| s.source == Source::Body)
                .map(|s| s.name.as_str())
                .unwrap_or_default();
            errors.push(ParamError::invalid_type(
                Source::Body,
                name,
                "/body",
                format!("expected object, got {}", json_type_name(other)),
            ));
            body_rejected = true;
        }
    }

    for spec in specs {
        let key = spec.lookup_key();
        let ctx = Ctx {
            source: spec.source,
            name: &spec.name,
        };
        let bound = match spec.source {
            Source::Path => {
                let path = format!("/path/{}", pointer_segment(key));
                match path_values.get(key) {
                    Some(raw) => {
                        bind_text(&ctx, &spec.ty, &spec.constraints, raw, &path, &mut errors)
                    }
                    None => {
                        errors.push(ParamError::missing(spec.source, &spec.name, &path));
                        None
                    }
                }
            }
            Source::Query => bind_query(&ctx, spec, key, query_values, &mut errors),
            Source::Body if body_rejected => None,
            Source::Body => {
                let (value, path) = if embedded {
                    let member = body.and_then(|b| b.get(key)).filter(|v| !v.is_null());
                    (member, format!("/body/{}", pointer_segment(key)))
                } else {
                    (body, "/body".to_string())
                };
                match value {
                    Some(value) => {
                        bind_json(&ctx, &spec.ty, &spec.constraints, value, &path, &mut errors)
                    }
                    None => absent(spec, &path, &mut errors),
                }
            }
        };

        if let Some(value) = bound {
            values.insert(spec.name.clone(), value);
        }
    }

    if errors.is_empty() {
        debug!(params = values.len(), "request bound");
        Ok(BoundRequest { values })
    } else {
        debug!(params = specs.len(), errors = errors.len(), "request rejected");
        Err(ValidationError::new(errors))
    }
}

/// Convert a declared default under the JSON body rules.
///
/// Constraints are not applied; defaults that violate their own
/// constraints are a lint warning, not a registration error.
pub(crate) fn convert_default(ty: &ParamType, value: &Value) -> Result<Value, String> {
    let ctx = Ctx {
        source: Source::Body,
        name: "default",
    };
    let mut errors = Vec::new();
    match bind_json(&ctx, ty, &Constraints::default(), value, "", &mut errors) {
        Some(converted) => Ok(converted),
        None => Err(errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ")),
    }
}

/// Constraint violations of a (converted) default value.
pub(crate) fn default_violations(
    source: Source,
    name: &str,
    constraints: &Constraints,
    value: &Value,
) -> Vec<ParamError> {
    let ctx = Ctx { source, name };
    let mut errors = Vec::new();
    check_constraints(&ctx, constraints, value, "", &mut errors);
    errors
}

// --- Internal implementation ---

struct Ctx<'a> {
    source: Source,
    name: &'a str,
}

fn absent(spec: &ParameterSpec, path: &str, errors: &mut Vec<ParamError>) -> Option<Value> {
    if spec.required {
        errors.push(ParamError::missing(spec.source, &spec.name, path));
        None
    } else {
        Some(spec.default.clone().unwrap_or(Value::Null))
    }
}

fn bind_query(
    ctx: &Ctx<'_>,
    spec: &ParameterSpec,
    key: &str,
    query_values: &QueryValues,
    errors: &mut Vec<ParamError>,
) -> Option<Value> {
    let path = format!("/query/{}", pointer_segment(key));
    let raw = match query_values.get(key) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return absent(spec, &path, errors),
    };

    match &spec.ty {
        ParamType::Array(item) => {
            let mut items = Vec::with_capacity(raw.len());
            let mut converted = true;
            for (i, text) in raw.iter().enumerate() {
                match convert_text(item, text) {
                    Ok(v) => items.push(v),
                    Err(message) => {
                        let item_path = format!("{}/{}", path, i);
                        errors.push(ParamError::invalid_type(ctx.source, ctx.name, &item_path, message));
                        converted = false;
                    }
                }
            }
            if !converted {
                return None;
            }
            let value = Value::Array(items);
            check_constraints(ctx, &spec.constraints, &value, &path, errors).then_some(value)
        }
        scalar => {
            if raw.len() > 1 {
                errors.push(ParamError::multiplicity(
                    ctx.source,
                    ctx.name,
                    &path,
                    format!("expected a single value, got {}", raw.len()),
                ));
                return None;
            }
            bind_text(ctx, scalar, &spec.constraints, &raw[0], &path, errors)
        }
    }
}

fn bind_text(
    ctx: &Ctx<'_>,
    ty: &ParamType,
    constraints: &Constraints,
    raw: &str,
    path: &str,
    errors: &mut Vec<ParamError>,
) -> Option<Value> {
    match convert_text(ty, raw) {
        Ok(value) => check_constraints(ctx, constraints, &value, path, errors).then_some(value),
        Err(message) => {
            errors.push(ParamError::invalid_type(ctx.source, ctx.name, path, message));
            None
        }
    }
}

/// Convert a path or query string to a primitive.
fn convert_text(ty: &ParamType, raw: &str) -> Result<Value, String> {
    let expected = |what: &str| format!("expected {}, got {:?}", what, raw);
    match ty {
        ParamType::String => Ok(Value::String(raw.to_string())),
        ParamType::Integer => raw
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| expected("integer")),
        ParamType::Number => raw
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| expected("number")),
        ParamType::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
            "false" | "0" | "no" | "off" => Ok(Value::Bool(false)),
            _ => Err(expected("boolean")),
        },
        other => Err(format!("{} cannot be read from text", other.name())),
    }
}

fn bind_json(
    ctx: &Ctx<'_>,
    ty: &ParamType,
    constraints: &Constraints,
    value: &Value,
    path: &str,
    errors: &mut Vec<ParamError>,
) -> Option<Value> {
    let converted = match ty {
        ParamType::Array(item) => {
            let Value::Array(items) = value else {
                errors.push(shape_mismatch(ctx, ty, value, path));
                return None;
            };
            let mut out = Vec::with_capacity(items.len());
            let mut ok = true;
            for (i, item_value) in items.iter().enumerate() {
                let item_path = format!("{}/{}", path, i);
                match bind_json(ctx, item, &Constraints::default(), item_value, &item_path, errors) {
                    Some(v) => out.push(v),
                    None => ok = false,
                }
            }
            if !ok {
                return None;
            }
            Value::Array(out)
        }
        ParamType::Object(schema) => {
            let Value::Object(members) = value else {
                errors.push(shape_mismatch(ctx, ty, value, path));
                return None;
            };
            bind_object(ctx, schema, members, path, errors)?
        }
        scalar => {
            if value.is_array() {
                errors.push(shape_mismatch(ctx, ty, value, path));
                return None;
            }
            match convert_json_scalar(scalar, value) {
                Ok(v) => v,
                Err(message) => {
                    errors.push(ParamError::invalid_type(ctx.source, ctx.name, path, message));
                    return None;
                }
            }
        }
    };

    check_constraints(ctx, constraints, &converted, path, errors).then_some(converted)
}

fn bind_object(
    ctx: &Ctx<'_>,
    schema: &ObjectSchema,
    members: &Map<String, Value>,
    path: &str,
    errors: &mut Vec<ParamError>,
) -> Option<Value> {
    let mut out = Map::new();
    let mut ok = true;

    for field in schema.fields() {
        let key = field.lookup_key();
        let field_path = format!("{}/{}", path, pointer_segment(key));
        match members.get(key) {
            Some(Value::Null) | None if !field.required => {
                out.insert(
                    field.name.clone(),
                    field.default.clone().unwrap_or(Value::Null),
                );
            }
            None => {
                errors.push(ParamError::missing(ctx.source, ctx.name, &field_path));
                ok = false;
            }
            Some(value) => {
                match bind_json(ctx, &field.ty, &field.constraints, value, &field_path, errors) {
                    Some(v) => {
                        out.insert(field.name.clone(), v);
                    }
                    None => ok = false,
                }
            }
        }
    }

    if schema.is_strict() {
        for key in members.keys() {
            if schema.field_by_key(key).is_none() {
                let member_path = format!("{}/{}", path, pointer_segment(key));
                errors.push(ParamError::unknown_field(ctx.source, ctx.name, &member_path));
                ok = false;
            }
        }
    }

    ok.then_some(Value::Object(out))
}

/// Error for an array where a single value was declared, or the reverse.
/// Objects in the wrong place are plain type errors.
fn shape_mismatch(ctx: &Ctx<'_>, ty: &ParamType, value: &Value, path: &str) -> ParamError {
    let expected = ty.name();
    let actual = json_type_name(value);
    match (ty, value) {
        (ParamType::Array(_), Value::Object(_) | Value::Null)
        | (ParamType::Object(_), _)
        | (_, Value::Object(_)) => ParamError::invalid_type(
            ctx.source,
            ctx.name,
            path,
            format!("expected {}, got {}", expected, actual),
        ),
        (ParamType::Array(_), _) => ParamError::multiplicity(
            ctx.source,
            ctx.name,
            path,
            format!("expected a list, got a single {}", actual),
        ),
        _ => ParamError::multiplicity(
            ctx.source,
            ctx.name,
            path,
            format!("expected a single {}, got a list", expected),
        ),
    }
}

fn convert_json_scalar(ty: &ParamType, value: &Value) -> Result<Value, String> {
    let mismatch = || format!("expected {}, got {}", ty.name(), json_type_name(value));
    match (ty, value) {
        (ParamType::String, Value::String(_)) | (ParamType::Boolean, Value::Bool(_)) => {
            Ok(value.clone())
        }
        (ParamType::Integer, Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::from(i))
            } else if n.is_u64() {
                Err("integer out of range".to_string())
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                        Ok(Value::from(f as i64))
                    }
                    _ => Err(format!("expected integer, got {}", n)),
                }
            }
        }
        (ParamType::Number, Value::Number(n)) => n
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(mismatch),
        _ => Err(mismatch()),
    }
}

/// Apply constraints to a converted value. Returns true if all passed.
fn check_constraints(
    ctx: &Ctx<'_>,
    constraints: &Constraints,
    value: &Value,
    path: &str,
    errors: &mut Vec<ParamError>,
) -> bool {
    if constraints.is_empty() {
        return true;
    }
    let before = errors.len();

    match value {
        Value::String(s) => {
            check_length(ctx, constraints, s.chars().count(), "string", "characters", path, errors);
            check_pattern(ctx, constraints, s, path, errors);
        }
        Value::Array(items) => {
            check_length(ctx, constraints, items.len(), "list", "items", path, errors);
            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{}/{}", path, i);
                match item {
                    Value::String(s) => check_pattern(ctx, constraints, s, &item_path, errors),
                    Value::Number(n) => check_bounds(ctx, constraints, n, &item_path, errors),
                    _ => {}
                }
            }
        }
        Value::Number(n) => check_bounds(ctx, constraints, n, path, errors),
        _ => {}
    }

    errors.len() == before
}

fn check_length(
    ctx: &Ctx<'_>,
    constraints: &Constraints,
    len: usize,
    what: &str,
    unit: &str,
    path: &str,
    errors: &mut Vec<ParamError>,
) {
    if let Some(min) = constraints.min_length.filter(|min| len < *min) {
        errors.push(ParamError::constraint(
            ctx.source,
            ctx.name,
            path,
            "min_length",
            format!("{} should have at least {} {}", what, min, unit),
        ));
    }
    if let Some(max) = constraints.max_length.filter(|max| len > *max) {
        errors.push(ParamError::constraint(
            ctx.source,
            ctx.name,
            path,
            "max_length",
            format!("{} should have at most {} {}", what, max, unit),
        ));
    }
}

fn check_pattern(
    ctx: &Ctx<'_>,
    constraints: &Constraints,
    value: &str,
    path: &str,
    errors: &mut Vec<ParamError>,
) {
    if let Some(pattern) = constraints.pattern.as_ref().filter(|p| !p.is_match(value)) {
        errors.push(ParamError::constraint(
            ctx.source,
            ctx.name,
            path,
            "pattern",
            format!("string should match pattern '{}'", pattern.as_str()),
        ));
    }
}

fn check_bounds(
    ctx: &Ctx<'_>,
    constraints: &Constraints,
    n: &Number,
    path: &str,
    errors: &mut Vec<ParamError>,
) {
    let checks: [(&str, Option<f64>, fn(Ordering) -> bool, &str); 4] = [
        ("ge", constraints.ge, |o| o != Ordering::Less, "greater than or equal to"),
        ("gt", constraints.gt, |o| o == Ordering::Greater, "greater than"),
        ("le", constraints.le, |o| o != Ordering::Greater, "less than or equal to"),
        ("lt", constraints.lt, |o| o == Ordering::Less, "less than"),
    ];
    for (constraint, bound, holds, phrase) in checks {
        let Some(bound) = bound else {
            continue;
        };
        if compare_to_bound(n, bound).is_some_and(|o| !holds(o)) {
            errors.push(ParamError::constraint(
                ctx.source,
                ctx.name,
                path,
                constraint,
                format!("input should be {} {}", phrase, bound),
            ));
        }
    }
}

/// Orders a number against a bound. Integers meet whole bounds in i64 so
/// values past 2^53 keep their precision.
fn compare_to_bound(n: &Number, bound: f64) -> Option<Ordering> {
    if let Some(i) = n.as_i64() {
        if bound.fract() == 0.0 && bound >= i64::MIN as f64 && bound < i64::MAX as f64 {
            return Some(i.cmp(&(bound as i64)));
        }
    }
    n.as_f64()?.partial_cmp(&bound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schema::FieldSpec;
    use crate::types::Pattern;
    use serde_json::json;
    use std::sync::Arc;

    fn item_schema() -> Arc<ObjectSchema> {
        ObjectSchema::builder("Item")
            .field(FieldSpec::required("name", ParamType::String))
            .field(FieldSpec::optional("description", ParamType::String))
            .field(FieldSpec::required("price", ParamType::Number))
            .field(FieldSpec::optional("tax", ParamType::Number))
            .build()
            .unwrap()
    }

    fn query(pairs: &[(&str, &str)]) -> QueryValues {
        let mut values = QueryValues::new();
        for (k, v) in pairs {
            values.entry(k.to_string()).or_default().push(v.to_string());
        }
        values
    }

    fn path(pairs: &[(&str, &str)]) -> PathValues {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn bind_query_only(specs: &[ParameterSpec], pairs: &[(&str, &str)]) -> Result<BoundRequest, ValidationError> {
        bind(specs, &PathValues::new(), &query(pairs), None)
    }

    // === Path ===

    #[test]
    fn path_integer_converts() {
        let specs = [ParameterSpec::path("item_id", ParamType::Integer)];
        let bound = bind(&specs, &path(&[("item_id", "42")]), &QueryValues::new(), None).unwrap();
        assert_eq!(bound.get("item_id"), Some(&json!(42)));
    }

    #[test]
    fn path_invalid_integer() {
        let specs = [ParameterSpec::path("item_id", ParamType::Integer)];
        let err = bind(&specs, &path(&[("item_id", "abc")]), &QueryValues::new(), None).unwrap_err();
        assert!(err.has(ErrorKind::TypeConversionError, "item_id"));
        assert_eq!(err.errors()[0].path, "/path/item_id");
    }

    #[test]
    fn path_missing_value() {
        let specs = [ParameterSpec::path("item_id", ParamType::Integer)];
        let err = bind(&specs, &PathValues::new(), &QueryValues::new(), None).unwrap_err();
        assert!(err.has(ErrorKind::MissingRequiredParameter, "item_id"));
    }

    // === Query ===

    #[test]
    fn query_optional_absent_binds_null() {
        let specs = [ParameterSpec::query("q", ParamType::String).optional()];
        let bound = bind_query_only(&specs, &[]).unwrap();
        assert_eq!(bound.get("q"), Some(&Value::Null));
    }

    #[test]
    fn query_default_used_when_absent() {
        let specs = [ParameterSpec::query("limit", ParamType::Integer).with_default(10)];
        let bound = bind_query_only(&specs, &[]).unwrap();
        assert_eq!(bound.get("limit"), Some(&json!(10)));
    }

    #[test]
    fn query_collection_keeps_order() {
        let specs = [ParameterSpec::query("q", ParamType::array(ParamType::String))];
        let bound = bind_query_only(&specs, &[("q", "foo"), ("q", "bar")]).unwrap();
        assert_eq!(bound.get("q"), Some(&json!(["foo", "bar"])));
    }

    #[test]
    fn query_scalar_with_many_values() {
        let specs = [ParameterSpec::query("q", ParamType::String)];
        let err = bind_query_only(&specs, &[("q", "foo"), ("q", "bar")]).unwrap_err();
        assert!(err.has(ErrorKind::MultiplicityError, "q"));
    }

    #[test]
    fn query_collection_item_conversion_failure_is_indexed() {
        let specs = [ParameterSpec::query("ids", ParamType::array(ParamType::Integer))];
        let err = bind_query_only(&specs, &[("ids", "1"), ("ids", "x")]).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.errors()[0].path, "/query/ids/1");
    }

    #[test]
    fn query_boolean_spellings() {
        let specs = [ParameterSpec::query("short", ParamType::Boolean)];
        for (raw, expected) in [("true", true), ("1", true), ("On", true), ("no", false), ("0", false)] {
            let bound = bind_query_only(&specs, &[("short", raw)]).unwrap();
            assert_eq!(bound.get("short"), Some(&json!(expected)), "input {}", raw);
        }
        assert!(bind_query_only(&specs, &[("short", "maybe")]).is_err());
    }

    #[test]
    fn query_number_rejects_non_finite() {
        let specs = [ParameterSpec::query("x", ParamType::Number)];
        assert!(bind_query_only(&specs, &[("x", "inf")]).is_err());
        let bound = bind_query_only(&specs, &[("x", "2.5")]).unwrap();
        assert_eq!(bound.get("x"), Some(&json!(2.5)));
    }

    // === Constraints ===

    fn fixed_query() -> ParameterSpec {
        ParameterSpec::query("q", ParamType::String).constraints(
            Constraints::new()
                .min_length(3)
                .max_length(50)
                .pattern(Pattern::new("^fixedquery$").unwrap()),
        )
    }

    #[test]
    fn constraint_violations_accumulate() {
        let specs = [fixed_query()];
        let err = bind_query_only(&specs, &[("q", "ab")]).unwrap_err();
        let constraints: Vec<_> = err
            .errors()
            .iter()
            .map(|e| e.constraint.as_deref().unwrap())
            .collect();
        assert_eq!(constraints, ["min_length", "pattern"]);
    }

    #[test]
    fn conversion_failure_short_circuits_constraints() {
        let specs = [ParameterSpec::query("n", ParamType::Integer)
            .constraints(Constraints::new().ge(1.0).le(5.0))];
        let err = bind_query_only(&specs, &[("n", "x")]).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.errors()[0].kind, ErrorKind::TypeConversionError);
    }

    #[test]
    fn numeric_bounds() {
        let specs = [ParameterSpec::query("n", ParamType::Integer)
            .constraints(Constraints::new().gt(0.0).lt(10.0))];
        assert!(bind_query_only(&specs, &[("n", "5")]).is_ok());
        let err = bind_query_only(&specs, &[("n", "0")]).unwrap_err();
        assert_eq!(err.errors()[0].constraint.as_deref(), Some("gt"));
        let err = bind_query_only(&specs, &[("n", "10")]).unwrap_err();
        assert_eq!(err.errors()[0].constraint.as_deref(), Some("lt"));
    }

    #[test]
    fn integer_bounds_exact_past_f64_precision() {
        let bounds = Constraints::new().le(9007199254740992.0);
        let specs = [ParameterSpec::query("n", ParamType::Integer).constraints(bounds.clone())];
        assert!(bind_query_only(&specs, &[("n", "9007199254740992")]).is_ok());
        let err = bind_query_only(&specs, &[("n", "9007199254740993")]).unwrap_err();
        assert_eq!(err.errors()[0].constraint.as_deref(), Some("le"));

        let schema = ObjectSchema::builder("Count")
            .field(FieldSpec::required("n", ParamType::Integer).constraints(bounds))
            .build()
            .unwrap();
        let specs = [ParameterSpec::body("count", schema)];
        let body = json!({"n": 9007199254740993i64});
        let err = bind(&specs, &PathValues::new(), &QueryValues::new(), Some(&body)).unwrap_err();
        assert_eq!(err.errors()[0].path, "/body/n");
        assert_eq!(err.errors()[0].constraint.as_deref(), Some("le"));

        let specs = [ParameterSpec::query("n", ParamType::Integer)
            .constraints(Constraints::new().gt(2.5))];
        assert!(bind_query_only(&specs, &[("n", "3")]).is_ok());
        assert!(bind_query_only(&specs, &[("n", "2")]).is_err());
    }

    #[test]
    fn collection_length_counts_items_and_pattern_checks_each() {
        let specs = [ParameterSpec::query("tag", ParamType::array(ParamType::String)).constraints(
            Constraints::new()
                .max_length(2)
                .pattern(Pattern::new("[a-z]+").unwrap()),
        )];
        let err = bind_query_only(&specs, &[("tag", "ok"), ("tag", "BAD"), ("tag", "x")]).unwrap_err();
        let paths: Vec<&str> = err.errors().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["/query/tag", "/query/tag/1"]);
    }

    #[test]
    fn length_counts_characters() {
        let specs = [ParameterSpec::query("q", ParamType::String)
            .constraints(Constraints::new().max_length(3))];
        assert!(bind_query_only(&specs, &[("q", "héé")]).is_ok());
    }

    // === Body ===

    #[test]
    fn body_binds_whole_payload() {
        let specs = [ParameterSpec::body("item", item_schema())];
        let body = json!({"name": "Foo", "price": 35.4});
        let bound = bind(&specs, &PathValues::new(), &QueryValues::new(), Some(&body)).unwrap();
        assert_eq!(
            bound.get("item"),
            Some(&json!({"name": "Foo", "description": null, "price": 35.4, "tax": null}))
        );
    }

    #[test]
    fn body_integer_price_becomes_float() {
        let specs = [ParameterSpec::body("item", item_schema())];
        let body = json!({"name": "Foo", "price": 10});
        let bound = bind(&specs, &PathValues::new(), &QueryValues::new(), Some(&body)).unwrap();
        assert!(bound.get("item").unwrap()["price"].is_f64());
    }

    #[test]
    fn body_missing_fields_all_reported() {
        let specs = [ParameterSpec::body("item", item_schema())];
        let body = json!({});
        let err = bind(&specs, &PathValues::new(), &QueryValues::new(), Some(&body)).unwrap_err();
        let paths: Vec<&str> = err.errors().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["/body/name", "/body/price"]);
        assert!(err.errors().iter().all(|e| e.name == "item"));
    }

    #[test]
    fn body_absent_and_required() {
        let specs = [ParameterSpec::body("item", item_schema())];
        let err = bind(&specs, &PathValues::new(), &QueryValues::new(), None).unwrap_err();
        assert!(err.has(ErrorKind::MissingRequiredParameter, "item"));
        assert_eq!(err.errors()[0].path, "/body");
    }

    #[test]
    fn body_null_for_required_field_is_type_error() {
        let specs = [ParameterSpec::body("item", item_schema())];
        let body = json!({"name": null, "price": 1.0});
        let err = bind(&specs, &PathValues::new(), &QueryValues::new(), Some(&body)).unwrap_err();
        assert!(err.has(ErrorKind::TypeConversionError, "item"));
    }

    #[test]
    fn body_scalar_for_object_is_type_error() {
        let specs = [ParameterSpec::body("item", item_schema())];
        let body = json!("Foo");
        let err = bind(&specs, &PathValues::new(), &QueryValues::new(), Some(&body)).unwrap_err();
        assert_eq!(err.errors()[0].kind, ErrorKind::TypeConversionError);
    }

    #[test]
    fn body_list_for_scalar_field_is_multiplicity_error() {
        let specs = [ParameterSpec::body("item", item_schema())];
        let body = json!({"name": ["a", "b"], "price": 1.0});
        let err = bind(&specs, &PathValues::new(), &QueryValues::new(), Some(&body)).unwrap_err();
        assert_eq!(err.errors()[0].kind, ErrorKind::MultiplicityError);
        assert_eq!(err.errors()[0].path, "/body/name");
    }

    #[test]
    fn body_integer_field_accepts_integral_float() {
        let schema = ObjectSchema::builder("Count")
            .field(FieldSpec::required("n", ParamType::Integer))
            .build()
            .unwrap();
        let specs = [ParameterSpec::body("count", schema)];
        let bound = bind(&specs, &PathValues::new(), &QueryValues::new(), Some(&json!({"n": 3.0}))).unwrap();
        assert_eq!(bound.get("count").unwrap()["n"], json!(3));
        let err = bind(&specs, &PathValues::new(), &QueryValues::new(), Some(&json!({"n": 3.5}))).unwrap_err();
        assert!(err.has(ErrorKind::TypeConversionError, "count"));
    }

    #[test]
    fn strict_schema_rejects_unknown_members() {
        let schema = ObjectSchema::builder("Item")
            .field(FieldSpec::required("name", ParamType::String))
            .strict(true)
            .build()
            .unwrap();
        let specs = [ParameterSpec::body("item", schema)];
        let body = json!({"name": "Foo", "colour": "red"});
        let err = bind(&specs, &PathValues::new(), &QueryValues::new(), Some(&body)).unwrap_err();
        assert!(err.has(ErrorKind::UnknownField, "item"));
        assert_eq!(err.errors()[0].path, "/body/colour");
    }

    #[test]
    fn lenient_schema_ignores_unknown_members() {
        let specs = [ParameterSpec::body("item", item_schema())];
        let body = json!({"name": "Foo", "price": 1.0, "colour": "red"});
        let bound = bind(&specs, &PathValues::new(), &QueryValues::new(), Some(&body)).unwrap();
        assert!(bound.get("item").unwrap().get("colour").is_none());
    }

    #[test]
    fn multiple_body_params_are_embedded() {
        let user = ObjectSchema::builder("User")
            .field(FieldSpec::required("username", ParamType::String))
            .build()
            .unwrap();
        let specs = [
            ParameterSpec::body("item", item_schema()),
            ParameterSpec::body("user", user),
        ];
        let body = json!({
            "item": {"name": "Foo", "price": 1.0},
            "user": {"username": "dave"}
        });
        let bound = bind(&specs, &PathValues::new(), &QueryValues::new(), Some(&body)).unwrap();
        assert_eq!(bound.get("user"), Some(&json!({"username": "dave"})));

        let err = bind(&specs, &PathValues::new(), &QueryValues::new(), Some(&json!({"item": {}})))
            .unwrap_err();
        let paths: Vec<&str> = err.errors().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["/body/item/name", "/body/item/price", "/body/user"]);
    }

    #[test]
    fn embedded_body_must_be_object() {
        let user = ObjectSchema::builder("User")
            .field(FieldSpec::required("username", ParamType::String))
            .build()
            .unwrap();
        let specs = [
            ParameterSpec::body("item", item_schema()),
            ParameterSpec::body("user", user),
        ];
        let err = bind(&specs, &PathValues::new(), &QueryValues::new(), Some(&json!([1]))).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.errors()[0].path, "/body");
    }

    #[test]
    fn nested_field_constraints() {
        let tag = ObjectSchema::builder("Tag")
            .field(FieldSpec::required("label", ParamType::String)
                .constraints(Constraints::new().min_length(2)))
            .build()
            .unwrap();
        let post = ObjectSchema::builder("Post")
            .field(FieldSpec::required("tags", ParamType::array(ParamType::Object(tag))))
            .build()
            .unwrap();
        let specs = [ParameterSpec::body("post", post)];
        let body = json!({"tags": [{"label": "ok"}, {"label": "x"}]});
        let err = bind(&specs, &PathValues::new(), &QueryValues::new(), Some(&body)).unwrap_err();
        assert_eq!(err.errors()[0].path, "/body/tags/1/label");
        assert_eq!(err.errors()[0].constraint.as_deref(), Some("min_length"));
    }

    // === Aggregation ===

    #[test]
    fn errors_collected_across_sources() {
        let specs = [
            ParameterSpec::path("item_id", ParamType::Integer),
            ParameterSpec::body("item", item_schema()),
            fixed_query(),
        ];
        let err = bind(
            &specs,
            &path(&[("item_id", "nope")]),
            &query(&[("q", "ab")]),
            Some(&json!({"price": "free"})),
        )
        .unwrap_err();
        let names: Vec<&str> = err.errors().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["item_id", "item", "item", "q", "q"]);
    }

    #[test]
    fn bound_values_in_declaration_order() {
        let specs = [
            ParameterSpec::query("b", ParamType::String).optional(),
            ParameterSpec::query("a", ParamType::String).optional(),
        ];
        let bound = bind_query_only(&specs, &[("a", "1"), ("b", "2")]).unwrap();
        let names: Vec<&str> = bound.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn get_as_deserializes() {
        let specs = [
            ParameterSpec::query("limit", ParamType::Integer).with_default(5),
            ParameterSpec::query("q", ParamType::String).optional(),
        ];
        let bound = bind_query_only(&specs, &[]).unwrap();
        assert_eq!(bound.get_as::<u32>("limit").unwrap(), 5);
        assert_eq!(bound.get_as::<Option<String>>("q").unwrap(), None);
    }

    // === Defaults ===

    #[test]
    fn convert_default_checks_type() {
        assert_eq!(convert_default(&ParamType::Integer, &json!(2.0)), Ok(json!(2)));
        assert!(convert_default(&ParamType::Integer, &json!("2")).is_err());
        assert_eq!(
            convert_default(&ParamType::array(ParamType::String), &json!(["a"])),
            Ok(json!(["a"]))
        );
    }

    #[test]
    fn default_violations_reports_constraints() {
        let constraints = Constraints::new().min_length(3);
        let violations = default_violations(Source::Query, "q", &constraints, &json!("ab"));
        assert_eq!(violations.len(), 1);
        assert!(default_violations(Source::Query, "q", &constraints, &json!("abc")).is_empty());
    }
}
