//! Route declaration loading from files, strings, and HTTP URLs.
//!
//! A declaration document lists named body schemas and routes:
//!
//! ```json
//! {
//!   "schemas": {
//!     "Item": { "fields": [ { "name": "name", "type": "string" } ] }
//!   },
//!   "routes": [
//!     {
//!       "method": "PUT",
//!       "path": "/items/{item_id}",
//!       "params": [
//!         { "name": "item_id", "in": "path", "type": "integer" },
//!         { "name": "item", "in": "body", "type": { "$ref": "Item" } },
//!         { "name": "q", "in": "query", "type": "string", "required": false }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use http::Method;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{LoadError, SpecError};
use crate::route::Route;
use crate::router::Router;
use crate::schema::{FieldSpec, ObjectSchema};
use crate::spec::ParameterSpec;
use crate::types::{Constraints, ParamType, Pattern, Source};

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a JSON document (e.g. a request body) from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_json(path: &Path) -> Result<Value, LoadError> {
    let content = read_file(path)?;
    serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load route declarations from a file path.
///
/// # Errors
///
/// Returns `LoadError` if the file can't be read, isn't a valid
/// declaration document, or declares an invalid route.
pub fn load_routes(path: &Path) -> Result<Router, LoadError> {
    let content = read_file(path)?;
    load_routes_str(&content)
}

/// Load route declarations from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` for malformed JSON,
/// `LoadError::InvalidDocument` for JSON of the wrong shape, or
/// `LoadError::Spec` for an invalid declaration.
pub fn load_routes_str(content: &str) -> Result<Router, LoadError> {
    let document: Document = serde_json::from_str(content).map_err(|source| {
        if source.is_data() {
            LoadError::InvalidDocument { source }
        } else {
            LoadError::InvalidJson { source }
        }
    })?;
    Ok(build_router(&document)?)
}

/// Load route declarations from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails, otherwise the
/// same errors as [`load_routes_str`].
#[cfg(feature = "remote")]
pub fn load_routes_url(url: &str) -> Result<Router, LoadError> {
    let network = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network)?;

    // Check for HTTP errors before parsing
    let body = client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.text())
        .map_err(network)?;

    load_routes_str(&body)
}

/// Load route declarations from a file path or URL.
///
/// URLs (`http://` or `https://`) require the `remote` feature.
///
/// # Errors
///
/// Same as [`load_routes`] or [`load_routes_url`].
pub fn load_routes_auto(source: &str) -> Result<Router, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_routes_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_routes(Path::new(source))
    }
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })
}

// --- Document format ---

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Document {
    #[serde(default)]
    schemas: IndexMap<String, SchemaDef>,
    routes: Vec<RouteDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaDef {
    fields: Vec<FieldDef>,
    #[serde(default)]
    strict: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RouteDef {
    method: String,
    path: String,
    #[serde(default)]
    params: Vec<ParamDef>,
}

// Constraint keys are listed explicitly; any other key is rejected.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldDef {
    name: String,
    #[serde(rename = "type")]
    ty: TypeDef,
    required: Option<bool>,
    default: Option<Value>,
    alias: Option<String>,
    description: Option<String>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<Pattern>,
    ge: Option<f64>,
    gt: Option<f64>,
    le: Option<f64>,
    lt: Option<f64>,
}

impl FieldDef {
    fn constraints(&self) -> Constraints {
        Constraints {
            min_length: self.min_length,
            max_length: self.max_length,
            pattern: self.pattern.clone(),
            ge: self.ge,
            gt: self.gt,
            le: self.le,
            lt: self.lt,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ParamDef {
    name: String,
    #[serde(rename = "in")]
    source: Source,
    #[serde(rename = "type")]
    ty: TypeDef,
    required: Option<bool>,
    default: Option<Value>,
    alias: Option<String>,
    #[serde(default)]
    deprecated: bool,
    #[serde(default = "default_visible")]
    visible: bool,
    description: Option<String>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<Pattern>,
    ge: Option<f64>,
    gt: Option<f64>,
    le: Option<f64>,
    lt: Option<f64>,
}

impl ParamDef {
    fn constraints(&self) -> Constraints {
        Constraints {
            min_length: self.min_length,
            max_length: self.max_length,
            pattern: self.pattern.clone(),
            ge: self.ge,
            gt: self.gt,
            le: self.le,
            lt: self.lt,
        }
    }
}

fn default_visible() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TypeDef {
    Primitive(String),
    Array {
        array: Box<TypeDef>,
    },
    Ref {
        #[serde(rename = "$ref")]
        reference: String,
    },
    Inline {
        object: SchemaDef,
    },
}

/// Resolves named schema references, building each schema once.
struct SchemaResolver<'a> {
    defs: &'a IndexMap<String, SchemaDef>,
    built: HashMap<String, Arc<ObjectSchema>>,
    in_progress: Vec<String>,
}

impl<'a> SchemaResolver<'a> {
    fn new(defs: &'a IndexMap<String, SchemaDef>) -> Self {
        Self {
            defs,
            built: HashMap::new(),
            in_progress: Vec::new(),
        }
    }

    fn named(&mut self, name: &str) -> Result<Arc<ObjectSchema>, SpecError> {
        if let Some(schema) = self.built.get(name) {
            return Ok(Arc::clone(schema));
        }
        if self.in_progress.iter().any(|n| n == name) {
            return Err(SpecError::RecursiveSchema {
                name: name.to_string(),
            });
        }
        let defs = self.defs;
        let def = defs.get(name).ok_or_else(|| SpecError::UnknownSchema {
            name: name.to_string(),
        })?;

        self.in_progress.push(name.to_string());
        let schema = self.build(name, def);
        self.in_progress.pop();

        let schema = schema?;
        self.built.insert(name.to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    fn build(&mut self, name: &str, def: &SchemaDef) -> Result<Arc<ObjectSchema>, SpecError> {
        let mut fields = Vec::with_capacity(def.fields.len());
        for field in &def.fields {
            fields.push(FieldSpec {
                name: field.name.clone(),
                ty: self.resolve_type(&field.name, &field.ty)?,
                required: field.required.unwrap_or(field.default.is_none()),
                default: field.default.clone(),
                constraints: field.constraints(),
                alias: field.alias.clone(),
                description: field.description.clone(),
            });
        }
        ObjectSchema::builder(name)
            .fields(fields)
            .strict(def.strict)
            .build()
    }

    fn resolve_type(&mut self, owner: &str, def: &TypeDef) -> Result<ParamType, SpecError> {
        match def {
            TypeDef::Primitive(name) => {
                ParamType::parse_primitive(name).ok_or_else(|| SpecError::UnknownType {
                    name: name.clone(),
                })
            }
            TypeDef::Array { array } => Ok(ParamType::array(self.resolve_type(owner, array)?)),
            TypeDef::Ref { reference } => Ok(ParamType::Object(self.named(reference)?)),
            TypeDef::Inline { object } => Ok(ParamType::Object(self.build(owner, object)?)),
        }
    }
}

fn build_router(document: &Document) -> Result<Router, SpecError> {
    let mut resolver = SchemaResolver::new(&document.schemas);

    // Build every named schema, including unreferenced ones, so that
    // authoring errors surface regardless of use.
    for name in document.schemas.keys() {
        resolver.named(name)?;
    }

    let mut router = Router::new();
    for route_def in &document.routes {
        let method = Method::from_bytes(route_def.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| SpecError::InvalidMethod {
                method: route_def.method.clone(),
            })?;

        let mut builder = Route::builder(method, route_def.path.clone());
        for param in &route_def.params {
            builder = builder.param(ParameterSpec {
                name: param.name.clone(),
                source: param.source,
                ty: resolver.resolve_type(&param.name, &param.ty)?,
                required: param.required.unwrap_or(param.default.is_none()),
                default: param.default.clone(),
                constraints: param.constraints(),
                alias: param.alias.clone(),
                deprecated: param.deprecated,
                visible: param.visible,
                description: param.description.clone(),
            });
        }
        router.insert(builder.build()?)?;
    }

    debug!(
        routes = router.routes().len(),
        schemas = document.schemas.len(),
        "route declarations loaded"
    );
    Ok(router)
}
