//! Param Binder
//!
//! Declarative binding and validation of HTTP request parameters.
//!
//! A route declares its parameters once (name, source, type, required,
//! default, constraints, alias). At request time the binder extracts each
//! parameter from its source (path, query or body), converts it to the
//! declared type, checks its constraints and returns one value per
//! parameter, or every violation at once.
//!
//! # Example
//!
//! ```
//! use http::Method;
//! use param_binder::{Constraints, ParamType, ParameterSpec, Pattern, Route, Router};
//! use serde_json::json;
//!
//! let route = Route::builder(Method::GET, "/items/{item_id}")
//!     .param(ParameterSpec::path("item_id", ParamType::Integer))
//!     .param(
//!         ParameterSpec::query("q", ParamType::String)
//!             .alias("item-query")
//!             .optional()
//!             .constraints(
//!                 Constraints::new()
//!                     .min_length(3)
//!                     .max_length(50)
//!                     .pattern(Pattern::new("^fixedquery$").unwrap()),
//!             ),
//!     )
//!     .build()
//!     .unwrap();
//! let router = Router::new().route(route).unwrap();
//!
//! let bound = router
//!     .bind(&Method::GET, "/items/42?item-query=fixedquery", None)
//!     .unwrap();
//! assert_eq!(bound.get("item_id"), Some(&json!(42)));
//! assert_eq!(bound.get("q"), Some(&json!("fixedquery")));
//!
//! // Violations are collected, never short-circuited
//! let err = router.bind(&Method::GET, "/items/x?item-query=ab", None);
//! assert!(err.is_err());
//! ```
//!
//! # Sources
//!
//! | Source | Lookup | Types |
//! |--------|--------|-------|
//! | `path` | placeholder in the route template | primitives, always required |
//! | `query` | query-string key (alias if set) | primitives and arrays of primitives |
//! | `body` | whole payload, or member when embedded | structured schemas |
//!
//! A single body parameter binds the whole payload. With several body
//! parameters, the payload is an object keyed by each parameter's lookup
//! key.

mod binder;
mod docs;
mod error;
mod linter;
mod loader;
mod request;
mod route;
mod router;
mod schema;
mod spec;
mod types;

pub use binder::{bind, BoundRequest};
pub use docs::{describe, object_schema, type_schema, BodyDoc, ParamDoc, RouteDoc};
pub use error::{ErrorKind, LoadError, ParamError, RouteError, SpecError, ValidationError};
pub use linter::{lint, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity};
pub use loader::{is_url, load_json, load_routes, load_routes_auto, load_routes_str};
pub use request::{parse_query, split_target, PathValues, QueryValues};
pub use route::{Route, RouteBuilder};
pub use router::Router;
pub use schema::{FieldSpec, ObjectSchema, ObjectSchemaBuilder};
pub use spec::ParameterSpec;
pub use types::{json_type_name, Constraints, ParamType, Pattern, Source};

#[cfg(feature = "remote")]
pub use loader::load_routes_url;
