//! Declaration linting - static analysis of route declaration files.
//!
//! Checks declaration files for:
//! - JSON syntax and document shape errors
//! - Registration errors (conflicting sources, bad templates, bad defaults)
//! - Body schemas that don't render to a usable JSON Schema
//! - Defaults that violate their own constraints
//! - Required parameters hidden from documentation

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::binder::default_violations;
use crate::docs::object_schema;
use crate::error::LoadError;
use crate::loader::load_routes;
use crate::router::Router;
use crate::schema::ObjectSchema;
use crate::types::{ParamType, Source};

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// JSON path to the issue (e.g., "/routes/0/params/2")
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn error(code: &str, file: &Path, path: impl Into<String>, message: String) -> Self {
        Self {
            severity: Severity::Error,
            code: code.to_string(),
            file: file.to_path_buf(),
            path: path.into(),
            message,
        }
    }

    fn warning(code: &str, file: &Path, path: impl Into<String>, message: String) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, file, path, message)
        }
    }
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all .json files.
/// If `strict` is true, warnings are treated as errors.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let files = collect_declaration_files(path);
    let results: Vec<FileResult> = files.iter().map(|file| lint_file(file, path)).collect();

    let count = |severity: Severity| -> usize {
        results
            .iter()
            .flat_map(|r| &r.diagnostics)
            .filter(|d| d.severity == severity)
            .count()
    };
    let errors = count(Severity::Error);
    let warnings = count(Severity::Warning);

    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors,
        warnings,
        results,
    }
}

/// Lint a single declaration file.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let mut diagnostics = Vec::new();

    match load_routes(file) {
        Ok(router) => {
            check_params(&router, file, &mut diagnostics);
            check_schemas(&router, file, &mut diagnostics);
        }
        Err(LoadError::Spec(e)) => {
            diagnostics.push(Diagnostic::error("E002", file, "/", e.to_string()));
        }
        Err(e) => {
            diagnostics.push(Diagnostic::error("E001", file, "/", e.to_string()));
        }
    }

    let has_errors = diagnostics.iter().any(|d| d.severity == Severity::Error);
    let has_warnings = diagnostics.iter().any(|d| d.severity == Severity::Warning);

    let status = if has_errors {
        FileStatus::Error
    } else if has_warnings {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: file.strip_prefix(base_path).unwrap_or(file).to_path_buf(),
        status,
        diagnostics,
    }
}

/// W001 and W002 on route parameters.
fn check_params(router: &Router, file: &Path, diagnostics: &mut Vec<Diagnostic>) {
    for (i, route) in router.routes().iter().enumerate() {
        for (j, param) in route.params().iter().enumerate() {
            let path = format!("/routes/{}/params/{}", i, j);

            if let Some(default) = &param.default {
                for violation in
                    default_violations(param.source, &param.name, &param.constraints, default)
                {
                    diagnostics.push(Diagnostic::warning(
                        "W001",
                        file,
                        format!("{}/default", path),
                        format!("default for '{}': {}", param.name, violation.message),
                    ));
                }
            }

            if param.required && !param.visible {
                diagnostics.push(Diagnostic::warning(
                    "W002",
                    file,
                    path,
                    format!(
                        "required {} parameter '{}' is hidden from documentation",
                        param.source, param.name
                    ),
                ));
            }
        }
    }
}

/// E003 and W001 on body schemas, each schema checked once.
fn check_schemas(router: &Router, file: &Path, diagnostics: &mut Vec<Diagnostic>) {
    let mut seen = HashSet::new();
    let mut schemas = Vec::new();
    for route in router.routes() {
        for param in route.params() {
            collect_schemas(&param.ty, &mut seen, &mut schemas);
        }
    }

    for schema in &schemas {
        let base = format!("/schemas/{}", schema.name());

        if let Err(e) = jsonschema::validator_for(&object_schema(schema)) {
            diagnostics.push(Diagnostic::error(
                "E003",
                file,
                base.clone(),
                format!("schema '{}' does not render to valid JSON Schema: {}", schema.name(), e),
            ));
        }

        for (k, field) in schema.fields().iter().enumerate() {
            let Some(default) = &field.default else {
                continue;
            };
            for violation in
                default_violations(Source::Body, &field.name, &field.constraints, default)
            {
                diagnostics.push(Diagnostic::warning(
                    "W001",
                    file,
                    format!("{}/fields/{}/default", base, k),
                    format!("default for '{}': {}", field.name, violation.message),
                ));
            }
        }
    }
}

fn collect_schemas(
    ty: &ParamType,
    seen: &mut HashSet<*const ObjectSchema>,
    out: &mut Vec<Arc<ObjectSchema>>,
) {
    match ty {
        ParamType::Array(item) => collect_schemas(item, seen, out),
        ParamType::Object(schema) => {
            if !seen.insert(Arc::as_ptr(schema)) {
                return;
            }
            out.push(Arc::clone(schema));
            for field in schema.fields() {
                collect_schemas(&field.ty, seen, out);
            }
        }
        _ => {}
    }
}

/// Collect all .json files in a path (file or directory).
fn collect_declaration_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path);
        }
    }
}
