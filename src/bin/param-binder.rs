//! Param Binder CLI
//!
//! Command-line interface for binding requests against route declarations,
//! linting declaration files and printing documentation metadata.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use http::Method;
use param_binder::{
    describe, lint, load_json, load_routes_auto, FileStatus, RouteError, Router, Severity,
};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "param-binder")]
#[command(about = "Bind and validate HTTP request parameters against route declarations")]
#[command(version)]
struct Cli {
    /// Log output format (level from RUST_LOG, default "warn")
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Bind a request against the matching route and print the bound values
    Bind {
        /// Route declarations: file path or URL (http:// or https://)
        #[arg(long, env = "PARAM_BINDER_ROUTES")]
        routes: String,

        /// HTTP method (e.g., GET, PUT)
        #[arg(long, short = 'X', default_value = "GET")]
        method: String,

        /// Request target: path plus optional query string (e.g., /items/5?q=foo)
        #[arg(long)]
        url: String,

        /// JSON file holding the request body
        #[arg(long)]
        body: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Lint declaration files for errors (syntax, registration, schemas, defaults)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },

    /// Print documentation metadata for every route
    Describe {
        /// Route declarations: file path or URL (http:// or https://)
        #[arg(long, env = "PARAM_BINDER_ROUTES")]
        routes: String,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let result = match cli.command {
        Commands::Bind {
            routes,
            method,
            url,
            body,
            pretty,
        } => run_bind(&routes, &method, &url, body.as_deref(), pretty),
        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),
        Commands::Describe { routes, pretty } => run_describe(&routes, pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match format {
        LogFormat::Json => fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init(),
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

fn load_router(source: &str) -> Result<Router, u8> {
    load_routes_auto(source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), u8> {
    let output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    println!("{}", output);
    Ok(())
}

fn run_bind(
    routes: &str,
    method: &str,
    url: &str,
    body: Option<&Path>,
    pretty: bool,
) -> Result<(), u8> {
    let router = load_router(routes)?;

    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes()).map_err(|_| {
        eprintln!("Error: invalid HTTP method: {}", method);
        2u8
    })?;

    let body = body
        .map(|path| {
            load_json(path).map_err(|e| {
                eprintln!("Error: loading body: {}", e);
                e.exit_code() as u8
            })
        })
        .transpose()?;

    debug!(method = %method, url, has_body = body.is_some(), "binding request");
    match router.bind(&method, url, body.as_ref()) {
        Ok(bound) => print_json(&bound, pretty),
        Err(RouteError::Invalid(e)) => {
            print_json(&e.to_detail(), pretty)?;
            Err(e.exit_code() as u8)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            Err(e.exit_code() as u8)
        }
    }
}

fn run_describe(routes: &str, pretty: bool) -> Result<(), u8> {
    let router = load_router(routes)?;
    print_json(&describe(&router), pretty)
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict);

    if format == "json" {
        print_json(&result, true)?;
    } else {
        if !quiet {
            println!("Linting {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let (color, label) = match diag.severity {
                    Severity::Error => ("\x1b[31m", "error"),
                    Severity::Warning => ("\x1b[33m", "warning"),
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]\x1b[0m: {} - {}",
                        color, label, diag.code, diag.path, diag.message
                    );
                }
            }
        }

        println!();
        if result.is_ok() && (!strict || result.warnings == 0) {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if result.is_ok() && (!strict || result.warnings == 0) {
        Ok(())
    } else {
        Err(1)
    }
}
