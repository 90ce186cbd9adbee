//! Ingestion: raw API descriptions into the canonical [`Api`] model.
//!
//! ```text
//! Source (URL | file | buffer)
//!   │  fetch / read                         (source.rs)
//!   ▼
//! text ──▶ serde_json::Value  (JSON, else YAML)
//!   │  first matching detector
//!   ▼
//! ┌──────────────┬──────────────┬──────────────┐
//! │ OpenAPI 3.x  │ Swagger 2.x  │ Postman v2.1 │
//! └──────────────┴──────────────┴──────────────┘
//!   ▼
//! Api
//! ```
//!
//! Formats are detected from top-level structural markers (`openapi`,
//! `swagger`, `info.schema`), never from a file extension, since URLs
//! frequently have none.

mod openapi;
mod postman;
mod schema;
mod source;
mod swagger;

pub use openapi::OpenApi3;
pub use postman::PostmanCollection;
pub use source::{Source, load_source};
pub use swagger::Swagger2;

use adapter_core::{Api, PathTemplate};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::IngestConfig;
use crate::{Error, Result};

/// A supported input format: a pure detector plus a parser.
pub trait SpecFormat: Sync {
    /// Human-readable format name
    fn name(&self) -> &'static str;

    /// Whether `doc` carries this format's top-level markers
    fn detect(&self, doc: &Value) -> bool;

    /// Convert a detected document into the canonical model
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedSpec`] when required sections are missing.
    fn parse(&self, doc: &Value) -> Result<Api>;
}

/// Detectors in the order they are tried
static FORMATS: &[&dyn SpecFormat] = &[&OpenApi3, &Swagger2, &PostmanCollection];

/// Top-level version marker as text. Unquoted YAML versions such as
/// `swagger: 2.0` arrive as numbers.
pub(crate) fn version_marker(doc: &Value, key: &str) -> Option<String> {
    match doc.get(key)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Find the first format whose detector accepts `doc`
#[must_use]
pub fn detect_format(doc: &Value) -> Option<&'static dyn SpecFormat> {
    FORMATS.iter().copied().find(|f| f.detect(doc))
}

/// Ingest an API description from a URL, file or in-memory buffer
///
/// # Errors
///
/// - [`Error::Fetch`] if the source cannot be read or fetched
/// - [`Error::UnsupportedFormat`] if no detector matches
/// - [`Error::MalformedSpec`] if the detected format is structurally invalid
pub async fn ingest(source: &Source, config: &IngestConfig) -> Result<Api> {
    let text = load_source(source, config).await?;
    let api = ingest_str(&text).map_err(|e| match e {
        Error::UnsupportedFormat(reason) => {
            Error::UnsupportedFormat(format!("{source}: {reason}"))
        }
        Error::MalformedSpec { format, reason } => Error::MalformedSpec {
            format,
            reason: format!("{source}: {reason}"),
        },
        other => other,
    })?;
    info!(
        source = %source,
        title = %api.title,
        version = %api.version,
        operations = api.operations.len(),
        tags = api.tags.len(),
        auth_schemes = api.auth_schemes.len(),
        "Ingested API description"
    );
    Ok(api)
}

/// Ingest an API description already held in memory
///
/// # Errors
///
/// See [`ingest`].
pub fn ingest_str(content: &str) -> Result<Api> {
    let doc = parse_document(content)?;
    let format = detect_format(&doc).ok_or_else(|| {
        Error::UnsupportedFormat(
            "document is not OpenAPI 3.x, Swagger 2.x or a Postman v2.1 collection".to_string(),
        )
    })?;
    format.parse(&doc)
}

/// Parse JSON or YAML text into a JSON value
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] when the text is neither, or is not a mapping.
pub fn parse_document(content: &str) -> Result<Value> {
    let trimmed = content.trim_start();
    let parsed: std::result::Result<Value, String> = if trimmed.starts_with('{') {
        serde_json::from_str(trimmed)
            .or_else(|_| serde_yaml::from_str(trimmed))
            .map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(trimmed)
            .or_else(|_| serde_json::from_str(trimmed))
            .map_err(|e| e.to_string())
    };

    match parsed {
        Ok(doc @ Value::Object(_)) => Ok(doc),
        Ok(_) => Err(Error::UnsupportedFormat(
            "document root is not a mapping".to_string(),
        )),
        Err(e) => Err(Error::UnsupportedFormat(format!(
            "input is neither JSON nor YAML: {e}"
        ))),
    }
}

/// Validate a normalized path template, logging and returning `false` if it
/// cannot be parsed. Shared by every format parser.
pub(crate) fn accept_path(operation_id: &str, path: &str) -> bool {
    match PathTemplate::parse(path) {
        Ok(_) => true,
        Err(e) => {
            warn!(
                operation = %operation_id,
                path = %path,
                error = %e,
                "Skipping operation with unparseable path template"
            );
            false
        }
    }
}

/// Environment variable name a generated server reads a credential from
pub(crate) fn credential_env_var(title: &str, suffix: &str) -> String {
    let stem = adapter_core::to_snake_case(title).to_uppercase();
    if stem.is_empty() {
        suffix.to_string()
    } else {
        format!("{stem}_{suffix}")
    }
}
