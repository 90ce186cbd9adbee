//! MCP Adapter Library
//!
//! Turns API descriptions into safety-classified MCP capabilities.
//!
//! # Pipeline
//!
//! - **Ingestion**: `OpenAPI` 3.x, Swagger 2.x and Postman v2.1, from a URL, a
//!   file or an in-memory buffer, normalized into [`adapter_core::Api`]
//! - **Mining**: clusters related operations and names the resulting capabilities
//! - **Safety**: assigns read / write / destructive tiers and redacts sensitive
//!   parameters from examples
//! - **Reasoning** (optional): rewrites names and descriptions through an
//!   ordered chain of chat-completion providers, falling back on failure
//! - **Policy**: allowlist, denylist, destructive blocking and tool caps
//!
//! Only ingestion can fail a run. Everything after it degrades to the
//! heuristic result.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod manifest;
pub mod mine;
pub mod pipeline;
pub mod policy;
pub mod reasoning;
pub mod safety;

pub use adapter_core;
pub use error::{Error, ProviderError, Result};
pub use pipeline::{Pipeline, PipelineOutput};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout stays clean for `inspect --json-output`
    match format {
        Some("json") => {
            subscriber
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| Error::Internal(format!("tracing already initialized: {e}")))?;
        }
        _ => {
            subscriber
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| Error::Internal(format!("tracing already initialized: {e}")))?;
        }
    }

    Ok(())
}
