//! Where a spec comes from, and how its text is obtained

use std::fmt;
use std::path::PathBuf;

use tracing::debug;

use crate::config::IngestConfig;
use crate::{Error, Result};

/// Input to ingestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Fetch with HTTP GET
    Url(String),
    /// Read from the local filesystem
    File(PathBuf),
    /// Already in memory (tests, stdin)
    Content {
        /// Label used in logs and errors
        label: String,
        /// Document text
        text: String,
    },
}

impl Source {
    /// Interpret a CLI argument: `http(s)://` is a URL, anything else a path
    #[must_use]
    pub fn from_arg(arg: &str) -> Self {
        if arg.starts_with("http://") || arg.starts_with("https://") {
            Self::Url(arg.to_string())
        } else {
            Self::File(PathBuf::from(arg))
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Content { label, .. } => f.write_str(label),
        }
    }
}

/// Read or fetch the raw document text
///
/// # Errors
///
/// Returns [`Error::Fetch`] if the URL is unreachable, answers with a
/// non-success status, or the file cannot be read.
pub async fn load_source(source: &Source, config: &IngestConfig) -> Result<String> {
    match source {
        Source::Url(url) => fetch(url, config).await,
        Source::File(path) => {
            debug!(path = %path.display(), "Reading spec file");
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| Error::Fetch {
                    source_desc: path.display().to_string(),
                    reason: e.to_string(),
                })
        }
        Source::Content { text, .. } => Ok(text.clone()),
    }
}

async fn fetch(url: &str, config: &IngestConfig) -> Result<String> {
    let fetch_error = |reason: String| Error::Fetch {
        source_desc: url.to_string(),
        reason,
    };

    let parsed = url::Url::parse(url).map_err(|e| fetch_error(format!("invalid URL: {e}")))?;

    let client = reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| fetch_error(e.to_string()))?;

    debug!(url = %parsed, "Fetching spec");
    let response = client
        .get(parsed)
        .header(
            reqwest::header::ACCEPT,
            "application/json, application/yaml, text/yaml, */*",
        )
        .send()
        .await
        .map_err(|e| fetch_error(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(fetch_error(format!("HTTP {status}")));
    }

    response.text().await.map_err(|e| fetch_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_arg_distinguishes_urls_and_paths() {
        assert_eq!(
            Source::from_arg("https://api.example.com/openapi.json"),
            Source::Url("https://api.example.com/openapi.json".into())
        );
        assert_eq!(
            Source::from_arg("specs/petstore.yaml"),
            Source::File(PathBuf::from("specs/petstore.yaml"))
        );
    }

    #[tokio::test]
    async fn missing_file_is_fetch_error() {
        let source = Source::File(PathBuf::from("/nonexistent/spec.yaml"));
        let err = load_source(&source, &IngestConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
        assert!(err.to_string().contains("/nonexistent/spec.yaml"));
    }

    #[tokio::test]
    async fn invalid_url_is_fetch_error() {
        let source = Source::Url("http://".into());
        let err = load_source(&source, &IngestConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
    }
}
