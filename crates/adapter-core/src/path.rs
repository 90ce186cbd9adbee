//! Path templates with a single `{name}` placeholder syntax.
//!
//! Every ingestion format normalizes into this syntax: `OpenAPI`/Swagger already
//! use it, Postman's `:name` and `{{name}}` variables are rewritten by
//! [`normalize_template`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a path template cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathTemplateError {
    /// Template is empty
    #[error("empty path template")]
    Empty,
    /// Template does not start with `/`
    #[error("path template must start with '/': {0}")]
    NotAbsolute(String),
    /// Braces do not pair up
    #[error("unbalanced braces in path template: {0}")]
    Unbalanced(String),
    /// `{}` with no name, or a name with illegal characters
    #[error("invalid placeholder in path template: {0}")]
    InvalidPlaceholder(String),
}

/// One `/`-separated piece of a template
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    /// Literal text, e.g. `users`
    Static(String),
    /// A whole-segment placeholder, e.g. `{id}`
    Param(String),
    /// Literal text around one or more placeholders, e.g. `{id}.json`
    Mixed {
        /// Raw segment text
        raw: String,
        /// Placeholder names in order of appearance
        params: Vec<String>,
    },
}

/// A parsed path template
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    /// Parse a normalized template such as `/users/{id}/orders`.
    ///
    /// # Errors
    ///
    /// Returns a [`PathTemplateError`] when the template is empty, relative,
    /// has unbalanced braces or contains an empty/invalid placeholder name.
    pub fn parse(raw: &str) -> Result<Self, PathTemplateError> {
        if raw.is_empty() {
            return Err(PathTemplateError::Empty);
        }
        if !raw.starts_with('/') {
            return Err(PathTemplateError::NotAbsolute(raw.to_string()));
        }

        let mut segments = Vec::new();
        for piece in raw.split('/').filter(|s| !s.is_empty()) {
            segments.push(parse_segment(raw, piece)?);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The template text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed segments in order
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Literal segments before the first placeholder
    #[must_use]
    pub fn static_prefix(&self) -> Vec<&str> {
        self.segments
            .iter()
            .map_while(|s| match s {
                Segment::Static(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Every literal segment, skipping placeholders
    #[must_use]
    pub fn static_segments(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Static(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Template with placeholder names erased, so `/a/{id}` and `/a/{key}`
    /// share the shape `/a/{}`.
    #[must_use]
    pub fn shape(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Static(text) => out.push_str(text),
                Segment::Param(_) => out.push_str("{}"),
                Segment::Mixed { raw, params } => {
                    let mut erased = raw.clone();
                    for p in params {
                        erased = erased.replace(&format!("{{{p}}}"), "{}");
                    }
                    out.push_str(&erased);
                }
            }
        }
        if out.is_empty() {
            out.push('/');
        }
        out
    }

    /// Placeholder names in order of appearance
    #[must_use]
    pub fn param_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Static(_) => {}
                Segment::Param(name) => names.push(name.as_str()),
                Segment::Mixed { params, .. } => names.extend(params.iter().map(String::as_str)),
            }
        }
        names
    }

    /// Whether the final segment is a placeholder (an item path rather than a collection)
    #[must_use]
    pub fn ends_with_param(&self) -> bool {
        matches!(self.segments.last(), Some(Segment::Param(_) | Segment::Mixed { .. }))
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_segment(raw: &str, piece: &str) -> Result<Segment, PathTemplateError> {
    if !piece.contains('{') && !piece.contains('}') {
        return Ok(Segment::Static(piece.to_string()));
    }

    let mut params = Vec::new();
    let mut rest = piece;
    while let Some(open) = rest.find(['{', '}']) {
        if rest.as_bytes()[open] == b'}' {
            return Err(PathTemplateError::Unbalanced(raw.to_string()));
        }
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| PathTemplateError::Unbalanced(raw.to_string()))?;
        let name = &after[..close];
        if name.is_empty() || name.contains('{') || !name.chars().all(is_placeholder_char) {
            return Err(PathTemplateError::InvalidPlaceholder(raw.to_string()));
        }
        params.push(name.to_string());
        rest = &after[close + 1..];
    }

    let whole = params.len() == 1 && piece.len() == params[0].len() + 2;
    if whole {
        Ok(Segment::Param(params.remove(0)))
    } else {
        Ok(Segment::Mixed {
            raw: piece.to_string(),
            params,
        })
    }
}

fn is_placeholder_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// Rewrite a raw path into the canonical template syntax.
///
/// - strips any query string or fragment
/// - `:name` segments and `{{name}}` variables become `{name}`
/// - guarantees a leading `/` and drops a trailing one
#[must_use]
pub fn normalize_template(raw: &str) -> String {
    let without_query = raw.split(['?', '#']).next().unwrap_or_default();

    let segments: Vec<String> = without_query
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            if let Some(name) = segment.strip_prefix(':') {
                format!("{{{name}}}")
            } else {
                segment.replace("{{", "{").replace("}}", "}")
            }
        })
        .collect();

    format!("/{}", segments.join("/"))
}
