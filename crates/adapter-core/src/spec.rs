//! Canonical Spec Model
//!
//! The format-agnostic description of an API that `OpenAPI` 3.x, Swagger 2.x
//! and Postman v2.1 inputs are all normalized into. An [`Api`] is built once
//! per run and treated as immutable afterwards.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP method of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// Parse a method name, case-insensitively
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "get" => Some(Self::Get),
            "head" => Some(Self::Head),
            "options" => Some(Self::Options),
            "post" => Some(Self::Post),
            "put" => Some(Self::Put),
            "patch" => Some(Self::Patch),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }

    /// Upper-case wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a parameter travels in the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    /// Path placeholder
    Path,
    /// Query string
    Query,
    /// Request header
    Header,
    /// JSON or form body field
    Body,
}

impl ParamLocation {
    /// Parse an `in:` value. `formData` maps to [`ParamLocation::Body`];
    /// cookies are not modelled.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "body" | "formData" => Some(Self::Body),
            _ => None,
        }
    }

    /// Lower-case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Body => "body",
        }
    }
}

/// Semantic type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// Text
    #[default]
    String,
    /// Whole number
    Integer,
    /// Any number
    Number,
    /// true/false
    Boolean,
    /// JSON object
    Object,
    /// JSON array
    Array,
}

impl ParamType {
    /// Map a JSON Schema `type` keyword; unknown types fall back to string.
    #[must_use]
    pub fn from_schema_type(raw: &str) -> Self {
        match raw {
            "integer" => Self::Integer,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "object" => Self::Object,
            "array" => Self::Array,
            _ => Self::String,
        }
    }

    /// Infer a type from an example JSON value
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Bool(_) => Self::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => Self::Integer,
            Value::Number(_) => Self::Number,
            Value::Object(_) => Self::Object,
            Value::Array(_) => Self::Array,
            Value::String(_) | Value::Null => Self::String,
        }
    }

    /// JSON Schema `type` keyword
    #[must_use]
    pub fn json_type(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }

    /// Placeholder value used in example payloads when no example is known
    #[must_use]
    pub fn placeholder(self) -> Value {
        match self {
            Self::String => Value::String("string".to_string()),
            Self::Integer => Value::from(0),
            Self::Number => Value::from(0.0),
            Self::Boolean => Value::Bool(false),
            Self::Object => Value::Object(serde_json::Map::new()),
            Self::Array => Value::Array(Vec::new()),
        }
    }
}

/// A single input to an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Location
    pub location: ParamLocation,
    /// Semantic type
    #[serde(rename = "type")]
    pub param_type: ParamType,
    /// Whether the caller must supply it
    pub required: bool,
    /// Human-facing description
    #[serde(default)]
    pub description: String,
    /// Example value, if the source document carried one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

impl Parameter {
    /// New parameter; path parameters are always required.
    pub fn new(name: impl Into<String>, location: ParamLocation, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            location,
            param_type,
            required: location == ParamLocation::Path,
            description: String::new(),
            example: None,
        }
    }

    /// Set the required flag (path parameters stay required)
    #[must_use]
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required || self.location == ParamLocation::Path;
        self
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the example value
    #[must_use]
    pub fn with_example(mut self, example: Value) -> Self {
        self.example = Some(example);
        self
    }

    /// Optional query parameters are the "filters" that may differ between
    /// otherwise identical read operations.
    #[must_use]
    pub fn is_optional_filter(&self) -> bool {
        self.location == ParamLocation::Query && !self.required
    }
}

/// A single method + path endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Unique id within the owning [`Api`]
    pub id: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Path template in `{name}` syntax
    pub path: String,
    /// Tag / folder / group label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Ordered parameters
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// Request body JSON Schema, refs resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
    /// One-line summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Long description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Operation {
    /// New operation without parameters or text
    pub fn new(id: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method,
            path: path.into(),
            tag: None,
            parameters: Vec::new(),
            request_body: None,
            summary: None,
            description: None,
        }
    }

    /// Look up a parameter by name
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Whether a non-blank summary or description was declared
    #[must_use]
    pub fn has_text(&self) -> bool {
        [&self.summary, &self.description]
            .into_iter()
            .flatten()
            .any(|s| !s.trim().is_empty())
    }

    /// Best human-facing text: summary, then description, then `METHOD /path`
    #[must_use]
    pub fn display_text(&self) -> String {
        self.summary
            .as_deref()
            .or(self.description.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map_or_else(|| format!("{} {}", self.method, self.path), ToString::to_string)
    }
}

/// Kind of authentication an API declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthKind {
    /// API key in a header or query parameter
    ApiKey,
    /// `Authorization: Bearer`
    Bearer,
    /// HTTP basic
    Basic,
    /// OAuth 2
    #[serde(rename = "oauth2")]
    OAuth2,
    /// Anything else
    Other,
}

/// An authentication scheme declared by the source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthScheme {
    /// Scheme name as declared
    pub name: String,
    /// Kind
    pub kind: AuthKind,
    /// Where an API key travels (header/query)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ParamLocation>,
    /// Header or query parameter carrying the key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_name: Option<String>,
    /// Environment variable a generated server should read the credential from
    pub env_var: String,
}

/// A whole API description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Api {
    /// Title
    pub title: String,
    /// Version string
    pub version: String,
    /// Base URL (may be empty)
    pub base_url: String,
    /// Operations in discovery order
    pub operations: Vec<Operation>,
    /// Distinct operation tags in discovery order
    #[serde(default)]
    pub tags: Vec<String>,
    /// Declared authentication schemes
    #[serde(default)]
    pub auth_schemes: Vec<AuthScheme>,
}

impl Api {
    /// Empty API
    pub fn new(title: impl Into<String>, version: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            version: version.into(),
            base_url: base_url.into(),
            operations: Vec::new(),
            tags: Vec::new(),
            auth_schemes: Vec::new(),
        }
    }

    /// Append an operation, suffixing its id (`_2`, `_3`, …) if already taken.
    pub fn push_operation(&mut self, mut operation: Operation) {
        let taken: HashSet<&str> = self.operations.iter().map(|o| o.id.as_str()).collect();
        if taken.contains(operation.id.as_str()) {
            let base = operation.id.clone();
            let mut n = 2;
            while taken.contains(format!("{base}_{n}").as_str()) {
                n += 1;
            }
            operation.id = format!("{base}_{n}");
        }

        if let Some(tag) = &operation.tag {
            if !self.tags.contains(tag) {
                self.tags.push(tag.clone());
            }
        }
        self.operations.push(operation);
    }

    /// Look up an operation by id
    #[must_use]
    pub fn operation(&self, id: &str) -> Option<&Operation> {
        self.operations.iter().find(|o| o.id == id)
    }
}

/// Convert free text or identifiers into a lowercase `snake_case` identifier.
///
/// `getUserById` → `get_user_by_id`, `Pet Store` → `pet_store`.
#[must_use]
pub fn to_snake_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    let mut prev: Option<char> = None;
    for c in raw.chars() {
        if c.is_alphanumeric() {
            let boundary = c.is_uppercase()
                && prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit());
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
        prev = Some(c);
    }
    out.trim_end_matches('_').to_string()
}
