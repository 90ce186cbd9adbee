//! Capabilities: the unit of generation.
//!
//! A [`Capability`] wraps one or more [`Operation`](crate::Operation)s behind a
//! single callable name. The miner creates them, the reasoning enhancer may
//! rewrite their human-facing text, and the safety classifier has the final
//! word on their [`SafetyTier`].

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::spec::{HttpMethod, Parameter};

/// Risk classification. Ordered by severity: `Read < Write < Destructive`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SafetyTier {
    /// No side effects
    #[default]
    Read,
    /// Creates or modifies data
    Write,
    /// Deletes or irreversibly alters data
    Destructive,
}

impl SafetyTier {
    /// Baseline tier implied by an HTTP method
    #[must_use]
    pub fn from_method(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get | HttpMethod::Head | HttpMethod::Options => Self::Read,
            HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch => Self::Write,
            HttpMethod::Delete => Self::Destructive,
        }
    }

    /// Parse `read`/`write`/`destructive` (case-insensitive)
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "read" | "read_only" | "readonly" => Some(Self::Read),
            "write" => Some(Self::Write),
            "destructive" | "delete" => Some(Self::Destructive),
            _ => None,
        }
    }

    /// Lower-case name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Destructive => "destructive",
        }
    }
}

impl fmt::Display for SafetyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a capability's name and description came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// Derived by the deterministic miner
    #[default]
    Heuristic,
    /// Rewritten by a reasoning provider
    AiEnhanced,
}

/// Reference to a backing operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRef {
    /// Operation id in the source [`Api`](crate::Api)
    pub id: String,
    /// HTTP method
    pub method: HttpMethod,
    /// Path template
    pub path: String,
}

/// A generated callable unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    /// Stable id derived from the grouping key
    pub id: String,
    /// Unique `snake_case` name
    pub name: String,
    /// Human-facing description
    pub description: String,
    /// Normalized group label
    pub tag: String,
    /// Current safety tier
    pub tier: SafetyTier,
    /// Tier computed by the first classifier pass; the floor for the final pass
    pub baseline_tier: SafetyTier,
    /// Backing operations (1..N)
    pub operations: Vec<OperationRef>,
    /// Parameter schema, unioned across backing operations
    pub parameters: Vec<Parameter>,
    /// Names of parameters flagged as sensitive
    #[serde(default)]
    pub redactions: BTreeSet<String>,
    /// Heuristic or AI-enhanced
    #[serde(default)]
    pub provenance: Provenance,
    /// Tier suggested by a reasoning provider (never authoritative)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_hint: Option<SafetyTier>,
}

impl Capability {
    /// First backing operation
    #[must_use]
    pub fn primary_operation(&self) -> Option<&OperationRef> {
        self.operations.first()
    }

    /// Distinct methods across backing operations
    #[must_use]
    pub fn methods(&self) -> BTreeSet<HttpMethod> {
        self.operations.iter().map(|o| o.method).collect()
    }

    /// Look up a parameter by name
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Whether a parameter is flagged as sensitive
    #[must_use]
    pub fn is_redacted(&self, name: &str) -> bool {
        self.redactions.contains(name)
    }

    /// Example arguments for documentation and generated tests.
    ///
    /// Redacted parameters are never included; everything else uses its
    /// example value or a type-appropriate placeholder.
    #[must_use]
    pub fn example_payload(&self) -> Value {
        let mut payload = Map::new();
        for param in &self.parameters {
            if self.is_redacted(&param.name) {
                continue;
            }
            let value = param
                .example
                .clone()
                .unwrap_or_else(|| param.param_type.placeholder());
            payload.insert(param.name.clone(), value);
        }
        Value::Object(payload)
    }

    /// JSON Schema object describing the capability's arguments
    #[must_use]
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut prop = Map::new();
            prop.insert("type".to_string(), json!(param.param_type.json_type()));
            if !param.description.is_empty() {
                prop.insert("description".to_string(), json!(param.description));
            }
            if self.is_redacted(&param.name) {
                prop.insert("writeOnly".to_string(), Value::Bool(true));
            }
            properties.insert(param.name.clone(), Value::Object(prop));

            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required
        })
    }
}
