//! Configuration management

use std::{env, path::Path, time::Duration};

use adapter_core::SafetyTier;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Main configuration, threaded explicitly through every pipeline stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    /// Environment files to load before resolving provider credentials.
    /// Paths support ~ expansion. Loaded in order, later files override earlier.
    #[serde(default)]
    pub env_files: Vec<String>,
    /// Ingestion configuration
    pub ingest: IngestConfig,
    /// Capability mining configuration
    pub mining: MiningConfig,
    /// Safety classifier configuration
    pub safety: SafetyConfig,
    /// Reasoning enhancer configuration
    pub reasoning: ReasoningConfig,
    /// Capability selection policy
    pub policy: PolicyConfig,
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    /// Timeout for fetching a spec by URL
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// User-Agent sent when fetching
    pub user_agent: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("mcp-adapter/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// How the miner picks between two clusters an operation could join
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Larger membership wins; equal sizes fall back to discovery order
    #[default]
    LargestFirst,
    /// Earliest discovered cluster wins regardless of size
    FirstDiscovered,
}

/// Capability mining configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MiningConfig {
    /// Merge filter-only GET variants into one search capability
    pub cluster_searches: bool,
    /// Cluster tie-break policy
    pub tie_break: TieBreak,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            cluster_searches: true,
            tie_break: TieBreak::LargestFirst,
        }
    }
}

/// What the final classifier pass does with a provider's safety hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintMode {
    /// A hint above the deterministic tier raises it; lower hints are ignored
    #[default]
    Escalate,
    /// Hints are recorded on the capability but never change its tier
    Informational,
}

/// Safety classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SafetyConfig {
    /// Keywords added to the built-in destructive vocabulary
    pub extra_destructive_keywords: Vec<String>,
    /// Field names added to the built-in sensitive vocabulary
    pub extra_sensitive_fields: Vec<String>,
    /// Handling of AI safety hints
    pub hint_mode: HintMode,
}

/// Which reasoning API a provider speaks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Moonshot Kimi (OpenAI-compatible)
    Kimi,
    /// `OpenRouter`
    OpenRouter,
    /// `OpenAI`
    OpenAi,
}

impl ProviderKind {
    /// Default API base URL
    #[must_use]
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Kimi => "https://api.moonshot.ai/v1",
            Self::OpenRouter => "https://openrouter.ai/api/v1",
            Self::OpenAi => "https://api.openai.com/v1",
        }
    }

    /// Default model id
    #[must_use]
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Kimi => "kimi-k2-0711-preview",
            Self::OpenRouter => "moonshotai/kimi-k2",
            Self::OpenAi => "gpt-4o-mini",
        }
    }
}

/// A single reasoning provider in the fallback chain
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    /// Name used in logs
    pub name: String,
    /// API flavour
    pub kind: ProviderKind,
    /// Environment variable holding the API key
    pub api_key_env_var: String,
    /// Replace the default base URL
    #[serde(default)]
    pub base_url_override: Option<String>,
    /// Replace the default model
    #[serde(default)]
    pub model_override: Option<String>,
}

impl ProviderConfig {
    /// Effective base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url_override
            .as_deref()
            .unwrap_or_else(|| self.kind.default_base_url())
    }

    /// Effective model
    #[must_use]
    pub fn model(&self) -> &str {
        self.model_override
            .as_deref()
            .unwrap_or_else(|| self.kind.default_model())
    }

    /// Read the API key from the environment
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<String> {
        env::var(&self.api_key_env_var)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig {
            name: "kimi".to_string(),
            kind: ProviderKind::Kimi,
            api_key_env_var: "MOONSHOT_API_KEY".to_string(),
            base_url_override: None,
            model_override: None,
        },
        ProviderConfig {
            name: "openrouter".to_string(),
            kind: ProviderKind::OpenRouter,
            api_key_env_var: "OPENROUTER_API_KEY".to_string(),
            base_url_override: None,
            model_override: None,
        },
    ]
}

/// Reasoning enhancer configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReasoningConfig {
    /// Run the enhancer
    pub enabled: bool,
    /// Per-provider request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Capabilities whose baseline tier is above this are not sent to providers
    pub max_editable_tier: SafetyTier,
    /// Providers in priority order
    pub providers: Vec<ProviderConfig>,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout: Duration::from_secs(60),
            max_editable_tier: SafetyTier::Destructive,
            providers: default_providers(),
        }
    }
}

/// Capability selection policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct PolicyConfig {
    /// Names (or `prefix*` patterns) always included
    pub allowlist: Vec<String>,
    /// Names (or `prefix*` patterns) always excluded
    pub denylist: Vec<String>,
    /// Drop every destructive capability, allowlisted or not
    pub block_destructive: bool,
    /// Maximum capabilities in the output (0 = unlimited)
    pub max_tools: usize,
    /// Only allowlisted capabilities survive (when the allowlist is non-empty)
    pub allowlist_exclusive: bool,
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Merge environment variables (MCP_ADAPTER_ prefix)
        figment = figment.merge(Env::prefixed("MCP_ADAPTER_").split("__"));

        let mut config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.load_env_files();
        config.expand_env_vars();

        Ok(config)
    }

    /// Load environment files into the process environment, then a `.env`
    /// in the working directory if present.
    /// Files that don't exist are silently skipped.
    fn load_env_files(&self) {
        for path_str in &self.env_files {
            let expanded = if path_str.starts_with('~') {
                if let Some(home) = dirs::home_dir() {
                    path_str.replacen('~', &home.display().to_string(), 1)
                } else {
                    path_str.clone()
                }
            } else {
                path_str.clone()
            };

            let path = Path::new(&expanded);
            if path.exists() {
                match dotenvy::from_path(path) {
                    Ok(()) => {
                        tracing::info!("Loaded env file: {expanded}");
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load env file {expanded}: {e}");
                    }
                }
            } else {
                tracing::debug!("Env file not found (skipped): {expanded}");
            }
        }

        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded {}", path.display());
        }
    }

    /// Expand ${VAR} and ${VAR:-default} patterns in provider overrides
    fn expand_env_vars(&mut self) {
        let Ok(re) = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}") else {
            return;
        };

        for provider in &mut self.reasoning.providers {
            if let Some(url) = provider.base_url_override.as_mut() {
                *url = Self::expand_string(&re, url);
            }
            if let Some(model) = provider.model_override.as_mut() {
                *model = Self::expand_string(&re, model);
            }
        }
    }

    /// Expand environment variables in a string
    fn expand_string(re: &Regex, value: &str) -> String {
        re.replace_all(value, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default = caps.get(2).map_or("", |m| m.as_str());
            env::var(var_name).unwrap_or_else(|_| default.to_string())
        })
        .into_owned()
    }
}

/// Custom humantime serde module for Duration
pub mod humantime_serde {
    use std::time::Duration;

    use serde::{self, Deserialize, Deserializer, Serializer};

    /// Serialize Duration to human-readable string (e.g., "30s")
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the serializer fails.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}s", duration.as_secs()))
    }

    /// Deserialize human-readable duration string (e.g., "30s", "5m", "100ms")
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if the string cannot be parsed as a duration.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        // "ms" must be checked before "s"
        if let Some(ms) = s.strip_suffix("ms") {
            ms.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(serde::de::Error::custom)
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.parse::<u64>()
                .map(|m| Duration::from_secs(m * 60))
                .map_err(serde::de::Error::custom)
        } else {
            // Assume seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(serde::de::Error::custom)
        }
    }
}
