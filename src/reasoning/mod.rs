//! Reasoning enhancer
//!
//! Sends one batch describing every eligible capability to a chain of
//! providers and applies the first well-formed reply. Providers are tried
//! strictly in order; a timeout, network error, auth failure or malformed
//! reply moves on to the next one. When the whole chain fails the
//! capabilities are left exactly as they were.
//!
//! Edits are validated against the batch in full before any capability is
//! touched, so an abandoned or rejected call never leaves the list half
//! edited. Safety hints are stored on the capability and judged later by the
//! final classifier pass.

mod http;
mod prompt;

pub use http::HttpReasoningProvider;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use adapter_core::{Capability, ParamLocation, ParamType, Provenance, SafetyTier, to_snake_case};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ProviderError;
use crate::config::ReasoningConfig;

// ============================================================================
// Wire types
// ============================================================================

/// Batch sent to a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementRequest {
    /// Capabilities the provider may edit
    pub capabilities: Vec<CapabilitySummary>,
}

/// What a provider sees of one capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilitySummary {
    /// Capability id; replies must echo it
    pub id: String,
    /// Current name
    pub name: String,
    /// Current description
    pub description: String,
    /// Current tier
    pub tier: SafetyTier,
    /// Parameters
    pub parameters: Vec<ParameterSummary>,
}

/// What a provider sees of one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSummary {
    /// Name
    pub name: String,
    /// Location
    #[serde(rename = "in")]
    pub location: ParamLocation,
    /// Type
    #[serde(rename = "type")]
    pub param_type: ParamType,
    /// Required flag
    pub required: bool,
    /// Current description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl EnhancementRequest {
    /// Batch of every capability whose baseline tier is at most `max_tier`
    #[must_use]
    pub fn from_capabilities(capabilities: &[Capability], max_tier: SafetyTier) -> Self {
        let capabilities = capabilities
            .iter()
            .filter(|c| c.baseline_tier <= max_tier)
            .map(|c| CapabilitySummary {
                id: c.id.clone(),
                name: c.name.clone(),
                description: c.description.clone(),
                tier: c.tier,
                parameters: c
                    .parameters
                    .iter()
                    .map(|p| ParameterSummary {
                        name: p.name.clone(),
                        location: p.location,
                        param_type: p.param_type,
                        required: p.required,
                        description: p.description.clone(),
                    })
                    .collect(),
            })
            .collect();
        Self { capabilities }
    }
}

/// A provider's reply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnhancementResponse {
    /// Edits keyed by capability id
    pub capabilities: Vec<CapabilityEdit>,
}

/// Suggested changes to one capability
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityEdit {
    /// Id of the capability being edited
    pub id: String,
    /// New name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New parameter descriptions by parameter name
    #[serde(default, alias = "parameter_docs", skip_serializing_if = "Option::is_none")]
    pub parameter_docs: Option<BTreeMap<String, String>>,
    /// Suggested tier (never authoritative)
    #[serde(default, alias = "safety_hint", skip_serializing_if = "Option::is_none")]
    pub safety_hint: Option<String>,
}

// ============================================================================
// Provider trait
// ============================================================================

/// One link in the fallback chain
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Improve a batch of capabilities
    async fn enhance(&self, request: &EnhancementRequest) -> Result<EnhancementResponse, ProviderError>;
}

// ============================================================================
// Enhancer
// ============================================================================

/// Result of an enhancement run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnhancementReport {
    /// Provider whose reply was applied, if any
    pub provider: Option<String>,
    /// Capabilities marked `ai-enhanced`
    pub edited: usize,
    /// `(provider, error)` for every failed attempt, in order
    pub failures: Vec<(String, ProviderError)>,
}

/// Drives the provider chain
pub struct Enhancer {
    providers: Vec<Arc<dyn ReasoningProvider>>,
    timeout: Duration,
    max_editable_tier: SafetyTier,
}

impl Enhancer {
    /// Chain over explicit providers
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn ReasoningProvider>>, timeout: Duration) -> Self {
        Self {
            providers,
            timeout,
            max_editable_tier: SafetyTier::Destructive,
        }
    }

    /// Only capabilities with a baseline tier up to `tier` are sent
    #[must_use]
    pub fn with_max_editable_tier(mut self, tier: SafetyTier) -> Self {
        self.max_editable_tier = tier;
        self
    }

    /// Chain of HTTP providers from configuration. Providers whose client
    /// cannot be built are skipped.
    #[must_use]
    pub fn from_config(config: &ReasoningConfig) -> Self {
        let providers = config
            .providers
            .iter()
            .filter_map(|p| match HttpReasoningProvider::from_config(p, config.timeout) {
                Ok(provider) => Some(Arc::new(provider) as Arc<dyn ReasoningProvider>),
                Err(e) => {
                    warn!(provider = %p.name, error = %e, "Skipping reasoning provider");
                    None
                }
            })
            .collect();
        Self::new(providers, config.timeout).with_max_editable_tier(config.max_editable_tier)
    }

    /// Names of the configured providers, in priority order
    #[must_use]
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Run the chain over `capabilities`, editing them in place on success.
    ///
    /// Never fails: when every provider fails the input is left untouched.
    pub async fn enhance(&self, capabilities: &mut [Capability]) -> EnhancementReport {
        let mut report = EnhancementReport::default();
        let request = EnhancementRequest::from_capabilities(capabilities, self.max_editable_tier);
        if request.capabilities.is_empty() {
            info!("No capabilities eligible for enhancement");
            return report;
        }

        for provider in &self.providers {
            let name = provider.name().to_string();
            let outcome = match tokio::time::timeout(self.timeout, provider.enhance(&request)).await {
                Ok(result) => result.and_then(|response| validate(&request, response)),
                Err(_) => Err(ProviderError::Timeout(self.timeout)),
            };

            match outcome {
                Ok(edits) => {
                    report.edited = apply(capabilities, &edits);
                    info!(
                        provider = %name,
                        batch = request.capabilities.len(),
                        edited = report.edited,
                        "Applied reasoning provider edits"
                    );
                    report.provider = Some(name);
                    return report;
                }
                Err(e) => {
                    warn!(provider = %name, error = %e, "Reasoning provider failed, trying next");
                    report.failures.push((name, e));
                }
            }
        }

        warn!(
            attempted = report.failures.len(),
            "All reasoning providers failed; keeping heuristic names and descriptions"
        );
        report
    }
}

/// An edit that passed validation
#[derive(Debug)]
struct ValidEdit {
    id: String,
    name: Option<String>,
    description: Option<String>,
    parameter_docs: BTreeMap<String, String>,
    safety_hint: Option<SafetyTier>,
}

/// Check a whole reply before anything is applied.
///
/// Unknown ids and repeated ids are dropped; an edit whose name normalizes to
/// nothing or whose hint is not a tier rejects the entire reply.
fn validate(request: &EnhancementRequest, response: EnhancementResponse) -> Result<Vec<ValidEdit>, ProviderError> {
    let known: HashSet<&str> = request.capabilities.iter().map(|c| c.id.as_str()).collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut edits = Vec::new();

    for edit in response.capabilities {
        if !known.contains(edit.id.as_str()) {
            debug!(id = %edit.id, "Ignoring edit for unknown capability");
            continue;
        }
        if !seen.insert(edit.id.clone()) {
            debug!(id = %edit.id, "Ignoring repeated edit");
            continue;
        }

        let name = match edit.name.as_deref() {
            None => None,
            Some(raw) => {
                let normalized = to_snake_case(raw);
                if normalized.is_empty() {
                    return Err(ProviderError::MalformedResponse(format!(
                        "edit for {} has an unusable name {raw:?}",
                        edit.id
                    )));
                }
                Some(normalized)
            }
        };

        let safety_hint = match edit.safety_hint.as_deref() {
            None => None,
            Some(raw) => Some(SafetyTier::parse(raw).ok_or_else(|| {
                ProviderError::MalformedResponse(format!("edit for {} has unknown safety hint {raw:?}", edit.id))
            })?),
        };

        edits.push(ValidEdit {
            id: edit.id,
            name,
            description: edit
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            parameter_docs: edit.parameter_docs.unwrap_or_default(),
            safety_hint,
        });
    }

    Ok(edits)
}

/// Apply validated edits; returns how many capabilities changed
fn apply(capabilities: &mut [Capability], edits: &[ValidEdit]) -> usize {
    let mut edited = 0;
    for edit in edits {
        let Some(capability) = capabilities.iter_mut().find(|c| c.id == edit.id) else {
            continue;
        };
        let mut changed = false;

        if let Some(name) = &edit.name {
            if *name != capability.name {
                debug!(id = %capability.id, from = %capability.name, to = %name, "Renamed capability");
                capability.name.clone_from(name);
            }
            changed = true;
        }
        if let Some(description) = &edit.description {
            capability.description.clone_from(description);
            changed = true;
        }
        for (param_name, doc) in &edit.parameter_docs {
            let doc = doc.trim();
            if doc.is_empty() {
                continue;
            }
            if let Some(param) = capability.parameters.iter_mut().find(|p| p.name == *param_name) {
                param.description = doc.to_string();
                changed = true;
            }
        }
        if let Some(hint) = edit.safety_hint {
            capability.safety_hint = Some(hint);
            changed = true;
        }

        if changed {
            capability.provenance = Provenance::AiEnhanced;
            edited += 1;
        }
    }
    edited
}
