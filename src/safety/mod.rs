//! Safety classification
//!
//! The classifier runs twice per pipeline run:
//!
//! 1. **Baseline**, right after mining. Records `baseline_tier`, which gates
//!    what the reasoning enhancer may touch.
//! 2. **Final**, after any enhancement. Re-derives tier and redactions from the
//!    (possibly edited) name and description and never lets the result drop
//!    below the baseline.
//!
//! Tiers come from HTTP methods (`GET`/`HEAD` read, `POST`/`PUT`/`PATCH`
//! write, `DELETE` destructive) and are escalated by destructive keywords.
//! Escalation only ever raises severity.

mod keywords;

use std::collections::BTreeSet;

use adapter_core::{Capability, SafetyTier};
use tracing::{debug, info};

use crate::config::{HintMode, SafetyConfig};
use crate::mine::FILTERS_MARKER;
use keywords::{DESTRUCTIVE_KEYWORDS, SENSITIVE_TERMS, SENSITIVE_TOKENS};

/// Appended once to the description of every redacted parameter
pub const REDACTION_NOTE: &str = "(sensitive: redacted from examples)";

/// Deterministic classifier built from the fixed vocabularies plus configured extras
#[derive(Debug, Clone)]
pub struct Classifier {
    destructive: Vec<String>,
    sensitive: Vec<String>,
    hint_mode: HintMode,
}

impl Classifier {
    /// Build a classifier
    #[must_use]
    pub fn new(config: &SafetyConfig) -> Self {
        let destructive = DESTRUCTIVE_KEYWORDS
            .iter()
            .map(|k| (*k).to_string())
            .chain(config.extra_destructive_keywords.iter().map(|k| k.to_lowercase()))
            .collect();
        let sensitive = SENSITIVE_TERMS
            .iter()
            .map(|t| (*t).to_string())
            .chain(config.extra_sensitive_fields.iter().map(|f| keywords::squash(f)))
            .filter(|t| !t.is_empty())
            .collect();
        Self {
            destructive,
            sensitive,
            hint_mode: config.hint_mode,
        }
    }

    /// Tier and redaction set for a capability, from its backing methods,
    /// name, description, paths and parameter names. Pure.
    #[must_use]
    pub fn classify(&self, capability: &Capability) -> (SafetyTier, BTreeSet<String>) {
        let method_tier = capability
            .operations
            .iter()
            .map(|op| SafetyTier::from_method(op.method))
            .max()
            .unwrap_or_default();

        let tier = if method_tier < SafetyTier::Destructive && self.mentions_destruction(capability) {
            SafetyTier::Destructive
        } else {
            method_tier
        };

        let redactions = capability
            .parameters
            .iter()
            .filter(|p| self.is_sensitive(&p.name))
            .map(|p| p.name.clone())
            .collect();

        (tier, redactions)
    }

    /// Whether a field name belongs to the sensitive vocabulary
    #[must_use]
    pub fn is_sensitive(&self, name: &str) -> bool {
        let squashed = keywords::squash(name);
        self.sensitive.iter().any(|term| squashed.contains(term.as_str()))
            || keywords::tokens(name).any(|t| SENSITIVE_TOKENS.contains(&t.as_str()))
    }

    fn mentions_destruction(&self, capability: &Capability) -> bool {
        // Filter names listed after the marker describe inputs, not the action
        let description = capability
            .description
            .split(FILTERS_MARKER)
            .next()
            .unwrap_or_default();
        let texts = [capability.name.as_str(), description]
            .into_iter()
            .chain(capability.operations.iter().map(|op| op.path.as_str()));

        for text in texts {
            for token in keywords::tokens(text) {
                if let Some(keyword) = self
                    .destructive
                    .iter()
                    .find(|k| keywords::matches_keyword(&token, k))
                {
                    debug!(
                        capability = %capability.name,
                        keyword = %keyword,
                        token = %token,
                        "Destructive keyword escalation"
                    );
                    return true;
                }
            }
        }
        false
    }

    /// First pass: fix `tier`, `baseline_tier` and redactions
    pub fn apply_baseline(&self, capabilities: &mut [Capability]) {
        for capability in capabilities.iter_mut() {
            let (tier, redactions) = self.classify(capability);
            capability.tier = tier;
            capability.baseline_tier = tier;
            capability.redactions = redactions;
            annotate_redactions(capability);
        }
        log_summary("baseline", capabilities);
    }

    /// Final, authoritative pass. The resulting tier is never below
    /// `baseline_tier`; redactions found in either pass are kept.
    pub fn apply_final(&self, capabilities: &mut [Capability]) {
        for capability in capabilities.iter_mut() {
            let (derived, redactions) = self.classify(capability);
            let mut tier = derived.max(capability.baseline_tier);

            if let Some(hint) = capability.safety_hint {
                match self.hint_mode {
                    HintMode::Escalate if hint > tier => {
                        debug!(capability = %capability.name, from = %tier, to = %hint, "Escalated by safety hint");
                        tier = hint;
                    }
                    _ if hint < tier => {
                        debug!(capability = %capability.name, hint = %hint, tier = %tier, "Ignoring lower safety hint");
                    }
                    _ => {}
                }
            }

            capability.tier = tier;
            capability.redactions.extend(redactions);
            annotate_redactions(capability);
        }
        log_summary("final", capabilities);
    }
}

/// Classify one capability with a throwaway [`Classifier`]
#[must_use]
pub fn classify(capability: &Capability, config: &SafetyConfig) -> (SafetyTier, BTreeSet<String>) {
    Classifier::new(config).classify(capability)
}

/// Append [`REDACTION_NOTE`] to each redacted parameter's description, once
fn annotate_redactions(capability: &mut Capability) {
    let Capability {
        parameters,
        redactions,
        ..
    } = capability;
    for param in parameters.iter_mut().filter(|p| redactions.contains(&p.name)) {
        if param.description.contains(REDACTION_NOTE) {
            continue;
        }
        if param.description.is_empty() {
            param.description = REDACTION_NOTE.to_string();
        } else {
            param.description = format!("{} {REDACTION_NOTE}", param.description.trim_end());
        }
    }
}

fn log_summary(pass: &str, capabilities: &[Capability]) {
    let count = |tier| capabilities.iter().filter(|c| c.tier == tier).count();
    info!(
        pass,
        read = count(SafetyTier::Read),
        write = count(SafetyTier::Write),
        destructive = count(SafetyTier::Destructive),
        redacted_params = capabilities.iter().map(|c| c.redactions.len()).sum::<usize>(),
        "Classified capabilities"
    );
}
