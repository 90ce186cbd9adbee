//! Capability selection policy
//!
//! Filters run in a fixed order:
//!
//! 1. denylist removal
//! 2. `block_destructive` removal
//! 3. allowlist forced inclusion (never of a destructive capability while
//!    `block_destructive` is set)
//! 4. `max_tools` truncation, dropping the lowest priority first
//!    (read > write > destructive, then discovery order)
//!
//! Allowlisted capabilities are never truncated, even when they alone exceed
//! `max_tools`. Filtering always yields a well-formed, possibly empty, list.

use std::collections::HashSet;

use adapter_core::{Capability, SafetyTier};
use tracing::{debug, info};

use crate::config::PolicyConfig;

/// Exact names plus `prefix*` patterns
#[derive(Debug, Default)]
struct NamePatterns {
    exact: HashSet<String>,
    prefixes: Vec<String>,
}

impl NamePatterns {
    fn compile(patterns: &[String]) -> Self {
        let mut compiled = Self::default();
        for pattern in patterns {
            let pattern = pattern.trim();
            if pattern.is_empty() {
                continue;
            }
            if let Some(prefix) = pattern.strip_suffix('*') {
                compiled.prefixes.push(prefix.to_string());
            } else {
                compiled.exact.insert(pattern.to_string());
            }
        }
        compiled
    }

    fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.prefixes.is_empty()
    }

    fn matches(&self, name: &str) -> bool {
        self.exact.contains(name) || self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }
}

/// Compiled policy for one run
#[derive(Debug)]
pub struct CapabilityPolicy {
    allow: NamePatterns,
    deny: NamePatterns,
    block_destructive: bool,
    max_tools: usize,
    allowlist_exclusive: bool,
}

impl CapabilityPolicy {
    /// Compile a policy from configuration.
    #[must_use]
    pub fn from_config(config: &PolicyConfig) -> Self {
        Self {
            allow: NamePatterns::compile(&config.allowlist),
            deny: NamePatterns::compile(&config.denylist),
            block_destructive: config.block_destructive,
            max_tools: config.max_tools,
            allowlist_exclusive: config.allowlist_exclusive,
        }
    }

    /// Whether a name is on the allowlist
    #[must_use]
    pub fn is_allowlisted(&self, name: &str) -> bool {
        self.allow.matches(name)
    }

    /// Filter finalized capabilities. Survivors keep their input order.
    #[must_use]
    pub fn apply(&self, capabilities: Vec<Capability>) -> Vec<Capability> {
        let total = capabilities.len();
        let mut kept = vec![true; total];
        let allowed: Vec<bool> = capabilities.iter().map(|c| self.allow.matches(&c.name)).collect();

        for (i, capability) in capabilities.iter().enumerate() {
            if self.deny.matches(&capability.name) {
                debug!(capability = %capability.name, "Removed by denylist");
                kept[i] = false;
            }
        }

        if self.block_destructive {
            for (i, capability) in capabilities.iter().enumerate() {
                if kept[i] && capability.tier == SafetyTier::Destructive {
                    debug!(capability = %capability.name, "Removed as destructive");
                    kept[i] = false;
                }
            }
        }

        for (i, capability) in capabilities.iter().enumerate() {
            if allowed[i] {
                let blocked = self.block_destructive && capability.tier == SafetyTier::Destructive;
                if !kept[i] && !blocked {
                    debug!(capability = %capability.name, "Re-added by allowlist");
                }
                kept[i] = !blocked;
            } else if self.allowlist_exclusive && !self.allow.is_empty() && kept[i] {
                debug!(capability = %capability.name, "Removed: not on exclusive allowlist");
                kept[i] = false;
            }
        }

        if self.max_tools > 0 {
            self.truncate(&capabilities, &allowed, &mut kept);
        }

        let result: Vec<Capability> = capabilities
            .into_iter()
            .zip(kept)
            .filter_map(|(c, keep)| keep.then_some(c))
            .collect();

        info!(
            input = total,
            output = result.len(),
            block_destructive = self.block_destructive,
            max_tools = self.max_tools,
            "Applied capability policy"
        );
        result
    }

    fn truncate(&self, capabilities: &[Capability], allowed: &[bool], kept: &mut [bool]) {
        let forced = (0..capabilities.len()).filter(|&i| kept[i] && allowed[i]).count();
        let mut candidates: Vec<usize> = (0..capabilities.len())
            .filter(|&i| kept[i] && !allowed[i])
            .collect();

        let capacity = self.max_tools.saturating_sub(forced);
        if candidates.len() <= capacity {
            return;
        }

        // Stable sort: equal tiers keep discovery order
        candidates.sort_by_key(|&i| capabilities[i].tier);
        for &i in &candidates[capacity..] {
            debug!(capability = %capabilities[i].name, tier = %capabilities[i].tier, "Truncated by max_tools");
            kept[i] = false;
        }
    }
}

/// Apply `config` to `capabilities`
#[must_use]
pub fn apply_policy(capabilities: Vec<Capability>, config: &PolicyConfig) -> Vec<Capability> {
    CapabilityPolicy::from_config(config).apply(capabilities)
}
