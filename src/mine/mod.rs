//! Capability mining
//!
//! Groups operations by tag, merges filter-only GET variants into search
//! capabilities and names the result. Mining is deterministic: the same
//! [`Api`] always yields the same ids, names and tiers.

mod cluster;
mod naming;

pub use naming::ensure_unique_names;

use adapter_core::{
    Api, Capability, Operation, OperationRef, PathTemplate, Provenance, SafetyTier, to_snake_case,
};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::config::MiningConfig;
use cluster::Candidate;

/// Tag used when neither the operation nor its path offers one
const DEFAULT_TAG: &str = "default";

/// Introduces the filter list appended to search descriptions
pub const FILTERS_MARKER: &str = "Optional filters:";

/// Turn an [`Api`] into capabilities, in discovery order of their first
/// backing operation.
pub fn mine(api: &Api, config: &MiningConfig) -> Vec<Capability> {
    // (tag, candidates, discovery index of each candidate)
    let mut groups: Vec<(String, Vec<Candidate<'_>>, Vec<usize>)> = Vec::new();

    for (position, operation) in api.operations.iter().enumerate() {
        let template = match PathTemplate::parse(&operation.path) {
            Ok(t) => t,
            Err(e) => {
                warn!(
                    operation = %operation.id,
                    path = %operation.path,
                    error = %e,
                    "Skipping operation with unparseable path template"
                );
                continue;
            }
        };

        let tag = group_tag(operation, &template);
        let candidate = Candidate { operation, template };
        match groups.iter_mut().find(|(t, _, _)| *t == tag) {
            Some((_, members, positions)) => {
                members.push(candidate);
                positions.push(position);
            }
            None => groups.push((tag, vec![candidate], vec![position])),
        }
    }

    let mut mined: Vec<(usize, Capability)> = Vec::new();
    for (tag, candidates, positions) in &groups {
        for members in cluster::cluster(candidates, config.cluster_searches, config.tie_break) {
            let first = members[0];
            let capability = build_capability(tag, &members, candidates);
            mined.push((positions[first], capability));
        }
    }
    mined.sort_by_key(|(position, _)| *position);

    let mut capabilities: Vec<Capability> = mined.into_iter().map(|(_, c)| c).collect();
    ensure_unique_names(&mut capabilities);

    info!(
        operations = api.operations.len(),
        groups = groups.len(),
        capabilities = capabilities.len(),
        "Mined capabilities"
    );
    capabilities
}

/// Operation tag in `snake_case`, else the first meaningful path segment
fn group_tag(operation: &Operation, template: &PathTemplate) -> String {
    operation
        .tag
        .as_deref()
        .map(to_snake_case)
        .filter(|t| !t.is_empty())
        .or_else(|| {
            template
                .static_segments()
                .into_iter()
                .find(|s| !naming::is_noise(s))
                .map(to_snake_case)
                .filter(|t| !t.is_empty())
        })
        .unwrap_or_else(|| DEFAULT_TAG.to_string())
}

fn build_capability(tag: &str, members: &[usize], candidates: &[Candidate<'_>]) -> Capability {
    let lead = &candidates[members[0]];
    let operations: Vec<&Operation> = members.iter().map(|m| candidates[*m].operation).collect();
    let search = operations.len() > 1;

    let name = naming::capability_name(
        lead.operation.method,
        &lead.template,
        &lead.operation.id,
        search,
    );

    let (parameters, description) = if search {
        let parameters = cluster::merge_parameters(&operations);
        let filters: Vec<&str> = parameters
            .iter()
            .filter(|p| p.is_optional_filter())
            .map(|p| p.name.as_str())
            .collect();
        let lead_text = if lead.operation.has_text() {
            lead.operation.display_text()
        } else {
            naming::sentence(&name)
        };
        let description = if filters.is_empty() {
            lead_text
        } else {
            format!(
                "{}. {FILTERS_MARKER} {}.",
                lead_text.trim_end_matches('.'),
                filters.join(", ")
            )
        };
        (parameters, description)
    } else {
        (lead.operation.parameters.clone(), lead.operation.display_text())
    };

    let tier = operations
        .iter()
        .map(|op| SafetyTier::from_method(op.method))
        .max()
        .unwrap_or_default();

    Capability {
        id: stable_id(tag, if search { "search" } else { "single" }, &operations),
        name,
        description,
        tag: tag.to_string(),
        tier,
        baseline_tier: tier,
        operations: operations
            .iter()
            .map(|op| OperationRef {
                id: op.id.clone(),
                method: op.method,
                path: op.path.clone(),
            })
            .collect(),
        parameters,
        redactions: std::collections::BTreeSet::new(),
        provenance: Provenance::Heuristic,
        safety_hint: None,
    }
}

/// `cap_` + 16 hex chars of SHA-256 over the grouping key
fn stable_id(tag: &str, kind: &str, operations: &[&Operation]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tag.as_bytes());
    hasher.update([0x1f]);
    hasher.update(kind.as_bytes());
    for op in operations {
        hasher.update([0x1f]);
        hasher.update(op.id.as_bytes());
    }
    let digest = hasher.finalize();
    format!("cap_{}", hex::encode(&digest[..8]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapter_core::{HttpMethod, ParamLocation, ParamType, Parameter};
    use pretty_assertions::assert_eq;

    fn op(id: &str, method: HttpMethod, path: &str, tag: Option<&str>) -> Operation {
        let mut op = Operation::new(id, method, path);
        op.tag = tag.map(str::to_string);
        op
    }

    fn query(name: &str) -> Parameter {
        Parameter::new(name, ParamLocation::Query, ParamType::String)
    }

    fn api(operations: Vec<Operation>) -> Api {
        let mut api = Api::new("Shop", "1.0", "https://shop.test");
        for o in operations {
            api.push_operation(o);
        }
        api
    }

    fn items_api() -> Api {
        let mut by_color = op("byColor", HttpMethod::Get, "/items", Some("items"));
        by_color.parameters = vec![query("color")];
        let mut by_size = op("bySize", HttpMethod::Get, "/items", Some("items"));
        by_size.parameters = vec![query("size")];
        let mut delete = op("deleteItem", HttpMethod::Delete, "/items/{id}", Some("items"));
        delete.parameters = vec![Parameter::new("id", ParamLocation::Path, ParamType::String)];
        let activate = op("activate", HttpMethod::Post, "/users/{id}/activate", Some("Users"));
        api(vec![by_color, by_size, delete, activate])
    }

    #[test]
    fn filter_variants_merge_into_search() {
        let caps = mine(&items_api(), &MiningConfig::default());
        assert_eq!(caps.len(), 3);

        let search = &caps[0];
        assert_eq!(search.name, "search_items");
        assert_eq!(search.operations.len(), 2);
        assert_eq!(search.parameters.len(), 2);
        assert!(search.parameters.iter().all(|p| !p.required));
        assert_eq!(search.description, "Search items. Optional filters: color, size.");
        assert_eq!(search.tier, SafetyTier::Read);
    }

    #[test]
    fn search_description_prefers_lead_summary() {
        let mut api = items_api();
        api.operations[0].summary = Some("Browse the catalog.".into());
        let caps = mine(&api, &MiningConfig::default());
        assert_eq!(
            caps[0].description,
            "Browse the catalog. Optional filters: color, size."
        );
    }

    #[test]
    fn non_get_operations_are_singletons() {
        let caps = mine(&items_api(), &MiningConfig::default());
        assert_eq!(caps[1].name, "delete_item");
        assert_eq!(caps[1].baseline_tier, SafetyTier::Destructive);
        assert_eq!(caps[2].name, "activate_user");
        assert_eq!(caps[2].tag, "users");
    }

    #[test]
    fn mining_is_deterministic() {
        let api = items_api();
        let first = mine(&api, &MiningConfig::default());
        let second = mine(&api, &MiningConfig::default());
        assert_eq!(first, second);
        assert!(first.iter().all(|c| c.id.starts_with("cap_") && c.id.len() == 20));
        let ids: std::collections::HashSet<_> = first.iter().map(|c| &c.id).collect();
        assert_eq!(ids.len(), first.len());
    }

    #[test]
    fn clustering_can_be_disabled() {
        let config = MiningConfig {
            cluster_searches: false,
            ..MiningConfig::default()
        };
        let caps = mine(&items_api(), &config);
        assert_eq!(caps.len(), 4);
        assert_eq!(caps[0].name, "list_items");
        assert_eq!(caps[1].name, "list_items_2");
    }

    #[test]
    fn tag_falls_back_to_first_path_segment() {
        let caps = mine(
            &api(vec![op("x", HttpMethod::Get, "/api/v1/orders/{id}", None)]),
            &MiningConfig::default(),
        );
        assert_eq!(caps[0].tag, "orders");
        assert_eq!(caps[0].name, "get_order");
    }

    #[test]
    fn unparseable_paths_are_skipped() {
        let mut broken = api(vec![op("ok", HttpMethod::Get, "/ok", None)]);
        broken
            .operations
            .push(op("bad", HttpMethod::Get, "/bad/{id", None));
        let caps = mine(&broken, &MiningConfig::default());
        assert_eq!(caps.len(), 1);
        assert_eq!(caps[0].operations[0].id, "ok");
    }

    #[test]
    fn duplicate_names_get_suffixes() {
        let caps = mine(
            &api(vec![
                op("a", HttpMethod::Get, "/v1/users", Some("a")),
                op("b", HttpMethod::Get, "/v2/users", Some("b")),
                op("c", HttpMethod::Get, "/users", Some("c")),
            ]),
            &MiningConfig::default(),
        );
        let names: Vec<_> = caps.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["list_users", "list_users_2", "list_users_3"]);
    }
}
