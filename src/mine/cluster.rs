//! Search clustering
//!
//! GET operations in the same group whose templates share a shape and whose
//! parameters differ only in optional query filters are merged into a single
//! search capability.

use std::collections::HashMap;

use adapter_core::{HttpMethod, Operation, Parameter, PathTemplate};
use tracing::debug;

use crate::config::TieBreak;

/// An operation with its parsed template
pub(crate) struct Candidate<'a> {
    pub(crate) operation: &'a Operation,
    pub(crate) template: PathTemplate,
}

/// Whether two GET operations may be served by one capability
pub(crate) fn compatible(a: &Candidate<'_>, b: &Candidate<'_>) -> bool {
    if a.template.shape() != b.template.shape() {
        return false;
    }

    let a_params: HashMap<&str, &Parameter> = a
        .operation
        .parameters
        .iter()
        .map(|p| (p.name.as_str(), p))
        .collect();
    let b_params: HashMap<&str, &Parameter> = b
        .operation
        .parameters
        .iter()
        .map(|p| (p.name.as_str(), p))
        .collect();

    let one_sided_ok = |from: &HashMap<&str, &Parameter>, other: &HashMap<&str, &Parameter>| {
        from.iter().all(|(name, param)| match other.get(name) {
            Some(shared) => shared.location == param.location,
            None => param.is_optional_filter(),
        })
    };

    one_sided_ok(&a_params, &b_params) && one_sided_ok(&b_params, &a_params)
}

/// Partition a group's candidates (given in discovery order) into clusters.
///
/// Returns candidate indices; every index appears in exactly one cluster, and
/// clusters are ordered by their first member.
pub(crate) fn cluster(candidates: &[Candidate<'_>], enabled: bool, tie_break: TieBreak) -> Vec<Vec<usize>> {
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    // Parallel to `clusters`: only GET clusters accept new members
    let mut open: Vec<bool> = Vec::new();

    for (index, candidate) in candidates.iter().enumerate() {
        let is_get = candidate.operation.method == HttpMethod::Get;
        if !enabled || !is_get {
            clusters.push(vec![index]);
            open.push(false);
            continue;
        }

        let fits = clusters
            .iter()
            .enumerate()
            .filter(|(i, members)| {
                open[*i] && members.iter().all(|m| compatible(&candidates[*m], candidate))
            })
            .map(|(i, members)| (i, members.len()));

        let chosen = match tie_break {
            // max_by_key keeps the last maximum; reverse the index to prefer the earliest
            TieBreak::LargestFirst => fits
                .max_by_key(|(i, len)| (*len, std::cmp::Reverse(*i)))
                .map(|(i, _)| i),
            TieBreak::FirstDiscovered => fits.map(|(i, _)| i).next(),
        };

        match chosen {
            Some(i) => {
                debug!(
                    operation = %candidate.operation.id,
                    with = %candidates[clusters[i][0]].operation.id,
                    "Clustered GET variant"
                );
                clusters[i].push(index);
            }
            None => {
                clusters.push(vec![index]);
                open.push(true);
            }
        }
    }

    clusters
}

/// Union of member parameters in first-seen order. A parameter is required
/// only if every member requires it.
pub(crate) fn merge_parameters(members: &[&Operation]) -> Vec<Parameter> {
    let mut merged: Vec<Parameter> = Vec::new();
    for op in members {
        for param in &op.parameters {
            if !merged.iter().any(|m| m.name == param.name) {
                merged.push(param.clone());
            }
        }
    }

    for param in &mut merged {
        param.required = members.iter().all(|op| {
            op.parameters
                .iter()
                .any(|p| p.name == param.name && p.required)
        });
        if param.description.is_empty() {
            if let Some(described) = members
                .iter()
                .flat_map(|op| op.parameters.iter())
                .find(|p| p.name == param.name && !p.description.is_empty())
            {
                param.description.clone_from(&described.description);
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapter_core::{ParamLocation, ParamType};

    fn get(id: &str, path: &str, params: Vec<Parameter>) -> Operation {
        let mut op = Operation::new(id, HttpMethod::Get, path);
        op.parameters = params;
        op
    }

    fn query(name: &str) -> Parameter {
        Parameter::new(name, ParamLocation::Query, ParamType::String)
    }

    fn candidates(ops: &[Operation]) -> Vec<Candidate<'_>> {
        ops.iter()
            .map(|operation| Candidate {
                operation,
                template: PathTemplate::parse(&operation.path).unwrap(),
            })
            .collect()
    }

    #[test]
    fn filter_variants_are_compatible() {
        let ops = vec![
            get("a", "/items", vec![query("color")]),
            get("b", "/items", vec![query("size")]),
        ];
        let c = candidates(&ops);
        assert!(compatible(&c[0], &c[1]));
        assert_eq!(cluster(&c, true, TieBreak::LargestFirst), vec![vec![0, 1]]);
    }

    #[test]
    fn required_difference_blocks_clustering() {
        let ops = vec![
            get("a", "/items", vec![query("color").with_required(true)]),
            get("b", "/items", vec![query("size")]),
        ];
        let c = candidates(&ops);
        assert!(!compatible(&c[0], &c[1]));
    }

    #[test]
    fn different_shapes_never_cluster() {
        let ops = vec![get("a", "/items", vec![]), get("b", "/items/{id}", vec![])];
        let c = candidates(&ops);
        assert_eq!(cluster(&c, true, TieBreak::LargestFirst), vec![vec![0], vec![1]]);
    }

    #[test]
    fn disabled_clustering_keeps_singletons() {
        let ops = vec![get("a", "/items", vec![]), get("b", "/items", vec![query("q")])];
        let c = candidates(&ops);
        assert_eq!(cluster(&c, false, TieBreak::LargestFirst), vec![vec![0], vec![1]]);
    }

    #[test]
    fn non_get_operations_stay_alone() {
        let post = Operation::new("p", HttpMethod::Post, "/items");
        let ops = vec![get("a", "/items", vec![]), post];
        let c = candidates(&ops);
        assert_eq!(cluster(&c, true, TieBreak::LargestFirst), vec![vec![0], vec![1]]);
    }

    /// `d` fits both `{a}` and `{b, c}`, which are incompatible with each other
    fn ambiguous() -> Vec<Operation> {
        let required = |n: &str| query(n).with_required(true);
        vec![
            get("a", "/items", vec![required("x")]),
            get("b", "/items", vec![required("y")]),
            get("c", "/items", vec![required("y"), query("f")]),
            get("d", "/items", vec![query("x"), query("y")]),
        ]
    }

    #[test]
    fn tie_break_prefers_larger_cluster() {
        let ops = ambiguous();
        let c = candidates(&ops);
        assert_eq!(
            cluster(&c, true, TieBreak::LargestFirst),
            vec![vec![0], vec![1, 2, 3]]
        );
    }

    #[test]
    fn tie_break_first_discovered() {
        let ops = ambiguous();
        let c = candidates(&ops);
        assert_eq!(
            cluster(&c, true, TieBreak::FirstDiscovered),
            vec![vec![0, 3], vec![1, 2]]
        );
    }

    #[test]
    fn equal_sizes_fall_back_to_discovery_order() {
        let ops = vec![
            get("a", "/items", vec![query("x").with_required(true)]),
            get("b", "/items", vec![query("y").with_required(true)]),
            get("d", "/items", vec![query("x"), query("y")]),
        ];
        let c = candidates(&ops);
        assert_eq!(
            cluster(&c, true, TieBreak::LargestFirst),
            vec![vec![0, 2], vec![1]]
        );
    }

    #[test]
    fn merged_required_is_intersection() {
        let a = get("a", "/items", vec![query("color"), query("page").with_required(true)]);
        let b = get("b", "/items", vec![query("size"), query("page").with_required(true)]);
        let merged = merge_parameters(&[&a, &b]);
        let names: Vec<_> = merged.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["color", "page", "size"]);
        assert!(!merged[0].required);
        assert!(merged[1].required);
        assert!(!merged[2].required);
    }
}
