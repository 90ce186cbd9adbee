//! Capability names derived from method and path
//!
//! | Operation                      | Name                 |
//! |--------------------------------|----------------------|
//! | `GET /users`                   | `list_users`         |
//! | `GET /users/{id}`              | `get_user`           |
//! | `POST /users`                  | `create_user`        |
//! | `PATCH /users/{id}`            | `update_user`        |
//! | `DELETE /users/{id}`           | `delete_user`        |
//! | `POST /users/{id}/activate`    | `activate_user`      |
//! | `GET /users/{id}/orders`       | `list_user_orders`   |
//! | `GET /items` (merged variants) | `search_items`       |

use std::collections::HashSet;

use adapter_core::{Capability, HttpMethod, PathTemplate, Segment, to_snake_case};
use tracing::debug;

/// Static segments that carry no meaning for naming
pub(crate) fn is_noise(segment: &str) -> bool {
    let lower = segment.to_ascii_lowercase();
    if matches!(lower.as_str(), "api" | "rest") {
        return true;
    }
    // Version prefixes: v1, v2, v1.1
    lower
        .strip_prefix('v')
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit() || c == '.'))
}

/// Naive English singular, good enough for REST collection names
pub(crate) fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{stem}y");
        }
    }
    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_string();
    }
    for suffix in ["sses", "ches", "shes", "xes", "zzes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    word.strip_suffix('s')
        .filter(|stem| !stem.is_empty())
        .unwrap_or(word)
        .to_string()
}

/// Meaningful static segments, each paired with whether a placeholder follows it
fn resource_segments(template: &PathTemplate) -> Vec<(String, bool)> {
    let segments = template.segments();
    let mut out = Vec::new();
    for (i, segment) in segments.iter().enumerate() {
        let Segment::Static(text) = segment else {
            continue;
        };
        if is_noise(text) {
            continue;
        }
        let word = to_snake_case(text);
        if word.is_empty() {
            continue;
        }
        let followed_by_param = matches!(
            segments.get(i + 1),
            Some(Segment::Param(_) | Segment::Mixed { .. })
        );
        out.push((word, followed_by_param));
    }
    out
}

/// Derive the capability name for one operation, or for a merged search
/// cluster when `search` is set.
pub(crate) fn capability_name(
    method: HttpMethod,
    template: &PathTemplate,
    operation_id: &str,
    search: bool,
) -> String {
    let resources = resource_segments(template);
    let Some((last, _)) = resources.last() else {
        let fallback = to_snake_case(operation_id);
        return if fallback.is_empty() {
            format!("{}_root", method.as_str().to_ascii_lowercase())
        } else {
            fallback
        };
    };

    let item = template.ends_with_param();
    let last_is_static = matches!(template.segments().last(), Some(Segment::Static(_)));

    // POST /users/{id}/activate: an action on a specific resource
    if method == HttpMethod::Post && last_is_static && resources.len() >= 2 {
        let (owner, owner_has_id) = &resources[resources.len() - 2];
        if *owner_has_id {
            let parents: Vec<String> = resources[..resources.len() - 2]
                .iter()
                .map(|(w, _)| singularize(w))
                .collect();
            let mut parts = vec![last.clone()];
            parts.extend(parents);
            parts.push(singularize(owner));
            return parts.join("_");
        }
    }

    let parents: Vec<String> = resources[..resources.len() - 1]
        .iter()
        .map(|(w, _)| singularize(w))
        .collect();
    let join = |verb: &str, noun: String| {
        let mut parts = vec![verb.to_string()];
        parts.extend(parents.iter().cloned());
        parts.push(noun);
        parts.join("_")
    };

    match method {
        HttpMethod::Get if search => join("search", last.clone()),
        HttpMethod::Get if item => join("get", singularize(last)),
        HttpMethod::Get => join("list", last.clone()),
        HttpMethod::Post if item => join("update", singularize(last)),
        HttpMethod::Post => join("create", singularize(last)),
        HttpMethod::Put | HttpMethod::Patch => join("update", singularize(last)),
        HttpMethod::Delete => join("delete", singularize(last)),
        HttpMethod::Head => join("check", singularize(last)),
        HttpMethod::Options => join("options", last.clone()),
    }
}

/// `search_user_orders` -> `Search user orders`
pub(crate) fn sentence(name: &str) -> String {
    let words = name.split('_').filter(|w| !w.is_empty()).collect::<Vec<_>>().join(" ");
    let mut chars = words.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Suffix duplicate names with `_2`, `_3`, … in discovery order.
///
/// Idempotent: a set of already-unique names is left untouched.
pub fn ensure_unique_names(capabilities: &mut [Capability]) {
    let mut taken: HashSet<String> = HashSet::with_capacity(capabilities.len());
    for capability in capabilities.iter_mut() {
        if taken.insert(capability.name.clone()) {
            continue;
        }
        let base = capability.name.clone();
        let mut n = 2;
        while taken.contains(&format!("{base}_{n}")) {
            n += 1;
        }
        let renamed = format!("{base}_{n}");
        debug!(from = %base, to = %renamed, "Resolved duplicate capability name");
        taken.insert(renamed.clone());
        capability.name = renamed;
    }
}
