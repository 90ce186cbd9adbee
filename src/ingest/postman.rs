//! Postman Collection v2.1 parser
//!
//! Folders are flattened recursively; the innermost folder name becomes the
//! operation tag. `:id` and `{{id}}` path variables are normalized to `{id}`.

use adapter_core::{
    Api, AuthKind, AuthScheme, HttpMethod, Operation, ParamLocation, ParamType, Parameter,
    normalize_template, to_snake_case,
};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use super::{SpecFormat, accept_path, credential_env_var};
use crate::{Error, Result};

const FORMAT: &str = "Postman v2.1";

/// Headers that describe transport, not API inputs
const SKIPPED_HEADERS: &[&str] = &["content-type", "accept", "authorization"];

/// Collection variables consulted for the base URL
const BASE_URL_VARIABLES: &[&str] = &["baseUrl", "base_url", "baseURL", "url", "host"];

/// Postman Collection v2.1 format (detected by `info.schema`)
pub struct PostmanCollection;

#[derive(Debug, Deserialize)]
struct Collection {
    info: CollectionInfo,
    item: Vec<Value>,
    #[serde(default)]
    variable: Vec<KeyValue>,
    #[serde(default)]
    auth: Option<CollectionAuth>,
}

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    name: String,
    #[serde(default)]
    version: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    name: String,
    #[serde(default)]
    item: Option<Vec<Value>>,
    #[serde(default)]
    request: Option<RequestDef>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RequestDef {
    Url(String),
    Full(Request),
}

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    url: Option<UrlDef>,
    #[serde(default)]
    header: Vec<KeyValue>,
    #[serde(default)]
    body: Option<Body>,
    #[serde(default)]
    description: Option<Description>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UrlDef {
    Raw(String),
    Parts(UrlParts),
}

#[derive(Debug, Default, Deserialize)]
struct UrlParts {
    #[serde(default)]
    raw: Option<String>,
    #[serde(default)]
    protocol: Option<String>,
    #[serde(default)]
    host: Option<Joinable>,
    #[serde(default)]
    path: Option<Joinable>,
    #[serde(default)]
    query: Vec<KeyValue>,
    #[serde(default)]
    variable: Vec<KeyValue>,
}

/// `host` and `path` may be a string or a list of parts
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Joinable {
    Joined(String),
    Parts(Vec<Value>),
}

impl Joinable {
    fn parts(&self) -> Vec<String> {
        match self {
            Self::Joined(s) => vec![s.clone()],
            Self::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    Value::String(s) => Some(s.clone()),
                    Value::Object(o) => o.get("value").and_then(Value::as_str).map(str::to_string),
                    _ => None,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct KeyValue {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    disabled: bool,
    #[serde(default)]
    description: Option<Description>,
}

impl KeyValue {
    fn key(&self) -> Option<&str> {
        self.key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    /// Non-empty value, ignoring unresolved `{{variables}}`
    fn example(&self) -> Option<Value> {
        match &self.value {
            Some(Value::String(s)) if s.is_empty() || s.starts_with("{{") => None,
            Some(Value::Null) | None => None,
            Some(v) => Some(v.clone()),
        }
    }

    fn value_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(Value::as_str)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Description {
    Text(String),
    Rich {
        #[serde(default)]
        content: String,
    },
}

impl Description {
    fn text(&self) -> Option<String> {
        let s = match self {
            Self::Text(s) => s,
            Self::Rich { content } => content,
        };
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct Body {
    #[serde(default)]
    mode: String,
    #[serde(default)]
    raw: Option<String>,
    #[serde(default)]
    urlencoded: Vec<KeyValue>,
    #[serde(default)]
    formdata: Vec<KeyValue>,
}

#[derive(Debug, Deserialize)]
struct CollectionAuth {
    #[serde(rename = "type")]
    auth_type: String,
    #[serde(default)]
    apikey: Vec<KeyValue>,
}

impl SpecFormat for PostmanCollection {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn detect(&self, doc: &Value) -> bool {
        doc.pointer("/info/schema")
            .and_then(Value::as_str)
            .is_some_and(|s| s.contains("getpostman.com") && s.contains("/collection/v2"))
    }

    fn parse(&self, doc: &Value) -> Result<Api> {
        let collection: Collection = serde_json::from_value(doc.clone())
            .map_err(|e| Error::malformed(FORMAT, e.to_string()))?;

        let version = collection
            .info
            .version
            .as_ref()
            .and_then(version_string)
            .unwrap_or_else(|| "1.0.0".to_string());
        let default_tag = to_snake_case(&collection.info.name);

        let mut requests = Vec::new();
        flatten(&collection.item, None, &mut requests);

        let base_url = collection_base_url(&collection.variable)
            .or_else(|| requests.iter().find_map(|(_, _, r)| request_base_url(r, &collection.variable)))
            .unwrap_or_default();

        let mut api = Api::new(collection.info.name.clone(), version, base_url);
        for (name, folder, request) in &requests {
            let tag = folder.clone().unwrap_or_else(|| default_tag.clone());
            if let Some(op) = convert_request(name, tag, request) {
                api.push_operation(op);
            }
        }

        if let Some(auth) = &collection.auth {
            if let Some(scheme) = auth_scheme(&collection.info.name, auth) {
                api.auth_schemes.push(scheme);
            }
        }

        Ok(api)
    }
}

/// `info.version` may be a plain string or `{major, minor, patch}`
fn version_string(version: &Value) -> Option<String> {
    match version {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(parts) => {
            let part = |k: &str| parts.get(k).and_then(Value::as_u64).unwrap_or(0);
            Some(format!("{}.{}.{}", part("major"), part("minor"), part("patch")))
        }
        _ => None,
    }
}

/// Depth-first walk collecting `(request name, innermost folder, request)`
fn flatten(items: &[Value], folder: Option<&str>, out: &mut Vec<(String, Option<String>, Request)>) {
    for raw in items {
        let item: Item = match serde_json::from_value(raw.clone()) {
            Ok(item) => item,
            Err(e) => {
                warn!(error = %e, "Skipping collection item that cannot be normalized");
                continue;
            }
        };

        if let Some(children) = &item.item {
            let name = item.name.trim();
            let inner = if name.is_empty() { folder } else { Some(name) };
            flatten(children, inner, out);
            continue;
        }

        let request = match item.request {
            Some(RequestDef::Full(request)) => request,
            Some(RequestDef::Url(url)) => Request {
                method: None,
                url: Some(UrlDef::Raw(url)),
                header: Vec::new(),
                body: None,
                description: None,
            },
            None => {
                debug!(item = %item.name, "Item has neither children nor a request");
                continue;
            }
        };
        out.push((item.name, folder.map(str::to_string), request));
    }
}

fn collection_base_url(variables: &[KeyValue]) -> Option<String> {
    BASE_URL_VARIABLES.iter().find_map(|name| {
        variables
            .iter()
            .find(|v| v.key() == Some(*name))
            .and_then(KeyValue::value_str)
            .filter(|v| !v.is_empty())
            .map(|v| v.trim_end_matches('/').to_string())
    })
}

fn request_base_url(request: &Request, variables: &[KeyValue]) -> Option<String> {
    let url = request.url.as_ref()?;
    let (scheme, host) = match url {
        UrlDef::Raw(raw) => split_raw(raw).0,
        UrlDef::Parts(parts) => match &parts.host {
            Some(host) => (parts.protocol.clone(), Some(host.parts().join("."))),
            None => parts.raw.as_deref().map(|r| split_raw(r).0).unwrap_or_default(),
        },
    };
    let host = host.filter(|h| !h.is_empty())?;

    if let Some(var) = host.strip_prefix("{{").and_then(|h| h.strip_suffix("}}")) {
        return variables
            .iter()
            .find(|v| v.key() == Some(var))
            .and_then(KeyValue::value_str)
            .map(|v| v.trim_end_matches('/').to_string());
    }
    if host.contains("{{") {
        return None;
    }
    Some(format!("{}://{host}", scheme.as_deref().unwrap_or("https")))
}

/// Split a raw URL into `((scheme, host), path)`
fn split_raw(raw: &str) -> ((Option<String>, Option<String>), String) {
    let (scheme, rest) = match raw.split_once("://") {
        Some((scheme, rest)) => (Some(scheme.to_string()), rest),
        None => (None, raw),
    };
    if rest.starts_with('/') {
        return ((scheme, None), rest.to_string());
    }
    match rest.split_once('/') {
        Some((host, path)) => ((scheme, Some(host.to_string())), format!("/{path}")),
        None => {
            let host = rest.split(['?', '#']).next().unwrap_or_default();
            ((scheme, Some(host.to_string())), "/".to_string())
        }
    }
}

fn request_path(url: &UrlDef) -> String {
    let raw_path = match url {
        UrlDef::Raw(raw) => split_raw(raw).1,
        UrlDef::Parts(parts) => match &parts.path {
            Some(path) => format!("/{}", path.parts().join("/")),
            None => parts.raw.as_deref().map(|r| split_raw(r).1).unwrap_or_default(),
        },
    };
    normalize_template(&raw_path)
}

fn convert_request(name: &str, tag: String, request: &Request) -> Option<Operation> {
    let method_name = request.method.as_deref().unwrap_or("GET");
    let Some(method) = HttpMethod::parse(method_name) else {
        warn!(request = %name, method = %method_name, "Skipping request with unsupported method");
        return None;
    };
    let Some(url) = &request.url else {
        warn!(request = %name, "Skipping request without a URL");
        return None;
    };

    let path = request_path(url);
    let id = Some(to_snake_case(name))
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| to_snake_case(&format!("{method} {path}")));
    if !accept_path(&id, &path) {
        return None;
    }

    let mut operation = Operation::new(id, method, path.clone());
    operation.tag = Some(tag);
    operation.summary = Some(name.trim().to_string()).filter(|s| !s.is_empty());
    operation.description = request.description.as_ref().and_then(Description::text);

    let parts = match url {
        UrlDef::Parts(parts) => Some(parts),
        UrlDef::Raw(_) => None,
    };
    operation.parameters = path_parameters(&path, parts);

    if let Some(parts) = parts {
        for q in parts.query.iter().filter(|q| !q.disabled) {
            let Some(key) = q.key() else { continue };
            push_unique(&mut operation.parameters, simple_parameter(key, ParamLocation::Query, q));
        }
    } else if let UrlDef::Raw(raw) = url {
        for key in raw_query_keys(raw) {
            push_unique(
                &mut operation.parameters,
                Parameter::new(key, ParamLocation::Query, ParamType::String),
            );
        }
    }

    for h in request.header.iter().filter(|h| !h.disabled) {
        let Some(key) = h.key() else { continue };
        if SKIPPED_HEADERS.contains(&key.to_ascii_lowercase().as_str()) {
            continue;
        }
        push_unique(&mut operation.parameters, simple_parameter(key, ParamLocation::Header, h));
    }

    if let Some(body) = &request.body {
        let (fields, schema) = body_fields(body);
        for field in fields {
            push_unique(&mut operation.parameters, field);
        }
        operation.request_body = schema;
    }

    Some(operation)
}

fn path_parameters(path: &str, parts: Option<&UrlParts>) -> Vec<Parameter> {
    let Ok(template) = adapter_core::PathTemplate::parse(path) else {
        return Vec::new();
    };
    template
        .param_names()
        .into_iter()
        .map(|name| {
            let declared = parts.and_then(|p| p.variable.iter().find(|v| v.key() == Some(name)));
            let mut param = Parameter::new(name, ParamLocation::Path, ParamType::String);
            if let Some(var) = declared {
                if let Some(desc) = var.description.as_ref().and_then(Description::text) {
                    param.description = desc;
                }
                if let Some(example) = var.example() {
                    param.param_type = ParamType::from_value(&example);
                    param.example = Some(example);
                }
            }
            param
        })
        .collect()
}

fn simple_parameter(key: &str, location: ParamLocation, kv: &KeyValue) -> Parameter {
    let mut param = Parameter::new(key, location, ParamType::String).with_description(
        kv.description
            .as_ref()
            .and_then(Description::text)
            .unwrap_or_default(),
    );
    if let Some(example) = kv.example() {
        param = param.with_example(example);
    }
    param
}

fn raw_query_keys(raw: &str) -> Vec<String> {
    let Some((_, query)) = raw.split_once('?') else {
        return Vec::new();
    };
    query
        .split('#')
        .next()
        .unwrap_or_default()
        .split('&')
        .filter_map(|pair| pair.split('=').next())
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Body fields are never required: a collection records one example call,
/// not a contract.
fn body_fields(body: &Body) -> (Vec<Parameter>, Option<Value>) {
    match body.mode.as_str() {
        "raw" => {
            let Some(example) = body
                .raw
                .as_deref()
                .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
            else {
                return (Vec::new(), None);
            };
            match &example {
                Value::Object(fields) => {
                    let params = fields
                        .iter()
                        .map(|(k, v)| {
                            Parameter::new(k.clone(), ParamLocation::Body, ParamType::from_value(v))
                                .with_example(v.clone())
                        })
                        .collect::<Vec<_>>();
                    let schema = schema_from_params(&params);
                    (params, Some(schema))
                }
                other => {
                    let param = Parameter::new("body", ParamLocation::Body, ParamType::from_value(other))
                        .with_example(other.clone());
                    let schema = json!({"type": param.param_type.json_type()});
                    (vec![param], Some(schema))
                }
            }
        }
        "urlencoded" | "formdata" => {
            let entries = if body.mode == "urlencoded" { &body.urlencoded } else { &body.formdata };
            let params: Vec<Parameter> = entries
                .iter()
                .filter(|e| !e.disabled)
                .filter_map(|e| Some(simple_parameter(e.key()?, ParamLocation::Body, e)))
                .collect();
            let schema = (!params.is_empty()).then(|| schema_from_params(&params));
            (params, schema)
        }
        _ => (Vec::new(), None),
    }
}

fn schema_from_params(params: &[Parameter]) -> Value {
    let properties: Map<String, Value> = params
        .iter()
        .map(|p| (p.name.clone(), json!({"type": p.param_type.json_type()})))
        .collect();
    json!({"type": "object", "properties": properties})
}

fn push_unique(params: &mut Vec<Parameter>, param: Parameter) {
    if !params.iter().any(|p| p.name == param.name && p.location == param.location) {
        params.push(param);
    }
}

fn auth_scheme(title: &str, auth: &CollectionAuth) -> Option<AuthScheme> {
    let field = |name: &str| {
        auth.apikey
            .iter()
            .find(|kv| kv.key() == Some(name))
            .and_then(KeyValue::value_str)
            .map(str::to_string)
    };
    let (kind, suffix) = match auth.auth_type.as_str() {
        "noauth" => return None,
        "apikey" => (AuthKind::ApiKey, "API_KEY"),
        "bearer" | "jwt" => (AuthKind::Bearer, "TOKEN"),
        "basic" | "digest" => (AuthKind::Basic, "CREDENTIALS"),
        "oauth2" | "oauth1" => (AuthKind::OAuth2, "TOKEN"),
        _ => (AuthKind::Other, "TOKEN"),
    };
    let (location, param_name) = if kind == AuthKind::ApiKey {
        let location = match field("in").as_deref() {
            Some("query") => ParamLocation::Query,
            _ => ParamLocation::Header,
        };
        (Some(location), Some(field("key").unwrap_or_else(|| "X-API-Key".to_string())))
    } else {
        (None, None)
    };
    Some(AuthScheme {
        name: auth.auth_type.clone(),
        kind,
        location,
        param_name,
        env_var: credential_env_var(title, suffix),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SCHEMA: &str = "https://schema.getpostman.com/json/collection/v2.1.0/collection.json";

    fn collection() -> Value {
        json!({
            "info": {"name": "Users Service", "schema": SCHEMA},
            "variable": [{"key": "baseUrl", "value": "https://api.users.dev/"}],
            "auth": {"type": "bearer", "bearer": [{"key": "token", "value": "{{token}}"}]},
            "item": [
                {
                    "name": "Users",
                    "item": [
                        {
                            "name": "List users",
                            "request": {
                                "method": "GET",
                                "url": {
                                    "raw": "{{baseUrl}}/users?page=1",
                                    "host": ["{{baseUrl}}"],
                                    "path": ["users"],
                                    "query": [
                                        {"key": "page", "value": "1"},
                                        {"key": "debug", "value": "true", "disabled": true}
                                    ]
                                }
                            }
                        },
                        {
                            "name": "Delete user",
                            "request": {
                                "method": "DELETE",
                                "url": {
                                    "raw": "{{baseUrl}}/users/:id",
                                    "host": ["{{baseUrl}}"],
                                    "path": ["users", ":id"],
                                    "variable": [{"key": "id", "value": "42", "description": "User id"}]
                                }
                            }
                        },
                        {
                            "name": "Admin",
                            "item": [{
                                "name": "Create user",
                                "request": {
                                    "method": "POST",
                                    "header": [
                                        {"key": "Content-Type", "value": "application/json"},
                                        {"key": "X-Request-Id", "value": "abc"}
                                    ],
                                    "body": {"mode": "raw", "raw": "{\"email\": \"a@b.c\", \"password\": \"x\", \"age\": 3}"},
                                    "url": "{{baseUrl}}/users"
                                }
                            }]
                        }
                    ]
                },
                {"name": "Health", "request": "https://api.users.dev/health"}
            ]
        })
    }

    #[test]
    fn test_flattens_folders_in_order() {
        let api = PostmanCollection.parse(&collection()).unwrap();
        let ids: Vec<_> = api.operations.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["list_users", "delete_user", "create_user", "health"]);
        assert_eq!(api.operations[2].tag.as_deref(), Some("Admin"));
        assert_eq!(api.operations[3].tag.as_deref(), Some("users_service"));
        assert_eq!(api.version, "1.0.0");
    }

    #[test]
    fn test_base_url_from_collection_variable() {
        let api = PostmanCollection.parse(&collection()).unwrap();
        assert_eq!(api.base_url, "https://api.users.dev");
    }

    #[test]
    fn test_base_url_from_first_request_host() {
        let doc = json!({
            "info": {"name": "x", "schema": SCHEMA},
            "item": [{"name": "a", "request": {"method": "GET", "url": {
                "protocol": "http", "host": ["api", "example", "com"], "path": ["a"]
            }}}]
        });
        let api = PostmanCollection.parse(&doc).unwrap();
        assert_eq!(api.base_url, "http://api.example.com");
    }

    #[test]
    fn test_path_variables_are_normalized() {
        let api = PostmanCollection.parse(&collection()).unwrap();
        let delete = api.operation("delete_user").unwrap();
        assert_eq!(delete.path, "/users/{id}");
        assert_eq!(delete.method, HttpMethod::Delete);
        let id = delete.parameter("id").unwrap();
        assert!(id.required);
        assert_eq!(id.description, "User id");
        assert_eq!(id.example, Some(json!("42")));
    }

    #[test]
    fn test_query_and_headers() {
        let api = PostmanCollection.parse(&collection()).unwrap();
        let list = api.operation("list_users").unwrap();
        assert_eq!(list.parameters.len(), 1);
        assert!(!list.parameters[0].required);

        let create = api.operation("create_user").unwrap();
        assert!(create.parameter("Content-Type").is_none());
        assert_eq!(
            create.parameter("X-Request-Id").unwrap().location,
            ParamLocation::Header
        );
    }

    #[test]
    fn test_raw_json_body_fields_are_optional() {
        let api = PostmanCollection.parse(&collection()).unwrap();
        let create = api.operation("create_user").unwrap();
        let age = create.parameter("age").unwrap();
        assert_eq!(age.param_type, ParamType::Integer);
        assert!(!age.required);
        assert!(create.parameter("password").is_some());
        assert_eq!(create.request_body.as_ref().unwrap()["type"], "object");
    }

    #[test]
    fn test_collection_auth() {
        let api = PostmanCollection.parse(&collection()).unwrap();
        assert_eq!(api.auth_schemes.len(), 1);
        assert_eq!(api.auth_schemes[0].kind, AuthKind::Bearer);
        assert_eq!(api.auth_schemes[0].env_var, "USERS_SERVICE_TOKEN");
    }

    #[test]
    fn test_version_object() {
        assert_eq!(
            version_string(&json!({"major": 2, "minor": 1, "patch": 0})),
            Some("2.1.0".to_string())
        );
    }

    #[test]
    fn test_missing_item_is_malformed() {
        let err = PostmanCollection
            .parse(&json!({"info": {"name": "x", "schema": SCHEMA}}))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedSpec { format: FORMAT, .. }));
    }
}
