//! `OpenAPI` 3.x parser
//!
//! Supports `OpenAPI` 3.0 and 3.1. The base URL is `servers[0].url`, or empty
//! when no servers are declared.

use adapter_core::{
    Api, AuthKind, AuthScheme, HttpMethod, Operation, ParamLocation, Parameter, to_snake_case,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::schema::{
    RefResolver, body_parameters, merge_parameters, schema_example, schema_type, text,
};
use super::{SpecFormat, accept_path, credential_env_var, version_marker};
use crate::{Error, Result};

const FORMAT: &str = "OpenAPI 3.x";

/// `OpenAPI` 3.x format (detected by a top-level `openapi: 3.*`)
pub struct OpenApi3;

/// Simplified `OpenAPI` spec structure (just what we need)
#[derive(Debug, Deserialize)]
struct OpenApiSpec {
    info: OpenApiInfo,
    #[serde(default)]
    servers: Vec<OpenApiServer>,
    paths: Map<String, Value>,
    #[serde(default)]
    components: Option<OpenApiComponents>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OpenApiInfo {
    #[serde(default)]
    pub(super) title: String,
    #[serde(default)]
    pub(super) version: Value,
}

impl OpenApiInfo {
    /// YAML often turns `version: 1.0` into a number
    pub(super) fn version_string(&self) -> String {
        match &self.version {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenApiServer {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenApiOperation {
    #[serde(default)]
    operation_id: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Vec<Value>,
    #[serde(default)]
    request_body: Option<Value>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OpenApiParameter {
    pub(super) name: String,
    #[serde(rename = "in")]
    pub(super) location: String,
    #[serde(default)]
    pub(super) required: bool,
    #[serde(default)]
    pub(super) description: Option<String>,
    #[serde(default)]
    pub(super) schema: Option<Value>,
    #[serde(default)]
    pub(super) example: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OpenApiComponents {
    #[serde(default, rename = "securitySchemes")]
    security_schemes: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SecuritySchemeDef {
    #[serde(rename = "type")]
    pub(super) scheme_type: String,
    #[serde(default)]
    pub(super) scheme: Option<String>,
    #[serde(default)]
    pub(super) name: Option<String>,
    #[serde(rename = "in", default)]
    pub(super) location: Option<String>,
}

impl SpecFormat for OpenApi3 {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn detect(&self, doc: &Value) -> bool {
        version_marker(doc, "openapi").is_some_and(|v| v.starts_with('3'))
    }

    fn parse(&self, doc: &Value) -> Result<Api> {
        let spec: OpenApiSpec = serde_json::from_value(doc.clone())
            .map_err(|e| Error::malformed(FORMAT, e.to_string()))?;
        let resolver = RefResolver::new(doc);

        let base_url = spec
            .servers
            .first()
            .map(|s| s.url.trim_end_matches('/').to_string())
            .unwrap_or_default();

        let mut api = Api::new(spec.info.title.clone(), spec.info.version_string(), base_url);

        for (path, item) in &spec.paths {
            let Some(item) = item.as_object() else {
                warn!(path = %path, "Skipping path item that is not a mapping");
                continue;
            };
            let shared = convert_parameters(
                &resolver,
                item.get("parameters").and_then(Value::as_array).map(Vec::as_slice),
            );

            for (method_key, raw_op) in item {
                let Some(method) = HttpMethod::parse(method_key) else {
                    continue;
                };
                match convert_operation(&resolver, path, method, raw_op, &shared) {
                    Some(op) => api.push_operation(op),
                    None => debug!(path = %path, method = %method, "Operation skipped"),
                }
            }
        }

        if let Some(components) = &spec.components {
            api.auth_schemes = convert_security_schemes(&spec.info.title, &components.security_schemes);
        }

        Ok(api)
    }
}

fn convert_operation(
    resolver: &RefResolver<'_>,
    path: &str,
    method: HttpMethod,
    raw: &Value,
    shared: &[Parameter],
) -> Option<Operation> {
    let op: OpenApiOperation = match serde_json::from_value(raw.clone()) {
        Ok(op) => op,
        Err(e) => {
            warn!(path = %path, method = %method, error = %e, "Skipping operation that cannot be normalized");
            return None;
        }
    };

    let id = op
        .operation_id
        .clone()
        .unwrap_or_else(|| to_snake_case(&format!("{method} {path}")));
    if !accept_path(&id, path) {
        return None;
    }

    let own = convert_parameters(resolver, Some(&op.parameters));
    let mut parameters = merge_parameters(shared.to_vec(), own);

    let mut request_body = None;
    if let Some(body) = &op.request_body {
        let body = resolver.resolve(body);
        let body_required = body.get("required").and_then(Value::as_bool).unwrap_or(false);
        if let Some(schema) = body_schema(&body) {
            let body_params = body_parameters(resolver, schema, body_required);
            parameters = merge_parameters(parameters, body_params);
            request_body = Some(resolver.resolve(schema));
        }
    }

    let mut operation = Operation::new(id, method, path);
    operation.tag = op.tags.first().cloned();
    operation.parameters = parameters;
    operation.request_body = request_body;
    operation.summary = op.summary.filter(|s| !s.trim().is_empty());
    operation.description = op.description.filter(|s| !s.trim().is_empty());
    Some(operation)
}

/// Prefer `application/json`, else the first declared media type
fn body_schema(body: &Value) -> Option<&Value> {
    let content = body.get("content")?.as_object()?;
    content
        .get("application/json")
        .or_else(|| content.values().next())
        .and_then(|media| media.get("schema"))
}

pub(super) fn convert_parameters(resolver: &RefResolver<'_>, raw: Option<&[Value]>) -> Vec<Parameter> {
    raw.unwrap_or_default()
        .iter()
        .filter_map(|p| {
            let resolved = resolver.resolve(p);
            let param: OpenApiParameter = serde_json::from_value(resolved)
                .map_err(|e| debug!(error = %e, "Ignoring unparseable parameter"))
                .ok()?;
            let location = ParamLocation::parse(&param.location)?;
            let schema = param
                .schema
                .as_ref()
                .map(|s| resolver.resolve(s))
                .unwrap_or_default();
            let mut out = Parameter::new(param.name.clone(), location, schema_type(&schema))
                .with_required(param.required)
                .with_description(param.description.clone().unwrap_or_default());
            if let Some(example) = param.example.clone().or_else(|| schema_example(&schema)) {
                out = out.with_example(example);
            }
            if out.description.is_empty() {
                if let Some(desc) = text(&schema, "description") {
                    out.description = desc;
                }
            }
            Some(out)
        })
        .collect()
}

pub(super) fn convert_security_schemes(title: &str, schemes: &Map<String, Value>) -> Vec<AuthScheme> {
    schemes
        .iter()
        .filter_map(|(name, raw)| {
            let def: SecuritySchemeDef = serde_json::from_value(raw.clone()).ok()?;
            Some(security_scheme(title, name, &def))
        })
        .collect()
}

pub(super) fn security_scheme(title: &str, name: &str, def: &SecuritySchemeDef) -> AuthScheme {
    let kind = match (def.scheme_type.as_str(), def.scheme.as_deref()) {
        ("apiKey", _) => AuthKind::ApiKey,
        ("http", Some(s)) if s.eq_ignore_ascii_case("basic") => AuthKind::Basic,
        ("basic", _) => AuthKind::Basic,
        ("http", _) => AuthKind::Bearer,
        ("oauth2" | "openIdConnect", _) => AuthKind::OAuth2,
        _ => AuthKind::Other,
    };
    let suffix = match kind {
        AuthKind::ApiKey => "API_KEY",
        AuthKind::Basic => "CREDENTIALS",
        _ => "TOKEN",
    };
    AuthScheme {
        name: name.to_string(),
        kind,
        location: def.location.as_deref().and_then(ParamLocation::parse),
        param_name: def.name.clone(),
        env_var: credential_env_var(title, suffix),
    }
}
