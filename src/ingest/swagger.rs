//! Swagger 2.x parser
//!
//! The base URL is assembled from `schemes`, `host` and `basePath`.

use adapter_core::{Api, HttpMethod, Operation, ParamLocation, Parameter, to_snake_case};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::openapi::{OpenApiInfo, SecuritySchemeDef, security_scheme};
use super::schema::{RefResolver, body_parameters, merge_parameters, schema_example, schema_type, text};
use super::{SpecFormat, accept_path, version_marker};
use crate::{Error, Result};

const FORMAT: &str = "Swagger 2.x";

/// Swagger 2.x format (detected by a top-level `swagger: 2.*`)
pub struct Swagger2;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwaggerSpec {
    info: OpenApiInfo,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    base_path: Option<String>,
    #[serde(default)]
    schemes: Vec<String>,
    paths: Map<String, Value>,
    #[serde(default)]
    security_definitions: Map<String, Value>,
}

impl SwaggerSpec {
    fn base_url(&self) -> String {
        let base_path = self
            .base_path
            .as_deref()
            .unwrap_or("")
            .trim_end_matches('/');
        match self.host.as_deref().filter(|h| !h.is_empty()) {
            Some(host) => {
                let scheme = self.schemes.first().map_or("https", String::as_str);
                format!("{scheme}://{host}{base_path}")
            }
            None => base_path.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SwaggerOperation {
    #[serde(default)]
    operation_id: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Vec<Value>,
    #[serde(default)]
    tags: Vec<String>,
}

/// Swagger parameters carry `type` inline, except `in: body` which has a schema
#[derive(Debug, Deserialize)]
struct SwaggerParameter {
    name: String,
    #[serde(rename = "in")]
    location: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    schema: Option<Value>,
    #[serde(flatten)]
    inline: Map<String, Value>,
}

impl SpecFormat for Swagger2 {
    fn name(&self) -> &'static str {
        FORMAT
    }

    fn detect(&self, doc: &Value) -> bool {
        version_marker(doc, "swagger").is_some_and(|v| v.starts_with('2'))
    }

    fn parse(&self, doc: &Value) -> Result<Api> {
        let spec: SwaggerSpec = serde_json::from_value(doc.clone())
            .map_err(|e| Error::malformed(FORMAT, e.to_string()))?;
        let resolver = RefResolver::new(doc);

        let mut api = Api::new(spec.info.title.clone(), spec.info.version_string(), spec.base_url());

        for (path, item) in &spec.paths {
            let Some(item) = item.as_object() else {
                warn!(path = %path, "Skipping path item that is not a mapping");
                continue;
            };
            let shared = item
                .get("parameters")
                .and_then(Value::as_array)
                .map(|raw| convert_parameters(&resolver, raw))
                .unwrap_or_default();

            for (method_key, raw_op) in item {
                let Some(method) = HttpMethod::parse(method_key) else {
                    continue;
                };
                let op: SwaggerOperation = match serde_json::from_value(raw_op.clone()) {
                    Ok(op) => op,
                    Err(e) => {
                        warn!(path = %path, method = %method, error = %e, "Skipping operation that cannot be normalized");
                        continue;
                    }
                };
                let id = op
                    .operation_id
                    .clone()
                    .unwrap_or_else(|| to_snake_case(&format!("{method} {path}")));
                if !accept_path(&id, path) {
                    continue;
                }

                let (own, request_body) = convert_operation_parameters(&resolver, &op.parameters);
                let mut operation = Operation::new(id, method, path.as_str());
                operation.tag = op.tags.first().cloned();
                operation.parameters = merge_parameters(shared.clone(), own);
                operation.request_body = request_body;
                operation.summary = op.summary.filter(|s| !s.trim().is_empty());
                operation.description = op.description.filter(|s| !s.trim().is_empty());
                api.push_operation(operation);
            }
        }

        api.auth_schemes = spec
            .security_definitions
            .iter()
            .filter_map(|(name, raw)| {
                let def: SecuritySchemeDef = serde_json::from_value(raw.clone()).ok()?;
                Some(security_scheme(&spec.info.title, name, &def))
            })
            .collect();

        Ok(api)
    }
}

fn convert_parameters(resolver: &RefResolver<'_>, raw: &[Value]) -> Vec<Parameter> {
    convert_operation_parameters(resolver, raw).0
}

/// Returns the flattened parameters plus the `in: body` schema, if any
fn convert_operation_parameters(
    resolver: &RefResolver<'_>,
    raw: &[Value],
) -> (Vec<Parameter>, Option<Value>) {
    let mut params = Vec::new();
    let mut request_body = None;

    for p in raw {
        let resolved = resolver.resolve(p);
        let param: SwaggerParameter = match serde_json::from_value(resolved) {
            Ok(param) => param,
            Err(e) => {
                debug!(error = %e, "Ignoring unparseable parameter");
                continue;
            }
        };

        if param.location == "body" {
            let schema = param.schema.clone().unwrap_or_default();
            let resolved_schema = resolver.resolve(&schema);
            let mut fields = body_parameters(resolver, &schema, param.required);
            if let [single] = fields.as_mut_slice() {
                // A non-object body keeps the declared parameter name
                if single.name == "body" {
                    single.name.clone_from(&param.name);
                    if single.description.is_empty() {
                        single.description = param.description.clone().unwrap_or_default();
                    }
                }
            }
            params = merge_parameters(params, fields);
            request_body = Some(resolved_schema);
            continue;
        }

        let Some(location) = ParamLocation::parse(&param.location) else {
            continue;
        };
        let inline = Value::Object(param.inline.clone());
        let mut out = Parameter::new(param.name.clone(), location, schema_type(&inline))
            .with_required(param.required)
            .with_description(
                param
                    .description
                    .clone()
                    .or_else(|| text(&inline, "description"))
                    .unwrap_or_default(),
            );
        if let Some(example) = schema_example(&inline).or_else(|| inline.get("x-example").cloned()) {
            out = out.with_example(example);
        }
        params = merge_parameters(params, vec![out]);
    }

    (params, request_body)
}
