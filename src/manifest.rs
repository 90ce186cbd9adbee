//! Capability manifest writer
//!
//! Renders a finalized capability list as YAML capability definitions, one
//! file per capability, plus a `manifest.yaml` index naming them all.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use adapter_core::{AuthKind, AuthScheme, Capability, ParamLocation, Provenance, SafetyTier};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::pipeline::PipelineOutput;
use crate::{Error, Result};

/// Index file written next to the capability definitions
pub const INDEX_FILE: &str = "manifest.yaml";

/// Definition format version
const FORMAT_VERSION: &str = "1.0";

/// One rendered capability definition
#[derive(Debug, Clone)]
pub struct CapabilityFile {
    /// Capability name (also the file stem)
    pub name: String,
    /// YAML content
    pub yaml: String,
}

impl CapabilityFile {
    /// Render `capability` against the API it was mined from
    pub fn render(capability: &Capability, output: &PipelineOutput) -> Result<Self> {
        let mut yaml = String::new();
        let _ = writeln!(yaml, "# {} capability", capability.name);
        let _ = writeln!(yaml, "# Generated by mcp-adapter from {} {}", output.title, output.version);
        yaml.push('\n');
        yaml.push_str(&serde_yaml::to_string(&definition(capability, output))?);

        Ok(Self {
            name: capability.name.clone(),
            yaml,
        })
    }

    /// File name inside the output directory
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.yaml", self.name)
    }

    /// Write to `{directory}/{name}.yaml`, creating the directory if needed
    pub fn write_to_file(&self, directory: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(directory)?;
        let path = directory.join(self.file_name());
        std::fs::write(&path, &self.yaml)?;
        debug!(path = %path.display(), "Wrote capability file");
        Ok(path)
    }
}

/// Write every capability of `output` plus the index into `directory`.
///
/// Returns the written paths, index last. An empty capability list still
/// produces an index.
pub fn write_manifest(output: &PipelineOutput, server_name: &str, directory: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(output.capabilities.len() + 1);
    for capability in &output.capabilities {
        written.push(CapabilityFile::render(capability, output)?.write_to_file(directory)?);
    }

    std::fs::create_dir_all(directory)?;
    let index_path = directory.join(INDEX_FILE);
    std::fs::write(&index_path, render_index(output, server_name)?)?;
    written.push(index_path);

    info!(
        server = server_name,
        directory = %directory.display(),
        capabilities = output.capabilities.len(),
        "Wrote capability manifest"
    );
    Ok(written)
}

/// Render the `manifest.yaml` index
pub fn render_index(output: &PipelineOutput, server_name: &str) -> Result<String> {
    if server_name.trim().is_empty() {
        return Err(Error::Config("server name must not be empty".to_string()));
    }

    let capabilities: Vec<Value> = output
        .capabilities
        .iter()
        .map(|c| {
            json!({
                "name": c.name,
                "file": format!("{}.yaml", c.name),
                "safety_tier": c.tier.as_str(),
                "provenance": provenance_str(c.provenance),
            })
        })
        .collect();

    let mut index = json!({
        "fulcrum": FORMAT_VERSION,
        "server": server_name,
        "api": {
            "title": output.title,
            "version": output.version,
            "base_url": output.base_url,
        },
        "capabilities": capabilities,
    });
    if let Some(report) = &output.enhancement {
        index["enhancement"] = json!({
            "provider": report.provider,
            "edited": report.edited,
            "failed_providers": report.failures.iter().map(|(name, _)| name).collect::<Vec<_>>(),
        });
    }

    let mut yaml = format!("# {server_name} capability manifest\n\n");
    yaml.push_str(&serde_yaml::to_string(&index)?);
    Ok(yaml)
}

fn definition(capability: &Capability, output: &PipelineOutput) -> Value {
    let (path, method) = capability
        .primary_operation()
        .map_or((String::new(), "GET"), |op| (op.path.clone(), op.method.as_str()));

    let mut headers = Map::new();
    let mut params = Map::new();
    let mut body = Map::new();
    for param in &capability.parameters {
        let placeholder = Value::String(format!("{{{}}}", param.name));
        match param.location {
            ParamLocation::Header => {
                headers.insert(param.name.clone(), placeholder);
            }
            ParamLocation::Query => {
                params.insert(param.name.clone(), placeholder);
            }
            ParamLocation::Body => {
                body.insert(param.name.clone(), placeholder);
            }
            ParamLocation::Path => {}
        }
    }

    let mut config = json!({
        "base_url": output.base_url,
        "path": path,
        "method": method,
    });
    if !headers.is_empty() {
        config["headers"] = Value::Object(headers);
    }
    if !params.is_empty() {
        config["params"] = Value::Object(params);
    }
    if !body.is_empty() {
        config["body"] = Value::Object(body);
    }

    let operations: Vec<Value> = capability
        .operations
        .iter()
        .map(|op| json!({ "id": op.id, "method": op.method.as_str(), "path": op.path }))
        .collect();

    let mut metadata = json!({
        "category": capability.tag,
        "tags": [capability.tag],
        "read_only": capability.tier == SafetyTier::Read,
        "safety_tier": capability.tier.as_str(),
        "provenance": provenance_str(capability.provenance),
        "capability_id": capability.id,
        "operations": operations,
    });
    if !capability.redactions.is_empty() {
        metadata["redactions"] = json!(capability.redactions);
    }

    json!({
        "fulcrum": FORMAT_VERSION,
        "name": capability.name,
        "description": capability.description,
        "schema": {
            "input": capability.input_schema(),
        },
        "providers": {
            "primary": {
                "service": "rest",
                "config": config,
            }
        },
        "auth": auth_block(&output.auth_schemes),
        "examples": {
            "payload": capability.example_payload(),
        },
        "metadata": metadata,
    })
}

/// Auth block from the first declared scheme
fn auth_block(schemes: &[AuthScheme]) -> Value {
    let Some(scheme) = schemes.first() else {
        return json!({ "required": false });
    };

    let auth_type = match scheme.kind {
        AuthKind::ApiKey => "api_key",
        AuthKind::Bearer => "bearer",
        AuthKind::Basic => "basic",
        AuthKind::OAuth2 => "oauth",
        AuthKind::Other => "custom",
    };
    let mut auth = json!({
        "required": true,
        "type": auth_type,
        "key": format!("env:{}", scheme.env_var),
        "description": format!("{} credential", scheme.name),
    });
    if let Some(param_name) = &scheme.param_name {
        auth["param_name"] = json!(param_name);
    }
    if let Some(location) = scheme.location {
        auth["in"] = json!(location.as_str());
    }
    auth
}

fn provenance_str(provenance: Provenance) -> &'static str {
    match provenance {
        Provenance::Heuristic => "heuristic",
        Provenance::AiEnhanced => "ai-enhanced",
    }
}
