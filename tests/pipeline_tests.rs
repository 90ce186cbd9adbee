//! End-to-end pipeline tests
//!
//! Each scenario starts from a source document (or a hand-built `Api`) and
//! checks the finalized capability list the renderer would receive.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mcp_adapter::adapter_core::{
    Api, HttpMethod, Operation, ParamLocation, ParamType, Parameter, Provenance, SafetyTier,
};
use mcp_adapter::config::Config;
use mcp_adapter::ingest::ingest_str;
use mcp_adapter::manifest::{INDEX_FILE, write_manifest};
use mcp_adapter::mine::mine;
use mcp_adapter::reasoning::{
    CapabilityEdit, EnhancementRequest, EnhancementResponse, Enhancer, ReasoningProvider,
};
use mcp_adapter::{Pipeline, ProviderError, pipeline};
use pretty_assertions::assert_eq;

const USERS_COLLECTION: &str = r#"{
  "info": {
    "name": "Directory",
    "schema": "https://schema.getpostman.com/json/collection/v2.1.0/collection.json"
  },
  "variable": [{"key": "baseUrl", "value": "https://directory.test"}],
  "item": [{
    "name": "Users",
    "item": [
      {
        "name": "Get user",
        "request": {"method": "GET", "url": "{{baseUrl}}/users/:id"}
      },
      {
        "name": "Remove user",
        "request": {"method": "DELETE", "url": "{{baseUrl}}/users/:id"}
      }
    ]
  }]
}"#;

const SIGNUP: &str = r#"
openapi: 3.0.0
info:
  title: Signup
  version: '1.0'
paths:
  /accounts:
    post:
      operationId: register
      tags: [accounts]
      summary: Register an account
      requestBody:
        required: true
        content:
          application/json:
            schema:
              type: object
              required: [email, password]
              properties:
                email: { type: string, example: ada@example.com }
                password: { type: string }
"#;

/// Provider double returning a fixed reply
struct StaticProvider {
    name: &'static str,
    result: Result<EnhancementResponse, ProviderError>,
}

#[async_trait]
impl ReasoningProvider for StaticProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn enhance(&self, _request: &EnhancementRequest) -> Result<EnhancementResponse, ProviderError> {
        self.result.clone()
    }
}

fn enhancer(result: Result<EnhancementResponse, ProviderError>) -> Enhancer {
    let provider: Arc<dyn ReasoningProvider> = Arc::new(StaticProvider { name: "static", result });
    Enhancer::new(vec![provider], Duration::from_secs(5))
}

fn items_api() -> Api {
    let mut api = Api::new("Catalog", "1", "https://catalog.test");
    for (id, filter) in [("itemsByColor", "color"), ("itemsBySize", "size")] {
        let mut op = Operation::new(id, HttpMethod::Get, "/items");
        op.tag = Some("items".into());
        op.parameters = vec![Parameter::new(filter, ParamLocation::Query, ParamType::String)];
        api.push_operation(op);
    }
    api
}

#[tokio::test]
async fn test_postman_delete_is_destructive_and_blockable() {
    let api = ingest_str(USERS_COLLECTION).unwrap();

    let output = pipeline::run(&api, &Config::default()).await;
    let delete = output
        .capabilities
        .iter()
        .find(|c| c.name.contains("delete_user"))
        .expect("delete capability");
    assert_eq!(delete.tag, "users");
    assert_eq!(delete.tier, SafetyTier::Destructive);

    let mut config = Config::default();
    config.policy.block_destructive = true;
    let output = pipeline::run(&api, &config).await;
    let names: Vec<_> = output.capabilities.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["get_user"]);
}

#[tokio::test]
async fn test_password_is_redacted_but_kept() {
    let api = ingest_str(SIGNUP).unwrap();
    let output = pipeline::run(&api, &Config::default()).await;

    assert_eq!(output.capabilities.len(), 1);
    let register = &output.capabilities[0];
    assert_eq!(register.name, "create_account");
    assert!(register.redactions.contains("password"));

    let password = register.parameter("password").unwrap();
    assert!(password.required);
    assert!(password.description.contains("redacted"));

    let schema = register.input_schema();
    assert!(schema["properties"].get("password").is_some());
    assert!(
        schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .any(|r| r == "password")
    );

    let example = register.example_payload();
    assert!(example.get("password").is_none());
    assert_eq!(example["email"], "ada@example.com");
}

#[tokio::test]
async fn test_search_cluster() {
    let output = pipeline::run(&items_api(), &Config::default()).await;

    assert_eq!(output.capabilities.len(), 1);
    let search = &output.capabilities[0];
    assert_eq!(search.name, "search_items");
    assert_eq!(search.operations.len(), 2);
    assert_eq!(search.tier, SafetyTier::Read);
    for filter in ["color", "size"] {
        assert!(!search.parameter(filter).unwrap().required, "{filter} must be optional");
    }
}

#[tokio::test]
async fn test_filter_names_keep_search_readable() {
    let mut api = Api::new("Catalog", "1", "https://catalog.test");
    for (id, filter) in [("itemsByStatus", "status"), ("itemsWithDeleted", "include_deleted")] {
        let mut op = Operation::new(id, HttpMethod::Get, "/items");
        op.tag = Some("items".into());
        op.parameters = vec![Parameter::new(filter, ParamLocation::Query, ParamType::String)];
        api.push_operation(op);
    }

    let mut config = Config::default();
    config.policy.block_destructive = true;
    let output = pipeline::run(&api, &config).await;

    assert_eq!(output.capabilities.len(), 1);
    let search = &output.capabilities[0];
    assert_eq!(search.name, "search_items");
    assert_eq!(search.tier, SafetyTier::Read);
    assert_eq!(
        search.description,
        "Search items. Optional filters: status, include_deleted."
    );
}

#[test]
fn test_mining_is_deterministic() {
    let api = ingest_str(USERS_COLLECTION).unwrap();
    let config = Config::default();

    let first = mine(&api, &config.mining);
    let second = mine(&api, &config.mining);
    let key = |caps: &[mcp_adapter::adapter_core::Capability]| {
        caps.iter()
            .map(|c| (c.id.clone(), c.name.clone(), c.tier))
            .collect::<Vec<_>>()
    };
    assert_eq!(key(&first), key(&second));
}

#[tokio::test]
async fn test_enhancer_cannot_downgrade() {
    let mut api = Api::new("Jobs", "1", "https://jobs.test");
    let mut reset = Operation::new("resetJob", HttpMethod::Post, "/jobs/{id}/reset");
    reset.tag = Some("jobs".into());
    reset.summary = Some("Erase all job data".into());
    reset.parameters = vec![Parameter::new("id", ParamLocation::Path, ParamType::String)];
    api.push_operation(reset);

    let baseline = Pipeline::new(Config::default()).classify(&api);
    assert_eq!(baseline[0].tier, SafetyTier::Destructive);

    let reply = EnhancementResponse {
        capabilities: vec![CapabilityEdit {
            id: baseline[0].id.clone(),
            name: Some("restart_job".into()),
            description: Some("Restart a job from its initial state".into()),
            safety_hint: Some("read".into()),
            ..CapabilityEdit::default()
        }],
    };

    let output = Pipeline::new(Config::default())
        .with_enhancer(enhancer(Ok(reply)))
        .run(&api)
        .await;

    let job = &output.capabilities[0];
    assert_eq!(job.name, "restart_job");
    assert_eq!(job.provenance, Provenance::AiEnhanced);
    assert_eq!(job.baseline_tier, SafetyTier::Destructive);
    assert_eq!(job.tier, SafetyTier::Destructive);
    assert_eq!(output.enhancement.unwrap().edited, 1);
}

#[tokio::test]
async fn test_enhancer_renames_are_deduplicated() {
    let api = ingest_str(USERS_COLLECTION).unwrap();
    let mined = Pipeline::new(Config::default()).classify(&api);

    let reply = EnhancementResponse {
        capabilities: mined
            .iter()
            .map(|c| CapabilityEdit {
                id: c.id.clone(),
                name: Some("manage_user".into()),
                ..CapabilityEdit::default()
            })
            .collect(),
    };

    let output = Pipeline::new(Config::default())
        .with_enhancer(enhancer(Ok(reply)))
        .run(&api)
        .await;
    let names: Vec<_> = output.capabilities.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["manage_user", "manage_user_2"]);
}

#[tokio::test]
async fn test_allowlisted_destructive_survives_max_tools() {
    let api = ingest_str(USERS_COLLECTION).unwrap();

    let mut config = Config::default();
    config.policy.allowlist = vec!["delete_user".into()];
    config.policy.max_tools = 1;
    let output = pipeline::run(&api, &config).await;
    let names: Vec<_> = output.capabilities.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["delete_user"]);

    config.policy.block_destructive = true;
    let output = pipeline::run(&api, &config).await;
    let names: Vec<_> = output.capabilities.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["get_user"]);
}

#[tokio::test]
async fn test_failed_enhancement_falls_back_to_heuristics() {
    let api = items_api();
    let heuristic = pipeline::run(&api, &Config::default()).await;

    let output = Pipeline::new(Config::default())
        .with_enhancer(enhancer(Err(ProviderError::Network("connection refused".into()))))
        .run(&api)
        .await;

    assert_eq!(output.capabilities, heuristic.capabilities);
    let report = output.enhancement.unwrap();
    assert!(report.provider.is_none());
    assert_eq!(report.failures.len(), 1);
}

#[tokio::test]
async fn test_generated_manifest() {
    let api = ingest_str(SIGNUP).unwrap();
    let output = pipeline::run(&api, &Config::default()).await;

    let dir = tempfile::tempdir().unwrap();
    let written = write_manifest(&output, "signup", dir.path()).unwrap();
    assert_eq!(written.len(), 2);

    let definition = std::fs::read_to_string(dir.path().join("create_account.yaml")).unwrap();
    let doc: serde_json::Value = serde_yaml::from_str(&definition).unwrap();
    assert_eq!(doc["providers"]["primary"]["config"]["method"], "POST");
    assert_eq!(doc["providers"]["primary"]["config"]["path"], "/accounts");
    assert_eq!(doc["metadata"]["safety_tier"], "write");
    assert_eq!(doc["metadata"]["redactions"][0], "password");
    assert!(doc["examples"]["payload"].get("password").is_none());

    assert!(dir.path().join(INDEX_FILE).exists());
}
