//! Reasoning enhancer tests
//!
//! Fallback, partial replies and pass-through, driven both by in-memory
//! provider doubles and by the HTTP provider against a mock server.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mcp_adapter::adapter_core::{
    Api, Capability, HttpMethod, Operation, ParamLocation, ParamType, Parameter, Provenance,
};
use mcp_adapter::config::Config;
use mcp_adapter::reasoning::{
    CapabilityEdit, EnhancementRequest, EnhancementResponse, Enhancer, HttpReasoningProvider,
    ReasoningProvider,
};
use mcp_adapter::{Pipeline, ProviderError};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::Mutex;

/// Provider double that records the batches it receives
struct RecordingProvider {
    name: &'static str,
    result: Result<EnhancementResponse, ProviderError>,
    seen: Mutex<Vec<EnhancementRequest>>,
}

impl RecordingProvider {
    fn new(name: &'static str, result: Result<EnhancementResponse, ProviderError>) -> Arc<Self> {
        Arc::new(Self {
            name,
            result,
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ReasoningProvider for RecordingProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn enhance(&self, request: &EnhancementRequest) -> Result<EnhancementResponse, ProviderError> {
        self.seen.lock().await.push(request.clone());
        self.result.clone()
    }
}

fn dyn_provider(provider: &Arc<RecordingProvider>) -> Arc<dyn ReasoningProvider> {
    provider.clone()
}

/// Provider double that never answers in time
struct HangingProvider;

#[async_trait]
impl ReasoningProvider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn enhance(&self, _request: &EnhancementRequest) -> Result<EnhancementResponse, ProviderError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(EnhancementResponse::default())
    }
}

fn capabilities() -> Vec<Capability> {
    let mut api = Api::new("Pets", "1", "https://pets.test");
    let mut list = Operation::new("listPets", HttpMethod::Get, "/pets");
    list.tag = Some("pets".into());
    list.parameters = vec![Parameter::new("limit", ParamLocation::Query, ParamType::Integer)];
    let mut create = Operation::new("createPet", HttpMethod::Post, "/pets");
    create.tag = Some("pets".into());
    create.parameters =
        vec![Parameter::new("name", ParamLocation::Body, ParamType::String).with_required(true)];
    api.push_operation(list);
    api.push_operation(create);
    Pipeline::new(Config::default()).classify(&api)
}

fn rename(id: &str, name: &str) -> CapabilityEdit {
    CapabilityEdit {
        id: id.to_string(),
        name: Some(name.to_string()),
        description: Some(format!("{name} (improved)")),
        ..CapabilityEdit::default()
    }
}

fn chat_reply(content: &str) -> String {
    json!({
        "id": "chatcmpl-1",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

#[tokio::test]
async fn test_network_failure_falls_back_with_same_batch() {
    let mut caps = capabilities();
    let primary = RecordingProvider::new("primary", Err(ProviderError::Network("refused".into())));
    let secondary = RecordingProvider::new(
        "secondary",
        Ok(EnhancementResponse {
            capabilities: vec![rename(&caps[0].id, "browse_pets")],
        }),
    );

    let enhancer = Enhancer::new(vec![dyn_provider(&primary), dyn_provider(&secondary)], Duration::from_secs(5));
    let report = enhancer.enhance(&mut caps).await;

    assert_eq!(report.provider.as_deref(), Some("secondary"));
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, "primary");

    let primary_seen = primary.seen.lock().await;
    let secondary_seen = secondary.seen.lock().await;
    assert_eq!(primary_seen.len(), 1);
    assert_eq!(*primary_seen, *secondary_seen);

    assert_eq!(caps[0].name, "browse_pets");
    assert_eq!(caps[0].provenance, Provenance::AiEnhanced);
}

#[tokio::test]
async fn test_all_providers_fail_is_pass_through() {
    let original = capabilities();
    let mut caps = original.clone();

    let enhancer = Enhancer::new(
        vec![
            dyn_provider(&RecordingProvider::new("a", Err(ProviderError::Auth("no key".into())))),
            dyn_provider(&RecordingProvider::new(
                "b",
                Err(ProviderError::MalformedResponse("prose".into())),
            )),
        ],
        Duration::from_secs(5),
    );
    let report = enhancer.enhance(&mut caps).await;

    assert!(report.provider.is_none());
    assert_eq!(report.edited, 0);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(caps, original);
    assert!(caps.iter().all(|c| c.provenance == Provenance::Heuristic));
}

#[tokio::test]
async fn test_partial_reply_edits_only_matched() {
    let mut caps = capabilities();
    let untouched = caps[1].clone();
    let only = RecordingProvider::new(
        "only",
        Ok(EnhancementResponse {
            capabilities: vec![rename(&caps[0].id, "browse_pets"), rename("cap_unknown", "ghost")],
        }),
    );
    let backup = RecordingProvider::new("backup", Ok(EnhancementResponse::default()));

    let enhancer = Enhancer::new(vec![dyn_provider(&only), dyn_provider(&backup)], Duration::from_secs(5));
    let report = enhancer.enhance(&mut caps).await;

    assert_eq!(report.provider.as_deref(), Some("only"));
    assert_eq!(report.edited, 1);
    assert_eq!(caps[0].name, "browse_pets");
    assert_eq!(caps[1], untouched);
    assert!(backup.seen.lock().await.is_empty());
}

#[tokio::test]
async fn test_hanging_provider_times_out() {
    let mut caps = capabilities();
    let fallback = RecordingProvider::new(
        "fallback",
        Ok(EnhancementResponse {
            capabilities: vec![rename(&caps[1].id, "register_pet")],
        }),
    );

    let enhancer = Enhancer::new(
        vec![Arc::new(HangingProvider) as Arc<dyn ReasoningProvider>, dyn_provider(&fallback)],
        Duration::from_millis(50),
    );
    let report = enhancer.enhance(&mut caps).await;

    assert_eq!(
        report.failures,
        vec![("hanging".to_string(), ProviderError::Timeout(Duration::from_millis(50)))]
    );
    assert_eq!(report.provider.as_deref(), Some("fallback"));
    assert_eq!(caps[1].name, "register_pet");
}

#[tokio::test]
async fn test_http_provider_success() {
    let mut caps = capabilities();
    let content = format!(
        "```json\n{}\n```",
        json!({"capabilities": [{
            "id": caps[0].id,
            "name": "List Pets",
            "description": "List pets in the store, newest first.",
            "parameterDocs": {"limit": "Maximum number of pets to return"}
        }]})
    );

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(chat_reply(&content))
        .create_async()
        .await;

    let provider = HttpReasoningProvider::new(
        "mock",
        format!("{}/v1", server.url()),
        "test-model",
        Some("test-key".into()),
        Duration::from_secs(5),
    )
    .unwrap();
    let enhancer = Enhancer::new(vec![Arc::new(provider) as Arc<dyn ReasoningProvider>], Duration::from_secs(5));
    let report = enhancer.enhance(&mut caps).await;

    mock.assert_async().await;
    assert_eq!(report.provider.as_deref(), Some("mock"));
    assert_eq!(caps[0].name, "list_pets");
    assert_eq!(caps[0].description, "List pets in the store, newest first.");
    assert_eq!(
        caps[0].parameter("limit").unwrap().description,
        "Maximum number of pets to return"
    );
}

#[tokio::test]
async fn test_http_provider_auth_and_status_errors() {
    let mut server = mockito::Server::new_async().await;
    let _unauthorized = server
        .mock("POST", "/denied/chat/completions")
        .with_status(401)
        .with_body(r#"{"error": "invalid key"}"#)
        .create_async()
        .await;
    let _overloaded = server
        .mock("POST", "/busy/chat/completions")
        .with_status(503)
        .with_body("overloaded")
        .create_async()
        .await;

    let request = EnhancementRequest {
        capabilities: Vec::new(),
    };
    let provider = |path: &str| {
        HttpReasoningProvider::new(
            path.to_string(),
            format!("{}/{path}", server.url()),
            "m",
            Some("k".into()),
            Duration::from_secs(5),
        )
        .unwrap()
    };

    let err = provider("denied").enhance(&request).await.unwrap_err();
    assert!(matches!(err, ProviderError::Auth(_)));

    let err = provider("busy").enhance(&request).await.unwrap_err();
    assert_eq!(
        err,
        ProviderError::Status {
            status: 503,
            body: "overloaded".into()
        }
    );
}

#[tokio::test]
async fn test_http_provider_malformed_reply_falls_back() {
    let mut caps = capabilities();
    let original = caps.clone();

    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(chat_reply("Sorry, I can't do that."))
        .create_async()
        .await;

    let provider = HttpReasoningProvider::new(
        "chatty",
        server.url(),
        "m",
        Some("k".into()),
        Duration::from_secs(5),
    )
    .unwrap();
    let enhancer = Enhancer::new(vec![Arc::new(provider) as Arc<dyn ReasoningProvider>], Duration::from_secs(5));
    let report = enhancer.enhance(&mut caps).await;

    assert!(matches!(
        report.failures[..],
        [(_, ProviderError::MalformedResponse(_))]
    ));
    assert_eq!(caps, original);
}
