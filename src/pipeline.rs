//! Pipeline orchestration
//!
//! ```text
//! Api ─▶ mine ─▶ baseline classify ─▶ [enhance] ─▶ unique names ─▶ final classify ─▶ policy
//! ```
//!
//! Each stage completes before the next starts. Only ingestion can fail; from
//! here on every problem is recovered locally, so a run always ends with a
//! (possibly empty) finalized list.

use adapter_core::{Api, AuthScheme, Capability};
use tracing::info;

use crate::config::Config;
use crate::mine::{ensure_unique_names, mine};
use crate::policy::CapabilityPolicy;
use crate::reasoning::{EnhancementReport, Enhancer};
use crate::safety::Classifier;

/// Finalized capabilities plus what the renderer needs to name the artifact
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// `Api.title`
    pub title: String,
    /// `Api.version`
    pub version: String,
    /// `Api.base_url`
    pub base_url: String,
    /// Declared authentication schemes
    pub auth_schemes: Vec<AuthScheme>,
    /// Finalized, policy-filtered capabilities in discovery order
    pub capabilities: Vec<Capability>,
    /// Present when the enhancer ran
    pub enhancement: Option<EnhancementReport>,
}

/// One configured pipeline
pub struct Pipeline {
    config: Config,
    enhancer: Option<Enhancer>,
}

impl Pipeline {
    /// Build from configuration; the enhancer is enabled by `reasoning.enabled`
    #[must_use]
    pub fn new(config: Config) -> Self {
        let enhancer = config
            .reasoning
            .enabled
            .then(|| Enhancer::from_config(&config.reasoning));
        Self { config, enhancer }
    }

    /// Use a specific enhancer (tests, custom provider chains)
    #[must_use]
    pub fn with_enhancer(mut self, enhancer: Enhancer) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    /// Run without the enhancer regardless of configuration
    #[must_use]
    pub fn without_enhancer(mut self) -> Self {
        self.enhancer = None;
        self
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mine and classify without enhancement or policy filtering
    #[must_use]
    pub fn classify(&self, api: &Api) -> Vec<Capability> {
        let classifier = Classifier::new(&self.config.safety);
        let mut capabilities = mine(api, &self.config.mining);
        classifier.apply_baseline(&mut capabilities);
        classifier.apply_final(&mut capabilities);
        capabilities
    }

    /// Run every stage after ingestion
    pub async fn run(&self, api: &Api) -> PipelineOutput {
        let classifier = Classifier::new(&self.config.safety);

        let mut capabilities = mine(api, &self.config.mining);
        classifier.apply_baseline(&mut capabilities);

        let enhancement = match &self.enhancer {
            Some(enhancer) => Some(enhancer.enhance(&mut capabilities).await),
            None => None,
        };

        ensure_unique_names(&mut capabilities);
        classifier.apply_final(&mut capabilities);

        let mined = capabilities.len();
        let capabilities = CapabilityPolicy::from_config(&self.config.policy).apply(capabilities);

        info!(
            api = %api.title,
            operations = api.operations.len(),
            mined,
            finalized = capabilities.len(),
            enhanced = enhancement.as_ref().map_or(0, |r| r.edited),
            "Pipeline complete"
        );

        PipelineOutput {
            title: api.title.clone(),
            version: api.version.clone(),
            base_url: api.base_url.clone(),
            auth_schemes: api.auth_schemes.clone(),
            capabilities,
            enhancement,
        }
    }
}

/// Run the pipeline once with `config`
///
/// ```
/// use mcp_adapter::{config::Config, ingest::ingest_str, pipeline};
///
/// # tokio_test::block_on(async {
/// let api = ingest_str(
///     r#"{"swagger": "2.0", "info": {"title": "Pets", "version": "1"},
///         "paths": {"/pets": {"get": {"operationId": "listPets"}}}}"#,
/// )
/// .unwrap();
/// let output = pipeline::run(&api, &Config::default()).await;
/// assert_eq!(output.capabilities[0].name, "list_pets");
/// # });
/// ```
pub async fn run(api: &Api, config: &Config) -> PipelineOutput {
    Pipeline::new(config.clone()).run(api).await
}
