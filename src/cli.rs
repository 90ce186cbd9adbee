//! Command-line interface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::Config;
use crate::ingest::Source;

/// MCP Adapter - turn API descriptions into safety-classified MCP capabilities
#[derive(Parser, Debug)]
#[command(name = "mcp-adapter")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "MCP_ADAPTER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "MCP_ADAPTER_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "MCP_ADAPTER_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate capability definitions from an API description
    Generate(GenerateArgs),

    /// Show what would be generated without writing anything
    Inspect(InspectArgs),
}

/// Where to read the API description from
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// Path to an `OpenAPI`, Swagger or Postman file (YAML or JSON)
    #[arg(long)]
    pub spec: Option<PathBuf>,

    /// URL to fetch the API description from
    #[arg(long)]
    pub url: Option<String>,
}

impl SourceArgs {
    /// Resolve into an ingestion source
    #[must_use]
    pub fn source(&self) -> Option<Source> {
        match (&self.spec, &self.url) {
            (_, Some(url)) => Some(Source::Url(url.clone())),
            (Some(path), None) => Some(Source::File(path.clone())),
            (None, None) => None,
        }
    }
}

/// `generate` arguments
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Input
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output directory for generated capabilities
    #[arg(short, long, default_value = "capabilities")]
    pub output: PathBuf,

    /// Server name (defaults to the snake_case API title)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Enable the reasoning enhancer
    #[arg(long)]
    pub enhance: bool,

    /// Drop destructive capabilities
    #[arg(long)]
    pub block_destructive: bool,

    /// Maximum number of capabilities (0 = unlimited)
    #[arg(long)]
    pub max_tools: Option<usize>,

    /// Capability names or `prefix*` patterns to always include
    #[arg(long, value_delimiter = ',')]
    pub allowlist: Vec<String>,

    /// Capability names or `prefix*` patterns to exclude
    #[arg(long, value_delimiter = ',')]
    pub denylist: Vec<String>,
}

impl GenerateArgs {
    /// Apply flag overrides on top of file/environment configuration
    pub fn apply_to(&self, config: &mut Config) {
        if self.enhance {
            config.reasoning.enabled = true;
        }
        if self.block_destructive {
            config.policy.block_destructive = true;
        }
        if let Some(max_tools) = self.max_tools {
            config.policy.max_tools = max_tools;
        }
        if !self.allowlist.is_empty() {
            config.policy.allowlist.clone_from(&self.allowlist);
        }
        if !self.denylist.is_empty() {
            config.policy.denylist.clone_from(&self.denylist);
        }
    }
}

/// `inspect` arguments
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Input
    #[command(flatten)]
    pub source: SourceArgs,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json_output: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate_flags() {
        let cli = Cli::try_parse_from([
            "mcp-adapter",
            "generate",
            "--spec",
            "petstore.yaml",
            "-o",
            "out",
            "--block-destructive",
            "--max-tools",
            "5",
            "--allowlist",
            "list_pets,get_*",
        ])
        .unwrap();

        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.output, PathBuf::from("out"));
        assert!(matches!(args.source.source(), Some(Source::File(_))));

        let mut config = Config::default();
        args.apply_to(&mut config);
        assert!(config.policy.block_destructive);
        assert_eq!(config.policy.max_tools, 5);
        assert_eq!(config.policy.allowlist, vec!["list_pets", "get_*"]);
        assert!(!config.reasoning.enabled);
    }

    #[test]
    fn spec_and_url_are_exclusive() {
        let result = Cli::try_parse_from([
            "mcp-adapter",
            "inspect",
            "--spec",
            "a.yaml",
            "--url",
            "https://example.test/openapi.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn a_source_is_required() {
        assert!(Cli::try_parse_from(["mcp-adapter", "inspect"]).is_err());
    }
}
