//! MCP Adapter - API descriptions in, safety-classified MCP capabilities out

use std::process::ExitCode;

use clap::Parser;
use serde_json::json;
use tracing::{error, info};

use mcp_adapter::{
    Pipeline,
    adapter_core::{Api, Capability, SafetyTier, to_snake_case},
    cli::{Cli, Command, GenerateArgs, InspectArgs, SourceArgs},
    config::Config,
    ingest::ingest,
    manifest::write_manifest,
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup tracing
    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Generate(args) => run_generate(args, config).await,
        Command::Inspect(args) => run_inspect(args, config).await,
    }
}

/// Ingest the requested source, reporting failures on stderr
async fn load_api(source: &SourceArgs, config: &Config) -> Option<Api> {
    let Some(source) = source.source() else {
        eprintln!("❌ Either --spec or --url is required");
        return None;
    };

    match ingest(&source, &config.ingest).await {
        Ok(api) => Some(api),
        Err(e) => {
            error!(source = %source, "Ingestion failed: {e}");
            eprintln!("❌ Failed to ingest {source}: {e}");
            None
        }
    }
}

/// Run `generate`
async fn run_generate(args: GenerateArgs, mut config: Config) -> ExitCode {
    args.apply_to(&mut config);

    let Some(api) = load_api(&args.source, &config).await else {
        return ExitCode::FAILURE;
    };

    let server_name = args
        .name
        .clone()
        .unwrap_or_else(|| to_snake_case(&api.title))
        .trim()
        .to_string();
    let server_name = if server_name.is_empty() {
        "api".to_string()
    } else {
        server_name
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        api = %api.title,
        server = %server_name,
        enhance = config.reasoning.enabled,
        "Generating capabilities"
    );

    let output = Pipeline::new(config).run(&api).await;

    if let Some(report) = &output.enhancement {
        match &report.provider {
            Some(provider) => println!("🧠 Enhanced {} capabilities via {provider}", report.edited),
            None => println!("⚠️  Enhancement unavailable, using heuristic names"),
        }
        for (provider, failure) in &report.failures {
            println!("   {provider}: {failure}");
        }
    }

    match write_manifest(&output, &server_name, &args.output) {
        Ok(_) => {
            println!(
                "Generated {} capabilities from {} {}\n",
                output.capabilities.len(),
                output.title,
                output.version
            );
            for capability in &output.capabilities {
                println!("  ✅ {}.yaml [{}]", capability.name, capability.tier);
            }
            println!("\nCapabilities written to {}/", args.output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Failed to write capabilities: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Run `inspect`
async fn run_inspect(args: InspectArgs, config: Config) -> ExitCode {
    let Some(api) = load_api(&args.source, &config).await else {
        return ExitCode::FAILURE;
    };

    let capabilities = Pipeline::new(config).without_enhancer().classify(&api);

    if args.json_output {
        let report = json!({
            "api": {
                "title": api.title,
                "version": api.version,
                "base_url": api.base_url,
                "endpoints": api.operations.len(),
                "tags": api.tags,
            },
            "tools": capabilities.iter().map(tool_json).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("❌ Failed to serialize to JSON: {e}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    println!("📦 {} {}", api.title, api.version);
    if !api.base_url.is_empty() {
        println!("   URL: {}", api.base_url);
    }
    println!("   Endpoints: {}", api.operations.len());
    if !api.tags.is_empty() {
        println!("   Tags: {}", api.tags.join(", "));
    }
    println!();

    if capabilities.is_empty() {
        println!("No capabilities would be generated.");
        return ExitCode::SUCCESS;
    }

    println!("Found {} capabilities:\n", capabilities.len());
    for capability in &capabilities {
        let marker = match capability.tier {
            SafetyTier::Read => "🟢",
            SafetyTier::Write => "🟡",
            SafetyTier::Destructive => "🔴",
        };
        println!("  {marker} {} - {}", capability.name, capability.description);
        if !capability.redactions.is_empty() {
            let redacted: Vec<&str> = capability.redactions.iter().map(String::as_str).collect();
            println!("     redacted: {}", redacted.join(", "));
        }
    }

    println!("\n💡 Tip: Use --json-output for JSON output");
    ExitCode::SUCCESS
}

fn tool_json(capability: &Capability) -> serde_json::Value {
    json!({
        "name": capability.name,
        "description": capability.description,
        "safety": capability.tier.as_str(),
        "params": capability.parameters.iter().map(|p| &p.name).collect::<Vec<_>>(),
    })
}
