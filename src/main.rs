//! `lev-eval` binary entry point.
//!
//! Wires the CLI surface to the library: load a manifest, resolve provider
//! profiles into a role-keyed client registry, drive a `Runner`, and write
//! results. The tracing setup is carried over from `dirmacs-ares`'s
//! `main.rs`, which builds its subscriber the same way.

use clap::Parser;
use lev_eval::cli::{Cli, Commands};
use lev_eval::manifest::Manifest;
use lev_eval::model::openai::OpenAiModelClient;
use lev_eval::model::openai::ModelParams;
use lev_eval::profiles::{ModelVariant, ProfileStore};
use lev_eval::provider_registry::{LlmProviderRegistry, ASKER_ROLE, JUDGE_ROLE, SOLVER_ROLE};
use lev_eval::runner::{Runner, TsvResultSink, ResultSink};
use lev_eval::telemetry::McpCallLogger;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let exit_code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "lev-eval exited with an error");
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> lev_eval::Result<()> {
    match cli.command {
        Commands::Validate { manifest } => {
            let manifest = Manifest::load(&manifest)?;
            println!("manifest OK: {} eval(s), {} mcp server(s)", manifest.evals.len(), manifest.mcps.len());
            Ok(())
        }
        Commands::Profiles { manifest } => {
            let store = ProfileStore::load(cli.profiles.as_deref())?;
            match manifest {
                Some(path) => {
                    let manifest = Manifest::load(&path)?;
                    if let Some(llm_config) = &manifest.llm_config {
                        let llm_config: lev_eval::profiles::LlmConfig = serde_json::from_value(llm_config.clone())?;
                        for role in [SOLVER_ROLE, JUDGE_ROLE, ASKER_ROLE] {
                            let resolved = store.resolve(&llm_config, role, None)?;
                            println!("{role}: provider={} model={}", resolved.provider, resolved.model);
                        }
                    } else {
                        println!("manifest has no llm_config");
                    }
                }
                None => {
                    println!("loaded provider profiles from disk");
                }
            }
            Ok(())
        }
        Commands::Run { manifest, output, telemetry, limit } => {
            let manifest = Manifest::load(&manifest)?;
            let providers = build_provider_registry(&manifest, cli.profiles.as_deref())?;
            let telemetry = telemetry.map(McpCallLogger::open).transpose()?.map(Arc::new);

            let runner = Runner::new(manifest, Arc::new(providers), telemetry)?.with_limit(limit);
            let results = runner.run().await?;

            let output_path = output.unwrap_or_else(|| PathBuf::from("results.tsv"));
            let sink = TsvResultSink::new(&output_path);
            sink.write(&results)?;

            let passed = results.iter().filter(|r| r.success && r.score >= 0.5).count();
            println!("{passed}/{} evals scored >= 0.5 — results written to {}", results.len(), output_path.display());

            Ok(())
        }
    }
}

/// Resolve `solver`/`judge`/`asker` roles from the manifest's `llm_config`
/// against the provider-profile file and build the OpenAI-compatible
/// clients for each.
fn build_provider_registry(manifest: &Manifest, profiles_path: Option<&std::path::Path>) -> lev_eval::Result<LlmProviderRegistry> {
    let store = ProfileStore::load(profiles_path)?;
    let llm_config: lev_eval::profiles::LlmConfig = match &manifest.llm_config {
        Some(value) => serde_json::from_value(value.clone())?,
        None => {
            return Err(lev_eval::HarnessError::Configuration(
                "manifest has no llm_config; cannot resolve provider clients".to_string(),
            ))
        }
    };

    let mut registry = LlmProviderRegistry::new();
    for role in [SOLVER_ROLE, JUDGE_ROLE, ASKER_ROLE] {
        let resolved = store.resolve(&llm_config, role, Some(ModelVariant::Default))?;
        let api_key = resolved.api_key.clone().unwrap_or_default();
        let params = ModelParams {
            temperature: Some(resolved.parameters.temperature as f32),
            max_tokens: resolved.parameters.max_tokens,
            top_p: resolved.parameters.top_p.map(|v| v as f32),
            frequency_penalty: resolved.parameters.frequency_penalty.map(|v| v as f32),
            presence_penalty: resolved.parameters.presence_penalty.map(|v| v as f32),
        };
        let client = OpenAiModelClient::new(&api_key, resolved.base_url.as_deref(), resolved.model.clone(), params);
        registry.register(role, Arc::new(client));
    }

    Ok(registry)
}
