use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
#[cfg(feature = "otel")]
use tracing_subscriber::layer::SubscriberExt;
#[cfg(feature = "otel")]
use tracing_subscriber::util::SubscriberInitExt;
use upload_actions::prelude::*;

#[derive(Parser)]
#[command(name = "upload-actions")]
#[command(about = "Publish a video post to several destinations", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to runner.yaml (default: ./runner.yaml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory of workflow files extending the built-in ones (overrides config)
    #[arg(short, long, global = true)]
    workflows: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish the post to the configured platforms
    Run {
        /// Platform to publish to; repeat for several (overrides config)
        #[arg(short, long = "platform", value_name = "NAME")]
        platforms: Vec<String>,

        /// Metadata text file: title, description lines, tags (overrides config)
        #[arg(short, long)]
        metadata: Option<PathBuf>,

        /// Video file to upload (overrides config)
        #[arg(long)]
        video: Option<PathBuf>,

        /// Maximum number of platforms published at once (overrides config)
        #[arg(short = 'j', long)]
        parallel: Option<usize>,

        /// Print each platform's plan without opening a browser
        #[arg(long)]
        dry_run: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the available platforms
    List,

    /// Validate workflow files without running them
    Validate {
        /// Workflow file or directory (default: every known workflow)
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },

    /// Print a platform's workflow definition
    Show {
        #[arg(value_name = "PLATFORM")]
        platform: String,

        /// Print as JSON instead of YAML
        #[arg(long)]
        json: bool,
    },
}

fn log_filter(verbose: bool) -> &'static str {
    if verbose {
        "upload_actions=debug"
    } else {
        "upload_actions=info"
    }
}

#[cfg(feature = "otel")]
fn init_otel_tracing(verbose: bool) -> anyhow::Result<()> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::runtime::Tokio;
    use opentelemetry_sdk::trace::TracerProvider;

    let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&otlp_endpoint)
        .build()?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, Tokio)
        .build();

    let tracer = provider.tracer("upload-actions");
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry()
        .with(EnvFilter::new(log_filter(verbose)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(otel_layer)
        .init();

    opentelemetry::global::set_tracer_provider(provider);
    Ok(())
}

#[cfg(not(feature = "otel"))]
fn init_tracing(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_filter(verbose)))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    #[cfg(feature = "otel")]
    if let Err(e) = init_otel_tracing(cli.verbose) {
        eprintln!("Failed to set up OpenTelemetry: {}", e);
        return ExitCode::from(2);
    }

    #[cfg(not(feature = "otel"))]
    init_tracing(cli.verbose);

    let result = run(cli).await;

    #[cfg(feature = "otel")]
    opentelemetry::global::shutdown_tracer_provider();

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!(error = %e, "Setup failed");
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(dir) = cli.workflows {
        config.workflows_dir = Some(dir);
    }

    match cli.command {
        Commands::Run {
            platforms,
            metadata,
            video,
            parallel,
            dry_run,
            json,
        } => {
            if !platforms.is_empty() {
                config.platforms = platforms;
            }
            if metadata.is_some() {
                config.payload.metadata = metadata;
            }
            if video.is_some() {
                config.payload.video = video;
            }
            if let Some(p) = parallel {
                config.parallel = p;
            }
            publish(config, dry_run, json).await
        }
        Commands::List => list_platforms(&config),
        Commands::Validate { path } => validate(path, &config),
        Commands::Show { platform, json } => show(&platform, json, &config),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RunnerConfig> {
    match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Ok(RunnerConfig::load(path)?)
        }
        None => {
            let default = Path::new("runner.yaml");
            if default.exists() {
                tracing::debug!("Using config: {}", default.display());
                Ok(RunnerConfig::load(default)?)
            } else {
                Ok(RunnerConfig::default())
            }
        }
    }
}

#[tracing::instrument(skip_all, fields(platforms = ?config.platforms, dry_run = dry_run))]
async fn publish(config: RunnerConfig, dry_run: bool, json: bool) -> anyhow::Result<bool> {
    let catalog = Catalog::load(config.workflows_dir.as_deref())?;
    let workflows = catalog.select(&config.platforms)?;

    let Some(metadata_path) = config.payload.metadata.as_ref() else {
        anyhow::bail!("No metadata file given (use --metadata or payload.metadata)");
    };
    let Some(video) = config.payload.video.clone() else {
        anyhow::bail!("No video file given (use --video or payload.video)");
    };
    let payload = TextFileMetadata::new(metadata_path).load()?.into_payload(video);

    if dry_run {
        let plans: Vec<_> = workflows.iter().map(|w| plan(w, &payload)).collect();
        if json {
            println!("{}", serde_json::to_string_pretty(&plans)?);
        } else {
            for p in &plans {
                print_plan(p);
            }
        }
        return Ok(true);
    }

    if !payload.file.exists() {
        anyhow::bail!("Video file not found: {}", payload.file.display());
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling runs");
            on_interrupt.cancel();
        }
    });

    let playwright = config.session.playwright.clone();
    let results = if config.is_isolated() {
        let factory = Arc::new(PlaywrightFactory::new(playwright));
        Orchestrator::isolated(workflows, factory, config.parallel)
            .with_cancel(cancel)
            .run(Arc::new(payload))
            .await
    } else {
        let session = Arc::new(PlaywrightSession::start(&playwright).await?);
        let results = Orchestrator::new(workflows, session.clone())
            .with_cancel(cancel)
            .run(Arc::new(payload))
            .await;
        if let Err(e) = session.close().await {
            tracing::warn!("Browser did not close cleanly: {}", e);
        }
        results
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_results(&results);
    }

    Ok(results.iter().all(|r| r.succeeded))
}

fn list_platforms(config: &RunnerConfig) -> anyhow::Result<bool> {
    let catalog = Catalog::load(config.workflows_dir.as_deref())?;

    println!("Platforms:\n");
    for workflow in catalog.workflows() {
        let selected = config.platforms.is_empty() || config.platforms.contains(&workflow.name);
        println!(
            "  {} {:<10} {} step(s){}",
            if selected { "*" } else { " " },
            workflow.name,
            workflow.steps.len(),
            workflow
                .description
                .as_ref()
                .map(|d| format!(" - {}", d))
                .unwrap_or_default()
        );
    }
    Ok(true)
}

fn validate(path: Option<PathBuf>, config: &RunnerConfig) -> anyhow::Result<bool> {
    let workflows = match path {
        Some(path) if path.is_dir() => WorkflowLoader::load_directory(&path)?,
        Some(path) if path.exists() => vec![WorkflowLoader::load_file(&path)?],
        Some(path) => anyhow::bail!("Path not found: {}", path.display()),
        None => Catalog::load(config.workflows_dir.as_deref())?
            .workflows()
            .to_vec(),
    };

    if workflows.is_empty() {
        println!("No workflows found");
        return Ok(true);
    }

    for workflow in &workflows {
        println!("✓ {} ({} steps)", workflow.name, workflow.steps.len());
    }
    println!("\n{} workflow(s) validated", workflows.len());
    Ok(true)
}

fn show(platform: &str, json: bool, config: &RunnerConfig) -> anyhow::Result<bool> {
    let catalog = Catalog::load(config.workflows_dir.as_deref())?;
    let Some(workflow) = catalog.get(platform) else {
        return Err(ExecutorError::UnknownPlatform(platform.to_string()).into());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(workflow)?);
    } else {
        print!("{}", serde_yaml::to_string(workflow)?);
    }
    Ok(true)
}

fn print_plan(plan: &upload_actions::engine::Plan) {
    println!("=== {} ===\n", plan.platform);
    println!("Post text:\n{}\n", plan.post);
    for step in &plan.steps {
        print_planned_step(step, "  ");
    }
    println!("  success: {}", plan.success);
    if let Some(result) = &plan.result {
        println!("  result: {}", result);
    }
    println!();
}

fn print_planned_step(step: &upload_actions::engine::PlannedStep, indent: &str) {
    println!("{}- {}", indent, step.step_id);
    if let Some(wait) = &step.wait {
        println!("{}    wait: {}", indent, wait);
    }
    if let Some(action) = &step.action {
        println!("{}    do: {}", indent, action);
    }
    if let Some(verify) = &step.verify {
        println!("{}    verify: {}", indent, verify);
    }
    println!("{}    on failure: {}", indent, step.on_failure);
    if let Some(alt) = &step.fallback {
        print_planned_step(alt, &format!("{}      ", indent));
    }
}

fn print_results(results: &[UploadResult]) {
    println!("\n=== Results ===\n");

    for result in results {
        let mark = match result.status() {
            "succeeded" => "✓",
            "ambiguous" => "?",
            _ => "✗",
        };
        match (&result.failure_kind, &result.result_identifier) {
            (None, Some(id)) => println!("  {} {:<10} {}", mark, result.platform, id),
            (None, None) => println!("  {} {:<10}", mark, result.platform),
            (Some(kind), _) => {
                let at = result
                    .failed_at_step_id
                    .as_ref()
                    .map(|s| format!(" at step '{}'", s))
                    .unwrap_or_default();
                println!("  {} {:<10} {}{}", mark, result.platform, kind, at);
                if let Some(message) = &result.message {
                    println!("      {}", message);
                }
            }
        }
    }

    let succeeded = results.iter().filter(|r| r.succeeded).count();
    println!("\nOverall: {}/{} succeeded", succeeded, results.len());
    if results.iter().any(|r| r.is_ambiguous()) {
        println!("Check '?' platforms by hand: the post may have been published.");
    }
}
