mod config;
mod daemon;
mod logging;
mod publisher;
mod signals;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use aegis_license::{
    Feature, LICENSE_GATE_VERSION, LicenseError, LicenseGate, LicenseQueryApi, MAX_TOKEN_BYTES,
    ParsedToken, PipelineOutcome, features_for, render_all,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use time::format_description::well_known::Rfc3339;

use crate::config::{AppConfig, CliOverrides};
use crate::daemon::Daemon;
use crate::publisher::AttributePublisher;

/// Aegis license gate daemon
#[derive(Parser)]
#[command(name = "aegis-licensed")]
#[command(about = "Aegis OS license gate: validates the license token and publishes the active tier")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Token file override (overrides config)
    #[arg(long)]
    token_path: Option<PathBuf>,

    /// Attribute directory override (overrides config)
    #[arg(long)]
    attributes_dir: Option<PathBuf>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the token, publish attributes and keep them current
    Run,
    /// Run the pipeline once and print the attributes
    Status,
    /// Validate a token file without activating it
    Verify {
        /// Token file to check, or `-` for stdin
        path: PathBuf,
    },
    /// Validate configuration and the trusted key, then exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Layered config:
    // 1) defaults -> 2) YAML (if provided) -> 3) env (AEGIS__*) -> 4) CLI overrides
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli_overrides(&CliOverrides {
        token_path: cli.token_path.clone(),
        attributes_dir: cli.attributes_dir.clone(),
        verbose: cli.verbose,
    });

    logging::init_logging(&config.logging);

    if cli.print_config {
        println!("Effective configuration:\n{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_daemon(config).await,
        Commands::Status => print_status(&config),
        Commands::Verify { path } => verify_token(&config, &path),
        Commands::Check => check_config(&config),
    }
}

fn build_gate(config: &AppConfig) -> Result<LicenseGate> {
    LicenseGate::new(config.license.clone()).context("failed to load trusted key")
}

async fn run_daemon(config: AppConfig) -> Result<()> {
    tracing::info!(version = LICENSE_GATE_VERSION, "Aegis license gate starting");

    let gate = Arc::new(build_gate(&config)?);
    let publisher = config.publish.enabled.then(|| {
        AttributePublisher::new(config.publish.attributes_dir.clone(), LICENSE_GATE_VERSION)
    });
    let reload_interval = config
        .publish
        .reload_interval_secs
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs);

    if let Some(publisher) = &publisher {
        tracing::info!(dir = %publisher.dir().display(), "publishing license attributes");
    }

    Daemon::new(gate, publisher, reload_interval).run().await?;
    tracing::info!("Aegis license gate stopped");
    Ok(())
}

fn print_status(config: &AppConfig) -> Result<()> {
    let gate = build_gate(config)?;
    let outcome = gate.init();

    match &outcome {
        PipelineOutcome::Activated { tier, .. } => println!("result: activated ({tier})"),
        PipelineOutcome::TokenAbsent => {
            println!("result: no token at {}", config.license.token_path.display());
        }
        PipelineOutcome::Rejected(e) => {
            println!("result: rejected ({}): {e}", e.kind().as_str());
        }
        PipelineOutcome::LoadFailed(e) => println!("result: load failed: {e}"),
    }

    let state = gate.snapshot();
    for (attr, value) in render_all(&state, gate.current_version()) {
        println!("[{}]", attr.name());
        print!("{value}");
    }

    gate.shutdown();
    Ok(())
}

fn verify_token(config: &AppConfig, path: &Path) -> Result<()> {
    let gate = build_gate(config)?;

    let result = if path.as_os_str() == "-" {
        let bytes = read_stdin_token()?;
        gate.verify_bytes(&bytes).map_err(LicenseError::from)
    } else {
        gate.verify_file(path)
    };
    let token = match result {
        Ok(token) => token,
        Err(LicenseError::Validation(e)) => {
            anyhow::bail!("token rejected ({}): {e}", e.kind().as_str())
        }
        Err(e) => return Err(e).context("failed to read token"),
    };
    print_token(&token)
}

/// Read at most one byte past the token bound; the validator rejects the overflow.
fn read_stdin_token() -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    std::io::stdin()
        .lock()
        .take(MAX_TOKEN_BYTES as u64 + 1)
        .read_to_end(&mut bytes)
        .context("failed to read token from stdin")?;
    Ok(bytes)
}

fn print_token(token: &ParsedToken) -> Result<()> {
    let expires = token
        .expires_at()
        .format(&Rfc3339)
        .context("failed to format expiry")?;

    println!("valid: yes");
    println!("issuer: {}", token.issuer());
    println!("audience: {}", token.audiences().join(", "));
    println!("expires: {expires}");
    if let Some(subject) = token.subject() {
        println!("subject: {subject}");
    }
    println!("tier_claim: {}", token.tier_claim());
    println!("tier: {}", token.tier().status_name());
    let features: Vec<_> = features_for(token.tier()).iter().map(Feature::as_str).collect();
    println!("features: {}", features.join(","));
    Ok(())
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    let gate = build_gate(config)?;
    println!("Configuration is valid");
    println!("trusted key: {}", gate.key_source());
    println!("{}", config.to_yaml()?);
    Ok(())
}
