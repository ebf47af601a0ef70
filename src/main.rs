//! AgentCred CLI
//!
//! Thin commands over the library: initialize an identity, sign content,
//! verify an envelope, show the current identity.

use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use agentcred::config::AgentCredConfig;
use agentcred::crypto::{self, PublicJwk};
use agentcred::envelope;
use agentcred::identity;
use agentcred::oauth::{self, DeviceFlowOptions};
use agentcred::storage::{FsKeyStore, KeyStore};
use agentcred::types::{Envelope, SignIdentity, SignOptions, Verification};

/// Human accountability badge for AI agents.
#[derive(Parser, Debug)]
#[command(name = "agentcred", version, about = "Human accountability badge for AI agents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize identity with GitHub (device flow, or --token)
    Init {
        /// GitHub personal access token (or set GITHUB_TOKEN)
        #[arg(long)]
        token: Option<String>,
        /// Output result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sign content from a file or stdin
    Sign {
        /// File to sign; stdin when omitted
        file: Option<PathBuf>,
        /// Agent name recorded in the envelope
        #[arg(long)]
        agent: Option<String>,
    },
    /// Verify an AgentCred envelope from a file or stdin
    Verify {
        /// Envelope file; stdin when omitted
        file: Option<PathBuf>,
        /// Verify offline against a local public key instead of the registry
        #[arg(long)]
        offline: bool,
        /// Path to a public key JWK file (with --offline)
        #[arg(long)]
        key: Option<PathBuf>,
        /// Output result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the current identity
    Whoami {
        /// Output result as JSON
        #[arg(long)]
        json: bool,
    },
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            if std::io::stdin().is_terminal() {
                bail!("No input provided. Pass a file argument or pipe content via stdin.");
            }
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("failed to read stdin")?;
            Ok(input)
        }
    }
}

/// First stored identity, the way the original CLI picks one.
fn current_account(storage: &dyn KeyStore) -> Result<String> {
    let accounts = storage.list()?;
    accounts
        .into_iter()
        .next()
        .context("No identity found. Run 'agentcred init' first.")
}

async fn init_command(token: Option<String>, json: bool, config: &AgentCredConfig) -> Result<()> {
    let token = match token.or_else(|| std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()))
    {
        Some(token) => token,
        None => {
            let options = DeviceFlowOptions {
                on_user_code: Some(Box::new(|code, uri| {
                    println!("! First, copy your one-time code: {}", code.bold());
                    println!("Opening {uri} in your browser...");
                })),
                ..DeviceFlowOptions::default()
            };
            oauth::start_device_flow(options, config).await?.access_token
        }
    };

    let storage = FsKeyStore::open_default();
    let identity = identity::create_identity(&token, config, &storage).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "username": identity.github.username,
                "fingerprint": identity.fingerprint,
                "registeredAt": identity.registered_at,
            }))?
        );
    } else {
        println!(
            "{} Identity created for @{}",
            "✓".green(),
            identity.github.username
        );
    }
    Ok(())
}

async fn sign_command(
    file: Option<PathBuf>,
    agent: Option<String>,
    config: &AgentCredConfig,
) -> Result<()> {
    let content = read_input(file.as_ref())?;
    let storage = FsKeyStore::open_default();
    let account = current_account(&storage)?;

    let loaded = identity::load_identity(&account, config, &storage)
        .await?
        .context("No identity found. Run 'agentcred init' first.")?;

    let envelope = envelope::sign(
        &content,
        &SignIdentity {
            signing_key: loaded.signing_key,
            github: account,
        },
        Some(SignOptions {
            agent,
            content_type: None,
        }),
    )?;

    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

async fn verify_command(
    file: Option<PathBuf>,
    offline: bool,
    key: Option<PathBuf>,
    json: bool,
    config: &AgentCredConfig,
) -> Result<ExitCode> {
    let input = read_input(file.as_ref())?;
    let envelope: Envelope = serde_json::from_str(&input)
        .context("Invalid JSON input. Expected an AgentCred envelope.")?;

    let result = if offline {
        let key_path = key.context("--offline requires --key <path>")?;
        let jwk_data = std::fs::read_to_string(&key_path)
            .with_context(|| format!("failed to read {}", key_path.display()))?;
        let jwk: PublicJwk = serde_json::from_str(&jwk_data).context("invalid public key JWK")?;
        let public_key = jwk.to_verifying_key()?;
        envelope::verify_offline(&envelope, &public_key)
    } else {
        envelope::verify(&envelope, config).await
    };

    match result {
        Verification::Verified {
            github,
            agent,
            signed_at,
        } => {
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "verified": true,
                        "github": github,
                        "agent": agent,
                        "signedAt": signed_at.to_rfc3339(),
                    }))?
                );
            } else {
                println!(
                    "{} Signed by @{} (agent: {}, signed at: {})",
                    "✓".green(),
                    github.username,
                    agent,
                    signed_at.to_rfc3339()
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Verification::Failed { reason } => {
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "verified": false,
                        "error": reason.to_string(),
                    }))?
                );
            } else {
                eprintln!("{} {}", "✗".red(), reason);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn whoami_command(json: bool) -> Result<()> {
    let storage = FsKeyStore::open_default();
    let account = current_account(&storage)?;

    let private_jwk = storage
        .load(&account)?
        .context("No identity configured. Run 'agentcred init' first.")?;
    let fingerprint = crypto::fingerprint(&private_jwk.public_jwk())?;
    let short = &fingerprint[..16];

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "username": account,
                "fingerprint": short,
                "keyPath": storage.key_dir().join(format!("{account}.jwk")),
            }))?
        );
    } else {
        println!("You are @{account} (fingerprint: {short})");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AgentCredConfig::from_env();

    let outcome = match cli.command {
        Commands::Init { token, json } => init_command(token, json, &config)
            .await
            .map(|_| ExitCode::SUCCESS),
        Commands::Sign { file, agent } => sign_command(file, agent, &config)
            .await
            .map(|_| ExitCode::SUCCESS),
        Commands::Verify {
            file,
            offline,
            key,
            json,
        } => verify_command(file, offline, key, json, &config).await,
        Commands::Whoami { json } => whoami_command(json).map(|_| ExitCode::SUCCESS),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", "✗".red());
            ExitCode::FAILURE
        }
    }
}
