use anyhow::Context;
use clap::{Parser, Subcommand};
use lib::agent::{AgentService, CozeClient};
use lib::auth::{CredentialManager, JwtOAuthApp};
use lib::channels::TelegramChannel;
use lib::config::{self, RelaySettings, AGENT_BOT_ID};
use lib::operator::ConsoleOperator;
use lib::relay::{Relay, RelayError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Exit code when the OAuth config file does not exist at startup.
const EXIT_MISSING_CONFIG: i32 = 1;
/// Exit code for any other fatal error.
const EXIT_FATAL: i32 = 2;

#[derive(Parser)]
#[command(name = "relay")]
#[command(about = "Relay chat messages to an agent; every reply is approved by a human", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Watch the chat channel and draft replies for operator approval. Needs TELEGRAM_BOT_TOKEN.
    Run {
        /// OAuth app config file (default: coze_oauth_config.json in the working directory)
        #[arg(long, short, value_name = "PATH")]
        oauth_config: Option<PathBuf>,
    },

    /// Load the OAuth app config and perform one token exchange.
    Check {
        /// OAuth app config file (default: coze_oauth_config.json in the working directory)
        #[arg(long, short, value_name = "PATH")]
        oauth_config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("relay {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Run { oauth_config }) => {
            let path = config::oauth_config_path(oauth_config);
            if !path.exists() {
                eprintln!("error: oauth config file not found: {}", path.display());
                std::process::exit(EXIT_MISSING_CONFIG);
            }
            match run_relay(path).await {
                Ok(()) => {
                    println!("Relay stopped.");
                    std::process::exit(0);
                }
                Err(e) => {
                    log::error!("relay failed: {:#}", e);
                    eprintln!("error: {:#}", e);
                    std::process::exit(EXIT_FATAL);
                }
            }
        }
        Some(Commands::Check { oauth_config }) => {
            let path = config::oauth_config_path(oauth_config);
            if let Err(e) = run_check(path).await {
                log::error!("check failed: {:#}", e);
                eprintln!("error: {:#}", e);
                std::process::exit(EXIT_FATAL);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_relay(oauth_config: PathBuf) -> anyhow::Result<()> {
    println!("Starting relay (agent drafts, human approval)...");
    println!("- OAuth config: {}", oauth_config.display());
    println!("- Agent bot id: {}", AGENT_BOT_ID);
    println!("Every draft is shown here first; nothing is sent without your confirmation.");
    tokio::time::sleep(Duration::from_secs(2)).await;

    let settings = RelaySettings::default();
    let token = config::resolve_telegram_token()
        .context("TELEGRAM_BOT_TOKEN is not set; the chat channel cannot be read")?;
    let driver =
        Arc::new(TelegramChannel::new(Some(token), &settings).context("building chat channel")?);
    let agent = Arc::new(CozeClient::new(None, &settings).context("building agent client")?);
    let operator = Box::new(ConsoleOperator::new());
    let credentials = CredentialManager::new(oauth_config);

    let mut relay = Relay::new(driver, agent, operator, credentials, settings);
    println!("Relay running; waiting for messages.");
    match relay.run().await {
        Ok(()) => Ok(()),
        Err(RelayError::OperatorClosed) => {
            log::info!("operator input closed, stopping");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_check(oauth_config: PathBuf) -> anyhow::Result<()> {
    let settings = RelaySettings::default();
    let app = JwtOAuthApp::load(&oauth_config)
        .with_context(|| format!("loading oauth app from {}", oauth_config.display()))?;
    println!("Loaded OAuth app {} ({})", app.client_id(), app.api_base());
    let client = CozeClient::new(None, &settings).context("building agent client")?;
    client
        .exchange_credential(&app)
        .await
        .context("exchanging credential")?;
    println!("Token exchange succeeded.");
    Ok(())
}
