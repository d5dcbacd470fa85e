use anyhow::{Context, Result};
use api_token_provider::config::loader::load_config;
use api_token_provider::resilience::retry::RetrySettings;
use api_token_provider::server;
use api_token_provider::utils::logging::{self, LogLevel};
use api_token_provider::{AuthorizedClient, TokenProvider};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG")]
    config: Option<String>,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a valid bearer token
    Token,
    /// Acquire a token and print its expiry, not the token
    Status,
    /// GET a backend path with the bearer token and print the body
    Get { path: String },
    /// Serve /token, /token/status and metrics over HTTP
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load settings, init logging
    // -------------------------------

    let args = Args::parse();
    let service_config = load_config(args.config.as_deref()).await?;
    logging::run(&service_config, args.log_level);
    let settings = &service_config.settings;

    // -------------------------------
    // 2. Build the provider
    // -------------------------------

    let provider = TokenProvider::from_settings(settings)?;
    let retry = RetrySettings::from(settings.retry.as_ref());

    // -------------------------------
    // 3. Run the command
    // -------------------------------

    match args.command {
        Command::Token => {
            let token = retry.run_with_retry(|| provider.get_valid_token()).await?;
            println!("{}", token);
        }
        Command::Status => {
            retry.run_with_retry(|| provider.get_valid_token()).await?;
            let token = provider.cached().await.context("token cache is empty after refresh")?;
            println!(
                "expires_at={} seconds_remaining={}",
                token.exp_unix_ts,
                token.seconds_remaining(provider.now())
            );
        }
        Command::Get { path } => {
            let client = AuthorizedClient::new(provider);
            let response = retry.run_with_retry(|| client.get(&path)).await?;
            let status = response.status();
            let body = response.text().await.context("cannot read backend response")?;
            info!(status = %status, path = %path, "backend answered");
            println!("{}", body);
            if !status.is_success() {
                anyhow::bail!("backend returned {}", status);
            }
        }
        Command::Serve => {
            info!("Service starting...");
            server::server::start(settings, provider).await?;
        }
    }

    Ok(())
}
