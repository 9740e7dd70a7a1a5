/*
[INPUT]:  CLI arguments, optional YAML configuration file, wallet key env var
[OUTPUT]: Wallet sign-in, persisted session management, authenticated queries
[POS]:    Binary entry point
[UPDATE]: When changing CLI subcommands, startup flow, or shutdown handling
*/

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use contrib_auth::{
    AuthorizedClient, ContribClient, EvmWalletSigner, FileSessionStore, SessionAuthenticator,
    WalletSigner,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;

#[derive(Parser, Debug)]
#[command(name = "contrib-auth", version, about = "Contribution rewards wallet sign-in")]
struct Cli {
    #[arg(long = "config", value_name = "PATH")]
    config_path: Option<PathBuf>,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in with the private key named by `private_key_env`
    Login,
    /// Show the persisted session
    Status,
    /// Rotate the access and refresh tokens
    Refresh,
    /// Fetch the contributor profile
    Profile,
    /// Fetch points, redeemable tokens and recent contributions
    Dashboard,
    /// Clear the persisted session
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    let config = match &args.config_path {
        Some(path) => CliConfig::from_file(path).context("load config")?,
        None => CliConfig::default(),
    };
    let session_path = config.session_path()?;
    info!(
        api = %config.api_base_url,
        session_file = %session_path.display(),
        "starting contrib-auth"
    );

    let client = ContribClient::with_config_and_base_url(config.client_config(), &config.api_base_url)
        .context("create API client")?;
    let auth = SessionAuthenticator::init(
        Arc::new(client.clone()),
        Arc::new(FileSessionStore::new(&session_path)),
        config.auth.clone(),
    )
    .context("restore session")?;

    let shutdown = CancellationToken::new();
    setup_signal_handlers(shutdown.clone());

    tokio::select! {
        _ = shutdown.cancelled() => {
            warn!("interrupted; abandoning pending work");
            auth.teardown();
            Ok(())
        }
        result = run(args.command, &config, client, auth.clone()) => result,
    }
}

async fn run(
    command: Command,
    config: &CliConfig,
    client: ContribClient,
    auth: SessionAuthenticator,
) -> Result<()> {
    match command {
        Command::Login => {
            let key = std::env::var(&config.private_key_env)
                .with_context(|| format!("{} is not set", config.private_key_env))?;
            let signer = EvmWalletSigner::new(&key).context("load wallet key")?;
            let address = signer.address().to_string();
            let session = auth
                .authenticate(&address, Arc::new(signer))
                .await
                .context("sign in")?;
            println!("signed in as {}", session.wallet_address);
        }
        Command::Status => match auth.session() {
            Some(session) => {
                println!("wallet:  {}", session.wallet_address);
                match session.expires_at {
                    Some(expires_at) => println!("expires: {}", expires_at.to_rfc3339()),
                    None => println!("expires: unknown"),
                }
            }
            None => println!("not signed in"),
        },
        Command::Refresh => {
            let session = auth
                .refresh_access_token()
                .await
                .context("refresh tokens")?;
            println!("tokens refreshed for {}", session.wallet_address);
        }
        Command::Profile => {
            let profile = AuthorizedClient::new(client, auth)
                .get_profile()
                .await
                .context("fetch profile")?;
            println!("wallet:        {}", profile.wallet_address);
            if let Some(username) = &profile.username {
                println!("username:      {}", username);
            }
            println!("points:        {}", profile.total_points);
            println!("tokens:        {}", profile.token_balance);
            println!("contributions: {}", profile.contribution_count);
        }
        Command::Dashboard => {
            let dashboard = AuthorizedClient::new(client, auth)
                .get_dashboard()
                .await
                .context("fetch dashboard")?;
            println!("points:     {} ({} pending)", dashboard.total_points, dashboard.pending_points);
            println!("redeemable: {}", dashboard.redeemable_tokens);
            if let Some(rank) = dashboard.rank {
                println!("rank:       {}", rank);
            }
            for contribution in &dashboard.recent_contributions {
                println!(
                    "  {:<12} {:?} {:?} {} pts",
                    contribution.id,
                    contribution.contribution_type,
                    contribution.status,
                    contribution.points
                );
            }
        }
        Command::Logout => {
            auth.logout();
            println!("logged out");
        }
    }
    Ok(())
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn setup_signal_handlers(shutdown: CancellationToken) {
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install SIGINT handler");
            return;
        }
        info!("received SIGINT");
        shutdown_clone.cancel();
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    info!("received SIGTERM");
                    shutdown_clone.cancel();
                }
                Err(err) => {
                    warn!(error = %err, "failed to install SIGTERM handler");
                }
            }
        });
    }
}
