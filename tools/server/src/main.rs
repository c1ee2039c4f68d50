//! passweb - single-user password vault server.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use passweb_crypto::KdfParams;
use passweb_server::{router, AppState};
use passweb_vault::{Vault, VaultConfig};

#[derive(Parser)]
#[command(name = "passweb")]
#[command(about = "passweb - Encrypted password vault over HTTP")]
#[command(version)]
struct Cli {
    /// Port to listen on.
    #[arg(short, long, env = "PASSWEB_PORT", default_value_t = 8080)]
    port: u16,

    /// Vault directory.
    #[arg(long, env = "PASSWEB_VAULT", default_value = "./vault")]
    vault: PathBuf,

    /// Address to bind to.
    #[arg(long, default_value = "127.0.0.1")]
    bind: IpAddr,

    /// Argon2id cost for new vaults.
    #[arg(long, value_enum, default_value_t = KdfStrength::Standard)]
    strength: KdfStrength,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

/// Argon2id cost presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KdfStrength {
    /// 64 MiB, 3 iterations.
    Standard,
    /// 256 MiB, 4 iterations.
    Sensitive,
}

impl KdfStrength {
    fn params(self) -> KdfParams {
        match self {
            Self::Standard => KdfParams::standard(),
            Self::Sensitive => KdfParams::sensitive(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting passweb");

    let vault = Vault::open(&cli.vault, vault_config(cli.strength))
        .await
        .with_context(|| format!("Failed to open vault at {}", cli.vault.display()))?;
    let vault = Arc::new(vault);

    if !vault.is_initialized().await.context("Failed to read vault metadata")? {
        info!("Vault is not set up yet; POST /api/v1/setup to create it");
    }

    let address = SocketAddr::new(cli.bind, cli.port);
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!(address = %address, vault = %cli.vault.display(), "Listening");

    let app = router(AppState::new(vault.clone()));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    vault.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

fn vault_config(strength: KdfStrength) -> VaultConfig {
    VaultConfig {
        password_kdf: strength.params(),
        data_kdf: strength.params(),
        ..VaultConfig::default()
    }
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async { signal::ctrl_c().await.context("Failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    let result = tokio::select! {
        res = ctrl_c => res,
        res = terminate => res,
    };

    match result {
        Ok(()) => info!("Shutdown signal received, stopping"),
        Err(e) => {
            error!(error = %e, "Error while waiting for shutdown signal");
            // Keep serving.
            std::future::pending::<()>().await;
        }
    }
}
