//! rdfm device daemon
//!
//! Periodically asks the management server for updates, installs offered artifacts and
//! keeps the device token fresh.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use eyre::WrapErr;
use kameo::actor::ActorRef;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use rdfm_api::AuthToken;
use rdfm_client::ServerClient;
use rdfm_core::{
    CredentialActor, Poller, PollerArgs, PollerHandle, Reauthenticate, UpdateChecker,
};

mod collaborators;
mod config;

use collaborators::{CommandAuthenticator, CommandInstaller, ConfigMetadataProvider};
use config::{CONFIG_ENV, Config, DaemonConfig, LogFormat};

/// rdfm device daemon
#[derive(Parser, Debug)]
#[command(name = "rdfmd", version, about)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Log level, overriding the configuration file
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    let path = args.config.clone().or_else(Config::locate);
    let config = match &path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    init_tracing(&config.daemon, args.log_level.as_deref());

    match &path {
        Some(path) => info!(path = %path.display(), "loaded configuration"),
        None => warn!("no config file found, using defaults"),
    }

    config.validate()?;

    let client = ServerClient::with_timeout(&config.server.url, config.server.request_timeout())
        .wrap_err("failed to create server client")?;
    let installer = Arc::new(CommandInstaller::new(&config.commands));

    let poller = Poller::new(PollerArgs {
        config: config.poller_config(),
        metadata: Arc::new(ConfigMetadataProvider::new(&config.device)),
        checker: Arc::new(UpdateChecker::new(client, installer)),
        authenticator: Arc::new(CommandAuthenticator::new(&config.commands)),
        initial_token: config.server.initial_token.clone().map(AuthToken::from),
    });

    info!(server = %config.server.url, "rdfmd starting");
    let handle = poller.spawn();

    wait_for_shutdown(&handle).await?;

    handle.shutdown().await?;
    info!("rdfmd stopped");
    Ok(())
}

/// Install the tracing subscriber; `RUST_LOG` takes precedence over the configuration
fn init_tracing(config: &DaemonConfig, level_override: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_override.unwrap_or(&config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Re-authenticate on a separate task, off the signal loop
#[cfg_attr(not(unix), allow(dead_code))]
fn spawn_reauthentication(credentials: ActorRef<CredentialActor>) -> JoinHandle<()> {
    tokio::spawn(async move {
        match credentials.ask(Reauthenticate).await {
            Ok(()) => info!("manual re-authentication succeeded"),
            Err(e) => warn!(error = %e, "manual re-authentication failed"),
        }
    })
}

/// Block until Ctrl-C or SIGTERM; SIGHUP forces a re-authentication
#[cfg(unix)]
async fn wait_for_shutdown(handle: &PollerHandle) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("received Ctrl-C, shutting down");
                return Ok(());
            }
            _ = terminate.recv() => {
                info!("received SIGTERM, shutting down");
                return Ok(());
            }
            _ = hangup.recv() => {
                info!("received SIGHUP, re-authenticating");
                spawn_reauthentication(handle.credentials().clone());
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown(_handle: &PollerHandle) -> Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("received Ctrl-C, shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use kameo::actor::Spawn;

    use rdfm_core::{Authenticator, CoreError, CredentialActorArgs, CurrentToken};

    use super::*;

    struct HungAuthenticator;

    #[async_trait]
    impl Authenticator for HungAuthenticator {
        async fn authenticate(&self) -> Result<AuthToken, CoreError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_reauthentication_does_not_block_caller() {
        let credentials = CredentialActor::spawn(CredentialActorArgs {
            authenticator: Arc::new(HungAuthenticator),
            initial_token: Some(AuthToken::new("persisted")),
            handshake_timeout: Duration::from_millis(200),
        });

        let task = spawn_reauthentication(credentials.clone());
        assert!(!task.is_finished());

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();

        let snapshot = credentials.ask(CurrentToken).await.unwrap();
        assert_eq!(snapshot.token.as_str(), "persisted");

        credentials.stop_gracefully().await.unwrap();
    }
}
