//! ringside binary: signs in when credentials are provided, loads bouts and
//! follows live bout updates until interrupted.

use std::env;

use anyhow::Context;
use ringside::{
    config::ClientConfig,
    live::ConnectionStatus,
    state::{AppState, SharedState},
};
use tokio_stream::{StreamExt, wrappers::WatchStream};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ClientConfig::load();
    let state = AppState::new(config).context("building client")?;

    if let (Ok(username), Ok(password)) = (env::var("RINGSIDE_USERNAME"), env::var("RINGSIDE_PASSWORD")) {
        let outcome = state.auth().login(&username, &password).await;
        if outcome.success {
            info!(username = %username, role = ?state.auth().role(), "signed in");
        } else {
            warn!(
                username = %username,
                message = outcome.message.as_deref().unwrap_or_default(),
                "sign-in failed; continuing anonymously"
            );
        }
    }

    state.bouts().fetch_all().await;
    state.bouts().fetch_live().await;
    if let Some(err) = state.bouts().error() {
        warn!(error = %err, "initial bout load incomplete");
    }
    info!(
        bouts = state.bouts().bouts().len(),
        live = state.bouts().live_bouts().len(),
        "bouts loaded"
    );

    let watcher = tokio::spawn(follow_live(state.clone()));
    if let Err(err) = state.live().connect().await {
        warn!(error = %err, "live updates unavailable");
    }

    shutdown_signal().await;
    info!("shutting down");
    state.live().disconnect();
    watcher.abort();

    Ok(())
}

/// Subscribe to bout updates each time the live channel (re)connects.
async fn follow_live(state: SharedState) {
    let mut statuses = WatchStream::new(state.live().status_watcher());
    while let Some(status) = statuses.next().await {
        match status {
            ConnectionStatus::Connected => {
                if state.bouts().subscribe_to_bouts().is_some() {
                    info!(
                        live = state.bouts().live_bouts().len(),
                        "following live bouts"
                    );
                }
            }
            ConnectionStatus::Disconnected => {
                info!("live channel down; waiting for reconnect");
            }
            ConnectionStatus::Connecting => {}
        }
    }
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,ringside=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "SIGTERM handler unavailable; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
