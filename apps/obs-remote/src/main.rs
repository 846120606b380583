//! OBS Remote - headless command-line client for the OBS websocket plugin.
//!
//! Either monitors the remote application (printing every event as a JSON
//! line) or issues a single command once the local mirror is synchronized.

mod config;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use obs_remote_core::{AudioChannel, ConnectionEvent, ConnectionState, RemoteClient};
use tokio::signal;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;

use crate::config::ClientConfig;

/// How long a one-shot command waits for the mirror to synchronize.
const SYNC_TIMEOUT: Duration = Duration::from_secs(10);

/// How long shutdown waits for the socket to close.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// OBS Remote - Control a streaming application over its websocket plugin.
#[derive(Parser, Debug)]
#[command(name = "obs-remote")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "warn", env = "OBS_REMOTE_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Host running the streaming application (overrides config file).
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Websocket plugin port (overrides config file).
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Handshake password (overrides config file).
    #[arg(long, env = "OBS_REMOTE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every event as a JSON line until interrupted.
    Monitor,
    /// Print the synchronized remote state as JSON.
    Status,
    #[command(flatten)]
    Action(Action),
}

/// One-shot commands issued once the remote state is synchronized.
#[derive(Subcommand, Debug)]
enum Action {
    /// Switch to a scene by name.
    Scene { name: String },
    /// Control the broadcast.
    Stream {
        #[arg(value_enum, default_value = "toggle")]
        action: OutputAction,
    },
    /// Control preview-only mode.
    Preview {
        #[arg(value_enum, default_value = "toggle")]
        action: OutputAction,
    },
    /// Mute an audio channel (microphone or desktop).
    Mute { channel: AudioChannel },
    /// Unmute an audio channel (microphone or desktop).
    Unmute { channel: AudioChannel },
    /// Set the volume of an audio channel (0.0 - 1.0).
    Volume { channel: AudioChannel, volume: f64 },
    /// Make a source of the current scene visible.
    Show { source: String },
    /// Hide a source of the current scene.
    Hide { source: String },
    /// Reorder the current scene's sources by name.
    Order {
        #[arg(required = true)]
        sources: Vec<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputAction {
    Start,
    Stop,
    Toggle,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("OBS Remote v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ClientConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(password) = args.password {
        config.password = Some(password);
    }

    log::info!(
        "Configuration: host={}, port={}, password={}",
        config.host,
        config.port,
        if config.password.is_some() { "set" } else { "none" }
    );

    let client =
        RemoteClient::start(config.to_core_config()).context("Failed to start remote client")?;

    let outcome = match args.command {
        Command::Monitor => monitor(&client).await,
        Command::Status => status(&client).await,
        Command::Action(action) => run_once(&client, action).await,
    };

    log::info!("Shutting down...");
    shutdown(&client).await;
    outcome
}

/// Prints every engine event until Ctrl+C or SIGTERM.
async fn monitor(client: &RemoteClient) -> Result<()> {
    let mut events = client.events().subscribe();
    let signal = shutdown_signal();
    tokio::pin!(signal);

    loop {
        tokio::select! {
            _ = &mut signal => return Ok(()),
            event = events.recv() => match event {
                Ok(event) => println!("{}", serde_json::to_string(&event)?),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    log::warn!("Monitor lagged, {} event(s) dropped", n);
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            },
        }
    }
}

/// Prints the synchronized mirror snapshot.
async fn status(client: &RemoteClient) -> Result<()> {
    wait_for_sync(client).await?;
    println!("{}", serde_json::to_string_pretty(&*client.snapshot())?);
    Ok(())
}

/// Waits for synchronization, then issues a single command.
async fn run_once(client: &RemoteClient, action: Action) -> Result<()> {
    wait_for_sync(client).await?;

    let sent = match action {
        Action::Scene { name } => {
            if !client.snapshot().scenes.iter().any(|s| s.name == name) {
                bail!("No scene named '{}'", name);
            }
            client.set_scene_by_name(&name)
        }
        Action::Stream { action } => match action {
            OutputAction::Start => client.start_stream(),
            OutputAction::Stop => client.stop_stream(),
            OutputAction::Toggle => client.toggle_stream(),
        },
        Action::Preview { action } => match action {
            OutputAction::Start => client.start_preview(),
            OutputAction::Stop => client.stop_preview(),
            OutputAction::Toggle => client.toggle_preview(),
        },
        Action::Mute { channel } => client.mute(channel),
        Action::Unmute { channel } => client.unmute(channel),
        Action::Volume { channel, volume } => client.set_volume(channel, volume, true),
        Action::Show { source } => client.set_source_visible_by_name(&source),
        Action::Hide { source } => client.set_source_invisible_by_name(&source),
        Action::Order { sources } => client.set_source_order_by_name(&sources),
    };

    println!("{}", if sent { "sent" } else { "nothing to do" });
    Ok(())
}

/// Waits until the mirror holds a full bootstrap, failing fast on a rejected
/// password.
async fn wait_for_sync(client: &RemoteClient) -> Result<()> {
    // Subscribe before checking for an earlier failure so none slips between.
    let mut connection = Box::pin(client.events().connection_events());
    if let Some(message) = client.authentication_failure() {
        bail!("Authentication failed: {}", message);
    }
    let auth_failed = async {
        while let Some(event) = connection.next().await {
            if let ConnectionEvent::AuthenticationFailed { message, .. } = event {
                return message;
            }
        }
        std::future::pending().await
    };

    tokio::select! {
        _ = client.mirror().wait_until_synced() => Ok(()),
        message = auth_failed => bail!("Authentication failed: {}", message),
        _ = tokio::time::sleep(SYNC_TIMEOUT) => {
            bail!(
                "Timed out after {}s waiting for the remote state (connection: {:?})",
                SYNC_TIMEOUT.as_secs(),
                client.state()
            )
        }
        _ = shutdown_signal() => bail!("Interrupted"),
    }
}

/// Requests shutdown and waits briefly for the socket to close.
async fn shutdown(client: &RemoteClient) {
    let mut state = client.watch_state();
    client.shutdown();
    let closed = state.wait_for(|s| *s == ConnectionState::Disconnected);
    if tokio::time::timeout(CLOSE_TIMEOUT, closed).await.is_err() {
        log::warn!("Socket did not close within {}s", CLOSE_TIMEOUT.as_secs());
    }
    log::info!("Shutdown complete");
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
