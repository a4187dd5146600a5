//! sharedraw server
//!
//! Hosts one shared canvas over two transports: a line protocol that pushes
//! every change to connected clients, and a framed request/response port for
//! clients that poll the version counter.
//!
//! # Usage
//!
//! ```bash
//! # Both transports on the default ports (push 1100, poll 1099)
//! sharedraw
//!
//! # JSON config plus overrides, with five simulated clients
//! sharedraw --config server.json --ghosts 5 --activity 80
//! ```

mod admin;
mod config;
mod ghost;
mod server;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use sharedraw_core::{Canvas, SnapshotStore};
use tokio::io::BufReader;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use admin::{AdminConsole, ConsoleExit};
use config::ServerConfig;
use server::{Server, ServerError};

/// Shared drawing canvas server
#[derive(Parser, Debug)]
#[command(name = "sharedraw")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file (JSON); flags below override it
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address to bind both listeners to
    #[arg(short, long)]
    bind: Option<IpAddr>,

    /// Line protocol port
    #[arg(long)]
    push_port: Option<u16>,

    /// Request/response port
    #[arg(long)]
    poll_port: Option<u16>,

    /// Disable the line protocol listener
    #[arg(long)]
    no_push: bool,

    /// Disable the request/response listener
    #[arg(long)]
    no_poll: bool,

    /// Snapshot file
    #[arg(long, value_name = "FILE")]
    snapshots: Option<PathBuf>,

    /// Default target of the `dump` console command
    #[arg(long, value_name = "FILE")]
    dump_path: Option<PathBuf>,

    /// Marker highlight lifetime in milliseconds
    #[arg(long)]
    marker_ms: Option<u64>,

    /// Number of simulated clients
    #[arg(long)]
    ghosts: Option<usize>,

    /// Ghost activity in percent
    #[arg(long)]
    activity: Option<u8>,

    /// Do not read admin commands from stdin
    #[arg(long)]
    no_console: bool,

    /// Write the effective configuration to FILE and exit
    #[arg(long, value_name = "FILE")]
    save_config: Option<PathBuf>,

    /// Log level filter, used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn load_config(&self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Loading config from {:?}", path);
                ServerConfig::from_file(path)?
            }
            None => ServerConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.bind_address = bind;
        }
        if let Some(port) = self.push_port {
            config.push_port = port;
        }
        if let Some(port) = self.poll_port {
            config.poll_port = port;
        }
        if self.no_push {
            config.push_enabled = false;
        }
        if self.no_poll {
            config.poll_enabled = false;
        }
        if let Some(path) = &self.snapshots {
            config.snapshot_path = path.clone();
        }
        if let Some(path) = &self.dump_path {
            config.dump_path = path.clone();
        }
        if let Some(ms) = self.marker_ms {
            config.marker_duration_ms = ms;
        }
        if let Some(count) = self.ghosts {
            config.ghost_clients = count;
        }
        if let Some(activity) = self.activity {
            config.ghost_activity = activity;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();

    let config = args.load_config()?;
    if let Some(path) = &args.save_config {
        config.to_file(path)?;
        info!("Configuration written to {:?}", path);
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let result = runtime.block_on(run(config, !args.no_console));
    // The console's stdin read cannot be cancelled; don't wait on it.
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

async fn run(config: ServerConfig, console: bool) -> Result<()> {
    let snapshots = SnapshotStore::open(&config.snapshot_path);
    let canvas = Canvas::new(config.canvas_options(), snapshots, Handle::current());
    let server = Server::new(canvas.clone());

    let max = config.max_message_size;
    let mut listeners = Vec::new();
    if config.push_enabled {
        let addr = SocketAddr::new(config.bind_address, config.push_port);
        let listener = Server::bind(addr).await?;
        let server = server.clone();
        listeners.push(tokio::spawn(async move { server.serve_push(listener, max).await }));
    }
    if config.poll_enabled {
        let addr = SocketAddr::new(config.bind_address, config.poll_port);
        let listener = Server::bind(addr).await?;
        let server = server.clone();
        listeners.push(tokio::spawn(async move { server.serve_poll(listener, max).await }));
    }

    let ghosts = ghost::spawn_ghosts(
        &canvas,
        config.ghost_clients,
        config.ghost_activity,
        &server.shutdown_signal(),
    );

    info!(
        push = config.push_enabled.then_some(config.push_port),
        poll = config.poll_enabled.then_some(config.poll_port),
        marker_ms = config.marker_duration_ms,
        snapshots = %config.snapshot_path.display(),
        "sharedraw v{} running",
        env!("CARGO_PKG_VERSION")
    );

    let admin = AdminConsole::new(canvas.clone(), config.dump_path.clone());
    let quit_requested = async {
        if !console {
            return std::future::pending().await;
        }
        match admin.run(BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await {
            Ok(ConsoleExit::Quit) => {}
            Ok(ConsoleExit::InputClosed) => {
                info!("console input closed, running until interrupted");
                std::future::pending::<()>().await;
            }
            Err(e) => {
                warn!("console stopped: {e:#}");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("cannot listen for ctrl-c: {e}");
            }
            info!("Shutdown signal received, stopping server...");
        }
        () = quit_requested => info!("Shutdown requested from console"),
    }

    shut_down(&canvas, &server, listeners, ghosts).await;
    Ok(())
}

/// Disconnect clients, stop listeners and ghosts, then persist snapshots.
///
/// Returns whether the snapshot file was written. A failed write is logged
/// and otherwise ignored so the process still exits normally.
async fn shut_down(
    canvas: &Canvas,
    server: &Server,
    listeners: Vec<JoinHandle<Result<(), ServerError>>>,
    ghosts: Vec<JoinHandle<()>>,
) -> bool {
    canvas.disconnect_all();
    server.shutdown();
    for listener in listeners {
        match listener.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("listener failed: {e}"),
            Err(e) => warn!("listener task panicked: {e}"),
        }
    }
    for ghost in ghosts {
        let _ = ghost.await;
    }

    let persisted = match canvas.flush_snapshots() {
        Ok(()) => true,
        Err(e) => {
            error!("Failed to persist snapshots: {e:#}");
            false
        }
    };
    info!(version = canvas.version(), "sharedraw stopped");
    persisted
}
