//! badgegated - badge access control daemon
//!
//! Scans badges on a serial reader, answers an operator over TCP and keeps
//! the tag registry file up to date.
//!
//! # Usage
//!
//! ```text
//! badgegated [serve] [--bind ADDR] [--serial PATH] [--baud N] [--registry PATH] [-d]
//! badgegated list [--registry PATH] [--json]
//! ```

mod daemon;

use std::fmt::Write as _;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use badgegate_core::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_PORT, DEFAULT_REGISTRY_PATH, DEFAULT_SCAN_TIMEOUT_MS,
    DEFAULT_SERIAL_PATH,
};
use badgegate_hardware::{AnyReader, SerialConfig, SerialReader};
use badgegate_network::{AccessServer, ServerConfig};
use badgegate_storage::{FileRegistry, TagRecord, TagRegistry};
use clap::{Args, Parser, Subcommand};
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Badge access control daemon
#[derive(Parser, Debug)]
#[command(name = "badgegated", version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Options for the default `serve` command
    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the access daemon (default)
    Serve(ServeArgs),

    /// Print the registry contents and exit
    List(ListArgs),
}

#[derive(Args, Debug, Clone)]
struct ServeArgs {
    /// Address the operator port listens on
    #[arg(long, default_value_t = SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)))]
    bind: SocketAddr,

    /// Serial device of the badge reader
    #[arg(long, default_value = DEFAULT_SERIAL_PATH)]
    serial: String,

    /// Serial line speed
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Longest wait for one badge read, in milliseconds
    #[arg(long, default_value_t = DEFAULT_SCAN_TIMEOUT_MS)]
    scan_timeout_ms: u64,

    /// Tag registry file
    #[arg(long, default_value = DEFAULT_REGISTRY_PATH)]
    registry: PathBuf,

    /// Detach from the terminal and run in the background
    #[arg(short, long)]
    daemon: bool,

    /// Log filter (RUST_LOG takes precedence)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Append logs to this file instead of stdout
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct ListArgs {
    /// Tag registry file
    #[arg(long, default_value = DEFAULT_REGISTRY_PATH)]
    registry: PathBuf,

    /// Print records as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve(cli.serve)) {
        Command::Serve(args) => serve(args),
        Command::List(args) => list(&args),
    }
}

fn serve(mut args: ServeArgs) -> Result<()> {
    // Daemonizing moves the working directory to `/`.
    args.registry = std::path::absolute(&args.registry)
        .with_context(|| format!("invalid registry path {}", args.registry.display()))?;
    if let Some(log_file) = args.log_file.take() {
        args.log_file = Some(
            std::path::absolute(&log_file)
                .with_context(|| format!("invalid log file path {}", log_file.display()))?,
        );
    }

    init_logging(&args.log_level, args.log_file.as_deref())?;
    info!(
        version = badgegate_core::VERSION,
        daemon = args.daemon,
        "badgegated starting"
    );

    // Startup errors must reach the caller, so nothing here runs after the fork.
    let startup = prepare(&args)?;

    if args.daemon {
        daemon::daemonize()?;
    }

    let runtime = tokio::runtime::Runtime::new().context("failed to create Tokio runtime")?;
    runtime.block_on(async_serve(args, startup))
}

/// Resources acquired before the process detaches.
struct Startup {
    listener: std::net::TcpListener,
    reader: SerialReader,
}

/// Bind the operator port, check the registry and open the badge reader.
fn prepare(args: &ServeArgs) -> Result<Startup> {
    let listener = AccessServer::bind_std(args.bind)?;
    check_registry(&args.registry)?;

    let serial = SerialConfig::new(&args.serial)
        .baud_rate(args.baud)
        .timeout(Duration::from_millis(args.scan_timeout_ms));
    let reader = SerialReader::open(&serial)
        .with_context(|| format!("failed to open badge reader on {}", args.serial))?;

    Ok(Startup { listener, reader })
}

/// Make sure the registry file can be created and opened for writing.
fn check_registry(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create registry directory {}", parent.display()))?;
    }
    std::fs::OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)
        .with_context(|| format!("failed to open registry {}", path.display()))?;
    Ok(())
}

async fn async_serve(args: ServeArgs, startup: Startup) -> Result<()> {
    let registry = FileRegistry::open(&args.registry)
        .await
        .with_context(|| format!("failed to open registry {}", args.registry.display()))?;
    let mut reader = AnyReader::from(startup.reader);
    let server = AccessServer::from_std(startup.listener, ServerConfig::new(args.bind))?;

    let cancel = CancellationToken::new();
    let mut sigterm = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
            _ = sigint.recv() => info!("Received SIGINT, shutting down"),
            () = shutdown.cancelled() => return,
        }
        shutdown.cancel();
    });

    let result = server.run(&mut reader, &registry, &cancel).await;
    cancel.cancel();

    if let Err(e) = result {
        warn!(error = %e, "Access server stopped with an error");
        return Err(e).context("access server failed");
    }

    info!("badgegated stopped");
    Ok(())
}

/// Install the global subscriber.
fn init_logging(level: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .with_context(|| format!("invalid log level '{level}'"))?,
    };

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;

            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(std::sync::Mutex::new(file))
                        .with_ansi(false),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_target(false))
                .init();
        }
    }

    Ok(())
}

fn list(args: &ListArgs) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create Tokio runtime")?;

    let registry = FileRegistry::new(&args.registry);
    let records = runtime
        .block_on(registry.list())
        .with_context(|| format!("failed to read registry {}", args.registry.display()))?;

    let output = if args.json {
        serde_json::to_string_pretty(&records)?
    } else {
        render_table(&records)
    };
    println!("{output}");
    Ok(())
}

/// One line per record: tag, card serial, last change, holder.
fn render_table(records: &[TagRecord]) -> String {
    let mut out = format!("{:<12}  {:<8}  {:<18}  NAME", "TAG", "SERIAL", "LAST MODIFIED");
    for record in records {
        let _ = write!(
            out,
            "\n{:<12}  {:<8}  {:<18}  {}",
            record.tag_id,
            record.tag_id.card_serial(),
            record.last_modified,
            record.holder_name
        );
    }
    out
}
