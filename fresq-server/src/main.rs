use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use fresq_core::Database;
use fresq_core::eventbus::{CanvasEvent, EventBus};

mod commands;
mod context;

use commands::{Command, ConsoleLine};
use context::ServerContext;

#[derive(Parser, Debug, Clone)]
#[command(name = "fresq")]
#[command(author, version, about = "FRESQ - collaborative pixel canvas backend")]
pub struct Args {
    /// Postgres connection URL.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// Per-subscriber queue size of the broadcast bus.
    #[arg(long, env = "FRESQ_EVENT_BUFFER", default_value_t = 1024)]
    pub event_buffer: usize,

    #[command(subcommand)]
    pub command: Command,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("fresq=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    if tracing::subscriber::set_global_default(sub).is_err() {
        eprintln!("A global tracing subscriber was already set");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();
    let args = Args::parse();

    match args.command.clone() {
        Command::Migrate => {
            let db = Database::with_max_connections(&args.database_url, args.max_connections).await?;
            db.migrate().await?;
        }
        Command::Serve => {
            let ctx = ServerContext::new(&args).await?;
            run_server(ctx).await?;
        }
        other => {
            let ctx = ServerContext::new(&args).await?;
            commands::execute(&ctx, other).await?;
        }
    }
    Ok(())
}

/// Logs every event published on the bus until shutdown.
fn spawn_event_logger(event_bus: &EventBus, mut rx: mpsc::Receiver<CanvasEvent>) {
    let mut shutdown_rx = event_bus.shutdown_rx.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => info!("broadcast {} {}", event.event_type(), event.payload()),
                    None => break,
                },
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    });
}

async fn run_server(ctx: ServerContext) -> anyhow::Result<()> {
    let rx = ctx.event_bus.subscribe(None).await;
    spawn_event_logger(&ctx.event_bus, rx);

    let snapshot = ctx.canvas.snapshot().await?;
    info!(
        "FRESQ serving a {}x{} grid (state_version={}, {} painted cell(s))",
        snapshot.config.grid_width,
        snapshot.config.grid_height,
        snapshot.config.state_version,
        snapshot.cells.len()
    );
    info!("Type a command (e.g. `claim ABCD2345 10 10`) or Ctrl-C to stop.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received; shutting down.");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("stdin closed; shutting down.");
                    break;
                };
                let words: Vec<&str> = line.split_whitespace().collect();
                if words.is_empty() {
                    continue;
                }
                match ConsoleLine::try_parse_from(words) {
                    Ok(parsed) => {
                        // failures are already printed with their error code
                        if let Err(e) = commands::execute(&ctx, parsed.command).await {
                            warn!("'{}' failed: {}", line.trim(), e.code());
                        }
                    }
                    Err(e) => println!("{e}"),
                }
            }
        }
    }

    ctx.event_bus.shutdown();
    ctx.db.pool().close().await;
    info!("FRESQ stopped.");
    Ok(())
}
