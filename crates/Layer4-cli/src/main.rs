//! HostWarden CLI - Main entry point

mod console;

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::ConsoleTransport;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warden_core::{AlertEngine, CommandExecutor, ExecutorConfig};
use warden_foundation::{PermissionRegistry, WardenConfig};
use warden_gate::{
    AlertMonitor, Delivery, Dispatcher, GateConfig, InboundMessage, OutputBounds, RequestGate,
    RetryPolicy, SessionContext, Transport,
};

/// HostWarden - remote administration over a chat channel
#[derive(Parser, Debug)]
#[command(name = "warden")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Config file (defaults to <config_dir>/hostwarden/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// User table path (overrides config and env)
    #[arg(long)]
    users_file: Option<PathBuf>,

    /// Owner principal id (overrides config and env)
    #[arg(long)]
    owner: Option<String>,

    /// Principal id used for console input (defaults to the owner)
    #[arg(long = "as")]
    as_principal: Option<String>,

    /// Display name used for console input
    #[arg(long, default_value = "console")]
    name: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered users
    Users,
    /// Validate configuration and print the effective settings
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Load configuration: defaults → file → env → flags
    let mut config =
        WardenConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(owner) = &args.owner {
        config = config.owner(owner.clone());
    }
    if let Some(path) = &args.users_file {
        config = config.users_file(path.clone());
    }
    config.validate().context("Invalid configuration")?;

    let owner_id = config
        .owner_id()
        .context("Owner id is not configured")?
        .to_string();
    let users_path = config.users_path()?;
    let registry = Arc::new(
        PermissionRegistry::open(&users_path, &owner_id)
            .with_context(|| format!("Failed to open user table {}", users_path.display()))?,
    );

    match args.command {
        Some(Command::Users) => {
            for user in registry.list_users() {
                println!("{}\t{}\t{}", user.principal_id, user.role, user.display_name);
            }
            return Ok(());
        }
        Some(Command::Check) => {
            println!("owner:        {}", owner_id);
            println!("users file:   {}", users_path.display());
            println!("denylist:     {}", config.denylist.join(", "));
            println!("max retries:  {}", config.max_retries);
            println!(
                "alert check:  every {:?}, cooldown {:?}",
                config.alert_interval(),
                config.alert_cooldown()
            );
            if let Some(group) = &config.allowed_group {
                println!("allowed chat: {}", group);
            }
            println!(
                "credential:   {}",
                if config.require_token().is_ok() {
                    "set"
                } else {
                    "not set (console only)"
                }
            );
            return Ok(());
        }
        None => {}
    }

    let principal = args.as_principal.unwrap_or_else(|| owner_id.clone());
    run_console(config, registry, owner_id, principal, args.name).await
}

/// Console session: stdin lines in, transport lines out
async fn run_console(
    config: WardenConfig,
    registry: Arc<PermissionRegistry>,
    owner_id: String,
    principal: String,
    name: String,
) -> anyhow::Result<()> {
    let transport: Arc<dyn Transport> = Arc::new(ConsoleTransport::stdout());
    let delivery = Arc::new(Delivery::new(
        transport,
        RetryPolicy {
            max_retries: config.max_retries,
            backoff: config.retry_backoff(),
        },
    ));

    let executor = Arc::new(
        CommandExecutor::from_current_dir(ExecutorConfig {
            denylist: config.denylist.clone(),
            ..Default::default()
        })
        .context("Failed to start command executor")?,
    );
    let session = Arc::new(SessionContext::new(executor));
    let alerts = Arc::new(AlertEngine::new(config.alert_cooldown()));
    let bounds = OutputBounds {
        limit: config.output_limit,
        keep: config.output_keep,
    };

    let dispatcher = Arc::new(Dispatcher::new(
        session.clone(),
        registry.clone(),
        alerts.clone(),
        bounds,
    ));
    let gate = Arc::new(RequestGate::new(
        registry,
        alerts.clone(),
        delivery.clone(),
        dispatcher,
        GateConfig {
            max_retries: config.max_retries,
            allowed_group: config.allowed_group.clone(),
            output_limit: config.output_limit,
            output_keep: config.output_keep,
        },
    ));

    let monitor = AlertMonitor::spawn(
        alerts,
        delivery.clone(),
        owner_id.clone(),
        config.alert_interval(),
    );
    session.send_welcome(&delivery, &owner_id).await;
    info!("Reading commands for {} ({}) from stdin", name, principal);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut requests = JoinSet::new();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        warn!("stdin read failed: {}", e);
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }

                let gate = Arc::clone(&gate);
                let message = InboundMessage::private(principal.clone(), name.clone(), line);
                requests.spawn(async move { gate.handle(message).await });
            }
            Some(finished) = requests.join_next(), if !requests.is_empty() => {
                if let Err(e) = finished {
                    warn!("Request task failed: {}", e);
                }
            }
        }
    }

    // 알림 작업을 먼저 멈춘 뒤 전송 계층 정리
    monitor.shutdown().await;
    while let Some(finished) = requests.join_next().await {
        if let Err(e) = finished {
            warn!("Request task failed: {}", e);
        }
    }
    drop(gate);
    drop(delivery);
    info!("Shutdown complete");
    Ok(())
}
