//! vel-cmd - joystick drag to velocity command gateway
//!
//! Publishes velocity commands from a pointer drag (REPL or web joystick)
//! at a fixed rate, decaying smoothly to a stop after release.

use anyhow::Result;
use clap::Parser;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vel_cmd::api::{self, ApiState};
use vel_cmd::config::{watcher::ConfigWatcher, AppConfig};
use vel_cmd::control::{CommandScheduler, SchedulerHandle};
use vel_cmd::publish::{BroadcastSink, ChannelMode, ConsoleSink, FanoutSink, PublishSink, PublisherAdapter};
use vel_cmd::targets::TopicRegistry;

/// vel-cmd - Drive a robot from a 2D joystick drag
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Also write logs to this file
    #[arg(long, env = "LOG_FILE")]
    log_file: Option<String>,

    /// Override the API port from the config file
    #[arg(long)]
    api_port: Option<u16>,

    /// Run without the interactive REPL (API only)
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let _log_guard = init_logging(&args.log_level, args.log_file.as_deref())?;

    info!("Starting vel-cmd...");
    info!("Configuration file: {}", args.config);

    let (config_watcher, initial_config) = ConfigWatcher::new(args.config.clone()).await?;
    info!("Configuration loaded successfully with hot-reload enabled");

    run_app(args, (*initial_config).clone(), config_watcher, shutdown_signal()).await?;

    info!("vel-cmd shutdown complete");
    Ok(())
}

async fn run_app(
    args: Args,
    config: AppConfig,
    mut config_watcher: ConfigWatcher,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    // Sinks: WebSocket broadcast always, console logging if enabled
    let broadcast = Arc::new(BroadcastSink::new(256));
    let mut sinks: Vec<Arc<dyn PublishSink>> = vec![broadcast.clone()];
    if config.publish.console {
        sinks.push(Arc::new(ConsoleSink::new("console")));
    }
    let sink: Arc<dyn PublishSink> = Arc::new(FanoutSink::new(sinks));

    // Known topics and the saved target
    let registry = Arc::new(TopicRegistry::new(Some(sink.clone())));
    registry.set_topics(config.known_topics());
    registry.set_active(config.initial_target());

    if config.publish.channel_mode == ChannelMode::Linear {
        info!("Channel mode 'linear': only the linear channel is published (set publish.channel_mode: combined for both axes)");
    }

    let adapter = PublisherAdapter::new(registry.clone(), Some(sink), config.publish.channel_mode);
    let scheduler = CommandScheduler::spawn(config.control, adapter);

    let shared_config = Arc::new(RwLock::new(config.clone()));

    if config.api.enabled {
        let port = args.api_port.unwrap_or(config.api.port);
        let state = Arc::new(ApiState {
            scheduler: scheduler.clone(),
            registry: registry.clone(),
            broadcast: broadcast.clone(),
            config: shared_config.clone(),
            config_path: Some(args.config.clone()),
        });

        tokio::spawn(async move {
            if let Err(e) = api::start_server(state, port).await {
                warn!("Joystick API stopped: {:#}", e);
            }
        });
    }

    // REPL blocks on stdin, so it gets its own thread; its exit ends the app
    let (repl_done_tx, mut repl_done_rx) = tokio::sync::oneshot::channel::<()>();
    if !args.headless {
        let repl_scheduler = scheduler.clone();
        let repl_registry = registry.clone();
        let runtime = tokio::runtime::Handle::current();
        std::thread::Builder::new()
            .name("vel-cmd-repl".to_string())
            .spawn(move || {
                if let Err(e) = vel_cmd::cli::run_repl(repl_scheduler, repl_registry, runtime) {
                    warn!("REPL error: {:#}", e);
                }
                let _ = repl_done_tx.send(());
            })?;
    }

    info!("Ready to accept joystick input!");

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(new_config) = config_watcher.next_config() => {
                info!("📝 Configuration file changed, reloading...");
                apply_config(&scheduler, &registry, &shared_config, new_config);
            }

            _ = &mut repl_done_rx, if !args.headless => {
                info!("REPL closed, stopping");
                break;
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping event loop");
                break;
            }
        }
    }

    info!("Shutting down...");
    if let Err(e) = scheduler.shutdown().await {
        debug!("Scheduler already stopped: {}", e);
    }
    registry.clear();

    Ok(())
}

/// Push a reloaded config to the running components
fn apply_config(
    scheduler: &SchedulerHandle,
    registry: &TopicRegistry,
    shared: &RwLock<AppConfig>,
    new_config: AppConfig,
) {
    let previous = shared.read().clone();

    if new_config.control != previous.control {
        scheduler.reconfigure(new_config.control);
        info!(
            "Control settings: {} Hz, max linear {}, max angular {}",
            new_config.control.publish_rate_hz,
            new_config.control.max_linear_speed,
            new_config.control.max_angular_speed
        );
    }

    if new_config.publish.channel_mode != previous.publish.channel_mode {
        scheduler.set_channel_mode(new_config.publish.channel_mode);
    }

    if new_config.topics != previous.topics {
        registry.set_topics(new_config.known_topics());
    }

    if new_config.target != previous.target {
        registry.set_active(new_config.initial_target());
    }

    if new_config.publish.console != previous.publish.console || new_config.api != previous.api {
        warn!("Changes to publish.console and api take effect after restart");
    }

    *shared.write() = new_config;
    info!("✅ Configuration reloaded successfully");
}

fn init_logging(level: &str, log_file: Option<&str>) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let path = std::path::Path::new(path);
            let dir = path.parent().filter(|d| !d.as_os_str().is_empty());
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid log file path: {}", path.display()))?;

            let appender = tracing_appender::rolling::never(
                dir.unwrap_or_else(|| std::path::Path::new(".")),
                file_name,
            );
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
