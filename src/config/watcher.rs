//! Hot reload of the YAML config file
//!
//! The parent directory is watched rather than the file itself: editors that
//! save by writing a temp file and renaming it over the config replace the
//! inode, which would silently end a watch on the file.

use anyhow::{anyhow, Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use super::AppConfig;

/// Quiet time after the last file event before the config is re-read
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(100);

/// Delivers a fresh `AppConfig` each time the file changes to valid, different content
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<AppConfig>,
}

impl ConfigWatcher {
    /// Load `config_path` and start watching it
    ///
    /// Fails if the initial load fails. Later invalid edits are logged and
    /// the previous config stays in effect.
    pub async fn new(config_path: String) -> Result<(Self, Arc<AppConfig>)> {
        let initial_config = AppConfig::load(&config_path)
            .await
            .context("Failed to load initial config")?;

        let path = PathBuf::from(&config_path);
        let file_name: OsString = path
            .file_name()
            .ok_or_else(|| anyhow!("Config path has no file name: {}", config_path))?
            .to_os_string();
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        // notify calls back on its own thread; only wake the reload task from there
        let (event_tx, event_rx) = mpsc::unbounded_channel::<()>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if touches_file(&event, &file_name) {
                    trace!(kind = ?event.kind, "Config file event");
                    let _ = event_tx.send(());
                }
            }
            Err(e) => error!("Watch error: {}", e),
        })?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch config directory: {}", dir.display()))?;

        let (tx, rx) = mpsc::channel(10);
        tokio::spawn(reload_loop(
            config_path.clone(),
            initial_config.clone(),
            event_rx,
            tx,
        ));

        info!("Config file watcher started for: {}", config_path);

        Ok((
            Self {
                _watcher: watcher,
                rx,
            },
            Arc::new(initial_config),
        ))
    }

    /// Wait for the next changed config; `None` once the watcher has stopped
    pub async fn next_config(&mut self) -> Option<AppConfig> {
        self.rx.recv().await
    }
}

/// Whether `event` creates, writes or renames onto the watched file
///
/// Removals are ignored: a delete-then-create save is picked up on the create.
fn touches_file(event: &Event, file_name: &OsStr) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name))
}

/// Coalesce event bursts, re-read the file and forward real changes
async fn reload_loop(
    path: String,
    mut current: AppConfig,
    mut events: mpsc::UnboundedReceiver<()>,
    tx: mpsc::Sender<AppConfig>,
) {
    while events.recv().await.is_some() {
        // One save is often several events (truncate, write, rename)
        tokio::time::sleep(RELOAD_DEBOUNCE).await;
        while events.try_recv().is_ok() {}

        if !Path::new(&path).exists() {
            debug!("Config file {} is gone, waiting for it to reappear", path);
            continue;
        }

        match AppConfig::load(&path).await {
            Ok(config) if config == current => {
                debug!("Config file touched without changes");
            }
            Ok(config) => {
                info!("Configuration reloaded from {}", path);
                current = config.clone();
                if tx.send(config).await.is_err() {
                    debug!("Config receiver dropped, stopping reload task");
                    break;
                }
            }
            Err(e) => {
                warn!("Failed to reload config (keeping old config): {:#}", e);
            }
        }
    }

    debug!("Config reload task stopped");
}
