//! SchedulerHandle - Public API for the CommandScheduler
//!
//! Pointer events and reconfiguration are fire-and-forget so they can be
//! sent from any context, including blocking threads. Queries go through a
//! oneshot channel.

use anyhow::{anyhow, Result};
use tokio::sync::{mpsc, oneshot};

use super::commands::{DragEvent, SchedulerCommand, SchedulerStatus};
use super::types::Point;
use crate::config::ControlConfig;
use crate::publish::ChannelMode;

/// Handle for interacting with the CommandScheduler
///
/// Cloning is cheap. The actor stops once every handle is dropped.
#[derive(Clone)]
pub struct SchedulerHandle {
    cmd_tx: mpsc::UnboundedSender<SchedulerCommand>,
}

impl SchedulerHandle {
    pub fn new(cmd_tx: mpsc::UnboundedSender<SchedulerCommand>) -> Self {
        Self { cmd_tx }
    }

    // =========================================================================
    // Pointer events (fire-and-forget)
    // =========================================================================

    pub fn drag_start(&self, position: Point) {
        self.dispatch(DragEvent::start(position));
    }

    pub fn drag_move(&self, position: Point) {
        self.dispatch(DragEvent::moved(position));
    }

    pub fn drag_end(&self) {
        self.dispatch(DragEvent::End);
    }

    pub fn dispatch(&self, event: DragEvent) {
        let _ = self.cmd_tx.send(SchedulerCommand::Drag(event));
    }

    // =========================================================================
    // Settings (fire-and-forget)
    // =========================================================================

    /// Replace the control settings; a running timer keeps its period
    pub fn reconfigure(&self, config: ControlConfig) {
        let _ = self.cmd_tx.send(SchedulerCommand::Reconfigure(config));
    }

    pub fn set_channel_mode(&self, mode: ChannelMode) {
        let _ = self.cmd_tx.send(SchedulerCommand::SetChannelMode(mode));
    }

    // =========================================================================
    // Queries and lifecycle
    // =========================================================================

    /// Snapshot of the scheduler state
    pub async fn status(&self) -> Result<SchedulerStatus> {
        let (response_tx, response_rx) = oneshot::channel();
        self.cmd_tx
            .send(SchedulerCommand::Status {
                response: response_tx,
            })
            .map_err(|_| anyhow!("Scheduler is not running"))?;

        response_rx
            .await
            .map_err(|_| anyhow!("Scheduler stopped before answering"))
    }

    /// Stop the actor and cancel whichever timer is running
    pub async fn shutdown(&self) -> Result<()> {
        let (response_tx, response_rx) = oneshot::channel();
        self.cmd_tx
            .send(SchedulerCommand::Shutdown {
                response: Some(response_tx),
            })
            .map_err(|_| anyhow!("Scheduler is not running"))?;

        response_rx
            .await
            .map_err(|_| anyhow!("Scheduler stopped before acknowledging shutdown"))
    }

    /// Whether the actor is still receiving commands
    pub fn is_running(&self) -> bool {
        !self.cmd_tx.is_closed()
    }
}
