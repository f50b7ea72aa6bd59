//! Command and status types for the scheduler actor

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::session::DragSession;
use super::types::{Point, VelocityCommand};
use crate::config::ControlConfig;
use crate::publish::ChannelMode;

/// Pointer events delivered by the drag source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DragEvent {
    Start { x: f64, y: f64 },
    Move { x: f64, y: f64 },
    End,
}

impl DragEvent {
    pub fn start(position: Point) -> Self {
        Self::Start {
            x: position.x,
            y: position.y,
        }
    }

    pub fn moved(position: Point) -> Self {
        Self::Move {
            x: position.x,
            y: position.y,
        }
    }

    /// Position carried by start/move events
    pub fn position(&self) -> Option<Point> {
        match *self {
            Self::Start { x, y } | Self::Move { x, y } => Some(Point::new(x, y)),
            Self::End => None,
        }
    }
}

/// Scheduler phase; `Driving` and `Decaying` each own exactly one timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Driving,
    Decaying,
}

/// Snapshot returned by status queries
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub phase: Phase,
    pub session: Option<DragSession>,
    pub config: ControlConfig,
    pub channel_mode: ChannelMode,
    /// Last command handed to the publisher (sent or skipped)
    pub last_command: Option<VelocityCommand>,
    /// Ticks that reached the sink
    pub published: u64,
    /// Ticks skipped for schema/target errors
    pub skipped: u64,
    /// Timer period currently in effect, if a timer is running
    pub timer_period_ms: Option<f64>,
}

/// Commands for the scheduler actor
///
/// Pointer events and reconfiguration are fire-and-forget; `Status` replies
/// through a oneshot channel.
#[derive(Debug)]
pub enum SchedulerCommand {
    Drag(DragEvent),
    Reconfigure(ControlConfig),
    SetChannelMode(ChannelMode),
    Status {
        response: oneshot::Sender<SchedulerStatus>,
    },
    Shutdown {
        response: Option<oneshot::Sender<()>>,
    },
}
