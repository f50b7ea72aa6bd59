//! vel-cmd - joystick drag to velocity command gateway
//!
//! Converts a 2D pointer drag into (linear, angular) velocity commands,
//! publishes them at a fixed rate while dragging and decays them smoothly
//! to zero after release.

pub mod api;
pub mod cli;
pub mod config;
pub mod control;
pub mod publish;
pub mod targets;

pub use config::{AppConfig, ControlConfig};
pub use control::{CommandScheduler, DragEvent, Phase, Point, SchedulerHandle};
pub use publish::{PublishSink, PublisherAdapter};
pub use targets::{PublishTarget, TargetRegistry, TopicRegistry};
