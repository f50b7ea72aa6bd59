//! Joystick control loop
//!
//! Turns pointer drags into velocity commands published at a fixed rate,
//! decaying smoothly to zero after release.

pub mod commands;
pub mod decay;
pub mod deflection;
mod handle;
pub mod scheduler;
pub mod session;
pub mod types;

pub use commands::{DragEvent, Phase, SchedulerCommand, SchedulerStatus};
pub use decay::{DecayPolicy, DecayStep, ExponentialDecay};
pub use deflection::map_deflection;
pub use handle::SchedulerHandle;
pub use scheduler::CommandScheduler;
pub use session::DragSession;
pub use types::{AxisCommand, Point, VelocityCommand};
