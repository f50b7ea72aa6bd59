//! CommandScheduler - actor owning the drag session and publish timer
//!
//! Pointer events and timer ticks are processed one at a time from a single
//! run loop, so a phase transition (cancel old timer, start new one) can
//! never interleave with another event.
//!
//! ```text
//!            drag start                 drag end
//!   Idle ───────────────▶ Driving ───────────────▶ Decaying
//!    ▲                      ▲                         │
//!    │                      └──────── drag start ─────┤
//!    └──────────────────── stop threshold ────────────┘
//! ```

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use super::commands::{DragEvent, Phase, SchedulerCommand, SchedulerStatus};
use super::decay::{DecayPolicy, ExponentialDecay};
use super::handle::SchedulerHandle;
use super::session::DragSession;
use super::types::{AxisCommand, Point, VelocityCommand};
use crate::config::ControlConfig;
use crate::publish::{Delivery, PublishError, PublisherAdapter};

/// Active timer, tagged by the phase it belongs to
///
/// Holding at most one `Interval` makes "both timers running" unrepresentable.
enum PhaseTimer {
    Idle,
    Driving(Interval),
    Decaying(Interval),
}

/// Which timer fired
#[derive(Debug, Clone, Copy)]
enum Tick {
    Drive,
    Decay,
}

impl PhaseTimer {
    fn phase(&self) -> Phase {
        match self {
            Self::Idle => Phase::Idle,
            Self::Driving(_) => Phase::Driving,
            Self::Decaying(_) => Phase::Decaying,
        }
    }

    fn period(&self) -> Option<Duration> {
        match self {
            Self::Idle => None,
            Self::Driving(timer) | Self::Decaying(timer) => Some(timer.period()),
        }
    }

    /// Wait for the running timer; never resolves while idle
    async fn tick(&mut self) -> Tick {
        match self {
            Self::Idle => std::future::pending().await,
            Self::Driving(timer) => {
                timer.tick().await;
                Tick::Drive
            }
            Self::Decaying(timer) => {
                timer.tick().await;
                Tick::Decay
            }
        }
    }
}

/// Periodic timer whose first tick fires one period from now
fn periodic(period: Duration) -> Interval {
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer
}

/// Clamp control values and reset decay settings that would never stop
fn sanitize(config: ControlConfig) -> ControlConfig {
    let mut config = config.clamped();
    if !config.decay.is_valid() {
        warn!(
            "Decay settings blend={} stop_threshold={} never stop, using defaults",
            config.decay.blend, config.decay.stop_threshold
        );
        config.decay = config.decay.sanitized();
    }
    config
}

/// Actor translating drag events into periodically published velocity commands
pub struct CommandScheduler {
    /// Receiver for incoming commands
    command_rx: mpsc::UnboundedReceiver<SchedulerCommand>,

    /// Control settings snapshot, read on every tick
    config: ControlConfig,

    /// Current drag, replaced on every drag start
    session: Option<DragSession>,

    timer: PhaseTimer,

    decay: Box<dyn DecayPolicy>,

    publisher: PublisherAdapter,

    last_command: Option<VelocityCommand>,
    published: u64,
    skipped: u64,
}

impl CommandScheduler {
    /// Spawn a scheduler using the exponential decay policy from `config`
    pub fn spawn(config: ControlConfig, publisher: PublisherAdapter) -> SchedulerHandle {
        let config = sanitize(config);
        let decay = Box::new(ExponentialDecay::from(&config.decay));
        Self::spawn_with_policy(config, publisher, decay)
    }

    /// Spawn a scheduler with a custom decay policy
    pub fn spawn_with_policy(
        config: ControlConfig,
        publisher: PublisherAdapter,
        decay: Box<dyn DecayPolicy>,
    ) -> SchedulerHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let config = sanitize(config);

        let scheduler = CommandScheduler {
            command_rx: cmd_rx,
            config,
            session: None,
            timer: PhaseTimer::Idle,
            decay,
            publisher,
            last_command: None,
            published: 0,
            skipped: 0,
        };

        tokio::spawn(scheduler.run());

        info!(
            "CommandScheduler spawned ({} Hz, max linear {}, max angular {})",
            config.publish_rate_hz, config.max_linear_speed, config.max_angular_speed
        );

        SchedulerHandle::new(cmd_tx)
    }

    /// Main run loop
    ///
    /// Ends on `Shutdown` or when every handle has been dropped. Either way
    /// the running timer is dropped with the actor.
    async fn run(mut self) {
        debug!("CommandScheduler run loop started");

        loop {
            tokio::select! {
                biased;

                cmd = self.command_rx.recv() => {
                    let Some(cmd) = cmd else {
                        debug!("All scheduler handles dropped");
                        break;
                    };

                    if !self.handle_command(cmd) {
                        break;
                    }
                }

                tick = self.timer.tick() => {
                    match tick {
                        Tick::Drive => self.on_drive_tick(),
                        Tick::Decay => self.on_decay_tick(),
                    }
                }
            }
        }

        info!(
            "CommandScheduler stopped ({} published, {} skipped)",
            self.published, self.skipped
        );
    }

    /// Apply one command; returns false once the actor should stop
    fn handle_command(&mut self, cmd: SchedulerCommand) -> bool {
        trace!(?cmd, "Processing command");

        match cmd {
            SchedulerCommand::Drag(event) => self.handle_drag(event),
            SchedulerCommand::Reconfigure(config) => {
                let config = sanitize(config);
                if config.publish_rate_hz != self.config.publish_rate_hz
                    && self.timer.phase() != Phase::Idle
                {
                    debug!(
                        "Publish rate changed to {} Hz, applies at next transition",
                        config.publish_rate_hz
                    );
                }
                self.decay.reconfigure(&config.decay);
                self.config = config;
            }
            SchedulerCommand::SetChannelMode(mode) => {
                info!("Channel mode: {:?}", mode);
                self.publisher.set_mode(mode);
            }
            SchedulerCommand::Status { response } => {
                let _ = response.send(self.status());
            }
            SchedulerCommand::Shutdown { response } => {
                info!("CommandScheduler received shutdown command");
                self.teardown();
                if let Some(response) = response {
                    let _ = response.send(());
                }
                return false;
            }
        }
        true
    }

    fn handle_drag(&mut self, event: DragEvent) {
        match event {
            DragEvent::Start { x, y } => self.on_drag_start(Point::new(x, y)),
            DragEvent::Move { x, y } => self.on_drag_move(Point::new(x, y)),
            DragEvent::End => self.on_drag_end(),
        }
    }

    /// Idle/Decaying → Driving
    fn on_drag_start(&mut self, position: Point) {
        if !position.is_finite() {
            warn!("Ignoring drag start at non-finite position {:?}", position);
            return;
        }

        self.session = Some(DragSession::begin(position));
        self.transition(Phase::Driving);
    }

    /// Driving self-loop: only recomputes the pending command
    fn on_drag_move(&mut self, position: Point) {
        if !position.is_finite() {
            warn!("Ignoring drag move to non-finite position {:?}", position);
            return;
        }

        match (&self.timer, self.session.as_mut()) {
            (PhaseTimer::Driving(_), Some(session)) => {
                let axes = session.move_to(position);
                trace!(linear = axes.linear, angular = axes.angular, "Pending command updated");
            }
            _ => trace!("Drag move outside an active drag ignored"),
        }
    }

    /// Driving → Decaying
    fn on_drag_end(&mut self) {
        if self.timer.phase() != Phase::Driving {
            trace!("Drag end outside an active drag ignored");
            return;
        }
        self.transition(Phase::Decaying);
    }

    fn on_drive_tick(&mut self) {
        let Some(axes) = self.session.as_ref().and_then(DragSession::pending) else {
            trace!("Drive tick before first move, nothing to publish");
            return;
        };
        self.publish(axes);
    }

    fn on_decay_tick(&mut self) {
        let Some(session) = self.session.as_mut() else {
            self.transition(Phase::Idle);
            return;
        };

        // A drag that never moved has nothing to ramp down
        if !session.has_command() {
            debug!("Drag released without movement, stopping");
            self.transition(Phase::Idle);
            return;
        }

        let step = self.decay.step(session);
        self.publish(step.axes);

        if step.done {
            debug!("Decay complete");
            self.transition(Phase::Idle);
        }
    }

    /// Scale and hand the axes to the publisher; errors are absorbed here
    fn publish(&mut self, axes: AxisCommand) {
        let command = axes.scale(&self.config);
        self.last_command = Some(command);

        match self.publisher.publish(command) {
            Ok(Delivery::Sent) => self.published += 1,
            Ok(Delivery::NoSink) => trace!("No publish sink attached"),
            Err(PublishError::NoActiveTarget) => {
                self.skipped += 1;
                trace!("No active target, publish skipped");
            }
            Err(e @ PublishError::UnrecognizedSchema(_)) => {
                self.skipped += 1;
                warn!("Publish skipped: {}", e);
            }
        }
    }

    /// Replace the running timer with the one for `next`
    ///
    /// The old timer is dropped before the new one is created.
    fn transition(&mut self, next: Phase) {
        let from = self.timer.phase();

        self.timer = PhaseTimer::Idle;
        self.timer = match next {
            Phase::Idle => PhaseTimer::Idle,
            Phase::Driving => PhaseTimer::Driving(periodic(self.config.publish_period())),
            Phase::Decaying => PhaseTimer::Decaying(periodic(self.config.publish_period())),
        };

        debug!("Scheduler {:?} → {:?}", from, next);
    }

    fn teardown(&mut self) {
        if self.timer.phase() != Phase::Idle {
            debug!("Cancelling {:?} timer on shutdown", self.timer.phase());
        }
        self.timer = PhaseTimer::Idle;
    }

    fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            phase: self.timer.phase(),
            session: self.session,
            config: self.config,
            channel_mode: self.publisher.mode(),
            last_command: self.last_command,
            published: self.published,
            skipped: self.skipped,
            timer_period_ms: self.timer.period().map(|p| p.as_secs_f64() * 1000.0),
        }
    }
}
