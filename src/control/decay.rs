//! Decay filter for release-to-stop
//!
//! After the drag ends, each tick pulls the last pointer position back
//! toward the drag start, so the commanded speed ramps down instead of
//! dropping to zero. The policy only reports whether to keep decaying;
//! the scheduler owns the timer.

use serde::Serialize;

use super::session::DragSession;
use super::types::AxisCommand;
use crate::config::DecayConfig;

/// Blend factor applied per decay tick
pub const DEFAULT_BLEND: f64 = 0.1;

/// |linear axis| below which decay is considered complete
pub const DEFAULT_STOP_THRESHOLD: f64 = 0.0005;

/// Outcome of one decay tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DecayStep {
    /// Axis values to publish for this tick
    pub axes: AxisCommand,
    /// True once the stop condition is reached
    pub done: bool,
}

/// Strategy used by the scheduler while decaying to a stop
pub trait DecayPolicy: Send {
    /// Advance the session by one tick
    fn step(&self, session: &mut DragSession) -> DecayStep;

    /// Apply new decay settings (hot reload). Default: ignore.
    fn reconfigure(&mut self, _config: &DecayConfig) {}
}

/// Exponential blend toward the drag start point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialDecay {
    pub blend: f64,
    pub stop_threshold: f64,
}

impl Default for ExponentialDecay {
    fn default() -> Self {
        Self {
            blend: DEFAULT_BLEND,
            stop_threshold: DEFAULT_STOP_THRESHOLD,
        }
    }
}

impl From<&DecayConfig> for ExponentialDecay {
    fn from(config: &DecayConfig) -> Self {
        Self {
            blend: config.blend,
            stop_threshold: config.stop_threshold,
        }
    }
}

impl DecayPolicy for ExponentialDecay {
    fn step(&self, session: &mut DragSession) -> DecayStep {
        let axes = session.relax(self.blend);
        DecayStep {
            axes,
            done: axes.linear.abs() < self.stop_threshold,
        }
    }

    fn reconfigure(&mut self, config: &DecayConfig) {
        *self = Self::from(config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::types::Point;
    use proptest::prelude::*;

    fn released(start: Point, last: Point) -> DragSession {
        let mut session = DragSession::begin(start);
        session.move_to(last);
        session
    }

    #[test]
    fn test_first_step_blends_ten_percent() {
        let mut session = released(Point::new(100.0, 100.0), Point::new(100.0, 50.0));
        let step = ExponentialDecay::default().step(&mut session);

        assert!((session.last().y - 55.0).abs() < 1e-12);
        assert!((step.axes.linear - 0.45).abs() < 1e-12);
        assert!(!step.done);
    }

    #[test]
    fn test_stops_below_threshold() {
        let mut session = released(Point::new(0.0, 0.0), Point::new(0.0, 0.05));
        let step = ExponentialDecay::default().step(&mut session);

        // 0.05px * 0.9 = 0.045px -> 0.00045 < 0.0005
        assert!(step.done);
    }

    #[test]
    fn test_pure_turn_stops_on_first_tick() {
        // Only the linear axis is checked against the threshold
        let mut session = released(Point::new(0.0, 0.0), Point::new(-80.0, 0.0));
        let step = ExponentialDecay::default().step(&mut session);

        assert!(step.done);
        assert!(step.axes.angular > 1.0);
    }

    #[test]
    fn test_reconfigure_replaces_parameters() {
        let mut policy = ExponentialDecay::default();
        policy.reconfigure(&DecayConfig {
            blend: 0.5,
            stop_threshold: 0.01,
        });
        assert_eq!(policy.blend, 0.5);
        assert_eq!(policy.stop_threshold, 0.01);
    }

    proptest! {
        #[test]
        fn prop_deflection_shrinks_monotonically(
            dx in -100.0f64..100.0,
            dy in -100.0f64..100.0,
        ) {
            let start = Point::new(200.0, 200.0);
            let mut session = released(start, Point::new(start.x + dx, start.y + dy));
            let policy = ExponentialDecay::default();

            let mut previous = session.deflection();
            for _ in 0..50 {
                policy.step(&mut session);
                let current = session.deflection();
                prop_assert!(current <= previous + 1e-9);
                previous = current;
            }
        }

        #[test]
        fn prop_decay_terminates_within_bound(
            dx in -70.0f64..70.0,
            dy in -70.0f64..70.0,
        ) {
            let start = Point::new(0.0, 0.0);
            let mut session = released(start, Point::new(dx, dy));
            let policy = ExponentialDecay::default();

            // 100px * 0.9^73 / 100 < 0.0005
            let mut ticks = 0;
            loop {
                ticks += 1;
                if policy.step(&mut session).done {
                    break;
                }
                prop_assert!(ticks <= 73, "decay did not stop after {} ticks", ticks);
            }
        }
    }
}
