//! Drag session state
//!
//! Tracks one pointer interaction from drag start until the next drag start
//! replaces it. Owned exclusively by the scheduler actor.

use serde::Serialize;

use super::deflection::map_deflection;
use super::types::{AxisCommand, Point};

/// State of a single pointer drag
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DragSession {
    start: Point,
    last: Point,
    /// Latest mapped axes, absent until the first move
    pending: Option<AxisCommand>,
}

impl DragSession {
    /// Begin a new drag at `position` with no pending command
    pub fn begin(position: Point) -> Self {
        Self {
            start: position,
            last: position,
            pending: None,
        }
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn last(&self) -> Point {
        self.last
    }

    /// Latest computed axes, if the pointer has moved since drag start
    pub fn pending(&self) -> Option<AxisCommand> {
        self.pending
    }

    /// Whether any move (or decay step) has produced a command yet
    pub fn has_command(&self) -> bool {
        self.pending.is_some()
    }

    /// Record a pointer move and recompute the pending command
    pub fn move_to(&mut self, position: Point) -> AxisCommand {
        self.last = position;
        self.remap()
    }

    /// Pull the last point toward the start by `weight` and recompute
    ///
    /// Post: `|last - start|` shrinks by a factor of `1 - weight`.
    pub fn relax(&mut self, weight: f64) -> AxisCommand {
        self.last = self.last.blend_toward(self.start, weight);
        self.remap()
    }

    /// Distance of the last point from the drag start
    pub fn deflection(&self) -> f64 {
        self.last.distance_to(self.start)
    }

    fn remap(&mut self) -> AxisCommand {
        let axes = map_deflection(self.start, self.last);
        self.pending = Some(axes);
        axes
    }
}
