//! Deflection mapper
//!
//! Converts a pointer displacement into the two control axes. Dragging up
//! (smaller y) drives forward; dragging left (smaller x) turns positive.

use super::types::{AxisCommand, Point};

/// Deflection radius in widget pixels at which an axis reaches full scale
pub const DEFLECTION_RADIUS_PX: f64 = 100.0;

/// Full-scale value of the linear axis
pub const LINEAR_FULL_SCALE: f64 = 1.0;

/// Full-scale value of the angular axis (~π/2)
pub const ANGULAR_FULL_SCALE: f64 = 1.5707;

/// Map a drag displacement to axis values
///
/// Displacement is measured as `start - current` on each axis. Deflections
/// beyond the radius are not clamped here.
pub fn map_deflection(start: Point, current: Point) -> AxisCommand {
    let dx = start.x - current.x;
    let dy = start.y - current.y;

    AxisCommand {
        linear: (dy / DEFLECTION_RADIUS_PX) * LINEAR_FULL_SCALE,
        angular: (dx / DEFLECTION_RADIUS_PX) * ANGULAR_FULL_SCALE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_vertical_drag_is_linear_only() {
        let axes = map_deflection(Point::new(100.0, 100.0), Point::new(100.0, 50.0));
        assert!((axes.linear - 0.5).abs() < 1e-12);
        assert_eq!(axes.angular, 0.0);
    }

    #[test]
    fn test_full_scale_at_radius() {
        let start = Point::new(0.0, 0.0);

        let up_left = map_deflection(start, Point::new(-100.0, -100.0));
        assert!((up_left.linear - 1.0).abs() < 1e-12);
        assert!((up_left.angular - 1.5707).abs() < 1e-12);

        let down_right = map_deflection(start, Point::new(100.0, 100.0));
        assert!((down_right.linear + 1.0).abs() < 1e-12);
        assert!((down_right.angular + 1.5707).abs() < 1e-12);
    }

    #[test]
    fn test_no_clamping_past_radius() {
        let axes = map_deflection(Point::new(0.0, 0.0), Point::new(0.0, -250.0));
        assert!((axes.linear - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_no_displacement_is_zero() {
        let p = Point::new(42.0, 17.0);
        assert_eq!(map_deflection(p, p), AxisCommand::default());
    }

    proptest! {
        #[test]
        fn prop_axes_follow_displacement(
            sx in -500.0f64..500.0,
            sy in -500.0f64..500.0,
            cx in -500.0f64..500.0,
            cy in -500.0f64..500.0,
        ) {
            let axes = map_deflection(Point::new(sx, sy), Point::new(cx, cy));
            prop_assert!((axes.linear - (sy - cy) / 100.0).abs() < 1e-9);
            prop_assert!((axes.angular - (sx - cx) / 100.0 * 1.5707).abs() < 1e-9);
        }
    }
}
