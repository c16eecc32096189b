//! Trajectory producers.
//!
//! Pure, deterministic generators yielding ordered, finite point sequences.
//! Every produced point passes through the workspace clamp before it is
//! handed to the sync engine, and indices are assigned in emission order.

use crate::config::CircleConfig;
use crate::geom::{Point2D, TrajectoryPoint, Workspace};

/// Generate `count` points evenly spaced around a circle.
///
/// `start_angle_deg` rotates the first point around the center; the
/// sequence then proceeds counter-clockwise through one full revolution.
pub fn circle(
    center: Point2D,
    radius: f64,
    count: usize,
    start_angle_deg: f64,
    velocity: f64,
) -> Vec<TrajectoryPoint> {
    let start = start_angle_deg.to_radians();
    let mut points: Vec<TrajectoryPoint> = (0..count)
        .map(|i| {
            let theta = start + std::f64::consts::TAU * i as f64 / count as f64;
            let position = Point2D::new(
                center.x + radius * theta.cos(),
                center.y + radius * theta.sin(),
            );
            TrajectoryPoint::new(position, velocity, i as u32)
        })
        .collect();
    Workspace::DEFAULT.clamp_trajectory(&mut points);
    points
}

/// Circle producer driven by the `[trajectory]` config table.
pub fn circle_from_config(config: &CircleConfig, velocity: f64) -> Vec<TrajectoryPoint> {
    circle(
        Point2D::new(config.center_x, config.center_y),
        config.radius,
        config.points,
        config.start_angle_deg,
        velocity,
    )
}

/// Generate `count` points interpolated on the segment from `from` to `to`,
/// endpoints included.
pub fn line(
    from: Point2D,
    to: Point2D,
    count: usize,
    velocity: f64,
) -> Vec<TrajectoryPoint> {
    let steps = count.max(2);
    let mut points: Vec<TrajectoryPoint> = (0..steps)
        .map(|i| {
            let t = i as f64 / (steps - 1) as f64;
            let position = Point2D::new(
                from.x + (to.x - from.x) * t,
                from.y + (to.y - from.y) * t,
            );
            TrajectoryPoint::new(position, velocity, i as u32)
        })
        .collect();
    Workspace::DEFAULT.clamp_trajectory(&mut points);
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_has_requested_count_and_monotonic_indices() {
        let points = circle(Point2D::new(491.3, 133.9), 182.4, 300, 0.0, 50.0);
        assert_eq!(points.len(), 300);
        for (i, p) in points.iter().enumerate() {
            assert_eq!(p.index, i as u32);
            assert_eq!(p.velocity, 50.0);
        }
    }

    #[test]
    fn circle_points_stay_in_workspace() {
        // Radius large enough to cross every bound — all clamped back in.
        let points = circle(Point2D::new(500.0, 150.0), 900.0, 64, 0.0, 20.0);
        let ws = Workspace::DEFAULT;
        assert!(points.iter().all(|p| ws.contains(p.position)));
    }

    #[test]
    fn circle_start_angle_rotates_first_point() {
        let center = Point2D::new(500.0, 150.0);
        let at_zero = circle(center, 100.0, 4, 0.0, 10.0);
        let at_ninety = circle(center, 100.0, 4, 90.0, 10.0);
        assert!((at_zero[0].position.x - 600.0).abs() < 1e-9);
        assert!((at_ninety[0].position.y - 250.0).abs() < 1e-9);
    }

    #[test]
    fn line_includes_both_endpoints() {
        let points = line(Point2D::new(10.0, 10.0), Point2D::new(20.0, 20.0), 11, 5.0);
        assert_eq!(points.len(), 11);
        assert_eq!(points[0].position, Point2D::new(10.0, 10.0));
        assert_eq!(points[10].position, Point2D::new(20.0, 20.0));
    }
}
