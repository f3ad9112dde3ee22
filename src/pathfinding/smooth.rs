use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::math::{xz, VecExt};

/// Stand-in gradient for vertical lines.
const VERTICAL_LINE_GRADIENT: f32 = 1.0e5;

/// A turn boundary on the ground plane (`x`, `z` mapped to `x`, `y`).
///
/// The side of the line the path approaches from is captured at
/// construction so a steering controller can detect when it has been
/// crossed.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Line {
    pub gradient: f32,
    pub perp_gradient: f32,
    pub y_intercept: f32,
    pub p1: Vec2,
    pub p2: Vec2,
    pub approach_side: bool,
}

impl Line {
    /// Builds the line through `point_on_line` that is perpendicular to the
    /// direction from `point_perpendicular`.
    pub fn new(point_on_line: Vec2, point_perpendicular: Vec2) -> Self {
        let dx = point_on_line.x - point_perpendicular.x;
        let dy = point_on_line.y - point_perpendicular.y;

        let perp_gradient = if dx == 0.0 {
            VERTICAL_LINE_GRADIENT
        } else {
            dy / dx
        };
        let gradient = if perp_gradient == 0.0 {
            VERTICAL_LINE_GRADIENT
        } else {
            -1.0 / perp_gradient
        };

        let mut line = Self {
            gradient,
            perp_gradient,
            y_intercept: point_on_line.y - gradient * point_on_line.x,
            p1: point_on_line,
            p2: point_on_line + Vec2::new(1.0, gradient),
            approach_side: false,
        };
        line.approach_side = line.side(point_perpendicular);
        line
    }

    pub fn side(&self, point: Vec2) -> bool {
        let (from, to) = (point - self.p1, self.p2 - self.p1);
        from.x * to.y > from.y * to.x
    }

    pub fn has_crossed_line(&self, point: Vec2) -> bool {
        self.side(point) != self.approach_side
    }

    pub fn distance_from_point(&self, point: Vec2) -> f32 {
        let y_intercept_perp = point.y - self.perp_gradient * point.x;
        let x = (y_intercept_perp - self.y_intercept) / (self.gradient - self.perp_gradient);
        let y = self.gradient * x + self.y_intercept;
        point.distance(Vec2::new(x, y))
    }
}

/// Waypoints prepared for a steering controller.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct SmoothPath {
    look_points: Vec<Vec3>,
    turn_boundaries: Vec<Line>,
    finish_line_index: usize,
    slow_down_index: usize,
}

impl SmoothPath {
    pub fn new(
        waypoints: &[Vec3],
        start: Vec3,
        turn_distance: f32,
        stopping_distance: f32,
    ) -> Self {
        let finish_line_index = waypoints.len().saturating_sub(1);

        let mut turn_boundaries = Vec::with_capacity(waypoints.len());
        let mut previous = xz(start);
        for (i, waypoint) in waypoints.iter().enumerate() {
            let current = xz(*waypoint);
            let dir = (current - previous).normalized();
            let turn_point = if i == finish_line_index {
                current
            } else {
                current - dir * turn_distance
            };
            turn_boundaries.push(Line::new(turn_point, previous - dir * turn_distance));
            previous = turn_point;
        }

        let mut slow_down_index = 0;
        let mut distance_from_end = 0.0;
        for i in (1..waypoints.len()).rev() {
            distance_from_end += waypoints[i].distance(waypoints[i - 1]);
            if distance_from_end > stopping_distance {
                slow_down_index = i;
                break;
            }
        }

        Self {
            look_points: waypoints.to_vec(),
            turn_boundaries,
            finish_line_index,
            slow_down_index,
        }
    }

    pub fn look_points(&self) -> &[Vec3] {
        &self.look_points
    }

    pub fn turn_boundaries(&self) -> &[Line] {
        &self.turn_boundaries
    }

    pub fn finish_line_index(&self) -> usize {
        self.finish_line_index
    }

    pub fn slow_down_index(&self) -> usize {
        self.slow_down_index
    }

    pub fn is_empty(&self) -> bool {
        self.look_points.is_empty()
    }
}
