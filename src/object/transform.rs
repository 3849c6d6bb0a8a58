//! 2D spatial state
//!
//! A [`Transform2D`] stores an object's pose relative to its parent. The world
//! space pose ([`Pose2D`]) is derived by composing the local transform through
//! the parent chain, rotation first, then scale, then translation:
//!
//! ```text
//! global_position = rotate(position, parent.rotation) * parent.scale + parent.position
//! global_rotation = rotation + parent.rotation
//! global_scale    = scale * parent.scale
//! ```
//!
//! Rotation uses the standard matrix `[cos -sin; sin cos]`, counterclockwise
//! for a y-up frame (clockwise on a y-down screen).

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::render::Rect;

/// Rotate a vector about the origin by `theta` radians
#[must_use]
#[inline]
pub fn rotate(vector: Vec2, theta: f32) -> Vec2 {
    Vec2::from_angle(theta).rotate(vector)
}

/// Rotate a vector about an arbitrary pivot
#[must_use]
pub fn rotate_about(vector: Vec2, theta: f32, pivot: Vec2) -> Vec2 {
    rotate(vector - pivot, theta) + pivot
}

/// Local spatial state of a game object
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform2D {
    /// Position relative to the parent
    pub position: Vec2,
    /// Unscaled size
    pub dimensions: Vec2,
    /// Pivot within the object, measured from its top-left
    pub origin: Vec2,
    /// Rotation relative to the parent, in radians
    pub rotation: f32,
    /// Uniform scale relative to the parent
    pub scale: f32,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            dimensions: Vec2::ZERO,
            origin: Vec2::ZERO,
            rotation: 0.0,
            scale: 1.0,
        }
    }
}

impl Transform2D {
    /// Create a transform from every field
    #[must_use]
    pub const fn new(
        position: Vec2,
        dimensions: Vec2,
        origin: Vec2,
        rotation: f32,
        scale: f32,
    ) -> Self {
        Self {
            position,
            dimensions,
            origin,
            rotation,
            scale,
        }
    }

    /// Create a transform with just a position
    #[must_use]
    pub fn from_position(position: Vec2) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Set dimensions
    #[must_use]
    pub fn with_dimensions(mut self, dimensions: Vec2) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Set origin
    #[must_use]
    pub fn with_origin(mut self, origin: Vec2) -> Self {
        self.origin = origin;
        self
    }

    /// Set rotation
    #[must_use]
    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set scale
    #[must_use]
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Translate by a delta
    pub fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }

    /// Derive the world-space pose given the parent's world-space pose
    #[must_use]
    pub fn compose(&self, parent: Option<&Pose2D>) -> Pose2D {
        let (position, rotation, scale) = match parent {
            None => (self.position, self.rotation, self.scale),
            Some(p) => (
                rotate(self.position, p.rotation) * p.scale + p.position,
                self.rotation + p.rotation,
                self.scale * p.scale,
            ),
        };
        Pose2D {
            position,
            rotation,
            scale,
            dimensions: self.dimensions * scale,
            origin: self.origin * scale,
        }
    }

    /// Recompute the local fields so that `compose(parent)` yields `pose`.
    ///
    /// A parent with zero scale cannot be inverted: local position and scale
    /// are then left untouched and only rotation is solved.
    pub fn solve_from_global(&mut self, pose: &Pose2D, parent: Option<&Pose2D>) {
        match parent {
            None => {
                self.position = pose.position;
                self.rotation = pose.rotation;
                self.scale = pose.scale;
            }
            Some(p) => {
                self.rotation = pose.rotation - p.rotation;
                if p.scale == 0.0 {
                    log::warn!("Cannot solve local transform under a zero-scale parent");
                } else {
                    self.position = rotate(pose.position - p.position, -p.rotation) / p.scale;
                    self.scale = pose.scale / p.scale;
                }
            }
        }
        if pose.scale != 0.0 {
            self.dimensions = pose.dimensions / pose.scale;
            self.origin = pose.origin / pose.scale;
        }
    }
}

/// World-space pose of a game object, derived from its transform chain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose2D {
    /// Global position
    pub position: Vec2,
    /// Global rotation in radians
    pub rotation: f32,
    /// Global uniform scale
    pub scale: f32,
    /// Dimensions after global scaling
    pub dimensions: Vec2,
    /// Origin after global scaling
    pub origin: Vec2,
}

impl Pose2D {
    /// Top-left corner after applying origin, rotation and scale
    #[must_use]
    pub fn top_left(&self) -> Vec2 {
        self.position - rotate(self.origin, self.rotation)
    }

    /// Axis-aligned rectangle at the top-left with the scaled dimensions
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::from_position_size(self.top_left(), self.dimensions)
    }

    /// Whether two poses match within `epsilon` on every field
    #[must_use]
    pub fn approx_eq(&self, other: &Pose2D, epsilon: f32) -> bool {
        self.position.abs_diff_eq(other.position, epsilon)
            && (self.rotation - other.rotation).abs() <= epsilon
            && (self.scale - other.scale).abs() <= epsilon
            && self.dimensions.abs_diff_eq(other.dimensions, epsilon)
            && self.origin.abs_diff_eq(other.origin, epsilon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const EPSILON: f32 = 1e-4;

    #[test]
    fn test_rotate_quarter_turn() {
        let v = rotate(Vec2::X, FRAC_PI_2);
        assert!(v.abs_diff_eq(Vec2::Y, EPSILON));
    }

    #[test]
    fn test_rotate_about_pivot() {
        let v = rotate_about(Vec2::new(2.0, 1.0), FRAC_PI_2, Vec2::new(1.0, 1.0));
        assert!(v.abs_diff_eq(Vec2::new(1.0, 2.0), EPSILON));
    }

    #[test]
    fn test_compose_without_parent() {
        let t = Transform2D::new(Vec2::new(3.0, 4.0), Vec2::new(10.0, 20.0), Vec2::ONE, 0.5, 2.0);
        let pose = t.compose(None);

        assert_eq!(pose.position, Vec2::new(3.0, 4.0));
        assert_eq!(pose.rotation, 0.5);
        assert_eq!(pose.scale, 2.0);
        assert_eq!(pose.dimensions, Vec2::new(20.0, 40.0));
    }

    #[test]
    fn test_compose_rotation_then_scale_then_translate() {
        let parent = Transform2D::from_position(Vec2::new(100.0, 50.0))
            .with_rotation(FRAC_PI_2)
            .with_scale(2.0)
            .compose(None);

        let child = Transform2D::from_position(Vec2::new(10.0, 0.0)).compose(Some(&parent));

        assert!(child.position.abs_diff_eq(Vec2::new(100.0, 70.0), EPSILON));
        assert!((child.rotation - FRAC_PI_2).abs() < EPSILON);
        assert!((child.scale - 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_top_left_applies_origin() {
        let pose = Transform2D::from_position(Vec2::new(50.0, 50.0))
            .with_dimensions(Vec2::new(16.0, 16.0))
            .with_origin(Vec2::new(8.0, 8.0))
            .with_scale(2.0)
            .compose(None);

        assert!(pose.top_left().abs_diff_eq(Vec2::new(34.0, 34.0), EPSILON));
        assert_eq!(pose.bounds(), Rect::new(34, 34, 32, 32));
    }

    #[test]
    fn test_solve_round_trips_under_parent() {
        let parent = Transform2D::from_position(Vec2::new(-20.0, 7.0))
            .with_rotation(0.7)
            .with_scale(1.5)
            .compose(None);

        let original = Transform2D::new(
            Vec2::new(5.0, -3.0),
            Vec2::new(8.0, 4.0),
            Vec2::new(4.0, 2.0),
            0.3,
            0.8,
        );
        let target = original.compose(None);

        let mut local = original;
        local.solve_from_global(&target, Some(&parent));

        assert!(local.compose(Some(&parent)).approx_eq(&target, EPSILON));
    }

    #[test]
    fn test_solve_under_zero_scale_parent_keeps_position() {
        let parent = Transform2D::default().with_scale(0.0).compose(None);
        let mut local = Transform2D::from_position(Vec2::new(1.0, 2.0));
        let target = Transform2D::from_position(Vec2::new(9.0, 9.0))
            .with_rotation(1.0)
            .compose(None);

        local.solve_from_global(&target, Some(&parent));

        assert_eq!(local.position, Vec2::new(1.0, 2.0));
        assert!((local.rotation - 1.0).abs() < EPSILON);
    }
}
