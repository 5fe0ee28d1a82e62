//! Leaf placement at branch tips and collision capsules along segments.

use glam::{Mat4, Quat, Vec3};

/// Default uniform scale of a leaf instance in its own space
pub const DEFAULT_LEAF_SCALE: f32 = 0.125;

/// One placement of the shared leaf model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeafInstance {
    pub position: Vec3,
    pub orientation: Quat,
    pub scale: f32,
}

impl LeafInstance {
    pub fn new(position: Vec3, orientation: Quat, scale: f32) -> Self {
        Self {
            position,
            orientation,
            scale,
        }
    }

    /// Scale in leaf space, then rotate to the branch, then move to the tip
    pub fn transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), self.orientation, self.position)
    }
}

/// Capsule spanning one branch segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionCapsule {
    pub start: Vec3,
    pub end: Vec3,
    pub radius: f32,
}

impl CollisionCapsule {
    pub fn new(start: Vec3, end: Vec3, radius: f32) -> Self {
        Self { start, end, radius }
    }

    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }

    /// start(3) + end(3) + radius(1)
    pub fn to_array(&self) -> [f32; 7] {
        [
            self.start.x, self.start.y, self.start.z,
            self.end.x, self.end.y, self.end.z,
            self.radius,
        ]
    }
}
