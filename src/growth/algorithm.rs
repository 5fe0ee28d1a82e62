use std::f32::consts::TAU;

use glam::{Quat, Vec3};
use rand::Rng;

use super::orientation::{random_bend, spaced_rotation, DEFAULT_BRANCH_BEND, DEFAULT_STEM_BEND};
use super::sequences::BranchSequences;
use crate::decoration::{CollisionCapsule, LeafInstance, DEFAULT_LEAF_SCALE};
use crate::mesh::{MeshAccumulator, RingId};

/// Parameters controlling how a traversal bends and decorates branches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthParams {
    /// Max bend in degrees for children of a split
    pub branch_bend: f32,
    /// Max bend in degrees for a continuing stem
    pub stem_bend: f32,
    /// Uniform scale of each leaf instance
    pub leaf_scale: f32,
    /// Vertices around each ring, excluding the seam duplicate
    pub ring_segments: usize,
}

impl Default for GrowthParams {
    fn default() -> Self {
        Self {
            branch_bend: DEFAULT_BRANCH_BEND,
            stem_bend: DEFAULT_STEM_BEND,
            leaf_scale: DEFAULT_LEAF_SCALE,
            ring_segments: 16,
        }
    }
}

/// A branch waiting to be grown, or a tip parked on the frontier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchEnd {
    pub position: Vec3,
    pub orientation: Quat,
    pub depth: u32,
    /// Last ring written on this strand
    pub ring: Option<RingId>,
}

impl BranchEnd {
    pub fn root(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
            depth: 0,
            ring: None,
        }
    }
}

/// Everything one traversal produced besides body geometry
#[derive(Debug, Clone, Default)]
pub struct GrowthLayer {
    /// Terminal ends, in the order they were reached
    pub frontier: Vec<BranchEnd>,
    pub leaves: Vec<LeafInstance>,
    pub capsules: Vec<CollisionCapsule>,
}

/// Stack-driven branch generator
pub struct BranchGrowth<'a> {
    sequences: &'a BranchSequences,
    params: GrowthParams,
}

impl<'a> BranchGrowth<'a> {
    pub fn new(sequences: &'a BranchSequences, params: GrowthParams) -> Self {
        Self { sequences, params }
    }

    pub fn params(&self) -> &GrowthParams {
        &self.params
    }

    pub fn is_terminal(&self, end: &BranchEnd, budget: u32) -> bool {
        end.depth >= budget || self.sequences.is_exhausted(end.depth)
    }

    /// Pop ends until the stack is empty, writing rings into `mesh`.
    ///
    /// Every end either becomes a segment whose children are pushed back on
    /// the stack, or a terminal that gets a cap, a leaf and a frontier slot.
    pub fn grow<R: Rng + ?Sized>(
        &self,
        mut stack: Vec<BranchEnd>,
        budget: u32,
        rng: &mut R,
        mesh: &mut MeshAccumulator<'_>,
    ) -> GrowthLayer {
        let mut layer = GrowthLayer::default();

        while let Some(end) = stack.pop() {
            if self.is_terminal(&end, budget) {
                let already_capped = end.ring.map(|id| mesh.is_cap(id)).unwrap_or(false);
                let cap = if already_capped {
                    end.ring
                } else {
                    let radius = self.sequences.radius(end.depth);
                    Some(mesh.push_ring(end.position, end.orientation, radius, false, end.ring))
                };

                layer.leaves.push(LeafInstance::new(
                    end.position,
                    end.orientation,
                    self.params.leaf_scale,
                ));
                layer.frontier.push(BranchEnd { ring: cap, ..end });
                continue;
            }

            let depth = end.depth;
            let radius = self.sequences.radius(depth);
            let tip = end.position + end.orientation * self.sequences.length(depth);

            let ring = mesh.push_ring(end.position, end.orientation, radius, true, end.ring);
            layer.capsules.push(CollisionCapsule::new(end.position, tip, radius));

            let count = self.sequences.branch_count(depth);
            if count > 0 {
                for i in 0..count {
                    let heading = TAU * i as f32 / count as f32;
                    stack.push(BranchEnd {
                        position: tip,
                        orientation: spaced_rotation(end.orientation, heading, self.params.branch_bend, rng),
                        depth: depth + 1,
                        ring: Some(ring),
                    });
                }
            } else {
                stack.push(BranchEnd {
                    position: tip,
                    orientation: random_bend(end.orientation, self.params.stem_bend, rng),
                    depth: depth + 1,
                    ring: Some(ring),
                });
            }
        }

        layer
    }
}
