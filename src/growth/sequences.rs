use glam::Vec3;

use crate::error::{Result, TreeError};

/// Scalar parameters for deriving per-depth sequences by repeated scaling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleParams {
    /// Trunk radius at depth 0
    pub radius: f32,
    /// Segment vector at depth 0, in branch-local space
    pub length: Vec3,
    /// Children spawned at each branching depth
    pub branching_factor: u32,
    /// Branch every N depths
    pub branch_every: u32,
    /// Number of depths to precompute
    pub iterations: u32,
    /// Radius divisor for segments that do not follow a split
    pub radius_taper: f32,
    /// Per-axis length divisor applied at each depth
    pub length_shrink: Vec3,
}

impl Default for ScaleParams {
    fn default() -> Self {
        Self {
            radius: 0.5,
            length: Vec3::Z,
            branching_factor: 3,
            branch_every: 3,
            iterations: 64,
            radius_taper: 1.125,
            length_shrink: Vec3::splat(1.125),
        }
    }
}

/// How the depth-indexed sequences are produced
#[derive(Debug, Clone, PartialEq)]
pub enum SequenceStrategy {
    ScaleBased(ScaleParams),
    Custom {
        lengths: Vec<Vec3>,
        radii: Vec<f32>,
        branch_counts: Vec<u32>,
    },
}

/// Per-depth segment length, radius and branch count.
///
/// All three sequences share one length; a branch whose `depth + 1` reaches
/// that length is terminal no matter how large the growth budget is.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchSequences {
    lengths: Vec<Vec3>,
    radii: Vec<f32>,
    branch_counts: Vec<u32>,
}

impl BranchSequences {
    pub fn build(strategy: &SequenceStrategy) -> Result<Self> {
        match strategy {
            SequenceStrategy::ScaleBased(params) => Self::scale_based(params),
            SequenceStrategy::Custom {
                lengths,
                radii,
                branch_counts,
            } => Self::custom(lengths.clone(), radii.clone(), branch_counts.clone()),
        }
    }

    /// Derive sequences from a handful of scalars.
    ///
    /// Radius after a k-way split shrinks by `sqrt(k)` so the children's
    /// combined cross-section roughly matches the parent's; other segments
    /// taper by `radius_taper`.
    pub fn scale_based(params: &ScaleParams) -> Result<Self> {
        if params.iterations == 0 {
            return Err(TreeError::InvalidConfig(
                "iterations must be greater than zero".into(),
            ));
        }
        if params.branch_every == 0 {
            return Err(TreeError::InvalidConfig(
                "branch_every must be at least 1".into(),
            ));
        }
        check_radius(params.radius)?;
        if !params.length.is_finite() {
            return Err(TreeError::InvalidConfig(format!(
                "length must be finite, got {}",
                params.length
            )));
        }
        check_divisor("radius_taper", params.radius_taper)?;
        for (axis, shrink) in ["x", "y", "z"].iter().zip(params.length_shrink.to_array()) {
            check_divisor(&format!("length_shrink.{}", axis), shrink)?;
        }

        let n = params.iterations as usize;

        let branch_counts: Vec<u32> = (0..params.iterations)
            .map(|d| {
                if d % params.branch_every == 0 {
                    params.branching_factor
                } else {
                    0
                }
            })
            .collect();

        let mut lengths = Vec::with_capacity(n);
        let mut length = params.length;
        lengths.push(length);
        for _ in 1..n {
            length /= params.length_shrink;
            lengths.push(length);
        }

        let mut radii = Vec::with_capacity(n);
        let mut radius = params.radius;
        radii.push(radius);
        for d in 1..n {
            let split = if d >= 2 { branch_counts[d - 2] } else { 0 };
            if split > 0 {
                radius /= (split as f32).sqrt();
            } else {
                radius /= params.radius_taper;
            }
            radii.push(radius);
        }

        Ok(Self {
            lengths,
            radii,
            branch_counts,
        })
    }

    /// Use caller-provided sequences verbatim
    pub fn custom(lengths: Vec<Vec3>, radii: Vec<f32>, branch_counts: Vec<u32>) -> Result<Self> {
        if lengths.is_empty() {
            return Err(TreeError::InvalidConfig(
                "custom sequences must not be empty".into(),
            ));
        }
        if lengths.len() != radii.len() || lengths.len() != branch_counts.len() {
            return Err(TreeError::InvalidConfig(format!(
                "custom sequences differ in length: {} lengths, {} radii, {} branch counts",
                lengths.len(),
                radii.len(),
                branch_counts.len()
            )));
        }
        for &radius in &radii {
            check_radius(radius)?;
        }
        if lengths.iter().any(|l| !l.is_finite()) {
            return Err(TreeError::InvalidConfig(
                "custom lengths must be finite".into(),
            ));
        }

        Ok(Self {
            lengths,
            radii,
            branch_counts,
        })
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// Whether a branch at `depth` has no successor depth to grow into
    pub fn is_exhausted(&self, depth: u32) -> bool {
        depth as usize + 1 >= self.len()
    }

    pub fn length(&self, depth: u32) -> Vec3 {
        self.lengths[depth as usize]
    }

    pub fn radius(&self, depth: u32) -> f32 {
        self.radii[depth as usize]
    }

    pub fn branch_count(&self, depth: u32) -> u32 {
        self.branch_counts[depth as usize]
    }

    pub fn lengths(&self) -> &[Vec3] {
        &self.lengths
    }

    pub fn radii(&self) -> &[f32] {
        &self.radii
    }

    pub fn branch_counts(&self) -> &[u32] {
        &self.branch_counts
    }
}

fn check_radius(radius: f32) -> Result<()> {
    if !radius.is_finite() || radius < 0.0 {
        return Err(TreeError::InvalidConfig(format!(
            "radius must be finite and non-negative, got {}",
            radius
        )));
    }
    Ok(())
}

fn check_divisor(name: &str, value: f32) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(TreeError::InvalidConfig(format!(
            "{} must be finite and positive, got {}",
            name, value
        )));
    }
    Ok(())
}
