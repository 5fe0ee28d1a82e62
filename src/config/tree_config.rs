use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::decoration::DEFAULT_LEAF_SCALE;
use crate::error::{Result, TreeError};
use crate::growth::orientation::{DEFAULT_BRANCH_BEND, DEFAULT_STEM_BEND};
use crate::growth::{GrowthParams, ScaleParams, SequenceStrategy};

/// Paths handed to the asset provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetPaths {
    pub bark_texture: String,
    pub leaf_model: String,
    pub leaf_texture: String,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            bark_texture: "models/tree/default/barkTexture.jpg".to_string(),
            leaf_model: "models/tree/default/shrubbery".to_string(),
            leaf_texture: "models/tree/default/material-10-cl.png".to_string(),
        }
    }
}

/// Hand-written per-depth lists, used instead of the scale-based derivation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomSequences {
    pub lengths: Vec<[f32; 3]>,
    pub radii: Vec<f32>,
    pub branch_counts: Vec<i32>,
}

/// Tree description as read from YAML.
///
/// Counts are signed here so that negative values coming from a file are
/// reported as configuration errors instead of parse errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TreeConfig {
    pub radius: f32,
    pub length: [f32; 3],
    pub branching_factor: i32,
    pub branch_every: i32,
    pub iterations: i32,
    pub radius_taper: f32,
    pub length_shrink: [f32; 3],
    /// Depth budget for the first generation; the sequence length if unset
    pub initial_budget: Option<i32>,
    pub root_position: [f32; 3],
    /// Max bend in degrees for children of a split
    pub branch_bend: f32,
    /// Max bend in degrees for a continuing stem
    pub stem_bend: f32,
    pub leaf_scale: f32,
    pub ring_segments: usize,
    pub sequences: Option<CustomSequences>,
    pub assets: AssetPaths,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            radius: 0.5,
            length: [0.0, 0.0, 1.0],
            branching_factor: 3,
            branch_every: 3,
            iterations: 64,
            radius_taper: 1.125,
            length_shrink: [1.125, 1.125, 1.125],
            initial_budget: Some(1), // sapling, grown over time
            root_position: [0.0, 0.0, 0.0],
            branch_bend: DEFAULT_BRANCH_BEND,
            stem_bend: DEFAULT_STEM_BEND,
            leaf_scale: DEFAULT_LEAF_SCALE,
            ring_segments: 16,
            sequences: None,
            assets: AssetPaths::default(),
        }
    }
}

impl TreeConfig {
    /// Parse and validate a YAML tree description
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: TreeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Check everything that can be checked without building sequences
    pub fn validate(&self) -> Result<()> {
        self.sequence_strategy()?;
        self.growth_params()?;
        if let Some(budget) = self.initial_budget {
            if budget < 0 {
                return Err(TreeError::InvalidConfig(format!(
                    "initial_budget must not be negative, got {}",
                    budget
                )));
            }
        }
        if !Vec3::from(self.root_position).is_finite() {
            return Err(TreeError::InvalidConfig("root_position must be finite".into()));
        }
        Ok(())
    }

    pub fn sequence_strategy(&self) -> Result<SequenceStrategy> {
        if let Some(custom) = &self.sequences {
            let branch_counts = custom
                .branch_counts
                .iter()
                .map(|&count| non_negative("branch_counts", count))
                .collect::<Result<Vec<_>>>()?;
            return Ok(SequenceStrategy::Custom {
                lengths: custom.lengths.iter().map(|&l| Vec3::from(l)).collect(),
                radii: custom.radii.clone(),
                branch_counts,
            });
        }

        if self.iterations <= 0 {
            return Err(TreeError::InvalidConfig(format!(
                "iterations must be greater than zero, got {}",
                self.iterations
            )));
        }
        if self.branch_every < 1 {
            return Err(TreeError::InvalidConfig(format!(
                "branch_every must be at least 1, got {}",
                self.branch_every
            )));
        }
        if !Vec3::from(self.length).is_finite() {
            return Err(TreeError::InvalidConfig(format!(
                "length must be finite, got {:?}",
                self.length
            )));
        }

        Ok(SequenceStrategy::ScaleBased(ScaleParams {
            radius: self.radius,
            length: Vec3::from(self.length),
            branching_factor: non_negative("branching_factor", self.branching_factor)?,
            branch_every: self.branch_every as u32,
            iterations: self.iterations as u32,
            radius_taper: self.radius_taper,
            length_shrink: Vec3::from(self.length_shrink),
        }))
    }

    pub fn growth_params(&self) -> Result<GrowthParams> {
        if self.ring_segments < 3 {
            return Err(TreeError::InvalidConfig(format!(
                "ring_segments must be at least 3, got {}",
                self.ring_segments
            )));
        }
        for (name, value) in [
            ("branch_bend", self.branch_bend),
            ("stem_bend", self.stem_bend),
            ("leaf_scale", self.leaf_scale),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(TreeError::InvalidConfig(format!(
                    "{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }

        Ok(GrowthParams {
            branch_bend: self.branch_bend,
            stem_bend: self.stem_bend,
            leaf_scale: self.leaf_scale,
            ring_segments: self.ring_segments,
        })
    }

    pub fn root_position(&self) -> Vec3 {
        Vec3::from(self.root_position)
    }
}

fn non_negative(name: &str, value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        TreeError::InvalidConfig(format!("{} must not be negative, got {}", name, value))
    })
}
