use thiserror::Error;

use crate::host::{AssetError, CollisionError};

/// Errors raised while building or growing a tree
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("invalid tree configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid growth request: {0}")]
    InvalidGrowth(String),

    #[error("failed to parse tree config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Collision(#[from] CollisionError),
}

pub type Result<T> = std::result::Result<T, TreeError>;
