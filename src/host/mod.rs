//! Interfaces to the engine that loads assets, owns the scene graph and runs
//! collision. The tree only ever talks to these traits.

pub mod memory;

pub use memory::MemoryHost;

use glam::Mat4;
use thiserror::Error;

use crate::decoration::CollisionCapsule;

/// Opaque handle to an instanceable model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelHandle(pub u32);

/// Opaque handle to a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Opaque handle to a registered collision solid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyHandle(pub u32);

/// Scene nodes the tree exposes to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneNode {
    /// Parent of the three geometry groups; carries the growth scale
    Root,
    Body,
    Leaves,
    Collision,
    /// The model shared by every leaf instance
    LeafModel(ModelHandle),
}

#[derive(Debug, Clone, Error)]
#[error("asset '{path}' could not be resolved: {reason}")]
pub struct AssetError {
    pub path: String,
    pub reason: String,
}

impl AssetError {
    pub fn not_found(path: &str) -> Self {
        Self {
            path: path.to_string(),
            reason: "not found".to_string(),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("collision backend rejected capsule: {0}")]
pub struct CollisionError(pub String);

pub trait AssetProvider {
    fn load_model(&mut self, path: &str) -> Result<ModelHandle, AssetError>;
    fn load_texture(&mut self, path: &str) -> Result<TextureHandle, AssetError>;
}

pub trait SceneAdapter {
    fn attach(&mut self, node: SceneNode);
    fn set_transform(&mut self, node: SceneNode, transform: Mat4);
    fn set_texture(&mut self, node: SceneNode, texture: TextureHandle);
}

pub trait CollisionBackend {
    fn add_capsule(&mut self, capsule: &CollisionCapsule) -> Result<ProxyHandle, CollisionError>;
    fn remove_capsule(&mut self, handle: ProxyHandle);
}

/// Everything a tree needs from its host
pub trait TreeHost: AssetProvider + SceneAdapter + CollisionBackend {}

impl<T: AssetProvider + SceneAdapter + CollisionBackend + ?Sized> TreeHost for T {}
