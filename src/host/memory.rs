use std::collections::{BTreeMap, HashMap};

use glam::Mat4;

use super::{
    AssetError, AssetProvider, CollisionBackend, CollisionError, ModelHandle, ProxyHandle,
    SceneAdapter, SceneNode, TextureHandle,
};
use crate::config::AssetPaths;
use crate::decoration::CollisionCapsule;

/// Host that keeps everything in memory.
///
/// Assets resolve only if their path was registered up front. Used by the
/// web facade, where the page loads the real files under the same paths.
#[derive(Debug, Default)]
pub struct MemoryHost {
    models: HashMap<String, ModelHandle>,
    textures: HashMap<String, TextureHandle>,
    next_asset: u32,
    attached: Vec<SceneNode>,
    transforms: HashMap<SceneNode, Mat4>,
    bound_textures: HashMap<SceneNode, TextureHandle>,
    capsules: BTreeMap<ProxyHandle, CollisionCapsule>,
    next_proxy: u32,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host with every path in `assets` registered
    pub fn with_assets(assets: &AssetPaths) -> Self {
        let mut host = Self::new();
        host.register_texture(&assets.bark_texture);
        host.register_model(&assets.leaf_model);
        host.register_texture(&assets.leaf_texture);
        host
    }

    pub fn register_model(&mut self, path: &str) -> ModelHandle {
        if let Some(&handle) = self.models.get(path) {
            return handle;
        }
        let handle = ModelHandle(self.next_asset);
        self.next_asset += 1;
        self.models.insert(path.to_string(), handle);
        handle
    }

    pub fn register_texture(&mut self, path: &str) -> TextureHandle {
        if let Some(&handle) = self.textures.get(path) {
            return handle;
        }
        let handle = TextureHandle(self.next_asset);
        self.next_asset += 1;
        self.textures.insert(path.to_string(), handle);
        handle
    }

    pub fn attached(&self) -> &[SceneNode] {
        &self.attached
    }

    pub fn transform(&self, node: SceneNode) -> Option<Mat4> {
        self.transforms.get(&node).copied()
    }

    pub fn texture(&self, node: SceneNode) -> Option<TextureHandle> {
        self.bound_textures.get(&node).copied()
    }

    pub fn capsule(&self, handle: ProxyHandle) -> Option<&CollisionCapsule> {
        self.capsules.get(&handle)
    }

    pub fn capsule_count(&self) -> usize {
        self.capsules.len()
    }
}

impl AssetProvider for MemoryHost {
    fn load_model(&mut self, path: &str) -> Result<ModelHandle, AssetError> {
        self.models
            .get(path)
            .copied()
            .ok_or_else(|| AssetError::not_found(path))
    }

    fn load_texture(&mut self, path: &str) -> Result<TextureHandle, AssetError> {
        self.textures
            .get(path)
            .copied()
            .ok_or_else(|| AssetError::not_found(path))
    }
}

impl SceneAdapter for MemoryHost {
    fn attach(&mut self, node: SceneNode) {
        if !self.attached.contains(&node) {
            self.attached.push(node);
        }
    }

    fn set_transform(&mut self, node: SceneNode, transform: Mat4) {
        self.transforms.insert(node, transform);
    }

    fn set_texture(&mut self, node: SceneNode, texture: TextureHandle) {
        self.bound_textures.insert(node, texture);
    }
}

impl CollisionBackend for MemoryHost {
    fn add_capsule(&mut self, capsule: &CollisionCapsule) -> Result<ProxyHandle, CollisionError> {
        if !capsule.radius.is_finite() || !capsule.start.is_finite() || !capsule.end.is_finite() {
            return Err(CollisionError(format!("non-finite capsule {:?}", capsule)));
        }
        let handle = ProxyHandle(self.next_proxy);
        self.next_proxy += 1;
        self.capsules.insert(handle, *capsule);
        Ok(handle)
    }

    fn remove_capsule(&mut self, handle: ProxyHandle) {
        self.capsules.remove(&handle);
    }
}
