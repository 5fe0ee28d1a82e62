use wasm_bindgen::prelude::*;

pub mod animation;
pub mod config;
pub mod decoration;
pub mod error;
pub mod growth;
pub mod host;
pub mod mesh;
pub mod tree;

pub use config::TreeConfig;
pub use error::{Result, TreeError};
pub use tree::{FractalTree, GrowOptions, TreeSnapshot};

use animation::GrowthSchedule;
use host::MemoryHost;

/// Initialize panic hook for better error messages
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn to_js(err: TreeError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Tree engine state exposed to JavaScript.
///
/// Assets are resolved by path against an in-memory host; the page loads the
/// actual files under the same paths.
#[wasm_bindgen]
pub struct FractalTreeEngine {
    tree: FractalTree,
    host: MemoryHost,
    schedule: GrowthSchedule,
    grow_options: GrowOptions,
}

#[wasm_bindgen]
impl FractalTreeEngine {
    /// Build a tree from a YAML config and a seed
    #[wasm_bindgen(constructor)]
    pub fn new(config_yaml: &str, seed: u32) -> std::result::Result<FractalTreeEngine, JsValue> {
        let config = TreeConfig::from_yaml(config_yaml).map_err(to_js)?;
        Self::build(&config, seed)
    }

    /// Build the default sapling
    #[wasm_bindgen]
    pub fn default_tree(seed: u32) -> std::result::Result<FractalTreeEngine, JsValue> {
        Self::build(&TreeConfig::default(), seed)
    }

    fn build(config: &TreeConfig, seed: u32) -> std::result::Result<FractalTreeEngine, JsValue> {
        let mut host = MemoryHost::with_assets(&config.assets);
        let tree = FractalTree::from_seed(config, seed as u64, &mut host).map_err(to_js)?;
        Ok(Self {
            tree,
            host,
            schedule: GrowthSchedule::default(),
            grow_options: GrowOptions::default(),
        })
    }

    /// Grow with the default options
    #[wasm_bindgen]
    pub fn grow(&mut self, steps: u32) -> std::result::Result<(), JsValue> {
        let options = GrowOptions {
            steps,
            ..self.grow_options
        };
        self.tree.grow(&mut self.host, options).map_err(to_js)
    }

    #[wasm_bindgen]
    pub fn grow_with(
        &mut self,
        steps: u32,
        remove_old_leaves: bool,
        leaf_scale_delta: f32,
        size_scale: f32,
    ) -> std::result::Result<(), JsValue> {
        let options = GrowOptions {
            steps,
            remove_old_leaves,
            leaf_scale_delta,
            size_scale,
        };
        self.tree.grow(&mut self.host, options).map_err(to_js)
    }

    /// Grow once per `interval` seconds until `duration` has passed
    #[wasm_bindgen]
    pub fn start_growth(&mut self, interval: f32, duration: f32) {
        self.schedule = GrowthSchedule::new(interval, duration);
        self.schedule.start();
    }

    #[wasm_bindgen]
    pub fn stop_growth(&mut self) {
        self.schedule.pause();
    }

    #[wasm_bindgen]
    pub fn is_growth_complete(&self) -> bool {
        self.schedule.complete
    }

    /// Advance the growth schedule; returns the number of steps applied
    #[wasm_bindgen]
    pub fn update(&mut self, dt: f32) -> std::result::Result<u32, JsValue> {
        let due = self.schedule.update(dt);
        if due > 0 {
            self.grow(due)?;
        }
        Ok(due)
    }

    /// Interleaved position(3) + normal(3) + uv(2) per vertex
    #[wasm_bindgen]
    pub fn vertex_data(&self) -> js_sys::Float32Array {
        js_sys::Float32Array::from(&self.tree.body().vertex_data()[..])
    }

    /// Triangle list indices into `vertex_data`
    #[wasm_bindgen]
    pub fn index_data(&self) -> Vec<u32> {
        self.tree.body().triangle_indices()
    }

    /// Column-major 4x4 matrix per leaf, root space
    #[wasm_bindgen]
    pub fn leaf_transforms(&self) -> js_sys::Float32Array {
        let data: Vec<f32> = self
            .tree
            .snapshot()
            .leaf_transforms()
            .iter()
            .flat_map(|m| m.to_cols_array())
            .collect();
        js_sys::Float32Array::from(&data[..])
    }

    /// start(3) + end(3) + radius(1) per capsule
    #[wasm_bindgen]
    pub fn collision_capsules(&self) -> js_sys::Float32Array {
        let data: Vec<f32> = self
            .tree
            .collision()
            .iter()
            .flat_map(|proxy| proxy.capsule.to_array())
            .collect();
        js_sys::Float32Array::from(&data[..])
    }

    #[wasm_bindgen]
    pub fn root_transform(&self) -> js_sys::Float32Array {
        js_sys::Float32Array::from(&self.tree.root_transform().to_cols_array()[..])
    }

    /// Current depth budget
    #[wasm_bindgen]
    pub fn iterations(&self) -> u32 {
        self.tree.budget()
    }

    #[wasm_bindgen]
    pub fn frontier_len(&self) -> usize {
        self.tree.frontier().len()
    }

    #[wasm_bindgen]
    pub fn leaf_count(&self) -> usize {
        self.tree.leaves().len()
    }

    #[wasm_bindgen]
    pub fn triangle_count(&self) -> usize {
        self.tree.body().triangle_count()
    }

    #[wasm_bindgen]
    pub fn root_scale(&self) -> f32 {
        self.tree.root_scale()
    }

    /// Bounding sphere as [cx, cy, cz, radius]
    #[wasm_bindgen]
    pub fn bounds(&self) -> Vec<f32> {
        let (center, radius) = self.tree.body().bounds();
        vec![center.x, center.y, center.z, radius]
    }
}
