//! The tree itself: owns the body mesh, leaves, collision proxies and the
//! frontier of tips, and grows them one depth layer at a time.

use glam::{Mat4, Vec3};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use tracing::{debug, info, warn};

use crate::config::TreeConfig;
use crate::decoration::{CollisionCapsule, LeafInstance};
use crate::error::{Result, TreeError};
use crate::growth::{BranchEnd, BranchGrowth, BranchSequences, GrowthParams, SequenceStrategy};
use crate::host::{CollisionBackend, ModelHandle, ProxyHandle, SceneNode, TextureHandle, TreeHost};
use crate::mesh::{MeshAccumulator, TubeMesh};

/// Options for one call to [`FractalTree::grow`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowOptions {
    /// Depth layers to add; 0 only rescales
    pub steps: u32,
    /// Drop the leaves of earlier generations
    pub remove_old_leaves: bool,
    /// Multiplier for the shared leaf model per pass
    pub leaf_scale_delta: f32,
    /// Multiplier for the whole tree per pass
    pub size_scale: f32,
}

impl Default for GrowOptions {
    fn default() -> Self {
        Self {
            steps: 1,
            remove_old_leaves: true,
            leaf_scale_delta: 1.0,
            size_scale: 1.125,
        }
    }
}

impl GrowOptions {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("size_scale", self.size_scale),
            ("leaf_scale_delta", self.leaf_scale_delta),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(TreeError::InvalidGrowth(format!(
                    "{} must be finite and positive, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// A capsule together with the handle the collision backend gave it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionProxy {
    pub capsule: CollisionCapsule,
    pub handle: ProxyHandle,
}

/// Register every capsule, releasing the ones already added if any fails
fn register_capsules<H: CollisionBackend + ?Sized>(
    host: &mut H,
    capsules: &[CollisionCapsule],
) -> Result<Vec<CollisionProxy>> {
    let mut proxies = Vec::with_capacity(capsules.len());
    for capsule in capsules {
        match host.add_capsule(capsule) {
            Ok(handle) => proxies.push(CollisionProxy {
                capsule: *capsule,
                handle,
            }),
            Err(err) => {
                warn!(
                    registered = proxies.len(),
                    "collision backend rejected capsule, rolling back: {}", err
                );
                release(host, &proxies);
                return Err(err.into());
            }
        }
    }
    Ok(proxies)
}

fn release<H: CollisionBackend + ?Sized>(host: &mut H, proxies: &[CollisionProxy]) {
    for proxy in proxies {
        host.remove_capsule(proxy.handle);
    }
}

/// Read-only view of a tree, in the space of its root node
#[derive(Debug, Clone, Copy)]
pub struct TreeSnapshot<'a> {
    pub body: &'a TubeMesh,
    pub leaves: &'a [LeafInstance],
    pub collision: &'a [CollisionProxy],
    pub root_transform: Mat4,
    pub leaf_model_transform: Mat4,
}

impl<'a> TreeSnapshot<'a> {
    /// Per-leaf transforms with the shared model scale folded in
    pub fn leaf_transforms(&self) -> Vec<Mat4> {
        self.leaves
            .iter()
            .map(|leaf| leaf.transform() * self.leaf_model_transform)
            .collect()
    }

    pub fn capsules(&self) -> impl Iterator<Item = &CollisionCapsule> + '_ {
        self.collision.iter().map(|proxy| &proxy.capsule)
    }
}

/// A procedurally grown tree
pub struct FractalTree<R: Rng = Pcg32> {
    sequences: BranchSequences,
    params: GrowthParams,
    body: TubeMesh,
    leaves: Vec<LeafInstance>,
    collision: Vec<CollisionProxy>,
    frontier: Vec<BranchEnd>,
    budget: u32,
    root_scale: f32,
    leaf_model_scale: f32,
    bark_texture: TextureHandle,
    leaf_model: ModelHandle,
    rng: R,
}

impl FractalTree<Pcg32> {
    /// Build a tree driven by a seeded [`Pcg32`]
    pub fn from_seed<H: TreeHost + ?Sized>(config: &TreeConfig, seed: u64, host: &mut H) -> Result<Self> {
        Self::new(config, Pcg32::seed_from_u64(seed), host)
    }
}

impl<R: Rng> FractalTree<R> {
    /// Build the first generation and hand it to the host.
    ///
    /// Assets are resolved before any geometry is produced, so a missing
    /// asset leaves the host untouched.
    pub fn new<H: TreeHost + ?Sized>(config: &TreeConfig, mut rng: R, host: &mut H) -> Result<Self> {
        config.validate()?;
        let strategy = config.sequence_strategy()?;
        let sequences = BranchSequences::build(&strategy)?;
        let params = config.growth_params()?;

        let budget = match config.initial_budget {
            Some(budget) => {
                let budget = budget.max(0) as u32;
                if matches!(strategy, SequenceStrategy::Custom { .. }) && budget as usize >= sequences.len() {
                    warn!(
                        budget,
                        depths = sequences.len(),
                        "custom sequences end before the growth budget"
                    );
                }
                budget
            }
            None => sequences.len() as u32,
        };

        let bark_texture = host.load_texture(&config.assets.bark_texture)?;
        let leaf_model = host.load_model(&config.assets.leaf_model)?;
        let leaf_texture = host.load_texture(&config.assets.leaf_texture)?;

        let mut body = TubeMesh::new(params.ring_segments);
        let growth = BranchGrowth::new(&sequences, params);
        let mut acc = MeshAccumulator::continuing(&body);
        let layer = growth.grow(
            vec![BranchEnd::root(config.root_position())],
            budget,
            &mut rng,
            &mut acc,
        );
        let delta = acc.finish();

        let collision = register_capsules(host, &layer.capsules)?;
        let applied = body.apply(delta);
        debug_assert!(applied);

        let model_node = SceneNode::LeafModel(leaf_model);
        for node in [SceneNode::Root, SceneNode::Body, SceneNode::Leaves, SceneNode::Collision, model_node] {
            host.attach(node);
        }
        host.set_texture(SceneNode::Body, bark_texture);
        host.set_texture(model_node, leaf_texture);
        host.set_transform(SceneNode::Root, Mat4::IDENTITY);
        host.set_transform(model_node, Mat4::IDENTITY);

        info!(
            budget,
            depths = sequences.len(),
            rings = body.ring_count(),
            leaves = layer.leaves.len(),
            capsules = collision.len(),
            "tree constructed"
        );

        Ok(Self {
            sequences,
            params,
            body,
            leaves: layer.leaves,
            collision,
            frontier: layer.frontier,
            budget,
            root_scale: 1.0,
            leaf_model_scale: 1.0,
            bark_texture,
            leaf_model,
            rng,
        })
    }

    pub fn sequences(&self) -> &BranchSequences {
        &self.sequences
    }

    pub fn params(&self) -> &GrowthParams {
        &self.params
    }

    pub fn body(&self) -> &TubeMesh {
        &self.body
    }

    pub fn leaves(&self) -> &[LeafInstance] {
        &self.leaves
    }

    pub fn collision(&self) -> &[CollisionProxy] {
        &self.collision
    }

    pub fn frontier(&self) -> &[BranchEnd] {
        &self.frontier
    }

    /// Deepest depth the next traversal may reach
    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn root_scale(&self) -> f32 {
        self.root_scale
    }

    pub fn leaf_model_scale(&self) -> f32 {
        self.leaf_model_scale
    }

    pub fn leaf_model(&self) -> ModelHandle {
        self.leaf_model
    }

    pub fn bark_texture(&self) -> TextureHandle {
        self.bark_texture
    }

    pub fn root_transform(&self) -> Mat4 {
        Mat4::from_scale(Vec3::splat(self.root_scale))
    }

    pub fn leaf_model_transform(&self) -> Mat4 {
        Mat4::from_scale(Vec3::splat(self.leaf_model_scale))
    }

    pub fn snapshot(&self) -> TreeSnapshot<'_> {
        TreeSnapshot {
            body: &self.body,
            leaves: &self.leaves,
            collision: &self.collision,
            root_transform: self.root_transform(),
            leaf_model_transform: self.leaf_model_transform(),
        }
    }
}

impl<R: Rng + Clone> FractalTree<R> {
    /// Extend the tree by `options.steps` depth layers.
    ///
    /// All passes are staged first. Nothing on the tree changes, and every
    /// capsule registered during the call is released, if any step fails.
    pub fn grow<H: TreeHost + ?Sized>(&mut self, host: &mut H, options: GrowOptions) -> Result<()> {
        options.validate()?;

        let mut rng = self.rng.clone();
        let mut budget = self.budget;
        let mut frontier = self.frontier.clone();
        let mut leaves = self.leaves.clone();
        let mut capsules = Vec::new();
        let mut root_scale = self.root_scale;
        let mut leaf_model_scale = self.leaf_model_scale;

        let growth = BranchGrowth::new(&self.sequences, self.params);
        let mut acc = MeshAccumulator::continuing(&self.body);

        for pass in 0..options.steps.max(1) {
            root_scale *= options.size_scale;
            leaf_model_scale *= options.leaf_scale_delta / options.size_scale;
            if options.remove_old_leaves {
                leaves.clear();
            }
            if pass < options.steps {
                budget += 1;
                let layer = growth.grow(frontier, budget, &mut rng, &mut acc);
                debug!(
                    pass,
                    budget,
                    tips = layer.frontier.len(),
                    capsules = layer.capsules.len(),
                    "growth pass staged"
                );
                frontier = layer.frontier;
                leaves.extend(layer.leaves);
                capsules.extend(layer.capsules);
            }
        }
        let delta = acc.finish();

        let proxies = register_capsules(host, &capsules)?;
        let rings = delta.ring_count();
        if !self.body.apply(delta) {
            release(host, &proxies);
            return Err(TreeError::InvalidGrowth(
                "body mesh changed while growth was staged".into(),
            ));
        }

        self.rng = rng;
        self.budget = budget;
        self.frontier = frontier;
        self.leaves = leaves;
        self.collision.extend(proxies);
        self.root_scale = root_scale;
        self.leaf_model_scale = leaf_model_scale;

        host.set_texture(SceneNode::Body, self.bark_texture);
        host.set_transform(SceneNode::Root, self.root_transform());
        host.set_transform(SceneNode::LeafModel(self.leaf_model), self.leaf_model_transform());

        debug!(
            budget,
            rings,
            leaves = self.leaves.len(),
            root_scale,
            "growth committed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssetPaths;
    use crate::host::{AssetError, AssetProvider, CollisionError, MemoryHost, SceneAdapter};

    const STEM_YAML: &str = r#"
branching_factor: 0
iterations: 8
initial_budget: 1
"#;

    fn host() -> MemoryHost {
        MemoryHost::with_assets(&AssetPaths::default())
    }

    fn default_tree(host: &mut MemoryHost) -> FractalTree {
        FractalTree::from_seed(&TreeConfig::default(), 42, host).unwrap()
    }

    /// Delegates to a [`MemoryHost`] but refuses capsules after a quota
    struct QuotaHost {
        inner: MemoryHost,
        quota: usize,
    }

    impl AssetProvider for QuotaHost {
        fn load_model(&mut self, path: &str) -> std::result::Result<ModelHandle, AssetError> {
            self.inner.load_model(path)
        }

        fn load_texture(&mut self, path: &str) -> std::result::Result<TextureHandle, AssetError> {
            self.inner.load_texture(path)
        }
    }

    impl SceneAdapter for QuotaHost {
        fn attach(&mut self, node: SceneNode) {
            self.inner.attach(node)
        }

        fn set_transform(&mut self, node: SceneNode, transform: Mat4) {
            self.inner.set_transform(node, transform)
        }

        fn set_texture(&mut self, node: SceneNode, texture: TextureHandle) {
            self.inner.set_texture(node, texture)
        }
    }

    impl CollisionBackend for QuotaHost {
        fn add_capsule(&mut self, capsule: &CollisionCapsule) -> std::result::Result<ProxyHandle, CollisionError> {
            if self.inner.capsule_count() >= self.quota {
                return Err(CollisionError("quota exhausted".into()));
            }
            self.inner.add_capsule(capsule)
        }

        fn remove_capsule(&mut self, handle: ProxyHandle) {
            self.inner.remove_capsule(handle)
        }
    }

    #[test]
    fn test_default_tree_is_a_sapling() {
        let mut host = host();
        let tree = default_tree(&mut host);

        assert_eq!(tree.budget(), 1);
        assert_eq!(tree.sequences().len(), 64);
        assert_eq!(tree.collision().len(), 1);
        assert_eq!(tree.leaves().len(), 3);
        assert_eq!(tree.frontier().len(), 3);
        assert_eq!(tree.body().connectable_ring_count(), 1);
        assert_eq!(tree.body().ring_count(), 4);
        assert_eq!(host.capsule_count(), 1);
    }

    #[test]
    fn test_construction_binds_host_nodes() {
        let mut host = host();
        let tree = default_tree(&mut host);
        let assets = AssetPaths::default();

        assert_eq!(host.attached().len(), 5);
        assert_eq!(host.texture(SceneNode::Body), Some(tree.bark_texture()));
        let leaf_texture = host.load_texture(&assets.leaf_texture).unwrap();
        assert_eq!(host.texture(SceneNode::LeafModel(tree.leaf_model())), Some(leaf_texture));
        assert_eq!(host.transform(SceneNode::Root), Some(Mat4::IDENTITY));
    }

    #[test]
    fn test_budget_defaults_to_sequence_length() {
        let config = TreeConfig {
            iterations: 4,
            initial_budget: None,
            ..TreeConfig::default()
        };
        let mut host = host();
        let tree = FractalTree::from_seed(&config, 1, &mut host).unwrap();
        assert_eq!(tree.budget(), 4);
        assert_eq!(tree.collision().len(), 7);
        assert_eq!(tree.leaves().len(), 3);
    }

    #[test]
    fn test_root_position_offsets_tree() {
        let config = TreeConfig {
            root_position: [2.0, 0.0, -1.0],
            ..TreeConfig::default()
        };
        let mut host = host();
        let tree = FractalTree::from_seed(&config, 1, &mut host).unwrap();
        assert_eq!(tree.collision()[0].capsule.start, Vec3::new(2.0, 0.0, -1.0));
    }

    #[test]
    fn test_same_seed_same_tree() {
        let mut host_a = host();
        let mut host_b = host();
        let mut a = default_tree(&mut host_a);
        let mut b = default_tree(&mut host_b);
        let options = GrowOptions {
            steps: 3,
            ..GrowOptions::default()
        };
        a.grow(&mut host_a, options).unwrap();
        b.grow(&mut host_b, options).unwrap();
        assert_eq!(a.body().vertex_data(), b.body().vertex_data());
        assert_eq!(a.frontier(), b.frontier());
    }

    #[test]
    fn test_grow_adds_one_layer_per_step() {
        let mut host = host();
        let mut tree = default_tree(&mut host);
        tree.grow(&mut host, GrowOptions { steps: 2, ..GrowOptions::default() }).unwrap();

        assert_eq!(tree.budget(), 3);
        assert!(tree.frontier().iter().all(|end| end.depth == 3));
        // Depth 0 splits into 3, depths 1 and 2 continue singly
        assert_eq!(tree.collision().len(), 1 + 3 + 3);
        assert_eq!(host.capsule_count(), 7);
    }

    #[test]
    fn test_texture_continues_across_growth() {
        let config = TreeConfig::from_yaml(STEM_YAML).unwrap();
        let mut host = host();
        let mut tree = FractalTree::from_seed(&config, 3, &mut host).unwrap();

        let vs: Vec<f32> = tree.body().rings().iter().map(|r| r.v).collect();
        assert_eq!(vs, vec![0.0, 1.0]);

        tree.grow(&mut host, GrowOptions::default()).unwrap();
        tree.grow(&mut host, GrowOptions::default()).unwrap();

        // Each resumed ring repeats its cap's row, then advances
        let vs: Vec<f32> = tree.body().rings().iter().map(|r| r.v).collect();
        assert_eq!(vs, vec![0.0, 1.0, 1.0, 2.0, 2.0, 3.0]);
        assert_eq!(tree.body().strips().len(), 3);
    }

    #[test]
    fn test_rings_close_at_seam() {
        let mut host = host();
        let mut tree = default_tree(&mut host);
        tree.grow(&mut host, GrowOptions::default()).unwrap();

        let segments = tree.body().segments();
        for ring in tree.body().vertices().chunks(segments + 1) {
            assert!((ring[0].position - ring[segments].position).length() < 0.0001);
            assert!((ring[0].normal - ring[segments].normal).length() < 0.0001);
            assert_eq!(ring[segments].uv[0], 1.0);
        }
    }

    #[test]
    fn test_zero_steps_only_rescales() {
        let mut host = host();
        let mut tree = default_tree(&mut host);
        let frontier = tree.frontier().to_vec();
        let rings = tree.body().ring_count();

        tree.grow(&mut host, GrowOptions { steps: 0, ..GrowOptions::default() }).unwrap();

        assert_eq!(tree.frontier(), &frontier[..]);
        assert_eq!(tree.body().ring_count(), rings);
        assert_eq!(tree.budget(), 1);
        assert!(tree.leaves().is_empty());
        assert!((tree.root_scale() - 1.125).abs() < 0.0001);
        assert!((tree.leaf_model_scale() - 1.0 / 1.125).abs() < 0.0001);
        let expected = Mat4::from_scale(Vec3::splat(1.125));
        assert!(host.transform(SceneNode::Root).unwrap().abs_diff_eq(expected, 0.0001));
    }

    #[test]
    fn test_keep_old_leaves() {
        let mut host = host();
        let mut tree = default_tree(&mut host);
        let options = GrowOptions {
            remove_old_leaves: false,
            ..GrowOptions::default()
        };
        tree.grow(&mut host, options).unwrap();
        assert_eq!(tree.leaves().len(), 6);
    }

    #[test]
    fn test_leaf_transforms_fold_model_scale() {
        let mut host = host();
        let mut tree = default_tree(&mut host);
        let options = GrowOptions {
            leaf_scale_delta: 2.0,
            size_scale: 2.0,
            ..GrowOptions::default()
        };
        tree.grow(&mut host, options).unwrap();

        let snapshot = tree.snapshot();
        assert_eq!(snapshot.leaf_transforms().len(), tree.leaves().len());
        assert_eq!(snapshot.leaf_model_transform, Mat4::IDENTITY);
        assert_eq!(snapshot.capsules().count(), tree.collision().len());
    }

    #[test]
    fn test_rejects_bad_scale() {
        let mut host = host();
        let mut tree = default_tree(&mut host);
        for size_scale in [0.0, -1.0, f32::NAN] {
            let options = GrowOptions {
                size_scale,
                ..GrowOptions::default()
            };
            let result = tree.grow(&mut host, options);
            assert!(matches!(result, Err(TreeError::InvalidGrowth(_))));
        }
        assert_eq!(tree.root_scale(), 1.0);
    }

    #[test]
    fn test_failed_growth_leaves_tree_unchanged() {
        let mut host = QuotaHost {
            inner: host(),
            quota: 3,
        };
        let mut tree = FractalTree::from_seed(&TreeConfig::default(), 42, &mut host).unwrap();
        let vertices = tree.body().vertex_count();
        let frontier = tree.frontier().to_vec();
        let leaves = tree.leaves().to_vec();

        let result = tree.grow(&mut host, GrowOptions { steps: 2, ..GrowOptions::default() });
        assert!(matches!(result, Err(TreeError::Collision(_))));

        assert_eq!(tree.body().vertex_count(), vertices);
        assert_eq!(tree.frontier(), &frontier[..]);
        assert_eq!(tree.leaves(), &leaves[..]);
        assert_eq!(tree.budget(), 1);
        assert_eq!(tree.root_scale(), 1.0);
        assert_eq!(host.inner.capsule_count(), 1);

        // Same rng state, so a retry with room reproduces a clean tree
        host.quota = usize::MAX;
        tree.grow(&mut host, GrowOptions { steps: 2, ..GrowOptions::default() }).unwrap();
        let mut clean_host = self::host();
        let mut clean = default_tree(&mut clean_host);
        clean.grow(&mut clean_host, GrowOptions { steps: 2, ..GrowOptions::default() }).unwrap();
        assert_eq!(tree.body().vertex_data(), clean.body().vertex_data());
    }

    #[test]
    fn test_missing_asset_produces_no_tree() {
        let mut host = MemoryHost::new();
        let result = FractalTree::from_seed(&TreeConfig::default(), 1, &mut host);
        assert!(matches!(result, Err(TreeError::Asset(_))));
        assert!(host.attached().is_empty());
    }

    #[test]
    fn test_invalid_config_produces_no_tree() {
        let config = TreeConfig {
            branching_factor: -2,
            ..TreeConfig::default()
        };
        let mut host = host();
        let result = FractalTree::from_seed(&config, 1, &mut host);
        assert!(matches!(result, Err(TreeError::InvalidConfig(_))));
    }

    #[test]
    fn test_exhausted_tree_stops_adding_rings() {
        let yaml = r#"
branching_factor: 0
iterations: 3
initial_budget: ~
"#;
        let config = TreeConfig::from_yaml(yaml).unwrap();
        let mut host = host();
        let mut tree = FractalTree::from_seed(&config, 9, &mut host).unwrap();
        let rings = tree.body().ring_count();
        assert_eq!(rings, 3);
        assert!(tree.frontier().iter().all(|end| tree.sequences().is_exhausted(end.depth)));

        tree.grow(&mut host, GrowOptions { steps: 4, ..GrowOptions::default() }).unwrap();

        assert_eq!(tree.body().ring_count(), rings);
        assert_eq!(tree.collision().len(), 2);
        assert_eq!(tree.leaves().len(), 1);
        assert_eq!(tree.budget(), 7);
    }
}
