pub mod tree_config;

pub use tree_config::{AssetPaths, CustomSequences, TreeConfig};
