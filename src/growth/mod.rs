pub mod algorithm;
pub mod orientation;
pub mod sequences;

pub use algorithm::{BranchEnd, BranchGrowth, GrowthLayer, GrowthParams};
pub use sequences::{BranchSequences, ScaleParams, SequenceStrategy};
