pub mod accumulator;
pub mod branch;

pub use accumulator::{MeshAccumulator, MeshDelta};
pub use branch::{RingId, RingRecord, TriStrip, TubeMesh, Vertex};
