//! Sparse metavoxel octree.
//!
//! Nodes live in an index-addressed arena with explicit per-slot reference
//! counts, so tree versions can share unmodified subtrees without a garbage
//! collector. Mutation is replace-not-mutate: shared nodes are cloned before
//! editing (copy-on-write at node granularity).
//!
//! - [`bounds`]: `Box3` - cell bounds and dirty-region boxes
//! - [`arena`]: `NodeArena` / `NodeId` - refcounted node storage
//! - [`tree`]: `MetavoxelTree` - per-channel roots, set/query/expand

pub mod arena;
pub mod bounds;
pub mod tree;

// Re-exports
pub use arena::{NodeArena, NodeId};
pub use bounds::{octant_minimum, Box3};
pub use tree::MetavoxelTree;
