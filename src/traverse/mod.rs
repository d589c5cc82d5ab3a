//! LOD policy and the visitor traversal engine.
//!
//! - [`lod`]: `Lod` - distance-dependent subdivision threshold
//! - [`visitor`]: `Visitor` trait, `walk`/`guide` entry points, child-order
//!   helpers

pub mod lod;
pub mod visitor;

// Re-exports
pub use lod::Lod;
pub use visitor::{
  guide, order_for_direction, walk, CellInfo, Visit, Visitor, DEFAULT_ORDER, REVERSE_ORDER,
};
