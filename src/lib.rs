//! voxel_terrain - octree and surface-extraction core for terrain rendering
//!
//! This crate owns the spatial data model and the two extraction pipelines of
//! a terrain/voxel renderer:
//!
//! - A sparse octree of "metavoxel" cells carrying typed attribute channels
//!   (height, color, material, Hermite edge samples), with copy-on-write
//!   sharing between tree versions.
//! - A visitor engine that walks the tree in caller-specified child order,
//!   resolving inherited attribute values and honoring a distance-based LOD
//!   threshold.
//! - A heightfield stitching pipeline that pads every leaf's raster with
//!   neighbor data resampled to the leaf's own resolution, so rendering and
//!   ray queries show no seams across LOD boundaries.
//! - A dual-contouring pipeline that turns voxel color/material/Hermite data
//!   into an indexed quad mesh, one QEF-minimized vertex per cube.
//!
//! Rendering, networking, and UI are external collaborators: raw attribute
//! payloads arrive pre-decoded from the transport layer, and the produced
//! [`HeightfieldBuffer`]/[`VoxelBuffer`] handles are consumed by the GPU
//! resource layer.
//!
//! # Example
//!
//! ```ignore
//! use voxel_terrain::{AttributeRegistry, MetavoxelTree, pipeline};
//!
//! let registry = AttributeRegistry::with_standard_channels();
//! let mut tree = MetavoxelTree::new(16.0);
//!
//! // Transport layer decodes raw channels into the tree...
//!
//! let output = pipeline::augment(&tree, &registry, None, voxel_terrain::Lod::INVALID);
//! println!("built {} heightfield buffers", output.stats.heightfield_patches);
//! ```

pub mod attribute;
pub mod contour;
pub mod heightfield;
pub mod octree;
pub mod pipeline;
pub mod traverse;

// Re-export commonly used items
pub use attribute::{
  AttributeDef, AttributeId, AttributeKind, AttributeRegistry, AttributeValue, MaterialDef,
};
pub use contour::{VoxelBuffer, VoxelVertex};
pub use heightfield::{
  first_ray_heightfield_intersection, heightfield_height, DirtyRegion, HeightfieldBuffer,
  HEIGHT_BORDER, HEIGHT_EXTENSION, SHARED_EDGE,
};
pub use octree::{Box3, MetavoxelTree, NodeId};
pub use pipeline::{AugmentOutput, AugmentStats, AugmentWorker, SharedTree};
pub use traverse::{CellInfo, Lod, Visit, Visitor};
