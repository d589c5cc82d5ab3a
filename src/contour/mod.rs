//! Voxel surface extraction: packed Hermite data, the quadric error
//! minimizer, and the dual contouring pass that turns a leaf's lattice into
//! a quad mesh.

pub mod buffer;
pub mod extract;
pub mod hermite;
pub mod qef;

pub use buffer::{VoxelBuffer, VoxelVertex, MATERIAL_SLOTS};
pub use extract::{build_voxel_buffers, extract_voxel_buffer};
pub use qef::Qef;
