//! VoxelBuffer - dual-contoured mesh for one leaf cell.

use glam::Vec3;

use crate::attribute::MaterialDef;
use crate::octree::Box3;

/// Up to four materials blend at one vertex.
pub const MATERIAL_SLOTS: usize = 4;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct VoxelVertex {
  pub position: Vec3,
  /// Averaged Hermite normal, unit length when any edge contributed.
  pub normal: Vec3,
  pub color: [u8; 3],
  /// Material table indices, 0 = unused slot.
  pub materials: [u8; MATERIAL_SLOTS],
  /// Blend weights parallel to `materials`, summing to 255 when any slot
  /// is used.
  pub material_weights: [u8; MATERIAL_SLOTS],
}

/// One quad per surface-crossing lattice edge, four indices each, wound
/// toward the outside of the surface.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct VoxelBuffer {
  pub translation: Vec3,
  pub scale: f32,
  pub vertices: Vec<VoxelVertex>,
  pub indices: Vec<u32>,
  pub materials: Vec<MaterialDef>,
}

impl VoxelBuffer {
  pub fn bounds(&self) -> Box3 {
    Box3::cube(self.translation, self.scale)
  }

  pub fn quad_count(&self) -> usize {
    self.indices.len() / 4
  }

  pub fn is_empty(&self) -> bool {
    self.indices.is_empty()
  }
}
