//! HeightfieldBuffer - padded raster pair for one leaf's terrain patch.

use glam::Vec3;

use crate::attribute::MaterialDef;
use crate::octree::Box3;

/// Samples of neighbor data kept on each side of the height raster.
pub const HEIGHT_BORDER: usize = 1;

/// Far-edge samples shared with the +X/+Z neighbors for seamless tiling.
pub const SHARED_EDGE: usize = 1;

/// Total padding added to a leaf's inner height resolution.
pub const HEIGHT_EXTENSION: usize = 2 * HEIGHT_BORDER + SHARED_EDGE;

/// Padded height/color/material rasters for one leaf cell.
///
/// Raster index to world mapping along X (Z is identical):
/// height sample `j` sits at `translation.x + (j - HEIGHT_BORDER) * increment`
/// with `increment = scale / inner_size`; color sample `j` at
/// `translation.x + j * (scale / (color_size - SHARED_EDGE))`.
/// Height byte `h` maps to world height
/// `translation.y + h / 255 * scale`; 0 is the "no data" sentinel.
///
/// Buffers are immutable once published into a tree; GPU resources derived
/// from them are freed only on the render thread.
#[derive(Clone, Debug)]
pub struct HeightfieldBuffer {
  translation: Vec3,
  scale: f32,
  height_size: usize,
  height: Vec<u8>,
  color_size: usize,
  color: Vec<u8>,
  material: Vec<u8>,
  materials: Vec<MaterialDef>,
}

impl HeightfieldBuffer {
  /// Allocate a buffer for the leaf at `translation` with edge `scale`.
  /// Heights start zeroed ("no data"); color starts flat white so empty
  /// color channels render white; the material raster is allocated only on
  /// request.
  pub fn new(
    translation: Vec3,
    scale: f32,
    height_size: usize,
    color_size: usize,
    with_material: bool,
  ) -> Self {
    debug_assert!(height_size > HEIGHT_EXTENSION);
    debug_assert!(color_size > SHARED_EDGE);
    Self {
      translation,
      scale,
      height_size,
      height: vec![0; height_size * height_size],
      color_size,
      color: vec![255; color_size * color_size * 3],
      material: if with_material {
        vec![0; color_size * color_size]
      } else {
        Vec::new()
      },
      materials: Vec::new(),
    }
  }

  #[inline]
  pub fn translation(&self) -> Vec3 {
    self.translation
  }

  #[inline]
  pub fn scale(&self) -> f32 {
    self.scale
  }

  #[inline]
  pub fn height_size(&self) -> usize {
    self.height_size
  }

  /// Leaf resolution without padding.
  #[inline]
  pub fn inner_size(&self) -> usize {
    self.height_size - HEIGHT_EXTENSION
  }

  /// World distance between adjacent samples.
  #[inline]
  pub fn increment(&self) -> f32 {
    self.scale / self.inner_size() as f32
  }

  #[inline]
  pub fn color_size(&self) -> usize {
    self.color_size
  }

  pub fn height(&self) -> &[u8] {
    &self.height
  }

  pub fn height_mut(&mut self) -> &mut [u8] {
    &mut self.height
  }

  pub fn color(&self) -> &[u8] {
    &self.color
  }

  pub fn color_mut(&mut self) -> &mut [u8] {
    &mut self.color
  }

  pub fn material(&self) -> &[u8] {
    &self.material
  }

  pub fn material_mut(&mut self) -> &mut [u8] {
    &mut self.material
  }

  pub fn has_material(&self) -> bool {
    !self.material.is_empty()
  }

  pub fn materials(&self) -> &[MaterialDef] {
    &self.materials
  }

  /// Index of `def` in the material table (1-based; 0 means "none"),
  /// inserting it when absent.
  pub fn material_index(&mut self, def: &MaterialDef) -> u8 {
    if let Some(pos) = self.materials.iter().position(|m| m == def) {
      return (pos + 1) as u8;
    }
    self.materials.push(def.clone());
    self.materials.len() as u8
  }

  /// Leaf cell bounds, without padding.
  pub fn unextended_bounds(&self) -> Box3 {
    Box3::cube(self.translation, self.scale)
  }

  /// World bounds covered by the padded height raster.
  pub fn height_bounds(&self) -> Box3 {
    let increment = self.increment();
    let pad = Vec3::new(increment, 0.0, increment);
    Box3::new(
      self.translation - pad,
      self.translation + Vec3::splat(self.scale) + pad,
    )
  }

  /// World height for a raw height byte.
  #[inline]
  pub fn world_height(&self, value: f32) -> f32 {
    self.translation.y + value / 255.0 * self.scale
  }

  /// Interpolated world height at (x, z), or None when the location is
  /// outside the raster or any contributing sample is the 0 sentinel.
  ///
  /// The raster cell is split along its main diagonal; which triangle
  /// interpolates is decided by which half of the cell the point falls into,
  /// matching the geometry the mesh renders.
  pub fn interpolated_height(&self, x: f32, z: f32) -> Option<f32> {
    let increment = self.increment();
    let relative_x = (x - self.translation.x) / increment + HEIGHT_BORDER as f32;
    let relative_z = (z - self.translation.z) / increment + HEIGHT_BORDER as f32;
    let floor_x = relative_x.floor();
    let floor_z = relative_z.floor();
    if floor_x < 0.0 || floor_z < 0.0 {
      return None;
    }
    let ix = floor_x as usize;
    let iz = floor_z as usize;
    if ix + 1 >= self.height_size || iz + 1 >= self.height_size {
      return None;
    }
    let fract_x = relative_x - floor_x;
    let fract_z = relative_z - floor_z;

    let at = |sx: usize, sz: usize| self.height[sz * self.height_size + sx] as f32;
    let upper_left = at(ix, iz);
    let lower_right = at(ix + 1, iz + 1);
    let interpolated;
    if fract_x >= fract_z {
      let upper_right = at(ix + 1, iz);
      if upper_left == 0.0 || upper_right == 0.0 || lower_right == 0.0 {
        return None;
      }
      // Upper triangle: lerp along the top edge, then toward the diagonal.
      let along_top = upper_left + (upper_right - upper_left) * fract_x;
      interpolated = along_top + (lower_right - at(ix + 1, iz)) * fract_z;
    } else {
      let lower_left = at(ix, iz + 1);
      if upper_left == 0.0 || lower_left == 0.0 || lower_right == 0.0 {
        return None;
      }
      let along_left = upper_left + (lower_left - upper_left) * fract_z;
      interpolated = along_left + (lower_right - at(ix, iz + 1)) * fract_x;
    }
    Some(self.world_height(interpolated))
  }
}

#[cfg(test)]
#[path = "buffer_test.rs"]
mod buffer_test;
