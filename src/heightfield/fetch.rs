//! Fetch core - fills a heightfield buffer from the raw channels of every
//! leaf overlapping a target box, resampling across resolution boundaries.

use glam::Vec3;

use crate::attribute::{AttributeId, AttributeRegistry, AttributeValue};
use crate::octree::{Box3, MetavoxelTree};
use crate::traverse::{walk, CellInfo, Lod, Visit, Visitor};

use super::buffer::{HeightfieldBuffer, HEIGHT_BORDER};

const GRID_EPS: f32 = 1e-4;

/// Fill every destination sample inside `target` from the tree's raw
/// height/color/material channels. Idempotent: re-fetching the same target
/// against unchanged sources writes identical values.
pub fn fetch_into(
  tree: &MetavoxelTree,
  registry: &AttributeRegistry,
  buffer: &mut HeightfieldBuffer,
  target: &Box3,
  lod: Lod,
) {
  let mut visitor = FetchVisitor {
    inputs: [
      AttributeRegistry::HEIGHT,
      AttributeRegistry::COLOR,
      AttributeRegistry::MATERIAL,
    ],
    lod,
    buffer,
    target: *target,
  };
  walk(tree, registry, &mut visitor);
}

struct FetchVisitor<'a> {
  inputs: [AttributeId; 3],
  lod: Lod,
  buffer: &'a mut HeightfieldBuffer,
  target: Box3,
}

impl Visitor for FetchVisitor<'_> {
  fn inputs(&self) -> &[AttributeId] {
    &self.inputs
  }

  fn lod(&self) -> Lod {
    self.lod
  }

  fn visit(&mut self, info: &CellInfo, _outputs: &mut [AttributeValue]) -> Visit {
    if !info.bounds().intersects(&self.target) {
      return Visit::Stop;
    }
    if !info.is_leaf {
      return Visit::descend();
    }
    let Some(height) = info.inputs[0].as_height() else {
      return Visit::Stop;
    };
    fetch_height(self.buffer, &self.target, info, &height.contents, height.width);
    if let Some(color) = info.inputs[1].as_color() {
      fetch_color(self.buffer, &self.target, info, &color.contents, color.width);
    }
    if self.buffer.has_material() {
      if let Some(material) = info.inputs[2].as_material() {
        fetch_material(self.buffer, &self.target, info, material.as_ref());
      }
    }
    Visit::Stop
  }
}

/// Destination sample indices (inclusive) covered by the overlap of `target`
/// with the source cell, along one axis of a raster whose sample `j` sits at
/// `origin + j * increment`.
///
/// The far edge of the source cell is excluded: that sample row belongs to
/// the +axis neighbor, which writes the exact value.
fn sample_range(
  lo: f32,
  hi: f32,
  src_min: f32,
  src_max: f32,
  src_increment: f32,
  origin: f32,
  increment: f32,
  len: usize,
) -> Option<(usize, usize)> {
  let lo = lo.max(src_min - GRID_EPS);
  let hi = hi.min(src_max - 0.25 * src_increment);
  let first = (((lo - origin) / increment) - GRID_EPS).ceil().max(0.0) as usize;
  let last = (((hi - origin) / increment) + GRID_EPS).floor().min((len - 1) as f32);
  if last < 0.0 {
    return None;
  }
  let last = last as usize;
  if first > last {
    return None;
  }
  Some((first, last))
}

fn fetch_height(
  buffer: &mut HeightfieldBuffer,
  target: &Box3,
  info: &CellInfo,
  src: &[u8],
  src_width: usize,
) {
  let overlap = target
    .intersection(&info.bounds())
    .intersection(&buffer.height_bounds());
  if overlap.is_empty() {
    return;
  }
  let dest_increment = buffer.increment();
  let src_increment = info.size / src_width as f32;
  let origin = buffer.translation() - Vec3::splat(HEIGHT_BORDER as f32) * dest_increment;
  let height_size = buffer.height_size();

  let Some((x0, x1)) = sample_range(
    overlap.minimum.x,
    overlap.maximum.x,
    info.minimum.x,
    info.minimum.x + info.size,
    src_increment,
    origin.x,
    dest_increment,
    height_size,
  ) else {
    return;
  };
  let Some((z0, z1)) = sample_range(
    overlap.minimum.z,
    overlap.maximum.z,
    info.minimum.z,
    info.minimum.z + info.size,
    src_increment,
    origin.z,
    dest_increment,
    height_size,
  ) else {
    return;
  };

  // Coarser sources cover a wider world-height window than ours; one
  // doubling per level of size difference plus a vertical-offset subtraction
  // remaps their stored bytes into our local range.
  let mut shift: i32 = 0;
  let mut span = buffer.scale();
  while span < info.size - GRID_EPS {
    shift += 1;
    span *= 2.0;
  }
  let mut span = info.size;
  while span < buffer.scale() - GRID_EPS {
    shift -= 1;
    span *= 2.0;
  }
  let subtract =
    ((buffer.translation().y - info.minimum.y) * 255.0 / buffer.scale()).round() as i32;

  let src_advance = dest_increment / src_increment;
  let aligned = shift == 0
    && subtract == 0
    && (src_advance - 1.0).abs() < GRID_EPS
    && {
      let phase = (origin.x + x0 as f32 * dest_increment - info.minimum.x) / src_increment;
      (phase - phase.round()).abs() < GRID_EPS
    }
    && {
      let phase = (origin.z + z0 as f32 * dest_increment - info.minimum.z) / src_increment;
      (phase - phase.round()).abs() < GRID_EPS
    };

  let src_x0 = (origin.x + x0 as f32 * dest_increment - info.minimum.x) / src_increment;
  let dest = buffer.height_mut();
  for jz in z0..=z1 {
    let world_z = origin.z + jz as f32 * dest_increment;
    let sz = (((world_z - info.minimum.z) / src_increment + GRID_EPS).floor() as i32)
      .clamp(0, src_width as i32 - 1) as usize;
    let src_row = &src[sz * src_width..(sz + 1) * src_width];
    let dest_row = &mut dest[jz * height_size..(jz + 1) * height_size];
    if aligned {
      // Fast path: same spacing and phase, identical height window.
      let sx = (src_x0 + GRID_EPS).floor() as usize;
      let count = x1 - x0 + 1;
      dest_row[x0..=x1].copy_from_slice(&src_row[sx..sx + count]);
      continue;
    }
    let mut sx = src_x0;
    for jx in x0..=x1 {
      let si = ((sx + GRID_EPS).floor() as i32).clamp(0, src_width as i32 - 1) as usize;
      let value = src_row[si];
      dest_row[jx] = remap_height(value, shift, subtract);
      sx += src_advance;
    }
  }
}

#[inline]
fn remap_height(value: u8, shift: i32, subtract: i32) -> u8 {
  if value == 0 {
    // "no data" passes through untouched
    return 0;
  }
  let scaled = if shift >= 0 {
    (value as i32) << shift
  } else {
    (value as i32) >> -shift
  };
  (scaled - subtract).clamp(1, 255) as u8
}

fn fetch_color(
  buffer: &mut HeightfieldBuffer,
  target: &Box3,
  info: &CellInfo,
  src: &[u8],
  src_width: usize,
) {
  let color_size = buffer.color_size();
  // Color has its own raster pitch: the last sample is the shared edge.
  let increment = buffer.scale() / (color_size - 1) as f32;
  let origin = buffer.translation();
  let color_max = origin + Vec3::splat(buffer.scale());
  let overlap = target
    .intersection(&info.bounds())
    .intersection(&Box3::new(origin, color_max));
  if overlap.is_empty() {
    return;
  }
  let src_increment = info.size / src_width as f32;

  let Some((x0, x1)) = sample_range(
    overlap.minimum.x,
    overlap.maximum.x,
    info.minimum.x,
    info.minimum.x + info.size,
    src_increment,
    origin.x,
    increment,
    color_size,
  ) else {
    return;
  };
  let Some((z0, z1)) = sample_range(
    overlap.minimum.z,
    overlap.maximum.z,
    info.minimum.z,
    info.minimum.z + info.size,
    src_increment,
    origin.z,
    increment,
    color_size,
  ) else {
    return;
  };

  // Color is resolution independent: plain nearest-neighbor sampling.
  let dest = buffer.color_mut();
  for jz in z0..=z1 {
    let world_z = origin.z + jz as f32 * increment;
    let sz = (((world_z - info.minimum.z) / src_increment + GRID_EPS).floor() as i32)
      .clamp(0, src_width as i32 - 1) as usize;
    for jx in x0..=x1 {
      let world_x = origin.x + jx as f32 * increment;
      let sx = (((world_x - info.minimum.x) / src_increment + GRID_EPS).floor() as i32)
        .clamp(0, src_width as i32 - 1) as usize;
      let s = (sz * src_width + sx) * 3;
      let d = (jz * color_size + jx) * 3;
      dest[d..d + 3].copy_from_slice(&src[s..s + 3]);
    }
  }
}

fn fetch_material(
  buffer: &mut HeightfieldBuffer,
  target: &Box3,
  info: &CellInfo,
  src: &crate::attribute::MaterialPayload,
) {
  let color_size = buffer.color_size();
  let increment = buffer.scale() / (color_size - 1) as f32;
  let origin = buffer.translation();
  let material_max = origin + Vec3::splat(buffer.scale());
  let overlap = target
    .intersection(&info.bounds())
    .intersection(&Box3::new(origin, material_max));
  if overlap.is_empty() {
    return;
  }
  let src_increment = info.size / src.width as f32;

  let Some((x0, x1)) = sample_range(
    overlap.minimum.x,
    overlap.maximum.x,
    info.minimum.x,
    info.minimum.x + info.size,
    src_increment,
    origin.x,
    increment,
    color_size,
  ) else {
    return;
  };
  let Some((z0, z1)) = sample_range(
    overlap.minimum.z,
    overlap.maximum.z,
    info.minimum.z,
    info.minimum.z + info.size,
    src_increment,
    origin.z,
    increment,
    color_size,
  ) else {
    return;
  };

  for jz in z0..=z1 {
    let world_z = origin.z + jz as f32 * increment;
    let sz = (((world_z - info.minimum.z) / src_increment + GRID_EPS).floor() as i32)
      .clamp(0, src.width as i32 - 1) as usize;
    for jx in x0..=x1 {
      let world_x = origin.x + jx as f32 * increment;
      let sx = (((world_x - info.minimum.x) / src_increment + GRID_EPS).floor() as i32)
        .clamp(0, src.width as i32 - 1) as usize;
      let index = src.contents[sz * src.width + sx];
      // Source indices are remapped through this buffer's material table.
      let mapped = if index == 0 {
        0
      } else {
        match src.materials.get(index as usize - 1) {
          Some(def) => buffer.material_index(def),
          None => 0,
        }
      };
      buffer.material_mut()[jz * color_size + jx] = mapped;
    }
  }
}

#[cfg(test)]
#[path = "fetch_test.rs"]
mod fetch_test;
