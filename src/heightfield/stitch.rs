//! Stitch pass - derives a padded [`HeightfieldBuffer`] for every leaf with
//! raw height data, pulling border rows from whatever neighbors overlap it.

use std::sync::Arc;

use glam::Vec3;

use crate::attribute::{AttributeId, AttributeRegistry, AttributeValue};
use crate::octree::{Box3, MetavoxelTree};
use crate::traverse::{walk, CellInfo, Lod, Visit, Visitor};

use super::buffer::{HeightfieldBuffer, HEIGHT_EXTENSION, SHARED_EDGE};
use super::fetch::fetch_into;

/// Accumulates world-space boxes whose source data changed since the last
/// stitch, so an update pass can re-fetch only what it must.
#[derive(Debug)]
pub struct DirtyRegion {
  boxes: Vec<Box3>,
  bounds: Box3,
}

impl Default for DirtyRegion {
  fn default() -> Self {
    Self::new()
  }
}

impl DirtyRegion {
  pub fn new() -> Self {
    Self {
      boxes: Vec::new(),
      bounds: Box3::EMPTY,
    }
  }

  pub fn mark(&mut self, bounds: Box3) {
    if bounds.is_empty() {
      return;
    }
    self.bounds.add(&bounds);
    self.boxes.push(bounds);
  }

  pub fn is_empty(&self) -> bool {
    self.boxes.is_empty()
  }

  /// Union of all marked boxes.
  pub fn bounds(&self) -> Box3 {
    self.bounds
  }

  pub fn boxes(&self) -> &[Box3] {
    &self.boxes
  }

  pub fn clear(&mut self) {
    self.boxes.clear();
    self.bounds = Box3::EMPTY;
  }
}

/// One leaf cell that needs a stitched buffer.
struct Patch {
  minimum: Vec3,
  size: f32,
  height_width: usize,
  color_width: usize,
  has_material: bool,
  existing: Option<Arc<HeightfieldBuffer>>,
}

impl Patch {
  fn cell(&self) -> Box3 {
    Box3::cube(self.minimum, self.size)
  }

  fn fresh_buffer(&self) -> HeightfieldBuffer {
    HeightfieldBuffer::new(
      self.minimum,
      self.size,
      self.height_width + HEIGHT_EXTENSION,
      self.color_width + SHARED_EDGE,
      self.has_material,
    )
  }

  /// A carried-over buffer is only reusable while the raw rasters kept
  /// their resolution.
  fn reusable(&self) -> Option<HeightfieldBuffer> {
    let existing = self.existing.as_deref()?;
    if existing.inner_size() != self.height_width
      || existing.color_size() != self.color_width + SHARED_EDGE
      || existing.has_material() != self.has_material
    {
      return None;
    }
    Some(existing.clone())
  }
}

struct PatchCollector {
  inputs: [AttributeId; 4],
  lod: Lod,
  patches: Vec<Patch>,
}

impl Visitor for PatchCollector {
  fn inputs(&self) -> &[AttributeId] {
    &self.inputs
  }

  fn lod(&self) -> Lod {
    self.lod
  }

  fn visit(&mut self, info: &CellInfo, _outputs: &mut [AttributeValue]) -> Visit {
    if !info.is_leaf {
      return Visit::descend();
    }
    let Some(height) = info.inputs[0].as_height() else {
      return Visit::Stop;
    };
    let color_width = info.inputs[1].as_color().map_or(height.width, |c| c.width);
    let has_material = info.inputs[2].as_material().is_some();
    self.patches.push(Patch {
      minimum: info.minimum,
      size: info.size,
      height_width: height.width,
      color_width,
      has_material,
      existing: info.inputs[3].as_heightfield_buffer().cloned(),
    });
    Visit::Stop
  }
}

fn collect_patches(tree: &MetavoxelTree, registry: &AttributeRegistry, lod: Lod) -> Vec<Patch> {
  let mut collector = PatchCollector {
    inputs: [
      AttributeRegistry::HEIGHT,
      AttributeRegistry::COLOR,
      AttributeRegistry::MATERIAL,
      AttributeRegistry::HEIGHTFIELD_BUFFER,
    ],
    lod,
    patches: Vec::new(),
  };
  walk(tree, registry, &mut collector);
  collector.patches
}

fn publish(tree: &mut MetavoxelTree, writes: Vec<(Box3, HeightfieldBuffer)>) -> usize {
  let count = writes.len();
  for (cell, buffer) in writes {
    tree.set(
      AttributeRegistry::HEIGHTFIELD_BUFFER,
      &cell,
      AttributeValue::HeightfieldBuffer(Arc::new(buffer)),
    );
  }
  count
}

/// Build a stitched buffer for every leaf with height data. A carried-over
/// buffer of matching resolution is value-copied and refreshed in place of
/// a zero-filled allocation.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
pub fn build_buffers(tree: &mut MetavoxelTree, registry: &AttributeRegistry, lod: Lod) -> usize {
  let patches = collect_patches(tree, registry, lod);
  let mut writes = Vec::with_capacity(patches.len());
  for patch in &patches {
    let mut buffer = patch.reusable().unwrap_or_else(|| patch.fresh_buffer());
    let target = buffer.height_bounds();
    fetch_into(tree, registry, &mut buffer, &target, lod);
    writes.push((patch.cell(), buffer));
  }
  publish(tree, writes)
}

/// Re-fetch every stitched buffer whose extended raster overlaps the dirty
/// region. Buffers without an intersection are left untouched; buffers whose
/// raw resolution changed are rebuilt in full.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
pub fn update_buffers(
  tree: &mut MetavoxelTree,
  registry: &AttributeRegistry,
  dirty: &DirtyRegion,
  lod: Lod,
) -> usize {
  if dirty.is_empty() {
    return 0;
  }
  let patches = collect_patches(tree, registry, lod);
  let mut writes = Vec::new();
  for patch in &patches {
    match patch.reusable() {
      Some(mut buffer) => {
        if !buffer.height_bounds().intersects(&dirty.bounds()) {
          continue;
        }
        let mut touched = false;
        for marked in dirty.boxes() {
          let target = marked.intersection(&buffer.height_bounds());
          if target.is_empty() {
            continue;
          }
          fetch_into(tree, registry, &mut buffer, &target, lod);
          touched = true;
        }
        if touched {
          writes.push((patch.cell(), buffer));
        }
      }
      None => {
        let mut buffer = patch.fresh_buffer();
        let target = buffer.height_bounds();
        fetch_into(tree, registry, &mut buffer, &target, lod);
        writes.push((patch.cell(), buffer));
      }
    }
  }
  publish(tree, writes)
}

#[cfg(test)]
#[path = "stitch_test.rs"]
mod stitch_test;
