//! Dual contouring of a leaf's voxel lattice.
//!
//! One pass over the lattice in x, then y, then z order. Each cube with a
//! sign change gets one QEF-placed vertex; each surface-crossing lattice
//! edge gets one quad joining the four cubes around it. Indices of already
//! emitted vertices are kept in two plane-sized caches so neighbor lookup
//! never rescans.

use std::sync::Arc;

use glam::Vec3;

use crate::attribute::{
  AttributeId, AttributeRegistry, AttributeValue, VoxelColorPayload, VoxelHermitePayload,
  VoxelMaterialPayload,
};
use crate::octree::{Box3, MetavoxelTree};
use crate::traverse::{walk, CellInfo, Lod, Visit, Visitor};

use super::buffer::{VoxelBuffer, VoxelVertex, MATERIAL_SLOTS};
use super::hermite::{unpack_normal, unpack_offset};
use super::qef::Qef;

const NO_INDEX: u32 = u32::MAX;

/// Corner index bits select the upper lattice point per axis:
/// bit 0 = X, bit 1 = Y, bit 2 = Z.
#[inline]
fn corner_offset(corner: usize) -> (usize, usize, usize) {
  (corner & 1, (corner >> 1) & 1, (corner >> 2) & 1)
}

/// Contour the voxel channels of one leaf into a mesh. The lattice spans
/// the cell inclusive of its far faces, so `spacing = size / (lattice - 1)`;
/// the outermost cube layer is degenerate and only exists to pin boundary
/// vertices onto the cell faces.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
pub fn extract_voxel_buffer(
  minimum: Vec3,
  size: f32,
  color: &VoxelColorPayload,
  material: Option<&VoxelMaterialPayload>,
  hermite: &VoxelHermitePayload,
) -> VoxelBuffer {
  let n = color.size;
  debug_assert!(n >= 2);
  debug_assert_eq!(hermite.size, n);
  if let Some(material) = material {
    debug_assert_eq!(material.size, n);
  }
  let spacing = size / (n - 1) as f32;

  let mut buffer = VoxelBuffer {
    translation: minimum,
    scale: size,
    vertices: Vec::new(),
    indices: Vec::new(),
    materials: material.map(|m| m.materials.clone()).unwrap_or_default(),
  };

  let mut prev_plane = vec![NO_INDEX; n * n];
  let mut plane = vec![NO_INDEX; n * n];

  for z in 0..n {
    plane.fill(NO_INDEX);
    for y in 0..n {
      for x in 0..n {
        let clamp = |v: usize| v.min(n - 1);
        let mut mask = 0u8;
        for corner in 0..8 {
          let (dx, dy, dz) = corner_offset(corner);
          let alpha =
            color.contents[color.index(clamp(x + dx), clamp(y + dy), clamp(z + dz))][3];
          if alpha != 0 {
            mask |= 1 << corner;
          }
        }
        if mask == 0 || mask == 0xff {
          continue;
        }

        let own = buffer.vertices.len() as u32;
        buffer.vertices.push(build_vertex(
          minimum, spacing, n, x, y, z, mask, color, material, hermite,
        ));
        plane[y * n + x] = own;

        // Quads for the three minimal-corner edges; this cube is the last
        // of the four around each, so the other three are already cached.
        let inside = |corner: usize| mask & (1 << corner) != 0;
        let mut emit = |a: u32, b: u32, c: u32, d: u32, flip: bool| {
          if a == NO_INDEX || b == NO_INDEX || c == NO_INDEX || d == NO_INDEX {
            return;
          }
          if flip {
            buffer.indices.extend_from_slice(&[a, d, c, b]);
          } else {
            buffer.indices.extend_from_slice(&[a, b, c, d]);
          }
        };

        // X edge: corners 0-1, shared with the y-1 / z-1 cubes.
        if inside(0) != inside(1) && y > 0 && z > 0 {
          emit(
            own,
            plane[(y - 1) * n + x],
            prev_plane[(y - 1) * n + x],
            prev_plane[y * n + x],
            !inside(0),
          );
        }
        // Y edge: corners 0-2, shared with the x-1 / z-1 cubes; reversed
        // winding because x cross z points against +Y.
        if inside(0) != inside(2) && x > 0 && z > 0 {
          emit(
            own,
            plane[y * n + x - 1],
            prev_plane[y * n + x - 1],
            prev_plane[y * n + x],
            inside(0),
          );
        }
        // Z edge: corners 0-4, shared with the x-1 / y-1 cubes.
        if inside(0) != inside(4) && x > 0 && y > 0 {
          emit(
            own,
            plane[y * n + x - 1],
            plane[(y - 1) * n + x - 1],
            plane[(y - 1) * n + x],
            !inside(0),
          );
        }
      }
    }
    std::mem::swap(&mut prev_plane, &mut plane);
  }
  buffer
}

#[allow(clippy::too_many_arguments)]
fn build_vertex(
  minimum: Vec3,
  spacing: f32,
  n: usize,
  x: usize,
  y: usize,
  z: usize,
  mask: u8,
  color: &VoxelColorPayload,
  material: Option<&VoxelMaterialPayload>,
  hermite: &VoxelHermitePayload,
) -> VoxelVertex {
  let clamp = |v: usize| v.min(n - 1);
  let inside = |corner: usize| mask & (1 << corner) != 0;

  let mut qef = Qef::new();
  let mut normal_sum = Vec3::ZERO;
  let mut color_sum = [0u32; 3];
  let mut crossings = 0u32;
  let mut slots = [0u8; MATERIAL_SLOTS];
  let mut counts = [0u32; MATERIAL_SLOTS];
  for axis in 0..3 {
    let axis_bit = 1usize << axis;
    for base in 0..8usize {
      if base & axis_bit != 0 {
        continue;
      }
      let other = base | axis_bit;
      if inside(base) == inside(other) {
        continue;
      }
      let (dx, dy, dz) = corner_offset(base);
      let (ax, ay, az) = (clamp(x + dx), clamp(y + dy), clamp(z + dz));
      let (bx, by, bz) = {
        let (dx, dy, dz) = corner_offset(other);
        (clamp(x + dx), clamp(y + dy), clamp(z + dz))
      };
      if (ax, ay, az) == (bx, by, bz) {
        // Degenerate boundary edge.
        continue;
      }
      let sample = hermite.get(ax, ay, az, axis);
      let normal = unpack_normal(sample);
      normal_sum += normal;
      let mut point = minimum + Vec3::new(ax as f32, ay as f32, az as f32) * spacing;
      point[axis] += unpack_offset(sample) * spacing;
      qef.add_plane(normal.normalize_or_zero(), point);

      // Each crossing contributes its inside corner's color and material.
      let (ix, iy, iz) = if inside(base) { (ax, ay, az) } else { (bx, by, bz) };
      let rgba = color.contents[color.index(ix, iy, iz)];
      for channel in 0..3 {
        color_sum[channel] += rgba[channel] as u32;
      }
      crossings += 1;
      if let Some(material) = material {
        let index = material.contents[(iz * n + iy) * n + ix];
        if index != 0 {
          tally_material(&mut slots, &mut counts, index);
        }
      }
    }
  }

  let lo = minimum + Vec3::new(x as f32, y as f32, z as f32) * spacing;
  let hi = minimum
    + Vec3::new(
      clamp(x + 1) as f32,
      clamp(y + 1) as f32,
      clamp(z + 1) as f32,
    ) * spacing;
  let position = qef.solve(lo, spacing).clamp(lo, hi);

  // Unweighted average of the crossing colors.
  let vertex_color = if crossings > 0 {
    [
      (color_sum[0] / crossings) as u8,
      (color_sum[1] / crossings) as u8,
      (color_sum[2] / crossings) as u8,
    ]
  } else {
    [0; 3]
  };

  VoxelVertex {
    position,
    normal: normal_sum.normalize_or_zero(),
    color: vertex_color,
    materials: slots,
    material_weights: rescale_weights(&counts),
  }
}

/// First seen wins a slot; crossings beyond the fourth distinct material
/// are dropped.
fn tally_material(slots: &mut [u8; MATERIAL_SLOTS], counts: &mut [u32; MATERIAL_SLOTS], index: u8) {
  for slot in 0..MATERIAL_SLOTS {
    if counts[slot] == 0 {
      slots[slot] = index;
      counts[slot] = 1;
      return;
    }
    if slots[slot] == index {
      counts[slot] += 1;
      return;
    }
  }
}

/// Crossing counts rescaled to sum to 255.
fn rescale_weights(counts: &[u32; MATERIAL_SLOTS]) -> [u8; MATERIAL_SLOTS] {
  let total: u32 = counts.iter().sum();
  let mut weights = [0u8; MATERIAL_SLOTS];
  if total > 0 {
    let mut assigned = 0u32;
    for slot in 0..MATERIAL_SLOTS {
      weights[slot] = (counts[slot] * 255 / total) as u8;
      assigned += weights[slot] as u32;
    }
    // Rounding residue goes to the first heaviest slot so the sum stays 255.
    let mut heaviest = 0;
    for slot in 1..MATERIAL_SLOTS {
      if counts[slot] > counts[heaviest] {
        heaviest = slot;
      }
    }
    weights[heaviest] += (255 - assigned) as u8;
  }
  weights
}

struct VoxelLeaf {
  minimum: Vec3,
  size: f32,
  color: Arc<VoxelColorPayload>,
  material: Option<Arc<VoxelMaterialPayload>>,
  hermite: Arc<VoxelHermitePayload>,
}

struct VoxelLeafCollector {
  inputs: [AttributeId; 3],
  lod: Lod,
  leaves: Vec<VoxelLeaf>,
}

impl Visitor for VoxelLeafCollector {
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
    let (Some(color), Some(hermite)) =
      (info.inputs[0].as_voxel_color(), info.inputs[2].as_voxel_hermite())
    else {
      return Visit::Stop;
    };
    self.leaves.push(VoxelLeaf {
      minimum: info.minimum,
      size: info.size,
      color: color.clone(),
      material: info.inputs[1].as_voxel_material().cloned(),
      hermite: hermite.clone(),
    });
    Visit::Stop
  }
}

/// Contour every leaf carrying voxel channels and publish the meshes into
/// the voxel buffer channel. Returns the number of leaves contoured.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
pub fn build_voxel_buffers(
  tree: &mut MetavoxelTree,
  registry: &AttributeRegistry,
  lod: Lod,
) -> usize {
  let mut collector = VoxelLeafCollector {
    inputs: [
      AttributeRegistry::VOXEL_COLOR,
      AttributeRegistry::VOXEL_MATERIAL,
      AttributeRegistry::VOXEL_HERMITE,
    ],
    lod,
    leaves: Vec::new(),
  };
  walk(tree, registry, &mut collector);
  let count = collector.leaves.len();
  for leaf in collector.leaves {
    let buffer = extract_voxel_buffer(
      leaf.minimum,
      leaf.size,
      &leaf.color,
      leaf.material.as_deref(),
      &leaf.hermite,
    );
    tree.set(
      AttributeRegistry::VOXEL_BUFFER,
      &Box3::cube(leaf.minimum, leaf.size),
      AttributeValue::VoxelBuffer(Arc::new(buffer)),
    );
  }
  count
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod extract_test;
