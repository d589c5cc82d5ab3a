//! Point and ray queries against stitched heightfield buffers.

use glam::Vec3;

use crate::attribute::{AttributeId, AttributeRegistry, AttributeValue};
use crate::octree::{Box3, MetavoxelTree};
use crate::traverse::{order_for_direction, walk, CellInfo, Visit, Visitor, REVERSE_ORDER};

use super::buffer::{HeightfieldBuffer, HEIGHT_BORDER};

/// World height of the terrain surface under `location`, if any buffer has
/// data there. Later-written (deeper, higher-octant) buffers win, so the
/// walk runs in reverse octant order and stops at the first answer.
pub fn heightfield_height(
  tree: &MetavoxelTree,
  registry: &AttributeRegistry,
  location: Vec3,
) -> Option<f32> {
  let mut visitor = HeightVisitor {
    inputs: [AttributeRegistry::HEIGHTFIELD_BUFFER],
    location,
    height: None,
  };
  walk(tree, registry, &mut visitor);
  visitor.height
}

struct HeightVisitor {
  inputs: [AttributeId; 1],
  location: Vec3,
  height: Option<f32>,
}

impl Visitor for HeightVisitor {
  fn inputs(&self) -> &[AttributeId] {
    &self.inputs
  }

  fn visit(&mut self, info: &CellInfo, _outputs: &mut [AttributeValue]) -> Visit {
    let bounds = info.bounds();
    if self.location.x < bounds.minimum.x
      || self.location.x > bounds.maximum.x
      || self.location.z < bounds.minimum.z
      || self.location.z > bounds.maximum.z
    {
      return Visit::Stop;
    }
    if !info.is_leaf {
      return Visit::Descend(REVERSE_ORDER);
    }
    let Some(buffer) = info.inputs[0].as_heightfield_buffer() else {
      return Visit::Stop;
    };
    match buffer.interpolated_height(self.location.x, self.location.z) {
      Some(height) => {
        self.height = Some(height);
        Visit::ShortCircuit
      }
      None => Visit::Stop,
    }
  }
}

/// Distance along `direction` to the first heightfield surface hit, or None.
/// Cells are visited front to back for the given direction, so the first
/// triangle hit is the nearest one.
pub fn first_ray_heightfield_intersection(
  tree: &MetavoxelTree,
  registry: &AttributeRegistry,
  origin: Vec3,
  direction: Vec3,
) -> Option<f32> {
  let mut visitor = RayVisitor {
    inputs: [AttributeRegistry::HEIGHTFIELD_BUFFER],
    origin,
    direction,
    order: order_for_direction(direction),
    distance: None,
  };
  walk(tree, registry, &mut visitor);
  visitor.distance
}

struct RayVisitor {
  inputs: [AttributeId; 1],
  origin: Vec3,
  direction: Vec3,
  order: [u8; 8],
  distance: Option<f32>,
}

impl Visitor for RayVisitor {
  fn inputs(&self) -> &[AttributeId] {
    &self.inputs
  }

  fn visit(&mut self, info: &CellInfo, _outputs: &mut [AttributeValue]) -> Visit {
    let bounds = info.bounds();
    if bounds.find_ray_intersection(self.origin, self.direction).is_none() {
      return Visit::Stop;
    }
    if !info.is_leaf {
      return Visit::Descend(self.order);
    }
    let Some(buffer) = info.inputs[0].as_heightfield_buffer() else {
      return Visit::Stop;
    };
    match ray_buffer_intersection(buffer, self.origin, self.direction) {
      Some(distance) => {
        self.distance = Some(distance);
        Visit::ShortCircuit
      }
      None => Visit::Stop,
    }
  }
}

const MARCH_EPS: f32 = 1e-4;

/// March the ray across the raster cells of one buffer, testing the two
/// triangles of each cell it crosses.
fn ray_buffer_intersection(
  buffer: &HeightfieldBuffer,
  origin: Vec3,
  direction: Vec3,
) -> Option<f32> {
  let bounds = buffer.unextended_bounds();
  let entry = bounds.find_ray_intersection(origin, direction)?;
  let exit = ray_exit(&bounds, origin, direction);

  let increment = buffer.increment();
  let translation = buffer.translation();
  let last_cell = (buffer.height_size() - 2) as i32;

  let cell_of = |t: f32| -> (i32, i32) {
    let p = origin + direction * t;
    let rx = (p.x - translation.x) / increment + HEIGHT_BORDER as f32;
    let rz = (p.z - translation.z) / increment + HEIGHT_BORDER as f32;
    (
      (rx.floor() as i32).clamp(0, last_cell),
      (rz.floor() as i32).clamp(0, last_cell),
    )
  };

  let mut t = entry;
  loop {
    let (ix, iz) = cell_of(t + MARCH_EPS);
    if let Some(hit) = test_cell(buffer, ix as usize, iz as usize, origin, direction) {
      if hit >= entry - MARCH_EPS {
        return Some(hit);
      }
    }
    // Advance to the next x or z grid line crossed by the ray.
    let next = |axis_origin: f32, o: f32, d: f32| -> f32 {
      if d.abs() < f32::EPSILON {
        return f32::INFINITY;
      }
      let r = (o + d * t - axis_origin) / increment + HEIGHT_BORDER as f32;
      let boundary = if d > 0.0 { r.floor() + 1.0 } else { r.ceil() - 1.0 };
      let world = axis_origin + (boundary - HEIGHT_BORDER as f32) * increment;
      (world - o) / d
    };
    let step = next(translation.x, origin.x, direction.x)
      .min(next(translation.z, origin.z, direction.z));
    if !step.is_finite() || step <= t + MARCH_EPS {
      return None;
    }
    t = step;
    if t > exit + MARCH_EPS {
      return None;
    }
  }
}

fn ray_exit(bounds: &Box3, origin: Vec3, direction: Vec3) -> f32 {
  let mut t_max = f32::INFINITY;
  for axis in 0..3 {
    let d = direction[axis];
    if d.abs() < f32::EPSILON {
      continue;
    }
    let inv = 1.0 / d;
    let t0 = (bounds.minimum[axis] - origin[axis]) * inv;
    let t1 = (bounds.maximum[axis] - origin[axis]) * inv;
    t_max = t_max.min(t0.max(t1));
  }
  t_max
}

/// Test both triangles of raster cell (ix, iz); corners holding the "no
/// data" sentinel make their triangle a miss.
fn test_cell(
  buffer: &HeightfieldBuffer,
  ix: usize,
  iz: usize,
  origin: Vec3,
  direction: Vec3,
) -> Option<f32> {
  let height_size = buffer.height_size();
  if ix + 1 >= height_size || iz + 1 >= height_size {
    return None;
  }
  let increment = buffer.increment();
  let translation = buffer.translation();
  let corner = |cx: usize, cz: usize| -> Option<Vec3> {
    let value = buffer.height()[cz * height_size + cx];
    if value == 0 {
      return None;
    }
    Some(Vec3::new(
      translation.x + (cx as f32 - HEIGHT_BORDER as f32) * increment,
      buffer.world_height(value as f32),
      translation.z + (cz as f32 - HEIGHT_BORDER as f32) * increment,
    ))
  };
  let upper_left = corner(ix, iz);
  let upper_right = corner(ix + 1, iz);
  let lower_left = corner(ix, iz + 1);
  let lower_right = corner(ix + 1, iz + 1);

  let mut nearest: Option<f32> = None;
  if let (Some(a), Some(b), Some(c)) = (upper_left, upper_right, lower_right) {
    nearest = ray_triangle_intersection(origin, direction, a, b, c);
  }
  if let (Some(a), Some(b), Some(c)) = (upper_left, lower_right, lower_left) {
    if let Some(hit) = ray_triangle_intersection(origin, direction, a, b, c) {
      nearest = Some(match nearest {
        Some(current) => current.min(hit),
        None => hit,
      });
    }
  }
  nearest
}

/// Moller-Trumbore, double sided.
fn ray_triangle_intersection(origin: Vec3, direction: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<f32> {
  let edge1 = b - a;
  let edge2 = c - a;
  let p = direction.cross(edge2);
  let determinant = edge1.dot(p);
  if determinant.abs() < 1e-8 {
    return None;
  }
  let inv = 1.0 / determinant;
  let s = origin - a;
  let u = s.dot(p) * inv;
  if !(-MARCH_EPS..=1.0 + MARCH_EPS).contains(&u) {
    return None;
  }
  let q = s.cross(edge1);
  let v = direction.dot(q) * inv;
  if v < -MARCH_EPS || u + v > 1.0 + MARCH_EPS {
    return None;
  }
  let t = edge2.dot(q) * inv;
  if t < 0.0 {
    return None;
  }
  Some(t)
}

#[cfg(test)]
#[path = "query_test.rs"]
mod query_test;
