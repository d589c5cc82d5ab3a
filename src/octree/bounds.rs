//! Axis-aligned boxes for cell bounds and dirty-region bookkeeping.

use glam::Vec3;

/// Axis-aligned box in world space.
///
/// Used both for octree cell bounds (where extent is a cube) and for
/// arbitrary regions such as heightfield border strips and dirty unions,
/// which are generally flat or elongated.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Box3 {
  pub minimum: Vec3,
  pub maximum: Vec3,
}

impl Box3 {
  /// Empty box: inverted extents, ready to accumulate via [`Box3::add`].
  pub const EMPTY: Box3 = Box3 {
    minimum: Vec3::splat(f32::INFINITY),
    maximum: Vec3::splat(f32::NEG_INFINITY),
  };

  pub fn new(minimum: Vec3, maximum: Vec3) -> Self {
    Self { minimum, maximum }
  }

  /// Cube cell bounds from a minimum corner and edge size.
  pub fn cube(minimum: Vec3, size: f32) -> Self {
    Self {
      minimum,
      maximum: minimum + Vec3::splat(size),
    }
  }

  /// A box with no volume is empty, matching the open [`Box3::intersects`].
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.minimum.cmpge(self.maximum).any()
  }

  #[inline]
  pub fn center(&self) -> Vec3 {
    (self.minimum + self.maximum) * 0.5
  }

  #[inline]
  pub fn contains_point(&self, point: Vec3) -> bool {
    point.cmpge(self.minimum).all() && point.cmple(self.maximum).all()
  }

  pub fn contains(&self, other: &Box3) -> bool {
    other.minimum.cmpge(self.minimum).all() && other.maximum.cmple(self.maximum).all()
  }

  /// Open intersection test; boxes that merely share a face do not overlap.
  pub fn intersects(&self, other: &Box3) -> bool {
    other.maximum.cmpgt(self.minimum).all() && other.minimum.cmplt(self.maximum).all()
  }

  /// Intersection box; empty (inverted) when the boxes do not overlap.
  pub fn intersection(&self, other: &Box3) -> Box3 {
    Box3 {
      minimum: self.minimum.max(other.minimum),
      maximum: self.maximum.min(other.maximum),
    }
  }

  /// Grow to cover `other`.
  pub fn add(&mut self, other: &Box3) {
    if other.is_empty() {
      return;
    }
    self.minimum = self.minimum.min(other.minimum);
    self.maximum = self.maximum.max(other.maximum);
  }

  /// Slab clip of a ray against the box. Returns the entry distance
  /// (0 when the origin is inside), or None on a miss.
  pub fn find_ray_intersection(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
    let mut t_min = 0.0f32;
    let mut t_max = f32::INFINITY;
    for axis in 0..3 {
      let o = origin[axis];
      let d = direction[axis];
      if d.abs() < f32::EPSILON {
        if o < self.minimum[axis] || o > self.maximum[axis] {
          return None;
        }
        continue;
      }
      let inv = 1.0 / d;
      let mut t0 = (self.minimum[axis] - o) * inv;
      let mut t1 = (self.maximum[axis] - o) * inv;
      if t0 > t1 {
        std::mem::swap(&mut t0, &mut t1);
      }
      t_min = t_min.max(t0);
      t_max = t_max.min(t1);
      if t_min > t_max {
        return None;
      }
    }
    Some(t_min)
  }
}

/// Minimum corner of the given octant of a cell. Octant bits select the
/// upper half per axis: bit 0 = X, bit 1 = Y, bit 2 = Z.
#[inline]
pub fn octant_minimum(minimum: Vec3, half: f32, octant: usize) -> Vec3 {
  Vec3::new(
    minimum.x + if octant & 1 != 0 { half } else { 0.0 },
    minimum.y + if octant & 2 != 0 { half } else { 0.0 },
    minimum.z + if octant & 4 != 0 { half } else { 0.0 },
  )
}

#[cfg(test)]
#[path = "bounds_test.rs"]
mod bounds_test;
