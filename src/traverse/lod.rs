//! Distance-dependent level-of-detail policy.

use glam::Vec3;

/// Decides whether a cell should be subdivided for a given viewer. Lower
/// thresholds subdivide smaller/more distant cells; an invalid LOD
/// (threshold <= 0) subdivides everything.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Lod {
  /// Viewer position.
  pub position: Vec3,
  /// Per-distance threshold; the effective minimum subdivided cell size
  /// grows linearly with distance from `position`.
  pub threshold: f32,
}

impl Lod {
  pub const INVALID: Lod = Lod {
    position: Vec3::ZERO,
    threshold: 0.0,
  };

  pub fn new(position: Vec3, threshold: f32) -> Self {
    Self {
      position,
      threshold,
    }
  }

  #[inline]
  pub fn is_valid(&self) -> bool {
    self.threshold > 0.0
  }

  /// Whether a cell at `minimum` with edge `size` is still above the LOD
  /// floor for its location. `multiplier` scales the threshold per channel.
  #[inline]
  pub fn should_subdivide(&self, minimum: Vec3, size: f32, multiplier: f32) -> bool {
    if !self.is_valid() {
      return true;
    }
    let center = minimum + Vec3::splat(size * 0.5);
    size >= self.position.distance(center) * self.threshold * multiplier
  }
}

#[cfg(test)]
#[path = "lod_test.rs"]
mod lod_test;
