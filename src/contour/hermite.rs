//! Packed Hermite edge samples.
//!
//! Each crossing of the density surface with a lattice edge stores a 32-bit
//! value whose little-endian bytes are [normal_x, normal_y, normal_z,
//! offset]: normal components biased around 127, offset mapping 0-255 onto
//! [0, 1] along the edge.

use glam::Vec3;

const NORMAL_BIAS: f32 = 127.0;

pub fn pack(normal: Vec3, offset: f32) -> u32 {
  let scaled = normal.normalize_or_zero() * NORMAL_BIAS;
  let byte = |v: f32| (v + NORMAL_BIAS).clamp(0.0, 255.0) as u8;
  u32::from_le_bytes([
    byte(scaled.x),
    byte(scaled.y),
    byte(scaled.z),
    (offset.clamp(0.0, 1.0) * 255.0).round() as u8,
  ])
}

/// Surface normal, unnormalized; zero only for the all-bias encoding.
pub fn unpack_normal(value: u32) -> Vec3 {
  let [x, y, z, _] = value.to_le_bytes();
  Vec3::new(
    x as f32 - NORMAL_BIAS,
    y as f32 - NORMAL_BIAS,
    z as f32 - NORMAL_BIAS,
  )
}

/// Crossing position as a fraction of the edge, in [0, 1].
pub fn unpack_offset(value: u32) -> f32 {
  (value >> 24) as f32 / 255.0
}

#[cfg(test)]
#[path = "hermite_test.rs"]
mod hermite_test;
