//! Quadric error function minimizer for dual contouring.
//!
//! Hermite planes are accumulated with Givens rotations into an upper
//! triangular 4x4 system, then solved through the normal equations with a
//! rank-truncated pseudo-inverse so that flat and edge configurations stay
//! stable.

use glam::{Mat3, Vec3};

/// Eigenvalues this far below the largest are treated as zero rank.
const TRUNCATION_RATIO: f32 = 0.1;

#[derive(Clone, Debug)]
pub struct Qef {
  // Upper triangular R of the QR factorization of [A | b].
  rows: [[f32; 4]; 4],
  point_sum: Vec3,
  plane_count: u32,
}

impl Default for Qef {
  fn default() -> Self {
    Self::new()
  }
}

impl Qef {
  pub fn new() -> Self {
    Self {
      rows: [[0.0; 4]; 4],
      point_sum: Vec3::ZERO,
      plane_count: 0,
    }
  }

  pub fn plane_count(&self) -> u32 {
    self.plane_count
  }

  /// Add the plane through `point` with the given (unit) normal.
  pub fn add_plane(&mut self, normal: Vec3, point: Vec3) {
    let mut row = [normal.x, normal.y, normal.z, normal.dot(point)];
    for i in 0..4 {
      let pivot = self.rows[i][i];
      let value = row[i];
      if value == 0.0 {
        continue;
      }
      let radius = (pivot * pivot + value * value).sqrt();
      let c = pivot / radius;
      let s = value / radius;
      for j in 0..4 {
        let a = self.rows[i][j];
        let b = row[j];
        self.rows[i][j] = c * a + s * b;
        row[j] = c * b - s * a;
      }
    }
    self.point_sum += point;
    self.plane_count += 1;
  }

  /// Position minimizing the accumulated error, clamped to the cube at
  /// `minimum` with edge `size`. Falls back to the mass point when no
  /// planes were added.
  pub fn solve(&self, minimum: Vec3, size: f32) -> Vec3 {
    if self.plane_count == 0 {
      return minimum + Vec3::splat(size * 0.5);
    }
    let mass = self.point_sum / self.plane_count as f32;

    // Normal equations from R: [A|b]ᵗ[A|b] = RᵗR.
    let mut ata = [[0.0f32; 3]; 3];
    let mut atb = [0.0f32; 3];
    for i in 0..3 {
      for j in 0..3 {
        let mut sum = 0.0;
        for row in &self.rows {
          sum += row[i] * row[j];
        }
        ata[i][j] = sum;
      }
      let mut sum = 0.0;
      for row in &self.rows {
        sum += row[i] * row[3];
      }
      atb[i] = sum;
    }
    let ata = Mat3::from_cols(
      Vec3::new(ata[0][0], ata[1][0], ata[2][0]),
      Vec3::new(ata[0][1], ata[1][1], ata[2][1]),
      Vec3::new(ata[0][2], ata[1][2], ata[2][2]),
    );
    let atb = Vec3::from_array(atb);

    let pinv = truncated_pseudo_inverse(ata);
    let solution = mass + pinv * (atb - ata * mass);
    solution.clamp(minimum, minimum + Vec3::splat(size))
  }
}

/// Eigenvalues of a symmetric 3x3 matrix, descending, by the closed-form
/// trigonometric method. A near-diagonal matrix short-circuits to its
/// diagonal.
fn symmetric_eigenvalues(m: Mat3) -> [f32; 3] {
  let a = m.x_axis;
  let b = m.y_axis;
  let c = m.z_axis;
  let off = b.x * b.x + c.x * c.x + c.y * c.y;
  let mut values = if off < 1e-12 {
    [a.x, b.y, c.z]
  } else {
    let q = (a.x + b.y + c.z) / 3.0;
    let p2 = (a.x - q).powi(2) + (b.y - q).powi(2) + (c.z - q).powi(2) + 2.0 * off;
    let p = (p2 / 6.0).sqrt();
    let shifted = Mat3::from_cols(
      (m.x_axis - Vec3::new(q, 0.0, 0.0)) / p,
      (m.y_axis - Vec3::new(0.0, q, 0.0)) / p,
      (m.z_axis - Vec3::new(0.0, 0.0, q)) / p,
    );
    let r = (shifted.determinant() / 2.0).clamp(-1.0, 1.0);
    let phi = r.acos() / 3.0;
    let high = q + 2.0 * p * phi.cos();
    let low = q + 2.0 * p * (phi + 2.0 * std::f32::consts::FRAC_PI_3).cos();
    [high, 3.0 * q - high - low, low]
  };
  values.sort_by(|x, y| y.total_cmp(x));
  values
}

fn truncated_pseudo_inverse(ata: Mat3) -> Mat3 {
  let values = symmetric_eigenvalues(ata);
  let max = values[0].abs();
  if max < 1e-12 {
    return Mat3::ZERO;
  }
  let cluster = 1e-4 * max;
  let mut result = Mat3::ZERO;
  let mut i = 0;
  while i < 3 {
    let value = values[i];
    let mut multiplicity = 1;
    while i + multiplicity < 3 && (values[i + multiplicity] - value).abs() <= cluster {
      multiplicity += 1;
    }
    if value.abs() >= TRUNCATION_RATIO * max {
      let weight = 1.0 / value;
      let shifted = Mat3::from_cols(
        ata.x_axis - Vec3::new(value, 0.0, 0.0),
        ata.y_axis - Vec3::new(0.0, value, 0.0),
        ata.z_axis - Vec3::new(0.0, 0.0, value),
      )
      .transpose();
      let rows = [shifted.x_axis, shifted.y_axis, shifted.z_axis];
      match multiplicity {
        1 => {
          // Rank-2 shift: the eigenvector is the common null direction.
          let candidates = [
            rows[0].cross(rows[1]),
            rows[0].cross(rows[2]),
            rows[1].cross(rows[2]),
          ];
          let mut best = candidates[0];
          for candidate in &candidates[1..] {
            if candidate.length_squared() > best.length_squared() {
              best = *candidate;
            }
          }
          let vector = best.normalize_or_zero();
          result += outer(vector, vector) * weight;
        }
        2 => {
          // Rank-1 shift: the eigenspace is the plane normal to the one
          // surviving row.
          let mut normal = rows[0];
          for row in &rows[1..] {
            if row.length_squared() > normal.length_squared() {
              normal = *row;
            }
          }
          let (u, v) = normal.normalize_or_zero().any_orthonormal_pair();
          result += (outer(u, u) + outer(v, v)) * weight;
        }
        _ => {
          result += Mat3::IDENTITY * weight;
        }
      }
    }
    i += multiplicity;
  }
  result
}

fn outer(a: Vec3, b: Vec3) -> Mat3 {
  Mat3::from_cols(a * b.x, a * b.y, a * b.z)
}

#[cfg(test)]
#[path = "qef_test.rs"]
mod qef_test;
