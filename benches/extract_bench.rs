//! Benchmarks for the two extraction passes - dual contouring of a sphere
//! lattice and heightfield stitching over a split tree.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use glam::Vec3;

use voxel_terrain::attribute::{AttributeRegistry, AttributeValue, HeightPayload};
use voxel_terrain::attribute::{VoxelColorPayload, VoxelHermitePayload, HERMITE_EDGES_PER_POINT};
use voxel_terrain::contour::extract_voxel_buffer;
use voxel_terrain::heightfield::build_buffers;
use voxel_terrain::octree::{Box3, MetavoxelTree};
use voxel_terrain::traverse::Lod;

/// Sphere of radius n/3 centered in an n-point lattice, with Hermite
/// samples on every crossing edge.
fn sphere_lattice(n: usize) -> (VoxelColorPayload, VoxelHermitePayload) {
  let center = Vec3::splat((n - 1) as f32 * 0.5);
  let radius = n as f32 / 3.0;
  let inside = |x: usize, y: usize, z: usize| {
    Vec3::new(x as f32, y as f32, z as f32).distance(center) < radius
  };

  let mut colors = vec![[0u8; 4]; n * n * n];
  let mut hermite = vec![0u32; n * n * n * HERMITE_EDGES_PER_POINT];
  for z in 0..n {
    for y in 0..n {
      for x in 0..n {
        let i = (z * n + y) * n + x;
        if inside(x, y, z) {
          colors[i] = [160, 150, 140, 255];
        }
        for axis in 0..3 {
          let mut to = [x, y, z];
          to[axis] += 1;
          if to[axis] >= n {
            continue;
          }
          if inside(x, y, z) == inside(to[0], to[1], to[2]) {
            continue;
          }
          let point = Vec3::new(x as f32, y as f32, z as f32);
          let normal = (point - center).normalize_or_zero();
          hermite[i * HERMITE_EDGES_PER_POINT + axis] =
            voxel_terrain::contour::hermite::pack(normal, 0.5);
        }
      }
    }
  }
  (VoxelColorPayload::new(n, colors), VoxelHermitePayload::new(n, hermite))
}

fn bench_contour(c: &mut Criterion) {
  let mut group = c.benchmark_group("contour_sphere");
  for n in [16usize, 32] {
    let (color, hermite) = sphere_lattice(n);
    group.throughput(Throughput::Elements((n * n * n) as u64));
    group.bench_function(BenchmarkId::from_parameter(n), |b| {
      b.iter(|| {
        let buffer = extract_voxel_buffer(Vec3::ZERO, 32.0, &color, None, &hermite);
        black_box(buffer.vertices.len())
      })
    });
  }
  group.finish();
}

/// Tree of size 64 with one height raster per lower octant.
fn split_tree(width: usize) -> MetavoxelTree {
  let mut tree = MetavoxelTree::new(64.0);
  for octant in [0usize, 1, 4, 5] {
    let minimum = Vec3::new(
      if octant & 1 != 0 { 0.0 } else { -32.0 },
      -32.0,
      if octant & 4 != 0 { 0.0 } else { -32.0 },
    );
    let contents = (0..width * width).map(|i| (i % 254 + 1) as u8).collect();
    tree.set(
      AttributeRegistry::HEIGHT,
      &Box3::cube(minimum, 32.0),
      AttributeValue::Height(Arc::new(HeightPayload { width, contents })),
    );
  }
  tree
}

fn bench_stitch(c: &mut Criterion) {
  let registry = AttributeRegistry::with_standard_channels();
  let mut group = c.benchmark_group("stitch_four_patches");
  for width in [32usize, 64] {
    let tree = split_tree(width);
    group.throughput(Throughput::Elements((width * width * 4) as u64));
    group.bench_function(BenchmarkId::from_parameter(width), |b| {
      b.iter(|| {
        let mut scratch = tree.clone();
        black_box(build_buffers(&mut scratch, &registry, Lod::INVALID))
      })
    });
  }
  group.finish();
}

criterion_group!(benches, bench_contour, bench_stitch);
criterion_main!(benches);
