use std::sync::{Arc, RwLock};
use std::time::Duration;

use glam::Vec3;

use crate::attribute::{
  AttributeRegistry, AttributeValue, HeightPayload, VoxelColorPayload, VoxelHermitePayload,
  HERMITE_EDGES_PER_POINT,
};
use crate::contour::hermite::pack;
use crate::heightfield::heightfield_height;
use crate::octree::{Box3, MetavoxelTree};

use super::*;

/// Tree of size 64 with root heightfield data and one voxel leaf holding a
/// single inside lattice corner.
fn sample_tree() -> (MetavoxelTree, AttributeRegistry) {
  let registry = AttributeRegistry::with_standard_channels();
  let mut tree = MetavoxelTree::new(64.0);
  let bounds = tree.bounds();
  tree.set(
    AttributeRegistry::HEIGHT,
    &bounds,
    AttributeValue::Height(Arc::new(HeightPayload {
      width: 8,
      contents: vec![51; 64],
    })),
  );

  let voxel_cell = Box3::cube(Vec3::splat(-32.0), 32.0);
  let mut colors = vec![[0u8; 4]; 8];
  colors[0] = [255, 0, 0, 255];
  let mut hermite = vec![0u32; 8 * HERMITE_EDGES_PER_POINT];
  hermite[0] = pack(Vec3::X, 0.5);
  hermite[1] = pack(Vec3::Y, 0.5);
  hermite[2] = pack(Vec3::Z, 0.5);
  tree.set(
    AttributeRegistry::VOXEL_COLOR,
    &voxel_cell,
    AttributeValue::VoxelColor(Arc::new(VoxelColorPayload::new(2, colors))),
  );
  tree.set(
    AttributeRegistry::VOXEL_HERMITE,
    &voxel_cell,
    AttributeValue::VoxelHermite(Arc::new(VoxelHermitePayload::new(2, hermite))),
  );
  (tree, registry)
}

#[test]
fn test_augment_builds_both_derived_channels() {
  let (tree, registry) = sample_tree();
  let output = augment(&tree, &registry, None, Lod::INVALID);
  assert_eq!(output.stats.heightfield_patches, 1);
  assert_eq!(output.stats.voxel_leaves, 1);

  // The source tree is untouched.
  assert!(tree
    .value_at(AttributeRegistry::HEIGHTFIELD_BUFFER, Vec3::ZERO)
    .is_empty());

  let height = heightfield_height(&output.tree, &registry, Vec3::new(3.0, 0.0, -7.0)).unwrap();
  assert!((height - (-32.0 + 51.0 / 255.0 * 64.0)).abs() < 1e-4);

  let mesh = output
    .tree
    .value_at(AttributeRegistry::VOXEL_BUFFER, Vec3::splat(-16.0))
    .as_voxel_buffer()
    .cloned()
    .unwrap();
  assert_eq!(mesh.translation, Vec3::splat(-32.0));
  assert_eq!(mesh.scale, 32.0);
  assert_eq!(mesh.vertices.len(), 1);
}

#[test]
fn test_augment_is_idempotent() {
  let (tree, registry) = sample_tree();
  let first = augment(&tree, &registry, None, Lod::INVALID);
  let second = augment(&first.tree, &registry, None, Lod::INVALID);

  let point = Vec3::new(-5.0, 0.0, 11.0);
  let a = heightfield_height(&first.tree, &registry, point).unwrap();
  let b = heightfield_height(&second.tree, &registry, point).unwrap();
  assert_eq!(a, b);
}

#[test]
fn test_worker_round_trip() {
  let (tree, registry) = sample_tree();
  let shared: SharedTree = Arc::new(RwLock::new(tree));
  let mut worker = AugmentWorker::new(Arc::new(registry));

  assert!(worker.start(snapshot(&shared), None, Lod::INVALID));
  assert!(worker.is_busy());
  // A second job cannot be queued until the first is polled off.
  assert!(!worker.start(snapshot(&shared), None, Lod::INVALID));

  let mut output = None;
  for _ in 0..400 {
    if let Some(finished) = worker.poll() {
      output = Some(finished);
      break;
    }
    std::thread::sleep(Duration::from_millis(5));
  }
  let output = output.expect("augmentation did not finish");
  assert!(!worker.is_busy());

  publish(&shared, output.tree);
  let registry = AttributeRegistry::with_standard_channels();
  let published = snapshot(&shared);
  assert!(heightfield_height(&published, &registry, Vec3::ZERO).is_some());
}
