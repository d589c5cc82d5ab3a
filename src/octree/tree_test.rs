use std::sync::Arc;

use glam::Vec3;

use super::*;
use crate::attribute::{AttributeRegistry, HeightPayload};

const HEIGHT: AttributeId = AttributeRegistry::HEIGHT;

fn height_value(fill: u8) -> AttributeValue {
  AttributeValue::Height(Arc::new(HeightPayload::new(1, vec![fill])))
}

#[test]
fn test_set_whole_root_is_single_leaf() {
  let mut tree = MetavoxelTree::new(8.0);
  let value = height_value(42);
  tree.set(HEIGHT, &tree.bounds(), value.clone());

  assert_eq!(tree.arena.live_count(), 1);
  assert!(tree.value_at(HEIGHT, Vec3::ZERO).shallow_eq(&value));
  assert!(tree
    .value_at(HEIGHT, Vec3::splat(-3.9))
    .shallow_eq(&value));
}

#[test]
fn test_set_octant_splits_and_inherits() {
  let mut tree = MetavoxelTree::new(8.0);
  let base = height_value(1);
  let patch = height_value(2);
  tree.set(HEIGHT, &tree.bounds(), base.clone());

  // Lower octant [-4,0)^3 gets the patch.
  let octant = Box3::cube(Vec3::splat(-4.0), 4.0);
  tree.set(HEIGHT, &octant, patch.clone());

  assert!(tree.value_at(HEIGHT, Vec3::splat(-2.0)).shallow_eq(&patch));
  // Siblings still see the base value through inheritance.
  assert!(tree.value_at(HEIGHT, Vec3::splat(2.0)).shallow_eq(&base));
  assert!(tree
    .value_at(HEIGHT, Vec3::new(2.0, -2.0, -2.0))
    .shallow_eq(&base));
}

#[test]
fn test_set_collapses_equal_children() {
  let mut tree = MetavoxelTree::new(8.0);
  let value = height_value(7);

  // Write the same payload into all 8 octants; the tree must collapse back
  // to a single leaf.
  for octant in 0..8 {
    let minimum = octant_minimum(tree.minimum(), 4.0, octant);
    tree.set(HEIGHT, &Box3::cube(minimum, 4.0), value.clone());
  }

  assert_eq!(tree.arena.live_count(), 1);
  assert!(tree.value_at(HEIGHT, Vec3::splat(1.0)).shallow_eq(&value));
}

#[test]
fn test_value_outside_bounds_is_empty() {
  let mut tree = MetavoxelTree::new(8.0);
  tree.set(HEIGHT, &tree.bounds(), height_value(3));

  assert!(tree.value_at(HEIGHT, Vec3::splat(100.0)).is_empty());
  assert!(tree.value_at(AttributeRegistry::COLOR, Vec3::ZERO).is_empty());
}

#[test]
fn test_clone_is_independent_but_shares_payloads() {
  let mut tree = MetavoxelTree::new(8.0);
  let value = height_value(9);
  let octant = Box3::cube(Vec3::splat(-4.0), 4.0);
  tree.set(HEIGHT, &octant, value.clone());

  let copy = tree.clone();
  assert!(copy.value_at(HEIGHT, Vec3::splat(-2.0)).shallow_eq(&value));

  // Mutating the copy leaves the original untouched.
  let mut copy = copy;
  copy.set(HEIGHT, &octant, height_value(10));
  assert!(tree.value_at(HEIGHT, Vec3::splat(-2.0)).shallow_eq(&value));
  assert!(!copy.value_at(HEIGHT, Vec3::splat(-2.0)).shallow_eq(&value));
}

#[test]
fn test_expand_doubles_size_and_preserves_content() {
  let mut tree = MetavoxelTree::new(8.0);
  let value = height_value(5);
  let octant = Box3::cube(Vec3::new(0.0, 0.0, 0.0), 4.0);
  tree.set(HEIGHT, &octant, value.clone());

  tree.expand();

  assert_eq!(tree.size(), 16.0);
  assert_eq!(tree.minimum(), Vec3::splat(-8.0));
  // Content stays at the same world position.
  assert!(tree.value_at(HEIGHT, Vec3::splat(2.0)).shallow_eq(&value));
  assert!(tree.value_at(HEIGHT, Vec3::splat(-2.0)).is_empty());
  // Newly exposed space is empty.
  assert!(tree.value_at(HEIGHT, Vec3::splat(6.0)).is_empty());
}

#[test]
fn test_expand_uniform_leaf_stays_leaf() {
  let mut tree = MetavoxelTree::new(8.0);
  let value = height_value(1);
  tree.set(HEIGHT, &tree.bounds(), value.clone());

  tree.expand();

  assert_eq!(tree.arena.live_count(), 1);
  assert!(tree.value_at(HEIGHT, Vec3::splat(7.0)).shallow_eq(&value));
}

#[test]
fn test_clear_releases_channel() {
  let mut tree = MetavoxelTree::new(8.0);
  let octant = Box3::cube(Vec3::splat(-4.0), 4.0);
  tree.set(HEIGHT, &octant, height_value(1));
  assert!(tree.arena.live_count() > 0);

  tree.clear(HEIGHT);
  assert_eq!(tree.arena.live_count(), 0);
  assert!(tree.value_at(HEIGHT, Vec3::splat(-2.0)).is_empty());
}
