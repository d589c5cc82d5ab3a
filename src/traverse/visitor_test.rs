use std::sync::Arc;

use glam::Vec3;

use super::*;
use crate::attribute::{AttributeRegistry, HeightPayload};
use crate::octree::Box3;

const HEIGHT: AttributeId = AttributeRegistry::HEIGHT;
const COLOR: AttributeId = AttributeRegistry::COLOR;

fn height_value(fill: u8) -> AttributeValue {
  AttributeValue::Height(Arc::new(HeightPayload::new(1, vec![fill])))
}

fn split_tree() -> (MetavoxelTree, AttributeRegistry) {
  let mut tree = MetavoxelTree::new(8.0);
  tree.set(
    HEIGHT,
    &Box3::cube(Vec3::splat(-4.0), 4.0),
    height_value(1),
  );
  tree.set(
    HEIGHT,
    &Box3::cube(Vec3::new(0.0, -4.0, -4.0), 4.0),
    height_value(2),
  );
  (tree, AttributeRegistry::with_standard_channels())
}

/// Records the cells whose visit saw a leaf.
struct LeafRecorder {
  inputs: [AttributeId; 1],
  lod: Lod,
  leaves: Vec<(Vec3, f32, bool)>,
}

impl LeafRecorder {
  fn new(lod: Lod) -> Self {
    Self {
      inputs: [HEIGHT],
      lod,
      leaves: Vec::new(),
    }
  }
}

impl Visitor for LeafRecorder {
  fn inputs(&self) -> &[AttributeId] {
    &self.inputs
  }

  fn lod(&self) -> Lod {
    self.lod
  }

  fn visit(&mut self, info: &CellInfo, _outputs: &mut [AttributeValue]) -> Visit {
    if info.is_leaf {
      self
        .leaves
        .push((info.minimum, info.size, info.is_lod_leaf));
      return Visit::Stop;
    }
    Visit::descend()
  }
}

#[test]
fn test_walk_reaches_all_leaves() {
  let (tree, registry) = split_tree();
  let mut recorder = LeafRecorder::new(Lod::INVALID);

  assert!(walk(&tree, &registry, &mut recorder));
  // The root split once: 8 leaf octants.
  assert_eq!(recorder.leaves.len(), 8);
  assert!(recorder.leaves.iter().all(|&(_, size, _)| size == 4.0));
}

#[test]
fn test_lod_threshold_truncates_traversal() {
  let (tree, registry) = split_tree();
  // Viewer so far away that even the root fails the subdivide test.
  let lod = Lod::new(Vec3::new(1000.0, 0.0, 0.0), 1.0);
  let mut recorder = LeafRecorder::new(lod);

  assert!(walk(&tree, &registry, &mut recorder));
  assert_eq!(recorder.leaves.len(), 1);
  let (minimum, size, is_lod_leaf) = recorder.leaves[0];
  assert_eq!(minimum, Vec3::splat(-4.0));
  assert_eq!(size, 8.0);
  assert!(is_lod_leaf);
}

#[test]
fn test_inherited_values_resolve_to_nearest_ancestor() {
  let mut tree = MetavoxelTree::new(8.0);
  let registry = AttributeRegistry::with_standard_channels();
  let base = height_value(7);
  tree.set(HEIGHT, &tree.bounds(), base.clone());
  // Split the tree by writing a different value into one octant.
  let patch = height_value(9);
  tree.set(HEIGHT, &Box3::cube(Vec3::splat(-4.0), 4.0), patch.clone());

  struct Check {
    inputs: [AttributeId; 1],
    patch: AttributeValue,
    base: AttributeValue,
    checked: usize,
  }
  impl Visitor for Check {
    fn inputs(&self) -> &[AttributeId] {
      &self.inputs
    }
    fn visit(&mut self, info: &CellInfo, _outputs: &mut [AttributeValue]) -> Visit {
      if info.is_leaf {
        let expected = if info.minimum == Vec3::splat(-4.0) {
          &self.patch
        } else {
          &self.base
        };
        assert!(info.inputs[0].shallow_eq(expected), "at {:?}", info.minimum);
        self.checked += 1;
        return Visit::Stop;
      }
      Visit::descend()
    }
  }

  let mut check = Check {
    inputs: [HEIGHT],
    patch,
    base,
    checked: 0,
  };
  assert!(walk(&tree, &registry, &mut check));
  assert_eq!(check.checked, 8);
}

#[test]
fn test_short_circuit_aborts_traversal() {
  let (tree, registry) = split_tree();

  struct FirstLeaf {
    inputs: [AttributeId; 1],
    visited: usize,
  }
  impl Visitor for FirstLeaf {
    fn inputs(&self) -> &[AttributeId] {
      &self.inputs
    }
    fn visit(&mut self, info: &CellInfo, _outputs: &mut [AttributeValue]) -> Visit {
      if info.is_leaf {
        self.visited += 1;
        return Visit::ShortCircuit;
      }
      Visit::descend()
    }
  }

  let mut visitor = FirstLeaf {
    inputs: [HEIGHT],
    visited: 0,
  };
  assert!(!walk(&tree, &registry, &mut visitor));
  assert_eq!(visitor.visited, 1);
}

#[test]
fn test_descend_order_is_respected() {
  let (tree, registry) = split_tree();

  struct Ordered {
    inputs: [AttributeId; 1],
    minima: Vec<Vec3>,
  }
  impl Visitor for Ordered {
    fn inputs(&self) -> &[AttributeId] {
      &self.inputs
    }
    fn visit(&mut self, info: &CellInfo, _outputs: &mut [AttributeValue]) -> Visit {
      if info.is_leaf {
        self.minima.push(info.minimum);
        return Visit::Stop;
      }
      Visit::Descend(REVERSE_ORDER)
    }
  }

  let mut visitor = Ordered {
    inputs: [HEIGHT],
    minima: Vec::new(),
  };
  assert!(walk(&tree, &registry, &mut visitor));
  // Reverse order visits octant 7 (all-positive) first, octant 0 last.
  assert_eq!(visitor.minima.first(), Some(&Vec3::splat(0.0)));
  assert_eq!(visitor.minima.last(), Some(&Vec3::splat(-4.0)));
}

#[test]
fn test_guide_merges_outputs_at_visited_cells() {
  let (mut tree, registry) = split_tree();

  struct Promote {
    inputs: [AttributeId; 1],
    outputs: [AttributeId; 1],
  }
  impl Visitor for Promote {
    fn inputs(&self) -> &[AttributeId] {
      &self.inputs
    }
    fn outputs(&self) -> &[AttributeId] {
      &self.outputs
    }
    fn visit(&mut self, info: &CellInfo, outputs: &mut [AttributeValue]) -> Visit {
      if info.is_leaf {
        if let Some(height) = info.inputs[0].as_height() {
          // Derive a color payload from the height payload.
          let colors = vec![height.contents[0]; 3];
          outputs[0] = AttributeValue::Color(Arc::new(crate::attribute::ColorPayload::new(
            1, colors,
          )));
        }
        return Visit::Stop;
      }
      Visit::descend()
    }
  }

  let mut visitor = Promote {
    inputs: [HEIGHT],
    outputs: [COLOR],
  };
  assert!(guide(&mut tree, &registry, &mut visitor));

  let derived = tree.value_at(COLOR, Vec3::splat(-2.0));
  assert_eq!(derived.as_color().unwrap().contents, vec![1, 1, 1]);
  let derived = tree.value_at(COLOR, Vec3::new(2.0, -2.0, -2.0));
  assert_eq!(derived.as_color().unwrap().contents, vec![2, 2, 2]);
  // Octants with no height data produced no color.
  assert!(tree.value_at(COLOR, Vec3::splat(2.0)).is_empty());
}

#[test]
fn test_order_for_direction_sorts_near_to_far() {
  // Looking along +X: octants with X bit 0 come first.
  let order = order_for_direction(Vec3::X);
  let first_four: Vec<u8> = order[..4].to_vec();
  assert!(first_four.iter().all(|&octant| octant & 1 == 0));

  // Along the main diagonal, octant 0 is first and 7 last.
  let order = order_for_direction(Vec3::splat(1.0));
  assert_eq!(order[0], 0);
  assert_eq!(order[7], 7);

  // Opposite diagonal reverses the extremes.
  let order = order_for_direction(Vec3::splat(-1.0));
  assert_eq!(order[0], 7);
  assert_eq!(order[7], 0);
}
