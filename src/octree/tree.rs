//! MetavoxelTree - the sparse attribute octree.
//!
//! One root per attribute channel; each node carries at most one explicit
//! value for its channel. A leaf's effective value is the nearest
//! self-or-ancestor explicit value, so uniform regions cost a single node.
//!
//! The root cell spans `[-size/2, size/2]` on every axis and all descendant
//! cells are exact octant subdivisions, which keeps every cell edge a
//! power-of-two fraction of the root.

use glam::Vec3;
use smallvec::SmallVec;

use super::arena::{NodeArena, NodeId};
use super::bounds::{octant_minimum, Box3};
use crate::attribute::{AttributeId, AttributeValue};

/// Sparse octree of per-channel attribute values.
#[derive(Debug)]
pub struct MetavoxelTree {
  size: f32,
  pub(crate) roots: SmallVec<[(AttributeId, NodeId); 8]>,
  pub(crate) arena: NodeArena,
}

impl MetavoxelTree {
  /// Create an empty tree whose root cell has the given edge size.
  pub fn new(size: f32) -> Self {
    debug_assert!(size > 0.0);
    Self {
      size,
      roots: SmallVec::new(),
      arena: NodeArena::new(),
    }
  }

  #[inline]
  pub fn size(&self) -> f32 {
    self.size
  }

  /// Minimum corner of the root cell.
  #[inline]
  pub fn minimum(&self) -> Vec3 {
    Vec3::splat(self.size * -0.5)
  }

  pub fn bounds(&self) -> Box3 {
    Box3::cube(self.minimum(), self.size)
  }

  pub fn root(&self, attr: AttributeId) -> Option<NodeId> {
    self
      .roots
      .iter()
      .find(|(id, _)| *id == attr)
      .map(|&(_, node)| node)
  }

  fn put_root(&mut self, attr: AttributeId, node: NodeId) {
    if let Some(entry) = self.roots.iter_mut().find(|(id, _)| *id == attr) {
      entry.1 = node;
    } else {
      self.roots.push((attr, node));
    }
  }

  /// Drop a channel entirely.
  pub fn clear(&mut self, attr: AttributeId) {
    if let Some(pos) = self.roots.iter().position(|(id, _)| *id == attr) {
      let (_, node) = self.roots.remove(pos);
      self.arena.release(node);
    }
  }

  /// Set `value` over `target` within the channel, subdividing to the
  /// smallest cells that the target bounds exactly cover. Cells outside the
  /// target are untouched; equal children are collapsed on the way back up.
  pub fn set(&mut self, attr: AttributeId, target: &Box3, value: AttributeValue) {
    let root = match self.root(attr) {
      Some(root) => root,
      None => {
        let root = self.arena.alloc_leaf(AttributeValue::Empty);
        self.roots.push((attr, root));
        root
      }
    };
    let minimum = self.minimum();
    let size = self.size;
    let new_root = set_in(&mut self.arena, root, minimum, size, target, &value, 0);
    self.put_root(attr, new_root);
  }

  /// Effective value of the channel at a point: the nearest explicit value
  /// on the path from the root to the containing leaf.
  pub fn value_at(&self, attr: AttributeId, point: Vec3) -> AttributeValue {
    if !self.bounds().contains_point(point) {
      return AttributeValue::Empty;
    }
    let Some(mut node) = self.root(attr) else {
      return AttributeValue::Empty;
    };
    let mut minimum = self.minimum();
    let mut size = self.size;
    let mut effective = AttributeValue::Empty;
    loop {
      let value = self.arena.value(node);
      if !value.is_empty() {
        effective = value.clone();
      }
      let Some(children) = self.arena.children(node) else {
        return effective;
      };
      let half = size * 0.5;
      let center = minimum + Vec3::splat(half);
      let octant = (point.x >= center.x) as usize
        | ((point.y >= center.y) as usize) << 1
        | ((point.z >= center.z) as usize) << 2;
      node = children[octant];
      minimum = octant_minimum(minimum, half, octant);
      size = half;
    }
  }

  /// Double the root cell, keeping existing content centered. Subtrees are
  /// re-hung via refcount shares, not copied.
  pub fn expand(&mut self) {
    let old_roots = std::mem::take(&mut self.roots);
    for (attr, root) in old_roots {
      let new_root = if self.arena.is_leaf(root) {
        // A uniform channel stays a single leaf at the larger size.
        root
      } else {
        let old_children = self.arena.children(root).expect("internal node");
        let root_value = self.arena.value(root).clone();
        let children: [NodeId; 8] = std::array::from_fn(|octant| {
          let opposite = octant ^ 7;
          self.arena.retain(old_children[octant]);
          let grandchildren: [NodeId; 8] = std::array::from_fn(|slot| {
            if slot == opposite {
              old_children[octant]
            } else {
              self.arena.alloc_leaf(AttributeValue::Empty)
            }
          });
          let child = self.arena.alloc_internal(AttributeValue::Empty, grandchildren);
          self.arena.try_merge_children(child);
          child
        });
        self.arena.release(root);
        let new_root = self.arena.alloc_internal(root_value, children);
        self.arena.try_merge_children(new_root);
        new_root
      };
      self.roots.push((attr, new_root));
    }
    self.size *= 2.0;
  }
}

impl Clone for MetavoxelTree {
  /// Deep value copy: fresh arena slots, shared attribute payloads. This is
  /// the snapshot the augmentation worker mutates while the original stays
  /// renderable.
  fn clone(&self) -> Self {
    let mut arena = NodeArena::new();
    let roots = self
      .roots
      .iter()
      .map(|&(attr, node)| (attr, self.arena.deep_copy_into(node, &mut arena)))
      .collect();
    Self {
      size: self.size,
      roots,
      arena,
    }
  }
}

// Target bounds must be aligned to some subdivision of the root cell; the
// transport layer guarantees this. The depth guard turns a violation into a
// debug panic instead of unbounded subdivision.
const MAX_SET_DEPTH: u32 = 32;

fn set_in(
  arena: &mut NodeArena,
  node: NodeId,
  minimum: Vec3,
  size: f32,
  target: &Box3,
  value: &AttributeValue,
  depth: u32,
) -> NodeId {
  let cell = Box3::cube(minimum, size);
  if !cell.intersects(target) {
    return node;
  }
  if target.contains(&cell) || depth >= MAX_SET_DEPTH {
    debug_assert!(depth < MAX_SET_DEPTH, "set bounds not cell-aligned");
    arena.release(node);
    return arena.alloc_leaf(value.clone());
  }
  let node = arena.make_unique(node);
  if arena.is_leaf(node) {
    // Split; Empty children inherit the leaf's value, so effective values
    // outside the target are preserved.
    let children: [NodeId; 8] = std::array::from_fn(|_| arena.alloc_leaf(AttributeValue::Empty));
    arena.set_children(node, children);
  }
  let half = size * 0.5;
  let children = arena.children(node).expect("split node");
  for (octant, child) in children.into_iter().enumerate() {
    let child_minimum = octant_minimum(minimum, half, octant);
    let new_child = set_in(arena, child, child_minimum, half, target, value, depth + 1);
    if new_child != child {
      arena.put_child(node, octant, new_child);
    }
  }
  arena.try_merge_children(node);
  node
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tree_test;
