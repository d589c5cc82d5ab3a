//! Arena node store with explicit per-slot reference counts.
//!
//! Tree versions share unmodified subtrees by bumping slot refcounts;
//! mutation goes through [`NodeArena::make_unique`], which clones a shared
//! slot before it is edited (copy-on-write at node granularity). A free list
//! recycles released slots, so long-lived trees do not grow the arena
//! unboundedly under churn.
//!
//! Invariant: a node either has all 8 children or none. Parent links do not
//! exist, so cycles are impossible by construction.

use crate::attribute::AttributeValue;

/// Index of a node slot in a [`NodeArena`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(u32);

impl NodeId {
  #[inline]
  fn index(self) -> usize {
    self.0 as usize
  }
}

#[derive(Debug, Default)]
struct Slot {
  refs: u32,
  value: AttributeValue,
  children: Option<[NodeId; 8]>,
}

/// Slab of refcounted octree nodes.
#[derive(Debug, Default)]
pub struct NodeArena {
  slots: Vec<Slot>,
  free: Vec<u32>,
}

impl NodeArena {
  pub fn new() -> Self {
    Self::default()
  }

  #[inline]
  fn slot(&self, id: NodeId) -> &Slot {
    let slot = &self.slots[id.index()];
    debug_assert!(slot.refs > 0, "access to released node {:?}", id);
    slot
  }

  #[inline]
  fn slot_mut(&mut self, id: NodeId) -> &mut Slot {
    let slot = &mut self.slots[id.index()];
    debug_assert!(slot.refs > 0, "access to released node {:?}", id);
    slot
  }

  fn alloc(&mut self, value: AttributeValue, children: Option<[NodeId; 8]>) -> NodeId {
    let slot = Slot {
      refs: 1,
      value,
      children,
    };
    if let Some(index) = self.free.pop() {
      self.slots[index as usize] = slot;
      NodeId(index)
    } else {
      self.slots.push(slot);
      NodeId((self.slots.len() - 1) as u32)
    }
  }

  /// Allocate a leaf with refcount 1.
  pub fn alloc_leaf(&mut self, value: AttributeValue) -> NodeId {
    self.alloc(value, None)
  }

  /// Allocate an internal node, taking ownership of one reference to each
  /// child.
  pub fn alloc_internal(&mut self, value: AttributeValue, children: [NodeId; 8]) -> NodeId {
    self.alloc(value, Some(children))
  }

  /// Add a reference to a node (shares the subtree).
  pub fn retain(&mut self, id: NodeId) {
    self.slot_mut(id).refs += 1;
  }

  /// Drop a reference; frees the slot and releases children when the count
  /// reaches zero. Iterative so release of deep trees cannot overflow the
  /// stack.
  pub fn release(&mut self, id: NodeId) {
    let mut stack = vec![id];
    while let Some(id) = stack.pop() {
      let slot = self.slot_mut(id);
      slot.refs -= 1;
      if slot.refs > 0 {
        continue;
      }
      if let Some(children) = slot.children.take() {
        stack.extend_from_slice(&children);
      }
      slot.value = AttributeValue::Empty;
      self.free.push(id.0);
    }
  }

  #[inline]
  pub fn refs(&self, id: NodeId) -> u32 {
    self.slot(id).refs
  }

  #[inline]
  pub fn value(&self, id: NodeId) -> &AttributeValue {
    &self.slot(id).value
  }

  /// Replace the value of a uniquely owned node.
  pub fn set_value(&mut self, id: NodeId, value: AttributeValue) {
    debug_assert_eq!(self.refs(id), 1, "set_value on shared node");
    self.slot_mut(id).value = value;
  }

  #[inline]
  pub fn children(&self, id: NodeId) -> Option<[NodeId; 8]> {
    self.slot(id).children
  }

  #[inline]
  pub fn is_leaf(&self, id: NodeId) -> bool {
    self.slot(id).children.is_none()
  }

  /// Ensure exclusive ownership of a node, cloning it (and retaining its
  /// children) when the slot is shared. Returns the id to use in place of
  /// `id`; the caller's reference to the original is consumed.
  pub fn make_unique(&mut self, id: NodeId) -> NodeId {
    if self.refs(id) == 1 {
      return id;
    }
    let value = self.slot(id).value.clone();
    let children = self.slot(id).children;
    if let Some(children) = children {
      for child in children {
        self.retain(child);
      }
    }
    self.slot_mut(id).refs -= 1;
    self.alloc(value, children)
  }

  /// Overwrite one child of a uniquely owned internal node. The outgoing
  /// child's reference must already have been consumed by the caller
  /// (typically by a copy-on-write descent that returned a replacement).
  pub fn put_child(&mut self, id: NodeId, octant: usize, child: NodeId) {
    debug_assert_eq!(self.refs(id), 1, "put_child on shared node");
    let slot = self.slot_mut(id);
    let children = slot.children.as_mut().expect("put_child on leaf");
    children[octant] = child;
  }

  /// Turn a uniquely owned leaf into an internal node, taking ownership of
  /// one reference to each child. Children with `Empty` values inherit the
  /// node's own value, so a split does not change any effective value.
  pub fn set_children(&mut self, id: NodeId, children: [NodeId; 8]) {
    debug_assert_eq!(self.refs(id), 1, "set_children on shared node");
    let slot = self.slot_mut(id);
    debug_assert!(slot.children.is_none(), "set_children on internal node");
    slot.children = Some(children);
  }

  /// Collapse equal leaf children back into the parent (the merge step that
  /// keeps the tree minimal after writes).
  ///
  /// All-empty leaf children collapse without touching the parent value;
  /// children holding identical explicit values hoist that value into the
  /// parent. Returns true when a collapse happened.
  pub fn try_merge_children(&mut self, id: NodeId) -> bool {
    let Some(children) = self.slot(id).children else {
      return false;
    };
    if children.iter().any(|&child| !self.is_leaf(child)) {
      return false;
    }
    let first = self.value(children[0]).clone();
    let all_equal = children[1..]
      .iter()
      .all(|&child| self.value(child).shallow_eq(&first));
    if !all_equal {
      return false;
    }
    debug_assert_eq!(self.refs(id), 1, "merge on shared node");
    self.slot_mut(id).children = None;
    for child in children {
      self.release(child);
    }
    if !first.is_empty() {
      self.slot_mut(id).value = first;
    }
    true
  }

  /// Copy a subtree into another arena. Node slots are duplicated; attribute
  /// payloads are shared through their `Arc`s.
  pub fn deep_copy_into(&self, id: NodeId, dest: &mut NodeArena) -> NodeId {
    let value = self.slot(id).value.clone();
    match self.slot(id).children {
      None => dest.alloc_leaf(value),
      Some(children) => {
        let copied = children.map(|child| self.deep_copy_into(child, dest));
        dest.alloc_internal(value, copied)
      }
    }
  }

  /// Number of live (referenced) slots.
  pub fn live_count(&self) -> usize {
    self.slots.len() - self.free.len()
  }
}

#[cfg(test)]
#[path = "arena_test.rs"]
mod arena_test;
