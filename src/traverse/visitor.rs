//! Visitor engine - LOD-aware octree traversal.
//!
//! A visitor declares the channels it reads and writes plus an optional LOD.
//! The engine walks all declared input channel trees in lockstep, resolving
//! each cell's effective value (nearest self-or-ancestor explicit value) and
//! invoking the visitor once per candidate cell. The visitor's return value
//! prunes, orders the descent into the 8 octants, or aborts the whole
//! traversal once an authoritative answer is found.
//!
//! A cell is treated as a leaf once its size drops to the LOD threshold for
//! its location, even when finer children exist - this is how a uniformly
//! fine tree renders as a coarser representation near the horizon.
//!
//! Declared outputs are merged back into the tree at the visited cells after
//! the walk completes (copy-on-write through [`MetavoxelTree::set`]); a
//! visitor never observes its own writes within one pass.

use glam::Vec3;
use smallvec::SmallVec;

use crate::attribute::{AttributeId, AttributeRegistry, AttributeValue};
use crate::octree::{octant_minimum, Box3, MetavoxelTree, NodeId};

use super::lod::Lod;

/// Default near-origin-first child order.
pub const DEFAULT_ORDER: [u8; 8] = [0, 1, 2, 3, 4, 5, 6, 7];

/// Reverse child order; guarantees that among leaves covering the same
/// location, the one visited first is the last in default order.
pub const REVERSE_ORDER: [u8; 8] = [7, 6, 5, 4, 3, 2, 1, 0];

/// Action returned by [`Visitor::visit`] for each candidate cell.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Visit {
  /// Prune: do not descend into this cell's children.
  Stop,
  /// Descend into the 8 octants in the given priority order.
  Descend([u8; 8]),
  /// Abort the entire traversal; an authoritative answer was found.
  ShortCircuit,
}

impl Visit {
  /// Descend in default order.
  pub fn descend() -> Visit {
    Visit::Descend(DEFAULT_ORDER)
  }
}

/// Everything a visitor sees about one candidate cell.
pub struct CellInfo<'a> {
  pub minimum: Vec3,
  pub size: f32,
  pub depth: u32,
  /// True when no input channel subdivides further here, or the LOD floor
  /// was reached.
  pub is_leaf: bool,
  /// True when this cell was made a leaf by the LOD threshold alone.
  pub is_lod_leaf: bool,
  /// Effective input values, parallel to [`Visitor::inputs`].
  pub inputs: &'a [AttributeValue],
}

impl CellInfo<'_> {
  pub fn bounds(&self) -> Box3 {
    Box3::cube(self.minimum, self.size)
  }
}

/// A traversal: declared inputs/outputs, an optional LOD, and the per-cell
/// callback.
pub trait Visitor {
  /// Channels whose effective values are resolved into [`CellInfo::inputs`].
  fn inputs(&self) -> &[AttributeId];

  /// Channels this visitor writes at visited cells.
  fn outputs(&self) -> &[AttributeId] {
    &[]
  }

  fn lod(&self) -> Lod {
    Lod::INVALID
  }

  /// Called once per candidate cell. `outputs` is parallel to
  /// [`Visitor::outputs`] and prefilled with `Empty`; any non-empty value
  /// left behind is merged into the tree at this cell.
  fn visit(&mut self, info: &CellInfo, outputs: &mut [AttributeValue]) -> Visit;
}

/// Child order visiting octants from nearest to farthest along `direction`.
/// Used for view-sorted blending and for ray traversals.
pub fn order_for_direction(direction: Vec3) -> [u8; 8] {
  let mut order = DEFAULT_ORDER;
  let along = |octant: u8| -> f32 {
    let offset = Vec3::new(
      (octant & 1) as f32,
      ((octant >> 1) & 1) as f32,
      ((octant >> 2) & 1) as f32,
    );
    offset.dot(direction)
  };
  order.sort_by(|&a, &b| along(a).total_cmp(&along(b)));
  order
}

/// Read-only traversal. Returns false if the visitor short-circuited.
///
/// For visitors that declare outputs, use [`guide`].
pub fn walk<V: Visitor + ?Sized>(
  tree: &MetavoxelTree,
  registry: &AttributeRegistry,
  visitor: &mut V,
) -> bool {
  debug_assert!(visitor.outputs().is_empty(), "writing visitor passed to walk");
  let mut writes = Vec::new();
  run(tree, registry, visitor, &mut writes)
}

/// Traversal that merges declared outputs back into the tree at the visited
/// cells. Returns false if the visitor short-circuited.
pub fn guide<V: Visitor + ?Sized>(
  tree: &mut MetavoxelTree,
  registry: &AttributeRegistry,
  visitor: &mut V,
) -> bool {
  let mut writes = Vec::new();
  let completed = run(tree, registry, visitor, &mut writes);
  for (attr, bounds, value) in writes {
    tree.set(attr, &bounds, value);
  }
  completed
}

type Write = (AttributeId, Box3, AttributeValue);

fn run<V: Visitor + ?Sized>(
  tree: &MetavoxelTree,
  registry: &AttributeRegistry,
  visitor: &mut V,
  writes: &mut Vec<Write>,
) -> bool {
  // The leaf decision uses the most demanding multiplier over all declared
  // channels.
  let mut multiplier = f32::MAX;
  for &attr in visitor.inputs().iter().chain(visitor.outputs()) {
    multiplier = multiplier.min(registry.get(attr).lod_threshold_multiplier);
  }
  if !multiplier.is_finite() {
    multiplier = 1.0;
  }

  let nodes: SmallVec<[Option<NodeId>; 4]> = visitor
    .inputs()
    .iter()
    .map(|&attr| tree.root(attr))
    .collect();
  let inherited: SmallVec<[AttributeValue; 4]> = nodes
    .iter()
    .map(|_| AttributeValue::Empty)
    .collect();
  let mut scratch = vec![AttributeValue::Empty; visitor.outputs().len()];

  visit_cell(VisitArgs {
    tree,
    visitor,
    writes,
    multiplier,
    scratch: &mut scratch,
    nodes: &nodes,
    inherited: &inherited,
    minimum: tree.minimum(),
    size: tree.size(),
    depth: 0,
  })
}

struct VisitArgs<'a, V: ?Sized> {
  tree: &'a MetavoxelTree,
  visitor: &'a mut V,
  writes: &'a mut Vec<Write>,
  multiplier: f32,
  scratch: &'a mut Vec<AttributeValue>,
  nodes: &'a [Option<NodeId>],
  inherited: &'a [AttributeValue],
  minimum: Vec3,
  size: f32,
  depth: u32,
}

fn visit_cell<V: Visitor + ?Sized>(args: VisitArgs<V>) -> bool {
  let VisitArgs {
    tree,
    visitor,
    writes,
    multiplier,
    scratch,
    nodes,
    inherited,
    minimum,
    size,
    depth,
  } = args;
  let arena = &tree.arena;

  // Resolve effective values: explicit here, or inherited from the parent.
  let values: SmallVec<[AttributeValue; 4]> = nodes
    .iter()
    .zip(inherited)
    .map(|(node, parent)| match node {
      Some(id) if !arena.value(*id).is_empty() => arena.value(*id).clone(),
      _ => parent.clone(),
    })
    .collect();

  let is_lod_leaf = !visitor.lod().should_subdivide(minimum, size, multiplier);
  let all_leaves = nodes
    .iter()
    .all(|node| node.map_or(true, |id| arena.is_leaf(id)));
  let info = CellInfo {
    minimum,
    size,
    depth,
    is_leaf: is_lod_leaf || all_leaves,
    is_lod_leaf,
    inputs: &values,
  };

  for slot in scratch.iter_mut() {
    *slot = AttributeValue::Empty;
  }
  let action = visitor.visit(&info, scratch);
  for (slot, &attr) in scratch.iter_mut().zip(visitor.outputs()) {
    let value = std::mem::take(slot);
    if !value.is_empty() {
      writes.push((attr, info.bounds(), value));
    }
  }

  let order = match action {
    Visit::ShortCircuit => return false,
    Visit::Stop => return true,
    Visit::Descend(order) => order,
  };
  if info.is_leaf {
    return true;
  }

  debug_assert!(
    {
      let mut seen = [false; 8];
      order.iter().for_each(|&i| seen[i as usize] = true);
      seen.iter().all(|&s| s)
    },
    "child order is not a permutation"
  );

  // The parent's output slots were drained above, so the scratch buffer can
  // be reused by the children.
  let half = size * 0.5;
  for &octant in &order {
    let child_nodes: SmallVec<[Option<NodeId>; 4]> = nodes
      .iter()
      .map(|node| {
        node.and_then(|id| arena.children(id).map(|children| children[octant as usize]))
      })
      .collect();
    let completed = visit_cell(VisitArgs {
      tree,
      visitor: &mut *visitor,
      writes: &mut *writes,
      multiplier,
      scratch: &mut *scratch,
      nodes: &child_nodes,
      inherited: &values,
      minimum: octant_minimum(minimum, half, octant as usize),
      size: half,
      depth: depth + 1,
    });
    if !completed {
      return false;
    }
  }
  true
}

#[cfg(test)]
#[path = "visitor_test.rs"]
mod visitor_test;
