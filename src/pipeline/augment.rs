//! Augmentation pipeline: run the derive passes on an owned snapshot of the
//! tree, off the main thread, and publish the result when it is ready.
//!
//! The worker never shares mutable state with the caller. `start` hands it a
//! value copy of the tree (payloads stay behind shared `Arc`s, so the copy
//! is cheap); the finished tree comes back over a single-slot channel and
//! replaces the published tree wholesale. Passes are idempotent, so a
//! snapshot taken mid-edit only costs a redundant re-run, never corruption.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, TryRecvError};
use web_time::Instant;

use crate::attribute::AttributeRegistry;
use crate::contour::build_voxel_buffers;
use crate::heightfield::stitch::{build_buffers, update_buffers, DirtyRegion};
use crate::octree::MetavoxelTree;
use crate::traverse::Lod;

/// Published tree, swapped atomically under the lock when a pass finishes.
pub type SharedTree = Arc<RwLock<MetavoxelTree>>;

#[derive(Clone, Copy, Debug, Default)]
pub struct AugmentStats {
  /// Heightfield buffers written by the stitch pass.
  pub heightfield_patches: usize,
  /// Leaves contoured by the voxel pass.
  pub voxel_leaves: usize,
  pub elapsed: Duration,
}

pub struct AugmentOutput {
  pub tree: MetavoxelTree,
  pub stats: AugmentStats,
}

/// Run every augmentation pass on a value copy of `tree` and return the
/// augmented copy. `dirty` limits the heightfield pass to the changed
/// region; without it every buffer is rebuilt.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
pub fn augment(
  tree: &MetavoxelTree,
  registry: &AttributeRegistry,
  dirty: Option<&DirtyRegion>,
  lod: Lod,
) -> AugmentOutput {
  let start = Instant::now();
  let mut augmented = tree.clone();
  let heightfield_patches = match dirty {
    Some(dirty) => update_buffers(&mut augmented, registry, dirty, lod),
    None => build_buffers(&mut augmented, registry, lod),
  };
  let voxel_leaves = build_voxel_buffers(&mut augmented, registry, lod);
  AugmentOutput {
    tree: augmented,
    stats: AugmentStats {
      heightfield_patches,
      voxel_leaves,
      elapsed: start.elapsed(),
    },
  }
}

/// Background augmentation with at most one job in flight.
pub struct AugmentWorker {
  registry: Arc<AttributeRegistry>,
  receiver: Option<Receiver<AugmentOutput>>,
}

impl AugmentWorker {
  pub fn new(registry: Arc<AttributeRegistry>) -> Self {
    Self {
      registry,
      receiver: None,
    }
  }

  pub fn is_busy(&self) -> bool {
    self.receiver.is_some()
  }

  /// Queue an augmentation of `snapshot` on the rayon pool. Returns false
  /// without spawning when a job is already running; the caller keeps
  /// accumulating dirty regions and retries after the next poll.
  pub fn start(&mut self, snapshot: MetavoxelTree, dirty: Option<DirtyRegion>, lod: Lod) -> bool {
    if self.receiver.is_some() {
      return false;
    }
    let (sender, receiver) = bounded(1);
    let registry = Arc::clone(&self.registry);
    rayon::spawn(move || {
      let output = augment(&snapshot, &registry, dirty.as_ref(), lod);
      // The receiver may have been dropped; nothing to do then.
      let _ = sender.send(output);
    });
    self.receiver = Some(receiver);
    true
  }

  /// Non-blocking check for a finished job.
  pub fn poll(&mut self) -> Option<AugmentOutput> {
    let receiver = self.receiver.as_ref()?;
    match receiver.try_recv() {
      Ok(output) => {
        self.receiver = None;
        Some(output)
      }
      Err(TryRecvError::Empty) => None,
      Err(TryRecvError::Disconnected) => {
        self.receiver = None;
        None
      }
    }
  }
}

/// Swap the augmented tree into the published slot.
pub fn publish(shared: &SharedTree, tree: MetavoxelTree) {
  let mut guard = shared.write().unwrap_or_else(PoisonError::into_inner);
  *guard = tree;
}

/// Value copy of the published tree for the next augmentation run.
pub fn snapshot(shared: &SharedTree) -> MetavoxelTree {
  shared
    .read()
    .unwrap_or_else(PoisonError::into_inner)
    .clone()
}

#[cfg(test)]
#[path = "augment_test.rs"]
mod augment_test;
