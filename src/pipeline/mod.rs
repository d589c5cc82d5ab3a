//! Pipelines that derive render-facing channels from the raw ones.

pub mod augment;

pub use augment::{
  augment, publish, snapshot, AugmentOutput, AugmentStats, AugmentWorker, SharedTree,
};
