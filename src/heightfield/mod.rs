//! Heightfield terrain: padded per-leaf rasters, the fetch/stitch passes
//! that keep them seamless across resolution boundaries, and point/ray
//! queries against the stitched result.

pub mod buffer;
pub mod fetch;
pub mod query;
pub mod stitch;

pub use buffer::{HeightfieldBuffer, HEIGHT_BORDER, HEIGHT_EXTENSION, SHARED_EDGE};
pub use fetch::fetch_into;
pub use query::{first_ray_heightfield_intersection, heightfield_height};
pub use stitch::{build_buffers, update_buffers, DirtyRegion};
