//! Attribute registry - typed, named per-cell data channels.
//!
//! Every octree cell may carry one value per registered channel. Raw channels
//! (height, color, material, Hermite) are decoded into the tree by the
//! transport layer; derived channels (heightfield buffer, voxel buffer) are
//! produced by the augmentation pipelines in this crate.
//!
//! Payloads are held behind `Arc` so that a value copy of a tree (the
//! augmentation snapshot) shares raster and mesh storage with the original
//! until a pass replaces it.

use std::collections::HashMap;
use std::sync::Arc;

use crate::contour::VoxelBuffer;
use crate::heightfield::HeightfieldBuffer;

/// Dense index of a registered attribute channel.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct AttributeId(pub u16);

impl AttributeId {
  #[inline]
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

/// Payload type carried by a channel.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AttributeKind {
  /// Square byte raster of height samples (0 = no data).
  Height,
  /// Square RGB raster, 3 bytes per texel.
  Color,
  /// Square byte raster of material-table indices plus definitions.
  Material,
  /// Cubic RGBA lattice; alpha != 0 means "inside".
  VoxelColor,
  /// Cubic byte lattice of material-table indices plus definitions.
  VoxelMaterial,
  /// Packed Hermite edge samples, three per lattice point.
  VoxelHermite,
  /// Derived: padded heightfield raster buffer.
  HeightfieldBuffer,
  /// Derived: dual-contoured mesh buffer.
  VoxelBuffer,
}

/// Descriptor for one registered channel.
#[derive(Clone, Debug)]
pub struct AttributeDef {
  pub name: &'static str,
  pub kind: AttributeKind,

  /// Scales the visitor LOD threshold for this channel; values below 1.0
  /// keep the channel subdivided further out than the default.
  pub lod_threshold_multiplier: f32,
}

/// Registry of attribute channels, looked up by id or name.
#[derive(Clone, Debug, Default)]
pub struct AttributeRegistry {
  defs: Vec<AttributeDef>,
  by_name: HashMap<&'static str, AttributeId>,
}

impl AttributeRegistry {
  // The standard channels are registered first, in this order.
  pub const HEIGHT: AttributeId = AttributeId(0);
  pub const COLOR: AttributeId = AttributeId(1);
  pub const MATERIAL: AttributeId = AttributeId(2);
  pub const VOXEL_COLOR: AttributeId = AttributeId(3);
  pub const VOXEL_MATERIAL: AttributeId = AttributeId(4);
  pub const VOXEL_HERMITE: AttributeId = AttributeId(5);
  pub const HEIGHTFIELD_BUFFER: AttributeId = AttributeId(6);
  pub const VOXEL_BUFFER: AttributeId = AttributeId(7);

  pub fn new() -> Self {
    Self::default()
  }

  /// Registry pre-populated with the standard terrain channels.
  pub fn with_standard_channels() -> Self {
    let mut registry = Self::new();
    let standard = [
      ("heightfield", AttributeKind::Height),
      ("heightfieldColor", AttributeKind::Color),
      ("heightfieldMaterial", AttributeKind::Material),
      ("voxelColor", AttributeKind::VoxelColor),
      ("voxelMaterial", AttributeKind::VoxelMaterial),
      ("voxelHermite", AttributeKind::VoxelHermite),
      ("heightfieldBuffer", AttributeKind::HeightfieldBuffer),
      ("voxelBuffer", AttributeKind::VoxelBuffer),
    ];
    for (name, kind) in standard {
      registry.register(AttributeDef {
        name,
        kind,
        lod_threshold_multiplier: 1.0,
      });
    }
    debug_assert_eq!(registry.lookup("voxelBuffer"), Some(Self::VOXEL_BUFFER));
    registry
  }

  /// Register a channel, returning its id. Re-registering a name returns the
  /// existing id.
  pub fn register(&mut self, def: AttributeDef) -> AttributeId {
    if let Some(&id) = self.by_name.get(def.name) {
      return id;
    }
    let id = AttributeId(self.defs.len() as u16);
    self.by_name.insert(def.name, id);
    self.defs.push(def);
    id
  }

  pub fn get(&self, id: AttributeId) -> &AttributeDef {
    &self.defs[id.index()]
  }

  pub fn lookup(&self, name: &str) -> Option<AttributeId> {
    self.by_name.get(name).copied()
  }

  pub fn len(&self) -> usize {
    self.defs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.defs.is_empty()
  }
}

/// Material definition referenced by index from material rasters and voxel
/// vertices. Opaque to this core; the render layer resolves it to textures.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MaterialDef {
  pub name: String,
}

impl MaterialDef {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into() }
  }
}

/// Square byte raster of height samples. A sample of 0 means "no data";
/// real heights occupy [1, 255].
#[derive(Clone, PartialEq, Debug)]
pub struct HeightPayload {
  pub width: usize,
  pub contents: Vec<u8>,
}

impl HeightPayload {
  pub fn new(width: usize, contents: Vec<u8>) -> Self {
    debug_assert_eq!(contents.len(), width * width);
    Self { width, contents }
  }

  #[inline]
  pub fn get(&self, x: usize, y: usize) -> u8 {
    self.contents[y * self.width + x]
  }
}

/// Square RGB raster, 3 bytes per texel.
#[derive(Clone, PartialEq, Debug)]
pub struct ColorPayload {
  pub width: usize,
  pub contents: Vec<u8>,
}

impl ColorPayload {
  pub fn new(width: usize, contents: Vec<u8>) -> Self {
    debug_assert_eq!(contents.len(), width * width * 3);
    Self { width, contents }
  }
}

/// Square byte raster of material indices plus the referenced definitions.
#[derive(Clone, PartialEq, Debug)]
pub struct MaterialPayload {
  pub width: usize,
  pub contents: Vec<u8>,
  pub materials: Vec<MaterialDef>,
}

impl MaterialPayload {
  pub fn new(width: usize, contents: Vec<u8>, materials: Vec<MaterialDef>) -> Self {
    debug_assert_eq!(contents.len(), width * width);
    Self {
      width,
      contents,
      materials,
    }
  }
}

/// Cubic RGBA lattice, `size` points per edge. Alpha != 0 marks a lattice
/// point as inside the density field.
#[derive(Clone, PartialEq, Debug)]
pub struct VoxelColorPayload {
  pub size: usize,
  pub contents: Vec<[u8; 4]>,
}

impl VoxelColorPayload {
  pub fn new(size: usize, contents: Vec<[u8; 4]>) -> Self {
    debug_assert_eq!(contents.len(), size * size * size);
    Self { size, contents }
  }

  #[inline]
  pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
    (z * self.size + y) * self.size + x
  }
}

/// Cubic byte lattice of material indices plus definitions.
#[derive(Clone, PartialEq, Debug)]
pub struct VoxelMaterialPayload {
  pub size: usize,
  pub contents: Vec<u8>,
  pub materials: Vec<MaterialDef>,
}

impl VoxelMaterialPayload {
  pub fn new(size: usize, contents: Vec<u8>, materials: Vec<MaterialDef>) -> Self {
    debug_assert_eq!(contents.len(), size * size * size);
    Self {
      size,
      contents,
      materials,
    }
  }
}

/// Number of Hermite edge samples stored per lattice point (+X, +Y, +Z).
pub const HERMITE_EDGES_PER_POINT: usize = 3;

/// Packed Hermite edge samples: one 32-bit value per lattice-point edge.
/// Bytes are [normal_x, normal_y, normal_z, offset], with normal components
/// biased around 127 and offset mapping 0-255 onto [0, 1] along the edge.
#[derive(Clone, PartialEq, Debug)]
pub struct VoxelHermitePayload {
  pub size: usize,
  pub contents: Vec<u32>,
}

impl VoxelHermitePayload {
  pub fn new(size: usize, contents: Vec<u32>) -> Self {
    debug_assert_eq!(contents.len(), size * size * size * HERMITE_EDGES_PER_POINT);
    Self { size, contents }
  }

  /// Sample for the edge leaving (x, y, z) along `axis` (0 = X, 1 = Y, 2 = Z).
  #[inline]
  pub fn get(&self, x: usize, y: usize, z: usize, axis: usize) -> u32 {
    self.contents[((z * self.size + y) * self.size + x) * HERMITE_EDGES_PER_POINT + axis]
  }
}

/// Per-cell value of one channel. Clone is cheap: payloads sit behind `Arc`
/// and are never mutated in place (replace-not-mutate).
#[derive(Clone, Debug, Default)]
pub enum AttributeValue {
  /// No explicit value; the effective value inherits from the nearest
  /// ancestor that stores one.
  #[default]
  Empty,
  Height(Arc<HeightPayload>),
  Color(Arc<ColorPayload>),
  Material(Arc<MaterialPayload>),
  VoxelColor(Arc<VoxelColorPayload>),
  VoxelMaterial(Arc<VoxelMaterialPayload>),
  VoxelHermite(Arc<VoxelHermitePayload>),
  HeightfieldBuffer(Arc<HeightfieldBuffer>),
  VoxelBuffer(Arc<VoxelBuffer>),
}

impl AttributeValue {
  #[inline]
  pub fn is_empty(&self) -> bool {
    matches!(self, AttributeValue::Empty)
  }

  /// Pointer equality on payloads. Sufficient for merge-collapse decisions
  /// because payloads are replaced, never edited in place.
  pub fn shallow_eq(&self, other: &AttributeValue) -> bool {
    use AttributeValue::*;
    match (self, other) {
      (Empty, Empty) => true,
      (Height(a), Height(b)) => Arc::ptr_eq(a, b),
      (Color(a), Color(b)) => Arc::ptr_eq(a, b),
      (Material(a), Material(b)) => Arc::ptr_eq(a, b),
      (VoxelColor(a), VoxelColor(b)) => Arc::ptr_eq(a, b),
      (VoxelMaterial(a), VoxelMaterial(b)) => Arc::ptr_eq(a, b),
      (VoxelHermite(a), VoxelHermite(b)) => Arc::ptr_eq(a, b),
      (HeightfieldBuffer(a), HeightfieldBuffer(b)) => Arc::ptr_eq(a, b),
      (VoxelBuffer(a), VoxelBuffer(b)) => Arc::ptr_eq(a, b),
      _ => false,
    }
  }

  pub fn as_height(&self) -> Option<&Arc<HeightPayload>> {
    match self {
      AttributeValue::Height(payload) => Some(payload),
      _ => None,
    }
  }

  pub fn as_color(&self) -> Option<&Arc<ColorPayload>> {
    match self {
      AttributeValue::Color(payload) => Some(payload),
      _ => None,
    }
  }

  pub fn as_material(&self) -> Option<&Arc<MaterialPayload>> {
    match self {
      AttributeValue::Material(payload) => Some(payload),
      _ => None,
    }
  }

  pub fn as_voxel_color(&self) -> Option<&Arc<VoxelColorPayload>> {
    match self {
      AttributeValue::VoxelColor(payload) => Some(payload),
      _ => None,
    }
  }

  pub fn as_voxel_material(&self) -> Option<&Arc<VoxelMaterialPayload>> {
    match self {
      AttributeValue::VoxelMaterial(payload) => Some(payload),
      _ => None,
    }
  }

  pub fn as_voxel_hermite(&self) -> Option<&Arc<VoxelHermitePayload>> {
    match self {
      AttributeValue::VoxelHermite(payload) => Some(payload),
      _ => None,
    }
  }

  pub fn as_heightfield_buffer(&self) -> Option<&Arc<HeightfieldBuffer>> {
    match self {
      AttributeValue::HeightfieldBuffer(payload) => Some(payload),
      _ => None,
    }
  }

  pub fn as_voxel_buffer(&self) -> Option<&Arc<VoxelBuffer>> {
    match self {
      AttributeValue::VoxelBuffer(payload) => Some(payload),
      _ => None,
    }
  }
}

#[cfg(test)]
#[path = "attribute_test.rs"]
mod attribute_test;
