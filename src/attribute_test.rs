use std::sync::Arc;

use super::*;

#[test]
fn test_standard_channel_ids_are_stable() {
  let registry = AttributeRegistry::with_standard_channels();

  assert_eq!(registry.lookup("heightfield"), Some(AttributeRegistry::HEIGHT));
  assert_eq!(
    registry.lookup("heightfieldColor"),
    Some(AttributeRegistry::COLOR)
  );
  assert_eq!(
    registry.lookup("voxelHermite"),
    Some(AttributeRegistry::VOXEL_HERMITE)
  );
  assert_eq!(
    registry.get(AttributeRegistry::HEIGHTFIELD_BUFFER).kind,
    AttributeKind::HeightfieldBuffer
  );
  assert_eq!(registry.len(), 8);
}

#[test]
fn test_reregistering_name_returns_existing_id() {
  let mut registry = AttributeRegistry::with_standard_channels();

  let id = registry.register(AttributeDef {
    name: "heightfield",
    kind: AttributeKind::Height,
    lod_threshold_multiplier: 1.0,
  });

  assert_eq!(id, AttributeRegistry::HEIGHT);
  assert_eq!(registry.len(), 8);
}

#[test]
fn test_custom_channel_after_standard() {
  let mut registry = AttributeRegistry::with_standard_channels();

  let id = registry.register(AttributeDef {
    name: "debugMask",
    kind: AttributeKind::Height,
    lod_threshold_multiplier: 0.5,
  });

  assert_eq!(id, AttributeId(8));
  assert_eq!(registry.get(id).lod_threshold_multiplier, 0.5);
}

#[test]
fn test_shallow_eq_is_pointer_equality() {
  let payload = Arc::new(HeightPayload::new(2, vec![1, 2, 3, 4]));
  let a = AttributeValue::Height(Arc::clone(&payload));
  let b = AttributeValue::Height(Arc::clone(&payload));
  let c = AttributeValue::Height(Arc::new(HeightPayload::new(2, vec![1, 2, 3, 4])));

  assert!(a.shallow_eq(&b));
  // Equal contents but distinct allocations do not compare equal.
  assert!(!a.shallow_eq(&c));
  assert!(AttributeValue::Empty.shallow_eq(&AttributeValue::Empty));
  assert!(!a.shallow_eq(&AttributeValue::Empty));
}

#[test]
fn test_hermite_payload_indexing() {
  let size = 3;
  let mut contents = vec![0u32; size * size * size * HERMITE_EDGES_PER_POINT];
  // Mark the +Y edge at (1, 2, 0).
  let idx = ((0 * size + 2) * size + 1) * HERMITE_EDGES_PER_POINT + 1;
  contents[idx] = 0xdead_beef;
  let payload = VoxelHermitePayload::new(size, contents);

  assert_eq!(payload.get(1, 2, 0, 1), 0xdead_beef);
  assert_eq!(payload.get(1, 2, 0, 0), 0);
}
