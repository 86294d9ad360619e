//! Stateless staged rollout.
//!
//! Every `(device, version)` pair lands in a stable bucket in `0..100`.
//! The version is part of the hash input, so each release gets its own
//! independent slice of the device population.

pub const FULL_ROLLOUT: i32 = 100;

/// DJB2 over the UTF-16 code units of `"<device_id>:<bundle_version>"`.
pub fn bucket(device_id: &str, bundle_version: &str) -> u32 {
  let key = format!("{device_id}:{bundle_version}");
  let hash = key.encode_utf16().fold(5381u32, |hash, unit| {
    hash.wrapping_mul(33).wrapping_add(unit as u32)
  });
  hash % 100
}

pub fn is_eligible(
  device_id: &str,
  bundle_version: &str,
  rollout_percent: i32,
) -> bool {
  if rollout_percent >= FULL_ROLLOUT {
    return true;
  }
  // a non-positive percent can never be satisfied by a bucket
  rollout_percent > 0
    && bucket(device_id, bundle_version) < rollout_percent as u32
}

/// Normalises a requested rollout percentage into `1..=100`.
///
/// `None` means the field was absent or not numeric and yields a full
/// rollout.
pub fn clamp_percent(requested: Option<f64>) -> i32 {
  match requested {
    Some(value) if value.is_finite() => {
      value.round().clamp(1.0, FULL_ROLLOUT as f64) as i32
    }
    _ => FULL_ROLLOUT,
  }
}
