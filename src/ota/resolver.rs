use super::{rollout, version};
use crate::entity::release;

fn native_in_range(release: &release::Model, native: &str) -> bool {
  let above_min = release
    .native_min_version
    .as_deref()
    .filter(|min| !min.is_empty())
    .is_none_or(|min| version::compare(native, min).is_ge());

  let below_max = release
    .native_max_version
    .as_deref()
    .filter(|max| !max.is_empty())
    .is_none_or(|max| version::compare(native, max).is_le());

  above_min && below_max
}

/// Picks the best update for a device out of `releases`.
///
/// Filtering happens before ranking, so the result is the newest release
/// this device may take and never one at or below `current_bundle`.
/// Ties on version keep catalog order, so the most recently created row
/// wins.
pub fn resolve<'a>(
  releases: &'a [release::Model],
  current_bundle: &str,
  native_version: Option<&str>,
  device_id: &str,
) -> Option<&'a release::Model> {
  let mut candidates: Vec<_> = releases
    .iter()
    .filter(|r| version::is_newer(&r.bundle_version, current_bundle))
    .filter(|r| native_version.is_none_or(|native| native_in_range(r, native)))
    .filter(|r| {
      rollout::is_eligible(device_id, &r.bundle_version, r.rollout_percent)
    })
    .collect();

  candidates
    .sort_by(|a, b| version::compare(&b.bundle_version, &a.bundle_version));
  candidates.into_iter().next()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::entity::{Channel, Platform};

  fn release(
    id: i32,
    bundle_version: &str,
    rollout_percent: i32,
  ) -> release::Model {
    release::Model {
      id,
      channel: Channel::Production,
      platform: Platform::All,
      bundle_version: bundle_version.into(),
      file_path: format!("production/{bundle_version}/dist.zip"),
      checksum: None,
      mandatory: false,
      enabled: true,
      rollout_percent,
      native_min_version: None,
      native_max_version: None,
      metadata: json::json!({}),
      created_at: chrono::Utc::now().naive_utc(),
    }
  }

  fn device_where(pred: impl Fn(&str) -> bool) -> String {
    (0..10_000)
      .map(|i| format!("device-{i}"))
      .find(|device| pred(device))
      .expect("no matching device in population")
  }

  #[test]
  fn test_never_returns_older_or_equal() {
    let releases = [
      release(1, "1.0.0", 100),
      release(2, "0.9.0", 100),
      release(3, "v1.0", 100),
    ];
    assert!(resolve(&releases, "1.0.0", None, "device").is_none());
  }

  #[test]
  fn test_highest_version_wins() {
    let releases = [
      release(1, "1.2.0", 100),
      release(2, "1.10.0", 100),
      release(3, "1.3.0", 100),
    ];
    let found = resolve(&releases, "1.0.0", None, "device").unwrap();
    assert_eq!(found.bundle_version, "1.10.0");
  }

  #[test]
  fn test_rollout_gate_falls_back_to_older_candidate() {
    let releases = [release(1, "1.2.0", 100), release(2, "1.3.0", 50)];

    let excluded = device_where(|d| rollout::bucket(d, "1.3.0") >= 50);
    let found = resolve(&releases, "1.0.0", None, &excluded).unwrap();
    assert_eq!(found.bundle_version, "1.2.0");

    let included = device_where(|d| rollout::bucket(d, "1.3.0") < 50);
    let found = resolve(&releases, "1.0.0", None, &included).unwrap();
    assert_eq!(found.bundle_version, "1.3.0");
  }

  #[test]
  fn test_partial_rollout_only_for_low_buckets() {
    let releases = [release(1, "2.0.0", 20)];

    for i in 0..2_000 {
      let device = format!("device-{i}");
      let found = resolve(&releases, "1.0.0", None, &device);
      assert_eq!(found.is_some(), rollout::bucket(&device, "2.0.0") < 20);
    }
  }

  #[test]
  fn test_native_range_is_inclusive() {
    let mut r = release(1, "1.1.0", 100);
    r.native_min_version = Some("2.0.0".into());
    r.native_max_version = Some("2.5.0".into());
    let releases = [r];

    let check =
      |native: &str| resolve(&releases, "1.0.0", Some(native), "device");
    assert!(check("1.9.0").is_none());
    assert!(check("2.0.0").is_some());
    assert!(check("2.5.0").is_some());
    assert!(check("2.6.0").is_none());

    // unknown native version skips the range filter
    assert!(resolve(&releases, "1.0.0", None, "device").is_some());
  }

  #[test]
  fn test_native_open_bounds() {
    let mut min_only = release(1, "1.1.0", 100);
    min_only.native_min_version = Some("3.0".into());
    let mut max_only = release(2, "1.2.0", 100);
    max_only.native_max_version = Some("2.0".into());
    max_only.native_min_version = Some(String::new());
    let releases = [min_only, max_only];

    let found = resolve(&releases, "1.0.0", Some("10.0.0"), "device").unwrap();
    assert_eq!(found.id, 1);
    let found = resolve(&releases, "1.0.0", Some("1.0.0"), "device").unwrap();
    assert_eq!(found.id, 2);
  }

  #[test]
  fn test_duplicate_versions_prefer_catalog_order() {
    let releases = [release(7, "1.5.0", 100), release(3, "1.5.0", 100)];
    let found = resolve(&releases, "1.0.0", None, "device").unwrap();
    assert_eq!(found.id, 7);
  }

  #[test]
  fn test_empty_catalog() {
    assert!(resolve(&[], "0.0.0", None, "anonymous").is_none());
  }
}
