//! Loose dotted-numeric version ordering.
//!
//! Versions like `v1.4.2`, `1.4` or `1.4.2-beta` are reduced to a vector of
//! integers: the leading `v` is dropped, each dot-separated component keeps
//! only its leading digit run, and anything unparsable counts as zero. A
//! digit run too large for `u64` saturates instead of wrapping to zero.
//! Pre-release tags therefore carry no weight: `1.0.0-alpha == 1.0.0-beta`.

use std::cmp::Ordering;

fn components(version: &str) -> Vec<u64> {
  let version = version
    .strip_prefix('v')
    .or_else(|| version.strip_prefix('V'))
    .unwrap_or(version);

  version
    .split('.')
    .map(|part| {
      let end =
        part.find(|c: char| !c.is_ascii_digit()).unwrap_or(part.len());
      let digits = &part[..end];
      match digits.parse() {
        Ok(n) => n,
        Err(_) if digits.is_empty() => 0,
        Err(_) => u64::MAX,
      }
    })
    .collect()
}

/// Compares two bundle or native versions component-wise.
///
/// Missing trailing components are treated as `0`, so `1.2` and `1.2.0`
/// are equal.
pub fn compare(a: &str, b: &str) -> Ordering {
  let (a, b) = (components(a), components(b));
  let len = a.len().max(b.len());

  (0..len)
    .map(|i| {
      let x = a.get(i).copied().unwrap_or(0);
      let y = b.get(i).copied().unwrap_or(0);
      x.cmp(&y)
    })
    .find(|ord| ord.is_ne())
    .unwrap_or(Ordering::Equal)
}

pub fn is_newer(candidate: &str, current: &str) -> bool {
  compare(candidate, current).is_gt()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_oversized_component_saturates() {
    assert!(is_newer("1.99999999999999999999", "1.1"));
    assert!(is_newer("1.99999999999999999999", "1.18446744073709551614"));
    assert_eq!(
      compare("1.99999999999999999999", "1.18446744073709551615"),
      Ordering::Equal
    );
  }

  #[test]
  fn test_numeric_not_lexical() {
    assert_eq!(compare("1.2.0", "1.10.0"), Ordering::Less);
    assert_eq!(compare("1.10.0", "1.2.0"), Ordering::Greater);
    assert_eq!(compare("2.0.0", "1.99.99"), Ordering::Greater);
  }

  #[test]
  fn test_leading_v_ignored() {
    assert_eq!(compare("v1.2.3", "1.2.3"), Ordering::Equal);
    assert_eq!(compare("V1.2.3", "v1.2.3"), Ordering::Equal);
    // only a single prefix is stripped
    assert_eq!(compare("vv1.2.3", "0.2.3"), Ordering::Equal);
  }

  #[test]
  fn test_suffixes_are_stripped() {
    assert_eq!(compare("1.2.3-beta", "1.2.4"), Ordering::Less);
    assert_eq!(compare("1.2.3-beta", "1.2.3"), Ordering::Equal);
    assert_eq!(compare("1.0.0-alpha", "1.0.0-beta"), Ordering::Equal);
    assert_eq!(compare("3rc1.0", "3.0"), Ordering::Equal);
  }

  #[test]
  fn test_missing_components_pad_with_zero() {
    assert_eq!(compare("1.2", "1.2.0"), Ordering::Equal);
    assert_eq!(compare("1.2", "1.2.1"), Ordering::Less);
    assert_eq!(compare("1", "0.9.9.9"), Ordering::Greater);
  }

  #[test]
  fn test_garbage_is_zero() {
    assert_eq!(compare("", "0.0.0"), Ordering::Equal);
    assert_eq!(compare("abc", "0"), Ordering::Equal);
    assert_eq!(compare("x.y.1", "0.0.1"), Ordering::Equal);
  }

  #[test]
  fn test_total_order() {
    let versions =
      ["0.0.1", "1.0", "1.0.0-rc", "v1.0.1", "1.2.0", "1.10.0", "2", "10.0"];

    for a in versions {
      assert_eq!(compare(a, a), Ordering::Equal);
      for b in versions {
        assert_eq!(compare(a, b), compare(b, a).reverse());
        for c in versions {
          if compare(a, b).is_le() && compare(b, c).is_le() {
            assert!(compare(a, c).is_le(), "{a} <= {b} <= {c}");
          }
        }
      }
    }
  }

  #[test]
  fn test_is_newer() {
    assert!(is_newer("1.0.1", "1.0.0"));
    assert!(!is_newer("1.0.0", "1.0.0"));
    assert!(!is_newer("0.9.0", "1.0.0"));
  }
}
