// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! RPM version comparison (spec §4.6.5: "version comparison uses the
//! ordinary RPM version algorithm — numeric fields compare numerically,
//! textual tails lexicographically; missing fields compare as 0/empty").
//!
//! Used by the merger's NVR admission policy to decide which of two
//! same-`(name, arch)` packages to keep.

use std::cmp::Ordering;

/// Splits `s` into alternating numeric/non-numeric runs, the unit the RPM
/// version algorithm compares segment-by-segment.
fn segments(s: &str) -> Vec<&str> {
    let bytes = s.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        if bytes[i].is_ascii_digit() {
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        } else if bytes[i].is_ascii_alphabetic() {
            while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                i += 1;
            }
        } else {
            // Separator run (anything not alphanumeric) is skipped entirely;
            // it never contributes a segment of its own.
            while i < bytes.len() && !bytes[i].is_ascii_alphanumeric() {
                i += 1;
            }
            continue;
        }
        out.push(&s[start..i]);
    }
    out
}

fn compare_segment(a: &str, b: &str) -> Ordering {
    let a_numeric = a.as_bytes().first().is_some_and(u8::is_ascii_digit);
    let b_numeric = b.as_bytes().first().is_some_and(u8::is_ascii_digit);
    match (a_numeric, b_numeric) {
        // A numeric segment always outranks an alphabetic one, regardless of
        // value (rpmvercmp's long-standing rule).
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => {
            let a_trimmed = a.trim_start_matches('0');
            let b_trimmed = b.trim_start_matches('0');
            a_trimmed.len().cmp(&b_trimmed.len()).then_with(|| a_trimmed.cmp(b_trimmed))
        }
        (false, false) => a.cmp(b),
    }
}

/// Compares two version-or-release strings using the RPM algorithm: walk
/// matching segments left to right, numeric beats alphabetic, numeric
/// segments compare by value (leading zeros stripped), alphabetic segments
/// compare lexicographically; whichever string runs out of segments first
/// is the lesser, unless the other side's next segment is empty too.
pub fn compare_version_strings(a: &str, b: &str) -> Ordering {
    let a_segs = segments(a);
    let b_segs = segments(b);
    for (sa, sb) in a_segs.iter().zip(b_segs.iter()) {
        let ord = compare_segment(sa, sb);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a_segs.len().cmp(&b_segs.len())
}

/// An EVR (epoch, version, release) triple with RPM's comparison semantics.
/// A missing epoch compares as `0`; a missing release compares as empty
/// (spec §4.6.5: "missing fields compare as 0/empty").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evr {
    pub epoch: String,
    pub version: String,
    pub release: String,
}

impl Evr {
    pub fn new(epoch: Option<&str>, version: &str, release: Option<&str>) -> Self {
        Self {
            epoch: epoch.unwrap_or("0").to_string(),
            version: version.to_string(),
            release: release.unwrap_or("").to_string(),
        }
    }
}

impl Ord for Evr {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_version_strings(&self.epoch, &other.epoch)
            .then_with(|| compare_version_strings(&self.version, &other.version))
            .then_with(|| compare_version_strings(&self.release, &other.release))
    }
}

impl PartialOrd for Evr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_segments_compare_by_value_not_length() {
        assert_eq!(compare_version_strings("10", "9"), Ordering::Greater);
        assert_eq!(compare_version_strings("010", "9"), Ordering::Greater);
    }

    #[test]
    fn alphabetic_tails_compare_lexicographically() {
        assert_eq!(compare_version_strings("1.0a", "1.0b"), Ordering::Less);
    }

    #[test]
    fn numeric_segment_outranks_alphabetic_segment() {
        assert_eq!(compare_version_strings("1.5", "1.a"), Ordering::Greater);
    }

    #[test]
    fn missing_release_compares_as_empty() {
        let a = Evr::new(None, "1.0", None);
        let b = Evr::new(None, "1.0", Some("1"));
        assert!(a < b);
    }

    #[test]
    fn missing_epoch_compares_as_zero() {
        let a = Evr::new(None, "1.0", Some("1"));
        let b = Evr::new(Some("0"), "1.0", Some("1"));
        assert_eq!(a.cmp(&b), Ordering::Equal);
    }

    #[test]
    fn nonzero_epoch_always_wins() {
        let a = Evr::new(Some("1"), "0.1", Some("1"));
        let b = Evr::new(Some("0"), "99.0", Some("99"));
        assert!(a > b);
    }
}
