// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! C9: atomic publication and retention policy (spec §4.8).
//!
//! A build writes into `<out>/.repodata/`. On success, artifacts worth
//! keeping from the previous `<out>/repodata/` are copied forward into the
//! staging directory, the old directory is removed, and `.repodata/` is
//! renamed over it — the single `rename()` that is the actual publication
//! point (spec §4.8, §5 "Cancellation").

use crate::manifest;
use repodata_domain::error::{RepoError, RepoResult};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const STAGING_DIR_NAME: &str = ".repodata";
pub const PUBLISHED_DIR_NAME: &str = "repodata";

/// Retention rule applied to the previous `repodata/` directory before it is
/// replaced (spec §4.8, §6 `--retain-old`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Every file the *old* repomd.xml listed is dropped; only files it
    /// doesn't know about (e.g. hand-placed extras) are copied forward.
    Default,
    /// Drop any file whose mtime is older than `seconds` ago.
    ByAge { seconds: u64 },
    /// Per metadata family (primary/filelists/other), keep only the `keep`
    /// most-recently-modified generations; delete the rest from the old
    /// directory outright (spec §4.8: "classic-compatibility").
    Classic { keep: u32 },
}

fn file_age_secs(path: &Path, now: SystemTime) -> Option<u64> {
    let mtime = std::fs::metadata(path).ok()?.modified().ok()?;
    now.duration_since(mtime).ok().map(|d| d.as_secs())
}

/// Which metadata family a filename in `repodata/` belongs to, for the
/// classic retention grouping. Anything not matching one of the three
/// families (group files, updateinfo) is not subject to classic culling.
fn family_of(filename: &str) -> Option<&'static str> {
    if filename.contains("primary") {
        Some("primary")
    } else if filename.contains("filelists") {
        Some("filelists")
    } else if filename.contains("other") {
        Some("other")
    } else {
        None
    }
}

/// Applies the classic policy directly to `old_dir`: for each family, sort
/// descending by mtime and delete every entry past the top `keep` (spec
/// §4.8 item 1, classic-compatibility). Returns the set of paths it deleted,
/// so the caller doesn't try to copy them forward too.
fn apply_classic(old_dir: &Path, keep: u32) -> RepoResult<HashSet<PathBuf>> {
    let mut by_family: std::collections::HashMap<&'static str, Vec<(PathBuf, SystemTime)>> =
        std::collections::HashMap::new();

    for entry in std::fs::read_dir(old_dir).map_err(|e| RepoError::io(old_dir, e))? {
        let entry = entry.map_err(|e| RepoError::io(old_dir, e))?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        let Some(family) = family_of(name) else { continue };
        let mtime = entry.metadata().ok().and_then(|m| m.modified().ok()).unwrap_or(UNIX_EPOCH);
        by_family.entry(family).or_default().push((path, mtime));
    }

    let mut deleted = HashSet::new();
    for files in by_family.values_mut() {
        files.sort_by(|a, b| b.1.cmp(&a.1));
        for (path, _) in files.iter().skip(keep as usize) {
            std::fs::remove_file(path).map_err(|e| RepoError::io(path, e))?;
            deleted.insert(path.clone());
        }
    }
    Ok(deleted)
}

/// Computes the set of paths under `old_dir` to exclude from copy-forward
/// (spec §4.8 item 1). Classic policy also performs its deletions as a side
/// effect, matching the spec's phrasing ("sort ... and exclude (delete)").
fn excluded_paths(
    old_dir: &Path,
    old_records: &[(String, String)],
    policy: RetentionPolicy,
) -> RepoResult<HashSet<PathBuf>> {
    match policy {
        RetentionPolicy::Default => {
            Ok(old_records.iter().map(|(_, href)| old_dir.join(href)).collect())
        }
        RetentionPolicy::ByAge { seconds } => {
            let now = SystemTime::now();
            let mut excluded = HashSet::new();
            if old_dir.is_dir() {
                for entry in std::fs::read_dir(old_dir).map_err(|e| RepoError::io(old_dir, e))? {
                    let entry = entry.map_err(|e| RepoError::io(old_dir, e))?;
                    let path = entry.path();
                    if file_age_secs(&path, now).is_some_and(|age| age > seconds) {
                        excluded.insert(path);
                    }
                }
            }
            Ok(excluded)
        }
        RetentionPolicy::Classic { keep } => apply_classic(old_dir, keep),
    }
}

/// Copies every file remaining in `old_dir` (after retention exclusions)
/// into `staging_dir`, skipping any destination that already exists (spec
/// §4.8 item 2).
fn copy_forward(old_dir: &Path, staging_dir: &Path, excluded: &HashSet<PathBuf>) -> RepoResult<()> {
    if !old_dir.is_dir() {
        return Ok(());
    }
    for entry in std::fs::read_dir(old_dir).map_err(|e| RepoError::io(old_dir, e))? {
        let entry = entry.map_err(|e| RepoError::io(old_dir, e))?;
        let path = entry.path();
        if !path.is_file() || excluded.contains(&path) {
            continue;
        }
        let Some(name) = path.file_name() else { continue };
        let dest = staging_dir.join(name);
        if dest.exists() {
            continue;
        }
        std::fs::copy(&path, &dest).map_err(|e| RepoError::io(&dest, e))?;
    }
    Ok(())
}

/// Runs the full §4.8 sequence: retention against the existing
/// `<out_dir>/repodata/` (if any), copy-forward of survivors into
/// `staging_dir`, removal of the old directory, then the publishing
/// `rename()`. `staging_dir` and the published directory must be siblings on
/// the same filesystem for the rename to be atomic.
pub fn publish(out_dir: &Path, staging_dir: &Path, policy: RetentionPolicy) -> RepoResult<PathBuf> {
    let published_dir = out_dir.join(PUBLISHED_DIR_NAME);

    if published_dir.is_dir() {
        let old_repomd = published_dir.join("repomd.xml");
        let old_records = if old_repomd.is_file() {
            manifest::read_existing_records(&old_repomd).unwrap_or_default()
        } else {
            Vec::new()
        };
        let excluded = excluded_paths(&published_dir, &old_records, policy)?;
        copy_forward(&published_dir, staging_dir, &excluded)?;
        std::fs::remove_dir_all(&published_dir).map_err(|e| RepoError::io(&published_dir, e))?;
    }

    std::fs::rename(staging_dir, &published_dir).map_err(|e| RepoError::io(&published_dir, e))?;
    Ok(published_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn touch(path: &Path, contents: &str) {
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn default_policy_excludes_exactly_the_old_repomd_records() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("repodata");
        std::fs::create_dir(&old).unwrap();
        touch(&old.join("primary.xml.gz"), "p");
        touch(&old.join("group.xml"), "g");
        let records = vec![("primary".to_string(), "primary.xml.gz".to_string())];
        let excluded = excluded_paths(&old, &records, RetentionPolicy::Default).unwrap();
        assert!(excluded.contains(&old.join("primary.xml.gz")));
        assert!(!excluded.contains(&old.join("group.xml")));
    }

    #[test]
    fn classic_policy_keeps_only_newest_per_family() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("repodata");
        std::fs::create_dir(&old).unwrap();
        touch(&old.join("aaa-primary.xml.gz"), "older");
        std::thread::sleep(Duration::from_millis(10));
        touch(&old.join("bbb-primary.xml.gz"), "newer");

        let deleted = apply_classic(&old, 1).unwrap();
        assert_eq!(deleted.len(), 1);
        assert!(deleted.contains(&old.join("aaa-primary.xml.gz")));
        assert!(old.join("bbb-primary.xml.gz").exists());
        assert!(!old.join("aaa-primary.xml.gz").exists());
    }

    #[test]
    fn publish_renames_staging_over_published_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path();
        let staging = out_dir.join(STAGING_DIR_NAME);
        std::fs::create_dir(&staging).unwrap();
        touch(&staging.join("repomd.xml"), "new");

        let published = publish(out_dir, &staging, RetentionPolicy::Default).unwrap();
        assert!(published.join("repomd.xml").exists());
        assert!(!staging.exists());
    }

    #[test]
    fn publish_copies_forward_unlisted_old_files() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path();
        let old = out_dir.join(PUBLISHED_DIR_NAME);
        std::fs::create_dir(&old).unwrap();
        touch(&old.join("repomd.xml"), r#"<repomd><data type="primary"><location href="primary.xml.gz"/></data></repomd>"#);
        touch(&old.join("primary.xml.gz"), "old-primary");
        touch(&old.join("group.xml"), "old-group");

        let staging = out_dir.join(STAGING_DIR_NAME);
        std::fs::create_dir(&staging).unwrap();
        touch(&staging.join("repomd.xml"), "new");
        touch(&staging.join("primary.xml.gz"), "new-primary");

        let published = publish(out_dir, &staging, RetentionPolicy::Default).unwrap();
        // primary.xml.gz was listed by the old repomd, so the new build's
        // own copy wins (copy-forward skips existing destinations, and the
        // old entry was excluded from copy-forward in the first place).
        assert_eq!(std::fs::read_to_string(published.join("primary.xml.gz")).unwrap(), "new-primary");
        // group.xml was not listed, so it survives.
        assert_eq!(std::fs::read_to_string(published.join("group.xml")).unwrap(), "old-group");
    }
}
