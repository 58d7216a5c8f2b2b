// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Package discovery: walks the input directory (or honors an explicit
//! whitelist) and produces sorted, id-stamped `Task`s (spec §4.6.1).

use repodata_domain::error::{RepoError, RepoResult};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Task {
    pub id: usize,
    pub full_path: PathBuf,
    pub basename: String,
    pub parent_dir: PathBuf,
}

pub struct DiscoveryRequest<'a> {
    pub input_dir: &'a Path,
    pub includepkg: &'a [PathBuf],
    pub pkglist: Option<&'a Path>,
    pub excludes: &'a [String],
    pub skip_symlinks: bool,
}

fn make_task(full_path: PathBuf) -> RepoResult<(String, PathBuf, PathBuf)> {
    let basename = full_path
        .file_name()
        .ok_or_else(|| RepoError::BadArgument { arg: "package path".into(), reason: "no file name".into() })?
        .to_string_lossy()
        .into_owned();
    let parent_dir = full_path.parent().unwrap_or(Path::new("")).to_path_buf();
    Ok((basename, parent_dir, full_path))
}

fn is_excluded(basename: &str, excludes: &[String]) -> bool {
    excludes.iter().any(|pattern| {
        glob::Pattern::new(pattern).map(|p| p.matches(basename)).unwrap_or(false)
    })
}

/// Resolves the explicit set named by `--includepkg`/`--pkglist` against
/// `input_dir`, bypassing the directory walk entirely (spec §4.6.1: "If an
/// explicit package-list file or `--includepkg` arguments are supplied, the
/// pipeline processes exactly that set").
fn explicit_set(req: &DiscoveryRequest<'_>) -> RepoResult<Option<Vec<PathBuf>>> {
    let mut paths = req.includepkg.to_vec();
    if let Some(list_file) = req.pkglist {
        let content = std::fs::read_to_string(list_file).map_err(|e| RepoError::io(list_file, e))?;
        for line in content.lines() {
            let line = line.trim();
            if !line.is_empty() {
                paths.push(PathBuf::from(line));
            }
        }
    }
    if paths.is_empty() {
        return Ok(None);
    }
    let resolved = paths
        .into_iter()
        .map(|p| if p.is_absolute() { p } else { req.input_dir.join(p) })
        .collect();
    Ok(Some(resolved))
}

/// Walks `input_dir` (or honors the explicit set), filters, sorts by
/// `(basename, parent_dir)`, and stamps monotonically increasing `id`s equal
/// to each package's position in all three output streams (spec §4.6.1).
pub fn discover(req: DiscoveryRequest<'_>) -> RepoResult<Vec<Task>> {
    let mut candidates: Vec<(String, PathBuf, PathBuf)> = Vec::new();

    if let Some(explicit) = explicit_set(&req)? {
        for full_path in explicit {
            candidates.push(make_task(full_path)?);
        }
    } else {
        for entry in walkdir::WalkDir::new(req.input_dir).follow_links(!req.skip_symlinks) {
            let entry = entry.map_err(|e| {
                RepoError::io(req.input_dir, std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
            })?;
            if req.skip_symlinks && entry.path_is_symlink() {
                continue;
            }
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("rpm") {
                continue;
            }
            candidates.push(make_task(path.to_path_buf())?);
        }
    }

    candidates.retain(|(basename, _, _)| !is_excluded(basename, req.excludes));
    candidates.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));

    Ok(candidates
        .into_iter()
        .enumerate()
        .map(|(id, (basename, parent_dir, full_path))| Task { id, full_path, basename, parent_dir })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclude_glob_matches_basename() {
        assert!(is_excluded("debug-foo-1.rpm", &["debug-*".to_string()]));
        assert!(!is_excluded("foo-1.rpm", &["debug-*".to_string()]));
    }
}
