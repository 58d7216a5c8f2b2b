// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Prior-repodata loader for incremental reuse (spec §4.5, C6).

use crate::entities::package_fact::PackageFact;
use crate::error::RepoResult;
use std::collections::HashSet;
use std::path::Path;

/// Which field a cached `PackageFact` is keyed by when looked up (spec §4.5:
/// "a map keyed by one of: content hash, basename, or name").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKey {
    PkgId,
    Basename,
    Name,
}

/// A per-package allowlist bounding how much of a prior repo is retained in
/// memory (spec §4.5: packages outside it are parsed but dropped on close of
/// `</package>`).
pub type Allowlist = HashSet<String>;

pub trait OldMetadataLoader {
    /// Loads `repomd.xml` at `repo_dir` and streams its primary/filelists/
    /// other XML back into a keyed map of cached facts.
    fn load(
        &self,
        repo_dir: &Path,
        key: CacheKey,
        allowlist: Option<&Allowlist>,
    ) -> RepoResult<OldMetadataMap>;

    /// Merges records from `other_repo_dir` into `into`; on key collision the
    /// first occurrence (already present in `into`) wins (spec §4.5).
    fn merge_from(
        &self,
        into: &mut OldMetadataMap,
        other_repo_dir: &Path,
        key: CacheKey,
        allowlist: Option<&Allowlist>,
    ) -> RepoResult<()>;
}

#[derive(Debug, Default)]
pub struct OldMetadataMap {
    entries: std::collections::HashMap<String, PackageFact>,
}

impl OldMetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&PackageFact> {
        self.entries.get(key)
    }

    /// Inserts only if `key` is absent, preserving "first occurrence wins"
    /// merge semantics (spec §4.5).
    pub fn insert_if_absent(&mut self, key: String, fact: PackageFact) {
        self.entries.entry(key).or_insert(fact);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drains every cached fact regardless of key, for callers (the merger)
    /// that need the whole set rather than a single lookup.
    pub fn into_facts(self) -> impl Iterator<Item = PackageFact> {
        self.entries.into_values()
    }
}
