// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Canonical per-package record that flows through the build pipeline
//! (spec §3 "Package Fact").

use crate::value_objects::changelog_entry::ChangelogEntry;
use crate::value_objects::dependency::Dependency;
use crate::value_objects::file_entry::FileEntry;
use crate::value_objects::location::Location;

/// Byte range `[start, end)` within the RPM file bounding the signed header
/// blob that primary/filelists/other checksums and sizes are computed over
/// (spec §3, §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderRange {
    pub start: u64,
    pub end: u64,
}

impl HeaderRange {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start < end, "header_start must be < header_end");
        Self { start, end }
    }
}

/// Content hash (pkgId) plus name/arch/evr identity quadruple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub pkg_id: String,
    pub name: String,
    pub arch: String,
    pub epoch: Option<String>,
    pub version: String,
    pub release: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Descriptive {
    pub summary: String,
    pub description: String,
    pub url: String,
    pub license: String,
    pub vendor: String,
    pub group: String,
    pub build_host: String,
    pub packager: String,
    pub source_rpm: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sizes {
    pub package: u64,
    pub installed: u64,
    pub archive: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timestamps {
    pub file_mtime: i64,
    pub build_time: i64,
}

#[derive(Debug, Clone, Default)]
pub struct DependencySets {
    pub requires: Vec<Dependency>,
    pub provides: Vec<Dependency>,
    pub conflicts: Vec<Dependency>,
    pub obsoletes: Vec<Dependency>,
}

/// Whether a `PackageFact` was freshly parsed by C3 or reused from the
/// old-metadata cache by C6 (spec §3 Lifecycles).
///
/// `Cached` facts are borrowed from the loader's arena for the run's
/// duration; the pipeline reads them but never frees them. `Fresh` facts are
/// owned by the worker that produced them until the writer consumes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Fresh,
    Cached,
}

#[derive(Debug, Clone)]
pub struct PackageFact {
    pub identity: Identity,
    pub location: Location,
    pub descriptive: Descriptive,
    pub sizes: Sizes,
    pub timestamps: Timestamps,
    pub header_range: HeaderRange,
    pub checksum_type: String,
    pub dependencies: DependencySets,
    pub files: Vec<FileEntry>,
    pub changelogs: Vec<ChangelogEntry>,
    pub provenance: Provenance,
}

impl PackageFact {
    /// Total ordering key for a build run (spec §3 Invariants: "lexicographic
    /// `(basename, dir)`, ties broken by hash").
    pub fn sort_key(&self) -> (&str, &str, &str) {
        (
            self.location.href.rsplit('/').next().unwrap_or(&self.location.href),
            &self.location.href,
            &self.identity.pkg_id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_key_breaks_ties_on_pkg_id() {
        let mk = |href: &str, id: &str| PackageFact {
            identity: Identity {
                pkg_id: id.to_string(),
                name: "n".into(),
                arch: "x86_64".into(),
                epoch: None,
                version: "1".into(),
                release: "1".into(),
            },
            location: Location::new(href.to_string()),
            descriptive: Descriptive::default(),
            sizes: Sizes::default(),
            timestamps: Timestamps::default(),
            header_range: HeaderRange::new(0, 1),
            checksum_type: "sha256".into(),
            dependencies: DependencySets::default(),
            files: vec![],
            changelogs: vec![],
            provenance: Provenance::Fresh,
        };
        let a = mk("pkgs/a-1.rpm", "aaa");
        let b = mk("pkgs/a-1.rpm", "bbb");
        assert!(a.sort_key() < b.sort_key());
    }
}
