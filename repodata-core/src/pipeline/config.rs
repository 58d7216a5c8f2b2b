// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Shared configuration for a build run (spec §4.6, §6 CLI flags).

use repodata_domain::value_objects::checksum_algorithm::ChecksumAlgorithm;
use repodata_domain::value_objects::compression::CompressionType;
use repodata_domain::value_objects::worker_count::WorkerCount;
use std::path::PathBuf;


#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub base_url: Option<String>,
    pub excludes: Vec<String>,
    pub includepkg: Vec<PathBuf>,
    pub pkglist: Option<PathBuf>,
    pub groupfile: Option<String>,
    pub update: bool,
    pub update_md_path: Option<PathBuf>,
    pub skip_stat: bool,
    pub checksum_algorithm: ChecksumAlgorithm,
    pub legacy_sha_alias: bool,
    pub changelog_limit: usize,
    pub workers: WorkerCount,
    pub unique_md_filenames: bool,
    pub compress_type: CompressionType,
    pub database: bool,
    pub skip_symlinks: bool,
    pub retain_old: Option<u32>,
}

impl BuildConfig {
    /// Clamp applied to `--changelog-limit` (spec §6: "Default 10, clamped to
    /// `[0, 100]`").
    pub fn clamp_changelog_limit(requested: usize) -> usize {
        requested.min(100)
    }
}

/// Configuration for publishing an already-merged fact stream (spec §4.6.5):
/// no input directory or worker pool, since the merger's facts are already
/// extracted and sorted by [`crate::merger::merge`].
#[derive(Debug, Clone)]
pub struct MergeBuildConfig {
    pub output_dir: PathBuf,
    pub base_url: Option<String>,
    pub checksum_algorithm: ChecksumAlgorithm,
    pub legacy_sha_alias: bool,
    pub compress_type: CompressionType,
    pub database: bool,
    pub unique_md_filenames: bool,
    pub retain_old: Option<u32>,
}
