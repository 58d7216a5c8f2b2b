// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Scenario S1 (spec §8): an empty input directory still produces a
//! complete, well-formed `repodata/` with three zero-package records.

use repodata_core::build::run;
use repodata_core::pipeline::config::BuildConfig;
use repodata_domain::value_objects::checksum_algorithm::ChecksumAlgorithm;
use repodata_domain::value_objects::compression::CompressionType;
use repodata_domain::value_objects::worker_count::WorkerCount;

fn empty_config(input_dir: std::path::PathBuf, output_dir: std::path::PathBuf) -> BuildConfig {
    BuildConfig {
        input_dir,
        output_dir,
        base_url: None,
        excludes: Vec::new(),
        includepkg: Vec::new(),
        pkglist: None,
        groupfile: None,
        update: false,
        update_md_path: None,
        skip_stat: false,
        checksum_algorithm: ChecksumAlgorithm::Sha256,
        legacy_sha_alias: false,
        changelog_limit: 10,
        workers: WorkerCount::clamped(2),
        unique_md_filenames: false,
        compress_type: CompressionType::None,
        database: false,
        skip_symlinks: false,
        retain_old: None,
    }
}

#[test]
fn empty_directory_produces_zero_package_metadata() {
    let input = tempfile::tempdir().unwrap();
    let cfg = empty_config(input.path().to_path_buf(), input.path().to_path_buf());

    let published = run(&cfg).expect("build should succeed against an empty directory");

    let primary = std::fs::read_to_string(published.join("primary.xml")).unwrap();
    assert_eq!(
        primary,
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
<metadata xmlns=\"http://linux.duke.edu/metadata/common\" xmlns:rpm=\"http://linux.duke.edu/metadata/rpm\" packages=\"0\">\n\
</metadata>\n"
    );

    let repomd = std::fs::read_to_string(published.join("repomd.xml")).unwrap();
    assert_eq!(repomd.matches("<data type=").count(), 3);
}
