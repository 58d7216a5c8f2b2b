// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end coverage of `build::run_merged` against synthetic facts: no
//! real RPMs or extraction, just the write/manifest/publish tail mergerepo-rs
//! drives after `merger::merge` has already produced a fact list (spec
//! §4.6.5, §4.8).

use repodata_core::build::run_merged;
use repodata_core::pipeline::config::MergeBuildConfig;
use repodata_domain::entities::package_fact::{
    Descriptive, DependencySets, HeaderRange, Identity, PackageFact, Provenance, Sizes, Timestamps,
};
use repodata_domain::value_objects::checksum_algorithm::ChecksumAlgorithm;
use repodata_domain::value_objects::compression::CompressionType;
use repodata_domain::value_objects::location::Location;

fn synthetic_fact(name: &str) -> PackageFact {
    PackageFact {
        identity: Identity {
            pkg_id: format!("{name}-pkgid"),
            name: name.to_string(),
            arch: "x86_64".into(),
            epoch: None,
            version: "1.0".into(),
            release: "1".into(),
        },
        location: Location::new(format!("{name}-1.0-1.x86_64.rpm")),
        descriptive: Descriptive::default(),
        sizes: Sizes::default(),
        timestamps: Timestamps::default(),
        header_range: HeaderRange::new(0, 1),
        checksum_type: "sha256".into(),
        dependencies: DependencySets::default(),
        files: Vec::new(),
        changelogs: Vec::new(),
        provenance: Provenance::Fresh,
    }
}

#[test]
fn publishes_repomd_and_family_files_for_a_merged_fact_stream() {
    let out = tempfile::tempdir().unwrap();
    let facts = vec![synthetic_fact("alpha"), synthetic_fact("beta")];
    let cfg = MergeBuildConfig {
        output_dir: out.path().to_path_buf(),
        base_url: None,
        checksum_algorithm: ChecksumAlgorithm::Sha256,
        legacy_sha_alias: false,
        compress_type: CompressionType::Gzip,
        database: false,
        unique_md_filenames: false,
        retain_old: None,
    };

    let published = run_merged(facts, &cfg).expect("publish should succeed");
    assert_eq!(published, out.path().join("repodata"));

    let repomd = std::fs::read_to_string(published.join("repomd.xml")).unwrap();
    assert!(repomd.contains("type=\"primary\""));
    assert!(repomd.contains("type=\"filelists\""));
    assert!(repomd.contains("type=\"other\""));
    assert!(published.join("primary.xml.gz").is_file());
    assert!(published.join("filelists.xml.gz").is_file());
    assert!(published.join("other.xml.gz").is_file());

    // The staging directory never survives a successful publish: it's
    // renamed over the published one (spec §4.8's single `rename()`).
    assert!(!out.path().join(".repodata").exists());
}

#[test]
fn run_merged_with_no_packages_still_produces_valid_empty_streams() {
    let out = tempfile::tempdir().unwrap();
    let cfg = MergeBuildConfig {
        output_dir: out.path().to_path_buf(),
        base_url: None,
        checksum_algorithm: ChecksumAlgorithm::Sha256,
        legacy_sha_alias: false,
        compress_type: CompressionType::None,
        database: false,
        unique_md_filenames: false,
        retain_old: None,
    };

    let published = run_merged(Vec::new(), &cfg).expect("publish should succeed with zero packages");
    let primary = std::fs::read_to_string(published.join("primary.xml")).unwrap();
    assert!(primary.contains("packages=\"0\""));
}
