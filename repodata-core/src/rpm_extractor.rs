// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! C3: RPM header -> `PackageFact` extraction (spec §4.3).

use crate::checksum::digest_file;
use repodata_domain::entities::package_fact::{
    Descriptive, DependencySets, HeaderRange, Identity, PackageFact, Provenance, Sizes, Timestamps,
};
use repodata_domain::error::{RepoError, RepoResult};
use repodata_domain::services::rpm_fact_extractor::{ExtractionRequest, RpmFactExtractor};
use repodata_domain::value_objects::changelog_entry::ChangelogEntry;
use repodata_domain::value_objects::checksum_algorithm::{Checksum, ChecksumAlgorithm};
use repodata_domain::value_objects::dependency::{Dependency, DependencyFlag};
use repodata_domain::value_objects::file_entry::{FileEntry, FileType};
use repodata_domain::value_objects::location::Location;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

const LEAD_SIZE: u64 = 96;
const HEADER_MAGIC: [u8; 3] = [0x8E, 0xAD, 0xE8];

/// Reads one rpm header block's `(index_count, data_size)` starting at
/// `offset`, per the on-disk layout shared by the signature and main
/// header: 3-byte magic, 1-byte version, 4 reserved bytes, then
/// big-endian `u32` index-entry count and `u32` data-section size.
fn read_header_block(file: &mut File, offset: u64) -> RepoResult<(u64, u32, u32)> {
    file.seek(SeekFrom::Start(offset))
        .map_err(|e| RepoError::io("<rpm>", e))?;
    let mut buf = [0u8; 16];
    file.read_exact(&mut buf).map_err(|e| RepoError::io("<rpm>", e))?;
    if buf[0..3] != HEADER_MAGIC {
        return Err(RepoError::malformed_rpm("<rpm>", "bad header magic"));
    }
    let nindex = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]);
    let hsize = u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]);
    Ok((offset, nindex, hsize))
}

/// Byte range `[start, end)` bounding the main (signed) header, per spec
/// §4.3: "opens the RPM, reads the lead+signature to locate the header byte
/// range". Independent of whatever the `rpm` crate exposes internally, since
/// this is a wire-format fact the manifest's checksum/size math depends on.
fn locate_header_range(path: &Path) -> RepoResult<HeaderRange> {
    let mut file = File::open(path).map_err(|e| RepoError::io(path, e))?;
    let (sig_offset, sig_nindex, sig_hsize) = read_header_block(&mut file, LEAD_SIZE)
        .map_err(|_| RepoError::malformed_rpm(path, "unreadable signature header"))?;
    let sig_data_start = sig_offset + 16 + (sig_nindex as u64) * 16;
    let sig_end = sig_data_start + sig_hsize as u64;
    // Signature block is padded to an 8-byte boundary before the main header.
    let header_start = sig_end.div_ceil(8) * 8;
    let (_, hdr_nindex, hdr_hsize) = read_header_block(&mut file, header_start)
        .map_err(|_| RepoError::malformed_rpm(path, "unreadable main header"))?;
    let header_data_start = header_start + 16 + (hdr_nindex as u64) * 16;
    let header_end = header_data_start + hdr_hsize as u64;
    if header_start >= header_end {
        return Err(RepoError::malformed_rpm(path, "empty header range"));
    }
    Ok(HeaderRange::new(header_start, header_end))
}

fn flag_to_dependency_parts(flags: u32) -> (Option<DependencyFlag>, bool) {
    const RPMSENSE_LESS: u32 = 1 << 1;
    const RPMSENSE_GREATER: u32 = 1 << 2;
    const RPMSENSE_EQUAL: u32 = 1 << 3;
    const RPMSENSE_PREREQ: u32 = 1 << 6;
    let lt = flags & RPMSENSE_LESS != 0;
    let gt = flags & RPMSENSE_GREATER != 0;
    let eq = flags & RPMSENSE_EQUAL != 0;
    let pre = flags & RPMSENSE_PREREQ != 0;
    let flag = match (lt, gt, eq) {
        (true, false, true) => Some(DependencyFlag::Le),
        (false, true, true) => Some(DependencyFlag::Ge),
        (true, false, false) => Some(DependencyFlag::Lt),
        (false, true, false) => Some(DependencyFlag::Gt),
        (false, false, true) => Some(DependencyFlag::Eq),
        _ => None,
    };
    (flag, pre)
}

fn to_domain_file_type(is_dir: bool, is_ghost: bool) -> FileType {
    if is_dir {
        FileType::Dir
    } else if is_ghost {
        FileType::Ghost
    } else {
        FileType::Regular
    }
}

fn split_path(full: &str) -> (String, String) {
    match full.rfind('/') {
        Some(idx) => (full[..=idx].to_string(), full[idx + 1..].to_string()),
        None => (String::new(), full.to_string()),
    }
}

/// Default implementation backed by the `rpm` crate for tag decoding, and a
/// hand-rolled lead/signature scan (above) for the header byte range.
pub struct RpmExtractor;

impl RpmFactExtractor for RpmExtractor {
    fn extract(&self, request: ExtractionRequest<'_>) -> RepoResult<PackageFact> {
        let path = request.rpm_path;
        let header_range = locate_header_range(path)?;

        let pkg = rpm::Package::open(path)
            .map_err(|e| RepoError::malformed_rpm(path, e.to_string()))?;
        let md = &pkg.metadata;

        let name = md.get_name().map_err(|e| RepoError::malformed_rpm(path, e.to_string()))?.to_string();
        let version = md.get_version().map_err(|e| RepoError::malformed_rpm(path, e.to_string()))?.to_string();
        let release = md.get_release().map_err(|e| RepoError::malformed_rpm(path, e.to_string()))?.to_string();
        let arch = md.get_arch().map_err(|e| RepoError::malformed_rpm(path, e.to_string()))?.to_string();
        let epoch = md.get_epoch().ok().map(|e| e.to_string());

        let file_meta = std::fs::metadata(path).map_err(|e| RepoError::io(path, e))?;
        let package_checksum = digest_file(path, request.checksum_algorithm)?;

        let dependencies = DependencySets {
            requires: map_dependencies(md.get_requires().unwrap_or_default(), true),
            provides: map_dependencies(md.get_provides().unwrap_or_default(), false),
            conflicts: map_dependencies(md.get_conflicts().unwrap_or_default(), false),
            obsoletes: map_dependencies(md.get_obsoletes().unwrap_or_default(), false),
        };

        let files = md
            .get_file_entries()
            .unwrap_or_default()
            .into_iter()
            .map(|fe| {
                let (dir, basename) = split_path(&fe.path.to_string_lossy());
                FileEntry::new(to_domain_file_type(fe.is_dir(), fe.is_ghost_file()), dir, basename)
            })
            .collect();

        let mut changelogs: Vec<ChangelogEntry> = md
            .get_changelog_entries()
            .unwrap_or_default()
            .into_iter()
            .map(|c| ChangelogEntry::new(c.name, c.timestamp as i64, c.description))
            .collect();
        changelogs.sort_by(|a, b| b.date.cmp(&a.date));
        changelogs.truncate(request.changelog_limit);

        Ok(PackageFact {
            identity: Identity {
                pkg_id: package_checksum.clone(),
                name,
                arch,
                epoch,
                version,
                release,
            },
            location: match &request.location_base {
                Some(base) => Location::with_base(request.location_href.clone(), base.clone()),
                None => Location::new(request.location_href.clone()),
            },
            descriptive: Descriptive {
                summary: md.get_summary().unwrap_or_default().to_string(),
                description: md.get_description().unwrap_or_default().to_string(),
                url: md.get_url().unwrap_or_default().to_string(),
                license: md.get_license().unwrap_or_default().to_string(),
                vendor: md.get_vendor().unwrap_or_default().to_string(),
                group: md.get_group().unwrap_or_default().to_string(),
                build_host: md.get_build_host().unwrap_or_default().to_string(),
                packager: md.get_packager().unwrap_or_default().to_string(),
                source_rpm: md.get_source_rpm().unwrap_or_default().to_string(),
            },
            sizes: Sizes {
                package: file_meta.len(),
                installed: md.get_installed_size().unwrap_or(0),
                archive: md.get_archive_size().unwrap_or(0),
            },
            timestamps: Timestamps {
                file_mtime: file_meta
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                    .map(|d| d.as_secs() as i64)
                    .unwrap_or(0),
                build_time: md.get_build_time().unwrap_or(0) as i64,
            },
            header_range,
            checksum_type: Checksum::new(request.checksum_algorithm, request.legacy_sha_alias, package_checksum)
                .wire_type()
                .to_string(),
            dependencies,
            files,
            changelogs,
            provenance: Provenance::Fresh,
        })
    }
}

fn map_dependencies(deps: Vec<rpm::Dependency>, is_requires: bool) -> Vec<Dependency> {
    deps.into_iter()
        .map(|d| {
            let (flag, pre_bit) = flag_to_dependency_parts(d.flags.bits());
            Dependency {
                name: d.name,
                flag,
                epoch: d.evr.as_ref().and_then(|evr| evr.epoch.clone()),
                version: d.evr.as_ref().map(|evr| evr.version.clone()),
                release: d.evr.as_ref().and_then(|evr| evr.release.clone()),
                pre: is_requires && pre_bit,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_to_expected_operators() {
        assert_eq!(flag_to_dependency_parts(1 << 3).0, Some(DependencyFlag::Eq));
        assert_eq!(flag_to_dependency_parts((1 << 1) | (1 << 3)).0, Some(DependencyFlag::Le));
        assert_eq!(flag_to_dependency_parts((1 << 2) | (1 << 3)).0, Some(DependencyFlag::Ge));
        assert_eq!(flag_to_dependency_parts(1 << 1).0, Some(DependencyFlag::Lt));
        assert_eq!(flag_to_dependency_parts(1 << 2).0, Some(DependencyFlag::Gt));
    }

    #[test]
    fn prereq_bit_is_independent_of_comparison_flags() {
        let (_, pre) = flag_to_dependency_parts((1 << 3) | (1 << 6));
        assert!(pre);
    }

    #[test]
    fn split_path_separates_dir_and_basename() {
        assert_eq!(split_path("/etc/foo.conf"), ("/etc/".to_string(), "foo.conf".to_string()));
        assert_eq!(split_path("toplevel"), ("".to_string(), "toplevel".to_string()));
    }
}
