// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! C8: `repomd.xml` manifest builder (spec §4.7).
//!
//! Runs after all three sinks are finalized: reads each produced file back
//! once to get both checksums in a single decompression pass, optionally
//! renames files to their content-addressed form ("unique filenames"), and
//! renders the final `repomd.xml` document.

use crate::checksum::digest_file;
use crate::compression;
use crate::xml;
use repodata_domain::entities::manifest_record::{ManifestRecord, RecordType};
use repodata_domain::error::{RepoError, RepoResult};
use repodata_domain::services::compressed_stream::ReadCodec;
use repodata_domain::value_objects::checksum_algorithm::{Checksum, ChecksumAlgorithm};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

fn file_mtime(path: &Path) -> RepoResult<i64> {
    let meta = std::fs::metadata(path).map_err(|e| RepoError::io(path, e))?;
    Ok(meta.modified().ok().and_then(|t| t.duration_since(UNIX_EPOCH).ok()).map(|d| d.as_secs() as i64).unwrap_or(0))
}

/// Builds one `ManifestRecord` for a file already written to `staging_dir`
/// (spec §4.7 step 2): compressed checksum/size from the bytes on disk, open
/// checksum/size from decompressing once with the content-stat hook tapped
/// in (spec §4.2).
pub fn build_record(
    staging_dir: &Path,
    href: &str,
    record_type: RecordType,
    base: Option<String>,
    checksum_algorithm: ChecksumAlgorithm,
    legacy_sha_alias: bool,
    database_version: Option<u32>,
) -> RepoResult<ManifestRecord> {
    let path = staging_dir.join(href);
    let compressed_size = std::fs::metadata(&path).map_err(|e| RepoError::io(&path, e))?.len();
    let mtime = file_mtime(&path)?;
    let compressed_hex = digest_file(&path, checksum_algorithm)?;

    let mut reader = compression::open_read(&path, ReadCodec::AutoDetect, Some(checksum_algorithm))?;
    let mut sink = std::io::sink();
    std::io::copy(&mut reader, &mut sink).map_err(|e| RepoError::io(&path, e))?;
    let stat = reader.into_stat().ok_or_else(|| RepoError::assertion("content-stat hook produced no result"))?;

    Ok(ManifestRecord {
        record_type,
        href: href.to_string(),
        base,
        compressed_size,
        open_size: stat.open_size,
        mtime,
        checksum: Checksum::new(checksum_algorithm, legacy_sha_alias, compressed_hex),
        open_checksum: Checksum::new(checksum_algorithm, legacy_sha_alias, stat.open_checksum_hex),
        database_version,
    })
}

/// "Unique filenames" publication step (spec §3, §4.7 step 3): renames each
/// record's file to `<checksum>-<original>`, removing any pre-existing
/// target first, and rewrites the record's `href` to match.
pub fn apply_unique_filenames(staging_dir: &Path, records: &mut [ManifestRecord]) -> RepoResult<()> {
    for record in records.iter_mut() {
        let old_path = staging_dir.join(&record.href);
        record.apply_unique_filename();
        let new_path = staging_dir.join(&record.href);
        if new_path.exists() {
            std::fs::remove_file(&new_path).map_err(|e| RepoError::io(&new_path, e))?;
        }
        std::fs::rename(&old_path, &new_path).map_err(|e| RepoError::io(&new_path, e))?;
    }
    Ok(())
}

/// Renders and writes `repomd.xml` into `staging_dir` (spec §4.7 step 4).
/// `revision` is unix seconds; pinning it (rather than always using "now")
/// is what makes the determinism property (spec §8 invariant 3) testable.
pub fn write_repomd(
    staging_dir: &Path,
    records: &[ManifestRecord],
    revision: i64,
    user_revision: Option<&str>,
) -> RepoResult<PathBuf> {
    let body = xml::repomd::render(records, revision, user_revision)?;
    let path = staging_dir.join("repomd.xml");
    std::fs::write(&path, body).map_err(|e| RepoError::io(&path, e))?;
    Ok(path)
}

/// Parses an existing `repomd.xml`'s `<data>` records, enough for retention
/// policy decisions (spec §4.8, §8 invariant 7) without the full C6 loader.
pub fn read_existing_records(repomd_path: &Path) -> RepoResult<Vec<(String, String)>> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut content = String::new();
    std::fs::File::open(repomd_path)
        .map_err(|e| RepoError::io(repomd_path, e))?
        .read_to_string(&mut content)
        .map_err(|e| RepoError::io(repomd_path, e))?;

    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut out = Vec::new();
    let mut current_type: Option<String> = None;
    loop {
        match reader.read_event_into(&mut buf).map_err(xml::map_xml_err)? {
            Event::Start(e) if e.name().as_ref() == b"data" => {
                current_type = e
                    .attributes()
                    .flatten()
                    .find(|a| a.key.as_ref() == b"type")
                    .and_then(|a| a.unescape_value().ok())
                    .map(|v| v.into_owned());
            }
            Event::Empty(e) if e.name().as_ref() == b"location" => {
                if let Some(ty) = current_type.clone() {
                    if let Some(href) = e
                        .attributes()
                        .flatten()
                        .find(|a| a.key.as_ref() == b"href")
                        .and_then(|a| a.unescape_value().ok())
                        .map(|v| v.into_owned())
                    {
                        out.push((ty, href));
                    }
                }
            }
            Event::End(e) if e.name().as_ref() == b"data" => current_type = None,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn build_record_round_trips_plain_xml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("primary.xml");
        std::fs::File::create(&path).unwrap().write_all(b"<metadata/>").unwrap();

        let record = build_record(
            dir.path(),
            "primary.xml",
            RecordType::Primary,
            None,
            ChecksumAlgorithm::Sha256,
            false,
            None,
        )
        .unwrap();

        assert_eq!(record.open_size, 11);
        assert_eq!(record.checksum.hex_digest, record.open_checksum.hex_digest);
    }

    #[test]
    fn read_existing_records_extracts_type_and_href() {
        let dir = tempfile::tempdir().unwrap();
        let repomd = dir.path().join("repomd.xml");
        std::fs::write(
            &repomd,
            r#"<?xml version="1.0"?><repomd><data type="primary"><location href="primary.xml.gz"/></data></repomd>"#,
        )
        .unwrap();
        let records = read_existing_records(&repomd).unwrap();
        assert_eq!(records, vec![("primary".to_string(), "primary.xml.gz".to_string())]);
    }
}
