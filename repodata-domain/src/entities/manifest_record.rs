// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Per-output-file record that ends up in `repomd.xml` (spec §3 "Manifest
//! record").

use crate::value_objects::checksum_algorithm::Checksum;

/// Which XML/database stream a `ManifestRecord` describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    Primary,
    Filelists,
    Other,
    PrimaryDb,
    FilelistsDb,
    OtherDb,
    Group,
    GroupGz,
    Updateinfo,
}

impl RecordType {
    /// `<data type="...">` attribute value (spec §6 repomd.xml).
    pub fn wire_type(&self) -> &'static str {
        match self {
            RecordType::Primary => "primary",
            RecordType::Filelists => "filelists",
            RecordType::Other => "other",
            RecordType::PrimaryDb => "primary_db",
            RecordType::FilelistsDb => "filelists_db",
            RecordType::OtherDb => "other_db",
            RecordType::Group => "group",
            RecordType::GroupGz => "group_gz",
            RecordType::Updateinfo => "updateinfo",
        }
    }

    /// Whether this record type carries a `database_version` element
    /// (spec §3: "database-schema version (databases only)").
    pub fn is_database(&self) -> bool {
        matches!(self, RecordType::PrimaryDb | RecordType::FilelistsDb | RecordType::OtherDb)
    }
}

/// One `<data>` entry in `repomd.xml`. Both checksums are computed from the
/// bytes actually written, never assumed (spec §3 Invariants).
#[derive(Debug, Clone)]
pub struct ManifestRecord {
    pub record_type: RecordType,
    pub href: String,
    pub base: Option<String>,
    pub compressed_size: u64,
    pub open_size: u64,
    pub mtime: i64,
    pub checksum: Checksum,
    pub open_checksum: Checksum,
    pub database_version: Option<u32>,
}

impl ManifestRecord {
    /// Rewrites `href` to carry the checksum as a filename prefix, the
    /// "unique filenames" publication step (spec §3: "href is rewritten
    /// after publication to include the checksum as filename prefix when
    /// unique filenames mode is on").
    pub fn apply_unique_filename(&mut self) {
        let basename = self
            .href
            .rsplit('/')
            .next()
            .unwrap_or(&self.href)
            .to_string();
        let dir = self.href.strip_suffix(&basename).unwrap_or("").to_string();
        self.href = format!("{dir}{}-{basename}", self.checksum.hex_digest);
    }
}
