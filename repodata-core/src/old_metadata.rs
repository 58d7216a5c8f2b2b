// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! C6: prior-repodata loader for incremental reuse (spec §4.5).
//!
//! Parses a prior `repomd.xml`, then streams the primary/filelists/other
//! XML it references back into `PackageFact`s, keyed by whichever field the
//! caller asked for. Event-driven so a per-package allowlist can drop
//! unwanted packages at `</package>` without holding the whole stream in
//! memory (spec §4.5).

use crate::compression;
use crate::xml::map_xml_err;
use quick_xml::events::Event;
use quick_xml::Reader;
use repodata_domain::entities::package_fact::{
    Descriptive, DependencySets, HeaderRange, Identity, PackageFact, Provenance, Sizes, Timestamps,
};
use repodata_domain::error::{RepoError, RepoResult};
use repodata_domain::services::compressed_stream::ReadCodec;
use repodata_domain::services::old_metadata::{Allowlist, CacheKey, OldMetadataLoader, OldMetadataMap};
use repodata_domain::value_objects::changelog_entry::ChangelogEntry;
use repodata_domain::value_objects::dependency::{Dependency, DependencyFlag};
use repodata_domain::value_objects::file_entry::{FileEntry, FileType};
use repodata_domain::value_objects::location::Location;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub struct XmlOldMetadataLoader;

fn attr_str(e: &quick_xml::events::BytesStart, name: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name.as_bytes())
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

/// Finds the repo-relative path for a `<data type="...">` record in a
/// previously-parsed `repomd.xml`.
fn locate_record_href(repomd_path: &Path, record_type: &str) -> RepoResult<Option<String>> {
    let content = std::fs::read_to_string(repomd_path).map_err(|e| RepoError::io(repomd_path, e))?;
    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_target = false;
    loop {
        match reader.read_event_into(&mut buf).map_err(map_xml_err)? {
            Event::Start(e) if e.name().as_ref() == b"data" => {
                in_target = attr_str(&e, "type").as_deref() == Some(record_type);
            }
            Event::Empty(e) if in_target && e.name().as_ref() == b"location" => {
                return Ok(attr_str(&e, "href"));
            }
            Event::End(e) if e.name().as_ref() == b"data" => in_target = false,
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

#[derive(Default)]
struct PartialPackage {
    pkg_id: Option<String>,
    name: Option<String>,
    arch: Option<String>,
    epoch: Option<String>,
    version: Option<String>,
    release: Option<String>,
    summary: String,
    description: String,
    url: String,
    packager: String,
    file_mtime: i64,
    build_time: i64,
    size_package: u64,
    size_installed: u64,
    size_archive: u64,
    href: Option<String>,
    base: Option<String>,
    license: String,
    vendor: String,
    group: String,
    build_host: String,
    source_rpm: String,
    header_start: u64,
    header_end: u64,
    checksum_type: String,
    files: Vec<FileEntry>,
    changelogs: Vec<ChangelogEntry>,
    requires: Vec<Dependency>,
    provides: Vec<Dependency>,
    conflicts: Vec<Dependency>,
    obsoletes: Vec<Dependency>,
    current_dep_list: Option<DepList>,
}

/// Which `<rpm:entry>` container primary.xml parsing is currently inside,
/// set on the container's `Start` and consumed by each `rpm:entry` within it.
#[derive(Clone, Copy)]
enum DepList {
    Requires,
    Provides,
    Conflicts,
    Obsoletes,
}

fn parse_dep_flag(s: &str) -> Option<DependencyFlag> {
    match s {
        "EQ" => Some(DependencyFlag::Eq),
        "LT" => Some(DependencyFlag::Lt),
        "LE" => Some(DependencyFlag::Le),
        "GT" => Some(DependencyFlag::Gt),
        "GE" => Some(DependencyFlag::Ge),
        _ => None,
    }
}

fn parse_dep_entry(el: &quick_xml::events::BytesStart) -> Dependency {
    Dependency {
        name: attr_str(el, "name").unwrap_or_default(),
        flag: attr_str(el, "flags").as_deref().and_then(parse_dep_flag),
        epoch: attr_str(el, "epoch"),
        version: attr_str(el, "ver"),
        release: attr_str(el, "rel"),
        pre: attr_str(el, "pre").as_deref() == Some("1"),
    }
}

fn cache_key_of(key: CacheKey, pkg: &PartialPackage) -> Option<String> {
    match key {
        CacheKey::PkgId => pkg.pkg_id.clone(),
        CacheKey::Basename => pkg.href.as_ref().and_then(|h| h.rsplit('/').next()).map(|s| s.to_string()),
        CacheKey::Name => pkg.name.clone(),
    }
}

fn finish_package(pkg: PartialPackage) -> Option<PackageFact> {
    Some(PackageFact {
        identity: Identity {
            pkg_id: pkg.pkg_id?,
            name: pkg.name?,
            arch: pkg.arch?,
            epoch: pkg.epoch,
            version: pkg.version?,
            release: pkg.release?,
        },
        location: match pkg.base {
            Some(base) => Location::with_base(pkg.href.unwrap_or_default(), base),
            None => Location::new(pkg.href.unwrap_or_default()),
        },
        descriptive: Descriptive {
            summary: pkg.summary,
            description: pkg.description,
            url: pkg.url,
            license: pkg.license,
            vendor: pkg.vendor,
            group: pkg.group,
            build_host: pkg.build_host,
            packager: pkg.packager,
            source_rpm: pkg.source_rpm,
        },
        sizes: Sizes { package: pkg.size_package, installed: pkg.size_installed, archive: pkg.size_archive },
        timestamps: Timestamps { file_mtime: pkg.file_mtime, build_time: pkg.build_time },
        header_range: if pkg.header_end > pkg.header_start {
            HeaderRange::new(pkg.header_start, pkg.header_end)
        } else {
            HeaderRange::new(0, 1)
        },
        checksum_type: pkg.checksum_type,
        dependencies: DependencySets {
            requires: pkg.requires,
            provides: pkg.provides,
            conflicts: pkg.conflicts,
            obsoletes: pkg.obsoletes,
        },
        files: pkg.files,
        changelogs: pkg.changelogs,
        provenance: Provenance::Cached,
    })
}

/// Streams one metadata XML file, merging parsed fields into `facts` keyed
/// by `key`. Packages outside `allowlist` are still parsed (to stay
/// event-driven and keep the reader state machine simple) but dropped at
/// `</package>`, bounding retained memory (spec §4.5).
fn stream_merge(
    path: &Path,
    key: CacheKey,
    allowlist: Option<&Allowlist>,
    facts: &mut HashMap<String, PartialPackage>,
    apply: impl Fn(&mut PartialPackage, &quick_xml::events::BytesStart, &[u8], &mut Reader<&[u8]>) -> RepoResult<()>,
) -> RepoResult<()> {
    let mut reader = compression::open_read(path, ReadCodec::AutoDetect, None)?;
    let mut content = String::new();
    std::io::Read::read_to_string(&mut reader, &mut content).map_err(|e| RepoError::io(path, e))?;

    let mut xml = Reader::from_str(&content);
    xml.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut current: Option<PartialPackage> = None;
    let mut current_key: Option<String> = None;

    loop {
        match xml.read_event_into(&mut buf).map_err(map_xml_err)? {
            Event::Start(e) if e.name().as_ref() == b"package" => {
                current = Some(PartialPackage::default());
                current_key = None;
                apply(current.as_mut().unwrap(), &e, b"package", &mut xml)?;
            }
            Event::Start(e) | Event::Empty(e) if current.is_some() => {
                let name = e.name().as_ref().to_vec();
                apply(current.as_mut().unwrap(), &e, &name, &mut xml)?;
            }
            Event::End(e) if e.name().as_ref() == b"package" => {
                if let Some(pkg) = current.take() {
                    current_key = cache_key_of(key, &pkg);
                    let admit = match (&current_key, allowlist) {
                        (Some(k), Some(list)) => list.contains(k),
                        (Some(_), None) => true,
                        (None, _) => false,
                    };
                    if admit {
                        if let Some(k) = current_key.clone() {
                            facts.entry(k).and_modify(|existing| merge_partial(existing, &pkg)).or_insert(pkg);
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

/// Later streams (filelists, other) contribute fields onto a package already
/// seen in primary.xml, keyed the same way.
fn merge_partial(existing: &mut PartialPackage, incoming: &PartialPackage) {
    if !incoming.files.is_empty() {
        existing.files = incoming.files.clone();
    }
    if !incoming.changelogs.is_empty() {
        existing.changelogs = incoming.changelogs.clone();
    }
}

impl XmlOldMetadataLoader {
    fn load_into(
        &self,
        repo_dir: &Path,
        key: CacheKey,
        allowlist: Option<&Allowlist>,
        facts: &mut HashMap<String, PartialPackage>,
    ) -> RepoResult<()> {
        let repomd_path = repo_dir.join("repomd.xml");
        if let Some(href) = locate_record_href(&repomd_path, "primary")? {
            let path = resolve_href(repo_dir, &href);
            parse_primary_stream(&path, key, allowlist, facts)?;
        }
        if let Some(href) = locate_record_href(&repomd_path, "filelists")? {
            let path = resolve_href(repo_dir, &href);
            parse_filelists_stream(&path, key, allowlist, facts)?;
        }
        if let Some(href) = locate_record_href(&repomd_path, "other")? {
            let path = resolve_href(repo_dir, &href);
            parse_other_stream(&path, key, allowlist, facts)?;
        }
        Ok(())
    }
}

fn resolve_href(repo_dir: &Path, href: &str) -> PathBuf {
    repo_dir.parent().map(|p| p.join(href)).unwrap_or_else(|| repo_dir.join(href))
}

impl OldMetadataLoader for XmlOldMetadataLoader {
    fn load(&self, repo_dir: &Path, key: CacheKey, allowlist: Option<&Allowlist>) -> RepoResult<OldMetadataMap> {
        let mut partials = HashMap::new();
        self.load_into(repo_dir, key, allowlist, &mut partials)?;
        let mut map = OldMetadataMap::new();
        for (k, partial) in partials {
            if let Some(fact) = finish_package(partial) {
                map.insert_if_absent(k, fact);
            }
        }
        Ok(map)
    }

    fn merge_from(
        &self,
        into: &mut OldMetadataMap,
        other_repo_dir: &Path,
        key: CacheKey,
        allowlist: Option<&Allowlist>,
    ) -> RepoResult<()> {
        let mut partials = HashMap::new();
        self.load_into(other_repo_dir, key, allowlist, &mut partials)?;
        for (k, partial) in partials {
            if let Some(fact) = finish_package(partial) {
                into.insert_if_absent(k, fact);
            }
        }
        Ok(())
    }
}

fn parse_primary_stream(
    path: &Path,
    key: CacheKey,
    allowlist: Option<&Allowlist>,
    facts: &mut HashMap<String, PartialPackage>,
) -> RepoResult<()> {
    stream_merge(path, key, allowlist, facts, |pkg, el, tag, xml| {
        match tag {
            b"package" => {}
            b"name" => pkg.name = Some(read_text(xml)?),
            b"arch" => pkg.arch = Some(read_text(xml)?),
            b"version" => {
                pkg.epoch = attr_str(el, "epoch");
                pkg.version = attr_str(el, "ver");
                pkg.release = attr_str(el, "rel");
            }
            b"checksum" => {
                pkg.checksum_type = attr_str(el, "type").unwrap_or_default();
                pkg.pkg_id = Some(read_text(xml)?);
            }
            b"summary" => pkg.summary = read_text(xml)?,
            b"description" => pkg.description = read_text(xml)?,
            b"packager" => pkg.packager = read_text(xml)?,
            b"url" => pkg.url = read_text(xml)?,
            b"time" => {
                pkg.file_mtime = attr_str(el, "file").and_then(|s| s.parse().ok()).unwrap_or(0);
                pkg.build_time = attr_str(el, "build").and_then(|s| s.parse().ok()).unwrap_or(0);
            }
            b"size" => {
                pkg.size_package = attr_str(el, "package").and_then(|s| s.parse().ok()).unwrap_or(0);
                pkg.size_installed = attr_str(el, "installed").and_then(|s| s.parse().ok()).unwrap_or(0);
                pkg.size_archive = attr_str(el, "archive").and_then(|s| s.parse().ok()).unwrap_or(0);
            }
            b"location" => {
                pkg.href = attr_str(el, "href");
                pkg.base = attr_str(el, "xml:base");
            }
            b"rpm:license" => pkg.license = read_text(xml)?,
            b"rpm:vendor" => pkg.vendor = read_text(xml)?,
            b"rpm:group" => pkg.group = read_text(xml)?,
            b"rpm:buildhost" => pkg.build_host = read_text(xml)?,
            b"rpm:sourcerpm" => pkg.source_rpm = read_text(xml)?,
            b"rpm:header-range" => {
                pkg.header_start = attr_str(el, "start").and_then(|s| s.parse().ok()).unwrap_or(0);
                pkg.header_end = attr_str(el, "end").and_then(|s| s.parse().ok()).unwrap_or(0);
            }
            b"rpm:requires" => pkg.current_dep_list = Some(DepList::Requires),
            b"rpm:provides" => pkg.current_dep_list = Some(DepList::Provides),
            b"rpm:conflicts" => pkg.current_dep_list = Some(DepList::Conflicts),
            b"rpm:obsoletes" => pkg.current_dep_list = Some(DepList::Obsoletes),
            b"rpm:entry" => match pkg.current_dep_list {
                Some(DepList::Requires) => pkg.requires.push(parse_dep_entry(el)),
                Some(DepList::Provides) => pkg.provides.push(parse_dep_entry(el)),
                Some(DepList::Conflicts) => pkg.conflicts.push(parse_dep_entry(el)),
                Some(DepList::Obsoletes) => pkg.obsoletes.push(parse_dep_entry(el)),
                None => {}
            },
            _ => {}
        }
        Ok(())
    })
}

fn parse_filelists_stream(
    path: &Path,
    key: CacheKey,
    allowlist: Option<&Allowlist>,
    facts: &mut HashMap<String, PartialPackage>,
) -> RepoResult<()> {
    stream_merge(path, key, allowlist, facts, |pkg, el, tag, xml| {
        match tag {
            b"package" => {
                pkg.pkg_id = attr_str(el, "pkgid");
                pkg.name = attr_str(el, "name");
                pkg.arch = attr_str(el, "arch");
            }
            b"version" => {
                pkg.epoch = attr_str(el, "epoch");
                pkg.version = attr_str(el, "ver");
                pkg.release = attr_str(el, "rel");
            }
            b"file" => {
                let path_text = read_text(xml)?;
                let (dir, basename) = match path_text.rfind('/') {
                    Some(i) => (path_text[..=i].to_string(), path_text[i + 1..].to_string()),
                    None => (String::new(), path_text),
                };
                let file_type = match attr_str(el, "type").as_deref() {
                    Some("dir") => FileType::Dir,
                    Some("ghost") => FileType::Ghost,
                    _ => FileType::Regular,
                };
                pkg.files.push(FileEntry::new(file_type, dir, basename));
            }
            _ => {}
        }
        Ok(())
    })
}

fn parse_other_stream(
    path: &Path,
    key: CacheKey,
    allowlist: Option<&Allowlist>,
    facts: &mut HashMap<String, PartialPackage>,
) -> RepoResult<()> {
    stream_merge(path, key, allowlist, facts, |pkg, el, tag, xml| {
        match tag {
            b"package" => {
                pkg.pkg_id = attr_str(el, "pkgid");
                pkg.name = attr_str(el, "name");
                pkg.arch = attr_str(el, "arch");
            }
            b"changelog" => {
                let author = attr_str(el, "author").unwrap_or_default();
                let date = attr_str(el, "date").and_then(|s| s.parse().ok()).unwrap_or(0);
                let text = read_text(xml)?;
                pkg.changelogs.push(ChangelogEntry::new(author, date, text));
            }
            _ => {}
        }
        Ok(())
    })
}

fn read_text(xml: &mut Reader<&[u8]>) -> RepoResult<String> {
    let mut buf = Vec::new();
    match xml.read_event_into(&mut buf).map_err(map_xml_err)? {
        Event::Text(t) => t.unescape().map(|s| s.into_owned()).map_err(map_xml_err),
        Event::End(_) => Ok(String::new()),
        _ => Ok(String::new()),
    }
}
