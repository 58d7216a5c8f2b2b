// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! `modifyrepo-rs`: insert or remove one named metadata record in an
//! existing `repomd.xml` without a full rebuild (SPEC_FULL §5, grounded in
//! `createrepo_c`'s `modifyrepo_c.c`/`modifyrepo_shared.c`).
//!
//! Unlike the primary tool's records, a metadata type here is an arbitrary
//! string (`--mdtype`), not one of the fixed [`RecordType`](repodata_domain::entities::manifest_record::RecordType)
//! variants — `repomd.xml` is parsed and re-emitted as raw `<data>` blocks
//! rather than through the typed manifest builder (C8), which only knows
//! the fixed set of streams a full build produces.

use anyhow::Context;
use clap::Parser;
use quick_xml::events::Event;
use quick_xml::Reader;
use repodata_bootstrap::cli::{self, ModifyCli, ValidatedModifyCommand};
use repodata_bootstrap::exit_code::ExitCode;
use repodata_bootstrap::logger;
use repodata_core::checksum::digest_file;
use repodata_core::compression;
use repodata_domain::error::{RepoError, RepoResult};
use repodata_domain::services::compressed_stream::ReadCodec;
use repodata_domain::value_objects::checksum_algorithm::ChecksumAlgorithm;
use repodata_domain::value_objects::compression::CompressionType;
use std::io::Write as _;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

const CHECKSUM_ALGORITHM: ChecksumAlgorithm = ChecksumAlgorithm::Sha256;

fn main() {
    let cli = ModifyCli::parse();
    logger::init_subscriber(false);
    std::process::exit(run(cli));
}

fn run(cli: ModifyCli) -> i32 {
    let validated = match cli::validate_modify_cli(cli) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::from_error(&e).as_i32();
        }
    };
    match execute(validated).context("modifyrepo-rs failed") {
        Ok(()) => ExitCode::Success.as_i32(),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::Failure.as_i32()
        }
    }
}

/// One `<data>` block, kept as its exact source XML for records this
/// invocation doesn't touch.
#[derive(Debug, Clone)]
struct RawRecord {
    mdtype: String,
    href: String,
    xml: String,
}

fn xml_attr(e: &quick_xml::events::BytesStart<'_>, name: &str) -> Option<String> {
    e.attributes().flatten().find(|a| a.key.as_ref() == name.as_bytes()).and_then(|a| a.unescape_value().ok()).map(|v| v.into_owned())
}

/// Splits `repomd.xml` into its `<data>` records, keeping each one's exact
/// source text so unaffected records pass through byte-for-byte.
fn parse_repomd(content: &str) -> RepoResult<Vec<RawRecord>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut records = Vec::new();
    let mut block_start: Option<usize> = None;
    let mut current_type: Option<String> = None;
    let mut current_href: Option<String> = None;

    loop {
        let pos_before = reader.buffer_position() as usize;
        match reader.read_event_into(&mut buf).map_err(|e| RepoError::malformed_xml(0, e.to_string()))? {
            Event::Start(e) if e.name().as_ref() == b"data" => {
                block_start = Some(pos_before);
                current_type = xml_attr(&e, "type");
                current_href = None;
            }
            Event::Empty(e) if e.name().as_ref() == b"location" => {
                current_href = xml_attr(&e, "href");
            }
            Event::End(e) if e.name().as_ref() == b"data" => {
                let end = reader.buffer_position() as usize;
                if let (Some(start), Some(mdtype)) = (block_start.take(), current_type.take()) {
                    records.push(RawRecord {
                        mdtype,
                        href: current_href.take().unwrap_or_default(),
                        xml: content[start..end].to_string(),
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(records)
}

fn unix_now() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

/// Builds the `<data type="...">` block for a file already placed in
/// `repodata_dir`, the same two-checksum shape `manifest::build_record`
/// produces for the primary tool's own streams (spec §4.7), but rendered by
/// hand since the mdtype isn't one of `RecordType`'s fixed variants.
fn render_data_block(repodata_dir: &Path, href: &str, mdtype: &str) -> RepoResult<RawRecord> {
    let path = repodata_dir.join(href);
    let compressed_size = std::fs::metadata(&path).map_err(|e| RepoError::io(&path, e))?.len();
    let mtime = std::fs::metadata(&path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or_else(unix_now);
    let compressed_hex = digest_file(&path, CHECKSUM_ALGORITHM)?;

    let mut reader = compression::open_read(&path, ReadCodec::AutoDetect, Some(CHECKSUM_ALGORITHM))?;
    std::io::copy(&mut reader, &mut std::io::sink()).map_err(|e| RepoError::io(&path, e))?;
    let stat = reader.into_stat().ok_or_else(|| RepoError::assertion("content-stat hook produced no result"))?;

    let label = CHECKSUM_ALGORITHM.wire_label(false);
    let xml = format!(
        "<data type=\"{mdtype}\">\
<checksum type=\"{label}\">{compressed_hex}</checksum>\
<open-checksum type=\"{label}\">{open_checksum}</open-checksum>\
<location href=\"{href}\"/>\
<timestamp>{mtime}</timestamp>\
<size>{compressed_size}</size>\
<open-size>{open_size}</open-size>\
</data>",
        open_checksum = stat.open_checksum_hex,
        open_size = stat.open_size,
    );
    Ok(RawRecord { mdtype: mdtype.to_string(), href: href.to_string(), xml })
}

fn render_repomd(records: &[RawRecord], revision: i64) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(&format!(
        "<repomd xmlns=\"http://linux.duke.edu/metadata/repo\" xmlns:rpm=\"http://linux.duke.edu/metadata/rpm\">"
    ));
    out.push_str(&format!("<revision>{revision}</revision>"));
    for record in records {
        out.push_str(&record.xml);
    }
    out.push_str("</repomd>\n");
    out
}

fn atomic_write(dest: &Path, contents: &str) -> RepoResult<()> {
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| RepoError::io(parent, e))?;
    tmp.write_all(contents.as_bytes()).map_err(|e| RepoError::io(dest, e))?;
    tmp.flush().map_err(|e| RepoError::io(dest, e))?;
    tmp.persist(dest).map_err(|e| RepoError::io(dest, e.error))?;
    Ok(())
}

fn destination_href(file: &Path, compress: bool) -> String {
    let name = file.file_name().and_then(|n| n.to_str()).unwrap_or("metadata").to_string();
    if compress && CompressionType::from_suffix(file).unwrap_or(CompressionType::None) == CompressionType::None {
        format!("{name}.gz")
    } else {
        name
    }
}

fn execute(validated: cli::ValidatedModifyCli) -> RepoResult<()> {
    let repodata_dir = validated.repodata_dir;
    let repomd_path = repodata_dir.join("repomd.xml");
    let content = std::fs::read_to_string(&repomd_path).map_err(|e| RepoError::io(&repomd_path, e))?;
    let mut records = parse_repomd(&content)?;

    match validated.command {
        ValidatedModifyCommand::Add { file, mdtype, compress } => {
            let old = records.iter().find(|r| r.mdtype == mdtype).cloned();
            let href = destination_href(&file, compress);
            let dest_path = repodata_dir.join(&href);

            if compress && CompressionType::from_suffix(&file).unwrap_or(CompressionType::None) == CompressionType::None {
                let mut reader = std::fs::File::open(&file).map_err(|e| RepoError::io(&file, e))?;
                let mut writer = compression::open_write(&dest_path, CompressionType::Gzip)?;
                std::io::copy(&mut reader, &mut writer).map_err(|e| RepoError::io(&dest_path, e))?;
                writer.flush().map_err(|e| RepoError::io(&dest_path, e))?;
                drop(writer);
            } else {
                std::fs::copy(&file, &dest_path).map_err(|e| RepoError::io(&dest_path, e))?;
            }

            let record = render_data_block(&repodata_dir, &href, &mdtype)?;
            records.retain(|r| r.mdtype != mdtype);
            records.push(record);

            atomic_write(&repomd_path, &render_repomd(&records, unix_now()))?;

            if let Some(old) = old {
                if old.href != href {
                    let old_path = repodata_dir.join(&old.href);
                    let _ = std::fs::remove_file(&old_path);
                }
            }
        }
        ValidatedModifyCommand::Remove { mdtype } => {
            let removed = records.iter().find(|r| r.mdtype == mdtype).cloned();
            records.retain(|r| r.mdtype != mdtype);

            atomic_write(&repomd_path, &render_repomd(&records, unix_now()))?;

            if let Some(removed) = removed {
                let path = repodata_dir.join(&removed.href);
                let _ = std::fs::remove_file(&path);
            } else {
                tracing::warn!(mdtype, "no existing record for this mdtype; nothing removed");
            }
        }
    }

    Ok(())
}
