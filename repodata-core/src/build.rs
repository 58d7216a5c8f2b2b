// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! C7-C9 orchestration for the primary tool: discovery through publish
//! (spec §4.6-§4.8). This is the one module that knows the whole shape of a
//! build; everything it calls is independently testable.

use crate::compression;
use crate::old_metadata::XmlOldMetadataLoader;
use crate::pipeline::config::{BuildConfig, MergeBuildConfig};
use crate::pipeline::discovery::{self, DiscoveryRequest};
use crate::pipeline::ordered_writer::OrderedWriter;
use crate::pipeline::worker_pool::{self, WorkerPoolConfig, WorkerStats};
use crate::retention::{self, RetentionPolicy};
use crate::rpm_extractor::RpmExtractor;
use crate::sqlite::{filelists_db::FilelistsDb, other_db::OtherDb, primary_db::PrimaryDb};
use crate::xml::{filelists, other, primary};
use crate::{manifest, xml};
use repodata_domain::entities::manifest_record::RecordType;
use repodata_domain::entities::package_fact::PackageFact;
use repodata_domain::error::{RepoError, RepoResult};
use repodata_domain::services::old_metadata::{CacheKey, OldMetadataLoader, OldMetadataMap};
use repodata_domain::services::sqlite_emitter::SqliteSink;
use repodata_domain::services::xml_emitter::PackageFragments;
use repodata_domain::value_objects::checksum_algorithm::ChecksumAlgorithm;
use repodata_domain::value_objects::compression::CompressionType;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

const STAGING: &str = retention::STAGING_DIR_NAME;

fn unix_now() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

/// Opens one metadata family's compressed writer, pre-seeded with the XML
/// declaration and root-open element (spec §4.6.4 closing sequence's
/// counterpart at open time).
fn open_family_writer(
    staging_dir: &Path,
    stem: &str,
    compress: CompressionType,
    package_count: usize,
    root_open: impl Fn(usize) -> String,
) -> RepoResult<(PathBuf, Box<dyn Write + Send>)> {
    let path = staging_dir.join(format!("{stem}.xml{}", compress.extension()));
    let mut writer = compression::open_write(&path, compress)?;
    writer.write_all(xml::xml_declaration()?.as_bytes()).map_err(|e| RepoError::io(&path, e))?;
    writer.write_all(root_open(package_count).as_bytes()).map_err(|e| RepoError::io(&path, e))?;
    Ok((path, Box::new(writer)))
}

fn close_family_writer(
    mut writer: Box<dyn Write + Send>,
    path: &Path,
    root_close: &str,
) -> RepoResult<()> {
    writer.write_all(root_close.as_bytes()).map_err(|e| RepoError::io(path, e))?;
    writer.flush().map_err(|e| RepoError::io(path, e))?;
    // Dropping the boxed writer here finalizes the underlying codec
    // (niffler's concrete encoders flush their trailer on drop).
    drop(writer);
    Ok(())
}

fn load_old_metadata(cfg: &BuildConfig) -> RepoResult<Option<OldMetadataMap>> {
    if !cfg.update {
        return Ok(None);
    }
    let source_dir = cfg.update_md_path.as_deref().unwrap_or(&cfg.output_dir);
    let loader = XmlOldMetadataLoader;
    match loader.load(source_dir, CacheKey::Basename, None) {
        Ok(map) => Ok(Some(map)),
        Err(_) => {
            // No prior repodata/ to reuse from is not fatal; the build just
            // extracts every package fresh (spec §4.5).
            Ok(None)
        }
    }
}

fn retention_policy(cfg: &BuildConfig) -> RetentionPolicy {
    match cfg.retain_old {
        Some(keep) => RetentionPolicy::Classic { keep },
        None => RetentionPolicy::Default,
    }
}

/// Runs a full build: discover, extract/reuse, write the three metadata
/// streams (and their SQLite siblings), build the manifest, then publish
/// (spec §4.6-§4.8). Returns the published `repodata/` directory.
pub fn run(cfg: &BuildConfig) -> RepoResult<PathBuf> {
    let tasks = discovery::discover(DiscoveryRequest {
        input_dir: &cfg.input_dir,
        includepkg: &cfg.includepkg,
        pkglist: cfg.pkglist.as_deref(),
        excludes: &cfg.excludes,
        skip_symlinks: cfg.skip_symlinks,
    })?;
    let package_count = tasks.len();

    let staging_dir = cfg.output_dir.join(STAGING);
    if staging_dir.exists() {
        std::fs::remove_dir_all(&staging_dir).map_err(|e| RepoError::io(&staging_dir, e))?;
    }
    std::fs::create_dir_all(&staging_dir).map_err(|e| RepoError::io(&staging_dir, e))?;
    // Publication renames staging_dir away on success; on any early return
    // (including `?`) it's still sitting here and this sweeps it (spec §4.8,
    // §5 "Cancellation" — same removal SIGINT triggers, for any other
    // failure mid-build).
    let _staging_cleanup = scopeguard::guard(staging_dir.clone(), |dir| {
        let _ = std::fs::remove_dir_all(&dir);
    });

    let (primary_path, primary_writer) =
        open_family_writer(&staging_dir, "primary", cfg.compress_type, package_count, primary::root_open)?;
    let (filelists_path, filelists_writer) =
        open_family_writer(&staging_dir, "filelists", cfg.compress_type, package_count, filelists::root_open)?;
    let (other_path, other_writer) =
        open_family_writer(&staging_dir, "other", cfg.compress_type, package_count, other::root_open)?;

    let (primary_db, filelists_db, other_db): (
        Option<Box<dyn SqliteSink + Send>>,
        Option<Box<dyn SqliteSink + Send>>,
        Option<Box<dyn SqliteSink + Send>>,
    ) = if cfg.database {
        (
            Some(Box::new(PrimaryDb::create(&staging_dir.join("primary.sqlite"))?)),
            Some(Box::new(FilelistsDb::create(&staging_dir.join("filelists.sqlite"))?)),
            Some(Box::new(OtherDb::create(&staging_dir.join("other.sqlite"))?)),
        )
    } else {
        (None, None, None)
    };

    let writer = Arc::new(OrderedWriter::new(
        primary_writer,
        primary_db,
        filelists_writer,
        filelists_db,
        other_writer,
        other_db,
    ));

    let old_metadata = load_old_metadata(cfg)?.map(Arc::new);
    let extractor = Arc::new(RpmExtractor);

    let pool_cfg = WorkerPoolConfig {
        workers: cfg.workers.get(),
        checksum_algorithm: cfg.checksum_algorithm,
        legacy_sha_alias: cfg.legacy_sha_alias,
        changelog_limit: cfg.changelog_limit,
        base_url: cfg.base_url.clone(),
        skip_stat: cfg.skip_stat,
    };
    let stats: Arc<WorkerStats> = worker_pool::run(tasks, Arc::clone(&writer), extractor, old_metadata, pool_cfg)?;
    tracing::info!(
        packages = package_count,
        extractions = stats.extractions.load(std::sync::atomic::Ordering::Relaxed),
        warnings = stats.warnings.load(std::sync::atomic::Ordering::Relaxed),
        "build pipeline drained"
    );

    let writer = Arc::try_unwrap(writer)
        .map_err(|_| RepoError::assertion("ordered writer still shared after pool join"))?;
    let ((primary_w, primary_db), (filelists_w, filelists_db), (other_w, other_db)) = writer.into_sinks();

    close_family_writer(primary_w, &primary_path, primary::root_close())?;
    close_family_writer(filelists_w, &filelists_path, filelists::root_close())?;
    close_family_writer(other_w, &other_path, other::root_close())?;

    let mut records = Vec::new();
    for (path, stem, record_type, sqlite, db_record_type) in [
        (&primary_path, "primary", RecordType::Primary, primary_db, RecordType::PrimaryDb),
        (&filelists_path, "filelists", RecordType::Filelists, filelists_db, RecordType::FilelistsDb),
        (&other_path, "other", RecordType::Other, other_db, RecordType::OtherDb),
    ] {
        let href = path.strip_prefix(&staging_dir).unwrap_or(path).to_string_lossy().into_owned();
        let record = manifest::build_record(
            &staging_dir,
            &href,
            record_type,
            cfg.base_url.clone(),
            cfg.checksum_algorithm,
            cfg.legacy_sha_alias,
            None,
        )?;
        let xml_checksum = record.checksum.hex_digest.clone();
        records.push(record);

        if let Some(sink) = sqlite {
            sink.close(&xml_checksum)?;
            let db_path = staging_dir.join(format!("{stem}.sqlite"));
            let final_db_path = if cfg.compress_type == CompressionType::None {
                db_path.clone()
            } else {
                let compressed = staging_dir.join(format!("{stem}.sqlite{}", cfg.compress_type.extension()));
                compress_sqlite(&db_path, &compressed, cfg.compress_type)?;
                compressed
            };
            let db_href = final_db_path.strip_prefix(&staging_dir).unwrap_or(&final_db_path).to_string_lossy().into_owned();
            records.push(manifest::build_record(
                &staging_dir,
                &db_href,
                db_record_type,
                cfg.base_url.clone(),
                cfg.checksum_algorithm,
                cfg.legacy_sha_alias,
                Some(repodata_domain::services::sqlite_emitter::SCHEMA_VERSION),
            )?);
        }
    }

    if let Some(groupfile) = &cfg.groupfile {
        let raw = fetch_groupfile(groupfile)?;
        let dest = staging_dir.join("comps.xml");
        std::fs::write(&dest, &raw).map_err(|e| RepoError::io(&dest, e))?;
        records.push(manifest::build_record(
            &staging_dir,
            "comps.xml",
            RecordType::Group,
            cfg.base_url.clone(),
            cfg.checksum_algorithm,
            cfg.legacy_sha_alias,
            None,
        )?);

        // spec §4.7/§6: a group record is always published alongside its
        // gzip-compressed twin, regardless of `--compress-type`.
        let gz_dest = staging_dir.join("comps.xml.gz");
        let mut gz_writer = compression::open_write(&gz_dest, CompressionType::Gzip)?;
        gz_writer.write_all(&raw).map_err(|e| RepoError::io(&gz_dest, e))?;
        gz_writer.flush().map_err(|e| RepoError::io(&gz_dest, e))?;
        drop(gz_writer);
        records.push(manifest::build_record(
            &staging_dir,
            "comps.xml.gz",
            RecordType::GroupGz,
            cfg.base_url.clone(),
            cfg.checksum_algorithm,
            cfg.legacy_sha_alias,
            None,
        )?);
    }

    if cfg.unique_md_filenames {
        manifest::apply_unique_filenames(&staging_dir, &mut records)?;
    }

    manifest::write_repomd(&staging_dir, &records, unix_now(), None)?;

    retention::publish(&cfg.output_dir, &staging_dir, retention_policy(cfg))
}

/// Publishes an already-merged, already-sorted fact stream through the same
/// writer/manifest/retention machinery as [`run`] (spec §4.6.5). There is no
/// discovery or worker pool: every fact was already extracted or reused by
/// [`crate::merger::merge`], so this writes them to the three family
/// streams directly, in the order the merger produced them.
pub fn run_merged(facts: Vec<PackageFact>, cfg: &MergeBuildConfig) -> RepoResult<PathBuf> {
    let package_count = facts.len();

    let staging_dir = cfg.output_dir.join(STAGING);
    if staging_dir.exists() {
        std::fs::remove_dir_all(&staging_dir).map_err(|e| RepoError::io(&staging_dir, e))?;
    }
    std::fs::create_dir_all(&staging_dir).map_err(|e| RepoError::io(&staging_dir, e))?;
    let _staging_cleanup = scopeguard::guard(staging_dir.clone(), |dir| {
        let _ = std::fs::remove_dir_all(&dir);
    });

    let (primary_path, primary_writer) =
        open_family_writer(&staging_dir, "primary", cfg.compress_type, package_count, primary::root_open)?;
    let (filelists_path, filelists_writer) =
        open_family_writer(&staging_dir, "filelists", cfg.compress_type, package_count, filelists::root_open)?;
    let (other_path, other_writer) =
        open_family_writer(&staging_dir, "other", cfg.compress_type, package_count, other::root_open)?;

    let (primary_db, filelists_db, other_db): (
        Option<Box<dyn SqliteSink + Send>>,
        Option<Box<dyn SqliteSink + Send>>,
        Option<Box<dyn SqliteSink + Send>>,
    ) = if cfg.database {
        (
            Some(Box::new(PrimaryDb::create(&staging_dir.join("primary.sqlite"))?)),
            Some(Box::new(FilelistsDb::create(&staging_dir.join("filelists.sqlite"))?)),
            Some(Box::new(OtherDb::create(&staging_dir.join("other.sqlite"))?)),
        )
    } else {
        (None, None, None)
    };

    let writer = OrderedWriter::new(primary_writer, primary_db, filelists_writer, filelists_db, other_writer, other_db);

    let last_id = facts.len().saturating_sub(1);
    for (id, fact) in facts.into_iter().enumerate() {
        let fragments = PackageFragments {
            primary: primary::render(&fact)?,
            filelists: filelists::render(&fact)?,
            other: other::render(&fact)?,
        };
        writer.submit(id, fragments, fact, id == last_id)?;
    }

    let ((primary_w, primary_db), (filelists_w, filelists_db), (other_w, other_db)) = writer.into_sinks();

    close_family_writer(primary_w, &primary_path, primary::root_close())?;
    close_family_writer(filelists_w, &filelists_path, filelists::root_close())?;
    close_family_writer(other_w, &other_path, other::root_close())?;

    let mut records = Vec::new();
    for (path, stem, record_type, sqlite, db_record_type) in [
        (&primary_path, "primary", RecordType::Primary, primary_db, RecordType::PrimaryDb),
        (&filelists_path, "filelists", RecordType::Filelists, filelists_db, RecordType::FilelistsDb),
        (&other_path, "other", RecordType::Other, other_db, RecordType::OtherDb),
    ] {
        let href = path.strip_prefix(&staging_dir).unwrap_or(path).to_string_lossy().into_owned();
        let record = manifest::build_record(
            &staging_dir,
            &href,
            record_type,
            cfg.base_url.clone(),
            cfg.checksum_algorithm,
            cfg.legacy_sha_alias,
            None,
        )?;
        let xml_checksum = record.checksum.hex_digest.clone();
        records.push(record);

        if let Some(sink) = sqlite {
            sink.close(&xml_checksum)?;
            let db_path = staging_dir.join(format!("{stem}.sqlite"));
            let final_db_path = if cfg.compress_type == CompressionType::None {
                db_path.clone()
            } else {
                let compressed = staging_dir.join(format!("{stem}.sqlite{}", cfg.compress_type.extension()));
                compress_sqlite(&db_path, &compressed, cfg.compress_type)?;
                compressed
            };
            let db_href =
                final_db_path.strip_prefix(&staging_dir).unwrap_or(&final_db_path).to_string_lossy().into_owned();
            records.push(manifest::build_record(
                &staging_dir,
                &db_href,
                db_record_type,
                cfg.base_url.clone(),
                cfg.checksum_algorithm,
                cfg.legacy_sha_alias,
                Some(repodata_domain::services::sqlite_emitter::SCHEMA_VERSION),
            )?);
        }
    }

    if cfg.unique_md_filenames {
        manifest::apply_unique_filenames(&staging_dir, &mut records)?;
    }

    manifest::write_repomd(&staging_dir, &records, unix_now(), None)?;

    let policy = match cfg.retain_old {
        Some(keep) => RetentionPolicy::Classic { keep },
        None => RetentionPolicy::Default,
    };
    retention::publish(&cfg.output_dir, &staging_dir, policy)
}

/// Resolves `--groupfile <path|url>` (spec §6) to its raw bytes, fetching
/// over HTTP(S) when the argument parses as one and falling back to a local
/// read otherwise.
fn fetch_groupfile(groupfile: &str) -> RepoResult<Vec<u8>> {
    match url::Url::parse(groupfile) {
        Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {
            let response = reqwest::blocking::get(parsed)
                .and_then(reqwest::blocking::Response::error_for_status)
                .map_err(|e| RepoError::assertion(format!("groupfile fetch failed: {e}")))?;
            let bytes = response
                .bytes()
                .map_err(|e| RepoError::assertion(format!("groupfile fetch failed: {e}")))?;
            Ok(bytes.to_vec())
        }
        _ => {
            let path = Path::new(groupfile);
            std::fs::read(path).map_err(|e| RepoError::io(path, e))
        }
    }
}

/// Compresses the raw `.sqlite` file built by C5 with the same codec as the
/// XML streams (spec §6 on-disk layout: `*.sqlite.{bz2|gz|xz}`).
fn compress_sqlite(db_path: &Path, dest: &Path, compress_type: CompressionType) -> RepoResult<()> {
    let mut reader = std::fs::File::open(db_path).map_err(|e| RepoError::io(db_path, e))?;
    let mut writer = compression::open_write(dest, compress_type)?;
    std::io::copy(&mut reader, &mut writer).map_err(|e| RepoError::io(dest, e))?;
    writer.flush().map_err(|e| RepoError::io(dest, e))?;
    drop(writer);
    std::fs::remove_file(db_path).map_err(|e| RepoError::io(db_path, e))?;
    Ok(())
}
