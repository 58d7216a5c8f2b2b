// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

use super::schema;
use repodata_domain::entities::package_fact::PackageFact;
use repodata_domain::error::{RepoError, RepoResult};
use repodata_domain::services::sqlite_emitter::SqliteSink;
use repodata_domain::value_objects::dependency::Dependency;
use rusqlite::{params, Connection};
use std::path::Path;

fn to_sqlite_err(e: rusqlite::Error) -> RepoError {
    RepoError::Sqlite(e.to_string())
}

/// Backs the `primary` database. One writer transaction spans the whole
/// build; the transaction is held open for the sink's lifetime and committed
/// in `close` (spec §4.4, §5 "SQLite discipline").
pub struct PrimaryDb {
    conn: Connection,
    next_key: i64,
}

impl PrimaryDb {
    pub fn create(path: &Path) -> RepoResult<Self> {
        let mut conn = Connection::open(path).map_err(to_sqlite_err)?;
        schema::create_primary_schema(&conn)?;
        conn.execute_batch("BEGIN;").map_err(to_sqlite_err)?;
        Ok(Self { conn, next_key: 1 })
    }

    fn insert_deps(&mut self, table: &str, pkg_key: i64, deps: &[Dependency], with_pre: bool) -> RepoResult<()> {
        let sql = if with_pre {
            format!("INSERT INTO {table} (pkgKey, name, flags, epoch, version, release, pre) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)")
        } else {
            format!("INSERT INTO {table} (pkgKey, name, flags, epoch, version, release) VALUES (?1, ?2, ?3, ?4, ?5, ?6)")
        };
        let mut stmt = self.conn.prepare_cached(&sql).map_err(to_sqlite_err)?;
        for dep in deps {
            let flags = dep.flag.map(|f| f.to_string()).unwrap_or_default();
            if with_pre {
                stmt.execute(params![
                    pkg_key,
                    dep.name,
                    flags,
                    dep.epoch,
                    dep.version,
                    dep.release,
                    if dep.pre { "1" } else { "0" },
                ])
            } else {
                stmt.execute(params![pkg_key, dep.name, flags, dep.epoch, dep.version, dep.release])
            }
            .map_err(to_sqlite_err)?;
        }
        Ok(())
    }
}

impl SqliteSink for PrimaryDb {
    fn insert(&mut self, fact: &PackageFact) -> RepoResult<()> {
        let pkg_key = self.next_key;
        self.next_key += 1;

        self.conn
            .execute(
                "INSERT INTO packages (
                    pkgKey, pkgId, name, arch, version, epoch, release,
                    summary, description, url, time_file, time_build,
                    rpm_license, rpm_vendor, rpm_group, rpm_buildhost, rpm_sourcerpm,
                    rpm_header_start, rpm_header_end, rpm_packager,
                    size_package, size_installed, size_archive,
                    location_href, location_base, checksum_type
                ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21,?22,?23,?24,?25,?26)",
                params![
                    pkg_key,
                    fact.identity.pkg_id,
                    fact.identity.name,
                    fact.identity.arch,
                    fact.identity.version,
                    fact.identity.epoch.clone().unwrap_or_else(|| "0".to_string()),
                    fact.identity.release,
                    fact.descriptive.summary,
                    fact.descriptive.description,
                    fact.descriptive.url,
                    fact.timestamps.file_mtime,
                    fact.timestamps.build_time,
                    fact.descriptive.license,
                    fact.descriptive.vendor,
                    fact.descriptive.group,
                    fact.descriptive.build_host,
                    fact.descriptive.source_rpm,
                    fact.header_range.start as i64,
                    fact.header_range.end as i64,
                    fact.descriptive.packager,
                    fact.sizes.package as i64,
                    fact.sizes.installed as i64,
                    fact.sizes.archive as i64,
                    fact.location.href,
                    fact.location.base,
                    fact.checksum_type,
                ],
            )
            .map_err(to_sqlite_err)?;

        self.insert_deps("provides", pkg_key, &fact.dependencies.provides, false)?;
        self.insert_deps("requires", pkg_key, &fact.dependencies.requires, true)?;
        self.insert_deps("conflicts", pkg_key, &fact.dependencies.conflicts, false)?;
        self.insert_deps("obsoletes", pkg_key, &fact.dependencies.obsoletes, false)?;

        let mut file_stmt = self
            .conn
            .prepare_cached("INSERT INTO files (pkgKey, name, type) VALUES (?1, ?2, ?3)")
            .map_err(to_sqlite_err)?;
        for entry in fact.files.iter().filter(|e| repodata_domain::value_objects::file_entry::is_primary_file(e)) {
            file_stmt
                .execute(params![pkg_key, entry.full_path(), entry.file_type.code().to_string()])
                .map_err(to_sqlite_err)?;
        }
        Ok(())
    }

    fn close(self: Box<Self>, xml_checksum_hex: &str) -> RepoResult<()> {
        self.conn.execute_batch("COMMIT;").map_err(to_sqlite_err)?;
        schema::index_primary_schema(&self.conn)?;
        schema::insert_db_info(&self.conn, xml_checksum_hex)?;
        Ok(())
    }
}
