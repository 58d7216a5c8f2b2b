// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Schema version 10 DDL for the three metadata databases (spec §4.4, §6).

use repodata_domain::error::{RepoError, RepoResult};
use repodata_domain::services::sqlite_emitter::SCHEMA_VERSION;
use rusqlite::Connection;

fn to_sqlite_err(e: rusqlite::Error) -> RepoError {
    RepoError::Sqlite(e.to_string())
}

pub fn create_primary_schema(conn: &Connection) -> RepoResult<()> {
    conn.execute_batch(
        "CREATE TABLE packages (
            pkgKey INTEGER PRIMARY KEY,
            pkgId TEXT, name TEXT, arch TEXT, version TEXT, epoch TEXT, release TEXT,
            summary TEXT, description TEXT, url TEXT,
            time_file INTEGER, time_build INTEGER,
            rpm_license TEXT, rpm_vendor TEXT, rpm_group TEXT, rpm_buildhost TEXT,
            rpm_sourcerpm TEXT, rpm_header_start INTEGER, rpm_header_end INTEGER,
            rpm_packager TEXT,
            size_package INTEGER, size_installed INTEGER, size_archive INTEGER,
            location_href TEXT, location_base TEXT,
            checksum_type TEXT
        );
        CREATE TABLE provides (pkgKey INTEGER, name TEXT, flags TEXT, epoch TEXT, version TEXT, release TEXT);
        CREATE TABLE requires (pkgKey INTEGER, name TEXT, flags TEXT, epoch TEXT, version TEXT, release TEXT, pre TEXT);
        CREATE TABLE conflicts (pkgKey INTEGER, name TEXT, flags TEXT, epoch TEXT, version TEXT, release TEXT);
        CREATE TABLE obsoletes (pkgKey INTEGER, name TEXT, flags TEXT, epoch TEXT, version TEXT, release TEXT);
        CREATE TABLE files (pkgKey INTEGER, name TEXT, type TEXT);
        CREATE TABLE db_info (dbversion INTEGER, checksum TEXT);",
    )
    .map_err(to_sqlite_err)?;
    Ok(())
}

pub fn index_primary_schema(conn: &Connection) -> RepoResult<()> {
    conn.execute_batch(
        "CREATE INDEX packagename ON packages (name);
        CREATE INDEX packageId ON packages (pkgId);
        CREATE INDEX pkgprovides ON provides (name);
        CREATE INDEX pkgrequires ON requires (name);
        CREATE INDEX pkgconflicts ON conflicts (name);
        CREATE INDEX pkgobsoletes ON obsoletes (name);
        CREATE INDEX filenames ON files (name);",
    )
    .map_err(to_sqlite_err)?;
    Ok(())
}

pub fn create_filelists_schema(conn: &Connection) -> RepoResult<()> {
    conn.execute_batch(
        "CREATE TABLE packages (pkgKey INTEGER PRIMARY KEY, pkgId TEXT);
        CREATE TABLE filelist (pkgKey INTEGER, dirname TEXT, filenames TEXT, filetypes TEXT);
        CREATE TABLE db_info (dbversion INTEGER, checksum TEXT);",
    )
    .map_err(to_sqlite_err)?;
    Ok(())
}

pub fn index_filelists_schema(conn: &Connection) -> RepoResult<()> {
    conn.execute_batch(
        "CREATE INDEX keyfile ON filelist (pkgKey);
        CREATE INDEX pkgId ON packages (pkgId);
        CREATE INDEX dirnames ON filelist (dirname);",
    )
    .map_err(to_sqlite_err)?;
    Ok(())
}

pub fn create_other_schema(conn: &Connection) -> RepoResult<()> {
    conn.execute_batch(
        "CREATE TABLE packages (pkgKey INTEGER PRIMARY KEY, pkgId TEXT, name TEXT, arch TEXT, version TEXT, epoch TEXT, release TEXT);
        CREATE TABLE changelog (pkgKey INTEGER, author TEXT, date INTEGER, changelog TEXT);
        CREATE TABLE db_info (dbversion INTEGER, checksum TEXT);",
    )
    .map_err(to_sqlite_err)?;
    Ok(())
}

pub fn index_other_schema(conn: &Connection) -> RepoResult<()> {
    conn.execute_batch(
        "CREATE INDEX pkgkeychangelog ON changelog (pkgKey);
        CREATE INDEX packagename ON packages (name);
        CREATE INDEX pkgId ON packages (pkgId);",
    )
    .map_err(to_sqlite_err)?;
    Ok(())
}

pub fn insert_db_info(conn: &Connection, checksum_hex: &str) -> RepoResult<()> {
    conn.execute("INSERT INTO db_info (dbversion, checksum) VALUES (?1, ?2)", (SCHEMA_VERSION, checksum_hex))
        .map_err(to_sqlite_err)?;
    Ok(())
}
