// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

use super::schema;
use repodata_domain::entities::package_fact::PackageFact;
use repodata_domain::error::{RepoError, RepoResult};
use repodata_domain::services::sqlite_emitter::SqliteSink;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::Path;

fn to_sqlite_err(e: rusqlite::Error) -> RepoError {
    RepoError::Sqlite(e.to_string())
}

pub struct FilelistsDb {
    conn: Connection,
    next_key: i64,
}

impl FilelistsDb {
    pub fn create(path: &Path) -> RepoResult<Self> {
        let conn = Connection::open(path).map_err(to_sqlite_err)?;
        schema::create_filelists_schema(&conn)?;
        conn.execute_batch("BEGIN;").map_err(to_sqlite_err)?;
        Ok(Self { conn, next_key: 1 })
    }
}

impl SqliteSink for FilelistsDb {
    fn insert(&mut self, fact: &PackageFact) -> RepoResult<()> {
        let pkg_key = self.next_key;
        self.next_key += 1;

        self.conn
            .execute("INSERT INTO packages (pkgKey, pkgId) VALUES (?1, ?2)", params![pkg_key, fact.identity.pkg_id])
            .map_err(to_sqlite_err)?;

        // Batch files per directory: one row per dirname, with
        // newline-joined `filenames`/`filetypes` parallel batches
        // (spec §6 filelists schema).
        let mut by_dir: BTreeMap<&str, (Vec<&str>, Vec<char>)> = BTreeMap::new();
        for entry in &fact.files {
            let bucket = by_dir.entry(entry.dir.as_str()).or_default();
            bucket.0.push(entry.basename.as_str());
            bucket.1.push(entry.file_type.code());
        }

        let mut stmt = self
            .conn
            .prepare_cached("INSERT INTO filelist (pkgKey, dirname, filenames, filetypes) VALUES (?1, ?2, ?3, ?4)")
            .map_err(to_sqlite_err)?;
        for (dir, (names, types)) in by_dir {
            let filenames = names.join("/");
            let filetypes: String = types.into_iter().collect();
            stmt.execute(params![pkg_key, dir, filenames, filetypes]).map_err(to_sqlite_err)?;
        }
        Ok(())
    }

    fn close(self: Box<Self>, xml_checksum_hex: &str) -> RepoResult<()> {
        self.conn.execute_batch("COMMIT;").map_err(to_sqlite_err)?;
        schema::index_filelists_schema(&self.conn)?;
        schema::insert_db_info(&self.conn, xml_checksum_hex)?;
        Ok(())
    }
}
