// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

use super::schema;
use repodata_domain::entities::package_fact::PackageFact;
use repodata_domain::error::{RepoError, RepoResult};
use repodata_domain::services::sqlite_emitter::SqliteSink;
use rusqlite::{params, Connection};
use std::path::Path;

fn to_sqlite_err(e: rusqlite::Error) -> RepoError {
    RepoError::Sqlite(e.to_string())
}

pub struct OtherDb {
    conn: Connection,
    next_key: i64,
}

impl OtherDb {
    pub fn create(path: &Path) -> RepoResult<Self> {
        let conn = Connection::open(path).map_err(to_sqlite_err)?;
        schema::create_other_schema(&conn)?;
        conn.execute_batch("BEGIN;").map_err(to_sqlite_err)?;
        Ok(Self { conn, next_key: 1 })
    }
}

impl SqliteSink for OtherDb {
    fn insert(&mut self, fact: &PackageFact) -> RepoResult<()> {
        let pkg_key = self.next_key;
        self.next_key += 1;

        self.conn
            .execute(
                "INSERT INTO packages (pkgKey, pkgId, name, arch, version, epoch, release) VALUES (?1,?2,?3,?4,?5,?6,?7)",
                params![
                    pkg_key,
                    fact.identity.pkg_id,
                    fact.identity.name,
                    fact.identity.arch,
                    fact.identity.version,
                    fact.identity.epoch.clone().unwrap_or_else(|| "0".to_string()),
                    fact.identity.release,
                ],
            )
            .map_err(to_sqlite_err)?;

        let mut stmt = self
            .conn
            .prepare_cached("INSERT INTO changelog (pkgKey, author, date, changelog) VALUES (?1, ?2, ?3, ?4)")
            .map_err(to_sqlite_err)?;
        for entry in &fact.changelogs {
            stmt.execute(params![pkg_key, entry.author, entry.date, entry.text]).map_err(to_sqlite_err)?;
        }
        Ok(())
    }

    fn close(self: Box<Self>, xml_checksum_hex: &str) -> RepoResult<()> {
        self.conn.execute_batch("COMMIT;").map_err(to_sqlite_err)?;
        schema::index_other_schema(&self.conn)?;
        schema::insert_db_info(&self.conn, xml_checksum_hex)?;
        Ok(())
    }
}
