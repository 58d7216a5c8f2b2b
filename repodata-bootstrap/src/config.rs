// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Optional `--config <file>` TOML layer, supplying defaults that explicit
//! CLI flags still override (SPEC_FULL §3). Not named in spec §6 — a natural
//! extension of the teacher's layered config precedence (env/file/CLI),
//! scoped to flags §6 already defines.
//!
//! Caveat: `clap`'s derive API doesn't expose "was this flag explicitly
//! typed" without dropping to `ArgMatches`, so a file value only fills in a
//! flag that is still sitting at its clap default. A user who explicitly
//! re-types a flag's default value on the command line will see the file
//! value, not their own — a documented limitation, not a bug.

use crate::cli::Cli;
use repodata_domain::error::{RepoError, RepoResult};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_CHECKSUM: &str = "sha256";
const DEFAULT_CHANGELOG_LIMIT: usize = 10;
const DEFAULT_WORKERS: u32 = 5;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub baseurl: Option<String>,
    pub outputdir: Option<std::path::PathBuf>,
    pub excludes: Option<Vec<String>>,
    pub checksum: Option<String>,
    pub changelog_limit: Option<usize>,
    pub workers: Option<u32>,
    pub compress_type: Option<String>,
    pub database: Option<bool>,
    pub skip_symlinks: Option<bool>,
    pub retain_old: Option<u32>,
}

pub fn load_file_config(path: &Path) -> RepoResult<FileConfig> {
    config::Config::builder()
        .add_source(config::File::from(path))
        .build()
        .and_then(config::Config::try_deserialize)
        .map_err(|e| RepoError::BadArgument {
            arg: "--config".to_string(),
            reason: format!("failed to load `{}`: {e}", path.display()),
        })
}

/// Fills in any `Cli` field still at its clap default from `file`. Flags the
/// user actually typed always win.
pub fn apply_file_defaults(cli: &mut Cli, file: FileConfig) {
    if cli.baseurl.is_none() {
        cli.baseurl = file.baseurl;
    }
    if cli.outputdir.is_none() {
        cli.outputdir = file.outputdir;
    }
    if cli.excludes.is_empty() {
        if let Some(excludes) = file.excludes {
            cli.excludes = excludes;
        }
    }
    if cli.checksum == DEFAULT_CHECKSUM {
        if let Some(checksum) = file.checksum {
            cli.checksum = checksum;
        }
    }
    if cli.changelog_limit == DEFAULT_CHANGELOG_LIMIT {
        if let Some(limit) = file.changelog_limit {
            cli.changelog_limit = limit;
        }
    }
    if cli.workers == DEFAULT_WORKERS {
        if let Some(workers) = file.workers {
            cli.workers = workers;
        }
    }
    if cli.compress_type.is_none() {
        if let Some(compress_type) = file.compress_type {
            cli.compress_type = compress_type.parse().ok();
        }
    }
    if !cli.database {
        if let Some(database) = file.database {
            cli.database = database;
        }
    }
    if !cli.skip_symlinks {
        if let Some(skip_symlinks) = file.skip_symlinks {
            cli.skip_symlinks = skip_symlinks;
        }
    }
    if cli.retain_old.is_none() {
        cli.retain_old = file.retain_old;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli() -> Cli {
        Cli {
            directory: std::path::PathBuf::from("."),
            baseurl: None,
            outputdir: None,
            excludes: vec![],
            includepkg: vec![],
            pkglist: None,
            groupfile: None,
            update: false,
            update_md_path: None,
            skip_stat: false,
            checksum: DEFAULT_CHECKSUM.to_string(),
            changelog_limit: DEFAULT_CHANGELOG_LIMIT,
            workers: DEFAULT_WORKERS,
            unique_md_filenames: false,
            simple_md_filenames: false,
            xz: false,
            compress_type: None,
            database: false,
            no_database: false,
            skip_symlinks: false,
            retain_old: None,
            config: None,
            verbose: false,
        }
    }

    #[test]
    fn file_values_fill_in_unset_defaults() {
        let mut cli = base_cli();
        let file = FileConfig {
            baseurl: Some("https://example.test/repo".to_string()),
            workers: Some(8),
            ..FileConfig::default()
        };
        apply_file_defaults(&mut cli, file);
        assert_eq!(cli.baseurl.as_deref(), Some("https://example.test/repo"));
        assert_eq!(cli.workers, 8);
    }

    #[test]
    fn explicit_cli_values_are_not_overwritten() {
        let mut cli = base_cli();
        cli.workers = 20;
        let file = FileConfig { workers: Some(8), ..FileConfig::default() };
        apply_file_defaults(&mut cli, file);
        assert_eq!(cli.workers, 20);
    }
}
