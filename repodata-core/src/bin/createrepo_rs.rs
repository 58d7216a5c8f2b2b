// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! `createrepo-rs`: build `repodata/` for a directory of RPMs (spec §2, §6).

use anyhow::Context;
use clap::Parser;
use repodata_bootstrap::cli::{self, Cli};
use repodata_bootstrap::exit_code::ExitCode;
use repodata_bootstrap::{config, logger, shutdown};
use repodata_core::pipeline::config::BuildConfig;
use repodata_domain::value_objects::compression::CompressionType;

fn main() {
    let mut cli = Cli::parse();
    if let Some(path) = cli.config.clone() {
        match config::load_file_config(&path) {
            Ok(file) => config::apply_file_defaults(&mut cli, file),
            Err(e) => {
                eprintln!("error loading --config: {e}");
                std::process::exit(ExitCode::Failure.as_i32());
            }
        }
    }
    logger::init_subscriber(cli.verbose);
    std::process::exit(run(cli));
}

fn run(cli: Cli) -> i32 {
    let validated = match cli::validate_cli(cli) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::from_error(&e).as_i32();
        }
    };

    let cfg = BuildConfig {
        input_dir: validated.input_dir,
        output_dir: validated.output_dir,
        base_url: validated.base_url,
        excludes: validated.excludes,
        includepkg: validated.includepkg,
        pkglist: validated.pkglist,
        groupfile: validated.groupfile,
        update: validated.update,
        update_md_path: validated.update_md_path,
        skip_stat: validated.skip_stat,
        checksum_algorithm: validated.checksum_algorithm,
        legacy_sha_alias: validated.legacy_sha_alias,
        changelog_limit: BuildConfig::clamp_changelog_limit(validated.changelog_limit),
        workers: validated.workers,
        unique_md_filenames: validated.unique_md_filenames,
        compress_type: if validated.compress_type == CompressionType::None {
            CompressionType::Gzip
        } else {
            validated.compress_type
        },
        database: validated.database,
        skip_symlinks: validated.skip_symlinks,
        retain_old: validated.retain_old,
    };

    let guard = match shutdown::ShutdownGuard::install() {
        Ok(g) => g,
        Err(e) => {
            tracing::error!("failed to install SIGINT handler: {e}");
            return ExitCode::Failure.as_i32();
        }
    };
    guard.track(cfg.output_dir.join(repodata_core::retention::STAGING_DIR_NAME));

    match repodata_core::build::run(&cfg).context("build failed") {
        Ok(published) => {
            guard.clear();
            tracing::info!(path = %published.display(), "published repodata");
            ExitCode::Success.as_i32()
        }
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::Failure.as_i32()
        }
    }
}
