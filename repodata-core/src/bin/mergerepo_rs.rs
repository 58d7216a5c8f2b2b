// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! `mergerepo-rs`: combine N repos' `repodata/` into one (spec §4.6.5).

use anyhow::Context;
use clap::Parser;
use repodata_bootstrap::cli::{self, AdmissionPolicyArg, MergeCli};
use repodata_bootstrap::exit_code::ExitCode;
use repodata_bootstrap::logger;
use repodata_core::merger::{self, AdmissionPolicy, MergeRequest};
use repodata_core::old_metadata::XmlOldMetadataLoader;
use repodata_core::pipeline::config::MergeBuildConfig;

fn main() {
    let cli = MergeCli::parse();
    logger::init_subscriber(cli.verbose);
    std::process::exit(run(cli));
}

fn to_admission_policy(arg: AdmissionPolicyArg) -> AdmissionPolicy {
    match arg {
        AdmissionPolicyArg::RepoFirst => AdmissionPolicy::RepoFirst,
        AdmissionPolicyArg::Timestamp => AdmissionPolicy::Timestamp,
        AdmissionPolicyArg::Nvr => AdmissionPolicy::Nvr,
        AdmissionPolicyArg::All => AdmissionPolicy::All,
    }
}

fn run(cli: MergeCli) -> i32 {
    let validated = match cli::validate_merge_cli(cli) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::from_error(&e).as_i32();
        }
    };

    let loader = XmlOldMetadataLoader;
    let request = MergeRequest {
        repo_dirs: &validated.repos,
        arch_filter: validated.arch_filter.as_deref(),
        blocked_srpms: validated.blocked_srpms.as_ref(),
        noarch_override_repo: validated.noarch_override_repo.as_deref(),
        policy: to_admission_policy(validated.policy),
    };

    let facts = match merger::merge(request, &loader).context("merge failed") {
        Ok(facts) => facts,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::Failure.as_i32();
        }
    };
    tracing::info!(packages = facts.len(), "merge admission complete");

    let cfg = MergeBuildConfig {
        output_dir: validated.output_dir,
        base_url: None,
        checksum_algorithm: validated.checksum_algorithm,
        legacy_sha_alias: false,
        compress_type: repodata_domain::value_objects::compression::CompressionType::Gzip,
        database: validated.database,
        unique_md_filenames: false,
        retain_old: None,
    };

    match repodata_core::build::run_merged(facts, &cfg).context("publish failed") {
        Ok(published) => {
            tracing::info!(path = %published.display(), "published merged repodata");
            ExitCode::Success.as_i32()
        }
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::Failure.as_i32()
        }
    }
}
