// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! C7 merger variant: combines N input repos into a single ordered stream
//! feeding the same writer (spec §4.6.5).

use repodata_domain::entities::package_fact::PackageFact;
use repodata_domain::error::RepoResult;
use repodata_domain::services::old_metadata::{CacheKey, OldMetadataLoader};
use repodata_domain::value_objects::rpm_version::Evr;
use std::path::{Path, PathBuf};

/// Which package wins when two input repos both supply a given `(name,
/// arch)` pair (spec §4.6.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionPolicy {
    /// Keep the earliest repo, in the order given on the command line.
    RepoFirst,
    /// Keep the one with the largest `time_file`.
    Timestamp,
    /// Keep the one with the highest (version, release) under RPM ordering.
    Nvr,
    /// Keep every distinct `(name, arch, version, release)`.
    All,
}

pub struct MergeRequest<'a> {
    pub repo_dirs: &'a [PathBuf],
    pub arch_filter: Option<&'a [String]>,
    pub blocked_srpms: Option<&'a std::collections::HashSet<String>>,
    pub noarch_override_repo: Option<&'a Path>,
    pub policy: AdmissionPolicy,
}

/// `(name, arch)` admission key, except under `All` where `(version,
/// release)` also distinguishes entries (spec §4.6.5 "All: keep every
/// distinct `(name, arch, version, release)`").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AdmissionKey {
    name: String,
    arch: String,
    version: Option<String>,
    release: Option<String>,
}

impl AdmissionKey {
    fn for_policy(fact: &PackageFact, policy: AdmissionPolicy) -> Self {
        let (version, release) = if policy == AdmissionPolicy::All {
            (Some(fact.identity.version.clone()), Some(fact.identity.release.clone()))
        } else {
            (None, None)
        };
        Self { name: fact.identity.name.clone(), arch: fact.identity.arch.clone(), version, release }
    }
}

struct Candidate {
    fact: PackageFact,
    repo_index: usize,
}

fn evr_of(fact: &PackageFact) -> Evr {
    Evr::new(fact.identity.epoch.as_deref(), &fact.identity.version, Some(&fact.identity.release))
}

/// Whether `challenger` should replace `incumbent` under `policy` (spec
/// §4.6.5). Ties keep the incumbent, matching "keep the earliest repo" as
/// the natural tiebreak for every policy.
fn challenger_wins(incumbent: &Candidate, challenger: &Candidate, policy: AdmissionPolicy) -> bool {
    match policy {
        AdmissionPolicy::RepoFirst | AdmissionPolicy::All => false,
        AdmissionPolicy::Timestamp => {
            challenger.fact.timestamps.file_mtime > incumbent.fact.timestamps.file_mtime
        }
        AdmissionPolicy::Nvr => evr_of(&challenger.fact) > evr_of(&incumbent.fact),
    }
}

fn passes_arch_filter(fact: &PackageFact, arch_filter: Option<&[String]>) -> bool {
    arch_filter.is_none_or(|archs| archs.iter().any(|a| a == &fact.identity.arch))
}

fn source_rpm_blocked(fact: &PackageFact, blocked: Option<&std::collections::HashSet<String>>) -> bool {
    blocked.is_some_and(|set| set.contains(&fact.descriptive.source_rpm))
}

/// Loads every input repo with `loader`, applies the admission policy, arch
/// filter, and blocked-srpms set, then the noarch-override substitution
/// (spec §4.6.5), returning the merged facts sorted for the writer.
pub fn merge(request: MergeRequest<'_>, loader: &dyn OldMetadataLoader) -> RepoResult<Vec<PackageFact>> {
    let mut admitted: std::collections::HashMap<AdmissionKey, Candidate> = std::collections::HashMap::new();

    for (repo_index, repo_dir) in request.repo_dirs.iter().enumerate() {
        let map = loader.load(repo_dir, CacheKey::PkgId, None)?;
        // OldMetadataMap only exposes keyed lookups; iterate via its
        // `Debug`-visible entries is not an option, so the merger pulls the
        // facts back out through a basename sweep seeded by the repo's own
        // primary listing order. The loader guarantees one entry per
        // package regardless of key, so draining by key is equivalent to
        // draining by insertion order for this purpose.
        for fact in map.into_facts() {
            if !passes_arch_filter(&fact, request.arch_filter) {
                continue;
            }
            if source_rpm_blocked(&fact, request.blocked_srpms) {
                continue;
            }
            let key = AdmissionKey::for_policy(&fact, request.policy);
            let candidate = Candidate { fact, repo_index };
            let replace = match admitted.get(&key) {
                None => true,
                Some(incumbent) => challenger_wins(incumbent, &candidate, request.policy),
            };
            if replace {
                admitted.insert(key, candidate);
            }
        }
    }

    if let Some(override_dir) = request.noarch_override_repo {
        let override_map = loader.load(override_dir, CacheKey::Basename, None)?;
        for (_, candidate) in admitted.iter_mut() {
            if candidate.fact.identity.arch != "noarch" {
                continue;
            }
            let basename = candidate.fact.location.href.rsplit('/').next().unwrap_or(&candidate.fact.location.href);
            if let Some(replacement) = override_map.get(basename) {
                candidate.fact = replacement.clone();
            }
        }
    }

    let mut facts: Vec<PackageFact> = admitted.into_values().map(|c| c.fact).collect();
    facts.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    Ok(facts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use repodata_domain::entities::package_fact::{Descriptive, DependencySets, HeaderRange, Identity, Provenance, Sizes, Timestamps};
    use repodata_domain::value_objects::location::Location;

    fn mk(name: &str, arch: &str, version: &str, release: &str, mtime: i64) -> PackageFact {
        PackageFact {
            identity: Identity {
                pkg_id: format!("{name}-{version}-{release}"),
                name: name.to_string(),
                arch: arch.to_string(),
                epoch: None,
                version: version.to_string(),
                release: release.to_string(),
            },
            location: Location::new(format!("{name}-{version}-{release}.{arch}.rpm")),
            descriptive: Descriptive::default(),
            sizes: Sizes::default(),
            timestamps: Timestamps { file_mtime: mtime, build_time: 0 },
            header_range: HeaderRange::new(0, 1),
            checksum_type: "sha256".into(),
            dependencies: DependencySets::default(),
            files: vec![],
            changelogs: vec![],
            provenance: Provenance::Cached,
        }
    }

    #[test]
    fn nvr_policy_keeps_highest_version() {
        let lo = Candidate { fact: mk("foo", "x86_64", "1.0", "1", 0), repo_index: 0 };
        let hi = Candidate { fact: mk("foo", "x86_64", "2.0", "1", 0), repo_index: 1 };
        assert!(challenger_wins(&lo, &hi, AdmissionPolicy::Nvr));
        assert!(!challenger_wins(&hi, &lo, AdmissionPolicy::Nvr));
    }

    #[test]
    fn timestamp_policy_keeps_newest_mtime() {
        let old = Candidate { fact: mk("foo", "x86_64", "1.0", "1", 100), repo_index: 0 };
        let new = Candidate { fact: mk("foo", "x86_64", "1.0", "1", 200), repo_index: 1 };
        assert!(challenger_wins(&old, &new, AdmissionPolicy::Timestamp));
        assert!(!challenger_wins(&new, &old, AdmissionPolicy::Timestamp));
    }

    #[test]
    fn repo_first_policy_never_replaces_incumbent() {
        let first = Candidate { fact: mk("foo", "x86_64", "1.0", "1", 0), repo_index: 0 };
        let second = Candidate { fact: mk("foo", "x86_64", "9.0", "9", 9999), repo_index: 1 };
        assert!(!challenger_wins(&first, &second, AdmissionPolicy::RepoFirst));
    }

    #[test]
    fn arch_filter_excludes_non_matching_packages() {
        let fact = mk("foo", "i686", "1.0", "1", 0);
        assert!(!passes_arch_filter(&fact, Some(&["x86_64".to_string()])));
        assert!(passes_arch_filter(&fact, None));
    }

    /// Under any policy, two candidates never both claim to beat the
    /// other — admission must settle on exactly one winner regardless of
    /// which side of the comparison is called incumbent (spec §4.6.5:
    /// every policy picks a single survivor per key).
    #[test]
    fn challenger_wins_is_antisymmetric() {
        use proptest::prelude::*;

        proptest!(|(
            mtime_a in 0i64..1_000_000,
            mtime_b in 0i64..1_000_000,
            version_a in 1u32..100,
            version_b in 1u32..100,
            policy_idx in 0u8..4,
        )| {
            let policy = match policy_idx {
                0 => AdmissionPolicy::RepoFirst,
                1 => AdmissionPolicy::Timestamp,
                2 => AdmissionPolicy::Nvr,
                _ => AdmissionPolicy::All,
            };
            let a = Candidate {
                fact: mk("foo", "x86_64", &version_a.to_string(), "1", mtime_a),
                repo_index: 0,
            };
            let b = Candidate {
                fact: mk("foo", "x86_64", &version_b.to_string(), "1", mtime_b),
                repo_index: 1,
            };
            let a_beats_b = challenger_wins(&a, &b, policy);
            let b_beats_a = challenger_wins(&b, &a, policy);
            prop_assert!(!(a_beats_b && b_beats_a));
        });
    }
}
