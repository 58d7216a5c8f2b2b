// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Process exit codes (spec §6: "Exit code 0 on success, 1 on argument or
//! IO error"). Unlike the teacher's BSD `sysexits.h`-style enum, every
//! `RepoError` variant maps to the same code — the spec draws no finer
//! distinction than success/failure, so adding one here would be inventing
//! behavior no caller can observe.

use repodata_domain::error::RepoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ExitCode {
    #[default]
    Success = 0,
    Failure = 1,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_error(error: &RepoError) -> Self {
        debug_assert_eq!(error.exit_code(), 1, "RepoError::exit_code is always 1 per spec §6");
        ExitCode::Failure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_zero_and_failure_is_one() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::Failure.as_i32(), 1);
    }

    #[test]
    fn every_error_variant_maps_to_failure() {
        let err = RepoError::BadArgument { arg: "x".into(), reason: "y".into() };
        assert_eq!(ExitCode::from_error(&err), ExitCode::Failure);
    }
}
