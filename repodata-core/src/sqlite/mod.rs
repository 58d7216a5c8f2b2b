// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

pub mod filelists_db;
pub mod other_db;
pub mod primary_db;
pub mod schema;
