//! Command handlers behind the `vpnconf` subcommands.
//!
//! Each handler returns an [`ExecutionOutcome`]; policy and merge failures
//! become user errors, and only unexpected failures (the store cannot be
//! opened, for example) surface as `Err`.

mod acl;
mod import;
mod list;
mod manage;
mod remove;
mod show;


pub use acl::{config_acl, ConfigAclRequest};
pub use import::{config_import, ConfigImportRequest};
pub use list::{configs_list, ConfigsListRequest};
pub use manage::{config_manage, ConfigManageRequest};
pub use remove::{config_remove, ConfigRemoveRequest};
pub use show::{config_show, ConfigShowRequest};

use vpnconf_domain::ProfileError;

use crate::core::tooling::outcome::ExecutionOutcome;

fn settle(result: Result<ExecutionOutcome, ProfileError>) -> ExecutionOutcome {
    result.unwrap_or_else(|err| ExecutionOutcome::from_profile_error(&err))
}
