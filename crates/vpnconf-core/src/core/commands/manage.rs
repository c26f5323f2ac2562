use anyhow::Result;
use serde_json::json;
use vpnconf_domain::{ProfileError, ProfilePath};

use super::settle;
use crate::core::access::{AccessControlPolicy, ManageRequest};
use crate::core::config::context::CommandContext;
use crate::core::lifecycle::ConfigLifecycle;
use crate::core::tooling::outcome::ExecutionOutcome;

#[derive(Clone, Debug)]
pub struct ConfigManageRequest {
    pub path: String,
    pub changes: ManageRequest,
}

/// Applies alias, name and persist-tun changes in that order.
///
/// # Errors
/// Returns an error if the configuration service cannot be reached.
pub fn config_manage(
    ctx: &CommandContext,
    request: &ConfigManageRequest,
) -> Result<ExecutionOutcome> {
    if let Err(err) = AccessControlPolicy::validate_manage(&request.changes) {
        return Ok(ExecutionOutcome::from_profile_error(&err));
    }
    let lifecycle = ctx.lifecycle()?;
    Ok(settle(apply(&lifecycle, request)))
}

fn apply(
    lifecycle: &ConfigLifecycle<'_>,
    request: &ConfigManageRequest,
) -> Result<ExecutionOutcome, ProfileError> {
    let path = ProfilePath::parse(&request.path)?;
    let changes = &request.changes;
    let mut lines = Vec::new();

    if let Some(alias) = &changes.alias {
        lifecycle.set_alias(path, alias)?;
        lines.push(format!("Alias set to '{alias}'"));
    }
    if changes.delete_alias {
        lifecycle.delete_alias(path)?;
        lines.push("Alias is deleted".to_string());
    }
    if let Some(name) = &changes.rename {
        lifecycle.rename(path, name)?;
        lines.push("Configuration renamed".to_string());
    }
    if let Some(enabled) = changes.persist_tun {
        lifecycle.set_persist_tun(path, enabled)?;
        lines.push(format!(
            "Persistent (seamless) tunnel is {}",
            if enabled { "enabled" } else { "disabled" }
        ));
    }

    let properties = lifecycle.properties(path)?;
    Ok(ExecutionOutcome::success(
        lines.join("\n"),
        json!({
            "path": path.to_string(),
            "name": properties.name,
            "alias": properties.alias,
            "persist_tun": properties.persist_tun,
        }),
    ))
}
