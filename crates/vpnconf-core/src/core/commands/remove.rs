use anyhow::Result;
use serde_json::json;
use vpnconf_domain::ProfilePath;

use super::settle;
use crate::core::config::context::CommandContext;
use crate::core::confirm::Confirmation;
use crate::core::tooling::outcome::ExecutionOutcome;

#[derive(Clone, Debug)]
pub struct ConfigRemoveRequest {
    pub path: String,
    pub force: bool,
}

/// Deletes a profile after confirmation; a declined prompt is not an error.
///
/// # Errors
/// Returns an error if the configuration service cannot be reached.
pub fn config_remove(
    ctx: &CommandContext,
    request: &ConfigRemoveRequest,
) -> Result<ExecutionOutcome> {
    let lifecycle = ctx.lifecycle()?;
    let confirmer = ctx.confirmer(request.force);
    Ok(settle(ProfilePath::parse(&request.path).and_then(|path| {
        lifecycle.ping()?;
        let answer = lifecycle.remove(path, confirmer)?;
        let removed = answer == Confirmation::Affirmed;
        let message = if removed {
            "Configuration removed."
        } else {
            "Configuration profile delete operation cancelled"
        };
        Ok(ExecutionOutcome::success(
            message,
            json!({
                "path": path.to_string(),
                "removed": removed,
                "cancelled": !removed,
            }),
        ))
    })))
}
