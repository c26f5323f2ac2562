use anyhow::Result;
use serde_json::json;
use vpnconf_domain::{MergeLimits, OptionList, ProfileError, ProfilePath};

use super::settle;
use crate::core::config::context::CommandContext;
use crate::core::lifecycle::ConfigLifecycle;
use crate::core::tooling::outcome::ExecutionOutcome;

const RULE: &str = "--------------------------------------------------";

#[derive(Clone, Debug)]
pub struct ConfigShowRequest {
    pub path: String,
    pub json: bool,
}

/// Shows a profile's metadata and content, or its directives as JSON.
///
/// # Errors
/// Returns an error if the configuration service cannot be reached.
pub fn config_show(ctx: &CommandContext, request: &ConfigShowRequest) -> Result<ExecutionOutcome> {
    let lifecycle = ctx.lifecycle()?;
    Ok(settle(render(&lifecycle, ctx.limits(), request)))
}

fn render(
    lifecycle: &ConfigLifecycle<'_>,
    limits: MergeLimits,
    request: &ConfigShowRequest,
) -> Result<ExecutionOutcome, ProfileError> {
    let path = ProfilePath::parse(&request.path)?;
    let properties = lifecycle.properties(path)?;
    let content = lifecycle.content(path)?;

    if request.json {
        let directives = match OptionList::parse(&content, &limits) {
            Ok(list) => list.to_json(),
            Err(err) => {
                return Ok(ExecutionOutcome::user_error(
                    format!("configuration cannot be rendered as JSON: {err}"),
                    json!({
                        "reason": "unparseable_profile",
                        "path": path.to_string(),
                    }),
                ));
            }
        };
        let rendered =
            serde_json::to_string_pretty(&directives).map_err(ProfileError::transport)?;
        return Ok(ExecutionOutcome::success(
            rendered,
            json!({
                "path": path.to_string(),
                "configuration": directives,
            }),
        ));
    }

    let yes_no = |flag: bool| if flag { "Yes" } else { "No" };
    let mut body = content.clone();
    if !body.is_empty() && !body.ends_with('\n') {
        body.push('\n');
    }
    let message = format!(
        "Configuration:\n                Name:       {}\n           Read only:  {}\n   Persistent config: {}\n   Persistent tunnel: {}\n{RULE}\n{body}{RULE}",
        properties.name,
        yes_no(properties.sealed),
        yes_no(properties.persistent),
        yes_no(properties.persist_tun),
    );
    Ok(ExecutionOutcome::success(
        message,
        json!({
            "path": path.to_string(),
            "properties": properties,
            "content": content,
        }),
    ))
}
