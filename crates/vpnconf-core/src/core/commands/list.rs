use anyhow::Result;
use serde_json::json;
use time::macros::format_description;
use time::OffsetDateTime;
use vpnconf_domain::ProfileProperties;

use super::settle;
use crate::core::config::context::CommandContext;
use crate::core::lifecycle::ConfigLifecycle;
use crate::core::tooling::outcome::ExecutionOutcome;

const NAME_WIDTH: usize = 32;
const ALIAS_WIDTH: usize = 26;
const RULE_WIDTH: usize = NAME_WIDTH + ALIAS_WIDTH + 18 + 2;

#[derive(Clone, Debug, Default)]
pub struct ConfigsListRequest;

/// Lists every profile the caller may see.
///
/// # Errors
/// Returns an error if the configuration service cannot be reached.
pub fn configs_list(ctx: &CommandContext, _request: ConfigsListRequest) -> Result<ExecutionOutcome> {
    let lifecycle = ctx.lifecycle()?;
    Ok(settle(lifecycle.list().map(|profiles| {
        let rows: Vec<_> = profiles
            .iter()
            .map(|profile| json!({
                "path": profile.path.to_string(),
                "name": profile.name,
                "alias": profile.alias,
                "owner": profile.owner.uid(),
                "owner_name": lifecycle.display_name(profile.owner),
                "import_timestamp": profile.import_timestamp,
                "last_used_timestamp": profile.last_used_timestamp,
                "used_count": profile.used_count,
                "sealed": profile.sealed,
                "persistent": profile.persistent,
            }))
            .collect();
        ExecutionOutcome::success(render_table(&lifecycle, &profiles), json!({ "configurations": rows }))
    })))
}

fn render_table(lifecycle: &ConfigLifecycle<'_>, profiles: &[ProfileProperties]) -> String {
    let rule = "-".repeat(RULE_WIDTH);
    let mut lines = vec![
        "Configuration path".to_string(),
        format!("{:<NAME_WIDTH$}{:<ALIAS_WIDTH$}Used", "Imported", "Last used"),
        format!("{:<NAME_WIDTH$}{:<ALIAS_WIDTH$}Owner", "Name", "Alias"),
        rule.clone(),
    ];
    for (idx, profile) in profiles.iter().enumerate() {
        if idx > 0 {
            lines.push(String::new());
        }
        let last_used = if profile.last_used_timestamp > 0 {
            format_timestamp(profile.last_used_timestamp)
        } else {
            String::new()
        };
        lines.push(profile.path.to_string());
        lines.push(format!(
            "{:<NAME_WIDTH$}{:<ALIAS_WIDTH$}{}",
            format_timestamp(profile.import_timestamp),
            last_used,
            profile.used_count
        ));
        lines.push(format!(
            "{:<NAME_WIDTH$}{:<ALIAS_WIDTH$}{}",
            profile.name,
            profile.alias.as_deref().unwrap_or_default(),
            lifecycle.display_name(profile.owner)
        ));
    }
    lines.push(rule);
    lines.join("\n")
}

pub(crate) fn format_timestamp(timestamp: u64) -> String {
    let format = format_description!(
        "[weekday repr:short] [month repr:short] [day padding:space] [hour]:[minute]:[second] [year]"
    );
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
        .and_then(|stamp| stamp.format(&format).ok())
        .unwrap_or_else(|| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_render_like_asctime_in_utc() {
        assert_eq!(format_timestamp(0), "Thu Jan  1 00:00:00 1970");
        assert_eq!(format_timestamp(1_700_000_000), "Tue Nov 14 22:13:20 2023");
    }
}
