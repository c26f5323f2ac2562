use std::path::PathBuf;

use anyhow::Result;
use serde_json::json;

use super::settle;
use crate::core::config::context::CommandContext;
use crate::core::import::{FollowMode, ImportRequest, ProfileSource};
use crate::core::tooling::outcome::ExecutionOutcome;

#[derive(Clone, Debug)]
pub struct ConfigImportRequest {
    pub config: PathBuf,
    pub name: Option<String>,
    pub persistent: bool,
    pub single_use: bool,
}

/// Imports a profile file, embedding everything it references.
///
/// # Errors
/// Returns an error if the configuration service cannot be reached.
pub fn config_import(
    ctx: &CommandContext,
    request: &ConfigImportRequest,
) -> Result<ExecutionOutcome> {
    let lifecycle = ctx.lifecycle()?;
    let name = request
        .name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| request.config.display().to_string());
    let import = ImportRequest {
        source: ProfileSource::File(request.config.clone()),
        name: name.clone(),
        single_use: request.single_use,
        persistent: request.persistent,
        mode: FollowMode::Full,
    };

    Ok(settle(
        lifecycle
            .ping()
            .and_then(|()| lifecycle.import(ctx.fs(), ctx.limits(), &import))
            .map(|report| {
                let mut lines = vec![format!(
                    "Configuration imported.  Configuration path: {}",
                    report.path
                )];
                lines.extend(report.warnings.iter().map(|warning| format!("Warning: {warning}")));
                ExecutionOutcome::success(
                    lines.join("\n"),
                    json!({
                        "path": report.path.to_string(),
                        "name": name,
                        "persistent": request.persistent,
                        "single_use": request.single_use,
                        "persist_tun": report.persist_tun,
                        "embedded": report
                            .embedded
                            .iter()
                            .map(|path| path.display().to_string())
                            .collect::<Vec<_>>(),
                        "warnings": report.warnings,
                    }),
                )
            }),
    ))
}
