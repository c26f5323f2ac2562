use anyhow::Result;
use serde_json::{json, Value};
use vpnconf_domain::{ProfileError, ProfilePath, ProfileProperties};

use crate::core::access::{AccessControlPolicy, AclRequest};
use crate::core::config::context::CommandContext;
use crate::core::confirm::{Confirmation, Confirmer};
use crate::core::lifecycle::{AclAction, BatchItem, BatchReport, ConfigLifecycle};
use crate::core::tooling::outcome::ExecutionOutcome;

#[derive(Clone, Debug)]
pub struct ConfigAclRequest {
    pub path: String,
    pub changes: AclRequest,
    pub force: bool,
}

/// Runs grant, revoke, lock-down, public-access, seal and show in that
/// order. Failed grant/revoke items do not stop the request; any other
/// failure does.
///
/// # Errors
/// Returns an error if the configuration service cannot be reached.
pub fn config_acl(ctx: &CommandContext, request: &ConfigAclRequest) -> Result<ExecutionOutcome> {
    if let Err(err) = AccessControlPolicy::validate_acl(&request.changes) {
        return Ok(ExecutionOutcome::from_profile_error(&err));
    }
    let path = match ProfilePath::parse(&request.path) {
        Ok(path) => path,
        Err(err) => return Ok(ExecutionOutcome::from_profile_error(&err)),
    };
    let lifecycle = ctx.lifecycle()?;
    if let Err(err) = lifecycle.properties(path) {
        return Ok(ExecutionOutcome::from_profile_error(&err));
    }

    let mut run = AclRun::new(&lifecycle, path);
    let confirmer = ctx.confirmer(request.force);
    Ok(match run.execute(&request.changes, confirmer) {
        Ok(()) => run.finish(),
        Err(err) => run.abort(&err),
    })
}

struct AclRun<'l, 'a> {
    lifecycle: &'l ConfigLifecycle<'a>,
    path: ProfilePath,
    lines: Vec<String>,
    failures: Vec<String>,
    batches: Vec<Value>,
    sealed: Option<bool>,
    shown: Option<Value>,
}

impl<'l, 'a> AclRun<'l, 'a> {
    fn new(lifecycle: &'l ConfigLifecycle<'a>, path: ProfilePath) -> Self {
        Self {
            lifecycle,
            path,
            lines: Vec::new(),
            failures: Vec::new(),
            batches: Vec::new(),
            sealed: None,
            shown: None,
        }
    }

    fn execute(
        &mut self,
        changes: &AclRequest,
        confirmer: &dyn Confirmer,
    ) -> Result<(), ProfileError> {
        if !changes.grant.is_empty() {
            let report = self.lifecycle.grant(self.path, &changes.grant);
            self.record_batch(&report);
        }
        if !changes.revoke.is_empty() {
            let report = self.lifecycle.revoke(self.path, &changes.revoke);
            self.record_batch(&report);
        }
        if let Some(enabled) = changes.lock_down {
            self.lifecycle.set_locked_down(self.path, enabled)?;
            self.lines.push(
                if enabled {
                    "Configuration has been locked down"
                } else {
                    "Configuration has been opened up"
                }
                .to_string(),
            );
        }
        if let Some(enabled) = changes.public_access {
            self.lifecycle.set_public_access(self.path, enabled)?;
            self.lines.push(
                if enabled {
                    "Configuration is now readable to everyone"
                } else {
                    "Configuration is now readable to only specific users"
                }
                .to_string(),
            );
        }
        if changes.seal {
            let answer = self.lifecycle.seal(self.path, confirmer)?;
            let affirmed = answer == Confirmation::Affirmed;
            self.sealed = Some(affirmed);
            self.lines.push(
                if affirmed {
                    "Configuration has been sealed."
                } else {
                    "--seal operation has been cancelled"
                }
                .to_string(),
            );
        }
        if changes.show {
            let properties = self.lifecycle.properties(self.path)?;
            let rendered = self.render_show(&properties);
            self.lines.extend(rendered);
            self.shown = Some(self.show_details(&properties));
        }
        Ok(())
    }

    fn record_batch(&mut self, report: &BatchReport) {
        let flag = match report.action {
            AclAction::Grant => "--grant",
            AclAction::Revoke => "--revoke",
        };
        for item in &report.items {
            match (&item.result, item.principal) {
                (Ok(_), Some(uid)) => self.lines.push(match report.action {
                    AclAction::Grant => {
                        format!("Granted access to {} (uid {uid})", who(item))
                    }
                    AclAction::Revoke => {
                        format!("Access revoked from {} (uid {uid})", who(item))
                    }
                }),
                (Err(ProfileError::InvalidIdentity(_)), _) | (Ok(_), None) => {
                    self.failures.push(format!(
                        "** ERROR ** {flag} {} does not map to a valid user account",
                        item.identity
                    ));
                }
                (Err(err), uid) => {
                    let verb = match report.action {
                        AclAction::Grant => "Failed granting access to",
                        AclAction::Revoke => "Failed revoking access from",
                    };
                    let uid = uid.map_or_else(String::new, |uid| format!(" (uid {uid})"));
                    self.failures
                        .push(format!("{verb} {}{uid}: {err}", who(item)));
                }
            }
        }
        self.batches.push(json!({
            "action": report.action,
            "succeeded": report.succeeded(),
            "failed": report.failed(),
            "items": report.items.iter().map(item_json).collect::<Vec<_>>(),
        }));
    }

    fn render_show(&self, properties: &ProfileProperties) -> Vec<String> {
        let yes_no = |flag: bool| if flag { "yes" } else { "no" };
        let mut lines = vec![
            format!("    Configuration name: {}", properties.name),
            format!(
                "                 Owner: ({})  {}",
                properties.owner,
                self.lifecycle.display_name(properties.owner)
            ),
            format!("             Read-only: {}", yes_no(properties.sealed)),
            format!("           Locked down: {}", yes_no(properties.locked_down)),
            format!("         Public access: {}", yes_no(properties.public_access)),
        ];
        if !properties.public_access {
            let count = properties.acl.len();
            lines.push(format!(
                "  Users granted access: {count} {}",
                if count == 1 { "user" } else { "users" }
            ));
            for uid in &properties.acl {
                lines.push(format!(
                    "                        - ({uid})  {}",
                    self.lifecycle.display_name(*uid)
                ));
            }
        }
        lines
    }

    fn show_details(&self, properties: &ProfileProperties) -> Value {
        json!({
            "name": properties.name,
            "owner": properties.owner.uid(),
            "owner_name": self.lifecycle.display_name(properties.owner),
            "read_only": properties.sealed,
            "locked_down": properties.locked_down,
            "public_access": properties.public_access,
            "acl": properties
                .acl
                .iter()
                .map(|uid| json!({
                    "uid": uid.uid(),
                    "name": self.lifecycle.display_name(*uid),
                }))
                .collect::<Vec<_>>(),
        })
    }

    fn details(&self) -> Value {
        json!({
            "path": self.path.to_string(),
            "batches": self.batches,
            "failures": self.failures,
            "sealed": self.sealed,
            "show": self.shown,
        })
    }

    fn finish(self) -> ExecutionOutcome {
        let mut lines = self.lines.clone();
        lines.extend(self.failures.iter().cloned());
        let message = lines.join("\n");
        if self.failures.is_empty() {
            ExecutionOutcome::success(message, self.details())
        } else {
            ExecutionOutcome::partial_failure(message, self.details())
        }
    }

    fn abort(self, err: &ProfileError) -> ExecutionOutcome {
        let mut outcome = ExecutionOutcome::from_profile_error(err);
        outcome.details["path"] = Value::String(self.path.to_string());
        outcome.details["completed"] = json!(self.lines);
        outcome.details["failures"] = json!(self.failures);
        outcome
    }
}

fn who(item: &BatchItem) -> &str {
    item.display_name.as_deref().unwrap_or(item.identity.as_str())
}

fn item_json(item: &BatchItem) -> Value {
    match &item.result {
        Ok(changed) => json!({
            "identity": item.identity,
            "uid": item.principal.map(|p| p.uid()),
            "changed": changed,
        }),
        Err(err) => json!({
            "identity": item.identity,
            "uid": item.principal.map(|p| p.uid()),
            "error": err.to_string(),
            "reason": err.reason(),
        }),
    }
}
