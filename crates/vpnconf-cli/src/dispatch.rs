use std::sync::Arc;

use color_eyre::Result;
use serde_json::json;
use vpnconf_core::api as vpnconf_core;
use vpnconf_core::{
    AclRequest, CommandContext, CommandGroup, CommandInfo, ConfigAclRequest, ConfigImportRequest,
    ConfigManageRequest, ConfigRemoveRequest, ConfigShowRequest, ConfigsListRequest,
    ExecutionOutcome, GlobalOptions, ManageRequest, SystemEffects,
};

use crate::cli::{AclArgs, CommandGroupCli, ImportArgs, ManageArgs};

pub fn command_info(group: &CommandGroupCli) -> CommandInfo {
    match group {
        CommandGroupCli::ConfigImport(_) => {
            CommandInfo::new(CommandGroup::ConfigImport, "config-import")
        }
        CommandGroupCli::ConfigManage(_) => {
            CommandInfo::new(CommandGroup::ConfigManage, "config-manage")
        }
        CommandGroupCli::ConfigAcl(_) => CommandInfo::new(CommandGroup::ConfigAcl, "config-acl"),
        CommandGroupCli::ConfigShow(_) => CommandInfo::new(CommandGroup::ConfigShow, "config-show"),
        CommandGroupCli::ConfigRemove(_) => {
            CommandInfo::new(CommandGroup::ConfigRemove, "config-remove")
        }
        CommandGroupCli::ConfigsList => CommandInfo::new(CommandGroup::ConfigsList, "configs-list"),
    }
}

pub fn dispatch_command(
    ctx: &CommandContext,
    group: &CommandGroupCli,
) -> Result<(CommandInfo, ExecutionOutcome)> {
    let info = command_info(group);
    match group {
        CommandGroupCli::ConfigImport(args) => {
            let request = import_request_from_args(args);
            core_call(info, || vpnconf_core::config_import(ctx, &request))
        }
        CommandGroupCli::ConfigManage(args) => {
            let request = manage_request_from_args(args);
            core_call(info, || vpnconf_core::config_manage(ctx, &request))
        }
        CommandGroupCli::ConfigAcl(args) => {
            let request = acl_request_from_args(args);
            core_call(info, || vpnconf_core::config_acl(ctx, &request))
        }
        CommandGroupCli::ConfigShow(args) => {
            let request = ConfigShowRequest {
                path: args.target.path.clone(),
                json: ctx.global.json,
            };
            core_call(info, || vpnconf_core::config_show(ctx, &request))
        }
        CommandGroupCli::ConfigRemove(args) => {
            let request = ConfigRemoveRequest {
                path: args.target.path.clone(),
                force: args.force,
            };
            core_call(info, || vpnconf_core::config_remove(ctx, &request))
        }
        CommandGroupCli::ConfigsList => {
            core_call(info, || vpnconf_core::configs_list(ctx, ConfigsListRequest))
        }
    }
}

fn import_request_from_args(args: &ImportArgs) -> ConfigImportRequest {
    ConfigImportRequest {
        config: args.config.clone(),
        name: args.name.clone(),
        persistent: args.persistent,
        single_use: args.single_use,
    }
}

fn manage_request_from_args(args: &ManageArgs) -> ConfigManageRequest {
    ConfigManageRequest {
        path: args.target.path.clone(),
        changes: ManageRequest {
            alias: args.alias.clone(),
            delete_alias: args.alias_delete,
            rename: args.rename.clone(),
            persist_tun: args.persist_tun,
        },
    }
}

fn acl_request_from_args(args: &AclArgs) -> ConfigAclRequest {
    ConfigAclRequest {
        path: args.target.path.clone(),
        changes: AclRequest {
            grant: args.grant.clone(),
            revoke: args.revoke.clone(),
            lock_down: args.lock_down,
            public_access: args.public_access,
            seal: args.seal,
            show: args.show,
        },
        force: args.force,
    }
}

/// Builds the command context; a broken environment becomes a failure outcome.
pub fn open_context(global: &GlobalOptions) -> Result<CommandContext<'_>, ExecutionOutcome> {
    CommandContext::new(global, Arc::new(SystemEffects::new())).map_err(|err| internal_failure(&err))
}

fn core_call<F>(info: CommandInfo, action: F) -> Result<(CommandInfo, ExecutionOutcome)>
where
    F: FnOnce() -> anyhow::Result<ExecutionOutcome>,
{
    match action() {
        Ok(outcome) => Ok((info, outcome)),
        Err(err) => {
            tracing::debug!(command = info.name, error = %format!("{err:#}"), "command failed");
            Ok((info, internal_failure(&err)))
        }
    }
}

fn internal_failure(err: &anyhow::Error) -> ExecutionOutcome {
    let issues: Vec<String> = err.chain().map(std::string::ToString::to_string).collect();
    ExecutionOutcome::failure(
        err.to_string(),
        json!({
            "reason": "internal_error",
            "error": format!("{err:#}"),
            "issues": issues,
        }),
    )
}
