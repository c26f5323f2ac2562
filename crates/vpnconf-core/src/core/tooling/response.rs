use std::fmt;

use serde_json::{json, Value};

use super::diagnostics::commands;
use super::outcome::{CommandStatus, ExecutionOutcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandGroup {
    ConfigImport,
    ConfigManage,
    ConfigAcl,
    ConfigShow,
    ConfigRemove,
    ConfigsList,
}

impl CommandGroup {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            CommandGroup::ConfigImport => commands::IMPORT,
            CommandGroup::ConfigManage => commands::MANAGE,
            CommandGroup::ConfigAcl => commands::ACL,
            CommandGroup::ConfigShow => commands::SHOW,
            CommandGroup::ConfigRemove => commands::REMOVE,
            CommandGroup::ConfigsList => commands::LIST,
        }
    }
}

impl fmt::Display for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandGroup::ConfigImport => "config-import",
            CommandGroup::ConfigManage => "config-manage",
            CommandGroup::ConfigAcl => "config-acl",
            CommandGroup::ConfigShow => "config-show",
            CommandGroup::ConfigRemove => "config-remove",
            CommandGroup::ConfigsList => "configs-list",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CommandInfo {
    pub group: CommandGroup,
    pub name: &'static str,
}

impl CommandInfo {
    #[must_use]
    pub const fn new(group: CommandGroup, name: &'static str) -> Self {
        Self { group, name }
    }
}

#[must_use]
pub fn to_json_response(info: CommandInfo, outcome: &ExecutionOutcome, code: i32) -> Value {
    let status = match outcome.status {
        CommandStatus::Ok => "ok",
        CommandStatus::UserError => "user-error",
        CommandStatus::Failure => "error",
        CommandStatus::PartialFailure => "partial-failure",
    };
    let details = match &outcome.details {
        Value::Object(_) => outcome.details.clone(),
        Value::Null => json!({}),
        other => json!({ "value": other }),
    };
    json!({
        "status": status,
        "message": format_status_message(info, &outcome.message),
        "command": info.group.code(),
        "exit_code": code,
        "details": details,
    })
}

#[must_use]
pub fn format_status_message(info: CommandInfo, message: &str) -> String {
    let group_name = info.group.to_string();
    let prefix = if group_name == info.name {
        format!("vpnconf {}", info.name)
    } else {
        format!("vpnconf {} {}", group_name, info.name)
    };
    if message.is_empty() {
        prefix
    } else if message.starts_with(&prefix) {
        message.to_string()
    } else {
        format!("{prefix}: {message}")
    }
}
