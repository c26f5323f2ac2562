use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use vpnconf_domain::{MergeError, ProfileError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: CommandStatus,
    pub message: String,
    #[serde(default)]
    pub details: Value,
}

impl ExecutionOutcome {
    pub fn success(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Ok,
            message: message.into(),
            details,
        }
    }

    pub fn failure(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Failure,
            message: message.into(),
            details,
        }
    }

    pub fn user_error(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::UserError,
            message: message.into(),
            details,
        }
    }

    pub fn partial_failure(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::PartialFailure,
            message: message.into(),
            details,
        }
    }

    /// Maps a service-level error onto the outcome a command reports.
    ///
    /// Transport failures are command failures; everything else is the
    /// caller's to fix.
    #[must_use]
    pub fn from_profile_error(err: &ProfileError) -> Self {
        let mut details = json!({
            "reason": err.reason(),
            "code": err.code(),
        });
        if let ProfileError::Merge(merge) = err {
            details["constraint"] = Value::String(merge.constraint().to_string());
            if let Some(hint) = merge_hint(merge) {
                details["hint"] = Value::String(hint.to_string());
            }
        }
        if err.is_transport() {
            Self::failure(err.to_string(), details)
        } else {
            Self::user_error(err.to_string(), details)
        }
    }
}

fn merge_hint(err: &MergeError) -> Option<&'static str> {
    match err {
        MergeError::ProfileTooLarge { .. } | MergeError::OptionBudgetExceeded { .. } => {
            Some("raise VPNCONF_MAX_PROFILE_SIZE or trim the profile")
        }
        MergeError::LineTooLong { .. } => Some("raise VPNCONF_MAX_LINE_SIZE or shorten the line"),
        MergeError::UnresolvedReference { .. } | MergeError::MissingFileArgument { .. } => {
            Some("check that every referenced file exists next to the profile")
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CommandStatus {
    Ok,
    UserError,
    Failure,
    PartialFailure,
}
