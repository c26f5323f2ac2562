use std::fmt::Display;

use crate::identity::Principal;
use crate::profile::ProfilePath;

/// Diagnostic codes carried by [`ProfileError`] messages.
pub mod codes {
    pub const MERGE: &str = "VC210";
    pub const INVALID_IDENTITY: &str = "VC220";
    pub const SEALED: &str = "VC230";
    pub const ALREADY_SEALED: &str = "VC231";
    pub const NOT_FOUND: &str = "VC240";
    pub const UNAUTHORIZED: &str = "VC250";
    pub const CONTENT_RESTRICTED: &str = "VC251";
    pub const TRANSPORT: &str = "VC260";
    pub const INVALID_REQUEST: &str = "VC270";
}

/// Reasons a profile could not be merged into a self-contained document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    #[error("profile is too large ({size} bytes, limit {limit})")]
    ProfileTooLarge { size: usize, limit: usize },
    #[error("line {line} of {origin} is {length} bytes long (limit {limit})")]
    LineTooLong {
        origin: String,
        line: usize,
        length: usize,
        limit: usize,
    },
    #[error("directive '{directive}...' exceeds {limit} bytes")]
    DirectiveTooLong { directive: String, limit: usize },
    #[error("profile is too large (option overhead {used} exceeds {limit})")]
    OptionBudgetExceeded { used: usize, limit: usize },
    #[error("'{directive}' requires a file argument")]
    MissingFileArgument { directive: String },
    #[error("'{directive}' references {file}, which cannot be read: {reason}")]
    UnresolvedReference {
        directive: String,
        file: String,
        reason: String,
    },
    #[error("'{directive}' references {file}, which is outside of {base}")]
    ReferenceOutsideBase {
        directive: String,
        file: String,
        base: String,
    },
    #[error("include cycle detected at {file}")]
    IncludeCycle { file: String },
    #[error("{file} is nested deeper than {limit} includes")]
    IncludeTooDeep { file: String, limit: usize },
}

impl MergeError {
    /// Names the limit or rule that was violated.
    #[must_use]
    pub fn constraint(&self) -> &'static str {
        match self {
            Self::ProfileTooLarge { .. } | Self::OptionBudgetExceeded { .. } => "max_profile_size",
            Self::LineTooLong { .. } => "max_line_size",
            Self::DirectiveTooLong { .. } => "max_directive_size",
            Self::MissingFileArgument { .. } | Self::UnresolvedReference { .. } => {
                "unresolved_reference"
            }
            Self::ReferenceOutsideBase { .. } => "follow_mode",
            Self::IncludeCycle { .. } => "include_cycle",
            Self::IncludeTooDeep { .. } => "max_include_depth",
        }
    }
}

/// Every failure the lifecycle and service layers report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    #[error("[VC210] profile merge failed: {0}")]
    Merge(#[from] MergeError),
    #[error("[VC220] '{0}' does not map to a valid user account")]
    InvalidIdentity(String),
    #[error("[VC230] configuration profile {path} is sealed")]
    Sealed { path: ProfilePath },
    #[error("[VC231] configuration profile {path} is already sealed")]
    AlreadySealed { path: ProfilePath },
    #[error("[VC240] configuration profile {path} not found")]
    NotFound { path: String },
    #[error("[VC250] uid {caller} is not the owner of {path}")]
    Unauthorized {
        path: ProfilePath,
        caller: Principal,
    },
    #[error("[VC251] uid {caller} may not retrieve the content of {path}")]
    ContentRestricted {
        path: ProfilePath,
        caller: Principal,
    },
    #[error("[VC260] configuration service failure: {0}")]
    Transport(String),
    #[error("[VC270] {0}")]
    InvalidRequest(String),
}

impl ProfileError {
    pub fn transport(err: impl Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn not_found(path: impl Display) -> Self {
        Self::NotFound {
            path: path.to_string(),
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Merge(_) => codes::MERGE,
            Self::InvalidIdentity(_) => codes::INVALID_IDENTITY,
            Self::Sealed { .. } => codes::SEALED,
            Self::AlreadySealed { .. } => codes::ALREADY_SEALED,
            Self::NotFound { .. } => codes::NOT_FOUND,
            Self::Unauthorized { .. } => codes::UNAUTHORIZED,
            Self::ContentRestricted { .. } => codes::CONTENT_RESTRICTED,
            Self::Transport(_) => codes::TRANSPORT,
            Self::InvalidRequest(_) => codes::INVALID_REQUEST,
        }
    }

    /// Stable snake-case label used in JSON details.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Merge(_) => "merge_failed",
            Self::InvalidIdentity(_) => "invalid_identity",
            Self::Sealed { .. } => "sealed",
            Self::AlreadySealed { .. } => "already_sealed",
            Self::NotFound { .. } => "not_found",
            Self::Unauthorized { .. } => "unauthorized",
            Self::ContentRestricted { .. } => "content_restricted",
            Self::Transport(_) => "transport",
            Self::InvalidRequest(_) => "invalid_request",
        }
    }

    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
