// Intended public API surface for `vpnconf-core`.
//
// This module exists to keep the crate root small and make it explicit which
// types/functions are part of the stable interface used by the CLI and other
// crates.

pub use crate::core::access::{AccessControlPolicy, AccessSubject, AclRequest, ManageRequest};
pub use crate::core::commands::{
    config_acl, config_import, config_manage, config_remove, config_show, configs_list,
    ConfigAclRequest, ConfigImportRequest, ConfigManageRequest, ConfigRemoveRequest,
    ConfigShowRequest, ConfigsListRequest,
};
pub use crate::core::config::context::CommandContext;
pub use crate::core::config::{Config, GlobalOptions, StoreConfig};
pub use crate::core::confirm::{
    confirmer_for, AlwaysAffirm, ConfirmRequest, Confirmation, Confirmer, LinePrompt,
    AFFIRMATIVE_TOKEN,
};
pub use crate::core::effects::{Effects, FileSystem, SharedEffects, SystemEffects, SystemFileSystem};
pub use crate::core::identity::{
    current_principal, display_name, resolve_identity, IdentityResolver, StaticIdentities,
    SystemIdentities, UNKNOWN_USER,
};
pub use crate::core::import::{
    detect_persist_tun, lookup_directive, FollowMode, ImportRequest, MergedProfile,
    PreparedProfile, ProfileImporter, ProfileMerge, ProfileSource,
};
pub use crate::core::lifecycle::{
    AclAction, BatchItem, BatchReport, ConfigLifecycle, ImportReport, REMOVE_WARNING,
    SEAL_WARNING,
};
pub use crate::core::service::{ConfigService, Delivery, LocalConfigService, SharedService};
pub use crate::core::tooling::diagnostics::commands as diag_commands;
pub use crate::core::tooling::outcome::{CommandStatus, ExecutionOutcome};
pub use crate::core::tooling::response::{
    format_status_message, to_json_response, CommandGroup, CommandInfo,
};
