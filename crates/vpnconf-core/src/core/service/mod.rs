//! The configuration service: the remote holder of every imported profile.

mod local;
mod registry;
mod store;


use std::sync::Arc;

use vpnconf_domain::{NewProfile, Principal, ProfileError, ProfilePath, ProfileProperties};

pub use local::LocalConfigService;

/// What a consuming session receives when it starts from a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub properties: ProfileProperties,
    pub content: String,
    /// Set when a single-use profile was consumed by this delivery.
    pub consumed: bool,
}

/// Verbs exposed by the configuration service.
///
/// `caller` is the authenticated identity of the requesting process.
pub trait ConfigService: Send + Sync {
    fn ping(&self) -> Result<(), ProfileError>;

    fn import(&self, caller: Principal, profile: NewProfile) -> Result<ProfilePath, ProfileError>;

    /// Every profile the caller may see, ordered by path.
    fn fetch_available(&self, caller: Principal) -> Result<Vec<ProfileProperties>, ProfileError>;

    fn properties(
        &self,
        caller: Principal,
        path: ProfilePath,
    ) -> Result<ProfileProperties, ProfileError>;

    fn content(&self, caller: Principal, path: ProfilePath) -> Result<String, ProfileError>;

    fn set_name(&self, caller: Principal, path: ProfilePath, name: &str)
        -> Result<(), ProfileError>;

    fn set_alias(
        &self,
        caller: Principal,
        path: ProfilePath,
        alias: Option<&str>,
    ) -> Result<(), ProfileError>;

    fn set_persist_tun(
        &self,
        caller: Principal,
        path: ProfilePath,
        enabled: bool,
    ) -> Result<(), ProfileError>;

    fn set_public_access(
        &self,
        caller: Principal,
        path: ProfilePath,
        enabled: bool,
    ) -> Result<(), ProfileError>;

    fn set_locked_down(
        &self,
        caller: Principal,
        path: ProfilePath,
        enabled: bool,
    ) -> Result<(), ProfileError>;

    /// Returns `true` when the ACL changed.
    fn access_grant(
        &self,
        caller: Principal,
        path: ProfilePath,
        principal: Principal,
    ) -> Result<bool, ProfileError>;

    /// Returns `true` when the ACL changed.
    fn access_revoke(
        &self,
        caller: Principal,
        path: ProfilePath,
        principal: Principal,
    ) -> Result<bool, ProfileError>;

    fn seal(&self, caller: Principal, path: ProfilePath) -> Result<(), ProfileError>;

    fn remove(&self, caller: Principal, path: ProfilePath) -> Result<(), ProfileError>;

    fn deliver(&self, caller: Principal, path: ProfilePath) -> Result<Delivery, ProfileError>;
}

pub type SharedService = Arc<dyn ConfigService>;
