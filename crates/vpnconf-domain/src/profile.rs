use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;
use crate::identity::Principal;

pub const CONFIGURATION_ROOT: &str = "/net/vpnconf/configuration";

/// Opaque identifier handed out by the service when a profile is imported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProfilePath {
    id: u64,
}

impl ProfilePath {
    #[must_use]
    pub const fn from_id(id: u64) -> Self {
        Self { id }
    }

    #[must_use]
    pub const fn id(self) -> u64 {
        self.id
    }

    /// Parses an object path produced by [`ProfilePath::to_string`].
    ///
    /// Anything else cannot name a profile and is reported as not found.
    pub fn parse(raw: &str) -> Result<Self, ProfileError> {
        let suffix = raw
            .strip_prefix(CONFIGURATION_ROOT)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|rest| rest.len() == 16)
            .ok_or_else(|| ProfileError::not_found(raw))?;
        u64::from_str_radix(suffix, 16)
            .map(Self::from_id)
            .map_err(|_| ProfileError::not_found(raw))
    }
}

impl fmt::Display for ProfilePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CONFIGURATION_ROOT}/{:016x}", self.id)
    }
}

impl TryFrom<String> for ProfilePath {
    type Error = ProfileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProfilePath> for String {
    fn from(path: ProfilePath) -> Self {
        path.to_string()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileState {
    Active,
    Sealed,
}

/// Import payload handed to the service once the profile has been merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProfile {
    pub name: String,
    pub content: String,
    pub single_use: bool,
    pub persistent: bool,
    pub persist_tun: bool,
}

/// One imported configuration profile as held by the service.
///
/// `path`, `owner` and `content` are fixed at construction. Every mutator
/// that touches a sealed field checks the seal itself, so the entity cannot be
/// put into a state that contradicts it regardless of caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigProfile {
    path: ProfilePath,
    name: String,
    #[serde(default)]
    alias: Option<String>,
    owner: Principal,
    content: String,
    persistent: bool,
    single_use: bool,
    persist_tun: bool,
    locked_down: bool,
    public_access: bool,
    acl: BTreeSet<Principal>,
    sealed: bool,
    import_timestamp: u64,
    #[serde(default)]
    last_used_timestamp: u64,
    #[serde(default)]
    used_count: u32,
}

impl ConfigProfile {
    #[must_use]
    pub fn new(path: ProfilePath, owner: Principal, profile: NewProfile, imported_at: u64) -> Self {
        Self {
            path,
            name: profile.name,
            alias: None,
            owner,
            content: profile.content,
            persistent: profile.persistent,
            single_use: profile.single_use,
            persist_tun: profile.persist_tun,
            locked_down: false,
            public_access: false,
            acl: BTreeSet::new(),
            sealed: false,
            import_timestamp: imported_at,
            last_used_timestamp: 0,
            used_count: 0,
        }
    }

    pub fn path(&self) -> ProfilePath {
        self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn owner(&self) -> Principal {
        self.owner
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn persistent(&self) -> bool {
        self.persistent
    }

    pub fn single_use(&self) -> bool {
        self.single_use
    }

    pub fn persist_tun(&self) -> bool {
        self.persist_tun
    }

    pub fn locked_down(&self) -> bool {
        self.locked_down
    }

    pub fn public_access(&self) -> bool {
        self.public_access
    }

    pub fn acl(&self) -> &BTreeSet<Principal> {
        &self.acl
    }

    pub fn sealed(&self) -> bool {
        self.sealed
    }

    pub fn import_timestamp(&self) -> u64 {
        self.import_timestamp
    }

    pub fn last_used_timestamp(&self) -> u64 {
        self.last_used_timestamp
    }

    pub fn used_count(&self) -> u32 {
        self.used_count
    }

    pub fn state(&self) -> ProfileState {
        if self.sealed {
            ProfileState::Sealed
        } else {
            ProfileState::Active
        }
    }

    pub fn is_owner(&self, principal: Principal) -> bool {
        self.owner == principal
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_alias(&mut self, alias: Option<String>) {
        self.alias = alias;
    }

    pub fn set_persist_tun(&mut self, enabled: bool) -> Result<(), ProfileError> {
        self.ensure_unsealed()?;
        self.persist_tun = enabled;
        Ok(())
    }

    pub fn set_public_access(&mut self, enabled: bool) -> Result<(), ProfileError> {
        self.ensure_unsealed()?;
        self.public_access = enabled;
        Ok(())
    }

    pub fn set_locked_down(&mut self, enabled: bool) -> Result<(), ProfileError> {
        self.ensure_unsealed()?;
        self.locked_down = enabled;
        Ok(())
    }

    /// Returns `true` when the principal was not already on the list.
    pub fn grant(&mut self, principal: Principal) -> Result<bool, ProfileError> {
        self.ensure_unsealed()?;
        Ok(self.acl.insert(principal))
    }

    /// Returns `true` when the principal was on the list.
    pub fn revoke(&mut self, principal: Principal) -> Result<bool, ProfileError> {
        self.ensure_unsealed()?;
        Ok(self.acl.remove(&principal))
    }

    pub fn seal(&mut self) -> Result<(), ProfileError> {
        if self.sealed {
            return Err(ProfileError::AlreadySealed { path: self.path });
        }
        self.sealed = true;
        Ok(())
    }

    pub fn record_use(&mut self, now: u64) {
        self.last_used_timestamp = now;
        self.used_count = self.used_count.saturating_add(1);
    }

    pub fn properties(&self) -> ProfileProperties {
        ProfileProperties {
            path: self.path,
            name: self.name.clone(),
            alias: self.alias.clone(),
            owner: self.owner,
            persistent: self.persistent,
            single_use: self.single_use,
            persist_tun: self.persist_tun,
            locked_down: self.locked_down,
            public_access: self.public_access,
            acl: self.acl.iter().copied().collect(),
            sealed: self.sealed,
            state: self.state(),
            import_timestamp: self.import_timestamp,
            last_used_timestamp: self.last_used_timestamp,
            used_count: self.used_count,
        }
    }

    fn ensure_unsealed(&self) -> Result<(), ProfileError> {
        if self.sealed {
            return Err(ProfileError::Sealed { path: self.path });
        }
        Ok(())
    }
}

/// Every stored field except the profile content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileProperties {
    pub path: ProfilePath,
    pub name: String,
    pub alias: Option<String>,
    pub owner: Principal,
    pub persistent: bool,
    pub single_use: bool,
    pub persist_tun: bool,
    pub locked_down: bool,
    pub public_access: bool,
    pub acl: Vec<Principal>,
    pub sealed: bool,
    pub state: ProfileState,
    pub import_timestamp: u64,
    pub last_used_timestamp: u64,
    pub used_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConfigProfile {
        ConfigProfile::new(
            ProfilePath::from_id(7),
            Principal::new(1000),
            NewProfile {
                name: "office".into(),
                content: "client\nremote x 1194\n".into(),
                single_use: false,
                persistent: true,
                persist_tun: false,
            },
            1_700_000_000,
        )
    }

    #[test]
    fn path_round_trips_through_display() {
        let path = ProfilePath::from_id(0xdead_beef);
        let rendered = path.to_string();
        assert_eq!(rendered, "/net/vpnconf/configuration/00000000deadbeef");
        assert_eq!(ProfilePath::parse(&rendered).expect("parse"), path);
    }

    #[test]
    fn malformed_paths_are_not_found() {
        for raw in [
            "",
            "/net/vpnconf/configuration",
            "/net/vpnconf/configuration/xyz",
            "/net/other/0000000000000001",
        ] {
            let err = ProfilePath::parse(raw).expect_err("invalid path");
            assert!(matches!(err, ProfileError::NotFound { .. }), "{raw}");
        }
    }

    #[test]
    fn new_profiles_start_active_and_open() {
        let profile = sample();
        assert_eq!(profile.state(), ProfileState::Active);
        assert!(!profile.public_access());
        assert!(!profile.locked_down());
        assert!(profile.acl().is_empty());
        assert_eq!(profile.used_count(), 0);
    }

    #[test]
    fn seal_freezes_flags_and_acl() {
        let mut profile = sample();
        profile.grant(Principal::new(1001)).expect("grant");
        profile.seal().expect("seal");

        assert!(matches!(
            profile.grant(Principal::new(1002)),
            Err(ProfileError::Sealed { .. })
        ));
        assert!(matches!(
            profile.revoke(Principal::new(1001)),
            Err(ProfileError::Sealed { .. })
        ));
        assert!(profile.set_public_access(true).is_err());
        assert!(profile.set_locked_down(true).is_err());
        assert!(profile.set_persist_tun(true).is_err());
        assert_eq!(profile.acl().len(), 1);
        assert!(matches!(
            profile.seal(),
            Err(ProfileError::AlreadySealed { .. })
        ));
        assert_eq!(profile.state(), ProfileState::Sealed);
    }

    #[test]
    fn display_metadata_stays_mutable_after_seal() {
        let mut profile = sample();
        profile.seal().expect("seal");
        profile.rename("renamed");
        profile.set_alias(Some("alias".into()));
        assert_eq!(profile.name(), "renamed");
        assert_eq!(profile.alias(), Some("alias"));
    }

    #[test]
    fn grant_and_revoke_report_changes() {
        let mut profile = sample();
        let user = Principal::new(1001);
        assert!(profile.grant(user).expect("grant"));
        assert!(!profile.grant(user).expect("grant again"));
        assert!(profile.revoke(user).expect("revoke"));
        assert!(!profile.revoke(user).expect("revoke again"));
    }

    #[test]
    fn stored_documents_round_trip() {
        let mut profile = sample();
        profile.grant(Principal::new(42)).expect("grant");
        let json = serde_json::to_string(&profile).expect("serialize");
        assert!(json.contains("/net/vpnconf/configuration/0000000000000007"));
        let loaded: ConfigProfile = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(loaded, profile);
    }
}
