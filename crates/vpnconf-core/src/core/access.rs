//! Authorization and seal rules applied to every profile operation.

use vpnconf_domain::{ConfigProfile, Principal, ProfileError, ProfileProperties};

/// Requested changes of a `config-manage` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManageRequest {
    pub alias: Option<String>,
    pub delete_alias: bool,
    pub rename: Option<String>,
    pub persist_tun: Option<bool>,
}

/// Requested changes of a `config-acl` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AclRequest {
    pub grant: Vec<String>,
    pub revoke: Vec<String>,
    pub lock_down: Option<bool>,
    pub public_access: Option<bool>,
    pub seal: bool,
    pub show: bool,
}

/// The fields access decisions are made from.
pub trait AccessSubject {
    fn owner(&self) -> Principal;
    fn locked_down(&self) -> bool;
    fn public_access(&self) -> bool;
    fn listed(&self, who: Principal) -> bool;
}

impl AccessSubject for ConfigProfile {
    fn owner(&self) -> Principal {
        ConfigProfile::owner(self)
    }

    fn locked_down(&self) -> bool {
        ConfigProfile::locked_down(self)
    }

    fn public_access(&self) -> bool {
        ConfigProfile::public_access(self)
    }

    fn listed(&self, who: Principal) -> bool {
        self.acl().contains(&who)
    }
}

impl AccessSubject for ProfileProperties {
    fn owner(&self) -> Principal {
        self.owner
    }

    fn locked_down(&self) -> bool {
        self.locked_down
    }

    fn public_access(&self) -> bool {
        self.public_access
    }

    fn listed(&self, who: Principal) -> bool {
        self.acl.contains(&who)
    }
}

pub struct AccessControlPolicy;

impl AccessControlPolicy {
    /// Content retrieval: lock-down hides content from everyone but the owner.
    #[must_use]
    pub fn can_read(subject: &impl AccessSubject, who: Principal) -> bool {
        subject.owner() == who
            || (!subject.locked_down() && (subject.public_access() || subject.listed(who)))
    }

    /// Discovery, metadata and use by a session.
    #[must_use]
    pub fn can_see(subject: &impl AccessSubject, who: Principal) -> bool {
        subject.owner() == who || subject.public_access() || subject.listed(who)
    }

    /// Callers who cannot see the profile get `NotFound` rather than
    /// `Unauthorized`.
    pub fn ensure_owner(profile: &ConfigProfile, caller: Principal) -> Result<(), ProfileError> {
        Self::ensure_visible(profile, caller)?;
        if profile.is_owner(caller) {
            return Ok(());
        }
        Err(ProfileError::Unauthorized {
            path: profile.path(),
            caller,
        })
    }

    /// Owner check on a read-only view, used before prompting.
    pub fn ensure_owner_of(
        properties: &ProfileProperties,
        caller: Principal,
    ) -> Result<(), ProfileError> {
        if properties.owner == caller {
            return Ok(());
        }
        Err(ProfileError::Unauthorized {
            path: properties.path,
            caller,
        })
    }

    /// Profiles the caller may not see are reported as missing.
    pub fn ensure_visible(profile: &ConfigProfile, caller: Principal) -> Result<(), ProfileError> {
        if Self::can_see(profile, caller) {
            return Ok(());
        }
        Err(ProfileError::not_found(profile.path()))
    }

    pub fn ensure_readable(profile: &ConfigProfile, caller: Principal) -> Result<(), ProfileError> {
        Self::ensure_visible(profile, caller)?;
        if Self::can_read(profile, caller) {
            return Ok(());
        }
        Err(ProfileError::ContentRestricted {
            path: profile.path(),
            caller,
        })
    }

    pub fn grant(
        profile: &mut ConfigProfile,
        caller: Principal,
        principal: Principal,
    ) -> Result<bool, ProfileError> {
        Self::ensure_owner(profile, caller)?;
        profile.grant(principal)
    }

    pub fn revoke(
        profile: &mut ConfigProfile,
        caller: Principal,
        principal: Principal,
    ) -> Result<bool, ProfileError> {
        Self::ensure_owner(profile, caller)?;
        profile.revoke(principal)
    }

    pub fn set_public_access(
        profile: &mut ConfigProfile,
        caller: Principal,
        enabled: bool,
    ) -> Result<(), ProfileError> {
        Self::ensure_owner(profile, caller)?;
        profile.set_public_access(enabled)
    }

    pub fn set_locked_down(
        profile: &mut ConfigProfile,
        caller: Principal,
        enabled: bool,
    ) -> Result<(), ProfileError> {
        Self::ensure_owner(profile, caller)?;
        profile.set_locked_down(enabled)
    }

    pub fn set_persist_tun(
        profile: &mut ConfigProfile,
        caller: Principal,
        enabled: bool,
    ) -> Result<(), ProfileError> {
        Self::ensure_owner(profile, caller)?;
        profile.set_persist_tun(enabled)
    }

    pub fn seal(profile: &mut ConfigProfile, caller: Principal) -> Result<(), ProfileError> {
        Self::ensure_owner(profile, caller)?;
        profile.seal()
    }

    pub fn rename(
        profile: &mut ConfigProfile,
        caller: Principal,
        name: &str,
    ) -> Result<(), ProfileError> {
        Self::ensure_owner(profile, caller)?;
        if name.trim().is_empty() {
            return Err(ProfileError::invalid_request("profile name may not be empty"));
        }
        profile.rename(name);
        Ok(())
    }

    pub fn set_alias(
        profile: &mut ConfigProfile,
        caller: Principal,
        alias: Option<&str>,
    ) -> Result<(), ProfileError> {
        Self::ensure_owner(profile, caller)?;
        if alias.is_some_and(|alias| alias.trim().is_empty()) {
            return Err(ProfileError::invalid_request("alias may not be empty"));
        }
        profile.set_alias(alias.map(str::to_string));
        Ok(())
    }

    /// Removal stays possible once sealed.
    pub fn remove(profile: &ConfigProfile, caller: Principal) -> Result<(), ProfileError> {
        Self::ensure_owner(profile, caller)
    }

    pub fn validate_manage(request: &ManageRequest) -> Result<(), ProfileError> {
        if request.alias.is_none()
            && !request.delete_alias
            && request.rename.is_none()
            && request.persist_tun.is_none()
        {
            return Err(ProfileError::invalid_request(
                "config-manage needs at least one operation",
            ));
        }
        if request.alias.is_some() && request.delete_alias {
            return Err(ProfileError::invalid_request(
                "--alias and --alias-delete cannot be combined",
            ));
        }
        if request
            .alias
            .as_deref()
            .is_some_and(|alias| alias.trim().is_empty())
        {
            return Err(ProfileError::invalid_request("alias may not be empty"));
        }
        if request
            .rename
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(ProfileError::invalid_request("profile name may not be empty"));
        }
        Ok(())
    }

    pub fn validate_acl(request: &AclRequest) -> Result<(), ProfileError> {
        if request.grant.is_empty()
            && request.revoke.is_empty()
            && request.lock_down.is_none()
            && request.public_access.is_none()
            && !request.seal
            && !request.show
        {
            return Err(ProfileError::invalid_request(
                "config-acl needs at least one operation",
            ));
        }
        if let Some(both) = request
            .grant
            .iter()
            .find(|granted| request.revoke.iter().any(|revoked| revoked.trim() == granted.trim()))
        {
            return Err(ProfileError::invalid_request(format!(
                "'{}' cannot be granted and revoked in the same request",
                both.trim()
            )));
        }
        if request.public_access == Some(true) && request.lock_down == Some(true) {
            return Err(ProfileError::invalid_request(
                "--public-access true and --lock-down true cannot be combined",
            ));
        }
        Ok(())
    }
}
