use std::collections::BTreeMap;

use nix::unistd::{getuid, Uid, User};
use tracing::debug;
use vpnconf_domain::{Principal, ProfileError};

pub const UNKNOWN_USER: &str = "(unknown)";

pub trait IdentityResolver: Send + Sync {
    fn uid_of(&self, name: &str) -> Option<Principal>;
    fn name_of(&self, principal: Principal) -> Option<String>;
}

/// Host account database lookups.
pub struct SystemIdentities;

impl IdentityResolver for SystemIdentities {
    fn uid_of(&self, name: &str) -> Option<Principal> {
        match User::from_name(name) {
            Ok(user) => user.map(|user| Principal::new(user.uid.as_raw())),
            Err(err) => {
                debug!(%name, %err, "account lookup failed");
                None
            }
        }
    }

    fn name_of(&self, principal: Principal) -> Option<String> {
        match User::from_uid(Uid::from_raw(principal.uid())) {
            Ok(user) => user.map(|user| user.name),
            Err(err) => {
                debug!(uid = principal.uid(), %err, "account lookup failed");
                None
            }
        }
    }
}

/// Fixed name table, used where the host database must not leak in.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentities {
    by_name: BTreeMap<String, Principal>,
}

impl StaticIdentities {
    pub fn new<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, u32)>,
    {
        Self {
            by_name: entries
                .into_iter()
                .map(|(name, uid)| (name.to_string(), Principal::new(uid)))
                .collect(),
        }
    }
}

impl IdentityResolver for StaticIdentities {
    fn uid_of(&self, name: &str) -> Option<Principal> {
        self.by_name.get(name).copied()
    }

    fn name_of(&self, principal: Principal) -> Option<String> {
        self.by_name
            .iter()
            .find(|(_, uid)| **uid == principal)
            .map(|(name, _)| name.clone())
    }
}

/// Maps a user-supplied account reference to a principal: account names
/// first, then a bare numeric uid.
pub fn resolve_identity(
    resolver: &dyn IdentityResolver,
    raw: &str,
) -> Result<Principal, ProfileError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ProfileError::InvalidIdentity(raw.to_string()));
    }
    if let Some(principal) = resolver.uid_of(trimmed) {
        return Ok(principal);
    }
    trimmed
        .parse::<Principal>()
        .map_err(|_| ProfileError::InvalidIdentity(raw.to_string()))
}

#[must_use]
pub fn display_name(resolver: &dyn IdentityResolver, principal: Principal) -> String {
    resolver
        .name_of(principal)
        .unwrap_or_else(|| UNKNOWN_USER.to_string())
}

#[must_use]
pub fn current_principal() -> Principal {
    Principal::new(getuid().as_raw())
}
