use std::path::Path;

use anyhow::Result;
use parking_lot::Mutex;
use time::OffsetDateTime;
use tracing::{debug, info};
use vpnconf_domain::{
    ConfigProfile, NewProfile, Principal, ProfileError, ProfilePath, ProfileProperties,
};

use super::registry::ProfileRegistry;
use super::store::ProfileStore;
use super::{ConfigService, Delivery};
use crate::core::access::AccessControlPolicy;

/// In-process configuration service backed by a [`ProfileStore`].
#[derive(Debug)]
pub struct LocalConfigService {
    registry: ProfileRegistry,
    store: Option<ProfileStore>,
    /// Held from id allocation until the counter is stored, so a slower
    /// import cannot overwrite the counter with a lower value.
    allocation: Mutex<()>,
}

impl LocalConfigService {
    /// Opens the store and loads every profile it holds.
    pub fn open(state_dir: &Path, runtime_dir: &Path) -> Result<Self> {
        let store = ProfileStore::open(state_dir, runtime_dir)?;
        let loaded = store.load()?;
        debug!(
            profiles = loaded.profiles.len(),
            next_id = loaded.next_id,
            "configuration service started"
        );
        Ok(Self {
            registry: ProfileRegistry::with_profiles(loaded.profiles, loaded.next_id),
            store: Some(store),
            allocation: Mutex::new(()),
        })
    }

    /// A service that keeps nothing beyond its own lifetime.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            registry: ProfileRegistry::default(),
            store: None,
            allocation: Mutex::new(()),
        }
    }

    /// Number of live profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn persist(&self, profile: &ConfigProfile) -> Result<(), ProfileError> {
        match &self.store {
            Some(store) => store.save(profile).map_err(transport),
            None => Ok(()),
        }
    }

    /// Applies `apply` to a copy of the profile under its entry lock; the copy
    /// replaces the live profile only once it has been stored.
    fn mutate<T>(
        &self,
        path: ProfilePath,
        apply: impl FnOnce(&mut ConfigProfile) -> Result<T, ProfileError>,
    ) -> Result<T, ProfileError> {
        let entry = self.registry.get(path)?;
        let mut guard = entry.lock();
        if guard.removed {
            return Err(ProfileError::not_found(path));
        }
        let mut draft = guard.profile.clone();
        let out = apply(&mut draft)?;
        if draft != guard.profile {
            self.persist(&draft)?;
            guard.profile = draft;
        }
        Ok(out)
    }

    fn inspect<T>(
        &self,
        path: ProfilePath,
        read: impl FnOnce(&ConfigProfile) -> Result<T, ProfileError>,
    ) -> Result<T, ProfileError> {
        let entry = self.registry.get(path)?;
        let guard = entry.lock();
        if guard.removed {
            return Err(ProfileError::not_found(path));
        }
        read(&guard.profile)
    }
}

impl ConfigService for LocalConfigService {
    fn ping(&self) -> Result<(), ProfileError> {
        Ok(())
    }

    fn import(&self, caller: Principal, profile: NewProfile) -> Result<ProfilePath, ProfileError> {
        let path = {
            let _allocating = self.allocation.lock();
            let path = self.registry.allocate();
            if let Some(store) = &self.store {
                store.write_next_id(path.id() + 1).map_err(transport)?;
            }
            path
        };
        let profile = ConfigProfile::new(path, caller, profile, now());
        self.persist(&profile)?;
        info!(%path, owner = %caller, "configuration imported");
        self.registry.insert(profile);
        Ok(path)
    }

    fn fetch_available(&self, caller: Principal) -> Result<Vec<ProfileProperties>, ProfileError> {
        Ok(self
            .registry
            .snapshot()
            .iter()
            .filter(|profile| AccessControlPolicy::can_see(*profile, caller))
            .map(ConfigProfile::properties)
            .collect())
    }

    fn properties(
        &self,
        caller: Principal,
        path: ProfilePath,
    ) -> Result<ProfileProperties, ProfileError> {
        self.inspect(path, |profile| {
            AccessControlPolicy::ensure_visible(profile, caller)?;
            Ok(profile.properties())
        })
    }

    fn content(&self, caller: Principal, path: ProfilePath) -> Result<String, ProfileError> {
        self.inspect(path, |profile| {
            AccessControlPolicy::ensure_readable(profile, caller)?;
            Ok(profile.content().to_string())
        })
    }

    fn set_name(
        &self,
        caller: Principal,
        path: ProfilePath,
        name: &str,
    ) -> Result<(), ProfileError> {
        self.mutate(path, |profile| {
            AccessControlPolicy::rename(profile, caller, name)
        })
    }

    fn set_alias(
        &self,
        caller: Principal,
        path: ProfilePath,
        alias: Option<&str>,
    ) -> Result<(), ProfileError> {
        self.mutate(path, |profile| {
            AccessControlPolicy::set_alias(profile, caller, alias)
        })
    }

    fn set_persist_tun(
        &self,
        caller: Principal,
        path: ProfilePath,
        enabled: bool,
    ) -> Result<(), ProfileError> {
        self.mutate(path, |profile| {
            AccessControlPolicy::set_persist_tun(profile, caller, enabled)
        })
    }

    fn set_public_access(
        &self,
        caller: Principal,
        path: ProfilePath,
        enabled: bool,
    ) -> Result<(), ProfileError> {
        self.mutate(path, |profile| {
            AccessControlPolicy::set_public_access(profile, caller, enabled)
        })
    }

    fn set_locked_down(
        &self,
        caller: Principal,
        path: ProfilePath,
        enabled: bool,
    ) -> Result<(), ProfileError> {
        self.mutate(path, |profile| {
            AccessControlPolicy::set_locked_down(profile, caller, enabled)
        })
    }

    fn access_grant(
        &self,
        caller: Principal,
        path: ProfilePath,
        principal: Principal,
    ) -> Result<bool, ProfileError> {
        self.mutate(path, |profile| {
            AccessControlPolicy::grant(profile, caller, principal)
        })
    }

    fn access_revoke(
        &self,
        caller: Principal,
        path: ProfilePath,
        principal: Principal,
    ) -> Result<bool, ProfileError> {
        self.mutate(path, |profile| {
            AccessControlPolicy::revoke(profile, caller, principal)
        })
    }

    fn seal(&self, caller: Principal, path: ProfilePath) -> Result<(), ProfileError> {
        self.mutate(path, |profile| AccessControlPolicy::seal(profile, caller))?;
        info!(%path, "configuration sealed");
        Ok(())
    }

    fn remove(&self, caller: Principal, path: ProfilePath) -> Result<(), ProfileError> {
        let entry = self.registry.get(path)?;
        let mut guard = entry.lock();
        if guard.removed {
            return Err(ProfileError::not_found(path));
        }
        AccessControlPolicy::remove(&guard.profile, caller)?;
        if let Some(store) = &self.store {
            store.delete(&guard.profile).map_err(transport)?;
        }
        guard.removed = true;
        drop(guard);
        self.registry.detach(path);
        info!(%path, "configuration removed");
        Ok(())
    }

    fn deliver(&self, caller: Principal, path: ProfilePath) -> Result<Delivery, ProfileError> {
        let entry = self.registry.get(path)?;
        let mut guard = entry.lock();
        if guard.removed {
            return Err(ProfileError::not_found(path));
        }
        AccessControlPolicy::ensure_visible(&guard.profile, caller)?;

        let mut draft = guard.profile.clone();
        draft.record_use(now());
        let consumed = draft.single_use();
        if consumed {
            if let Some(store) = &self.store {
                store.delete(&draft).map_err(transport)?;
            }
        } else {
            self.persist(&draft)?;
        }
        let delivery = Delivery {
            properties: draft.properties(),
            content: draft.content().to_string(),
            consumed,
        };
        guard.profile = draft;
        if consumed {
            guard.removed = true;
            drop(guard);
            self.registry.detach(path);
            info!(%path, "single-use configuration consumed");
        } else {
            debug!(%path, uses = delivery.properties.used_count, "configuration delivered");
        }
        Ok(delivery)
    }
}

fn transport(err: anyhow::Error) -> ProfileError {
    ProfileError::transport(format!("{err:#}"))
}

fn now() -> u64 {
    u64::try_from(OffsetDateTime::now_utc().unix_timestamp()).unwrap_or_default()
}
