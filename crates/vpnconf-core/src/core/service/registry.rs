use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;
use vpnconf_domain::{ConfigProfile, ProfileError, ProfilePath};

#[derive(Debug)]
pub(crate) struct Entry {
    pub(crate) profile: ConfigProfile,
    pub(crate) removed: bool,
}

pub(crate) type EntryRef = Arc<Mutex<Entry>>;

/// Live profiles keyed by path id, each behind its own lock.
#[derive(Debug, Default)]
pub(crate) struct ProfileRegistry {
    entries: RwLock<BTreeMap<u64, EntryRef>>,
    next_id: AtomicU64,
}

impl ProfileRegistry {
    pub(crate) fn with_profiles(profiles: Vec<ConfigProfile>, next_id: u64) -> Self {
        let entries = profiles
            .into_iter()
            .map(|profile| {
                let id = profile.path().id();
                (
                    id,
                    Arc::new(Mutex::new(Entry {
                        profile,
                        removed: false,
                    })),
                )
            })
            .collect();
        Self {
            entries: RwLock::new(entries),
            next_id: AtomicU64::new(next_id),
        }
    }

    /// Hands out a fresh path; ids are never handed out twice.
    pub(crate) fn allocate(&self) -> ProfilePath {
        ProfilePath::from_id(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    pub(crate) fn insert(&self, profile: ConfigProfile) {
        let id = profile.path().id();
        debug!(path = %profile.path(), "profile registered");
        self.entries.write().insert(
            id,
            Arc::new(Mutex::new(Entry {
                profile,
                removed: false,
            })),
        );
    }

    pub(crate) fn get(&self, path: ProfilePath) -> Result<EntryRef, ProfileError> {
        self.entries
            .read()
            .get(&path.id())
            .cloned()
            .ok_or_else(|| ProfileError::not_found(path))
    }

    /// Drops the arena slot of an entry already marked removed.
    pub(crate) fn detach(&self, path: ProfilePath) {
        if self.entries.write().remove(&path.id()).is_some() {
            debug!(%path, "profile unregistered");
        }
    }

    pub(crate) fn snapshot(&self) -> Vec<ConfigProfile> {
        let entries: Vec<EntryRef> = self.entries.read().values().cloned().collect();
        entries
            .iter()
            .filter_map(|entry| {
                let guard = entry.lock();
                (!guard.removed).then(|| guard.profile.clone())
            })
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.read().len()
    }
}
