use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs4::FileExt;
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use vpnconf_domain::{ConfigProfile, ProfilePath};

const CONFIGS_DIR: &str = "configs";
const NEXT_ID_FILE: &str = "next-id";
const LOCK_FILE: &str = "store.lock";

/// On-disk home of the stored profiles.
///
/// Persistent profiles go below the state directory, the rest below the
/// runtime directory. The exclusive lock on `store.lock` is held for the
/// lifetime of the value.
#[derive(Debug)]
pub struct ProfileStore {
    state_dir: PathBuf,
    runtime_dir: PathBuf,
    _lock: File,
}

/// Everything a service needs to rebuild its registry.
#[derive(Debug, Default)]
pub struct LoadedProfiles {
    pub profiles: Vec<ConfigProfile>,
    pub next_id: u64,
}

impl ProfileStore {
    pub fn open(state_dir: &Path, runtime_dir: &Path) -> Result<Self> {
        for dir in [state_dir.join(CONFIGS_DIR), runtime_dir.join(CONFIGS_DIR)] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let lock_path = state_dir.join(LOCK_FILE);
        let lock = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(&lock_path)
            .with_context(|| format!("failed to open {}", lock_path.display()))?;
        lock.lock_exclusive()
            .with_context(|| format!("failed to lock {}", lock_path.display()))?;
        debug!(state = %state_dir.display(), runtime = %runtime_dir.display(), "profile store opened");

        Ok(Self {
            state_dir: state_dir.to_path_buf(),
            runtime_dir: runtime_dir.to_path_buf(),
            _lock: lock,
        })
    }

    pub fn load(&self) -> Result<LoadedProfiles> {
        let mut profiles = Vec::new();
        for dir in [self.configs_dir(true), self.configs_dir(false)] {
            let entries =
                fs::read_dir(&dir).with_context(|| format!("failed to list {}", dir.display()))?;
            for entry in entries {
                let path = entry?.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                    continue;
                }
                match read_profile(&path) {
                    Ok(profile) => profiles.push(profile),
                    Err(err) => warn!(file = %path.display(), %err, "skipping unreadable profile"),
                }
            }
        }
        profiles.sort_by_key(|profile| profile.path());

        let stored_next = self.read_next_id()?;
        let highest = profiles
            .iter()
            .map(|profile| profile.path().id() + 1)
            .max()
            .unwrap_or(0);
        Ok(LoadedProfiles {
            profiles,
            next_id: stored_next.max(highest),
        })
    }

    pub fn save(&self, profile: &ConfigProfile) -> Result<()> {
        let json = serde_json::to_vec_pretty(profile)?;
        write_atomic(&self.document_path(profile.path(), profile.persistent()), &json)
    }

    pub fn delete(&self, profile: &ConfigProfile) -> Result<()> {
        let path = self.document_path(profile.path(), profile.persistent());
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("failed to remove {}", path.display()))
            }
        }
    }

    pub fn write_next_id(&self, next_id: u64) -> Result<()> {
        write_atomic(
            &self.state_dir.join(NEXT_ID_FILE),
            format!("{next_id}\n").as_bytes(),
        )
    }

    fn read_next_id(&self) -> Result<u64> {
        let path = self.state_dir.join(NEXT_ID_FILE);
        match fs::read_to_string(&path) {
            Ok(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("invalid id counter in {}", path.display())),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(0),
            Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    fn configs_dir(&self, persistent: bool) -> PathBuf {
        let root = if persistent {
            &self.state_dir
        } else {
            &self.runtime_dir
        };
        root.join(CONFIGS_DIR)
    }

    fn document_path(&self, path: ProfilePath, persistent: bool) -> PathBuf {
        self.configs_dir(persistent)
            .join(format!("{:016x}.json", path.id()))
    }
}

fn read_profile(path: &Path) -> Result<ConfigProfile> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("failed to parse {}", path.display()))
}

fn write_atomic(dest: &Path, contents: &[u8]) -> Result<()> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest)
        .with_context(|| format!("failed to write {}", dest.display()))?;
    Ok(())
}
