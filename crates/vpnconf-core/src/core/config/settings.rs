use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use vpnconf_domain::{MergeLimits, Principal};

use crate::core::identity::current_principal;

pub const STATE_DIR_ENV: &str = "VPNCONF_STATE_DIR";
pub const RUNTIME_DIR_ENV: &str = "VPNCONF_RUNTIME_DIR";
pub const CALLER_UID_ENV: &str = "VPNCONF_CALLER_UID";
pub const MAX_PROFILE_SIZE_ENV: &str = "VPNCONF_MAX_PROFILE_SIZE";
pub const MAX_LINE_SIZE_ENV: &str = "VPNCONF_MAX_LINE_SIZE";

const APP_DIR: &str = "vpnconf";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalOptions {
    pub quiet: bool,
    pub verbose: u8,
    pub trace: bool,
    pub json: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub(crate) store: StoreConfig,
    pub(crate) caller: Principal,
    pub(crate) limits: MergeLimits,
}

impl Config {
    /// Builds a configuration snapshot from the current process environment.
    ///
    /// # Errors
    /// Returns an error if a directory cannot be resolved or a variable does
    /// not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> anyhow::Result<Self> {
        let state_dir = match snapshot.var(STATE_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs_next::data_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or_else(|| anyhow!("cannot determine a data directory; set {STATE_DIR_ENV}"))?,
        };
        let runtime_dir = match snapshot.var(RUNTIME_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs_next::runtime_dir().map_or_else(
                || env::temp_dir().join(format!("{APP_DIR}-{}", current_principal().uid())),
                |dir| dir.join(APP_DIR),
            ),
        };
        let caller = match snapshot.var(CALLER_UID_ENV) {
            Some(raw) => raw
                .parse::<Principal>()
                .with_context(|| format!("{CALLER_UID_ENV} must be a numeric uid, got {raw:?}"))?,
            None => current_principal(),
        };

        let mut limits = MergeLimits::default();
        if let Some(raw) = snapshot.var(MAX_PROFILE_SIZE_ENV) {
            limits.max_profile_size = parse_size(MAX_PROFILE_SIZE_ENV, raw)?;
        }
        if let Some(raw) = snapshot.var(MAX_LINE_SIZE_ENV) {
            limits.max_line_size = parse_size(MAX_LINE_SIZE_ENV, raw)?;
        }

        Ok(Self {
            store: StoreConfig {
                state_dir,
                runtime_dir,
            },
            caller,
            limits,
        })
    }

    #[must_use]
    pub fn store(&self) -> &StoreConfig {
        &self.store
    }

    #[must_use]
    pub fn caller(&self) -> Principal {
        self.caller
    }

    #[must_use]
    pub fn limits(&self) -> MergeLimits {
        self.limits
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub state_dir: PathBuf,
    pub runtime_dir: PathBuf,
}

fn parse_size(key: &str, raw: &str) -> anyhow::Result<usize> {
    let value: usize = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a byte count, got {raw:?}"))?;
    if value == 0 {
        return Err(anyhow!("{key} must be greater than zero"));
    }
    Ok(value)
}
