use std::sync::{Arc, OnceLock};

use anyhow::Result;
use vpnconf_domain::{MergeLimits, Principal};

use crate::core::config::{Config, GlobalOptions};
use crate::core::confirm::{confirmer_for, Confirmer};
use crate::core::effects::{Effects, FileSystem, SharedEffects};
use crate::core::identity::IdentityResolver;
use crate::core::lifecycle::ConfigLifecycle;
use crate::core::service::{ConfigService, LocalConfigService, SharedService};

pub struct CommandContext<'a> {
    pub global: &'a GlobalOptions,
    config: Config,
    effects: SharedEffects,
    service: OnceLock<SharedService>,
}

impl<'a> CommandContext<'a> {
    /// Creates a new command context with the provided global options.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be read from the
    /// environment.
    pub fn new(global: &'a GlobalOptions, effects: SharedEffects) -> Result<Self> {
        Ok(Self::with_config(global, Config::from_env()?, effects))
    }

    #[must_use]
    pub fn with_config(global: &'a GlobalOptions, config: Config, effects: SharedEffects) -> Self {
        Self {
            global,
            config,
            effects,
            service: OnceLock::new(),
        }
    }

    /// Uses an already running service instead of opening the store.
    #[must_use]
    pub fn with_service(
        global: &'a GlobalOptions,
        config: Config,
        effects: SharedEffects,
        service: SharedService,
    ) -> Self {
        let ctx = Self::with_config(global, config, effects);
        let _ = ctx.service.set(service);
        ctx
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.effects.fs()
    }

    pub fn identities(&self) -> &dyn IdentityResolver {
        self.effects.identities()
    }

    /// The confirmation gate for destructive operations.
    pub fn confirmer(&self, force: bool) -> &dyn Confirmer {
        confirmer_for(force, self.effects.prompt())
    }

    pub fn caller(&self) -> Principal {
        self.config.caller()
    }

    pub fn limits(&self) -> MergeLimits {
        self.config.limits()
    }

    /// Connects to the configuration service, opening the local store on
    /// first use.
    ///
    /// # Errors
    /// Returns an error if the store cannot be opened or loaded.
    pub fn service(&self) -> Result<&dyn ConfigService> {
        if let Some(service) = self.service.get() {
            return Ok(service.as_ref());
        }
        let store = self.config.store();
        let opened: SharedService =
            Arc::new(LocalConfigService::open(&store.state_dir, &store.runtime_dir)?);
        let service = self.service.get_or_init(|| opened);
        Ok(service.as_ref())
    }

    /// # Errors
    /// Returns an error if the service cannot be reached.
    pub fn lifecycle(&self) -> Result<ConfigLifecycle<'_>> {
        Ok(ConfigLifecycle::new(
            self.service()?,
            self.identities(),
            self.caller(),
        ))
    }
}
