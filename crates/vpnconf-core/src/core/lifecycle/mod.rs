//! Command-level orchestration of a profile's life: import, management,
//! access control, sealing, removal and delivery to sessions.

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info};
use vpnconf_domain::{MergeLimits, Principal, ProfileError, ProfilePath, ProfileProperties};

use crate::core::access::AccessControlPolicy;
use crate::core::confirm::{ConfirmRequest, Confirmation, Confirmer};
use crate::core::effects::FileSystem;
use crate::core::identity::{display_name, resolve_identity, IdentityResolver};
use crate::core::import::{ImportRequest, ProfileImporter};
use crate::core::service::{ConfigService, Delivery};

pub const SEAL_WARNING: &str =
    "This operation CANNOT be undone and makes this configuration profile read-only.";
pub const REMOVE_WARNING: &str =
    "This operation will delete the configuration profile - CANNOT be undone.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub path: ProfilePath,
    pub persist_tun: bool,
    pub embedded: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AclAction {
    Grant,
    Revoke,
}

/// Outcome of one identity in a grant/revoke batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub identity: String,
    pub principal: Option<Principal>,
    pub display_name: Option<String>,
    /// `Ok(true)` when the ACL changed, `Ok(false)` when it already matched.
    pub result: Result<bool, ProfileError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub action: AclAction,
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    #[must_use]
    pub fn failed(&self) -> usize {
        self.items.iter().filter(|item| item.result.is_err()).count()
    }

    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.items.len() - self.failed()
    }

    #[must_use]
    pub fn is_partial_failure(&self) -> bool {
        self.failed() > 0
    }
}

/// Drives profile operations for one calling principal.
pub struct ConfigLifecycle<'a> {
    service: &'a dyn ConfigService,
    identities: &'a dyn IdentityResolver,
    caller: Principal,
}

impl<'a> ConfigLifecycle<'a> {
    #[must_use]
    pub fn new(
        service: &'a dyn ConfigService,
        identities: &'a dyn IdentityResolver,
        caller: Principal,
    ) -> Self {
        Self {
            service,
            identities,
            caller,
        }
    }

    #[must_use]
    pub fn caller(&self) -> Principal {
        self.caller
    }

    /// Checks that the configuration service answers.
    pub fn ping(&self) -> Result<(), ProfileError> {
        self.service.ping()
    }

    /// Merges and registers a profile. Nothing is registered when the merge
    /// fails.
    pub fn import(
        &self,
        fs: &dyn FileSystem,
        limits: MergeLimits,
        request: &ImportRequest,
    ) -> Result<ImportReport, ProfileError> {
        let prepared = ProfileImporter::new(fs, limits).prepare(request)?;
        let persist_tun = prepared.profile.persist_tun;
        let path = self.service.import(self.caller, prepared.profile)?;
        Ok(ImportReport {
            path,
            persist_tun,
            embedded: prepared.embedded,
            warnings: prepared.warnings,
        })
    }

    pub fn rename(&self, path: ProfilePath, name: &str) -> Result<(), ProfileError> {
        self.service.set_name(self.caller, path, name)
    }

    pub fn set_alias(&self, path: ProfilePath, alias: &str) -> Result<(), ProfileError> {
        self.service.set_alias(self.caller, path, Some(alias))
    }

    pub fn delete_alias(&self, path: ProfilePath) -> Result<(), ProfileError> {
        self.service.set_alias(self.caller, path, None)
    }

    pub fn set_persist_tun(&self, path: ProfilePath, enabled: bool) -> Result<(), ProfileError> {
        self.service.set_persist_tun(self.caller, path, enabled)
    }

    pub fn set_public_access(&self, path: ProfilePath, enabled: bool) -> Result<(), ProfileError> {
        self.service.set_public_access(self.caller, path, enabled)
    }

    pub fn set_locked_down(&self, path: ProfilePath, enabled: bool) -> Result<(), ProfileError> {
        self.service.set_locked_down(self.caller, path, enabled)
    }

    pub fn grant<S: AsRef<str>>(&self, path: ProfilePath, identities: &[S]) -> BatchReport {
        self.apply_batch(AclAction::Grant, path, identities)
    }

    pub fn revoke<S: AsRef<str>>(&self, path: ProfilePath, identities: &[S]) -> BatchReport {
        self.apply_batch(AclAction::Revoke, path, identities)
    }

    fn apply_batch<S: AsRef<str>>(
        &self,
        action: AclAction,
        path: ProfilePath,
        identities: &[S],
    ) -> BatchReport {
        let items = identities
            .iter()
            .map(|raw| {
                let identity = raw.as_ref().to_string();
                let principal = match resolve_identity(self.identities, &identity) {
                    Ok(principal) => principal,
                    Err(err) => {
                        debug!(%identity, "identity did not resolve");
                        return BatchItem {
                            identity,
                            principal: None,
                            display_name: None,
                            result: Err(err),
                        };
                    }
                };
                let result = match action {
                    AclAction::Grant => self.service.access_grant(self.caller, path, principal),
                    AclAction::Revoke => self.service.access_revoke(self.caller, path, principal),
                };
                BatchItem {
                    identity,
                    principal: Some(principal),
                    display_name: Some(display_name(self.identities, principal)),
                    result,
                }
            })
            .collect();
        let report = BatchReport { action, items };
        if report.is_partial_failure() {
            info!(
                %path,
                failed = report.failed(),
                succeeded = report.succeeded(),
                "access batch partially failed"
            );
        }
        report
    }

    /// Seals the profile after confirmation. Ownership and seal state are
    /// checked before prompting.
    pub fn seal(
        &self,
        path: ProfilePath,
        confirmer: &dyn Confirmer,
    ) -> Result<Confirmation, ProfileError> {
        let properties = self.service.properties(self.caller, path)?;
        AccessControlPolicy::ensure_owner_of(&properties, self.caller)?;
        if properties.sealed {
            return Err(ProfileError::AlreadySealed { path });
        }
        let answer = confirmer.confirm(&ConfirmRequest {
            operation: "seal",
            warning: SEAL_WARNING,
        });
        if answer == Confirmation::Affirmed {
            self.service.seal(self.caller, path)?;
        } else {
            info!(%path, "seal cancelled");
        }
        Ok(answer)
    }

    pub fn remove(
        &self,
        path: ProfilePath,
        confirmer: &dyn Confirmer,
    ) -> Result<Confirmation, ProfileError> {
        let properties = self.service.properties(self.caller, path)?;
        AccessControlPolicy::ensure_owner_of(&properties, self.caller)?;
        let answer = confirmer.confirm(&ConfirmRequest {
            operation: "remove",
            warning: REMOVE_WARNING,
        });
        if answer == Confirmation::Affirmed {
            self.service.remove(self.caller, path)?;
        } else {
            info!(%path, "removal cancelled");
        }
        Ok(answer)
    }

    /// Whether `identity` may retrieve the content of the profile.
    pub fn can_read(&self, path: ProfilePath, identity: &str) -> Result<bool, ProfileError> {
        let who = resolve_identity(self.identities, identity)?;
        let properties = self.service.properties(self.caller, path)?;
        Ok(AccessControlPolicy::can_read(&properties, who))
    }

    pub fn properties(&self, path: ProfilePath) -> Result<ProfileProperties, ProfileError> {
        self.service.properties(self.caller, path)
    }

    pub fn content(&self, path: ProfilePath) -> Result<String, ProfileError> {
        self.service.content(self.caller, path)
    }

    pub fn list(&self) -> Result<Vec<ProfileProperties>, ProfileError> {
        self.service.fetch_available(self.caller)
    }

    /// Hands the profile to a consuming session.
    pub fn deliver_to_session(&self, path: ProfilePath) -> Result<Delivery, ProfileError> {
        self.service.deliver(self.caller, path)
    }

    #[must_use]
    pub fn display_name(&self, principal: Principal) -> String {
        display_name(self.identities, principal)
    }
}
