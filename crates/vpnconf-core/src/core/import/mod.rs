//! Turning a profile on disk into a self-contained document ready to be
//! registered with the configuration service.

mod merge;
mod scan;

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use tracing::{debug, warn};
use vpnconf_domain::{MergeError, MergeLimits, NewProfile};

use crate::core::effects::FileSystem;

pub use merge::{FollowMode, MergedProfile, ProfileMerge};
pub use scan::{detect_persist_tun, lookup_directive, PERSIST_TUN};

pub const SINGLE_USE_PERSISTENT_WARNING: &str =
    "a single-use profile is removed after its first use; storing it persistently has no lasting effect";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileSource {
    File(PathBuf),
    Text {
        text: String,
        base_path: PathBuf,
        origin: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    pub source: ProfileSource,
    pub name: String,
    pub single_use: bool,
    pub persistent: bool,
    pub mode: FollowMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedProfile {
    pub profile: NewProfile,
    pub embedded: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

pub struct ProfileImporter<'a> {
    fs: &'a dyn FileSystem,
    limits: MergeLimits,
}

impl<'a> ProfileImporter<'a> {
    #[must_use]
    pub fn new(fs: &'a dyn FileSystem, limits: MergeLimits) -> Self {
        Self { fs, limits }
    }

    /// Merges the source and derives the stored flags.
    ///
    /// Fails without side effects; nothing is registered here.
    pub fn prepare(&self, request: &ImportRequest) -> Result<PreparedProfile, MergeError> {
        let merged = match &request.source {
            ProfileSource::File(path) => {
                ProfileMerge::merge_file(self.fs, path, request.mode, self.limits)?
            }
            ProfileSource::Text {
                text,
                base_path,
                origin,
            } => ProfileMerge::merge_text(
                self.fs,
                text,
                base_path,
                origin,
                request.mode,
                self.limits,
            )?,
        };

        let persist_tun = detect_persist_tun(&merged.content, &self.limits);
        let mut warnings = Vec::new();
        if request.single_use && request.persistent {
            warn!(name = %request.name, "{SINGLE_USE_PERSISTENT_WARNING}");
            warnings.push(SINGLE_USE_PERSISTENT_WARNING.to_string());
        }
        debug!(
            name = %request.name,
            bytes = merged.content.len(),
            persist_tun,
            "profile prepared for import"
        );

        Ok(PreparedProfile {
            profile: NewProfile {
                name: request.name.clone(),
                content: merged.content,
                single_use: request.single_use,
                persistent: request.persistent,
                persist_tun,
            },
            embedded: merged.embedded,
            warnings,
        })
    }
}
