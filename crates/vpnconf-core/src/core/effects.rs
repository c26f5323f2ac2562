use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::core::confirm::{Confirmer, LinePrompt};
use crate::core::identity::{IdentityResolver, SystemIdentities};

pub trait FileSystem: Send + Sync {
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
    fn canonicalize(&self, path: &Path) -> Result<PathBuf>;
}

/// Host capabilities the command layer depends on.
pub trait Effects: Send + Sync {
    fn fs(&self) -> &dyn FileSystem;
    fn identities(&self) -> &dyn IdentityResolver;
    fn prompt(&self) -> &dyn Confirmer;
}

pub struct SystemEffects {
    fs: Arc<SystemFileSystem>,
    identities: Arc<SystemIdentities>,
    prompt: Arc<LinePrompt>,
}

impl SystemEffects {
    #[must_use]
    pub fn new() -> Self {
        Self {
            fs: Arc::new(SystemFileSystem),
            identities: Arc::new(SystemIdentities),
            prompt: Arc::new(LinePrompt::stdio()),
        }
    }
}

impl Default for SystemEffects {
    fn default() -> Self {
        Self::new()
    }
}

impl Effects for SystemEffects {
    fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    fn identities(&self) -> &dyn IdentityResolver {
        self.identities.as_ref()
    }

    fn prompt(&self) -> &dyn Confirmer {
        self.prompt.as_ref()
    }
}

pub struct SystemFileSystem;

impl FileSystem for SystemFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        std::fs::canonicalize(path).with_context(|| format!("canonicalizing {}", path.display()))
    }
}

pub type SharedEffects = Arc<dyn Effects>;
