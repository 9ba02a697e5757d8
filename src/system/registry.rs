// src/system/registry.rs

//! The shell registry: maps family names to [`Shell`] handles and owns the process-wide
//! system path cache.

use crate::{
    core::config_loader,
    models::RexshConfig,
    shells::{Shell, ShellError, ShellKind, default_shell_kind},
    system::{
        env_store::{self, EnvironmentStore},
        syspaths,
    },
};
use lazy_static::lazy_static;
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, RwLock},
};

lazy_static! {
    static ref GLOBAL_REGISTRY: ShellRegistry = ShellRegistry::new(config_loader::load_or_default());
}

struct RegistryInner {
    config: RexshConfig,
    store: Box<dyn EnvironmentStore>,
    syspaths: RwLock<HashMap<ShellKind, Vec<String>>>,
}

/// Creates shells and caches their system path baselines.
///
/// Cloning shares the same configuration and cache.
#[derive(Clone)]
pub struct ShellRegistry {
    inner: Arc<RegistryInner>,
}

impl fmt::Debug for ShellRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cached: Vec<ShellKind> = match self.inner.syspaths.read() {
            Ok(cache) => cache.keys().copied().collect(),
            Err(_) => Vec::new(),
        };
        f.debug_struct("ShellRegistry")
            .field("config", &self.inner.config)
            .field("store", &self.inner.store)
            .field("cached_syspaths", &cached)
            .finish()
    }
}

impl ShellRegistry {
    /// A registry reading the host platform's environment store.
    pub fn new(config: RexshConfig) -> Self {
        Self::with_store(config, env_store::default_store())
    }

    /// A registry reading `store` instead of the host's.
    pub fn with_store(config: RexshConfig, store: Box<dyn EnvironmentStore>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                store,
                syspaths: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// The registry built from the user's `rexsh.toml`, created on first use.
    pub fn global() -> &'static ShellRegistry {
        &GLOBAL_REGISTRY
    }

    /// The configuration shells are built from.
    pub fn config(&self) -> &RexshConfig {
        &self.inner.config
    }

    /// Families that can run on this platform.
    pub fn shell_types(&self) -> Vec<ShellKind> {
        ShellKind::native()
    }

    /// Builds the shell named `name`, or the default one.
    ///
    /// The default is the configured `default_shell`, then the platform default.
    pub fn create_shell(&self, name: Option<&str>) -> Result<Shell, ShellError> {
        let kind = match name.or(self.inner.config.default_shell.as_deref()) {
            Some(name) => name.parse::<ShellKind>()?,
            None => default_shell_kind(),
        };
        Ok(self.shell_of(kind))
    }

    /// Builds the shell of `kind`.
    pub fn shell_of(&self, kind: ShellKind) -> Shell {
        Shell::new(kind, &self.inner.config, self.clone())
    }

    /// The cached baseline of `shell`'s family, discovered on first request.
    ///
    /// Discovery runs outside the lock. When two threads race, the first result stored
    /// wins and both callers get it.
    pub fn system_paths(&self, shell: &Shell) -> Vec<String> {
        let kind = shell.kind();
        if let Ok(cache) = self.inner.syspaths.read() {
            if let Some(paths) = cache.get(&kind) {
                return paths.clone();
            }
        }

        let discovered = syspaths::discover(
            shell,
            self.inner.store.as_ref(),
            &self.inner.config.standard_system_paths,
        );

        match self.inner.syspaths.write() {
            Ok(mut cache) => cache.entry(kind).or_insert(discovered).clone(),
            Err(_) => discovered,
        }
    }

    /// Forgets every cached baseline.
    pub fn clear_system_paths(&self) {
        match self.inner.syspaths.write() {
            Ok(mut cache) => cache.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}
