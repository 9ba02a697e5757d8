// src/system/env_store.rs

//! Read access to the OS store of persisted environment variables.
//!
//! On Windows this is the registry (`HKLM` then `HKCU`). Other platforms have no such
//! store and get [`NullStore`]. Tests inject a [`StaticStore`].

use std::collections::HashMap;

/// Which half of the store a value lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Machine-wide values.
    Machine,
    /// Values of the current user.
    User,
}

impl Scope {
    /// Both scopes, in lookup order.
    pub const ALL: [Scope; 2] = [Scope::Machine, Scope::User];
}

/// A source of persisted environment values.
pub trait EnvironmentStore: std::fmt::Debug + Send + Sync {
    /// The raw value of `name` in `scope`, or `None` when the scope or value is absent
    /// or cannot be read.
    fn query(&self, scope: Scope, name: &str) -> Option<String>;
}

/// A store with nothing in it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl EnvironmentStore for NullStore {
    fn query(&self, _scope: Scope, _name: &str) -> Option<String> {
        None
    }
}

/// An in-memory store.
#[derive(Debug, Clone, Default)]
pub struct StaticStore {
    values: HashMap<(Scope, String), String>,
}

impl StaticStore {
    /// Adds (or replaces) a value.
    pub fn with(mut self, scope: Scope, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert((scope, name.into()), value.into());
        self
    }
}

impl EnvironmentStore for StaticStore {
    fn query(&self, scope: Scope, name: &str) -> Option<String> {
        self.values.get(&(scope, name.to_string())).cloned()
    }
}

/// The Windows registry.
#[cfg(windows)]
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsRegistryStore;

#[cfg(windows)]
impl EnvironmentStore for WindowsRegistryStore {
    fn query(&self, scope: Scope, name: &str) -> Option<String> {
        use crate::constants::{MACHINE_ENVIRONMENT_KEY, USER_ENVIRONMENT_KEY};
        use winreg::RegKey;
        use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE};

        let (root, path) = match scope {
            Scope::Machine => (RegKey::predef(HKEY_LOCAL_MACHINE), MACHINE_ENVIRONMENT_KEY),
            Scope::User => (RegKey::predef(HKEY_CURRENT_USER), USER_ENVIRONMENT_KEY),
        };
        let key = match root.open_subkey(path) {
            Ok(key) => key,
            Err(e) => {
                log::debug!("Registry key {:?}\\{} unavailable: {}", scope, path, e);
                return None;
            }
        };
        match key.get_value::<String, _>(name) {
            Ok(value) => Some(value),
            Err(e) => {
                log::debug!("Registry value {:?}\\{} unavailable: {}", scope, name, e);
                None
            }
        }
    }
}

/// The store of the host platform.
pub fn default_store() -> Box<dyn EnvironmentStore> {
    #[cfg(windows)]
    {
        Box::new(WindowsRegistryStore)
    }
    #[cfg(not(windows))]
    {
        Box::new(NullStore)
    }
}
