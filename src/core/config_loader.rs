// src/core/config_loader.rs

//! Loading and saving of `rexsh.toml`.

use crate::{core::paths, models::RexshConfig};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Represents errors that can occur while reading or writing the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Neither `$REXSH_CONFIG` nor a system configuration directory is available.
    #[error("Could not determine the rexsh configuration directory.")]
    ConfigDirNotFound,
    /// The file exists but could not be read or written.
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for [`RexshConfig`].
    #[error("Failed to parse TOML file at '{path}': {source}")]
    TomlParse {
        /// The file that failed to parse.
        path: PathBuf,
        /// The underlying parsing error from the `toml` crate.
        #[source]
        source: toml::de::Error,
    },
    /// The configuration could not be rendered as TOML.
    #[error("Failed to serialize configuration to TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// The location of the configuration file.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    paths::get_config_path().ok_or(ConfigError::ConfigDirNotFound)
}

/// Loads the user's configuration. A missing file yields the defaults.
pub fn load_config() -> Result<RexshConfig, ConfigError> {
    load_config_from(&config_path()?)
}

/// Loads the configuration stored at `path`. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<RexshConfig, ConfigError> {
    if !path.exists() {
        log::debug!(
            "No configuration at '{}'; using defaults.",
            path.display()
        );
        return Ok(RexshConfig::default());
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads the user's configuration, falling back to the defaults (with a warning) when
/// it cannot be read.
pub fn load_or_default() -> RexshConfig {
    match load_config() {
        Ok(config) => config,
        Err(e) => {
            log::warn!("{}; using default configuration.", e);
            RexshConfig::default()
        }
    }
}

/// Renders `config` as TOML.
pub fn render_config(config: &RexshConfig) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(config)?)
}

/// Writes `config` to `path`, creating parent directories as needed.
pub fn save_config(config: &RexshConfig, path: &Path) -> Result<(), ConfigError> {
    let io_error = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, render_config(config)?).map_err(io_error)?;
    log::debug!("Configuration written to '{}'.", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShellConfig;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, RexshConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        // --- Setup ---
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("rexsh.toml");
        let mut config = RexshConfig {
            enable_path_normalization: false,
            standard_system_paths: vec!["/usr/bin".to_string()],
            ..RexshConfig::default()
        };
        config.shells.insert(
            "bash".to_string(),
            ShellConfig {
                executable_fullpath: Some("/bin/bash".to_string()),
            },
        );

        // --- Action ---
        save_config(&config, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();

        // --- Assert ---
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_toml_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rexsh.toml");
        fs::write(&path, "enable_path_normalization = 'maybe'").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse { .. }));
        assert!(err.to_string().contains("rexsh.toml"));
    }
}
