// src/core/paths.rs

//! Conversions between the three path grammars a shell on Windows may expect:
//! POSIX (`/c/foo/bar`), native Windows (`C:\foo\bar`) and mixed (`C:/foo/bar`).
//!
//! Everything here is pure except [`expand_windows_vars`] and
//! [`PathNormalizer::as_path`], which read the process environment to resolve `%NAME%`
//! references.

use crate::constants::{CONFIG_ENV_VAR, CONFIG_FILENAME, REXSH_CONFIG_DIR};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::env;
use std::path::PathBuf;
use std::sync::Mutex;

lazy_static! {
    // `C:\`, `C:/` or a bare `C:` at the start of a single path.
    static ref DRIVE_RE: Regex = Regex::new(r"^([A-Za-z]):(?:[\\/]|$)").expect("valid drive regex");
    // `C:\` at the start of a list or right after a `:`/`;` separator.
    static ref LIST_DRIVE_RE: Regex =
        Regex::new(r"(^|[:;])([A-Za-z]):\\").expect("valid list drive regex");
    // `/c/...` or `/c` at the start of a POSIX path.
    static ref POSIX_DRIVE_RE: Regex =
        Regex::new(r"^/([A-Za-z])(?:/|$)").expect("valid posix drive regex");
    static ref WINDOWS_VAR_RE: Regex =
        Regex::new(r"%([A-Za-z0-9_()]+)%").expect("valid windows var regex");
    static ref CONFIG_PATH: Mutex<Option<PathBuf>> = Mutex::new(None);
}

/// A path grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathStyle {
    /// `/c/foo/bar`
    Posix,
    /// `C:\foo\bar`
    Windows,
    /// `C:/foo/bar`
    Mixed,
}

/// Replaces `%NAME%` references with the value of `NAME` from the process environment.
/// References to unset variables are left as they are.
pub fn expand_windows_vars(path: &str) -> String {
    WINDOWS_VAR_RE
        .replace_all(path, |caps: &Captures<'_>| {
            let name = caps.get(1).map_or("", |m| m.as_str());
            env::var(name).unwrap_or_else(|_| caps.get(0).map_or("", |m| m.as_str()).to_string())
        })
        .into_owned()
}

/// `C:\foo\bar` → `/c/foo/bar`, `\\host\share` → `//host/share`.
pub fn to_posix_path(path: &str) -> String {
    if let Some(caps) = DRIVE_RE.captures(path) {
        let drive = caps.get(1).map_or("", |m| m.as_str()).to_lowercase();
        let rest = caps.get(0).and_then(|m| path.get(m.end()..)).unwrap_or("");
        return format!("/{}/{}", drive, rest.replace('\\', "/"));
    }
    path.replace('\\', "/")
}

/// `/c/foo/bar` or `C:/foo/bar` → `C:\foo\bar`, `//host/share` → `\\host\share`.
pub fn to_windows_path(path: &str) -> String {
    if let Some(caps) = POSIX_DRIVE_RE.captures(path) {
        let drive = caps.get(1).map_or("", |m| m.as_str()).to_uppercase();
        let rest = caps.get(0).and_then(|m| path.get(m.end()..)).unwrap_or("");
        return format!("{}:\\{}", drive, rest.replace('/', "\\"));
    }
    path.replace('/', "\\")
}

/// `/c/foo/bar` or `C:\foo\bar` → `C:/foo/bar`.
pub fn to_mixed_path(path: &str) -> String {
    if let Some(caps) = POSIX_DRIVE_RE.captures(path) {
        let drive = caps.get(1).map_or("", |m| m.as_str()).to_uppercase();
        let rest = caps.get(0).and_then(|m| path.get(m.end()..)).unwrap_or("");
        return format!("{}:/{}", drive, rest);
    }
    if let Some(caps) = DRIVE_RE.captures(path) {
        let drive = caps.get(1).map_or("", |m| m.as_str()).to_uppercase();
        let rest = caps.get(0).and_then(|m| path.get(m.end()..)).unwrap_or("");
        return format!("{}:/{}", drive, rest.replace('\\', "/"));
    }
    path.replace('\\', "/")
}

/// Converts `path` into `style`.
pub fn convert_path(path: &str, style: PathStyle) -> String {
    match style {
        PathStyle::Posix => to_posix_path(path),
        PathStyle::Windows => to_windows_path(path),
        PathStyle::Mixed => to_mixed_path(path),
    }
}

/// Rewrites every drive prefix of a colon-joined list into POSIX form, then turns the
/// remaining backslashes into forward slashes.
///
/// The drive colon of `C:\foo:C:\bah` collides with the `:` separator, so this has to
/// run before the value is split: `C:\foo:D:\bah` → `/c/foo:/d/bah`.
pub fn normalize_path_list(value: &str) -> String {
    LIST_DRIVE_RE
        .replace_all(value, |caps: &Captures<'_>| {
            let sep = caps.get(1).map_or("", |m| m.as_str());
            let drive = caps.get(2).map_or("", |m| m.as_str()).to_lowercase();
            format!("{}/{}/", sep, drive)
        })
        .replace('\\', "/")
}

/// Normalizes a colon-joined list and splits it, dropping empty entries.
pub fn split_path_list(value: &str, separator: char) -> Vec<String> {
    normalize_path_list(value)
        .split(separator)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// The path normalizer of one shell family.
///
/// A family that needs no conversion has no target style; a disabled normalizer (the
/// `enable_path_normalization = false` configuration) returns every input unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathNormalizer {
    enabled: bool,
    target: Option<PathStyle>,
}

impl PathNormalizer {
    /// Builds a normalizer converting into `target`.
    pub fn new(enabled: bool, target: Option<PathStyle>) -> Self {
        Self { enabled, target }
    }

    /// A normalizer that never changes anything.
    pub fn identity() -> Self {
        Self::new(false, None)
    }

    /// True when conversions are active.
    pub fn is_active(&self) -> bool {
        self.enabled && self.target.is_some()
    }

    /// Converts a single path into the family's grammar.
    pub fn normalize_path(&self, path: &str) -> String {
        match self.target {
            Some(style) if self.enabled => convert_path(path, style),
            _ => path.to_string(),
        }
    }

    /// Converts a list value into the family's grammar.
    pub fn normalize_paths(&self, value: &str) -> String {
        match self.target {
            Some(PathStyle::Posix) if self.enabled => normalize_path_list(value),
            Some(style) if self.enabled => value
                .split(';')
                .map(|entry| convert_path(entry, style))
                .collect::<Vec<_>>()
                .join(";"),
            _ => value.to_string(),
        }
    }

    /// The path as the host OS expects it, with `%NAME%` references resolved.
    pub fn as_path(&self, path: &str) -> String {
        match self.target {
            Some(style) if self.enabled => convert_path(&expand_windows_vars(path), style),
            _ => path.to_string(),
        }
    }

    /// The path as the interpreter's own commands expect it (`source`, `call`, ...).
    /// POSIX bridges accept the mixed form.
    pub fn as_shell_path(&self, path: &str) -> String {
        match self.target {
            Some(PathStyle::Posix) if self.enabled => convert_path(path, PathStyle::Mixed),
            Some(style) if self.enabled => convert_path(path, style),
            _ => path.to_string(),
        }
    }
}

// --- CONFIGURATION LOCATION ---

/// Returns the path of the `rexsh.toml` file to read.
///
/// `$REXSH_CONFIG` wins; otherwise `<config_dir>/rexsh/rexsh.toml`. The result is
/// memoized: the first call computes it, later calls return the cached value.
pub fn get_config_path() -> Option<PathBuf> {
    let mut cached = match CONFIG_PATH.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Some(path) = &*cached {
        return Some(path.clone());
    }

    let path = match env::var_os(CONFIG_ENV_VAR) {
        Some(explicit) if !explicit.is_empty() => PathBuf::from(explicit),
        _ => dirs::config_dir()?
            .join(REXSH_CONFIG_DIR)
            .join(CONFIG_FILENAME),
    };
    *cached = Some(path.clone());
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drive_path_round_trip() {
        let posix = to_posix_path(r"C:\foo\bar\spam");
        assert_eq!(posix, "/c/foo/bar/spam");
        assert_eq!(to_windows_path(&posix), r"C:\foo\bar\spam");
    }

    #[test]
    fn test_forward_slash_drive_and_bare_drive() {
        assert_eq!(to_posix_path("D:/tools/bin"), "/d/tools/bin");
        assert_eq!(to_posix_path("e:"), "/e/");
        assert_eq!(to_windows_path("/e"), r"E:\");
    }

    #[test]
    fn test_unc_paths() {
        assert_eq!(to_posix_path(r"\\host\share\dir"), "//host/share/dir");
        assert_eq!(to_windows_path("//host/share/dir"), r"\\host\share\dir");
    }

    #[test]
    fn test_mixed_paths() {
        assert_eq!(to_mixed_path("/c/foo/bar"), "C:/foo/bar");
        assert_eq!(to_mixed_path(r"c:\foo\bar"), "C:/foo/bar");
        assert_eq!(to_mixed_path("/usr/bin"), "/usr/bin");
    }

    #[test]
    fn test_posix_paths_without_drive_are_untouched() {
        assert_eq!(to_posix_path("/usr/local/bin"), "/usr/local/bin");
        assert_eq!(to_posix_path("relative/dir"), "relative/dir");
    }

    #[test]
    fn test_list_rewrites_drives_before_split() {
        let value = r"C:\foo:C:\bah";
        assert_eq!(normalize_path_list(value), "/c/foo:/c/bah");
        assert_eq!(split_path_list(value, ':'), vec!["/c/foo", "/c/bah"]);
    }

    #[test]
    fn test_list_with_consecutive_drive_segments() {
        assert_eq!(
            split_path_list(r"C:\a:D:\b\c:/usr/bin:E:\", ':'),
            vec!["/c/a", "/d/b/c", "/usr/bin", "/e/"]
        );
    }

    #[test]
    fn test_list_does_not_mistake_single_letter_entries_for_drives() {
        assert_eq!(split_path_list("a:/usr/bin", ':'), vec!["a", "/usr/bin"]);
    }

    #[test]
    fn test_unknown_windows_vars_are_kept() {
        assert_eq!(
            expand_windows_vars(r"%REXSH_SURELY_UNSET_VAR%\bin"),
            r"%REXSH_SURELY_UNSET_VAR%\bin"
        );
    }

    #[test]
    fn test_disabled_normalizer_is_identity() {
        let normalizer = PathNormalizer::new(false, Some(PathStyle::Posix));
        assert_eq!(normalizer.normalize_path(r"C:\foo\bar\spam"), r"C:\foo\bar\spam");
        assert_eq!(normalizer.normalize_paths(r"C:\foo:C:\bah"), r"C:\foo:C:\bah");
        assert_eq!(normalizer.as_path(r"C:\foo\bar\spam"), r"C:\foo\bar\spam");
        assert_eq!(normalizer.as_shell_path(r"C:\foo\bar\spam"), r"C:\foo\bar\spam");
        assert!(!normalizer.is_active());

        let windows = PathNormalizer::new(false, Some(PathStyle::Windows));
        assert_eq!(windows.as_path("/c/foo/bar"), "/c/foo/bar");
        assert_eq!(windows.as_shell_path("/c/foo/bar"), "/c/foo/bar");
    }

    #[test]
    fn test_enabled_posix_normalizer() {
        let normalizer = PathNormalizer::new(true, Some(PathStyle::Posix));
        assert_eq!(normalizer.normalize_path(r"C:\foo\bar\spam"), "/c/foo/bar/spam");
        assert_eq!(normalizer.as_shell_path(r"C:\Users\me\ctx.sh"), "C:/Users/me/ctx.sh");
    }

    #[test]
    fn test_windows_normalizer_converts_each_entry() {
        let normalizer = PathNormalizer::new(true, Some(PathStyle::Windows));
        assert_eq!(
            normalizer.normalize_paths("/c/foo;/d/bar"),
            r"C:\foo;D:\bar"
        );
    }
}
