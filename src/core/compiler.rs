//! # Compiler
//!
//! Turns an [`ActionList`] into script text for one interpreter family.
//!
//! The driver here owns everything that is family-independent: it walks the actions in
//! order, tracks what the script has done to each variable so far, applies path
//! normalization to path-list variables, and hands each step to a [`Dialect`], which only
//! knows how to spell a single line for its interpreter.

use crate::{
    core::{
        paths::PathNormalizer,
        rex::{Action, ActionList, RexString},
    },
    models::RexshConfig,
};
use regex::Regex;
use std::collections::HashMap;

/// Which end of a list variable an entry is added to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// After the existing entries.
    Append,
    /// Before the existing entries.
    Prepend,
}

/// What the script has done to a variable so far.
///
/// A variable missing from the state map is inherited: the script never touched it and
/// whether it exists depends on the parent environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VarState {
    Set,
    Unset,
}

/// The line-level grammar of one interpreter family.
///
/// Every method receives unescaped values; escaping literal fragments and rewriting
/// generic references in expandable fragments is the dialect's job.
pub trait Dialect {
    /// The native list separator.
    fn pathsep(&self) -> &str;

    /// The preferred reference form of a variable.
    fn key_token(&self, key: &str) -> String;

    /// Every reference form of a variable the interpreter understands.
    fn all_key_tokens(&self, key: &str) -> Vec<String>;

    /// The script header.
    fn shebang(&self) -> String;

    /// Assigns and exports `key`.
    fn setenv(&self, key: &str, value: &RexString) -> String;

    /// Removes `key` from the environment.
    fn unsetenv(&self, key: &str) -> String;

    /// Adds `value` to a list variable.
    ///
    /// With `guarded` false the variable is known to be set and the separator is always
    /// written. With `guarded` true the variable may be empty or undefined at run time
    /// and the separator must only appear when it holds something.
    fn pend(&self, key: &str, value: &RexString, separator: &str, side: Side, guarded: bool)
    -> String;

    /// Defines `name` so that it keeps working after later changes to the search path.
    fn alias(&self, name: &str, command: &str) -> String;

    /// A comment line.
    fn comment(&self, text: &str) -> String;

    /// Prints `value` on standard output.
    fn info(&self, value: &RexString) -> String;

    /// Prints `value` on standard error.
    fn error(&self, value: &RexString) -> String;

    /// Runs the script at `path` inside the current interpreter.
    fn source(&self, path: &RexString) -> String;
}

/// Settings that shape compilation but do not depend on the family's grammar.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    normalizer: PathNormalizer,
    pathed_env_vars: Vec<Regex>,
}

impl CompileOptions {
    /// Builds options from a normalizer and the globs naming path-list variables.
    /// Globs that cannot be compiled are skipped with a warning.
    pub fn new(normalizer: PathNormalizer, globs: &[String]) -> Self {
        let pathed_env_vars = globs
            .iter()
            .filter_map(|glob| match glob_to_regex(glob) {
                Ok(re) => Some(re),
                Err(e) => {
                    log::warn!("Ignoring invalid pathed_env_vars entry '{}': {}", glob, e);
                    None
                }
            })
            .collect();
        Self {
            normalizer,
            pathed_env_vars,
        }
    }

    /// Options for `normalizer` using the configured `pathed_env_vars`.
    pub fn from_config(config: &RexshConfig, normalizer: PathNormalizer) -> Self {
        Self::new(normalizer, &config.pathed_env_vars)
    }

    /// True when `key` names a path-list variable.
    pub fn is_pathed(&self, key: &str) -> bool {
        self.pathed_env_vars.iter().any(|re| re.is_match(key))
    }

    /// The normalizer applied to path-list variables.
    pub fn normalizer(&self) -> &PathNormalizer {
        &self.normalizer
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::from_config(&RexshConfig::default(), PathNormalizer::identity())
    }
}

/// Compiles a shell glob (`*` and `?` wildcards) into an anchored, case-insensitive regex.
///
/// Variable names are case-insensitive on Windows (`Path` vs `PATH`), so matching ignores
/// case everywhere.
pub fn glob_to_regex(glob: &str) -> Result<Regex, regex::Error> {
    let mut pattern = String::from("(?i)^");
    for c in glob.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            other => pattern.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    pattern.push('$');
    Regex::new(&pattern)
}

/// Compiles `actions` into a script for `dialect`.
///
/// Compilation is pure and never fails: every action maps to exactly one line (which may
/// itself span several physical lines for interpreters without a conditional expression
/// form). The returned text ends with a newline unless `actions` is empty.
pub fn compile<D: Dialect + ?Sized>(
    dialect: &D,
    actions: &ActionList,
    options: &CompileOptions,
) -> String {
    let mut states: HashMap<&str, VarState> = HashMap::new();
    let mut lines: Vec<String> = Vec::with_capacity(actions.len());

    for action in actions.actions() {
        let line = match action {
            Action::Setenv { key, value } => {
                states.insert(key, VarState::Set);
                dialect.setenv(key, &prepare_value(key, value, options))
            }
            Action::Unsetenv { key } => {
                states.insert(key, VarState::Unset);
                dialect.unsetenv(key)
            }
            Action::Appendenv {
                key,
                value,
                separator,
            } => pend(dialect, &mut states, key, value, separator.as_deref(), Side::Append, options),
            Action::Prependenv {
                key,
                value,
                separator,
            } => pend(dialect, &mut states, key, value, separator.as_deref(), Side::Prepend, options),
            Action::Alias { name, command } => dialect.alias(name, command),
            Action::Command(line) => line.clone(),
            Action::Comment(text) => dialect.comment(text),
            Action::Info(value) => dialect.info(&value.expand_user()),
            Action::Error(value) => dialect.error(&value.expand_user()),
            Action::Source(path) => dialect.source(&path.expand_user()),
            Action::Shebang => dialect.shebang(),
        };
        lines.push(line);
    }

    let mut script = lines.join("\n");
    if !script.is_empty() {
        script.push('\n');
    }
    log::debug!("Compiled {} actions:\n{}", actions.len(), script);
    script
}

fn pend<'a, D: Dialect + ?Sized>(
    dialect: &D,
    states: &mut HashMap<&'a str, VarState>,
    key: &'a str,
    value: &RexString,
    separator: Option<&str>,
    side: Side,
    options: &CompileOptions,
) -> String {
    let value = prepare_value(key, value, options);
    let separator = separator.unwrap_or_else(|| dialect.pathsep());
    let line = match states.get(key) {
        Some(VarState::Unset) => dialect.setenv(key, &value),
        Some(VarState::Set) => dialect.pend(key, &value, separator, side, false),
        None => dialect.pend(key, &value, separator, side, true),
    };
    states.insert(key, VarState::Set);
    line
}

/// Expands a leading `~` and, for path-list variables, normalizes expandable fragments.
/// Literal fragments pass through untouched.
fn prepare_value(key: &str, value: &RexString, options: &CompileOptions) -> RexString {
    let value = value.expand_user();
    if options.is_pathed(key) && options.normalizer.is_active() {
        value.map_expandable(|text| options.normalizer.normalize_paths(text))
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::paths::PathStyle;

    /// Spells every step as a readable tag so the driver's decisions are visible.
    struct Probe;

    impl Dialect for Probe {
        fn pathsep(&self) -> &str {
            ":"
        }
        fn key_token(&self, key: &str) -> String {
            format!("<{}>", key)
        }
        fn all_key_tokens(&self, key: &str) -> Vec<String> {
            vec![self.key_token(key)]
        }
        fn shebang(&self) -> String {
            "HEADER".to_string()
        }
        fn setenv(&self, key: &str, value: &RexString) -> String {
            format!("SET {}={}", key, value.raw())
        }
        fn unsetenv(&self, key: &str) -> String {
            format!("UNSET {}", key)
        }
        fn pend(
            &self,
            key: &str,
            value: &RexString,
            separator: &str,
            side: Side,
            guarded: bool,
        ) -> String {
            format!(
                "{:?} {} {} sep={} guarded={}",
                side,
                key,
                value.raw(),
                separator,
                guarded
            )
        }
        fn alias(&self, name: &str, command: &str) -> String {
            format!("ALIAS {}={}", name, command)
        }
        fn comment(&self, text: &str) -> String {
            format!("# {}", text)
        }
        fn info(&self, value: &RexString) -> String {
            format!("INFO {}", value.raw())
        }
        fn error(&self, value: &RexString) -> String {
            format!("ERROR {}", value.raw())
        }
        fn source(&self, path: &RexString) -> String {
            format!("SOURCE {}", path.raw())
        }
    }

    #[test]
    fn test_pend_tracks_variable_state() {
        let mut actions = ActionList::new();
        actions
            .appendenv("A", "one")
            .setenv("B", "x")
            .prependenv("B", "y")
            .unsetenv("C")
            .appendenv("C", "first")
            .appendenv("C", "second");

        let script = compile(&Probe, &actions, &CompileOptions::default());
        let lines: Vec<&str> = script.lines().collect();

        assert_eq!(
            lines,
            vec![
                "Append A one sep=: guarded=true",
                "SET B=x",
                "Prepend B y sep=: guarded=false",
                "UNSET C",
                "SET C=first",
                "Append C second sep=: guarded=false",
            ]
        );
    }

    #[test]
    fn test_explicit_separator_wins() {
        let mut actions = ActionList::new();
        actions.appendenv_with("FLAGS", "-O2", " ");
        let script = compile(&Probe, &actions, &CompileOptions::default());
        assert_eq!(script, "Append FLAGS -O2 sep=  guarded=true\n");
    }

    #[test]
    fn test_empty_list_compiles_to_empty_script() {
        assert_eq!(
            compile(&Probe, &ActionList::new(), &CompileOptions::default()),
            ""
        );
    }

    #[test]
    fn test_glob_matching_is_anchored_and_case_insensitive() {
        let options = CompileOptions::new(PathNormalizer::identity(), &["*PATH".to_string()]);
        assert!(options.is_pathed("PATH"));
        assert!(options.is_pathed("PYTHONPATH"));
        assert!(options.is_pathed("Path"));
        assert!(!options.is_pathed("PATHEXT"));

        let single = glob_to_regex("LD_?").unwrap();
        assert!(single.is_match("LD_X"));
        assert!(!single.is_match("LD_XY"));
    }

    #[test]
    fn test_pathed_variables_normalize_expandable_fragments_only() {
        let normalizer = PathNormalizer::new(true, Some(PathStyle::Posix));
        let options = CompileOptions::new(normalizer, &["*PATH".to_string()]);
        let mut actions = ActionList::new();
        actions
            .setenv("PATH", RexString::expandable(r"C:\tools\bin").l(r":D:\keep"))
            .setenv("OTHER", r"C:\tools\bin");

        let script = compile(&Probe, &actions, &options);
        let lines: Vec<&str> = script.lines().collect();
        assert_eq!(lines, vec![r"SET PATH=/c/tools/bin:D:\keep", r"SET OTHER=C:\tools\bin"]);
    }

    #[test]
    fn test_disabled_normalization_leaves_paths_alone() {
        let normalizer = PathNormalizer::new(false, Some(PathStyle::Posix));
        let options = CompileOptions::new(normalizer, &["*PATH".to_string()]);
        let mut actions = ActionList::new();
        actions.setenv("PATH", r"C:\tools\bin");
        assert_eq!(compile(&Probe, &actions, &options), "SET PATH=C:\\tools\\bin\n");
    }

    #[test]
    fn test_raw_lines_and_headers_pass_through() {
        let mut actions = ActionList::new();
        actions
            .shebang()
            .comment("generated")
            .command("echo raw")
            .alias("hi", "echo hi")
            .source("/etc/profile")
            .info(RexString::literal("hello"))
            .error("oops");

        let script = compile(&Probe, &actions, &CompileOptions::default());
        assert_eq!(
            script,
            "HEADER\n# generated\necho raw\nALIAS hi=echo hi\nSOURCE /etc/profile\nINFO hello\nERROR oops\n"
        );
    }
}
