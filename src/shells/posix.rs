// src/shells/posix.rs

//! Grammar of the Bourne-style interpreters: sh, bash, zsh and the Git Bash bridge.

use super::ShellKind;
use crate::core::{
    compiler::{Dialect, Side},
    rex::{Fragment, RexString},
};

/// Line grammar shared by every POSIX-style family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PosixDialect {
    kind: ShellKind,
}

impl PosixDialect {
    /// The dialect of `kind`, which must be a POSIX-style family.
    pub fn new(kind: ShellKind) -> Self {
        Self { kind }
    }
}

/// Wraps `text` in single quotes. An embedded `'` closes the quote, emits an escaped
/// quote and reopens it.
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

/// Escapes the characters that keep their meaning inside double quotes, except `$` and
/// the backtick, which carry the expandable syntax.
fn escape_expandable(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '\\' || c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escapes a separator so it can sit inside double quotes next to a reference.
fn escape_in_double_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Renders a value as one shell word: literal fragments single-quoted, expandable
/// fragments double-quoted. An empty value becomes `''`.
pub fn quote(value: &RexString) -> String {
    if value.is_empty() {
        return "''".to_string();
    }
    value
        .fragments()
        .iter()
        .map(|fragment| match fragment {
            Fragment::Literal(text) => quote_literal(text),
            Fragment::Expandable(text) => format!("\"{}\"", escape_expandable(text)),
        })
        .collect()
}

impl Dialect for PosixDialect {
    fn pathsep(&self) -> &str {
        ":"
    }

    fn key_token(&self, key: &str) -> String {
        format!("${{{}}}", key)
    }

    fn all_key_tokens(&self, key: &str) -> Vec<String> {
        vec![self.key_token(key), format!("${}", key)]
    }

    fn shebang(&self) -> String {
        match self.kind {
            ShellKind::Bash => "#!/usr/bin/env bash",
            ShellKind::Zsh => "#!/usr/bin/env zsh",
            ShellKind::GitBash => "#! /usr/bin/env bash",
            _ => "#!/bin/sh",
        }
        .to_string()
    }

    fn setenv(&self, key: &str, value: &RexString) -> String {
        format!("export {}={}", key, quote(value))
    }

    fn unsetenv(&self, key: &str) -> String {
        format!("unset {}", key)
    }

    fn pend(
        &self,
        key: &str,
        value: &RexString,
        separator: &str,
        side: Side,
        guarded: bool,
    ) -> String {
        let sep = escape_in_double_quotes(separator);
        let value = quote(value);
        match (side, guarded) {
            (Side::Append, false) => format!("export {k}=\"${{{k}}}{sep}\"{value}", k = key),
            (Side::Prepend, false) => format!("export {k}={value}\"{sep}${{{k}}}\"", k = key),
            (Side::Append, true) => {
                format!("export {k}=\"${{{k}:+${{{k}}}{sep}}}\"{value}", k = key)
            }
            (Side::Prepend, true) => {
                format!("export {k}={value}\"${{{k}:+{sep}${{{k}}}}}\"", k = key)
            }
        }
    }

    fn alias(&self, name: &str, command: &str) -> String {
        let function = format!("{}() {{ {} \"$@\"; }}", name, command);
        match self.kind {
            ShellKind::Bash | ShellKind::GitBash => format!("{}; export -f {}", function, name),
            _ => function,
        }
    }

    fn comment(&self, text: &str) -> String {
        text.lines()
            .map(|line| format!("# {}", line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn info(&self, value: &RexString) -> String {
        format!("printf '%s\\n' {}", quote(value))
    }

    fn error(&self, value: &RexString) -> String {
        format!("printf '%s\\n' {} 1>&2", quote(value))
    }

    fn source(&self, path: &RexString) -> String {
        format!(". {}", quote(path))
    }
}
