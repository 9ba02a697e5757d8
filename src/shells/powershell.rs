// src/shells/powershell.rs

//! Grammar of Windows PowerShell and PowerShell Core.

use crate::core::{
    compiler::{Dialect, Side},
    rex::{Fragment, RexString},
};
use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    // Native `${Env:X}` / `$Env:X` (left alone) or generic `${X}` / `$X` (rewritten).
    static ref REFERENCE_RE: Regex =
        Regex::new(r"\$\{(?i:env):\w+\}|\$(?i:env):\w+|\$\{(\w+)\}|\$(\w+)")
            .expect("valid powershell reference regex");
    static ref BARE_KEY_RE: Regex = Regex::new(r"^\w+$").expect("valid key regex");
    static ref BARE_ARG_RE: Regex =
        Regex::new(r"^[\w./:\\=+,@-]+$").expect("valid bare argument regex");
}

/// Characters that end a double-quoted PowerShell string.
const DOUBLE_QUOTES: [char; 4] = ['"', '\u{201C}', '\u{201D}', '\u{201E}'];

/// Line grammar of the PowerShell families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerShellDialect {
    pathsep: &'static str,
}

impl PowerShellDialect {
    /// A dialect joining lists with `pathsep`.
    pub fn new(pathsep: &'static str) -> Self {
        Self { pathsep }
    }
}

fn escape_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '`' || c == '$' || DOUBLE_QUOTES.contains(&c) {
            out.push('`');
        }
        out.push(c);
    }
    out
}

fn escape_expandable(text: &str) -> String {
    let native = to_native_references(text);
    let mut out = String::with_capacity(native.len());
    for c in native.chars() {
        if DOUBLE_QUOTES.contains(&c) {
            out.push('`');
        }
        out.push(c);
    }

    // A trailing `$` or an unpaired trailing backtick would bind to whatever follows
    // the fragment.
    let body = out.trim_end_matches('$');
    let dollars = out.len() - body.len();
    let ticks = body.len() - body.trim_end_matches('`').len();
    if dollars > 0 && ticks % 2 == 0 {
        let head = body.to_string();
        out = format!("{}`{}", head, "$".repeat(dollars));
    } else if dollars == 0 && ticks % 2 == 1 {
        out.push('`');
    }
    out
}

/// Rewrites generic `${NAME}` and `$NAME` references into `${Env:NAME}` and `$Env:NAME`.
pub fn to_native_references(text: &str) -> String {
    REFERENCE_RE
        .replace_all(text, |caps: &Captures<'_>| {
            if let Some(name) = caps.get(1) {
                format!("${{Env:{}}}", name.as_str())
            } else if let Some(name) = caps.get(2) {
                format!("$Env:{}", name.as_str())
            } else {
                caps.get(0).map_or("", |m| m.as_str()).to_string()
            }
        })
        .into_owned()
}

/// Renders a value as a double-quoted PowerShell string.
pub fn quote(value: &RexString) -> String {
    let body: String = value
        .fragments()
        .iter()
        .map(|fragment| match fragment {
            Fragment::Literal(text) => escape_literal(text),
            Fragment::Expandable(text) => escape_expandable(text),
        })
        .collect();
    format!("\"{}\"", body)
}

/// Quotes an argument vector into one PowerShell command line. Arguments with special
/// characters become single-quoted strings; a quoted program name is invoked with `&`.
pub fn join(argv: &[String]) -> String {
    let quoted: Vec<String> = argv
        .iter()
        .map(|arg| {
            if BARE_ARG_RE.is_match(arg) {
                arg.clone()
            } else {
                format!("'{}'", arg.replace('\'', "''"))
            }
        })
        .collect();
    let line = quoted.join(" ");
    match argv.first() {
        Some(program) if !BARE_ARG_RE.is_match(program) => format!("& {}", line),
        _ => line,
    }
}

impl Dialect for PowerShellDialect {
    fn pathsep(&self) -> &str {
        self.pathsep
    }

    fn key_token(&self, key: &str) -> String {
        if BARE_KEY_RE.is_match(key) {
            format!("$Env:{}", key)
        } else {
            format!("${{Env:{}}}", key)
        }
    }

    fn all_key_tokens(&self, key: &str) -> Vec<String> {
        vec![format!("$Env:{}", key), format!("${{Env:{}}}", key)]
    }

    fn shebang(&self) -> String {
        "#Requires -Version 3.0".to_string()
    }

    fn setenv(&self, key: &str, value: &RexString) -> String {
        format!("{} = {}", self.key_token(key), quote(value))
    }

    fn unsetenv(&self, key: &str) -> String {
        format!("Remove-Item Env:\\{} -ErrorAction SilentlyContinue", key)
    }

    fn pend(
        &self,
        key: &str,
        value: &RexString,
        separator: &str,
        side: Side,
        guarded: bool,
    ) -> String {
        let token = self.key_token(key);
        if guarded {
            let items = match side {
                Side::Append => format!("{}, {}", token, quote(value)),
                Side::Prepend => format!("{}, {}", quote(value), token),
            };
            return format!(
                "{} = (@({}) | Where-Object {{ $_ }}) -join {}",
                token,
                items,
                quote(&RexString::literal(separator))
            );
        }
        let current = RexString::expandable(format!("${{Env:{}}}", key));
        let joined = match side {
            Side::Append => current + RexString::literal(separator) + value.clone(),
            Side::Prepend => value.clone() + RexString::literal(separator) + current,
        };
        self.setenv(key, &joined)
    }

    fn alias(&self, name: &str, command: &str) -> String {
        format!("function {} {{ {} @args }}", name, command)
    }

    fn comment(&self, text: &str) -> String {
        text.lines()
            .map(|line| format!("# {}", line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn info(&self, value: &RexString) -> String {
        format!("Write-Output {}", quote(value))
    }

    fn error(&self, value: &RexString) -> String {
        format!("[Console]::Error.WriteLine({})", quote(value))
    }

    fn source(&self, path: &RexString) -> String {
        format!(". {}", quote(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dialect() -> PowerShellDialect {
        PowerShellDialect::new(";")
    }

    #[test]
    fn test_literal_escaping() {
        assert_eq!(
            quote(&RexString::literal("a\"b`c$d\u{201C}e'f&<>^\\")),
            "\"a`\"b``c`$d`\u{201C}e'f&<>^\\\""
        );
    }

    #[test]
    fn test_generic_references_become_native() {
        assert_eq!(
            to_native_references("${HOME}/x:$USER:$Env:PATH:${env:TEMP}"),
            "${Env:HOME}/x:$Env:USER:$Env:PATH:${env:TEMP}"
        );
    }

    #[test]
    fn test_literal_dollar_next_to_expandable_reference() {
        let value = RexString::expandable("$X").l("$Y");
        assert_eq!(quote(&value), "\"$Env:X`$Y\"");
    }

    #[test]
    fn test_trailing_dollar_and_backtick_are_guarded() {
        assert_eq!(quote(&RexString::expandable("cost$").l("5")), "\"cost`$5\"");
        assert_eq!(quote(&RexString::expandable("tick`").l("n")), "\"tick``n\"");
        assert_eq!(quote(&RexString::expandable("ok``")), "\"ok``\"");
    }

    #[test]
    fn test_setenv_and_unsetenv() {
        let d = dialect();
        assert_eq!(d.setenv("A", &RexString::literal("x")), "$Env:A = \"x\"");
        assert_eq!(
            d.setenv("ProgramFiles(x86)", &RexString::literal("x")),
            "${Env:ProgramFiles(x86)} = \"x\""
        );
        assert_eq!(
            d.unsetenv("A"),
            "Remove-Item Env:\\A -ErrorAction SilentlyContinue"
        );
    }

    #[test]
    fn test_pend_forms() {
        let d = dialect();
        let value = RexString::literal(r"C:\bin");
        assert_eq!(
            d.pend("PATH", &value, ";", Side::Append, false),
            "$Env:PATH = \"${Env:PATH};C:\\bin\""
        );
        assert_eq!(
            d.pend("PATH", &value, ";", Side::Append, true),
            "$Env:PATH = (@($Env:PATH, \"C:\\bin\") | Where-Object { $_ }) -join \";\""
        );
        assert_eq!(
            d.pend("PATH", &value, ";", Side::Prepend, true),
            "$Env:PATH = (@(\"C:\\bin\", $Env:PATH) | Where-Object { $_ }) -join \";\""
        );
    }

    #[test]
    fn test_join_invokes_quoted_programs() {
        let argv = vec![r"C:\Program Files\tool.exe".to_string(), "-x".to_string()];
        assert_eq!(join(&argv), r"& 'C:\Program Files\tool.exe' -x");
        assert_eq!(join(&["echo".to_string(), "it's".to_string()]), "echo 'it''s'");
    }

    #[test]
    fn test_misc_lines() {
        let d = dialect();
        assert_eq!(d.alias("hi", "echo hi"), "function hi { echo hi @args }");
        assert_eq!(d.info(&RexString::literal("hi")), "Write-Output \"hi\"");
        assert_eq!(
            d.error(&RexString::literal("no")),
            "[Console]::Error.WriteLine(\"no\")"
        );
        assert_eq!(
            d.source(&RexString::literal(r"C:\tmp\ctx.ps1")),
            ". \"C:\\tmp\\ctx.ps1\""
        );
        assert_eq!(d.all_key_tokens("X"), vec!["$Env:X", "${Env:X}"]);
    }
}
