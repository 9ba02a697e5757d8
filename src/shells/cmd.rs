// src/shells/cmd.rs

//! Grammar of the Windows console interpreter, `cmd.exe`.
//!
//! cmd has no real quoting: a `"` only toggles a parser state in which `& < > | ^` lose
//! their meaning, and `%` expansion runs before any of that. The escaper therefore walks
//! every value character by character while tracking quote parity across fragment
//! boundaries.

use crate::core::{
    compiler::{Dialect, Side},
    rex::{Fragment, RexString},
};
use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    // Generic references an expandable fragment may use.
    static ref GENERIC_REF_RE: Regex =
        Regex::new(r"\$\{(\w+)\}|\$(\w+)").expect("valid generic reference regex");
    // Batch arguments (`%~dp0`, `%1`, `%*`) first so they never open a `%NAME%` that
    // swallows the text up to the next percent sign. Then `%NAME%`, then a lone `%`.
    static ref PERCENT_TOKEN_RE: Regex =
        Regex::new(r"%~[a-zA-Z]*[0-9]|%[0-9*]|%[^%\s]+%|%").expect("valid percent token regex");
}

/// Line grammar of `cmd.exe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdDialect {
    doskey: String,
}

impl CmdDialect {
    /// Resolves `doskey.exe` now so aliases keep working after the script edits `PATH`.
    pub fn new() -> Self {
        let doskey = match which::which("doskey") {
            Ok(path) => format!("\"{}\"", dunce::simplified(&path).display()),
            Err(_) => "doskey".to_string(),
        };
        Self { doskey }
    }

    /// A dialect using `doskey` as the macro command.
    pub fn with_doskey(doskey: impl Into<String>) -> Self {
        Self {
            doskey: doskey.into(),
        }
    }
}

impl Default for CmdDialect {
    fn default() -> Self {
        Self::new()
    }
}

/// Escapes a value for cmd, starting in the given quote state.
///
/// Returns the escaped text and whether the parser ends inside quotes.
pub fn escape(value: &RexString, mut in_quotes: bool) -> (String, bool) {
    let mut out = String::new();
    for fragment in value.fragments() {
        match fragment {
            Fragment::Literal(text) => {
                for c in text.chars() {
                    push_char(&mut out, c, &mut in_quotes);
                }
            }
            Fragment::Expandable(text) => {
                let native = to_native_references(text);
                let mut last = 0;
                for token in PERCENT_TOKEN_RE.find_iter(&native) {
                    for c in native.get(last..token.start()).unwrap_or("").chars() {
                        push_char(&mut out, c, &mut in_quotes);
                    }
                    match token.as_str() {
                        "%" => out.push_str("%%"),
                        reference => out.push_str(reference),
                    }
                    last = token.end();
                }
                for c in native.get(last..).unwrap_or("").chars() {
                    push_char(&mut out, c, &mut in_quotes);
                }
            }
        }
    }
    (out, in_quotes)
}

/// Rewrites `${NAME}` and `$NAME` into `%NAME%`.
pub fn to_native_references(text: &str) -> String {
    GENERIC_REF_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map_or("", |m| m.as_str());
            format!("%{}%", name)
        })
        .into_owned()
}

fn push_char(out: &mut String, c: char, in_quotes: &mut bool) {
    match c {
        '%' => out.push_str("%%"),
        '"' => {
            out.push('"');
            *in_quotes = !*in_quotes;
        }
        '^' | '&' | '<' | '>' | '|' | '(' | ')' if !*in_quotes => {
            out.push('^');
            out.push(c);
        }
        _ => out.push(c),
    }
}

/// Quotes one argument the way the MSVC runtime splits command lines.
pub fn quote_arg(arg: &str) -> String {
    let needs_quotes = arg.is_empty() || arg.contains([' ', '\t']);
    let mut out = String::with_capacity(arg.len() + 2);
    if needs_quotes {
        out.push('"');
    }
    let mut backslashes = 0usize;
    for c in arg.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                out.push_str(&"\\".repeat(backslashes * 2 + 1));
                out.push('"');
                backslashes = 0;
            }
            _ => {
                out.push_str(&"\\".repeat(backslashes));
                out.push(c);
                backslashes = 0;
            }
        }
    }
    if needs_quotes {
        out.push_str(&"\\".repeat(backslashes * 2));
        out.push('"');
    } else {
        out.push_str(&"\\".repeat(backslashes));
    }
    out
}

fn set_line(key: &str, value: &RexString) -> String {
    let (escaped, _) = escape(value, true);
    format!("set \"{}={}\"", key, escaped)
}

impl Dialect for CmdDialect {
    fn pathsep(&self) -> &str {
        ";"
    }

    fn key_token(&self, key: &str) -> String {
        format!("%{}%", key)
    }

    fn all_key_tokens(&self, key: &str) -> Vec<String> {
        vec![self.key_token(key)]
    }

    fn shebang(&self) -> String {
        "@echo off".to_string()
    }

    fn setenv(&self, key: &str, value: &RexString) -> String {
        set_line(key, value)
    }

    fn unsetenv(&self, key: &str) -> String {
        format!("set {}=", key)
    }

    fn pend(
        &self,
        key: &str,
        value: &RexString,
        separator: &str,
        side: Side,
        guarded: bool,
    ) -> String {
        let current = RexString::expandable(self.key_token(key));
        let joined = match side {
            Side::Append => current + RexString::literal(separator) + value.clone(),
            Side::Prepend => value.clone() + RexString::literal(separator) + current,
        };
        if guarded {
            format!(
                "if defined {k} {joined}\nif not defined {k} {bare}",
                k = key,
                joined = set_line(key, &joined),
                bare = set_line(key, value)
            )
        } else {
            set_line(key, &joined)
        }
    }

    fn alias(&self, name: &str, command: &str) -> String {
        format!("{} {}={} $*", self.doskey, name, command)
    }

    fn comment(&self, text: &str) -> String {
        text.lines()
            .map(|line| format!("REM {}", line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn info(&self, value: &RexString) -> String {
        format!("echo({}", escape(value, false).0)
    }

    fn error(&self, value: &RexString) -> String {
        format!("1>&2 echo({}", escape(value, false).0)
    }

    fn source(&self, path: &RexString) -> String {
        format!("call \"{}\"", escape(path, true).0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dialect() -> CmdDialect {
        CmdDialect::with_doskey("doskey")
    }

    #[test]
    fn test_set_inside_quotes_keeps_metacharacters() {
        assert_eq!(
            dialect().setenv("A", &RexString::literal("a&b<c>d^e|f")),
            r#"set "A=a&b<c>d^e|f""#
        );
    }

    #[test]
    fn test_quote_parity_flips_escaping() {
        // After the embedded quote the parser is outside quotes, so `&` needs a caret.
        assert_eq!(
            dialect().setenv("A", &RexString::literal(r#"x"y&z"#)),
            r#"set "A=x"y^&z""#
        );
        assert_eq!(
            dialect().setenv("A", &RexString::literal(r#"say "hi" & go"#)),
            r#"set "A=say "hi" & go""#
        );
    }

    #[test]
    fn test_parity_carries_across_fragments() {
        let value = RexString::literal("\"").e("a&b");
        assert_eq!(dialect().setenv("A", &value), r#"set "A="a^&b""#);
    }

    #[test]
    fn test_percent_handling() {
        assert_eq!(
            dialect().setenv("A", &RexString::literal("100%")),
            r#"set "A=100%%""#
        );
        assert_eq!(
            dialect().setenv("A", &RexString::expandable("%PATH%;${HOME};$X;%~dp0;50%")),
            r#"set "A=%PATH%;%HOME%;%X%;%~dp0;50%%""#
        );
    }

    #[test]
    fn test_batch_arguments_do_not_swallow_later_text() {
        assert_eq!(
            dialect().setenv("A", &RexString::expandable("%1;%*;%~f2 is 5%")),
            r#"set "A=%1;%*;%~f2 is 5%%""#
        );
        assert_eq!(
            dialect().setenv("A", &RexString::expandable("%~dp0bin;%PATH%")),
            r#"set "A=%~dp0bin;%PATH%""#
        );
    }

    #[test]
    fn test_literal_references_are_not_expanded() {
        assert_eq!(
            dialect().setenv("A", &RexString::literal("%FOO% ${BAR}")),
            r#"set "A=%%FOO%% ${BAR}""#
        );
    }

    #[test]
    fn test_pend_forms() {
        let value = RexString::literal(r"C:\bin");
        let d = dialect();
        assert_eq!(
            d.pend("PATH", &value, ";", Side::Append, false),
            r#"set "PATH=%PATH%;C:\bin""#
        );
        assert_eq!(
            d.pend("PATH", &value, ";", Side::Prepend, true),
            "if defined PATH set \"PATH=C:\\bin;%PATH%\"\nif not defined PATH set \"PATH=C:\\bin\""
        );
    }

    #[test]
    fn test_echo_starts_outside_quotes() {
        let d = dialect();
        assert_eq!(d.info(&RexString::literal("a&b")), "echo(a^&b");
        assert_eq!(d.info(&RexString::literal(r#""a&b""#)), r#"echo("a&b""#);
        assert_eq!(d.error(&RexString::literal("oops")), "1>&2 echo(oops");
        assert_eq!(d.info(&RexString::new()), "echo(");
    }

    #[test]
    fn test_quote_arg() {
        assert_eq!(quote_arg("plain"), "plain");
        assert_eq!(quote_arg(""), r#""""#);
        assert_eq!(quote_arg("a b"), r#""a b""#);
        assert_eq!(quote_arg(r#"say "hi""#), r#""say \"hi\"""#);
        assert_eq!(quote_arg(r"C:\dir with space\"), r#""C:\dir with space\\""#);
        assert_eq!(quote_arg(r"C:\plain\"), r"C:\plain\");
    }

    #[test]
    fn test_misc_lines() {
        let d = dialect();
        assert_eq!(d.unsetenv("A"), "set A=");
        assert_eq!(d.shebang(), "@echo off");
        assert_eq!(d.alias("hi", "echo hi"), "doskey hi=echo hi $*");
        assert_eq!(d.comment("note"), "REM note");
        assert_eq!(
            d.source(&RexString::literal(r"C:\tmp\ctx.bat")),
            r#"call "C:\tmp\ctx.bat""#
        );
        assert_eq!(d.key_token("PATH"), "%PATH%");
    }
}
