//! # Rex
//!
//! The intermediate representation for environment mutations. A caller records an
//! ordered [`ActionList`] (set, unset, append, prepend, alias, ...) whose values are
//! [`RexString`]s: concatenations of literal and expandable [`Fragment`]s. A shell
//! backend later compiles the list into script text for one interpreter family.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::ops::Add;

/// One piece of a value, tagged with how the backend must treat it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fragment {
    /// Must reach the interpreter's result byte for byte; every metacharacter is neutralized.
    Literal(String),
    /// May contain the interpreter's variable-reference syntax, resolved at run time.
    Expandable(String),
}

impl Fragment {
    /// The raw text of the fragment.
    pub fn text(&self) -> &str {
        match self {
            Fragment::Literal(s) | Fragment::Expandable(s) => s,
        }
    }

    /// True for [`Fragment::Literal`].
    pub fn is_literal(&self) -> bool {
        matches!(self, Fragment::Literal(_))
    }
}

/// An ordered concatenation of fragments.
///
/// Adjacent fragments of the same kind are merged on insertion, so a value never holds
/// two neighbouring literals (or expandables). Fragment boundaries between kinds are
/// preserved exactly.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct RexString {
    fragments: Vec<Fragment>,
}

impl RexString {
    /// An empty value.
    pub fn new() -> Self {
        Self::default()
    }

    /// A value made of a single literal fragment.
    pub fn literal(text: impl Into<String>) -> Self {
        Self::new().l(text)
    }

    /// A value made of a single expandable fragment.
    pub fn expandable(text: impl Into<String>) -> Self {
        Self::new().e(text)
    }

    /// Appends a literal fragment.
    pub fn l(mut self, text: impl Into<String>) -> Self {
        self.push(Fragment::Literal(text.into()));
        self
    }

    /// Appends an expandable fragment.
    pub fn e(mut self, text: impl Into<String>) -> Self {
        self.push(Fragment::Expandable(text.into()));
        self
    }

    /// Appends a fragment, merging it into the last one when both share a kind.
    pub fn push(&mut self, fragment: Fragment) {
        if fragment.text().is_empty() {
            return;
        }
        if let Some(last) = self.fragments.last_mut() {
            match (last, &fragment) {
                (Fragment::Literal(prev), Fragment::Literal(next))
                | (Fragment::Expandable(prev), Fragment::Expandable(next)) => {
                    prev.push_str(next);
                    return;
                }
                _ => {}
            }
        }
        self.fragments.push(fragment);
    }

    /// Appends every fragment of `other`.
    pub fn extend(&mut self, other: RexString) {
        for fragment in other.fragments {
            self.push(fragment);
        }
    }

    /// The fragments in order.
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// True when the value holds no text at all.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// True when every fragment is literal (an empty value counts as literal).
    pub fn is_literal(&self) -> bool {
        self.fragments.iter().all(Fragment::is_literal)
    }

    /// The concatenated text with no escaping applied.
    pub fn raw(&self) -> String {
        self.fragments.iter().map(Fragment::text).collect()
    }

    /// Returns a copy with a leading `~` of the first expandable fragment replaced by the
    /// user's home directory. Literal fragments are never touched.
    pub fn expand_user(&self) -> RexString {
        let mut out = RexString::new();
        for (i, fragment) in self.fragments.iter().enumerate() {
            match fragment {
                Fragment::Expandable(text) if i == 0 && text.starts_with('~') => {
                    out.push(Fragment::Expandable(shellexpand::tilde(text).into_owned()))
                }
                other => out.push(other.clone()),
            }
        }
        out
    }

    /// Returns a copy whose expandable fragments went through `f`.
    pub fn map_expandable(&self, f: impl Fn(&str) -> String) -> RexString {
        let mut out = RexString::new();
        for fragment in &self.fragments {
            match fragment {
                Fragment::Expandable(text) => out.push(Fragment::Expandable(f(text))),
                other => out.push(other.clone()),
            }
        }
        out
    }
}

impl From<&str> for RexString {
    /// Plain strings promote to expandable values.
    fn from(value: &str) -> Self {
        RexString::expandable(value)
    }
}

impl From<String> for RexString {
    fn from(value: String) -> Self {
        RexString::expandable(value)
    }
}

impl Add for RexString {
    type Output = RexString;

    fn add(mut self, rhs: RexString) -> RexString {
        self.extend(rhs);
        self
    }
}

impl fmt::Display for RexString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw())
    }
}

/// One step of an environment mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Assigns (and exports) a variable.
    Setenv { key: String, value: RexString },
    /// Removes a variable.
    Unsetenv { key: String },
    /// Adds an entry at the end of a list variable.
    Appendenv {
        key: String,
        value: RexString,
        separator: Option<String>,
    },
    /// Adds an entry at the front of a list variable.
    Prependenv {
        key: String,
        value: RexString,
        separator: Option<String>,
    },
    /// Defines a command alias; `command` is interpreter source text.
    Alias { name: String, command: String },
    /// A raw line emitted verbatim.
    Command(String),
    /// A comment line.
    Comment(String),
    /// Prints a value on standard output.
    Info(RexString),
    /// Prints a value on standard error.
    Error(RexString),
    /// Runs another script inside the current interpreter.
    Source(RexString),
    /// The interpreter's script header.
    Shebang,
}

/// An ordered, append-only list of [`Action`]s.
///
/// ```
/// use rexsh::core::rex::{ActionList, RexString};
///
/// let mut actions = ActionList::new();
/// actions
///     .setenv("WHO", RexString::literal("Gary"))
///     .appendenv("PATH", "/opt/tool/bin")
///     .alias("hi", "echo hi");
/// assert_eq!(actions.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionList {
    actions: Vec<Action>,
}

impl ActionList {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an arbitrary action.
    pub fn push(&mut self, action: Action) -> &mut Self {
        self.actions.push(action);
        self
    }

    /// Records `key = value`.
    pub fn setenv(&mut self, key: impl Into<String>, value: impl Into<RexString>) -> &mut Self {
        self.push(Action::Setenv {
            key: key.into(),
            value: value.into(),
        })
    }

    /// Records an unset of `key`.
    pub fn unsetenv(&mut self, key: impl Into<String>) -> &mut Self {
        self.push(Action::Unsetenv { key: key.into() })
    }

    /// Records an append using the interpreter's native list separator.
    pub fn appendenv(&mut self, key: impl Into<String>, value: impl Into<RexString>) -> &mut Self {
        self.push(Action::Appendenv {
            key: key.into(),
            value: value.into(),
            separator: None,
        })
    }

    /// Records a prepend using the interpreter's native list separator.
    pub fn prependenv(&mut self, key: impl Into<String>, value: impl Into<RexString>) -> &mut Self {
        self.push(Action::Prependenv {
            key: key.into(),
            value: value.into(),
            separator: None,
        })
    }

    /// Records an append joined with an explicit separator.
    pub fn appendenv_with(
        &mut self,
        key: impl Into<String>,
        value: impl Into<RexString>,
        separator: impl Into<String>,
    ) -> &mut Self {
        self.push(Action::Appendenv {
            key: key.into(),
            value: value.into(),
            separator: Some(separator.into()),
        })
    }

    /// Records a prepend joined with an explicit separator.
    pub fn prependenv_with(
        &mut self,
        key: impl Into<String>,
        value: impl Into<RexString>,
        separator: impl Into<String>,
    ) -> &mut Self {
        self.push(Action::Prependenv {
            key: key.into(),
            value: value.into(),
            separator: Some(separator.into()),
        })
    }

    /// Records an alias definition.
    pub fn alias(&mut self, name: impl Into<String>, command: impl Into<String>) -> &mut Self {
        self.push(Action::Alias {
            name: name.into(),
            command: command.into(),
        })
    }

    /// Records a raw line.
    pub fn command(&mut self, line: impl Into<String>) -> &mut Self {
        self.push(Action::Command(line.into()))
    }

    /// Records a comment.
    pub fn comment(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Action::Comment(text.into()))
    }

    /// Records a print to standard output.
    pub fn info(&mut self, value: impl Into<RexString>) -> &mut Self {
        self.push(Action::Info(value.into()))
    }

    /// Records a print to standard error.
    pub fn error(&mut self, value: impl Into<RexString>) -> &mut Self {
        self.push(Action::Error(value.into()))
    }

    /// Records sourcing of another script.
    pub fn source(&mut self, path: impl Into<RexString>) -> &mut Self {
        self.push(Action::Source(path.into()))
    }

    /// Records the script header.
    pub fn shebang(&mut self) -> &mut Self {
        self.push(Action::Shebang)
    }

    /// Appends every action of `other`.
    pub fn extend(&mut self, other: ActionList) -> &mut Self {
        self.actions.extend(other.actions);
        self
    }

    /// The recorded actions in order.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Number of recorded actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// True when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// The aliases defined so far; a later definition of the same name wins.
    pub fn aliases(&self) -> HashMap<&str, &str> {
        self.actions
            .iter()
            .filter_map(|action| match action {
                Action::Alias { name, command } => Some((name.as_str(), command.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Builds the actions turning environment `before` into `after`.
    ///
    /// Removed keys are unset, new or changed keys are assigned as literals. Keys are
    /// visited in sorted order so the result is deterministic.
    pub fn from_environ_delta(
        before: &HashMap<String, String>,
        after: &HashMap<String, String>,
    ) -> Self {
        let mut list = ActionList::new();
        let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
        for key in keys {
            match (before.get(key), after.get(key)) {
                (Some(_), None) => {
                    list.unsetenv(key.as_str());
                }
                (old, Some(new)) if old != Some(new) => {
                    list.setenv(key.as_str(), RexString::literal(new.as_str()));
                }
                _ => {}
            }
        }
        list
    }
}

impl IntoIterator for ActionList {
    type Item = Action;
    type IntoIter = std::vec::IntoIter<Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjacent_fragments_of_same_kind_merge() {
        let value = RexString::literal("a").l("b").e("$X").e("y").l("z");
        assert_eq!(
            value.fragments(),
            &[
                Fragment::Literal("ab".to_string()),
                Fragment::Expandable("$Xy".to_string()),
                Fragment::Literal("z".to_string()),
            ]
        );
        assert_eq!(value.raw(), "ab$Xyz");
    }

    #[test]
    fn test_empty_fragments_are_dropped() {
        let value = RexString::literal("").e("").l("x");
        assert_eq!(value.fragments().len(), 1);
        assert!(RexString::expandable("").is_empty());
    }

    #[test]
    fn test_plain_strings_promote_to_expandable() {
        let value: RexString = "hey $WHO".into();
        assert!(!value.is_literal());
        assert!(RexString::literal("${WHO}").is_literal());
    }

    #[test]
    fn test_add_preserves_boundaries() {
        let value = RexString::literal("${WHO}") + RexString::expandable(" $WHO");
        assert_eq!(value.fragments().len(), 2);
        assert!(value.fragments()[0].is_literal());
    }

    #[test]
    fn test_expand_user_only_touches_expandable_prefix() {
        let literal = RexString::literal("~/bin");
        assert_eq!(literal.expand_user(), literal);

        let expanded = RexString::expandable("~/bin").expand_user().raw();
        if dirs::home_dir().is_some() {
            assert!(!expanded.starts_with('~'));
        }
        assert!(expanded.ends_with("/bin"));
    }

    #[test]
    fn test_aliases_last_definition_wins() {
        let mut list = ActionList::new();
        list.alias("hi", "echo one").setenv("X", "1").alias("hi", "echo two");
        assert_eq!(list.aliases().get("hi"), Some(&"echo two"));
    }

    #[test]
    fn test_environ_delta() {
        let before: HashMap<String, String> = [("A", "1"), ("B", "2"), ("C", "3")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let after: HashMap<String, String> = [("A", "1"), ("B", "two"), ("D", "4")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let list = ActionList::from_environ_delta(&before, &after);
        assert_eq!(
            list.actions(),
            &[
                Action::Setenv {
                    key: "B".to_string(),
                    value: RexString::literal("two")
                },
                Action::Unsetenv {
                    key: "C".to_string()
                },
                Action::Setenv {
                    key: "D".to_string(),
                    value: RexString::literal("4")
                },
            ]
        );
    }
}
