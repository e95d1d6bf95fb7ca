//! Flag definitions.
//!
//! A [`Flag`] is a named, typed setting. Its aliases all resolve to one
//! shared value cell, so setting the flag through any alias — or through
//! a merged registry built for a nested command scope — mutates the same
//! underlying value.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::value::{CustomValue, FlagValue};

/// A named, typed setting registered with a flag registry.
///
/// Constructed with the kind-specific constructors, then refined with the
/// `with_*` builder methods before registration.
///
/// Aliases are given as one comma- or whitespace-delimited string and are
/// stored sorted shortest-first (ties lexicographic), so the shortest
/// alias is canonical for display and sorting.
///
/// # Examples
///
/// ```
/// use cmdtree_core::Flag;
///
/// let flag = Flag::bool("help, h", false).with_usage("show help");
/// assert_eq!(flag.name(), "h");
/// assert_eq!(flag.aliases(), ["h", "help"]);
/// assert_eq!(flag.display(), "-h, --help");
///
/// let flag = Flag::string("output, o", "out.txt").with_metavar(" <path>");
/// assert_eq!(flag.display(), "-o, --output <path>");
/// ```
#[derive(Debug, Clone)]
pub struct Flag {
    names: Vec<String>,
    usage: String,
    metavar: Option<String>,
    env_var: Option<String>,
    default: String,
    cell: Rc<RefCell<FlagValue>>,
}

impl Flag {
    fn with_value(names: &str, value: FlagValue) -> Self {
        let names = split_names(names);
        if names.is_empty() {
            panic!("flag registered without a name");
        }
        let default = value.render();
        Self {
            names,
            usage: String::new(),
            metavar: None,
            env_var: None,
            default,
            cell: Rc::new(RefCell::new(value)),
        }
    }

    /// Creates a boolean flag.
    pub fn bool(names: &str, default: bool) -> Self {
        Self::with_value(names, FlagValue::Bool(default))
    }

    /// Creates a signed integer flag.
    pub fn int(names: &str, default: i64) -> Self {
        Self::with_value(names, FlagValue::Int(default))
    }

    /// Creates an unsigned integer flag.
    pub fn uint(names: &str, default: u64) -> Self {
        Self::with_value(names, FlagValue::Uint(default))
    }

    /// Creates a floating point flag.
    pub fn float(names: &str, default: f64) -> Self {
        Self::with_value(names, FlagValue::Float(default))
    }

    /// Creates a duration flag (`300ms`, `1h30m` argument grammar).
    pub fn duration(names: &str, default: Duration) -> Self {
        Self::with_value(names, FlagValue::Duration(default))
    }

    /// Creates a string flag.
    pub fn string(names: &str, default: impl Into<String>) -> Self {
        Self::with_value(names, FlagValue::Str(default.into()))
    }

    /// Creates a flag with a user-defined value kind.
    ///
    /// The caller keeps a clone of the handle to read the parsed result
    /// back after a run.
    ///
    /// # Examples
    ///
    /// ```
    /// use cmdtree_core::{Choice, Flag};
    ///
    /// let format = Choice::new([("json", 0), ("yaml", 1)]).shared();
    /// let flag = Flag::custom("format, f", format.clone());
    /// flag.set_value("yaml").unwrap();
    /// assert_eq!(format.borrow().selected(), Some(&1));
    /// ```
    pub fn custom(names: &str, value: Rc<RefCell<dyn CustomValue>>) -> Self {
        Self::with_value(names, FlagValue::Custom(value))
    }

    /// Adds usage text shown in help output.
    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    /// Overrides the meta-variable label shown after the flag names.
    pub fn with_metavar(mut self, metavar: impl Into<String>) -> Self {
        self.metavar = Some(metavar.into());
        self
    }

    /// Declares an environment variable consulted at registration time.
    ///
    /// A non-empty value overrides the compiled-in default; a value
    /// supplied on the command line overrides both.
    pub fn with_env(mut self, env_var: impl Into<String>) -> Self {
        self.env_var = Some(env_var.into());
        self
    }

    /// The canonical (shortest) alias.
    pub fn name(&self) -> &str {
        &self.names[0]
    }

    /// Every alias, shortest first.
    pub fn aliases(&self) -> &[String] {
        &self.names
    }

    /// Usage text for help output.
    pub fn usage(&self) -> &str {
        &self.usage
    }

    /// The declared environment variable, if any.
    pub fn env_var(&self) -> Option<&str> {
        self.env_var.as_deref()
    }

    /// The default value in serialized form.
    pub fn default_text(&self) -> &str {
        &self.default
    }

    /// Whether the flag behaves as a boolean switch.
    pub fn is_bool(&self) -> bool {
        self.cell.borrow().is_bool()
    }

    /// A snapshot of the current value.
    pub fn get(&self) -> FlagValue {
        self.cell.borrow().clone()
    }

    /// Sets the value from its textual form.
    ///
    /// All aliases and all merged-registry copies of this flag observe
    /// the new value.
    pub fn set_value(&self, text: &str) -> Result<(), String> {
        self.cell.borrow_mut().set_from(text)
    }

    /// Restores the default value.
    ///
    /// Custom kinds define their own default state via
    /// [`CustomValue::reset`].
    pub(crate) fn reset_value(&self) {
        let mut cell = self.cell.borrow_mut();
        if let FlagValue::Custom(custom) = &*cell {
            custom.borrow_mut().reset();
        } else if let Err(err) = cell.set_from(&self.default) {
            // Defaults are rendered from typed values, so this only fires
            // on a broken render/parse pair for a built-in kind.
            tracing::warn!(flag = %self.names[0], error = %err, "default failed to re-parse on reset");
        }
    }

    /// The flag's name column for help output: aliases joined with
    /// commas, single-character aliases as `-n`, longer ones as `--name`,
    /// followed by the meta-variable label.
    pub fn display(&self) -> String {
        let mut out = String::new();
        for (i, name) in self.names.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            if name.chars().count() == 1 {
                out.push('-');
            } else {
                out.push_str("--");
            }
            out.push_str(name);
        }
        out.push_str(&self.display_metavar());
        out
    }

    /// The meta-variable label: the explicit label when set, nothing for
    /// booleans, and ` <longest-alias>` for other value-taking flags.
    pub fn display_metavar(&self) -> String {
        if self.is_bool() || self.metavar.is_some() {
            return self.metavar.clone().unwrap_or_default();
        }
        let alias = self
            .names
            .iter()
            .find(|n| n.len() > 1)
            .unwrap_or(&self.names[0]);
        format!(" <{alias}>")
    }
}

/// Splits a comma/whitespace-delimited alias list, sorted shortest-first
/// then lexicographic.
fn split_names(spec: &str) -> Vec<String> {
    let mut names: Vec<String> = spec
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    names.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Choice;

    #[test]
    fn aliases_sort_shortest_then_lexicographic() {
        let flag = Flag::bool("help, h", false);
        assert_eq!(flag.aliases(), ["h", "help"]);

        let flag = Flag::bool("beta alpha", false);
        assert_eq!(flag.aliases(), ["alpha", "beta"]);
    }

    #[test]
    #[should_panic(expected = "without a name")]
    fn empty_alias_list_panics() {
        Flag::bool(" , ", false);
    }

    #[test]
    fn aliases_share_one_value_cell() {
        let flag = Flag::bool("h, help", false);
        let copy = flag.clone();
        copy.set_value("true").unwrap();
        assert!(matches!(flag.get(), FlagValue::Bool(true)));
    }

    #[test]
    fn default_text_captured_at_construction() {
        let flag = Flag::int("jobs", 4);
        flag.set_value("8").unwrap();
        assert_eq!(flag.default_text(), "4");
        flag.reset_value();
        assert!(matches!(flag.get(), FlagValue::Int(4)));
    }

    #[test]
    fn display_dashes_by_alias_length() {
        let flag = Flag::bool("h, help", false);
        assert_eq!(flag.display(), "-h, --help");
    }

    #[test]
    fn metavar_defaults_to_longest_alias_for_value_flags() {
        let flag = Flag::string("o, output", "");
        assert_eq!(flag.display_metavar(), " <output>");

        let flag = Flag::string("o", "");
        assert_eq!(flag.display_metavar(), " <o>");

        let flag = Flag::bool("v", false);
        assert_eq!(flag.display_metavar(), "");

        let flag = Flag::string("o", "").with_metavar(" FILE");
        assert_eq!(flag.display(), "-o FILE");
    }

    #[test]
    fn custom_reset_restores_default_state() {
        let choice = Choice::new([("a", 1), ("b", 2)]).shared();
        let flag = Flag::custom("pick", choice.clone());
        flag.set_value("b").unwrap();
        flag.reset_value();
        assert_eq!(choice.borrow().selected(), None);
    }
}
