//! Ordered, alias-keyed flag collections and argument parsing.
//!
//! A [`FlagRegistry`] owns the flags of one command scope (or of the
//! program root) and implements the single leading-flag parse pass used
//! at every dispatch level: a maximal run of recognized `-name`,
//! `-name=value`, and `-name value` tokens is consumed from the front of
//! the argument vector, and everything after the first unrecognized token
//! (or a literal `--`) is left as positional arguments.
//!
//! Merged registries for nested command scopes are built by adopting
//! flags from the outer scopes inward; adopted flags share the original
//! value cells, so a merged parse writes straight through to the
//! per-scope registries.

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::flag::Flag;
use crate::value::FlagValue;

/// An ordered, name-keyed collection of flags for one command scope.
///
/// # Examples
///
/// ```
/// use cmdtree_core::{Flag, FlagRegistry};
///
/// let mut reg = FlagRegistry::new();
/// reg.add(Flag::bool("v, verbose", false).with_usage("enable verbose output"));
/// reg.add(Flag::string("o, output", "-"));
///
/// reg.parse(["-v", "--output=out.txt", "build", "-x"]).unwrap();
/// assert!(reg.get_bool("verbose"));
/// assert_eq!(reg.get_str("o"), "out.txt");
/// assert_eq!(reg.args(), ["build", "-x"]);
/// ```
#[derive(Debug, Default)]
pub struct FlagRegistry {
    list: Vec<Flag>,
    index: HashMap<String, usize>,
    touched: BTreeSet<String>,
    args: Vec<String>,
    parsed: bool,
}

impl FlagRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a flag.
    ///
    /// If the flag declares an environment variable and that variable is
    /// non-empty, the flag's value is overwritten with the parsed
    /// environment value here, before any argument parsing. An
    /// environment value that fails to parse is ignored with a warning.
    ///
    /// # Panics
    ///
    /// Panics if any alias is already registered; duplicate names within
    /// one scope are a configuration error, not a runtime condition.
    pub fn add(&mut self, flag: Flag) {
        apply_env(&flag);
        self.insert(flag);
    }

    /// Inserts a shared-cell copy of a flag from an outer scope.
    ///
    /// Unlike [`add`](Self::add), the environment is not consulted again:
    /// the original registration already resolved default and environment
    /// precedence.
    pub(crate) fn adopt(&mut self, flag: &Flag) {
        self.insert(flag.clone());
    }

    fn insert(&mut self, flag: Flag) {
        let pos = self.list.len();
        for alias in flag.aliases() {
            if self.index.contains_key(alias) {
                panic!("flag redefined: {alias}");
            }
            self.index.insert(alias.clone(), pos);
        }
        self.list.push(flag);
    }

    /// Looks up a flag by any of its aliases.
    pub fn lookup(&self, name: &str) -> Option<&Flag> {
        self.index.get(name).map(|&pos| &self.list[pos])
    }

    /// A snapshot of a flag's current value, by any alias.
    pub fn value(&self, name: &str) -> Option<FlagValue> {
        self.lookup(name).map(Flag::get)
    }

    /// Sets a flag programmatically, bypassing argument parsing.
    ///
    /// The flag counts as touched for [`visit`](Self::visit).
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        let Some(&pos) = self.index.get(name) else {
            return Err(Error::Flag(format!("no such flag -{name}")));
        };
        self.list[pos]
            .set_value(value)
            .map_err(|err| Error::Flag(format!("invalid value \"{value}\" for flag -{name}: {err}")))?;
        self.touched.insert(self.list[pos].name().to_string());
        Ok(())
    }

    /// Consumes a maximal run of recognized flag tokens from the front of
    /// `args`.
    ///
    /// Scanning stops at the first token that is not a recognized flag,
    /// at a bare `-`, or at a literal `--` (which is consumed; everything
    /// after it is positional). Boolean flags only take a value in the
    /// `-name=value` form. Flags set before a failing token keep their
    /// values.
    ///
    /// Leftover positional arguments are available from
    /// [`args`](Self::args) afterwards.
    pub fn parse<I, S>(&mut self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parsed = true;
        self.touched.clear();
        self.args = args.into_iter().map(Into::into).collect();
        while self.parse_one()? {}
        debug!(flags = self.touched.len(), rest = self.args.len(), "parsed flag run");
        Ok(())
    }

    fn parse_one(&mut self) -> Result<bool> {
        let Some(first) = self.args.first() else {
            return Ok(false);
        };
        if !first.starts_with('-') || first.len() < 2 {
            return Ok(false);
        }
        let token = first.clone();
        let mut name = &token[1..];
        if let Some(stripped) = name.strip_prefix('-') {
            if stripped.is_empty() {
                // "--" terminates flag scanning and is itself consumed.
                self.args.remove(0);
                return Ok(false);
            }
            name = stripped;
        }
        if name.starts_with('-') || name.starts_with('=') {
            return Err(Error::Flag(format!("bad flag syntax: {token}")));
        }
        let (name, inline) = match name.find('=') {
            Some(i) => (&name[..i], Some(name[i + 1..].to_string())),
            None => (name, None),
        };
        let Some(&pos) = self.index.get(name) else {
            return Err(Error::Flag(format!("flag provided but not defined: -{name}")));
        };
        self.args.remove(0);
        let value = if self.list[pos].is_bool() {
            inline.unwrap_or_else(|| "true".to_string())
        } else if let Some(value) = inline {
            value
        } else if self.args.is_empty() {
            return Err(Error::Flag(format!("flag needs an argument: -{name}")));
        } else {
            self.args.remove(0)
        };
        self.list[pos]
            .set_value(&value)
            .map_err(|err| Error::Flag(format!("invalid value \"{value}\" for flag -{name}: {err}")))?;
        let canonical = self.list[pos].name().to_string();
        self.touched.insert(canonical);
        Ok(true)
    }

    /// Visits the flags touched by the most recent parse (or programmatic
    /// set), sorted by canonical name.
    pub fn visit(&self, mut f: impl FnMut(&Flag)) {
        for name in &self.touched {
            if let Some(flag) = self.lookup(name) {
                f(flag);
            }
        }
    }

    /// Visits every registered flag, sorted by canonical name.
    pub fn visit_all(&self, mut f: impl FnMut(&Flag)) {
        let mut list: Vec<&Flag> = self.list.iter().collect();
        list.sort_by(|a, b| a.name().cmp(b.name()));
        for flag in list {
            f(flag);
        }
    }

    /// The number of flags touched by the most recent parse.
    pub fn nflag(&self) -> usize {
        self.touched.len()
    }

    /// Positional arguments left over by the most recent parse.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The i-th leftover positional argument.
    pub fn arg(&self, i: usize) -> Option<&str> {
        self.args.get(i).map(String::as_str)
    }

    /// The number of leftover positional arguments.
    pub fn narg(&self) -> usize {
        self.args.len()
    }

    /// Whether [`parse`](Self::parse) has been called since construction
    /// or the last [`reset`](Self::reset).
    pub fn parsed(&self) -> bool {
        self.parsed
    }

    /// Restores every flag to its default, reapplies environment
    /// overrides, and clears all parse bookkeeping.
    ///
    /// Call this between independent parses of one registry; there is no
    /// automatic isolation between runs.
    pub fn reset(&mut self) {
        for flag in &self.list {
            flag.reset_value();
            apply_env(flag);
        }
        self.touched.clear();
        self.args.clear();
        self.parsed = false;
    }

    /// The current boolean value of a flag.
    ///
    /// # Panics
    ///
    /// Panics if no flag has this alias or the flag is not a boolean.
    pub fn get_bool(&self, name: &str) -> bool {
        match self.must(name) {
            FlagValue::Bool(v) => v,
            other => panic!("flag -{name} is not a bool: {other:?}"),
        }
    }

    /// The current signed integer value of a flag.
    ///
    /// # Panics
    ///
    /// Panics if no flag has this alias or the flag is not an integer.
    pub fn get_int(&self, name: &str) -> i64 {
        match self.must(name) {
            FlagValue::Int(v) => v,
            other => panic!("flag -{name} is not an integer: {other:?}"),
        }
    }

    /// The current unsigned integer value of a flag.
    ///
    /// # Panics
    ///
    /// Panics if no flag has this alias or the flag is not an unsigned
    /// integer.
    pub fn get_uint(&self, name: &str) -> u64 {
        match self.must(name) {
            FlagValue::Uint(v) => v,
            other => panic!("flag -{name} is not an unsigned integer: {other:?}"),
        }
    }

    /// The current floating point value of a flag.
    ///
    /// # Panics
    ///
    /// Panics if no flag has this alias or the flag is not a float.
    pub fn get_float(&self, name: &str) -> f64 {
        match self.must(name) {
            FlagValue::Float(v) => v,
            other => panic!("flag -{name} is not a float: {other:?}"),
        }
    }

    /// The current duration value of a flag.
    ///
    /// # Panics
    ///
    /// Panics if no flag has this alias or the flag is not a duration.
    pub fn get_duration(&self, name: &str) -> Duration {
        match self.must(name) {
            FlagValue::Duration(v) => v,
            other => panic!("flag -{name} is not a duration: {other:?}"),
        }
    }

    /// The current string value of a flag.
    ///
    /// # Panics
    ///
    /// Panics if no flag has this alias or the flag is not a string.
    pub fn get_str(&self, name: &str) -> String {
        match self.must(name) {
            FlagValue::Str(v) => v,
            other => panic!("flag -{name} is not a string: {other:?}"),
        }
    }

    fn must(&self, name: &str) -> FlagValue {
        self.value(name)
            .unwrap_or_else(|| panic!("no such flag -{name}"))
    }
}

fn apply_env(flag: &Flag) {
    let Some(key) = flag.env_var() else {
        return;
    };
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => {
            if let Err(err) = flag.set_value(&value) {
                warn!(flag = %flag.name(), env = key, error = %err, "ignoring invalid environment value");
            }
        }
        _ => {}
    }
}
