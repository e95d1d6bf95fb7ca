//! Flag value kinds and conversion.
//!
//! Every flag carries a [`FlagValue`]: a closed set of built-in kinds
//! (boolean, integers, float, duration, string) plus an open escape hatch
//! for user-defined kinds via the [`CustomValue`] trait. Values are set
//! from their textual argument form and rendered back to text for default
//! display in help output.
//!
//! Durations use the compact unit grammar (`300ms`, `1.5s`, `1h30m`);
//! see [`parse_duration`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// A typed flag value.
///
/// The built-in kinds cover the common scalar settings; anything else is
/// expressed through [`FlagValue::Custom`] and the [`CustomValue`] trait,
/// so user-defined kinds stay pluggable without reflection.
///
/// # Examples
///
/// ```
/// use cmdtree_core::FlagValue;
///
/// let mut v = FlagValue::Int(0);
/// v.set_from("-42").unwrap();
/// assert_eq!(v.render(), "-42");
/// assert!(v.set_from("forty-two").is_err());
/// ```
pub enum FlagValue {
    /// Boolean switch; never consumes a separate argument token.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    Uint(u64),
    /// Floating point number.
    Float(f64),
    /// Duration in the compact unit grammar (`300ms`, `1h30m`).
    Duration(Duration),
    /// Arbitrary string.
    Str(String),
    /// User-defined kind; shared so the caller keeps a handle to read the
    /// parsed result back out.
    Custom(Rc<RefCell<dyn CustomValue>>),
}

impl FlagValue {
    /// Sets the value from its textual argument form.
    ///
    /// Returns a short, kind-specific message on failure; the flag
    /// registry wraps it with the offending flag name and token.
    pub fn set_from(&mut self, text: &str) -> Result<(), String> {
        match self {
            Self::Bool(v) => *v = parse_bool(text)?,
            Self::Int(v) => {
                *v = text
                    .parse()
                    .map_err(|_| format!("invalid integer \"{text}\""))?;
            }
            Self::Uint(v) => {
                *v = text
                    .parse()
                    .map_err(|_| format!("invalid unsigned integer \"{text}\""))?;
            }
            Self::Float(v) => {
                *v = text
                    .parse()
                    .map_err(|_| format!("invalid number \"{text}\""))?;
            }
            Self::Duration(v) => *v = parse_duration(text)?,
            Self::Str(v) => *v = text.to_string(),
            Self::Custom(v) => v.borrow_mut().set(text)?,
        }
        Ok(())
    }

    /// Renders the current value in its serialized form.
    pub fn render(&self) -> String {
        match self {
            Self::Bool(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::Uint(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::Duration(v) => format_duration(*v),
            Self::Str(v) => v.clone(),
            Self::Custom(v) => v.borrow().render(),
        }
    }

    /// Whether the value behaves as a boolean switch.
    pub fn is_bool(&self) -> bool {
        match self {
            Self::Bool(_) => true,
            Self::Custom(v) => v.borrow().is_bool(),
            _ => false,
        }
    }
}

impl Clone for FlagValue {
    fn clone(&self) -> Self {
        match self {
            Self::Bool(v) => Self::Bool(*v),
            Self::Int(v) => Self::Int(*v),
            Self::Uint(v) => Self::Uint(*v),
            Self::Float(v) => Self::Float(*v),
            Self::Duration(v) => Self::Duration(*v),
            Self::Str(v) => Self::Str(v.clone()),
            // Shares the underlying custom value rather than copying it.
            Self::Custom(v) => Self::Custom(Rc::clone(v)),
        }
    }
}

impl fmt::Debug for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Self::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Self::Uint(v) => f.debug_tuple("Uint").field(v).finish(),
            Self::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Self::Duration(v) => f.debug_tuple("Duration").field(v).finish(),
            Self::Str(v) => f.debug_tuple("Str").field(v).finish(),
            Self::Custom(v) => f.debug_tuple("Custom").field(&v.borrow().render()).finish(),
        }
    }
}

/// A user-defined flag value kind.
///
/// Implementors parse their own textual form and render it back for help
/// display. [`reset`](CustomValue::reset) returns the value to its
/// default state when the owning registry is reset.
pub trait CustomValue {
    /// Parses and adopts a textual value.
    fn set(&mut self, text: &str) -> Result<(), String>;

    /// Renders the current value in its serialized form.
    fn render(&self) -> String;

    /// Restores the default state.
    fn reset(&mut self) {}

    /// Whether the value behaves as a boolean switch (no argument token).
    fn is_bool(&self) -> bool {
        false
    }
}

/// A constrained value drawn from a fixed name-to-value mapping.
///
/// With prefix matching enabled, any unambiguous prefix of a choice name
/// selects it; an exact name always wins over prefix collisions. The
/// caller keeps a shared handle to read the selection back after parsing.
///
/// # Examples
///
/// ```
/// use cmdtree_core::{Choice, CustomValue};
///
/// let mut fmt = Choice::new([("json", 1), ("jsonl", 2), ("yaml", 3)])
///     .with_prefix_matching();
/// fmt.set("y").unwrap();
/// assert_eq!(fmt.selected(), Some(&3));
///
/// // "json" prefixes both "json" and "jsonl", but is itself exact.
/// fmt.set("json").unwrap();
/// assert_eq!(fmt.selected(), Some(&1));
///
/// let err = fmt.set("x").unwrap_err();
/// assert_eq!(err, "expected json, jsonl, or yaml");
/// ```
pub struct Choice<T> {
    choices: Vec<(String, T)>,
    prefix: bool,
    selected: Option<usize>,
}

impl<T> Choice<T> {
    /// Creates a choice value from name/value pairs.
    ///
    /// Names are kept sorted so error listings are alphabetical.
    pub fn new<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
    {
        let mut choices: Vec<(String, T)> = choices
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .collect();
        choices.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            choices,
            prefix: false,
            selected: None,
        }
    }

    /// Enables unique-prefix matching on choice names.
    pub fn with_prefix_matching(mut self) -> Self {
        self.prefix = true;
        self
    }

    /// The currently selected value, if any.
    pub fn selected(&self) -> Option<&T> {
        self.selected.map(|i| &self.choices[i].1)
    }

    /// The name of the currently selected value, if any.
    pub fn selected_key(&self) -> Option<&str> {
        self.selected.map(|i| self.choices[i].0.as_str())
    }

    /// Wraps the choice in the shared handle form expected by
    /// [`Flag::custom`](crate::Flag::custom).
    pub fn shared(self) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(self))
    }

    fn listing(&self) -> String {
        let names: Vec<&str> = self.choices.iter().map(|(n, _)| n.as_str()).collect();
        match names.len() {
            0 => String::new(),
            1 => names[0].to_string(),
            2 => format!("{} or {}", names[0], names[1]),
            n => format!("{}, or {}", names[..n - 1].join(", "), names[n - 1]),
        }
    }
}

impl<T> CustomValue for Choice<T> {
    fn set(&mut self, text: &str) -> Result<(), String> {
        if let Some(i) = self.choices.iter().position(|(n, _)| n == text) {
            self.selected = Some(i);
            return Ok(());
        }
        if self.prefix && !text.is_empty() {
            let hits: Vec<usize> = self
                .choices
                .iter()
                .enumerate()
                .filter(|(_, (n, _))| n.starts_with(text))
                .map(|(i, _)| i)
                .collect();
            match hits.len() {
                1 => {
                    self.selected = Some(hits[0]);
                    return Ok(());
                }
                0 => {}
                _ => {
                    let names: Vec<&str> =
                        hits.iter().map(|&i| self.choices[i].0.as_str()).collect();
                    return Err(format!("ambiguous ({})", names.join(", ")));
                }
            }
        }
        Err(format!("expected {}", self.listing()))
    }

    fn render(&self) -> String {
        self.selected_key().unwrap_or_default().to_string()
    }

    fn reset(&mut self) {
        self.selected = None;
    }
}

pub(crate) fn parse_bool(text: &str) -> Result<bool, String> {
    match text {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(format!("invalid boolean value \"{text}\"")),
    }
}

/// Parses a duration in the compact unit grammar.
///
/// A duration is a possibly signless sequence of decimal numbers, each
/// with an optional fraction and a mandatory unit suffix: `ns`, `us`
/// (or `µs`), `ms`, `s`, `m`, `h`. The bare string `0` is accepted
/// without a unit. Negative durations are rejected.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use cmdtree_core::parse_duration;
///
/// assert_eq!(parse_duration("300ms").unwrap(), Duration::from_millis(300));
/// assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
/// assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
/// assert!(parse_duration("90").is_err());
/// ```
pub fn parse_duration(text: &str) -> Result<Duration, String> {
    if text.starts_with('-') {
        return Err(format!("negative duration \"{text}\" is not supported"));
    }
    let mut rest = text.strip_prefix('+').unwrap_or(text);
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(format!("invalid duration \"{text}\""));
    }
    let mut nanos = 0.0_f64;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(rest.len());
        let num = &rest[..num_len];
        if num.is_empty() || num == "." || num.matches('.').count() > 1 {
            return Err(format!("invalid duration \"{text}\""));
        }
        let value: f64 = num
            .parse()
            .map_err(|_| format!("invalid duration \"{text}\""))?;
        rest = &rest[num_len..];
        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3_600e9,
            "" => return Err(format!("missing unit in duration \"{text}\"")),
            unit => return Err(format!("unknown unit \"{unit}\" in duration \"{text}\"")),
        };
        nanos += value * scale;
        rest = &rest[unit_len..];
    }
    Ok(Duration::from_nanos(nanos as u64))
}

/// Renders a duration in the compact unit grammar.
///
/// Sub-second durations pick the largest fitting unit; everything else is
/// written as hour/minute/second components (`1h30m0s`).
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < 1_000 {
        return format!("{nanos}ns");
    }
    if nanos < 1_000_000 {
        return format!("{}µs", trim_fraction(nanos as f64 / 1e3));
    }
    if nanos < 1_000_000_000 {
        return format!("{}ms", trim_fraction(nanos as f64 / 1e6));
    }
    let secs = d.as_secs();
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    let frac = d.subsec_nanos();
    let mut out = String::new();
    if h > 0 {
        out.push_str(&format!("{h}h"));
    }
    if h > 0 || m > 0 {
        out.push_str(&format!("{m}m"));
    }
    if frac > 0 {
        out.push_str(&format!("{}s", trim_fraction(s as f64 + f64::from(frac) / 1e9)));
    } else {
        out.push_str(&format!("{s}s"));
    }
    out
}

fn trim_fraction(value: f64) -> String {
    let text = format!("{value:.3}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}
