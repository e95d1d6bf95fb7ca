//! Sibling command resolution.
//!
//! Matches one argument token against a set of sibling commands using
//! exact-then-prefix alias matching with ambiguity detection.

use tracing::debug;

use crate::command::Command;
use crate::error::{CommandError, Error, Result};

/// Resolves `name` against a sibling command set.
///
/// Every alias of every sibling is scanned for an exact match; when none
/// exists and `name` is non-empty, aliases are scanned again for prefix
/// matches. Candidates are collected per alias, so a token that is both
/// an exact alias and a prefix of other aliases resolves to the exact
/// one.
///
/// Returns [`CommandError::Unknown`] when nothing matches and
/// [`CommandError::Ambiguous`] (listing the matched aliases, sorted) when
/// several aliases match and none is exact.
///
/// # Examples
///
/// ```
/// use cmdtree_core::{Command, find_command};
///
/// let cmds = vec![
///     Command::new("foo"),
///     Command::new("bar, b"),
///     Command::new("baz"),
/// ];
///
/// // "b" is an exact alias of bar, even though it prefixes baz.
/// assert_eq!(find_command(&cmds, "b").unwrap().name(), "bar");
/// // "ba" prefixes bar and baz and is exact for neither.
/// assert!(find_command(&cmds, "ba").is_err());
/// assert_eq!(find_command(&cmds, "f").unwrap().name(), "foo");
/// ```
pub fn find_command<'a>(cmds: &'a [Command], name: &str) -> Result<&'a Command> {
    let mut set: std::collections::BTreeMap<&'a str, &'a Command> = std::collections::BTreeMap::new();
    'cmds: for cmd in cmds {
        for alias in cmd.aliases() {
            if alias == name {
                set.insert(alias, cmd);
                continue 'cmds;
            }
        }
        if !name.is_empty() {
            for alias in cmd.aliases() {
                if alias.starts_with(name) {
                    set.insert(alias, cmd);
                    continue 'cmds;
                }
            }
        }
    }

    if set.len() > 1 {
        // An exact alias beats any number of prefix matches.
        if let Some(&cmd) = set.get(name) {
            debug!(name, command = cmd.name(), "resolved exact alias over prefix collisions");
            return Ok(cmd);
        }
        return Err(Error::Command(CommandError::Ambiguous {
            name: name.to_string(),
            candidates: set.keys().map(|alias| alias.to_string()).collect(),
        }));
    }
    match set.into_values().next() {
        Some(cmd) => {
            debug!(name, command = cmd.name(), "resolved command");
            Ok(cmd)
        }
        None => Err(Error::Command(CommandError::Unknown {
            name: name.to_string(),
        })),
    }
}
