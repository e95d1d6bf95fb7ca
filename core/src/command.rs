//! Command tree nodes.
//!
//! A [`Command`] is a named, dispatchable unit: it owns its flag
//! registry, its child commands, and optionally a leaf action. Commands
//! without an action fall through to the program's dispatch strategy, so
//! intermediate nodes descend into their children and interception flags
//! like `--help` keep working at any depth.

use std::any::Any;
use std::cell::{Ref, RefCell};
use std::fmt;

use crate::action::ActionFn;
use crate::context::Context;
use crate::error::Result;
use crate::flag::Flag;
use crate::help;
use crate::registry::FlagRegistry;

/// A named node in the command tree.
///
/// Aliases are given as one comma- or whitespace-delimited string; the
/// first alias is canonical and the rest are accepted interchangeably
/// during resolution (alias order is preserved as written).
///
/// # Examples
///
/// ```
/// use cmdtree_core::{Command, Flag, FlagRegistry};
///
/// let commit = Command::new("commit, ci")
///     .with_usage("[-m <message>]")
///     .with_description("record changes")
///     .with_flag(Flag::string("m, message", ""))
///     .with_action(|ctx| {
///         let _message = ctx.get_str("message");
///         Ok(())
///     });
///
/// assert_eq!(commit.name(), "commit");
/// assert_eq!(commit.aliases(), ["commit", "ci"]);
/// ```
pub struct Command {
    names: Vec<String>,
    usage: Vec<String>,
    desc: String,
    epilog: String,
    flags: Option<FlagRegistry>,
    children: Vec<Command>,
    action: Option<ActionFn>,
    data: RefCell<Option<Box<dyn Any>>>,
}

impl Command {
    /// Creates a command with the given alias list.
    ///
    /// # Panics
    ///
    /// Panics if the alias list is empty.
    pub fn new(names: &str) -> Self {
        let names: Vec<String> = names
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            panic!("command registered without a name");
        }
        Self {
            names,
            usage: Vec::new(),
            desc: String::new(),
            epilog: String::new(),
            flags: None,
            children: Vec::new(),
            action: None,
            data: RefCell::new(None),
        }
    }

    /// Appends a usage line (shown after the command path in help).
    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage.push(usage.into());
        self
    }

    /// Sets the description shown in help output.
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.desc = desc.into();
        self
    }

    /// Sets the epilog shown at the end of help output.
    pub fn with_epilog(mut self, epilog: impl Into<String>) -> Self {
        self.epilog = epilog.into();
        self
    }

    /// Attaches a flag registry.
    ///
    /// A command without a registry cannot accept flags of its own and
    /// must not sit below flag-bearing commands in a resolved stack.
    pub fn with_flags(mut self, flags: FlagRegistry) -> Self {
        self.flags = Some(flags);
        self
    }

    /// Registers one flag, creating the registry if needed.
    pub fn with_flag(mut self, flag: Flag) -> Self {
        self.flags.get_or_insert_with(FlagRegistry::new).add(flag);
        self
    }

    /// Adds a child command.
    pub fn with_subcommand(mut self, cmd: Command) -> Self {
        self.children.push(cmd);
        self
    }

    /// Sets the leaf action.
    ///
    /// Without an action, control falls through to the program's
    /// dispatch strategy, which resolves the next argument against this
    /// command's children.
    pub fn with_action<F>(mut self, action: F) -> Self
    where
        F: Fn(&mut Context<'_>) -> Result<()> + 'static,
    {
        self.action = Some(Box::new(action));
        self
    }

    /// Adds a child command in place.
    pub fn add(&mut self, cmd: Command) {
        self.children.push(cmd);
    }

    /// The canonical (first) alias.
    pub fn name(&self) -> &str {
        &self.names[0]
    }

    /// Every alias, in declaration order.
    pub fn aliases(&self) -> &[String] {
        &self.names
    }

    /// Usage lines for help output.
    pub fn usage_lines(&self) -> &[String] {
        &self.usage
    }

    /// The description shown in help output.
    pub fn description(&self) -> &str {
        &self.desc
    }

    /// The epilog shown at the end of help output.
    pub fn epilog(&self) -> &str {
        &self.epilog
    }

    /// The command's own flag registry, if any.
    pub fn flags(&self) -> Option<&FlagRegistry> {
        self.flags.as_ref()
    }

    /// Mutable access to the command's own flag registry, if any.
    pub fn flags_mut(&mut self) -> Option<&mut FlagRegistry> {
        self.flags.as_mut()
    }

    /// Child commands.
    pub fn children(&self) -> &[Command] {
        &self.children
    }

    /// Whether the command has a leaf action.
    pub fn has_action(&self) -> bool {
        self.action.is_some()
    }

    /// Stores an opaque payload on the command (typically from a pre-run
    /// hook).
    pub fn set_data<T: 'static>(&self, value: T) {
        *self.data.borrow_mut() = Some(Box::new(value));
    }

    /// Borrows the opaque payload, if one of the requested type is set.
    pub fn data<T: 'static>(&self) -> Option<Ref<'_, T>> {
        let slot = self.data.borrow();
        Ref::filter_map(slot, |slot| slot.as_ref()?.downcast_ref::<T>()).ok()
    }

    /// Runs this command with a resolved context.
    ///
    /// If the command owns a flag registry, the merged registry for the
    /// current stack is built and parsed first, and the context's
    /// remaining arguments are replaced with the parse leftovers. The
    /// leaf action then runs; without one, control falls through to the
    /// program's dispatch strategy.
    ///
    /// # Panics
    ///
    /// Panics if a command on the resolved stack has no flag registry
    /// while flags are being composed; the tree was built inconsistently
    /// and no retry can fix it.
    pub fn run<'a>(&'a self, ctx: &mut Context<'a>) -> Result<()> {
        if self.flags.is_some() {
            ctx.compose_flags()?;
            let app = ctx.app();
            if app.intercepts_help() && ctx.get_bool("help") {
                return help::show_help(ctx);
            }
            if app.intercepts_version() && ctx.get_bool("version") {
                return help::show_version(ctx);
            }
        }
        let app = ctx.app();
        match &self.action {
            Some(action) => action(ctx),
            None => app.strategy().dispatch(ctx),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("names", &self.names)
            .field("children", &self.children)
            .field("has_flags", &self.flags.is_some())
            .field("has_action", &self.action.is_some())
            .finish_non_exhaustive()
    }
}
