//! Per-run dispatch state.
//!
//! A [`Context`] is created fresh for each top-level run and carries the
//! live resolution state through it: the stack of matched commands, the
//! current candidate child list, the remaining positional arguments, and
//! the merged flag registry for the deepest matched level.

use std::any::Any;
use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::app::App;
use crate::command::Command;
use crate::error::{Error, Result};
use crate::registry::FlagRegistry;
use crate::resolver::find_command;
use crate::value::FlagValue;

/// The mutable cursor for one invocation.
///
/// The matched-command stack only grows within a run, and the remaining
/// argument list only shrinks; a context is discarded when the run ends.
pub struct Context<'a> {
    app: &'a App,
    stack: Vec<&'a Command>,
    cmds: &'a [Command],
    args: Vec<String>,
    flags: FlagRegistry,
    data: Option<Box<dyn Any>>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(app: &'a App) -> Self {
        let mut flags = FlagRegistry::new();
        app.flags().visit_all(|flag| flags.adopt(flag));
        Self {
            app,
            stack: Vec::new(),
            cmds: app.commands(),
            args: Vec::new(),
            flags,
            data: None,
        }
    }

    /// The program this run belongs to.
    pub fn app(&self) -> &'a App {
        self.app
    }

    /// The program name qualified with the matched command path, e.g.
    /// `tool remote add`.
    pub fn name(&self) -> String {
        let mut parts = vec![self.app.name()];
        parts.extend(self.stack.iter().map(|cmd| cmd.name()));
        parts.join(" ")
    }

    /// Commands matched so far, outermost first.
    pub fn stack(&self) -> &[&'a Command] {
        &self.stack
    }

    /// Remaining positional arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// The i-th remaining positional argument.
    pub fn arg(&self, i: usize) -> Option<&str> {
        self.args.get(i).map(String::as_str)
    }

    /// The number of remaining positional arguments.
    pub fn narg(&self) -> usize {
        self.args.len()
    }

    /// Takes the remaining positional arguments, leaving none.
    ///
    /// Leaf actions that consume positionals should take them, so that
    /// under the chain strategy the next step starts at the following
    /// command name instead of re-resolving the consumed words.
    pub fn take_args(&mut self) -> Vec<String> {
        std::mem::take(&mut self.args)
    }

    /// Resolves the next command from the current candidate list.
    ///
    /// Returns `Ok(None)` when there are no candidates at this level
    /// (nothing to resolve), [`Error::CommandRequired`] when candidates
    /// exist but the argument list is exhausted, and a
    /// [`CommandError`](crate::CommandError) when the next token fails to
    /// resolve. On success the matched token is consumed and the
    /// candidate cursor descends to the matched command's children.
    pub fn command(&mut self) -> Result<Option<&'a Command>> {
        if self.cmds.is_empty() {
            return Ok(None);
        }
        if self.args.is_empty() {
            return Err(Error::CommandRequired);
        }
        let cmd = find_command(self.cmds, &self.args[0])?;
        self.args.remove(0);
        self.cmds = cmd.children();
        Ok(Some(cmd))
    }

    /// Appends a resolved command to the matched stack without running
    /// it. Used by meta-commands (like the built-in help command) that
    /// walk the tree themselves.
    pub fn push(&mut self, cmd: &'a Command) {
        self.stack.push(cmd);
    }

    /// Clears the matched stack and rewinds the candidate cursor to the
    /// program root.
    pub fn rewind(&mut self) {
        self.stack.clear();
        self.cmds = self.app.commands();
    }

    pub(crate) fn reset_candidates(&mut self) {
        self.cmds = self.app.commands();
    }

    pub(crate) fn replace_stack_top(&mut self, cmd: &'a Command) {
        if self.stack.is_empty() {
            self.stack.push(cmd);
        } else {
            self.stack[0] = cmd;
        }
    }

    /// Parses the top-level argument vector against the root registry.
    pub(crate) fn parse_root(&mut self, args: Vec<String>) -> Result<()> {
        let result = self.flags.parse(args);
        self.args = self.flags.args().to_vec();
        result
    }

    /// Builds and parses the merged registry for the current stack.
    ///
    /// Flags are adopted outward-to-inward: program root first, then each
    /// stacked command. The remaining arguments are replaced with the
    /// parse leftovers.
    ///
    /// # Panics
    ///
    /// Panics if a stacked command has no flag registry; such a command
    /// must not appear below flag-bearing scopes and the tree cannot be
    /// fixed by retrying.
    pub(crate) fn compose_flags(&mut self) -> Result<()> {
        let app = self.app;
        let mut merged = FlagRegistry::new();
        app.flags().visit_all(|flag| merged.adopt(flag));
        for cmd in &self.stack {
            let Some(registry) = cmd.flags() else {
                panic!(
                    "command '{}' has no flag registry but its scope composes flags",
                    cmd.name()
                );
            };
            registry.visit_all(|flag| merged.adopt(flag));
        }
        debug!(scope = %self.name(), "composed merged flag registry");
        self.flags = merged;
        let args = std::mem::take(&mut self.args);
        let result = self.flags.parse(args);
        self.args = self.flags.args().to_vec();
        result
    }

    pub(crate) fn prepare(&mut self, cmd: Option<&'a Command>) -> Result<()> {
        let app = self.app;
        match app.prepare_hook() {
            Some(hook) => hook(self, cmd),
            None => Ok(()),
        }
    }

    /// The merged flag registry for the deepest matched level.
    pub fn flags(&self) -> &FlagRegistry {
        &self.flags
    }

    /// Mutable access to the merged flag registry.
    pub fn flags_mut(&mut self) -> &mut FlagRegistry {
        &mut self.flags
    }

    /// A snapshot of a flag's current value, by any alias.
    pub fn value(&self, name: &str) -> Option<FlagValue> {
        self.flags.value(name)
    }

    /// The current boolean value of a flag in scope.
    ///
    /// # Panics
    ///
    /// Panics if no flag has this alias or the kind does not match.
    pub fn get_bool(&self, name: &str) -> bool {
        self.flags.get_bool(name)
    }

    /// The current signed integer value of a flag in scope.
    ///
    /// # Panics
    ///
    /// Panics if no flag has this alias or the kind does not match.
    pub fn get_int(&self, name: &str) -> i64 {
        self.flags.get_int(name)
    }

    /// The current unsigned integer value of a flag in scope.
    ///
    /// # Panics
    ///
    /// Panics if no flag has this alias or the kind does not match.
    pub fn get_uint(&self, name: &str) -> u64 {
        self.flags.get_uint(name)
    }

    /// The current floating point value of a flag in scope.
    ///
    /// # Panics
    ///
    /// Panics if no flag has this alias or the kind does not match.
    pub fn get_float(&self, name: &str) -> f64 {
        self.flags.get_float(name)
    }

    /// The current duration value of a flag in scope.
    ///
    /// # Panics
    ///
    /// Panics if no flag has this alias or the kind does not match.
    pub fn get_duration(&self, name: &str) -> Duration {
        self.flags.get_duration(name)
    }

    /// The current string value of a flag in scope.
    ///
    /// # Panics
    ///
    /// Panics if no flag has this alias or the kind does not match.
    pub fn get_str(&self, name: &str) -> String {
        self.flags.get_str(name)
    }

    /// Stores an opaque per-run payload.
    pub fn set_data<T: 'static>(&mut self, value: T) {
        self.data = Some(Box::new(value));
    }

    /// Borrows the per-run payload, if one of the requested type is set.
    pub fn data<T: 'static>(&self) -> Option<&T> {
        self.data.as_ref()?.downcast_ref()
    }

    /// Mutably borrows the per-run payload, if one of the requested type
    /// is set.
    pub fn data_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.data.as_mut()?.downcast_mut()
    }

    /// Writes a line to the program's standard output.
    pub fn println(&self, msg: impl fmt::Display) {
        self.app.println(msg);
    }

    /// Writes to the program's standard output.
    pub fn print(&self, msg: impl fmt::Display) {
        self.app.print(msg);
    }

    /// Writes a line to the program's standard error.
    pub fn eprintln(&self, msg: impl fmt::Display) {
        self.app.eprintln(msg);
    }

    /// Writes to the program's standard error.
    pub fn eprint(&self, msg: impl fmt::Display) {
        self.app.eprint(msg);
    }
}
