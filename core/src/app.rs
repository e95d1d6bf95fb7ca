//! The program root.
//!
//! An [`App`] owns the command tree, the top-level flag registry, and
//! the per-instance dispatch configuration: strategy, pre-run hook,
//! error handler, and output streams. Nothing here is process-global, so
//! independent instances (and tests) never interfere with each other.

use std::cell::{RefCell, RefMut};
use std::fmt;
use std::io::{self, Write};

use tracing::debug;

use crate::action::{CancelToken, Strategy};
use crate::command::Command;
use crate::context::Context;
use crate::error::{CommandError, Error, Result};
use crate::flag::Flag;
use crate::help;
use crate::registry::FlagRegistry;

/// A boxed pre-run hook, invoked with the resolved command (or `None`
/// for option/simple dispatch) before it runs.
pub type PrepareFn = Box<dyn Fn(&mut Context<'_>, Option<&Command>) -> Result<()>>;

/// A boxed error handler, invoked with any error a run produces.
///
/// The handler reports the error to the user and returns the result the
/// run should surface — conventionally the error itself, unchanged.
pub type ErrorHandlerFn = Box<dyn Fn(&mut Context<'_>, Error) -> Result<()>>;

/// A command-line program: the root of the command tree.
///
/// # Examples
///
/// ```
/// use cmdtree_core::{App, Command, Flag};
///
/// let mut app = App::new("tool").with_version("1.0.0");
/// app.flags_mut().add(Flag::bool("v, verbose", false));
/// app.add(
///     Command::new("status")
///         .with_flags(cmdtree_core::FlagRegistry::new())
///         .with_action(|ctx| {
///             if ctx.get_bool("verbose") {
///                 ctx.println("everything is fine");
///             }
///             Ok(())
///         }),
/// );
///
/// app.run(["-v", "status"]).unwrap();
/// ```
pub struct App {
    name: String,
    version: String,
    usage: Vec<String>,
    desc: String,
    epilog: String,
    flags: FlagRegistry,
    commands: Vec<Command>,
    strategy: Strategy,
    prepare: Option<PrepareFn>,
    error_handler: ErrorHandlerFn,
    stdout: RefCell<Box<dyn Write>>,
    stderr: RefCell<Box<dyn Write>>,
    cancel: CancelToken,
    auto_help: bool,
    auto_version: bool,
}

impl App {
    /// Creates a program with the given name, subcommand dispatch, and
    /// the default error handler.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: String::new(),
            usage: Vec::new(),
            desc: String::new(),
            epilog: String::new(),
            flags: FlagRegistry::new(),
            commands: Vec::new(),
            strategy: Strategy::default(),
            prepare: None,
            error_handler: Box::new(default_error_handler),
            stdout: RefCell::new(Box::new(io::stdout())),
            stderr: RefCell::new(Box::new(io::stderr())),
            cancel: CancelToken::new(),
            auto_help: false,
            auto_version: false,
        }
    }

    /// Sets the version string reported by `--version`.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Appends a top-level usage line.
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

    /// Sets the dispatch strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Installs a pre-run hook, invoked with each resolved command
    /// before it runs.
    pub fn with_prepare<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Context<'_>, Option<&Command>) -> Result<()> + 'static,
    {
        self.prepare = Some(Box::new(hook));
        self
    }

    /// Replaces the error handler.
    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut Context<'_>, Error) -> Result<()> + 'static,
    {
        self.error_handler = Box::new(handler);
        self
    }

    /// Adds a top-level command (builder form).
    pub fn with_command(mut self, cmd: Command) -> Self {
        self.commands.push(cmd);
        self
    }

    /// Adds a top-level command.
    pub fn add(&mut self, cmd: Command) {
        self.commands.push(cmd);
    }

    /// The program name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The version string ("" when unset).
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Top-level usage lines.
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

    /// The top-level flag registry.
    pub fn flags(&self) -> &FlagRegistry {
        &self.flags
    }

    /// Mutable access to the top-level flag registry.
    pub fn flags_mut(&mut self) -> &mut FlagRegistry {
        &mut self.flags
    }

    /// Top-level commands.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// The configured dispatch strategy.
    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// A cloneable cancellation handle for this program.
    ///
    /// Typically handed to a signal handler; the chain strategy observes
    /// it between steps.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Replaces the standard output stream (e.g. with a capture buffer
    /// in tests).
    pub fn set_stdout(&mut self, w: impl Write + 'static) {
        self.stdout = RefCell::new(Box::new(w));
    }

    /// Replaces the standard error stream.
    pub fn set_stderr(&mut self, w: impl Write + 'static) {
        self.stderr = RefCell::new(Box::new(w));
    }

    /// The program's standard output stream.
    pub fn stdout(&self) -> RefMut<'_, Box<dyn Write>> {
        self.stdout.borrow_mut()
    }

    /// The program's standard error stream.
    pub fn stderr(&self) -> RefMut<'_, Box<dyn Write>> {
        self.stderr.borrow_mut()
    }

    /// Writes to standard output.
    pub fn print(&self, msg: impl fmt::Display) {
        let _ = write!(self.stdout.borrow_mut(), "{msg}");
    }

    /// Writes a line to standard output.
    pub fn println(&self, msg: impl fmt::Display) {
        let _ = writeln!(self.stdout.borrow_mut(), "{msg}");
    }

    /// Writes to standard error.
    pub fn eprint(&self, msg: impl fmt::Display) {
        let _ = write!(self.stderr.borrow_mut(), "{msg}");
    }

    /// Writes a line to standard error.
    pub fn eprintln(&self, msg: impl fmt::Display) {
        let _ = writeln!(self.stderr.borrow_mut(), "{msg}");
    }

    pub(crate) fn prepare_hook(&self) -> Option<&PrepareFn> {
        self.prepare.as_ref()
    }

    pub(crate) fn intercepts_help(&self) -> bool {
        self.auto_help
    }

    pub(crate) fn intercepts_version(&self) -> bool {
        self.auto_version
    }

    pub(crate) fn cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Runs the program against an argument vector (without the program
    /// name itself).
    ///
    /// Top-level flags are parsed first; the rest of the dispatch is
    /// governed by the configured [`Strategy`]. Any error is routed
    /// through the error handler and then returned.
    pub fn run<I, S>(&mut self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ensure_interceptors();
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        debug!(program = %self.name, strategy = ?self.strategy, argc = args.len(), "starting run");
        let mut ctx = Context::new(self);
        match run_root(&mut ctx, args) {
            Ok(()) => Ok(()),
            Err(err) => (self.error_handler)(&mut ctx, err),
        }
    }

    /// Registers the `-h, --help` and `--version` interception flags
    /// unless the caller claimed those names.
    fn ensure_interceptors(&mut self) {
        if self.flags.lookup("h").is_none() && self.flags.lookup("help").is_none() {
            self.flags
                .add(Flag::bool("h, help", false).with_usage("show help"));
            self.auto_help = true;
        }
        if self.flags.lookup("version").is_none() {
            self.flags
                .add(Flag::bool("version", false).with_usage("show version information"));
            self.auto_version = true;
        }
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("commands", &self.commands)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

fn run_root(ctx: &mut Context<'_>, args: Vec<String>) -> Result<()> {
    ctx.parse_root(args)?;
    let app = ctx.app();
    if app.intercepts_help() && ctx.get_bool("help") {
        return help::show_help(ctx);
    }
    if app.intercepts_version() && ctx.get_bool("version") {
        return help::show_version(ctx);
    }
    app.strategy().dispatch(ctx)
}

/// The default error handler.
///
/// Implements the reporting taxonomy: flag and unknown-command errors
/// print `<name>: <error>` and the help text; an ambiguous command
/// prints its candidate list with no help text; a missing command prints
/// usage alone, with no error line; an abort prints its message and
/// optional hint; an interruption prints `interrupted`. The error is
/// returned unchanged.
pub fn default_error_handler(ctx: &mut Context<'_>, err: Error) -> Result<()> {
    match &err {
        Error::CommandRequired => {
            for line in help::usage_lines(ctx) {
                ctx.eprintln(line);
            }
        }
        Error::Abort { hint, .. } => {
            ctx.eprintln(format_args!("{}: {}", ctx.app().name(), err));
            if let Some(hint) = hint {
                ctx.eprintln(hint);
            }
        }
        Error::Interrupted => ctx.eprintln("interrupted"),
        Error::Command(CommandError::Ambiguous { .. }) => {
            ctx.eprintln(format_args!("{}: {}", ctx.name(), err));
        }
        _ => {
            ctx.eprintln(format_args!("{}: {}", ctx.name(), err));
            let _ = help::show_help(ctx);
        }
    }
    Err(err)
}
