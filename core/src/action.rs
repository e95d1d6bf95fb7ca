//! Dispatch strategies.
//!
//! A program runs under exactly one [`Strategy`], configured on the
//! [`App`](crate::App): single-shot subcommand descent, command
//! chaining, option-first dispatch, or a plain action with no command
//! tree at all. Commands without a leaf action fall back to the
//! program's strategy, which is how intermediate tree nodes descend into
//! their children.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::context::Context;
use crate::error::{Error, Result};

/// A boxed command action.
pub type ActionFn = Box<dyn Fn(&mut Context<'_>) -> Result<()>>;

/// A cloneable cooperative-cancellation handle.
///
/// Cancellation is observed at well-defined checkpoints only: the
/// [`Chain`](Strategy::Chain) strategy checks immediately before each
/// command resolution, so a multi-command chain stops between steps
/// rather than mid-step.
///
/// # Examples
///
/// ```
/// use cmdtree_core::CancelToken;
///
/// let token = CancelToken::new();
/// let handle = token.clone();
/// assert!(!token.is_cancelled());
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Safe to call from a signal handler thread.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The top-level dispatch policy of a program.
pub enum Strategy {
    /// Resolve exactly one command from the root and run it; leftover
    /// positionals become the action's arguments. The default.
    Subcommand,
    /// Repeatedly resolve commands from the root sibling list until the
    /// arguments are exhausted, running each as an independent step.
    Chain,
    /// Run the given action when no positional arguments remain after
    /// top-level flag parsing; otherwise behave like
    /// [`Subcommand`](Self::Subcommand).
    Option(ActionFn),
    /// Always run the given action; the command tree is never consulted.
    Simple(ActionFn),
}

impl Strategy {
    /// Creates an [`Option`](Self::Option) strategy from a closure.
    pub fn option<F>(action: F) -> Self
    where
        F: Fn(&mut Context<'_>) -> Result<()> + 'static,
    {
        Self::Option(Box::new(action))
    }

    /// Creates a [`Simple`](Self::Simple) strategy from a closure.
    pub fn simple<F>(action: F) -> Self
    where
        F: Fn(&mut Context<'_>) -> Result<()> + 'static,
    {
        Self::Simple(Box::new(action))
    }

    pub(crate) fn dispatch<'a>(&self, ctx: &mut Context<'a>) -> Result<()> {
        match self {
            Self::Subcommand => subcommand(ctx),
            Self::Chain => chain(ctx),
            Self::Option(action) => {
                if !ctx.args().is_empty() {
                    // A command name was supplied after all.
                    subcommand(ctx)
                } else {
                    ctx.prepare(None)?;
                    action(ctx)
                }
            }
            Self::Simple(action) => {
                ctx.prepare(None)?;
                action(ctx)
            }
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Self::Subcommand
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subcommand => f.write_str("Subcommand"),
            Self::Chain => f.write_str("Chain"),
            Self::Option(_) => f.write_str("Option(..)"),
            Self::Simple(_) => f.write_str("Simple(..)"),
        }
    }
}

/// Resolves one command from the current cursor, pushes it, and runs it.
fn subcommand<'a>(ctx: &mut Context<'a>) -> Result<()> {
    let Some(cmd) = ctx.command()? else {
        return Ok(());
    };
    ctx.prepare(Some(cmd))?;
    ctx.push(cmd);
    cmd.run(ctx)
}

/// Resolves and runs commands from the root sibling list until the
/// arguments run out or a step fails.
fn chain<'a>(ctx: &mut Context<'a>) -> Result<()> {
    if !ctx.stack().is_empty() {
        // Invoked from within a running command; chaining does not
        // re-enter.
        return Ok(());
    }
    loop {
        if ctx.app().cancelled() {
            return Err(Error::Interrupted);
        }
        let Some(cmd) = ctx.command()? else {
            return Ok(());
        };
        ctx.prepare(Some(cmd))?;
        // Each chain step is an independent top-level command: the next
        // resolution starts over from the root sibling list, and the
        // stack holds the current step alone.
        ctx.reset_candidates();
        ctx.replace_stack_top(cmd);
        cmd.run(ctx)?;
        if ctx.args().is_empty() {
            return Ok(());
        }
        debug!(command = cmd.name(), rest = ctx.args().len(), "chain step complete");
    }
}
