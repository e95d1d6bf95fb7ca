//! Command-line construction toolkit.
//!
//! This crate resolves a tree of named commands against an argument
//! vector, binds typed flag values from arguments, environment
//! variables, and defaults, and dispatches control to the matched
//! command's action:
//!
//! - [`App`] — the program root: command tree, top-level flags, dispatch
//!   strategy, error handler, and output streams.
//! - [`Command`] — a named, possibly aliased tree node with its own
//!   [`FlagRegistry`], children, and optional leaf action.
//! - [`Flag`] / [`FlagValue`] — typed settings with alias sets, defaults,
//!   and environment-variable fallback; user-defined kinds plug in via
//!   [`CustomValue`] (see [`Choice`] for a ready-made one).
//! - [`Context`] — the per-run cursor: matched command stack, remaining
//!   arguments, and the merged flag registry for the current depth.
//! - [`Strategy`] — the dispatch policy: subcommand descent, command
//!   chaining, option-first, or a single plain action.
//!
//! Command names resolve with exact-then-prefix matching
//! ([`find_command`]): any unambiguous prefix of a command alias works,
//! and an exact alias always beats prefix collisions.
//!
//! # Example
//!
//! ```
//! use cmdtree_core::{App, Command, Flag};
//!
//! let mut app = App::new("tool").with_version("0.1.0");
//! app.add(
//!     Command::new("greet, g")
//!         .with_description("print a greeting")
//!         .with_flag(Flag::string("name, n", "world"))
//!         .with_action(|ctx| {
//!             ctx.println(format_args!("hello, {}", ctx.get_str("name")));
//!             Ok(())
//!         }),
//! );
//!
//! // "gr" resolves by unique prefix; -name binds the string flag.
//! app.run(["gr", "-name", "cli"]).unwrap();
//! ```

mod action;
mod app;
mod command;
mod context;
mod error;
mod flag;
mod help;
mod registry;
mod resolver;
mod text;
mod value;

pub use action::{ActionFn, CancelToken, Strategy};
pub use app::{App, ErrorHandlerFn, PrepareFn, default_error_handler};
pub use command::Command;
pub use context::Context;
pub use error::{CommandError, Error, Result};
pub use flag::Flag;
pub use help::{help_command, show_help, show_version, usage_lines};
pub use registry::FlagRegistry;
pub use resolver::find_command;
pub use text::dedent;
pub use value::{Choice, CustomValue, FlagValue, format_duration, parse_duration};
