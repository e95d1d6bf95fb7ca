//! Help, usage, and version rendering.
//!
//! Renders the usage block, command table, and option table for the
//! deepest matched command (or the program root), with computed column
//! alignment. Also provides [`help_command`], a ready-made
//! `help [<command>]` command that walks the tree to the node named by
//! its arguments.

use crate::command::Command;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::flag::Flag;
use crate::registry::FlagRegistry;

const COLUMN_GAP: usize = 4;

/// The usage block for the current context: a `usage:` line per
/// configured usage string (continuations as `   or:`), plus an alias
/// line when the matched command has aliases.
pub fn usage_lines(ctx: &Context<'_>) -> Vec<String> {
    let name = ctx.name();
    let empty: &[String] = &[];
    let (usage, aliases) = match ctx.stack().last() {
        Some(cmd) => (cmd.usage_lines(), cmd.aliases()),
        None => (ctx.app().usage_lines(), empty),
    };
    let mut lines = Vec::new();
    if usage.is_empty() {
        lines.push(format!("usage: {name}"));
    } else {
        for (i, u) in usage.iter().enumerate() {
            let prefix = if i == 0 { "usage:" } else { "   or:" };
            if u.is_empty() {
                lines.push(format!("{prefix} {name}"));
            } else {
                lines.push(format!("{prefix} {name} {u}"));
            }
        }
    }
    if aliases.len() > 1 {
        lines.push(String::new());
        lines.push(format!("alias: {}", aliases[1..].join(", ")));
    }
    lines
}

/// Renders help for the deepest matched command (or the program root) to
/// the program's standard output.
pub fn show_help(ctx: &Context<'_>) -> Result<()> {
    let app = ctx.app();
    let (desc, children, epilog) = match ctx.stack().last() {
        Some(cmd) => (cmd.description(), cmd.children(), cmd.epilog()),
        None => (app.description(), app.commands(), app.epilog()),
    };

    let mut out = String::new();
    for line in usage_lines(ctx) {
        out.push_str(&line);
        out.push('\n');
    }

    if !desc.is_empty() {
        out.push('\n');
        out.push_str(desc);
        out.push('\n');
    }

    if !children.is_empty() {
        out.push_str("\ncommands:\n\n");
        let mut list: Vec<&Command> = children.iter().collect();
        list.sort_by(|a, b| a.name().cmp(b.name()));
        let width = list.iter().map(|cmd| cmd.name().chars().count()).max().unwrap_or(0);
        for cmd in list {
            let brief = cmd.description().lines().next().unwrap_or("").trim();
            if brief.is_empty() {
                out.push_str(&format!("  {}\n", cmd.name()));
            } else {
                out.push_str(&format!("  {:<w$}{brief}\n", cmd.name(), w = width + COLUMN_GAP));
            }
        }
    }

    let flags = flags_in_scope(ctx);
    if !flags.is_empty() {
        out.push_str("\noptions:\n\n");
        let width = flags
            .iter()
            .map(|flag| flag.display().chars().count())
            .max()
            .unwrap_or(0);
        for flag in &flags {
            let display = flag.display();
            if flag.usage().is_empty() {
                out.push_str(&format!("  {display}\n"));
            } else {
                out.push_str(&format!("  {display:<w$}{}\n", flag.usage(), w = width + COLUMN_GAP));
            }
        }
    }

    if !epilog.is_empty() {
        out.push('\n');
        out.push_str(epilog);
        out.push('\n');
    } else if !desc.is_empty() || !children.is_empty() || !flags.is_empty() {
        out.push('\n');
    }

    app.print(out);
    Ok(())
}

/// Every flag visible at the current stack depth: the root registry plus
/// each matched command's registry, sorted by canonical name.
///
/// Commands without a registry are skipped; this is a display surface,
/// not the composition path.
fn flags_in_scope(ctx: &Context<'_>) -> Vec<Flag> {
    let mut flags: Vec<Flag> = Vec::new();
    ctx.app().flags().visit_all(|flag| flags.push(flag.clone()));
    for cmd in ctx.stack() {
        if let Some(registry) = cmd.flags() {
            registry.visit_all(|flag| flags.push(flag.clone()));
        }
    }
    flags.sort_by(|a, b| a.name().cmp(b.name()));
    flags
}

/// Prints `<name> version <version>` to the program's standard output.
///
/// An unset version string is reported as `unknown`.
pub fn show_version(ctx: &Context<'_>) -> Result<()> {
    let app = ctx.app();
    let version = if app.version().is_empty() {
        "unknown"
    } else {
        app.version()
    };
    app.println(format_args!("{} version {}", app.name(), version));
    Ok(())
}

/// A ready-made `help [<command>]` command.
///
/// With no arguments it shows top-level help; with arguments it walks
/// the command tree along them and shows help for the reached node,
/// aborting with a hint when a name fails to resolve.
pub fn help_command() -> Command {
    Command::new("help")
        .with_usage("[<command>]")
        .with_description("show help for a specified command")
        .with_flags(FlagRegistry::new())
        .with_action(|ctx| {
            ctx.rewind();
            while !ctx.args().is_empty() {
                match ctx.command() {
                    Ok(Some(cmd)) => ctx.push(cmd),
                    Ok(None) => return Err(Error::action("invalid arguments")),
                    Err(err) => {
                        return Err(Error::abort_with_hint(
                            err.to_string(),
                            format!("type '{} help' for usage", ctx.app().name()),
                        ));
                    }
                }
            }
            show_help(ctx)
        })
}
