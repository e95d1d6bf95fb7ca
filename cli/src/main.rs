//! `cmdtree-demo`: a toy multitool exercising the engine end to end.
//!
//! Demonstrates subcommand descent, prefix matching, per-scope flag
//! composition, environment-backed flags, choice values, command
//! chaining (`CMDTREE_DEMO_CHAIN=1`), cooperative cancellation, and the
//! built-in help command.

use std::process::ExitCode;
use std::time::{Duration, Instant};

use cmdtree_core::{
    App, Choice, Command, Error, Flag, FlagRegistry, Strategy, dedent, help_command,
};
use tracing::debug;

fn build_app(strategy: Strategy) -> App {
    let mut app = App::new("cmdtree-demo")
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_usage("[options] <command> [<args>]")
        .with_description("a demonstration multitool built with cmdtree")
        .with_epilog("set CMDTREE_DEMO_CHAIN=1 to run several commands in one invocation")
        .with_strategy(strategy);

    app.add(
        Command::new("greet, g")
            .with_usage("[-shout] [-name <name>]")
            .with_description("print a friendly greeting")
            .with_flag(
                Flag::string("n, name", "world")
                    .with_env("CMDTREE_DEMO_NAME")
                    .with_usage("who to greet"),
            )
            .with_flag(Flag::bool("shout", false).with_usage("greet loudly"))
            .with_action(|ctx| {
                let mut greeting = format!("hello, {}!", ctx.get_str("name"));
                if ctx.get_bool("shout") {
                    greeting = greeting.to_uppercase();
                }
                ctx.println(greeting);
                Ok(())
            }),
    );

    app.add(
        Command::new("repeat")
            .with_usage("[-count <count>] <word>...")
            .with_description("print the arguments again and again")
            .with_flag(Flag::uint("c, count", 1).with_usage("how many times"))
            .with_action(|ctx| {
                let words = ctx.take_args();
                if words.is_empty() {
                    return Err(Error::action("nothing to repeat"));
                }
                for _ in 0..ctx.get_uint("count") {
                    ctx.println(words.join(" "));
                }
                Ok(())
            }),
    );

    let token = app.cancel_token();
    app.add(
        Command::new("wait")
            .with_usage("[-delay <delay>]")
            .with_description(dedent(
                "
                sleep for the given delay.

                checks for cancellation while waiting, so an interrupted
                chain stops here instead of sleeping to the end.
                ",
            ))
            .with_flag(Flag::duration("d, delay", Duration::from_millis(1)).with_usage("how long to wait"))
            .with_action(move |ctx| {
                let deadline = Instant::now() + ctx.get_duration("delay");
                while Instant::now() < deadline {
                    if token.is_cancelled() {
                        return Err(Error::Interrupted);
                    }
                    std::thread::sleep(Duration::from_millis(1));
                }
                Ok(())
            }),
    );

    app.add(
        Command::new("text")
            .with_usage("<subcommand> <word>...")
            .with_description("case conversion helpers")
            .with_flags(FlagRegistry::new())
            .with_subcommand(
                Command::new("upper, up")
                    .with_flags(FlagRegistry::new())
                    .with_description("uppercase the arguments")
                    .with_action(|ctx| {
                        let words = ctx.take_args();
                        ctx.println(words.join(" ").to_uppercase());
                        Ok(())
                    }),
            )
            .with_subcommand(
                Command::new("lower, lo")
                    .with_flags(FlagRegistry::new())
                    .with_description("lowercase the arguments")
                    .with_action(|ctx| {
                        let words = ctx.take_args();
                        ctx.println(words.join(" ").to_lowercase());
                        Ok(())
                    }),
            ),
    );

    let format = Choice::new([("json", "json"), ("yaml", "yml"), ("table", "txt")])
        .with_prefix_matching()
        .shared();
    app.add(
        Command::new("export")
            .with_usage("[-format <format>] <name>")
            .with_description("pretend to export something")
            .with_flag(
                Flag::custom("f, format", format.clone())
                    .with_metavar(" <format>")
                    .with_usage("output format (json, table, or yaml)"),
            )
            .with_action(move |ctx| {
                let name = ctx
                    .take_args()
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| "export".to_string());
                let ext = format.borrow().selected().copied().unwrap_or("json");
                ctx.println(format_args!("writing {name}.{ext}"));
                Ok(())
            }),
    );

    app.add(help_command());
    app
}

fn exit_status(err: &Error) -> u8 {
    match err {
        Error::Flag(_) | Error::Command(_) | Error::CommandRequired => 2,
        Error::Interrupted => 130,
        _ => 1,
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let chain = std::env::var("CMDTREE_DEMO_CHAIN").is_ok_and(|v| !v.is_empty());
    let strategy = if chain { Strategy::Chain } else { Strategy::Subcommand };
    debug!(chain, "dispatching");

    let mut app = build_app(strategy);
    match app.run(std::env::args().skip(1)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => ExitCode::from(exit_status(&err)),
    }
}
