//! End-to-end dispatch behavior: strategy control flow, flag composition
//! across command scopes, error reporting, and cancellation.

use std::cell::{Cell, RefCell};
use std::io::Write;
use std::rc::Rc;

use cmdtree_core::{
    App, Choice, Command, CommandError, Error, Flag, FlagRegistry, Strategy, help_command,
};

/// Shared capture buffer for program output.
#[derive(Clone, Default)]
struct Buf(Rc<RefCell<Vec<u8>>>);

impl Buf {
    fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).expect("output is utf-8")
    }
}

impl Write for Buf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn capture(app: &mut App) -> (Buf, Buf) {
    let stdout = Buf::default();
    let stderr = Buf::default();
    app.set_stdout(stdout.clone());
    app.set_stderr(stderr.clone());
    (stdout, stderr)
}

/// `tool cmd subcmd`, both nodes with empty registries.
fn nested_app() -> App {
    let mut app = App::new("tool");
    capture(&mut app);
    app.add(
        Command::new("cmd")
            .with_flags(FlagRegistry::new())
            .with_subcommand(Command::new("subcmd").with_flags(FlagRegistry::new())),
    );
    app
}

#[test]
fn unknown_subcommand_token_errors() {
    let mut app = nested_app();
    let err = app.run(["cmd", "_"]).unwrap_err();
    match err {
        Error::Command(CommandError::Unknown { name }) => assert_eq!(name, "_"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_subcommand_is_the_command_required_sentinel() {
    let mut app = nested_app();
    assert!(matches!(app.run(["cmd"]), Err(Error::CommandRequired)));
}

#[test]
fn unknown_flag_at_depth_errors() {
    let mut app = nested_app();
    let err = app.run(["cmd", "subcmd", "-g"]).unwrap_err();
    match err {
        Error::Flag(msg) => assert!(msg.contains("not defined"), "{msg}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn leaf_without_action_succeeds() {
    let mut app = nested_app();
    app.run(["cmd", "subcmd"]).unwrap();
}

#[test]
fn leaf_action_runs_once() {
    let ran = Rc::new(Cell::new(0));
    let mut app = App::new("tool");
    capture(&mut app);
    let counter = ran.clone();
    app.add(
        Command::new("cmd")
            .with_flags(FlagRegistry::new())
            .with_action(move |_ctx| {
                counter.set(counter.get() + 1);
                Ok(())
            }),
    );
    app.run(["cmd"]).unwrap();
    assert_eq!(ran.get(), 1);
}

#[test]
fn flags_compose_from_root_through_every_level() {
    let checked = Rc::new(Cell::new(false));
    let mut app = App::new("tool");
    capture(&mut app);
    app.flags_mut().add(Flag::bool("g", false));
    let seen = checked.clone();
    app.add(
        Command::new("cmd")
            .with_flag(Flag::bool("cmd", false))
            .with_subcommand(
                Command::new("subcmd")
                    .with_flag(Flag::bool("subcmd", false))
                    .with_action(move |ctx| {
                        for name in ["g", "cmd", "subcmd"] {
                            assert!(ctx.get_bool(name), "-{name} should be set");
                        }
                        seen.set(true);
                        Ok(())
                    }),
            ),
    );
    app.run(["-g", "cmd", "-cmd", "subcmd", "-subcmd"]).unwrap();
    assert!(checked.get());
}

#[test]
#[should_panic(expected = "has no flag registry")]
fn registry_less_node_under_composition_is_fatal() {
    let mut app = App::new("tool");
    capture(&mut app);
    // "cmd" has no registry of its own but sits above a flag-bearing
    // child: composing the child's scope walks a broken tree.
    app.add(Command::new("cmd").with_subcommand(Command::new("subcmd").with_flags(FlagRegistry::new())));
    let _ = app.run(["cmd", "subcmd"]);
}

#[test]
fn leftover_positionals_reach_the_leaf_action() {
    let mut app = App::new("tool");
    capture(&mut app);
    app.add(
        Command::new("cmd")
            .with_flags(FlagRegistry::new())
            .with_action(|ctx| {
                assert_eq!(ctx.args(), ["x", "y"]);
                assert_eq!(ctx.arg(0), Some("x"));
                assert_eq!(ctx.narg(), 2);
                Ok(())
            }),
    );
    app.run(["cmd", "x", "y"]).unwrap();
}

#[test]
fn prefix_resolution_works_end_to_end() {
    let ran = Rc::new(Cell::new(false));
    let mut app = App::new("tool");
    capture(&mut app);
    let seen = ran.clone();
    app.add(
        Command::new("greet, g")
            .with_flags(FlagRegistry::new())
            .with_action(move |_ctx| {
                seen.set(true);
                Ok(())
            }),
    );
    app.add(Command::new("grab").with_flags(FlagRegistry::new()));
    // "gre" uniquely prefixes greet; "g" is exact even though it
    // prefixes both.
    app.run(["gre"]).unwrap();
    app.run(["g"]).unwrap();
    assert!(ran.get());
}

#[test]
fn ambiguous_command_reports_sorted_candidates_without_usage() {
    let mut app = App::new("tool");
    let (_, stderr) = capture(&mut app);
    app.add(Command::new("bar"));
    app.add(Command::new("baz"));
    let err = app.run(["ba"]).unwrap_err();
    match err {
        Error::Command(CommandError::Ambiguous { name, candidates }) => {
            assert_eq!(name, "ba");
            assert_eq!(candidates, ["bar", "baz"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    let text = stderr.contents();
    assert!(text.contains("command 'ba' is ambiguous (bar, baz)"), "{text}");
    assert!(!text.contains("usage:"), "{text}");
}

#[test]
fn command_required_prints_usage_without_an_error_line() {
    let mut app = App::new("tool");
    let (_, stderr) = capture(&mut app);
    app.add(Command::new("cmd"));
    assert!(matches!(app.run::<_, String>([]), Err(Error::CommandRequired)));
    let text = stderr.contents();
    assert!(text.starts_with("usage: tool"), "{text}");
    assert!(!text.contains("command required"), "{text}");
}

#[test]
fn abort_prints_message_and_hint_without_usage() {
    let mut app = App::new("tool");
    let (_, stderr) = capture(&mut app);
    app.add(
        Command::new("cmd")
            .with_flags(FlagRegistry::new())
            .with_action(|_ctx| Err(Error::abort_with_hint("no repository found", "run 'tool init' first"))),
    );
    assert!(matches!(app.run(["cmd"]), Err(Error::Abort { .. })));
    let text = stderr.contents();
    assert!(text.contains("tool: no repository found"), "{text}");
    assert!(text.contains("run 'tool init' first"), "{text}");
    assert!(!text.contains("usage:"), "{text}");
}

#[test]
fn action_errors_are_reported_with_the_command_path() {
    let mut app = App::new("tool");
    let (_, stderr) = capture(&mut app);
    app.add(
        Command::new("cmd")
            .with_flags(FlagRegistry::new())
            .with_action(|_ctx| Err(Error::action("exploded"))),
    );
    let err = app.run(["cmd"]).unwrap_err();
    assert!(matches!(err, Error::Action(_)));
    let text = stderr.contents();
    assert!(text.contains("tool cmd: exploded"), "{text}");
}

// ---------------------------------------------------------------------------
// Chain strategy
// ---------------------------------------------------------------------------

fn chain_app(order: &Rc<RefCell<Vec<String>>>) -> App {
    let mut app = App::new("tool").with_strategy(Strategy::Chain);
    capture(&mut app);
    for name in ["foo", "bar", "baz"] {
        let order = order.clone();
        app.add(
            Command::new(name)
                .with_flag(Flag::bool(name, false))
                .with_action(move |ctx| {
                    let own = ctx.stack()[0].name().to_string();
                    assert_eq!(ctx.stack().len(), 1);
                    assert!(ctx.get_bool(&own), "-{own} should be set");
                    for other in ["foo", "bar", "baz"] {
                        if other != own {
                            assert!(ctx.value(other).is_none(), "-{other} is out of scope");
                        }
                    }
                    order.borrow_mut().push(own);
                    Ok(())
                }),
        );
    }
    app
}

#[test]
fn chain_runs_each_command_with_its_own_flags() {
    let order = Rc::new(RefCell::new(Vec::new()));
    let mut app = chain_app(&order);
    app.run(["foo", "-foo", "bar", "-bar", "baz", "-baz"]).unwrap();
    assert_eq!(*order.borrow(), ["foo", "bar", "baz"]);
}

#[test]
fn chain_unknown_command_stops_the_loop() {
    let order = Rc::new(RefCell::new(Vec::new()));
    let mut app = chain_app(&order);
    let err = app.run(["foo", "_"]).unwrap_err();
    assert!(matches!(err, Error::Command(CommandError::Unknown { .. })));
    assert_eq!(*order.borrow(), ["foo"]);
}

#[test]
fn chain_with_no_arguments_requires_a_command() {
    let order = Rc::new(RefCell::new(Vec::new()));
    let mut app = chain_app(&order);
    assert!(matches!(app.run::<_, String>([]), Err(Error::CommandRequired)));
}

#[test]
fn chain_propagates_flag_errors() {
    let order = Rc::new(RefCell::new(Vec::new()));
    let mut app = chain_app(&order);
    let err = app.run(["foo", "-chain"]).unwrap_err();
    match err {
        Error::Flag(msg) => assert!(msg.contains("not defined"), "{msg}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn chain_stops_on_the_first_failing_step() {
    let mut app = App::new("tool").with_strategy(Strategy::Chain);
    capture(&mut app);
    let ran = Rc::new(Cell::new(false));
    app.add(
        Command::new("boom")
            .with_flags(FlagRegistry::new())
            .with_action(|_ctx| Err(Error::action("boom"))),
    );
    let seen = ran.clone();
    app.add(
        Command::new("next")
            .with_flags(FlagRegistry::new())
            .with_action(move |_ctx| {
                seen.set(true);
                Ok(())
            }),
    );
    assert!(app.run(["boom", "next"]).is_err());
    assert!(!ran.get());
}

#[test]
fn chain_does_not_re_enter_from_a_running_command() {
    // "outer" has no action, so control falls back to the Chain
    // strategy while a command is already on the stack: a no-op rather
    // than a second chain over the leftover arguments.
    let mut app = App::new("tool").with_strategy(Strategy::Chain);
    capture(&mut app);
    app.add(Command::new("outer").with_flags(FlagRegistry::new()));
    app.run(["outer"]).unwrap();
}

#[test]
fn cancellation_before_the_run_interrupts_without_resolving() {
    let order = Rc::new(RefCell::new(Vec::new()));
    let mut app = chain_app(&order);
    app.cancel_token().cancel();
    let err = app.run(["foo", "-foo"]).unwrap_err();
    assert!(matches!(err, Error::Interrupted));
    assert!(order.borrow().is_empty());
}

#[test]
fn cancellation_between_steps_stops_the_chain() {
    let mut app = App::new("tool").with_strategy(Strategy::Chain);
    capture(&mut app);
    let token = app.cancel_token();
    app.add(
        Command::new("first")
            .with_flags(FlagRegistry::new())
            .with_action(move |_ctx| {
                token.cancel();
                Ok(())
            }),
    );
    let ran = Rc::new(Cell::new(false));
    let seen = ran.clone();
    app.add(
        Command::new("second")
            .with_flags(FlagRegistry::new())
            .with_action(move |_ctx| {
                seen.set(true);
                Ok(())
            }),
    );
    let err = app.run(["first", "second"]).unwrap_err();
    assert!(matches!(err, Error::Interrupted));
    assert!(!ran.get());
}

// ---------------------------------------------------------------------------
// Option and Simple strategies
// ---------------------------------------------------------------------------

#[test]
fn option_runs_the_fallback_action_without_arguments() {
    let ran = Rc::new(Cell::new(false));
    let seen = ran.clone();
    let mut app = App::new("tool").with_strategy(Strategy::option(move |_ctx| {
        seen.set(true);
        Ok(())
    }));
    capture(&mut app);
    app.add(Command::new("cmd").with_flags(FlagRegistry::new()));
    app.run::<_, String>([]).unwrap();
    assert!(ran.get());
}

#[test]
fn option_delegates_to_subcommand_dispatch_when_named() {
    let fallback = Rc::new(Cell::new(false));
    let command = Rc::new(Cell::new(false));
    let seen_fallback = fallback.clone();
    let mut app = App::new("tool").with_strategy(Strategy::option(move |_ctx| {
        seen_fallback.set(true);
        Ok(())
    }));
    capture(&mut app);
    let seen_command = command.clone();
    app.add(
        Command::new("cmd")
            .with_flags(FlagRegistry::new())
            .with_action(move |_ctx| {
                seen_command.set(true);
                Ok(())
            }),
    );
    app.run(["cmd"]).unwrap();
    assert!(command.get());
    assert!(!fallback.get());
}

#[test]
fn simple_never_consults_the_command_tree() {
    let mut app = App::new("tool").with_strategy(Strategy::simple(|ctx| {
        assert_eq!(ctx.args(), ["cmd", "extra"]);
        Ok(())
    }));
    capture(&mut app);
    app.add(Command::new("cmd").with_flags(FlagRegistry::new()));
    app.run(["cmd", "extra"]).unwrap();
}

#[test]
fn double_dash_passes_flag_like_tokens_through() {
    let mut app = App::new("tool").with_strategy(Strategy::simple(|ctx| {
        assert_eq!(ctx.args(), ["-x", "cmd"]);
        Ok(())
    }));
    capture(&mut app);
    app.run(["--", "-x", "cmd"]).unwrap();
}

// ---------------------------------------------------------------------------
// Environment precedence, state reuse, hooks
// ---------------------------------------------------------------------------

#[test]
fn env_overrides_default_and_argv_overrides_env() {
    unsafe { std::env::set_var("__CMDTREE_DISPATCH_ENV__", "from-env") };
    let observed = Rc::new(RefCell::new(Vec::new()));
    let mut app = App::new("tool").with_strategy(Strategy::Simple(Box::new({
        let observed = observed.clone();
        move |ctx| {
            observed.borrow_mut().push(ctx.get_str("greeting"));
            Ok(())
        }
    })));
    capture(&mut app);
    app.flags_mut()
        .add(Flag::string("greeting", "default").with_env("__CMDTREE_DISPATCH_ENV__"));

    assert_eq!(app.flags().get_str("greeting"), "from-env");
    app.run::<_, String>([]).unwrap();
    app.run(["-greeting", "from-argv"]).unwrap();
    assert_eq!(*observed.borrow(), ["from-env", "from-argv"]);
    unsafe { std::env::remove_var("__CMDTREE_DISPATCH_ENV__") };
}

#[test]
fn reuse_across_runs_requires_an_explicit_reset() {
    let observed = Rc::new(RefCell::new(Vec::new()));
    let mut app = App::new("tool").with_strategy(Strategy::Simple(Box::new({
        let observed = observed.clone();
        move |ctx| {
            observed.borrow_mut().push(ctx.get_bool("g"));
            Ok(())
        }
    })));
    capture(&mut app);
    app.flags_mut().add(Flag::bool("g", false));

    app.run(["-g"]).unwrap();
    // Without a reset the parsed value leaks into the next run.
    app.run::<_, String>([]).unwrap();
    app.flags_mut().reset();
    app.run::<_, String>([]).unwrap();
    assert_eq!(*observed.borrow(), [true, true, false]);
}

#[test]
fn prepare_hook_runs_before_the_resolved_command() {
    let mut app = App::new("tool").with_prepare(|_ctx, cmd| {
        if let Some(cmd) = cmd {
            cmd.set_data(42_u32);
        }
        Ok(())
    });
    capture(&mut app);
    app.add(
        Command::new("cmd")
            .with_flags(FlagRegistry::new())
            .with_action(|ctx| {
                let cmd = ctx.stack().last().copied().expect("command on stack");
                assert_eq!(*cmd.data::<u32>().expect("payload set by prepare"), 42);
                Ok(())
            }),
    );
    app.run(["cmd"]).unwrap();
}

#[test]
fn prepare_hook_errors_stop_the_dispatch() {
    let ran = Rc::new(Cell::new(false));
    let mut app = App::new("tool").with_prepare(|_ctx, _cmd| Err(Error::action("not prepared")));
    capture(&mut app);
    let seen = ran.clone();
    app.add(
        Command::new("cmd")
            .with_flags(FlagRegistry::new())
            .with_action(move |_ctx| {
                seen.set(true);
                Ok(())
            }),
    );
    assert!(app.run(["cmd"]).is_err());
    assert!(!ran.get());
}

#[test]
fn custom_error_handler_replaces_the_default() {
    let mut app = App::new("tool").with_error_handler(|_ctx, _err| Ok(()));
    let (_, stderr) = capture(&mut app);
    app.add(Command::new("cmd"));
    // The handler swallows the unknown-command error entirely.
    app.run(["_"]).unwrap();
    assert!(stderr.contents().is_empty());
}

#[test]
fn choice_flags_resolve_prefixes_in_a_full_run() {
    let format = Choice::new([("json", "json"), ("yaml", "yaml")])
        .with_prefix_matching()
        .shared();
    let mut app = App::new("tool");
    capture(&mut app);
    app.add(
        Command::new("export")
            .with_flag(Flag::custom("format, f", format.clone()))
            .with_action(|_ctx| Ok(())),
    );
    app.run(["export", "-f", "y"]).unwrap();
    assert_eq!(format.borrow().selected_key(), Some("yaml"));

    let err = app.run(["export", "-f", "x"]).unwrap_err();
    match err {
        Error::Flag(msg) => assert!(msg.contains("expected json or yaml"), "{msg}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn help_command_walks_the_tree() {
    let mut app = App::new("tool");
    let (stdout, _) = capture(&mut app);
    app.add(help_command());
    app.add(
        Command::new("remote")
            .with_flags(FlagRegistry::new())
            .with_usage("<subcommand>")
            .with_subcommand(Command::new("add").with_flags(FlagRegistry::new())),
    );
    app.run(["help", "remote"]).unwrap();
    let text = stdout.contents();
    assert!(text.contains("usage: tool remote <subcommand>"), "{text}");
    assert!(text.contains("add"), "{text}");
}

#[test]
fn help_command_aborts_with_a_hint_on_unknown_names() {
    let mut app = App::new("tool");
    capture(&mut app);
    app.add(help_command());
    app.add(Command::new("remote").with_flags(FlagRegistry::new()));
    let err = app.run(["help", "nope"]).unwrap_err();
    match err {
        Error::Abort { message, hint } => {
            assert!(message.contains("unknown command 'nope'"), "{message}");
            assert_eq!(hint.as_deref(), Some("type 'tool help' for usage"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
