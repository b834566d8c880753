//! Module fixtures served by the test loader.
//!
//! Each one records its init and deinit calls in the test journal, so tests
//! can check what ran and in what order.

use super::{command, record, record_command, resolve_or_fail};
use sable_modules::{
    command::{Command, CommandContext},
    LoadError, ModuleContext, ModuleHeader, SymbolAddress, ABI_MAJOR, ABI_REVISION,
};

static BASE_VALUE: u32 = 42;
static MIDDLE_VALUE: u32 = 7;
static CYCLE_A_VALUE: u32 = 1;
static CYCLE_B_VALUE: u32 = 2;

/// Owns the TestServ tree, with a HELP command in it
pub static BASE: ModuleHeader = ModuleHeader::new("test/base", base_init)
    .with_deinit(base_deinit)
    .with_version("1.0")
    .with_vendor("sable test suite");

/// Depends on test/base through a resolved symbol
pub static MIDDLE: ModuleHeader = ModuleHeader::new("test/middle", middle_init).with_deinit(middle_deinit);

/// Depends on test/middle
pub static TOP: ModuleHeader = ModuleHeader::new("test/top", top_init).with_deinit(top_deinit);

/// Adds commands to test/base's tree and removes them again on deinit
pub static PINGER: ModuleHeader = ModuleHeader::new("test/pinger", pinger_init).with_deinit(pinger_deinit);

/// Adds a command to the host's tree and never removes it
pub static SLOPPY: ModuleHeader = ModuleHeader::new("test/sloppy", sloppy_init);

/// Sets things up, then reports failure
pub static FAILING: ModuleHeader = ModuleHeader::new("test/failing", failing_init).with_deinit(failing_deinit);

/// Loads test/base from its own init
pub static LOADER: ModuleHeader = ModuleHeader::new("test/loader", loader_init).with_deinit(loader_deinit);

/// Tries to load itself from its own init
pub static SELF_REQUEST: ModuleHeader = ModuleHeader::new("test/self_request", self_request_init);

/// Permanent dependent of test/base
pub static ANCHOR: ModuleHeader = ModuleHeader::new("test/anchor", anchor_init).permanent();

/// Registers a batch of commands into test/base's tree, some of them taken
pub static DUPLICATOR: ModuleHeader =
    ModuleHeader::new("test/duplicator", duplicator_init).with_deinit(duplicator_deinit);

/// Depends on test/base, and loads test/latecomer from its deinit
pub static DEPARTING: ModuleHeader =
    ModuleHeader::new("test/departing", departing_init).with_deinit(departing_deinit);

/// Wants test/base's symbol and tree; fails without them
pub static LATECOMER: ModuleHeader = ModuleHeader::new("test/latecomer", latecomer_init);

/// Creates NestServ, loads test/nest_child into it, then fails
pub static NEST_PARENT: ModuleHeader =
    ModuleHeader::new("test/nest_parent", nest_parent_init).with_deinit(nest_parent_deinit);

/// Adds a command to test/nest_parent's tree
pub static NEST_CHILD: ModuleHeader =
    ModuleHeader::new("test/nest_child", nest_child_init).with_deinit(nest_child_deinit);

pub static CYCLE_A: ModuleHeader = ModuleHeader::new("test/cycle_a", noop_init).with_deinit(cycle_a_deinit);
pub static CYCLE_B: ModuleHeader = ModuleHeader::new("test/cycle_b", noop_init).with_deinit(cycle_b_deinit);

pub static OLD_ABI: ModuleHeader = ModuleHeader {
    abi_major: ABI_MAJOR + 1,
    ..ModuleHeader::new("test/old", noop_init)
};

pub static NEWER_REVISION: ModuleHeader = ModuleHeader {
    abi_revision: ABI_REVISION + 1,
    ..ModuleHeader::new("test/newer", noop_init)
};

pub static BAD_MAGIC: ModuleHeader = ModuleHeader {
    magic: 0xdead_beef,
    ..ModuleHeader::new("test/bogus", noop_init)
};

/// Every fixture header with the symbols its code object exports
pub fn all() -> Vec<(&'static ModuleHeader, Vec<(&'static str, SymbolAddress)>)> {
    vec![
        (&BASE, vec![("base_value", SymbolAddress::of(&BASE_VALUE))]),
        (&MIDDLE, vec![("middle_value", SymbolAddress::of(&MIDDLE_VALUE))]),
        (&TOP, vec![]),
        (&PINGER, vec![]),
        (&SLOPPY, vec![]),
        (&FAILING, vec![]),
        (&LOADER, vec![]),
        (&SELF_REQUEST, vec![]),
        (&ANCHOR, vec![]),
        (&DUPLICATOR, vec![]),
        (&DEPARTING, vec![]),
        (&LATECOMER, vec![]),
        (&NEST_PARENT, vec![]),
        (&NEST_CHILD, vec![]),
        (&CYCLE_A, vec![("cycle_value", SymbolAddress::of(&CYCLE_A_VALUE))]),
        (&CYCLE_B, vec![("cycle_value", SymbolAddress::of(&CYCLE_B_VALUE))]),
        (&OLD_ABI, vec![]),
        (&NEWER_REVISION, vec![]),
        (&BAD_MAGIC, vec![]),
    ]
}

pub fn noop_init(_ctx: &mut ModuleContext<'_>) {}

fn help(ctx: &mut CommandContext<'_>) {
    for line in ctx.tree().help_lines(ctx.source()) {
        ctx.notice(line);
    }
}

fn base_init(ctx: &mut ModuleContext<'_>) {
    record("init test/base");

    if let Err(error) = ctx.create_tree("TestServ") {
        ctx.fail(error.to_string());
        return;
    }
    let help_command = Command::new("HELP", 1, help as fn(&mut CommandContext<'_>))
        .with_help("Displays help information.");
    if let Err(error) = ctx.register("TestServ", help_command) {
        ctx.fail(error.to_string());
    }
}

fn base_deinit(ctx: &mut ModuleContext<'_>) {
    record("deinit test/base");
    ctx.unregister("TestServ", "HELP");
}

fn middle_init(ctx: &mut ModuleContext<'_>) {
    record("init test/middle");

    if let Err(error) = ctx.request("test/base") {
        ctx.fail(error.to_string());
        return;
    }
    resolve_or_fail(ctx, "test/base", "base_value");
}

fn middle_deinit(_ctx: &mut ModuleContext<'_>) {
    record("deinit test/middle");
}

fn top_init(ctx: &mut ModuleContext<'_>) {
    record("init test/top");

    if let Err(error) = ctx.request("test/middle") {
        ctx.fail(error.to_string());
        return;
    }
    resolve_or_fail(ctx, "test/middle", "middle_value");
}

fn top_deinit(_ctx: &mut ModuleContext<'_>) {
    record("deinit test/top");
}

fn pinger_init(ctx: &mut ModuleContext<'_>) {
    record("init test/pinger");

    if let Err(error) = ctx.request("test/base") {
        ctx.fail(error.to_string());
        return;
    }

    let commands = [
        command("PING", 2).with_help("Checks that the service is alive."),
        command("MARK", 3)
            .with_help("Adds a note to a channel.")
            .with_privilege("chan:mark"),
        command("SET", 2)
            .with_help("Sets account options.")
            .authenticated(),
    ];
    if let Err(error) = ctx.register_many("TestServ", commands) {
        ctx.fail(error.to_string());
    }
}

fn pinger_deinit(ctx: &mut ModuleContext<'_>) {
    record("deinit test/pinger");
    ctx.unregister_many("TestServ", ["PING", "MARK", "SET"]);
}

fn duplicator_init(ctx: &mut ModuleContext<'_>) {
    if let Err(error) = ctx.request("test/base") {
        ctx.fail(error.to_string());
        return;
    }

    let commands = [command("ECHO", 1), command("help", 0), command("echo", 2)];
    match ctx.register_many("TestServ", commands) {
        Ok(added) => record(format!("registered {}", added)),
        Err(error) => ctx.fail(error.to_string()),
    }
}

fn duplicator_deinit(ctx: &mut ModuleContext<'_>) {
    // HELP belongs to test/base
    let removed = ctx.unregister_many("TestServ", ["ECHO", "HELP"]);
    record(format!("unregistered {}", removed));
}

fn departing_init(ctx: &mut ModuleContext<'_>) {
    if let Err(error) = ctx.request("test/base") {
        ctx.fail(error.to_string());
        return;
    }
    resolve_or_fail(ctx, "test/base", "base_value");
}

fn departing_deinit(ctx: &mut ModuleContext<'_>) {
    record("deinit test/departing");

    match ctx.request("test/latecomer") {
        Ok(_) => record("latecomer loaded"),
        Err(_) => record("latecomer refused"),
    }
}

fn latecomer_init(ctx: &mut ModuleContext<'_>) {
    record("init test/latecomer");

    let mut usable = true;
    if ctx.resolve("test/base", "base_value").is_err() {
        record("test/base unavailable");
        usable = false;
    }
    if ctx.register("TestServ", command("LATE", 0)).is_err() {
        record("TestServ unavailable");
        usable = false;
    }

    if !usable {
        ctx.fail("dependencies are going away");
    }
}

fn nest_parent_init(ctx: &mut ModuleContext<'_>) {
    record("init test/nest_parent");

    if let Err(error) = ctx.create_tree("NestServ") {
        ctx.fail(error.to_string());
        return;
    }
    if let Err(error) = ctx.request("test/nest_child") {
        ctx.fail(error.to_string());
        return;
    }

    ctx.fail("changed its mind");
}

fn nest_parent_deinit(_ctx: &mut ModuleContext<'_>) {
    record("deinit test/nest_parent");
}

fn nest_child_init(ctx: &mut ModuleContext<'_>) {
    record("init test/nest_child");

    if let Err(error) = ctx.register("NestServ", command("NEST", 0)) {
        ctx.fail(error.to_string());
    }
}

fn nest_child_deinit(ctx: &mut ModuleContext<'_>) {
    record("deinit test/nest_child");
    ctx.unregister("NestServ", "NEST");
}

fn sloppy_init(ctx: &mut ModuleContext<'_>) {
    record("init test/sloppy");

    let sloppy = Command::new("SLOPPY", 0, record_command as fn(&mut CommandContext<'_>));
    if let Err(error) = ctx.register("Host", sloppy) {
        ctx.fail(error.to_string());
    }
}

fn failing_init(ctx: &mut ModuleContext<'_>) {
    record("init test/failing");

    // Leave as much behind as possible for the rollback to clean up
    let _ = ctx.create_tree("FailServ");
    let _ = ctx.register("FailServ", command("BROKEN", 0));
    let _ = ctx.register("Host", command("FAILCMD", 0));
    let _ = ctx.request("test/base");

    ctx.fail("database unavailable");
}

fn failing_deinit(_ctx: &mut ModuleContext<'_>) {
    record("deinit test/failing");
}

fn loader_init(ctx: &mut ModuleContext<'_>) {
    record("init test/loader");

    if let Err(error) = ctx.request("test/base") {
        ctx.fail(error.to_string());
        return;
    }
    resolve_or_fail(ctx, "test/base", "base_value");
}

fn loader_deinit(_ctx: &mut ModuleContext<'_>) {
    record("deinit test/loader");
}

fn self_request_init(ctx: &mut ModuleContext<'_>) {
    match ctx.request("test/self_request") {
        Ok(_) => record("self request: loaded"),
        Err(LoadError::AlreadyLoaded(_)) => record("self request: already loaded"),
        Err(other) => record(format!("self request: {}", other)),
    }
}

fn anchor_init(ctx: &mut ModuleContext<'_>) {
    if let Err(error) = ctx.request("test/base") {
        ctx.fail(error.to_string());
        return;
    }
    resolve_or_fail(ctx, "test/base", "base_value");
}

fn cycle_a_deinit(_ctx: &mut ModuleContext<'_>) {
    record("deinit test/cycle_a");
}

fn cycle_b_deinit(_ctx: &mut ModuleContext<'_>) {
    record("deinit test/cycle_b");
}
