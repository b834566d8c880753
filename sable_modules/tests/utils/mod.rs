#![allow(dead_code)]

use sable_modules::{
    command::{Command, CommandContext, CommandSource},
    loader::platform_suffix,
    MemoryLoader, MemoryObject, ModuleContext, ModuleRuntime,
};
use std::{cell::RefCell, path::PathBuf};

pub mod fixtures;

pub use fixtures::*;

pub const MODULE_DIR: &str = "modules";

thread_local! {
    static JOURNAL: RefCell<Vec<String>> = RefCell::new(Vec::new());
}

/// Note something that happened inside a fixture module
pub fn record(entry: impl Into<String>) {
    JOURNAL.with(|j| j.borrow_mut().push(entry.into()));
}

/// Everything recorded since the last call
pub fn take_journal() -> Vec<String> {
    JOURNAL.with(|j| std::mem::take(&mut *j.borrow_mut()))
}

/// Where a fixture with the given published name is served from
pub fn module_path(name: &str) -> PathBuf {
    PathBuf::from(format!("{}/{}{}", MODULE_DIR, name, platform_suffix()))
}

/// A loader serving every fixture module from [`MODULE_DIR`], plus a couple of
/// objects that aren't valid modules.
pub fn fixture_loader() -> MemoryLoader {
    let mut loader = MemoryLoader::new();
    for (header, symbols) in fixtures::all() {
        let mut object = MemoryObject::new(header);
        for (name, address) in symbols {
            object = object.with_symbol(name, address);
        }
        loader.insert(module_path(header.name), object);
    }

    loader.insert(module_path("test/plain"), MemoryObject::without_header());
    // Same published name as test/base, different file
    loader.insert(module_path("test/base_copy"), MemoryObject::new(&fixtures::BASE));
    loader
}

pub fn runtime() -> ModuleRuntime {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    take_journal();
    ModuleRuntime::new(fixture_loader(), MODULE_DIR)
}

/// A command source with configurable privileges that keeps the notices it's
/// sent.
#[derive(Default)]
pub struct TestUser {
    pub name: String,
    pub authenticated: bool,
    pub privileges: Vec<String>,
    pub notices: RefCell<Vec<String>>,
}

impl TestUser {
    pub fn anonymous() -> Self {
        Self {
            name: "visitor".to_owned(),
            ..Default::default()
        }
    }

    pub fn with_privileges(privileges: &[&str]) -> Self {
        Self {
            name: "oper".to_owned(),
            authenticated: true,
            privileges: privileges.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn take_notices(&self) -> Vec<String> {
        std::mem::take(&mut *self.notices.borrow_mut())
    }
}

impl CommandSource for TestUser {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    fn has_privilege(&self, privilege: &str) -> bool {
        self.privileges.iter().any(|p| p == privilege)
    }

    fn has_any_privilege(&self) -> bool {
        !self.privileges.is_empty()
    }

    fn notice(&self, text: &str) {
        self.notices.borrow_mut().push(text.to_owned());
    }
}

/// Shared handler for fixture commands: records the command and its
/// arguments and answers the caller.
pub fn record_command(ctx: &mut CommandContext<'_>) {
    let args: Vec<&str> = ctx
        .args()
        .as_slice()
        .iter()
        .map(|a| a.unwrap_or("-"))
        .collect();
    record(format!("{} {}", ctx.command(), args.join("|")));
    ctx.notice(format!("{} done", ctx.command()));
}

pub fn command(name: &str, max_args: usize) -> Command {
    Command::new(name, max_args, record_command as fn(&mut CommandContext<'_>))
}

/// Helper for fixture init functions that need another module's symbol
pub fn resolve_or_fail(ctx: &mut ModuleContext<'_>, module: &str, symbol: &str) {
    if let Err(error) = ctx.resolve(module, symbol) {
        ctx.fail(error.to_string());
    }
}
