use crate::{config::ServicesConfig, console::ConsoleOperator};
use itertools::Itertools;
use sable_modules::{
    command::{self, split_command, Arguments, Command, CommandContext, CommandSource, CommandTree, Contributor},
    ModuleEvent, ModuleRuntime, TreeError,
};
use std::path::Path;

/// Name of the tree holding the daemon's own console commands
pub const CONSOLE_SERVICE: &str = "console";

const ADMIN_PRIVILEGE: &str = "general:admin";
const AUSPEX_PRIVILEGE: &str = "general:auspex";

/// Handler for a console command
pub type HostHandler = fn(&mut HostContext<'_>);

/// What a console command handler gets to work with
pub struct HostContext<'a> {
    pub runtime: &'a mut ModuleRuntime,
    pub source: &'a dyn CommandSource,
    pub host: &'a CommandTree<HostHandler>,
    pub args: Arguments<'a>,
    running: &'a mut bool,
}

impl HostContext<'_> {
    fn notice(&self, text: impl AsRef<str>) {
        self.source.notice(text.as_ref());
    }
}

/// The services daemon: a module runtime plus the console that drives it.
pub struct Daemon {
    runtime: ModuleRuntime,
    host: CommandTree<HostHandler>,
    operator: ConsoleOperator,
    running: bool,
}

impl Daemon {
    /// Set up the configured services' command trees. No modules are loaded
    /// yet; see [`load_modules`](Self::load_modules).
    pub fn new(config: &ServicesConfig, mut runtime: ModuleRuntime) -> Result<Self, TreeError> {
        for service in &config.services {
            runtime.create_tree(&service.name)?;
            runtime.register(
                &service.name,
                Command::new("HELP", 1, service_help as fn(&mut CommandContext<'_>))
                    .with_help("Displays help information."),
            )?;

            if let Some(tree) = runtime.tree_mut(&service.name) {
                tree.set_primary(service.primary.iter().cloned());
            }
        }

        Ok(Self {
            runtime,
            host: host_commands(),
            operator: ConsoleOperator::new(&config.operator),
            running: true,
        })
    }

    pub fn runtime(&self) -> &ModuleRuntime {
        &self.runtime
    }

    pub fn operator(&self) -> &ConsoleOperator {
        &self.operator
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Load the modules named in the config, then scan the module directory
    /// if asked to. Failures are logged and reported, but don't stop startup.
    pub fn load_modules(&mut self, config: &ServicesConfig) {
        for name in &config.autoload {
            if let Err(error) = self.runtime.request(name) {
                tracing::warn!(module = %name, %error, "Couldn't load configured module");
            }
        }

        if config.load_all {
            let dir = config.module_dir.clone();
            let result = match &config.load_pattern {
                Some(pattern) => self.runtime.load_directory_filtered(&dir, pattern),
                None => self.runtime.load_directory(&dir),
            };

            match result {
                Ok(outcomes) => {
                    let (loaded, failed): (Vec<_>, Vec<_>) =
                        outcomes.iter().partition(|(_, result)| result.is_ok());
                    tracing::info!(
                        dir = ?dir,
                        loaded = loaded.len(),
                        failed = failed.len(),
                        "Scanned module directory"
                    );
                }
                Err(error) => {
                    tracing::error!(dir = ?dir, %error, "Couldn't read module directory");
                }
            }
        }
    }

    /// Handle one line typed at the console.
    ///
    /// A line starting with the name of a service is dispatched to that
    /// service's tree; anything else is a console command.
    pub fn handle_line(&mut self, line: &str) {
        let Some((first, rest)) = split_command(line) else {
            return;
        };

        if self.runtime.tree(first).is_some() && !first.eq_ignore_ascii_case(CONSOLE_SERVICE) {
            let (name, args) = split_command(rest).unwrap_or(("HELP", ""));
            // Failures have already been reported to the operator
            let _ = self.runtime.dispatch(first, &self.operator, name, args);
            return;
        }

        let Self {
            runtime,
            host,
            operator,
            running,
        } = self;
        let host = &*host;
        let operator = &*operator;

        let _ = command::dispatch(host, operator, first, rest, |found, args| {
            let handler = *found.handler();
            handler(&mut HostContext {
                runtime,
                source: operator,
                host,
                args,
                running,
            });
        });
    }

    /// Tell the operator about a module lifecycle event
    pub fn report_event(&self, event: &ModuleEvent) {
        let text = match event {
            ModuleEvent::Loaded {
                name,
                path,
                address,
                abi_major,
            } => format!(
                "Module \x02{}\x02 loaded from {} at {:#x} (ABI {})",
                name,
                path.display(),
                address,
                abi_major
            ),
            ModuleEvent::LoadFailed { error, .. } => format!("Failed to load module: {}", error),
            ModuleEvent::Unloaded { name, .. } => format!("Module \x02{}\x02 unloaded", name),
        };
        self.operator.notice(&text);
    }

    /// Unload everything, dependents first.
    pub fn shutdown(&mut self) {
        let unloaded = self.runtime.shutdown_all();
        tracing::info!(count = unloaded.len(), "Services shut down");
        self.running = false;
    }
}

fn host_commands() -> CommandTree<HostHandler> {
    let mut tree = CommandTree::new(CONSOLE_SERVICE, Contributor::Host);

    let commands: [Command<HostHandler>; 6] = [
        Command::new("HELP", 0, help as HostHandler).with_help("Displays console commands and services."),
        Command::new("MODLOAD", 1, modload as HostHandler)
            .with_help("Loads a module.")
            .with_privilege(ADMIN_PRIVILEGE),
        Command::new("MODUNLOAD", 1, modunload as HostHandler)
            .with_help("Unloads a module and everything depending on it.")
            .with_privilege(ADMIN_PRIVILEGE),
        Command::new("MODRELOAD", 1, modreload as HostHandler)
            .with_help("Unloads and reloads a module.")
            .with_privilege(ADMIN_PRIVILEGE),
        Command::new("MODLIST", 0, modlist as HostHandler)
            .with_help("Lists loaded modules.")
            .with_privilege(AUSPEX_PRIVILEGE),
        Command::new("SHUTDOWN", 0, shutdown as HostHandler)
            .with_help("Unloads all modules and exits.")
            .with_privilege(ADMIN_PRIVILEGE),
    ];
    for command in commands {
        tree.register(command);
    }

    tree
}

/// HELP for the configured services' trees
fn service_help(ctx: &mut CommandContext<'_>) {
    let tree = ctx.tree();

    let Some(topic) = ctx.arg(0) else {
        for line in tree.help_short(ctx.source()) {
            ctx.notice(line);
        }
        return;
    };

    match tree.find(topic).filter(|c| c.access().permits(ctx.source())) {
        Some(command) if !command.help().is_empty() => {
            ctx.notice(format!("Help for \x02{}\x02:", command.name()));
            ctx.notice(command.help());
        }
        _ => ctx.notice(format!("No help available for \x02{}\x02.", topic)),
    }
}

fn help(ctx: &mut HostContext<'_>) {
    for line in ctx.host.help_lines(ctx.source) {
        ctx.notice(line);
    }

    let services = ctx.runtime.trees().map(|t| t.service()).join(", ");
    if !services.is_empty() {
        ctx.notice(format!("Services: {}", services));
    }
}

fn modload(ctx: &mut HostContext<'_>) {
    let Some(name) = ctx.args.get(0) else {
        ctx.notice("Syntax: MODLOAD <module>");
        return;
    };

    if ctx.runtime.is_loaded(name) {
        ctx.notice(format!("\x02{}\x02 is already loaded.", name));
        return;
    }

    // Absolute paths are loaded as given; anything else is relative to the module directory
    let result = if Path::new(name).is_absolute() {
        ctx.runtime.load(name)
    } else {
        ctx.runtime.request(name)
    };

    match result {
        Ok(id) => {
            if let Some(unit) = ctx.runtime.unit(id) {
                ctx.notice(format!(
                    "Module \x02{}\x02 loaded at {:#x}.",
                    unit.name(),
                    unit.address()
                ));
            }
        }
        Err(error) => ctx.notice(format!("Module \x02{}\x02 failed to load: {}", name, error)),
    }
}

fn modunload(ctx: &mut HostContext<'_>) {
    let Some(name) = ctx.args.get(0) else {
        ctx.notice("Syntax: MODUNLOAD <module>");
        return;
    };

    match ctx.runtime.unload_module(name) {
        Ok(unloaded) => {
            for module in unloaded {
                ctx.notice(format!("Module \x02{}\x02 unloaded.", module.name));
            }
        }
        Err(error) => ctx.notice(error.to_string()),
    }
}

fn modreload(ctx: &mut HostContext<'_>) {
    let Some(name) = ctx.args.get(0) else {
        ctx.notice("Syntax: MODRELOAD <module>");
        return;
    };

    match ctx.runtime.reload_module(name) {
        Ok(outcomes) => {
            for (path, result) in outcomes {
                match result {
                    Ok(id) => {
                        let name = ctx.runtime.unit(id).map(|u| u.name().to_owned()).unwrap_or_default();
                        ctx.notice(format!("Module \x02{}\x02 reloaded.", name));
                    }
                    Err(error) => ctx.notice(format!(
                        "Module {} failed to reload: {}",
                        path.display(),
                        error
                    )),
                }
            }
        }
        Err(error) => ctx.notice(error.to_string()),
    }
}

fn modlist(ctx: &mut HostContext<'_>) {
    let lines: Vec<String> = ctx
        .runtime
        .modules()
        .map(|unit| {
            let requires = ctx.runtime.requires(unit.id()).map(|u| u.name()).join(", ");
            let mut line = format!("\x02{:<20}\x02 [loaded at {:#x}]", unit.name(), unit.address());
            if !unit.version().is_empty() {
                line.push_str(&format!(" version {}", unit.version()));
            }
            if !unit.vendor().is_empty() {
                line.push_str(&format!(" by {}", unit.vendor()));
            }
            if !requires.is_empty() {
                line.push_str(&format!(" (requires {})", requires));
            }
            line
        })
        .collect();

    for line in &lines {
        ctx.notice(line);
    }
    ctx.notice(format!("\x02{}\x02 modules loaded.", lines.len()));
}

fn shutdown(ctx: &mut HostContext<'_>) {
    tracing::info!(source = ctx.source.name(), "Shutdown requested");
    ctx.notice("Shutting down.");
    *ctx.running = false;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoggingConfig, OperatorConfig, ServiceConfig};
    use pretty_assertions::assert_eq;
    use sable_modules::{MemoryLoader, MemoryObject, ModuleContext, ModuleHeader};

    static KICK_MODULE: ModuleHeader = ModuleHeader::new("chanserv/kick", kick_init).with_version("1.2");

    fn kick_init(ctx: &mut ModuleContext<'_>) {
        let kick = Command::new("KICK", 3, kick as fn(&mut CommandContext<'_>))
            .with_help("Removes a user from a channel.");
        if let Err(error) = ctx.register("ChanServ", kick) {
            ctx.fail(error.to_string());
        }
    }

    fn kick(ctx: &mut CommandContext<'_>) {
        let target = ctx.arg(1).unwrap_or("nobody");
        let reason = ctx.arg(2).unwrap_or("no reason");
        ctx.notice(format!("Kicked {} from {} ({})", target, ctx.arg(0).unwrap_or("?"), reason));
    }

    fn config(privileges: &[&str]) -> ServicesConfig {
        ServicesConfig {
            module_dir: "modules".into(),
            autoload: vec!["chanserv/kick".to_owned()],
            load_all: false,
            load_pattern: None,
            services: vec![ServiceConfig {
                name: "ChanServ".to_owned(),
                primary: vec!["KICK".to_owned()],
            }],
            operator: OperatorConfig {
                name: "console".to_owned(),
                privileges: privileges.iter().map(|p| p.to_string()).collect(),
            },
            log: LoggingConfig {
                dir: "log".into(),
                default_level: None,
                module_levels: Default::default(),
                targets: Vec::new(),
            },
        }
    }

    fn daemon(privileges: &[&str]) -> Daemon {
        let path = format!("modules/chanserv/kick{}", sable_modules::loader::platform_suffix());
        let loader = MemoryLoader::new().with(path, MemoryObject::new(&KICK_MODULE));
        let config = config(privileges);

        let mut daemon = Daemon::new(&config, ModuleRuntime::new(loader, &config.module_dir)).unwrap();
        daemon.load_modules(&config);
        daemon
    }

    #[test]
    fn autoload_and_dispatch() {
        let mut daemon = daemon(&[]);

        daemon.handle_line("ChanServ KICK #sable troll stop that");

        assert_eq!(
            daemon.operator().take_output(),
            vec!["Kicked troll from #sable (stop that)"]
        );
    }

    #[test]
    fn service_help_lists_commands() {
        let mut daemon = daemon(&[]);

        daemon.handle_line("chanserv");
        let output = daemon.operator().take_output();
        assert_eq!(output[0], "The following commands are available:");
        assert!(output[1].starts_with("KICK "));
        assert_eq!(output.last().map(String::as_str), Some("Other commands: HELP"));

        daemon.handle_line("ChanServ HELP kick");
        assert_eq!(
            daemon.operator().take_output(),
            vec!["Help for KICK:", "Removes a user from a channel."]
        );
    }

    #[test]
    fn console_commands_need_privileges() {
        let mut daemon = daemon(&[]);

        daemon.handle_line("MODUNLOAD chanserv/kick");

        assert_eq!(
            daemon.operator().take_output(),
            vec!["You are not authorized to perform this operation."]
        );
        assert!(daemon.runtime().is_loaded("chanserv/kick"));
    }

    #[test]
    fn unload_and_reload() {
        let mut daemon = daemon(&[ADMIN_PRIVILEGE]);

        daemon.handle_line("MODUNLOAD chanserv/kick");
        assert_eq!(daemon.operator().take_output(), vec!["Module chanserv/kick unloaded."]);
        assert!(!daemon.runtime().is_loaded("chanserv/kick"));

        daemon.handle_line("ChanServ KICK #sable troll");
        assert_eq!(
            daemon.operator().take_output(),
            vec!["Invalid command. Use /msg ChanServ HELP for a command listing."]
        );

        daemon.handle_line("MODLOAD chanserv/kick");
        let output = daemon.operator().take_output();
        assert!(output[0].starts_with("Module chanserv/kick loaded at 0x"));

        daemon.handle_line("MODRELOAD chanserv/kick");
        assert_eq!(
            daemon.operator().take_output(),
            vec!["Module chanserv/kick reloaded."]
        );
    }

    #[test]
    fn modlist_needs_auspex() {
        let mut daemon = daemon(&[ADMIN_PRIVILEGE]);

        daemon.handle_line("MODLIST");
        assert_eq!(
            daemon.operator().take_output(),
            vec!["You do not have general:auspex privilege."]
        );

        let mut daemon = self::daemon(&[AUSPEX_PRIVILEGE]);
        daemon.handle_line("modlist");
        let output = daemon.operator().take_output();
        assert_eq!(output.len(), 2);
        assert!(output[0].starts_with("chanserv/kick"));
        assert!(output[0].ends_with("version 1.2"));
        assert_eq!(output[1], "1 modules loaded.");
    }

    #[test]
    fn unknown_console_command() {
        let mut daemon = daemon(&[]);

        daemon.handle_line("FROB");

        assert_eq!(
            daemon.operator().take_output(),
            vec!["Invalid command. Use /msg console HELP for a command listing."]
        );
    }

    #[test]
    fn shutdown_stops_the_daemon() {
        let mut daemon = daemon(&[ADMIN_PRIVILEGE]);

        daemon.handle_line("SHUTDOWN");
        assert!(!daemon.is_running());

        daemon.shutdown();
        assert!(daemon.runtime().is_empty());
    }

    #[test]
    fn events_are_reported() {
        let daemon = daemon(&[]);

        daemon.report_event(&ModuleEvent::Unloaded {
            name: "chanserv/kick".to_owned(),
            path: "modules/chanserv/kick.so".into(),
        });

        assert_eq!(daemon.operator().take_output(), vec!["Module chanserv/kick unloaded"]);
    }
}
