//! Services daemon for sable networks
//!
//! Loads services modules through [`sable_modules`], creates the configured
//! services' command trees and runs an operator console on standard input.
//! Each console line is either `<service> <command> [arguments]`, dispatched
//! to that service's tree, or one of the daemon's own commands (`MODLOAD`,
//! `MODUNLOAD`, `MODRELOAD`, `MODLIST`, `HELP`, `SHUTDOWN`).

pub mod config;
pub mod tracing_config;

mod console;
mod daemon;

pub use console::ConsoleOperator;
pub use daemon::{Daemon, HostContext, HostHandler, CONSOLE_SERVICE};

use config::ServicesConfig;
use sable_modules::{ModuleRuntime, NativeLoader};
use tokio::io::{AsyncBufReadExt, BufReader};

fn flush_output(daemon: &Daemon) {
    for line in daemon.operator().take_output() {
        println!("{}", line);
    }
}

/// Run the daemon until the console is closed, `SHUTDOWN` is issued or the
/// process is interrupted, then unload every module.
pub async fn run(config: ServicesConfig) -> anyhow::Result<()> {
    let (event_send, mut event_recv) = tokio::sync::mpsc::unbounded_channel();

    let runtime = ModuleRuntime::new(NativeLoader::new(), &config.module_dir).with_events(event_send);
    let mut daemon = Daemon::new(&config, runtime)?;

    daemon.load_modules(&config);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while daemon.is_running() {
        while let Ok(event) = event_recv.try_recv() {
            daemon.report_event(&event);
        }
        flush_output(&daemon);

        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => daemon.handle_line(&line),
                    None => {
                        tracing::info!("Console closed");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    daemon.shutdown();

    while let Ok(event) = event_recv.try_recv() {
        daemon.report_event(&event);
    }
    flush_output(&daemon);

    Ok(())
}
