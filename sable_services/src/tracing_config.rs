use crate::config::*;
use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::Subscriber;
use tracing_appender::rolling;
use tracing_core::{Level, LevelFilter};
use tracing_subscriber::{filter::filter_fn, prelude::*, registry::LookupSpan, Layer};

#[derive(Debug, Error)]
pub enum LogSetupError {
    #[error("Couldn't create log directory {}: {source}", dir.display())]
    CreateDir {
        dir: PathBuf,
        source: std::io::Error,
    },
    #[error("Log file target {} has no file name", .0.display())]
    NoFileName(PathBuf),
}

/// Directory and file name prefix for a file target. Relative names,
/// including ones with directories of their own, live under `dir`.
pub(crate) fn log_file_location(dir: &Path, filename: &Path) -> Result<(PathBuf, OsString), LogSetupError> {
    let prefix = filename
        .file_name()
        .ok_or_else(|| LogSetupError::NoFileName(filename.to_owned()))?
        .to_owned();

    let full = dir.join(filename);
    let directory = full.parent().map_or_else(|| dir.to_owned(), Path::to_owned);

    Ok((directory, prefix))
}

/// Level and module restrictions for one log target
#[derive(Debug, Clone)]
pub(crate) struct TargetFilter {
    level: LevelFilter,
    modules: Vec<String>,
}

impl TargetFilter {
    fn new(conf: &LogEntry) -> Self {
        Self {
            level: conf.level.map_or(LevelFilter::TRACE, Into::into),
            modules: conf.modules.clone(),
        }
    }

    /// `sable_modules` covers `sable_modules::runtime` but not `sable_modules_extra`
    pub(crate) fn accepts(&self, level: &Level, module_path: Option<&str>) -> bool {
        if level > &self.level {
            return false;
        }

        let Some(module_path) = module_path else {
            return true;
        };

        self.modules.is_empty()
            || self.modules.iter().any(|m| {
                module_path
                    .strip_prefix(m.as_str())
                    .map_or(false, |rest| rest.is_empty() || rest.starts_with("::"))
            })
    }
}

fn build_target<S>(conf: LogEntry, dir: &Path) -> Result<Box<dyn Layer<S> + Send + Sync + 'static>, LogSetupError>
where
    S: Subscriber + Send + Sync,
    for<'span> S: LookupSpan<'span>,
{
    let filter = TargetFilter::new(&conf);

    let layer = match conf.target {
        LogTarget::File { filename, rotation } => {
            let (directory, prefix) = log_file_location(dir, &filename)?;
            std::fs::create_dir_all(&directory).map_err(|source| LogSetupError::CreateDir {
                dir: directory.clone(),
                source,
            })?;

            let appender = match rotation {
                LogRotation::Daily => rolling::daily(directory, prefix),
                LogRotation::Hourly => rolling::hourly(directory, prefix),
                LogRotation::Never => rolling::never(directory, prefix),
            };

            tracing_subscriber::fmt::layer()
                .with_writer(appender)
                .with_ansi(false)
                .boxed()
        }
        LogTarget::Builtin(BuiltinLogTarget::Stdout) => {
            tracing_subscriber::fmt::layer().with_writer(std::io::stdout).boxed()
        }
        LogTarget::Builtin(BuiltinLogTarget::Stderr) => {
            tracing_subscriber::fmt::layer().with_writer(std::io::stderr).boxed()
        }
    };

    let filter = filter_fn(move |metadata| filter.accepts(metadata.level(), metadata.module_path()));

    Ok(layer.with_filter(filter).boxed())
}

/// Build the daemon's subscriber from its logging config
pub fn build_subscriber(conf: LoggingConfig) -> Result<impl Subscriber, LogSetupError> {
    let mut layers = Vec::new();

    for target in conf.targets {
        layers.push(build_target(target, &conf.dir)?);
    }

    // The global filter only trims noisy crates; each target narrows further
    let filter = tracing_subscriber::filter::Targets::new()
        .with_default(conf.default_level.unwrap_or(LogLevel::Trace))
        .with_targets(conf.module_levels);

    Ok(tracing_subscriber::registry().with(filter).with(layers))
}
