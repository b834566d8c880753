use std::collections::HashMap;
use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};
use tracing_core::LevelFilter;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinLogTarget {
    Stdout,
    Stderr,
}

/// How often a file target starts a new file
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Daily,
    Hourly,
    Never,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum LogTarget {
    /// `filename` is relative to the log directory unless absolute. Rotated
    /// files get a date suffix.
    File {
        filename: PathBuf,
        #[serde(default)]
        rotation: LogRotation,
    },
    Builtin(BuiltinLogTarget),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct LogEntry {
    pub target: LogTarget,
    /// Only log events from these modules (and their submodules)
    #[serde(default)]
    pub modules: Vec<String>,
    pub level: Option<LogLevel>,
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub default_level: Option<LogLevel>,
    #[serde(default)]
    pub module_levels: HashMap<String, LogLevel>,
    pub targets: Vec<LogEntry>,
}

/// A service whose command tree the daemon creates at startup
#[derive(Clone, Debug, serde::Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    /// Commands listed individually in the short HELP output
    #[serde(default)]
    pub primary: Vec<String>,
}

/// Who the console acts as
#[derive(Clone, Debug, serde::Deserialize)]
pub struct OperatorConfig {
    pub name: String,
    #[serde(default)]
    pub privileges: Vec<String>,
}

/// Configuration for the services daemon
#[derive(Clone, Debug, serde::Deserialize)]
pub struct ServicesConfig {
    /// Where modules requested by name are loaded from
    pub module_dir: PathBuf,
    /// Published names of modules to load at startup, in order
    #[serde(default)]
    pub autoload: Vec<String>,
    /// Also try every module file in `module_dir`
    #[serde(default)]
    pub load_all: bool,
    /// Restricts `load_all` to file names matching this pattern
    pub load_pattern: Option<String>,

    #[serde(default)]
    pub services: Vec<ServiceConfig>,
    pub operator: OperatorConfig,

    pub log: LoggingConfig,
}

impl ServicesConfig {
    /// Load configuration from a file
    pub fn load_file<P: AsRef<Path>>(filename: P) -> Result<Self, anyhow::Error> {
        let mut file = File::open(filename)?;
        let mut config = String::new();
        file.read_to_string(&mut config)?;
        Self::parse(&config)
    }

    pub fn parse(config: &str) -> Result<Self, anyhow::Error> {
        Ok(json5::from_str(config)?)
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(arg: LogLevel) -> LevelFilter {
        match arg {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Off => LevelFilter::OFF,
        }
    }
}
