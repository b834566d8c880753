use std::path::PathBuf;
use thiserror::Error;

/// Reasons a module failed to load. In every case the runtime is left exactly
/// as it was before the attempt.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("module {} is already loaded", .0.display())]
    AlreadyLoaded(PathBuf),
    #[error("error loading module {}: {reason}", .path.display())]
    OpenFailed { path: PathBuf, reason: String },
    #[error("{} is not a valid services module", .0.display())]
    NotAnExtension(PathBuf),
    #[error("module {} has wrong ABI version ({have} != {want}), please recompile it", .path.display())]
    AbiVersionMismatch { path: PathBuf, have: u32, want: u32 },
    #[error("module {} has wrong ABI revision ({have} != {want}), please recompile it", .path.display())]
    AbiRevisionMismatch { path: PathBuf, have: u32, want: u32 },
    #[error("module {name} already exists while loading {}", .path.display())]
    DuplicatePublishedName { name: String, path: PathBuf },
    #[error("init failed while loading module {}: {reason}", .path.display())]
    InitFailed { path: PathBuf, reason: String },
}

/// Errors looking up something owned by another module
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("module {0} is not loaded")]
    UnitNotLoaded(String),
    #[error("could not find symbol {symbol} in module {module}")]
    SymbolNotFound { module: String, symbol: String },
}

#[derive(Debug, Clone, Error)]
pub enum UnloadError {
    #[error("module {0} is not loaded")]
    NotLoaded(String),
    #[error("{0} is a permanent module; it cannot be unloaded")]
    Permanent(String),
    /// A command tree owned by a module in the unload set still holds commands
    /// contributed from outside it
    #[error("command tree {service} owned by {owner} still holds commands: {}", .remaining.join(", "))]
    TreeNotEmpty {
        service: String,
        owner: String,
        remaining: Vec<String>,
    },
}

#[derive(Debug, Clone, Error)]
pub enum TreeError {
    #[error("command tree {0} already exists")]
    AlreadyExists(String),
    #[error("no such command tree {0}")]
    NoSuchTree(String),
    #[error("{0}")]
    Owner(#[from] ResolveError),
}

/// Failures reported back to whoever issued a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("{0} is not available")]
    NoSuchService(String),
    #[error("Invalid command. Use /msg {service} HELP for a command listing.")]
    UnknownCommand { service: String, command: String },
    #[error("You do not have {0} privilege.")]
    MissingPrivilege(String),
    #[error("You are not authorized to perform this operation.")]
    NotAuthorized,
}

impl DispatchError {
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::MissingPrivilege(_) | Self::NotAuthorized)
    }
}
