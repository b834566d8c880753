use crate::{
    abi::{ModuleDeinitFn, ModuleHeader},
    loader::CodeObject,
};
use std::path::{Path, PathBuf};

/// Identifies one loaded module for as long as it stays loaded. IDs are never
/// reused, and sort in load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(u64);

impl UnitId {
    pub(crate) fn new(n: u64) -> Self {
        Self(n)
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

/// Where a module is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitState {
    /// Init callback is still running
    Embryonic,
    /// Initialised and registered
    Standard,
    /// Init reported failure; about to be torn down
    Failed(String),
    /// Being torn down; its deinit callback may be running
    Unloading,
}

/// One loaded module.
///
/// Header strings are copied out on load: the originals live inside the
/// module's code and go away with it.
pub struct ModuleUnit {
    id: UnitId,
    path: PathBuf,
    name: String,
    version: String,
    vendor: String,
    abi_major: u32,
    abi_revision: u32,
    permanent: bool,
    address: usize,
    pub(crate) state: UnitState,
    pub(crate) deinit: Option<ModuleDeinitFn>,
    // Last, so that it's the last thing dropped
    pub(crate) code: Box<dyn CodeObject>,
}

impl ModuleUnit {
    pub(crate) fn new(
        id: UnitId,
        path: PathBuf,
        header: &ModuleHeader,
        code: Box<dyn CodeObject>,
    ) -> Self {
        Self {
            id,
            path,
            name: header.name.to_owned(),
            version: header.version.to_owned(),
            vendor: header.vendor.to_owned(),
            abi_major: header.abi_major,
            abi_revision: header.abi_revision,
            permanent: header.permanent,
            address: code.base_address(),
            state: UnitState::Embryonic,
            deinit: header.deinit,
            code,
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The published name declared in the module header
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn abi_major(&self) -> u32 {
        self.abi_major
    }

    pub fn abi_revision(&self) -> u32 {
        self.abi_revision
    }

    pub fn is_permanent(&self) -> bool {
        self.permanent
    }

    pub fn address(&self) -> usize {
        self.address
    }

    pub fn state(&self) -> &UnitState {
        &self.state
    }

    pub fn is_registered(&self) -> bool {
        self.state == UnitState::Standard
    }

    pub(crate) fn has_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl std::fmt::Debug for ModuleUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleUnit")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("path", &self.path)
            .field("state", &self.state)
            .field("address", &format_args!("{:#x}", self.address))
            .finish()
    }
}
