//! The module header: the one piece of a module the runtime reads before any
//! of the module's own code runs.

use crate::runtime::ModuleContext;

/// Identifies a code object as a sable services module.
pub const MODULE_MAGIC: u32 = 0x5ab1_e0d5;

/// Module API major version. Modules built against a different major version
/// are rejected outright.
pub const ABI_MAJOR: u32 = 2;

/// Module API revision. Bumped whenever the layout of anything a module can
/// see (this header, [`ModuleContext`], command types) changes.
pub const ABI_REVISION: u32 = 1;

/// The exported symbol under which every module publishes its [`ModuleHeader`].
pub const HEADER_SYMBOL: &str = "SABLE_MODULE_HEADER";

/// Module initialisation callback. Call [`ModuleContext::fail`] to abort the load.
pub type ModuleInitFn = fn(&mut ModuleContext<'_>);

/// Module teardown callback, run before the module's code is released.
pub type ModuleDeinitFn = fn(&mut ModuleContext<'_>);

/// The fixed-layout descriptor exported by each module.
///
/// `magic` must stay the first field: loaders probe it on its own before
/// trusting the rest of the structure.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ModuleHeader {
    pub magic: u32,
    pub abi_major: u32,
    pub abi_revision: u32,
    /// Published name, unique among loaded modules (e.g. `chanserv/kick`)
    pub name: &'static str,
    pub version: &'static str,
    pub vendor: &'static str,
    /// Permanent modules can't be unloaded or reloaded by an operator
    pub permanent: bool,
    pub init: ModuleInitFn,
    pub deinit: Option<ModuleDeinitFn>,
}

impl ModuleHeader {
    /// A header for the current ABI with the given name and init callback.
    pub const fn new(name: &'static str, init: ModuleInitFn) -> Self {
        Self {
            magic: MODULE_MAGIC,
            abi_major: ABI_MAJOR,
            abi_revision: ABI_REVISION,
            name,
            version: "",
            vendor: "",
            permanent: false,
            init,
            deinit: None,
        }
    }

    pub const fn with_deinit(self, deinit: ModuleDeinitFn) -> Self {
        Self {
            deinit: Some(deinit),
            ..self
        }
    }

    pub const fn with_version(self, version: &'static str) -> Self {
        Self { version, ..self }
    }

    pub const fn with_vendor(self, vendor: &'static str) -> Self {
        Self { vendor, ..self }
    }

    pub const fn permanent(self) -> Self {
        Self {
            permanent: true,
            ..self
        }
    }
}

/// Export a module header from a module crate.
///
/// ```ignore
/// sable_modules::declare_module!(
///     ModuleHeader::new("chanserv/kick", modinit)
///         .with_deinit(moddeinit)
///         .with_vendor("sable")
/// );
/// ```
#[macro_export]
macro_rules! declare_module {
    ($header:expr) => {
        #[no_mangle]
        pub static SABLE_MODULE_HEADER: $crate::ModuleHeader = $header;
    };
}
