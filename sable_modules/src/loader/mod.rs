//! Opening code objects and looking symbols up in them.
//!
//! Everything platform-specific about loading code lives behind [`CodeLoader`]
//! and [`CodeObject`]; the rest of the runtime only sees these two traits.
//! Closing a code object is dropping it.

use crate::abi::ModuleHeader;
use std::{ffi::c_void, path::Path};
use thiserror::Error;

mod memory;
mod native;

pub use memory::{MemoryLoader, MemoryObject, OpenObjects};
pub use native::NativeLoader;

/// A code object couldn't be opened. Carries the loader's own description.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct OpenError(pub String);

/// The address of a symbol inside a loaded code object.
///
/// Only valid for as long as the module that owns it stays loaded. A module
/// that obtained the address through [`ModuleContext::resolve`](crate::ModuleContext::resolve)
/// depends on the owner, so the owner can't be unloaded first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolAddress(*const c_void);

impl SymbolAddress {
    /// The address of a static item. Used to publish symbols from in-process code objects.
    pub fn of<T>(item: &'static T) -> Self {
        Self(item as *const T as *const c_void)
    }

    pub fn from_raw(ptr: *const c_void) -> Self {
        Self(ptr)
    }

    pub fn as_ptr<T>(self) -> *const T {
        self.0 as *const T
    }

    pub fn address(self) -> usize {
        self.0 as usize
    }

    /// Reinterpret the symbol as a reference to a `T`.
    ///
    /// # Safety
    ///
    /// The symbol must really be a `T`, and the returned reference must not be
    /// used after the owning module is unloaded.
    pub unsafe fn get<T>(self) -> &'static T {
        &*(self.0 as *const T)
    }
}

/// A loaded code object.
pub trait CodeObject {
    /// The exported module header, if there is one with the right magic tag.
    fn header(&self) -> Option<&ModuleHeader>;

    /// Look up an exported symbol by name.
    fn symbol(&self, name: &str) -> Option<SymbolAddress>;

    /// Where the object ended up in memory. Diagnostic only.
    fn base_address(&self) -> usize;
}

/// Something that can open code objects from paths.
pub trait CodeLoader {
    fn open(&self, path: &Path) -> Result<Box<dyn CodeObject>, OpenError>;

    /// File name suffix of loadable modules, including the dot.
    fn suffix(&self) -> &str;
}

/// The platform's shared-library suffix (`.so`, `.dylib`, `.dll`).
pub fn platform_suffix() -> &'static str {
    std::env::consts::DLL_SUFFIX
}
