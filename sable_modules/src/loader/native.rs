//! Shared-object modules, via `libloading`.

use super::*;
use crate::abi::{HEADER_SYMBOL, MODULE_MAGIC};
use libloading::Library;

/// Loads modules from `.so`/`.dylib`/`.dll` files.
#[derive(Debug, Default)]
pub struct NativeLoader;

impl NativeLoader {
    pub fn new() -> Self {
        Self
    }
}

impl CodeLoader for NativeLoader {
    fn open(&self, path: &Path) -> Result<Box<dyn CodeObject>, OpenError> {
        // Safety: opening a library runs its static initialisers. Module files
        // come from the configured module directory and are trusted.
        let library = unsafe { Library::new(path) }.map_err(|e| OpenError(e.to_string()))?;

        Ok(Box::new(NativeObject { library }))
    }

    fn suffix(&self) -> &str {
        platform_suffix()
    }
}

struct NativeObject {
    library: Library,
}

impl NativeObject {
    fn raw_symbol(&self, name: &str) -> Option<*const c_void> {
        // Safety: we only take the symbol's address here; nothing is called or read
        let symbol = unsafe { self.library.get::<*const c_void>(name.as_bytes()) }.ok()?;
        let ptr = *symbol;

        (!ptr.is_null()).then_some(ptr)
    }
}

impl CodeObject for NativeObject {
    fn header(&self) -> Option<&ModuleHeader> {
        let ptr = self.raw_symbol(HEADER_SYMBOL)?;

        // Safety: whatever the symbol is, it's at least as big as the leading
        // magic field of a header; the rest is only interpreted once that matches.
        let magic = unsafe { std::ptr::read_unaligned(ptr as *const u32) };
        if magic != MODULE_MAGIC {
            return None;
        }

        // Safety: the magic tag says this is a `ModuleHeader`, and it lives as
        // long as `self.library` does.
        Some(unsafe { &*(ptr as *const ModuleHeader) })
    }

    fn symbol(&self, name: &str) -> Option<SymbolAddress> {
        self.raw_symbol(name).map(SymbolAddress::from_raw)
    }

    fn base_address(&self) -> usize {
        self.raw_symbol(HEADER_SYMBOL)
            .map(|ptr| ptr as usize)
            .unwrap_or_default()
    }
}
