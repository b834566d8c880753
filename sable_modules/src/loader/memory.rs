//! In-process code objects.
//!
//! Modules linked into the daemon binary (and test fixtures) are served from
//! here rather than from disk. Each object is registered under the path that
//! [`ModuleRuntime::load`](crate::ModuleRuntime::load) will ask for.

use super::*;
use std::{
    cell::Cell,
    collections::HashMap,
    path::PathBuf,
    rc::Rc,
};

/// A code object description: an optional header plus named symbols.
#[derive(Debug, Clone, Default)]
pub struct MemoryObject {
    header: Option<&'static ModuleHeader>,
    symbols: HashMap<String, SymbolAddress>,
}

impl MemoryObject {
    pub fn new(header: &'static ModuleHeader) -> Self {
        Self {
            header: Some(header),
            symbols: HashMap::new(),
        }
    }

    /// An object that isn't a module at all.
    pub fn without_header() -> Self {
        Self::default()
    }

    pub fn with_symbol(mut self, name: impl Into<String>, address: SymbolAddress) -> Self {
        self.symbols.insert(name.into(), address);
        self
    }
}

/// Counts code objects opened by a [`MemoryLoader`] and not yet dropped.
#[derive(Debug, Clone, Default)]
pub struct OpenObjects(Rc<Cell<usize>>);

impl OpenObjects {
    pub fn count(&self) -> usize {
        self.0.get()
    }
}

/// A [`CodeLoader`] serving [`MemoryObject`]s by path.
#[derive(Debug)]
pub struct MemoryLoader {
    objects: HashMap<PathBuf, MemoryObject>,
    open: OpenObjects,
    suffix: String,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            open: OpenObjects::default(),
            suffix: platform_suffix().to_owned(),
        }
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, object: MemoryObject) {
        self.objects.insert(path.into(), object);
    }

    pub fn with(mut self, path: impl Into<PathBuf>, object: MemoryObject) -> Self {
        self.insert(path, object);
        self
    }

    /// A handle on the count of currently open objects; stays valid after the
    /// loader has been moved into a runtime.
    pub fn open_objects(&self) -> OpenObjects {
        self.open.clone()
    }
}

impl Default for MemoryLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeLoader for MemoryLoader {
    fn open(&self, path: &Path) -> Result<Box<dyn CodeObject>, OpenError> {
        let object = self
            .objects
            .get(path)
            .ok_or_else(|| OpenError(format!("{}: no such module", path.display())))?;

        self.open.0.set(self.open.0.get() + 1);

        Ok(Box::new(MemoryCode {
            object: object.clone(),
            open: self.open.clone(),
        }))
    }

    fn suffix(&self) -> &str {
        &self.suffix
    }
}

struct MemoryCode {
    object: MemoryObject,
    open: OpenObjects,
}

impl CodeObject for MemoryCode {
    fn header(&self) -> Option<&ModuleHeader> {
        self.object.header
    }

    fn symbol(&self, name: &str) -> Option<SymbolAddress> {
        self.object.symbols.get(name).copied()
    }

    fn base_address(&self) -> usize {
        self.object
            .header
            .map(|h| h as *const ModuleHeader as usize)
            .unwrap_or_default()
    }
}

impl Drop for MemoryCode {
    fn drop(&mut self) {
        self.open.0.set(self.open.0.get() - 1);
    }
}
