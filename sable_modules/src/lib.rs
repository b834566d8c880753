//! Loadable module runtime for sable services.
//!
//! Services functionality (NickServ, ChanServ and friends) is split into
//! modules that are loaded at runtime, each publishing a [`ModuleHeader`].
//! The [`ModuleRuntime`] keeps track of what is loaded, which modules depend
//! on which, and the command trees the modules populate.
//!
//! # Loading
//!
//! [`ModuleRuntime::load`] opens a code object through a [`CodeLoader`],
//! checks its header against this crate's ABI numbers and runs its init
//! callback. The callback receives a [`ModuleContext`], through which it can
//! resolve symbols from other modules, load further modules and register
//! commands. Anything it resolves from another module makes that module a
//! dependency, so that it can't be unloaded out from under it.
//!
//! # Unloading
//!
//! Unloading a module first unloads everything that depends on it. Each
//! module's deinit callback runs before its code is released, and any
//! commands it forgot to unregister are removed at that point, so no tree
//! ever holds a handler whose code is gone.
//!
//! # Commands
//!
//! Incoming commands are looked up in the named service's [`CommandTree`],
//! checked against the caller's privileges and handed to the handler with
//! their arguments split out; see the [`command`] module.

pub mod abi;
pub mod command;
pub mod error;
pub mod graph;
pub mod loader;
pub mod runtime;
pub mod unit;

pub use abi::{ModuleHeader, ABI_MAJOR, ABI_REVISION, HEADER_SYMBOL, MODULE_MAGIC};
pub use error::*;
pub use graph::DependencyGraph;
pub use loader::{CodeLoader, CodeObject, MemoryLoader, MemoryObject, NativeLoader, SymbolAddress};
pub use runtime::{LoadOutcome, ModuleContext, ModuleEvent, ModuleRuntime, UnloadedModule};
pub use unit::{ModuleUnit, UnitId, UnitState};
