//! The module runtime: registry, dependency graph and command trees in one
//! place.

use crate::{
    command::{CommandTree, Contributor},
    error::*,
    graph::DependencyGraph,
    loader::{CodeLoader, SymbolAddress},
    unit::{ModuleUnit, UnitId, UnitState},
};

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use tokio::sync::mpsc::UnboundedSender;

mod context;
mod load;
mod trees;
mod unload;

pub use context::ModuleContext;
pub use unload::UnloadedModule;

/// Lifecycle notifications for operators
#[derive(Debug, Clone)]
pub enum ModuleEvent {
    Loaded {
        name: String,
        path: PathBuf,
        address: usize,
        abi_major: u32,
    },
    LoadFailed {
        path: PathBuf,
        error: LoadError,
    },
    Unloaded {
        name: String,
        path: PathBuf,
    },
}

/// Outcome of trying to load one file during a directory scan
pub type LoadOutcome = (PathBuf, Result<UnitId, LoadError>);

/// Owns every loaded module, the dependency edges between them, and the
/// command trees they populate.
///
/// Dropping the runtime unloads everything, as [`shutdown_all`](Self::shutdown_all) does.
pub struct ModuleRuntime {
    loader: Box<dyn CodeLoader>,
    module_dir: PathBuf,
    // Includes embryonic units; ordered by ID, which is load order
    units: BTreeMap<UnitId, ModuleUnit>,
    graph: DependencyGraph,
    trees: Vec<CommandTree>,
    next_id: u64,
    events: Option<UnboundedSender<ModuleEvent>>,
}

impl ModuleRuntime {
    /// Create an empty runtime. Modules requested by name are looked for
    /// under `module_dir`.
    pub fn new(loader: impl CodeLoader + 'static, module_dir: impl Into<PathBuf>) -> Self {
        Self {
            loader: Box::new(loader),
            module_dir: module_dir.into(),
            units: BTreeMap::new(),
            graph: DependencyGraph::new(),
            trees: Vec::new(),
            next_id: 0,
            events: None,
        }
    }

    /// Send lifecycle notifications to `sender`
    pub fn with_events(mut self, sender: UnboundedSender<ModuleEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn module_dir(&self) -> &Path {
        &self.module_dir
    }

    /// Registered modules, in load order
    pub fn modules(&self) -> impl Iterator<Item = &ModuleUnit> {
        self.units.values().filter(|u| u.is_registered())
    }

    /// Number of registered modules
    pub fn len(&self) -> usize {
        self.modules().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a unit by ID, whatever state it's in
    pub fn unit(&self, id: UnitId) -> Option<&ModuleUnit> {
        self.units.get(&id)
    }

    pub fn find_by_path(&self, path: impl AsRef<Path>) -> Option<&ModuleUnit> {
        let path = self.with_suffix(path.as_ref());
        self.modules().find(|u| u.path() == path)
    }

    /// Look up a registered module by its published name
    pub fn find_by_name(&self, name: &str) -> Option<&ModuleUnit> {
        self.modules().find(|u| u.has_name(name))
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.find_by_name(name).is_some()
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Modules that `id` depends on
    pub fn requires(&self, id: UnitId) -> impl Iterator<Item = &ModuleUnit> {
        self.graph.requires(id).filter_map(move |u| self.units.get(&u))
    }

    /// Modules that depend on `id`
    pub fn required_by(&self, id: UnitId) -> impl Iterator<Item = &ModuleUnit> {
        self.graph.required_by(id).filter_map(move |u| self.units.get(&u))
    }

    /// Look up `symbol` in the module published as `module`.
    ///
    /// If `requester` is given, it's recorded as depending on that module
    /// from now on, whether or not the symbol exists.
    pub fn resolve(
        &mut self,
        requester: Option<UnitId>,
        module: &str,
        symbol: &str,
    ) -> Result<SymbolAddress, ResolveError> {
        let Some(target) = self.find_by_name(module).map(ModuleUnit::id) else {
            tracing::error!(module, symbol, "Module is not loaded");
            return Err(ResolveError::UnitNotLoaded(module.to_owned()));
        };

        if let Some(requester) = requester {
            self.link(requester, target, symbol);
        }

        self.units[&target].code.symbol(symbol).ok_or_else(|| {
            tracing::error!(module, symbol, "Could not find symbol");
            ResolveError::SymbolNotFound {
                module: module.to_owned(),
                symbol: symbol.to_owned(),
            }
        })
    }

    /// Record that `from` depends on `to`, on account of `what`. Units on
    /// their way out don't pick up new dependencies.
    fn link(&mut self, from: UnitId, to: UnitId, what: &str) {
        let Some(unit) = self.units.get(&from) else {
            return;
        };
        if !matches!(unit.state, UnitState::Embryonic | UnitState::Standard) {
            return;
        }

        if self.graph.link(from, to) {
            tracing::debug!(
                dependency = self.units[&to].name(),
                dependent = self.units[&from].name(),
                what,
                "Added module dependency"
            );
        }
    }

    fn notify(&self, event: ModuleEvent) {
        if let Some(sender) = &self.events {
            // Nobody listening is fine
            let _ = sender.send(event);
        }
    }

    fn next_unit_id(&mut self) -> UnitId {
        self.next_id += 1;
        UnitId::new(self.next_id)
    }

    /// Append the loader's suffix to `path` if it doesn't already have it
    fn with_suffix(&self, path: &Path) -> PathBuf {
        let suffix = self.loader.suffix();
        if path.as_os_str().to_string_lossy().ends_with(suffix) {
            path.to_path_buf()
        } else {
            let mut with_suffix = path.as_os_str().to_owned();
            with_suffix.push(suffix);
            PathBuf::from(with_suffix)
        }
    }
}

impl Drop for ModuleRuntime {
    fn drop(&mut self) {
        self.shutdown_all();
    }
}
