use super::*;
use crate::command::Command;

/// A module's view of the runtime while its init or deinit callback runs.
///
/// Everything done through the context is attributed to the module it was
/// created for: symbols it resolves and trees it adds commands to become
/// dependencies of that module, and commands it registers are recorded as
/// its own.
pub struct ModuleContext<'a> {
    runtime: &'a mut ModuleRuntime,
    unit: UnitId,
}

impl<'a> ModuleContext<'a> {
    pub(crate) fn new(runtime: &'a mut ModuleRuntime, unit: UnitId) -> Self {
        Self { runtime, unit }
    }

    /// The module this context belongs to
    pub fn id(&self) -> UnitId {
        self.unit
    }

    pub fn name(&self) -> &str {
        self.runtime
            .units
            .get(&self.unit)
            .map(ModuleUnit::name)
            .unwrap_or_default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.runtime.units.get(&self.unit).map(ModuleUnit::path)
    }

    /// Abort initialisation. Once init returns, the module and anything it
    /// set up are torn down and the load reports `reason`.
    ///
    /// Has no effect outside init.
    pub fn fail(&mut self, reason: impl Into<String>) {
        if let Some(unit) = self.runtime.units.get_mut(&self.unit) {
            if unit.state == UnitState::Embryonic {
                unit.state = UnitState::Failed(reason.into());
            }
        }
    }

    /// Read-only access to the rest of the runtime
    pub fn runtime(&self) -> &ModuleRuntime {
        self.runtime
    }

    /// Look up `symbol` in the module published as `module`, which this
    /// module then depends on.
    pub fn resolve(&mut self, module: &str, symbol: &str) -> Result<SymbolAddress, ResolveError> {
        self.runtime.resolve(Some(self.unit), module, symbol)
    }

    /// Make sure the module published as `name` is loaded. The loaded module
    /// doesn't become a dependency until something is resolved from it.
    pub fn request(&mut self, name: &str) -> Result<UnitId, LoadError> {
        self.runtime.request(name)
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<UnitId, LoadError> {
        self.runtime.load(path)
    }

    /// Create a command tree owned by this module. It goes away when the
    /// module is unloaded.
    pub fn create_tree(&mut self, service: &str) -> Result<(), TreeError> {
        self.runtime
            .create_tree_as(Contributor::Unit(self.unit), service)
    }

    /// Look up a command tree, recording a dependency on its owner
    pub fn command_tree(&mut self, service: &str) -> Result<&CommandTree, TreeError> {
        self.runtime.link_tree_owner(self.unit, service)?;
        self.runtime
            .tree(service)
            .ok_or_else(|| TreeError::NoSuchTree(service.to_owned()))
    }

    /// Add a command to the named tree on behalf of this module.
    ///
    /// Returns `Ok(false)` if the tree already has a command of that name; the
    /// existing one is kept.
    pub fn register(&mut self, service: &str, command: Command) -> Result<bool, TreeError> {
        self.runtime
            .register_as(Contributor::Unit(self.unit), service, command)
    }

    /// Add several commands to the named tree, returning how many were new.
    ///
    /// Stops at the first error. Commands added before it stay registered and
    /// are removed with the module like any others.
    pub fn register_many(
        &mut self,
        service: &str,
        commands: impl IntoIterator<Item = Command>,
    ) -> Result<usize, TreeError> {
        let mut added = 0;
        for command in commands {
            if self.register(service, command)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Remove a command this module registered earlier.
    pub fn unregister(&mut self, service: &str, name: &str) -> Option<Command> {
        self.runtime
            .unregister_as(Contributor::Unit(self.unit), service, name)
    }

    /// Remove several of this module's commands, returning how many were
    /// removed.
    pub fn unregister_many<'n>(&mut self, service: &str, names: impl IntoIterator<Item = &'n str>) -> usize {
        let mut removed = 0;
        for name in names {
            if self.unregister(service, name).is_some() {
                removed += 1;
            }
        }
        removed
    }
}
