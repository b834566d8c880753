use super::*;
use itertools::Itertools;

/// A module that was torn down, as reported back to whoever asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnloadedModule {
    pub name: String,
    pub path: PathBuf,
}

impl ModuleRuntime {
    /// Unload a module along with everything that depends on it, dependents
    /// first.
    ///
    /// Unloading a unit that isn't loaded does nothing. Fails without changing
    /// anything if a command tree owned by one of the modules to be unloaded
    /// still holds commands from a module that would stay.
    pub fn unload(&mut self, id: UnitId) -> Result<Vec<UnloadedModule>, UnloadError> {
        if !self.units.contains_key(&id) {
            return Ok(Vec::new());
        }

        let order = self.graph.teardown_order(id);
        self.check_trees(&order)?;

        Ok(self.teardown(&order))
    }

    /// Unload the module published as `name` on an operator's behalf.
    ///
    /// Unlike [`unload`](Self::unload), refuses if the module or anything that
    /// would go with it is permanent.
    pub fn unload_module(&mut self, name: &str) -> Result<Vec<UnloadedModule>, UnloadError> {
        let id = self
            .find_by_name(name)
            .map(ModuleUnit::id)
            .ok_or_else(|| UnloadError::NotLoaded(name.to_owned()))?;

        let order = self.graph.teardown_order(id);

        if let Some(permanent) = order
            .iter()
            .filter_map(|id| self.units.get(id))
            .find(|u| u.is_permanent())
        {
            return Err(UnloadError::Permanent(permanent.name().to_owned()));
        }

        self.check_trees(&order)?;

        Ok(self.teardown(&order))
    }

    /// Unload the module published as `name` and everything depending on it,
    /// then load them all back from the same paths, dependencies first.
    pub fn reload_module(&mut self, name: &str) -> Result<Vec<LoadOutcome>, UnloadError> {
        let unloaded = self.unload_module(name)?;

        Ok(unloaded
            .into_iter()
            .rev()
            .map(|module| {
                // An earlier reload may have pulled it back in already
                let result = match self.find_by_path(&module.path) {
                    Some(unit) => Ok(unit.id()),
                    None => self.load(&module.path),
                };
                (module.path, result)
            })
            .collect())
    }

    /// Unload every module, in an order that never leaves a module loaded
    /// after something it depends on has gone.
    ///
    /// Commands still registered in trees about to be dropped are discarded
    /// with a warning instead of blocking the shutdown.
    pub fn shutdown_all(&mut self) -> Vec<UnloadedModule> {
        if !self.units.is_empty() {
            tracing::info!(count = self.units.len(), "Unloading all modules");
        }

        let mut unloaded = Vec::new();
        while let Some(&id) = self.units.keys().next() {
            let order = self.graph.teardown_order(id);
            unloaded.extend(self.teardown(&order));
        }
        unloaded
    }

    fn check_trees(&self, order: &[UnitId]) -> Result<(), UnloadError> {
        let inside = |contributor: Contributor| match contributor {
            Contributor::Host => false,
            Contributor::Unit(id) => order.contains(&id),
        };

        for tree in &self.trees {
            let Contributor::Unit(owner) = tree.owner() else {
                continue;
            };
            if !order.contains(&owner) {
                continue;
            }

            let remaining = tree.contributed_outside(inside);
            if !remaining.is_empty() {
                let owner = self
                    .units
                    .get(&owner)
                    .map(|u| u.name().to_owned())
                    .unwrap_or_else(|| owner.to_string());

                return Err(UnloadError::TreeNotEmpty {
                    service: tree.service().to_owned(),
                    owner,
                    remaining,
                });
            }
        }

        Ok(())
    }

    /// Tear down each of `order` in turn. Units already gone are skipped.
    ///
    /// Every unit in `order` stops being resolvable before the first deinit
    /// runs, so a module loaded from a deinit can't come to depend on one of
    /// them and outlive it.
    pub(crate) fn teardown(&mut self, order: &[UnitId]) -> Vec<UnloadedModule> {
        let doomed: Vec<(UnitId, bool)> = order
            .iter()
            .filter_map(|&id| {
                let unit = self.units.get_mut(&id)?;
                let was_registered = unit.is_registered();
                unit.state = UnitState::Unloading;
                Some((id, was_registered))
            })
            .collect();

        doomed
            .into_iter()
            .filter_map(|(id, was_registered)| self.teardown_unit(id, was_registered))
            .collect()
    }

    fn teardown_unit(&mut self, id: UnitId, was_registered: bool) -> Option<UnloadedModule> {
        let deinit = self.units.get(&id)?.deinit;

        self.graph.remove(id);

        if was_registered {
            if let Some(deinit) = deinit {
                deinit(&mut ModuleContext::new(self, id));
            }
        }

        self.sweep_commands(id);

        let (owned, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.trees)
            .into_iter()
            .partition(|t| t.owner() == Contributor::Unit(id));
        self.trees = kept;

        for tree in owned.iter().filter(|t| !t.is_empty()) {
            tracing::warn!(
                service = tree.service(),
                commands = %tree.iter().map(|c| c.name()).join(", "),
                "Dropping command tree that still holds commands"
            );
        }
        drop(owned);

        // Releases the code object
        let unit = self.units.remove(&id)?;
        let unloaded = UnloadedModule {
            name: unit.name().to_owned(),
            path: unit.path().to_owned(),
        };
        drop(unit);

        if was_registered {
            tracing::info!(name = %unloaded.name, path = ?unloaded.path, "Unloaded module");
            self.notify(ModuleEvent::Unloaded {
                name: unloaded.name.clone(),
                path: unloaded.path.clone(),
            });
        } else {
            tracing::debug!(name = %unloaded.name, path = ?unloaded.path, "Discarded failed module");
        }

        Some(unloaded)
    }
}
