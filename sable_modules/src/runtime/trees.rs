use super::*;
use crate::command::{self, Command, CommandContext, CommandSource};

impl ModuleRuntime {
    /// Create a command tree owned by the host. Host trees outlive every module.
    pub fn create_tree(&mut self, service: &str) -> Result<(), TreeError> {
        self.create_tree_as(Contributor::Host, service)
    }

    pub fn tree(&self, service: &str) -> Option<&CommandTree> {
        self.trees
            .iter()
            .find(|t| t.service().eq_ignore_ascii_case(service))
    }

    pub fn tree_mut(&mut self, service: &str) -> Option<&mut CommandTree> {
        self.trees
            .iter_mut()
            .find(|t| t.service().eq_ignore_ascii_case(service))
    }

    pub fn trees(&self) -> impl Iterator<Item = &CommandTree> {
        self.trees.iter()
    }

    /// Add a host command to the named tree.
    pub fn register(&mut self, service: &str, command: Command) -> Result<bool, TreeError> {
        self.register_as(Contributor::Host, service, command)
    }

    pub fn unregister(&mut self, service: &str, name: &str) -> Option<Command> {
        self.unregister_as(Contributor::Host, service, name)
    }

    /// Run one command from the named service's tree on behalf of `source`.
    ///
    /// Failures are reported to the source as notices as well as returned.
    pub fn dispatch(
        &self,
        service: &str,
        source: &dyn CommandSource,
        command: &str,
        text: &str,
    ) -> Result<(), DispatchError> {
        let Some(tree) = self.tree(service) else {
            let error = DispatchError::NoSuchService(service.to_owned());
            source.notice(&error.to_string());
            return Err(error);
        };

        command::dispatch(tree, source, command, text, |found, args| {
            let handler = *found.handler();
            handler(&mut CommandContext::new(source, tree, found.name(), args));
        })
    }

    pub(crate) fn create_tree_as(&mut self, owner: Contributor, service: &str) -> Result<(), TreeError> {
        if self.tree(service).is_some() {
            return Err(TreeError::AlreadyExists(service.to_owned()));
        }

        tracing::debug!(service, ?owner, "Created command tree");
        self.trees.push(CommandTree::new(service, owner));
        Ok(())
    }

    /// If the named tree belongs to some other module, make `from` depend on it.
    pub(crate) fn link_tree_owner(&mut self, from: UnitId, service: &str) -> Result<(), TreeError> {
        let owner = self
            .tree(service)
            .ok_or_else(|| TreeError::NoSuchTree(service.to_owned()))?
            .owner();

        let Contributor::Unit(owner) = owner else {
            return Ok(());
        };
        if owner == from {
            return Ok(());
        }

        let live = self
            .units
            .get(&owner)
            .map(|u| matches!(u.state, UnitState::Embryonic | UnitState::Standard));

        match live {
            Some(true) => {
                self.link(from, owner, service);
                Ok(())
            }
            Some(false) => {
                let name = self.units[&owner].name().to_owned();
                Err(ResolveError::UnitNotLoaded(name).into())
            }
            None => Err(ResolveError::UnitNotLoaded(owner.to_string()).into()),
        }
    }

    pub(crate) fn register_as(
        &mut self,
        contributor: Contributor,
        service: &str,
        mut command: Command,
    ) -> Result<bool, TreeError> {
        if let Contributor::Unit(id) = contributor {
            self.link_tree_owner(id, service)?;
        }

        let tree = self
            .tree_mut(service)
            .ok_or_else(|| TreeError::NoSuchTree(service.to_owned()))?;

        command.set_contributor(contributor);
        Ok(tree.register(command))
    }

    pub(crate) fn unregister_as(
        &mut self,
        contributor: Contributor,
        service: &str,
        name: &str,
    ) -> Option<Command> {
        let Some(tree) = self.tree_mut(service) else {
            tracing::info!(service, command = name, "No such command tree");
            return None;
        };

        if let (Contributor::Unit(_), Some(existing)) = (contributor, tree.find(name)) {
            if existing.contributor() != contributor {
                tracing::warn!(
                    service,
                    command = name,
                    ?contributor,
                    owner = ?existing.contributor(),
                    "Refusing to remove a command registered by someone else"
                );
                return None;
            }
        }

        tree.unregister(name)
    }

    /// Remove every command `unit` still has registered, in any tree.
    pub(crate) fn sweep_commands(&mut self, unit: UnitId) {
        let contributor = Contributor::Unit(unit);
        for tree in &mut self.trees {
            let removed = tree.remove_contributed_by(contributor);
            if !removed.is_empty() {
                tracing::warn!(
                    service = tree.service(),
                    %unit,
                    commands = %removed.join(", "),
                    "Module left commands registered at unload"
                );
            }
        }
    }
}
