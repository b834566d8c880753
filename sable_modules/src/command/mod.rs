//! Command trees and dispatch.
//!
//! Each user-facing service (ChanServ, NickServ, ...) has one [`CommandTree`].
//! Modules add commands to trees while they initialise and remove them again
//! on teardown; the dispatcher looks commands up, checks the caller's access,
//! splits the argument text and calls the handler.

use crate::{error::DispatchError, UnitId};

mod dispatch;
mod tokenize;
mod tree;

pub use dispatch::*;
pub use tokenize::{split_command, tokenize};
pub use tree::CommandTree;

/// The pseudo-privilege standing for "logged in to an account"
pub const AUTHENTICATED_PRIVILEGE: &str = "special:authenticated";

/// Whoever issued a command. The runtime only needs to ask it about
/// privileges and send it notices.
pub trait CommandSource {
    fn name(&self) -> &str;

    fn is_authenticated(&self) -> bool;

    fn has_privilege(&self, privilege: &str) -> bool;

    /// Whether the source holds any elevated privilege at all
    fn has_any_privilege(&self) -> bool;

    fn notice(&self, text: &str);
}

/// What a caller needs in order to use a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Anyone,
    Authenticated,
    Privilege(String),
}

impl Access {
    pub fn permits(&self, source: &dyn CommandSource) -> bool {
        match self {
            Access::Anyone => true,
            Access::Authenticated => source.is_authenticated(),
            Access::Privilege(privilege) => source.has_privilege(privilege),
        }
    }

    /// The privilege token named in permission-denied messages
    pub fn token(&self) -> &str {
        match self {
            Access::Anyone => "",
            Access::Authenticated => AUTHENTICATED_PRIVILEGE,
            Access::Privilege(privilege) => privilege,
        }
    }

    /// Check `source` against this requirement. Sources with some other
    /// privilege are told which one they lack; everyone else gets the generic
    /// refusal.
    pub fn check(&self, source: &dyn CommandSource) -> Result<(), DispatchError> {
        if self.permits(source) {
            Ok(())
        } else if source.has_any_privilege() {
            Err(DispatchError::MissingPrivilege(self.token().to_owned()))
        } else {
            Err(DispatchError::NotAuthorized)
        }
    }
}

/// Who added a command, or owns a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Contributor {
    /// The daemon itself; never unloaded
    Host,
    Unit(UnitId),
}

/// Handler type for commands in module-owned runtime trees
pub type CommandHandler = fn(&mut CommandContext<'_>);

/// One dispatchable command.
#[derive(Debug, Clone)]
pub struct Command<H = CommandHandler> {
    name: String,
    access: Access,
    max_args: usize,
    help: String,
    handler: H,
    contributor: Contributor,
}

impl<H> Command<H> {
    /// A command usable by anyone, taking up to `max_args` arguments.
    pub fn new(name: impl Into<String>, max_args: usize, handler: H) -> Self {
        Self {
            name: name.into(),
            access: Access::Anyone,
            max_args,
            help: String::new(),
            handler,
            contributor: Contributor::Host,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn with_privilege(self, privilege: impl Into<String>) -> Self {
        self.with_access(Access::Privilege(privilege.into()))
    }

    pub fn authenticated(self) -> Self {
        self.with_access(Access::Authenticated)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn access(&self) -> &Access {
        &self.access
    }

    pub fn max_args(&self) -> usize {
        self.max_args
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn contributor(&self) -> Contributor {
        self.contributor
    }

    pub(crate) fn set_contributor(&mut self, contributor: Contributor) {
        self.contributor = contributor;
    }
}
