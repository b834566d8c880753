use super::*;

/// Positional arguments for one command invocation.
///
/// Always exactly as long as the command's maximum argument count; positions
/// the caller didn't supply are `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arguments<'a> {
    values: Vec<Option<&'a str>>,
}

impl<'a> Arguments<'a> {
    pub fn parse(text: &'a str, max_args: usize) -> Self {
        let mut values: Vec<_> = tokenize(text, max_args).into_iter().map(Some).collect();
        values.resize(max_args, None);
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<&'a str> {
        self.values.get(index).copied().flatten()
    }

    /// Number of arguments actually supplied
    pub fn count(&self) -> usize {
        self.values.iter().take_while(|v| v.is_some()).count()
    }

    /// Number of positions, supplied or not
    pub fn arity(&self) -> usize {
        self.values.len()
    }

    pub fn as_slice(&self) -> &[Option<&'a str>] {
        &self.values
    }
}

/// What a module command handler gets to work with
pub struct CommandContext<'a> {
    source: &'a dyn CommandSource,
    tree: &'a CommandTree,
    command: &'a str,
    args: Arguments<'a>,
}

impl<'a> CommandContext<'a> {
    pub fn new(
        source: &'a dyn CommandSource,
        tree: &'a CommandTree,
        command: &'a str,
        args: Arguments<'a>,
    ) -> Self {
        Self {
            source,
            tree,
            command,
            args,
        }
    }

    pub fn source(&self) -> &'a dyn CommandSource {
        self.source
    }

    /// The tree the command was dispatched from
    pub fn tree(&self) -> &'a CommandTree {
        self.tree
    }

    pub fn command(&self) -> &'a str {
        self.command
    }

    pub fn args(&self) -> &Arguments<'a> {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&'a str> {
        self.args.get(index)
    }

    pub fn notice(&self, text: impl AsRef<str>) {
        self.source.notice(text.as_ref())
    }
}

/// Find `command` in `tree` and check that `source` may use it.
pub fn lookup<'t, H>(
    tree: &'t CommandTree<H>,
    source: &dyn CommandSource,
    command: &str,
) -> Result<&'t Command<H>, DispatchError> {
    let found = tree
        .find(command)
        .ok_or_else(|| DispatchError::UnknownCommand {
            service: tree.service().to_owned(),
            command: command.to_owned(),
        })?;

    found.access().check(source)?;

    Ok(found)
}

/// Dispatch one command from `tree`.
///
/// On success, `text` is split according to the command's argument count and
/// `invoke` is called with the command and its arguments. On failure the
/// source is sent a notice describing what went wrong and nothing is invoked.
pub fn dispatch<'t, 'a, H, R>(
    tree: &'t CommandTree<H>,
    source: &dyn CommandSource,
    command: &str,
    text: &'a str,
    invoke: impl FnOnce(&'t Command<H>, Arguments<'a>) -> R,
) -> Result<R, DispatchError> {
    match lookup(tree, source, command) {
        Ok(found) => Ok(invoke(found, Arguments::parse(text, found.max_args()))),
        Err(error) => {
            tracing::debug!(
                service = tree.service(),
                source = source.name(),
                command,
                %error,
                "Command refused"
            );
            source.notice(&error.to_string());
            Err(error)
        }
    }
}
