use super::*;

const AVAILABLE_HEADER: &str = "The following commands are available:";
const OTHER_COMMANDS: &str = "\x02Other commands:\x02 ";
/// Accumulated content length after which the "other commands" block wraps
const WRAP_COLUMN: usize = 55;

/// The ordered set of commands offered by one service.
///
/// Names are unique and compared case-insensitively. Insertion order is kept,
/// because it's the order help listings show.
#[derive(Debug)]
pub struct CommandTree<H = CommandHandler> {
    service: String,
    owner: Contributor,
    primary: Vec<String>,
    commands: Vec<Command<H>>,
}

impl<H> CommandTree<H> {
    pub fn new(service: impl Into<String>, owner: Contributor) -> Self {
        Self {
            service: service.into(),
            owner,
            primary: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// The name of the service this tree belongs to, as users address it
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn owner(&self) -> Contributor {
        self.owner
    }

    /// Commands listed individually in short help; everything else is
    /// summarised on one wrapped line.
    pub fn set_primary<S: Into<String>>(&mut self, names: impl IntoIterator<Item = S>) {
        self.primary = names.into_iter().map(Into::into).collect();
    }

    pub fn primary(&self) -> &[String] {
        &self.primary
    }

    /// Add a command. If one of the same name already exists, the existing one
    /// is kept and `false` returned.
    pub fn register(&mut self, command: Command<H>) -> bool {
        if self.find(command.name()).is_some() {
            tracing::warn!(
                service = %self.service,
                command = command.name(),
                "Command already in the list"
            );
            return false;
        }

        self.commands.push(command);
        true
    }

    /// Remove the named command, returning it if it was there.
    pub fn unregister(&mut self, name: &str) -> Option<Command<H>> {
        let Some(position) = self.position(name) else {
            tracing::info!(service = %self.service, command = name, "Command was not registered");
            return None;
        };

        Some(self.commands.remove(position))
    }

    pub fn find(&self, name: &str) -> Option<&Command<H>> {
        self.position(name).map(|i| &self.commands[i])
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.commands
            .iter()
            .position(|c| c.name().eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command<H>> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Commands `source` is allowed to use, in insertion order
    pub fn visible<'a: 's, 's>(
        &'a self,
        source: &'s dyn CommandSource,
    ) -> impl Iterator<Item = &'a Command<H>> + 's {
        self.commands
            .iter()
            .filter(move |c| c.access().permits(source))
    }

    /// `(name, help)` for every command `source` is allowed to use. The
    /// returned strings borrow from the tree only.
    pub fn list_visible(&self, source: &dyn CommandSource) -> Vec<(&str, &str)> {
        self.visible(source).map(|c| (c.name(), c.help())).collect()
    }

    /// Full help listing: one line per visible command.
    pub fn help_lines(&self, source: &dyn CommandSource) -> Vec<String> {
        std::iter::once(AVAILABLE_HEADER.to_owned())
            .chain(self.visible(source).map(help_line))
            .collect()
    }

    /// Short help listing: the primary commands one per line, then everything
    /// else visible to `source` as a comma-separated block, wrapped to keep
    /// notices short.
    pub fn help_short(&self, source: &dyn CommandSource) -> Vec<String> {
        let is_primary = |c: &Command<H>| {
            self.primary
                .iter()
                .any(|name| name.eq_ignore_ascii_case(c.name()))
        };

        let mut lines = vec![AVAILABLE_HEADER.to_owned()];
        lines.extend(self.visible(source).filter(|c| is_primary(*c)).map(help_line));
        lines.push(" ".to_owned());

        let mut buf = OTHER_COMMANDS.to_owned();
        let mut prefix_len = buf.len();
        let visible_len = buf.chars().filter(|c| !c.is_ascii_control()).count();

        for command in self.visible(source).filter(|c| !is_primary(*c)) {
            if buf.len() > prefix_len {
                buf.push_str(", ");
            }
            if buf.len() > WRAP_COLUMN {
                lines.push(std::mem::replace(&mut buf, " ".repeat(visible_len)));
                prefix_len = visible_len;
            }
            buf.push_str(command.name());
        }
        if buf.len() > prefix_len {
            lines.push(buf);
        }

        lines
    }

    /// Remove every command added by `contributor`, returning their names.
    pub(crate) fn remove_contributed_by(&mut self, contributor: Contributor) -> Vec<String> {
        let mut removed = Vec::new();
        self.commands.retain(|c| {
            if c.contributor() == contributor {
                removed.push(c.name().to_owned());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Names of commands whose contributor isn't `inside`
    pub(crate) fn contributed_outside(&self, inside: impl Fn(Contributor) -> bool) -> Vec<String> {
        self.commands
            .iter()
            .filter(|c| !inside(c.contributor()))
            .map(|c| c.name().to_owned())
            .collect()
    }
}

fn help_line<H>(command: &Command<H>) -> String {
    format!("\x02{:<15}\x02 {}", command.name(), command.help())
}
