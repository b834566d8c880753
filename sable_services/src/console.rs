use crate::config::OperatorConfig;
use sable_modules::command::CommandSource;
use std::cell::RefCell;

/// The operator at the daemon's console.
///
/// Notices sent to the operator are queued until the console loop collects
/// them with [`take_output`](Self::take_output).
#[derive(Debug)]
pub struct ConsoleOperator {
    name: String,
    privileges: Vec<String>,
    output: RefCell<Vec<String>>,
}

impl ConsoleOperator {
    pub fn new(config: &OperatorConfig) -> Self {
        Self {
            name: config.name.clone(),
            privileges: config.privileges.clone(),
            output: RefCell::new(Vec::new()),
        }
    }

    /// Notices queued since the last call, formatting codes removed
    pub fn take_output(&self) -> Vec<String> {
        self.output
            .take()
            .into_iter()
            .map(|line| line.replace('\x02', ""))
            .collect()
    }
}

impl CommandSource for ConsoleOperator {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_authenticated(&self) -> bool {
        true
    }

    fn has_privilege(&self, privilege: &str) -> bool {
        self.privileges.iter().any(|p| p == privilege)
    }

    fn has_any_privilege(&self) -> bool {
        !self.privileges.is_empty()
    }

    fn notice(&self, text: &str) {
        self.output.borrow_mut().push(text.to_owned());
    }
}
