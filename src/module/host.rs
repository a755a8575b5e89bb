//! In-memory command host
//!
//! Records which module bound which command. Used by the binary and tests in
//! place of the chat framework's dispatcher.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::module::traits::{CommandHost, ModuleError};

/// A command bound by a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandBinding {
    /// Module that registered the command
    pub owner: String,
    /// Human-readable description
    pub description: String,
}

/// Command name -> binding
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommandTable {
    bindings: BTreeMap<String, CommandBinding>,
}

impl CommandTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Binding for a command
    pub fn get(&self, command: &str) -> Option<&CommandBinding> {
        self.bindings.get(command)
    }

    /// Commands bound by one module, sorted by name
    pub fn commands_of(&self, owner: &str) -> Vec<&str> {
        self.bindings
            .iter()
            .filter(|(_, b)| b.owner == owner)
            .map(|(c, _)| c.as_str())
            .collect()
    }

    /// All bindings, sorted by command name
    pub fn iter(&self) -> impl Iterator<Item = (&String, &CommandBinding)> {
        self.bindings.iter()
    }

    /// Number of bound commands
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether nothing is bound
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl CommandHost for CommandTable {
    fn add_command(
        &mut self,
        owner: &str,
        command: &str,
        description: &str,
    ) -> Result<(), ModuleError> {
        if command.is_empty() {
            return Err(ModuleError::HandlerRegistrationError(format!(
                "{} tried to bind an empty command name",
                owner
            )));
        }

        if let Some(existing) = self.bindings.get(command) {
            return Err(ModuleError::HandlerRegistrationError(format!(
                "command /{} is already bound by {}",
                command, existing.owner
            )));
        }

        debug!("Bound command /{} to {}", command, owner);
        self.bindings.insert(
            command.to_string(),
            CommandBinding {
                owner: owner.to_string(),
                description: description.to_string(),
            },
        );
        Ok(())
    }
}
