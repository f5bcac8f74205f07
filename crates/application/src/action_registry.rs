//! Name-keyed catalog of available destination plugins.

use std::collections::HashMap;
use std::sync::Arc;

use actionhub_core::{AppError, AppResult};
use actionhub_domain::ActionDefinition;

use crate::action_ports::ActionPlugin;

/// Catalog populated once at startup and read concurrently afterwards.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn ActionPlugin>>,
}

impl ActionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin under its definition name.
    ///
    /// Registering the same name twice keeps the later plugin and returns the
    /// one it replaced.
    pub fn register(&mut self, plugin: Arc<dyn ActionPlugin>) -> Option<Arc<dyn ActionPlugin>> {
        let name = plugin.definition().name().to_owned();
        self.actions.insert(name, plugin)
    }

    /// Returns the plugin registered under `name`.
    pub fn lookup(&self, name: &str) -> AppResult<Arc<dyn ActionPlugin>> {
        self.actions
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("action '{name}' does not exist")))
    }

    /// Returns whether a plugin is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Number of registered plugins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns whether no plugin is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Lists all definitions ordered by name.
    #[must_use]
    pub fn list(&self) -> Vec<ActionDefinition> {
        let mut definitions: Vec<ActionDefinition> = self
            .actions
            .values()
            .map(|plugin| plugin.definition().clone())
            .collect();
        definitions.sort_by(|left, right| left.name().cmp(right.name()));
        definitions
    }
}
