//! Command name to handler mapping
//!
//! Handlers are plain function pointers tagged with the pass they belong to.
//! Callers may register their own commands before a pass; later
//! registrations replace earlier ones with the same name.

use std::collections::HashMap;

use crate::context::{Expansion, Source};
use crate::error::Result;
use crate::template::Node;

/// Handler of a command that may reshape the template
///
/// Receives the parent node, the index of the child whose text or tail held
/// the command, the current source and the expanded argument. Returns `true`
/// when the parent's children changed.
pub type StructuralFn = fn(&mut Expansion<'_>, &mut Node, usize, &Source, &str) -> Result<bool>;

/// Handler of a command that produces replacement text
pub type ValueFn = fn(&mut Expansion<'_>, &Source, &str) -> Result<String>;

#[derive(Clone, Copy)]
pub enum Handler {
    Structural(StructuralFn),
    Value(ValueFn),
}

impl Handler {
    pub fn is_structural(&self) -> bool {
        matches!(self, Handler::Structural(_))
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handler::Structural(_) => f.write_str("Structural"),
            Handler::Value(_) => f.write_str("Value"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, Handler>,
}

impl CommandRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in command
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        crate::commands::register_builtin(&mut registry);
        registry
    }

    pub fn register_structural(&mut self, name: impl Into<String>, handler: StructuralFn) {
        self.handlers.insert(name.into(), Handler::Structural(handler));
    }

    pub fn register_value(&mut self, name: impl Into<String>, handler: ValueFn) {
        self.handlers.insert(name.into(), Handler::Value(handler));
    }

    pub fn get(&self, name: &str) -> Option<Handler> {
        self.handlers.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
