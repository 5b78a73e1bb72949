//! Several loaders merged into one level.

use super::{CommandHandle, CommandLoadError, CommandLoader};

/// Merges loaders; on a name collision the earlier layer wins outright.
pub struct CompositeLoader {
    about: Option<String>,
    layers: Vec<Box<dyn CommandLoader>>,
}

impl CompositeLoader {
    /// Creates an empty composite.
    pub fn new() -> Self {
        Self {
            about: None,
            layers: Vec::new(),
        }
    }

    /// Sets the help text; defaults to the first layer's.
    pub fn with_about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    /// Appends a layer with lower precedence than the existing ones.
    pub fn layer(mut self, loader: Box<dyn CommandLoader>) -> Self {
        self.layers.push(loader);
        self
    }

    fn owner(&self, name: &str) -> Option<&dyn CommandLoader> {
        self.layers
            .iter()
            .map(|l| l.as_ref())
            .find(|l| l.contains(name))
    }
}

impl Default for CompositeLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandLoader for CompositeLoader {
    fn about(&self) -> Option<String> {
        self.about
            .clone()
            .or_else(|| self.layers.first().and_then(|l| l.about()))
    }

    fn list_commands(&self) -> Vec<String> {
        let mut names: Vec<String> = self.layers.iter().flat_map(|l| l.list_commands()).collect();
        names.sort();
        names.dedup();
        names
    }

    fn contains(&self, name: &str) -> bool {
        self.owner(name).is_some()
    }

    fn describe(&self, name: &str) -> Option<String> {
        self.owner(name)?.describe(name)
    }

    fn get_command(&self, name: &str) -> Result<CommandHandle, CommandLoadError> {
        match self.owner(name) {
            Some(layer) => layer.get_command(name),
            None => Err(CommandLoadError::not_found(name)),
        }
    }
}
