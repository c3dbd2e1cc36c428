use std::path::{Component, Path, PathBuf};

use tracing::debug;

use super::Node;
use crate::error::{ConvertError, Result};

/// Loads templates by name from a directory
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read and parse `name` (e.g. `Movie_Grid.xml`, `Settings/Main.xml`)
    ///
    /// Names that would escape the template directory are rejected.
    pub fn load(&self, name: &str) -> Result<Node> {
        let relative = Path::new(name.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(ConvertError::Template(format!("invalid template name '{}'", name)));
        }

        let path = self.dir.join(relative);
        debug!("Loading template {}", path.display());
        let xml = std::fs::read_to_string(&path)
            .map_err(|e| ConvertError::Template(format!("{}: {}", path.display(), e)))?;
        Node::parse(&xml)
    }
}
