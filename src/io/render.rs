use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("report document is empty")]
    EmptyDocument,

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Turns the assembled markdown document into a file artifact
pub trait Renderer: Send + Sync {
    /// Render `document` and return the path of the artifact
    fn render(&self, document: &str, stem: &str) -> Result<PathBuf, RenderError>;
}

/// Writes the markdown document as `<dir>/<stem>.md`
#[derive(Debug, Clone)]
pub struct MarkdownFileRenderer {
    dir: PathBuf,
}

impl MarkdownFileRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Renderer for MarkdownFileRenderer {
    fn render(&self, document: &str, stem: &str) -> Result<PathBuf, RenderError> {
        if document.trim().is_empty() {
            return Err(RenderError::EmptyDocument);
        }

        std::fs::create_dir_all(&self.dir).map_err(|source| RenderError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.dir.join(format!("{}.md", stem));
        std::fs::write(&path, document).map_err(|source| RenderError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
