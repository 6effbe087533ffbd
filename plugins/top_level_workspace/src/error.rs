use std::{io, path::PathBuf};

use plugin_api::{ParserError, VersionError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to determine the current directory: {0}")]
    CurrentDir(#[source] io::Error),
    #[error("failed to mark workspace root {path}: {source}")]
    Marker { path: PathBuf, source: io::Error },
    #[error("failed to change directory to {path}: {source}")]
    ChangeDir { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Version(#[from] VersionError),
}

impl From<WorkspaceError> for ParserError {
    fn from(err: WorkspaceError) -> Self {
        ParserError::Extension(Box::new(err))
    }
}
