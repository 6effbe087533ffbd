use std::{
    env,
    fs::OpenOptions,
    path::{Path, PathBuf},
};

use once_cell::unsync::OnceCell;
use tracing::{debug, info};

use crate::error::WorkspaceError;

/// Presence-only marker flagging a directory as the workspace root.
pub const ROOT_MARKER: &str = ".colcon_root";

/// Subdirectories whose joint presence flags a workspace root.
pub const ROOT_FOLDERS: [&str; 3] = ["log", "build", "install"];

/// Environment variable holding the default log directory.
pub const LOG_PATH_ENV: &str = "COLCON_LOG_PATH";

/// Whether `path` looks like a workspace root.
pub fn is_root(path: &Path) -> bool {
    if path.join(ROOT_MARKER).is_file() {
        return true;
    }
    ROOT_FOLDERS.iter().all(|folder| path.join(folder).is_dir())
}

/// `start` followed by its ancestors, without the filesystem root unless the
/// walk starts there.
fn candidates(start: &Path) -> impl Iterator<Item = &Path> {
    start
        .ancestors()
        .enumerate()
        .take_while(|(depth, candidate)| *depth == 0 || candidate.parent().is_some())
        .map(|(_, candidate)| candidate)
}

/// Closest directory at or above `start` that is a workspace root.
pub fn find_workspace_root(start: &Path) -> Option<PathBuf> {
    candidates(start)
        .inspect(|candidate| debug!("checking {} for a workspace root", candidate.display()))
        .find(|candidate| is_root(candidate))
        .map(Path::to_path_buf)
}

/// Find the workspace root for `cwd` and prepare it for use.
///
/// Falls back to `cwd` when no ancestor qualifies. The root gets a
/// [`ROOT_MARKER`] so later runs find it directly, and [`LOG_PATH_ENV`]
/// defaults to `<root>/log`.
pub fn locate_workspace_root(cwd: &Path) -> Result<PathBuf, WorkspaceError> {
    let root = find_workspace_root(cwd).unwrap_or_else(|| {
        debug!("no workspace root above {}", cwd.display());
        cwd.to_path_buf()
    });
    if root != cwd {
        println!("Using workspace root {}", root.display());
    }
    mark_root(&root)?;
    default_log_path(&root);
    Ok(root)
}

/// Create the root marker unless it exists. Returns whether it was created.
pub fn mark_root(root: &Path) -> Result<bool, WorkspaceError> {
    let marker = root.join(ROOT_MARKER);
    if marker.is_file() {
        return Ok(false);
    }
    info!("Marking root folder: {}", root.display());
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&marker)
        .map_err(|source| WorkspaceError::Marker {
            path: marker.clone(),
            source,
        })?;
    Ok(true)
}

fn default_log_path(root: &Path) {
    let unset = env::var_os(LOG_PATH_ENV).map_or(true, |value| value.is_empty());
    if unset {
        env::set_var(LOG_PATH_ENV, root.join("log"));
    }
}

/// Process-wide workspace root, resolved on first use and cached afterwards.
///
/// The context is created once by the host and shared with every decorator
/// that needs the root. Without an explicit start directory the walk begins
/// at the working directory current at the time of the first lookup.
#[derive(Debug, Default)]
pub struct WorkspaceContext {
    start: Option<PathBuf>,
    root: OnceCell<PathBuf>,
}

impl WorkspaceContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(start: impl Into<PathBuf>) -> Self {
        Self {
            start: Some(start.into()),
            root: OnceCell::new(),
        }
    }

    pub fn workspace_root(&self) -> Result<&Path, WorkspaceError> {
        self.root
            .get_or_try_init(|| {
                let start = match &self.start {
                    Some(start) => start.clone(),
                    None => env::current_dir().map_err(WorkspaceError::CurrentDir)?,
                };
                locate_workspace_root(&start)
            })
            .map(PathBuf::as_path)
    }

    /// The cached root, if a lookup already happened.
    pub fn resolved(&self) -> Option<&Path> {
        self.root.get().map(PathBuf::as_path)
    }
}
