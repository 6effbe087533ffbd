use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

/// Marker written into a base directory naming the tool that owns it.
pub const BUILT_BY_MARKER: &str = ".built_by";

/// Name this tool writes into [`BUILT_BY_MARKER`].
pub const THIS_BUILD_TOOL: &str = "colcon";

/// Owner recorded in `<candidate>/<base>/.built_by`, trailing whitespace
/// trimmed. `None` if the marker is missing or unreadable.
pub fn read_built_by(candidate: &Path, base: &Path) -> Option<String> {
    let marker = candidate.join(base).join(BUILT_BY_MARKER);
    if !marker.is_file() {
        return None;
    }
    match fs::read_to_string(&marker) {
        Ok(content) => Some(content.trim_end().to_string()),
        Err(err) => {
            warn!("ignoring unreadable marker {}: {err}", marker.display());
            None
        }
    }
}

/// Search `candidate` and its ancestors for an existing top-level workspace,
/// i.e. a directory whose `<base>/.built_by` names `this_build_tool`.
pub fn find_top_level_workspace(
    candidate: &Path,
    base: &Path,
    this_build_tool: &str,
) -> Option<PathBuf> {
    for dir in candidate.ancestors() {
        match read_built_by(dir, base) {
            Some(owner) if owner == this_build_tool => return Some(dir.to_path_buf()),
            Some(owner) => debug!(
                "skipping {}: {} was built by '{owner}'",
                dir.display(),
                base.display()
            ),
            None => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(root: &Path, base: &str, content: &str) {
        let dir = root.join(base);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(BUILT_BY_MARKER), content).unwrap();
    }

    #[test]
    fn trailing_newline_still_matches() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = tmp.path();
        tag(ws, "build", "colcon\n");
        assert_eq!(read_built_by(ws, Path::new("build")).as_deref(), Some("colcon"));
        assert_eq!(
            find_top_level_workspace(ws, Path::new("build"), THIS_BUILD_TOOL),
            Some(ws.to_path_buf())
        );
    }

    #[test]
    fn foreign_marker_is_skipped_for_an_outer_match() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = tmp.path();
        let inner = ws.join("src").join("other");
        tag(ws, "build", "colcon");
        tag(&inner, "build", "other-tool");
        let start = inner.join("pkg");
        fs::create_dir_all(&start).unwrap();
        assert_eq!(
            find_top_level_workspace(&start, Path::new("build"), "colcon"),
            Some(ws.to_path_buf())
        );
    }

    #[test]
    fn leading_whitespace_is_significant() {
        let tmp = tempfile::tempdir().unwrap();
        tag(tmp.path(), "build", "  colcon");
        assert_eq!(
            find_top_level_workspace(tmp.path(), Path::new("build"), "colcon"),
            None
        );
    }

    #[test]
    fn custom_base_and_tool() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = tmp.path();
        tag(ws, "out/build", "catkin_tools \n\n");
        let sub = ws.join("src");
        fs::create_dir_all(&sub).unwrap();
        assert_eq!(
            find_top_level_workspace(&sub, Path::new("out/build"), "catkin_tools"),
            Some(ws.to_path_buf())
        );
        assert_eq!(
            find_top_level_workspace(&sub, Path::new("build"), "catkin_tools"),
            None
        );
    }

    #[test]
    fn marker_directory_is_not_a_marker() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("build").join(BUILT_BY_MARKER)).unwrap();
        assert_eq!(read_built_by(tmp.path(), Path::new("build")), None);
    }
}
