//! Top-level workspace support for colcon.
//!
//! Two argument parser decorators are provided. [`resolve`] anchors the base
//! directory options (`--build-base` and friends) at the workspace root found
//! by [`locator`]. [`redirect`] changes into an enclosing workspace whose base
//! directory carries a `.built_by` marker naming this tool before the command
//! line is parsed.

pub mod error;
pub mod extension;
pub mod locator;
pub mod redirect;
pub mod resolve;
pub mod search;

pub use error::WorkspaceError;
pub use extension::{
    extensions, TopLevelWorkspaceArgumentParserDecorator, WorkspaceRootArgumentParserDecorator,
};
pub use locator::{find_workspace_root, locate_workspace_root, WorkspaceContext};
pub use redirect::TopLevelWorkspaceArgumentDecorator;
pub use resolve::{resolve_path, WorkspaceRootArgumentDecorator, ROOT_FOLDER_ARGS};
pub use search::{find_top_level_workspace, THIS_BUILD_TOOL};
