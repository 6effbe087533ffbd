use std::{
    path::{Component, Path, PathBuf},
    rc::Rc,
};

use plugin_api::{
    compose_converter, Argument, ArgumentParser, Behavior, GroupId, Namespace, ParserError,
    ParserId, Subparsers,
};
use tracing::debug;

use crate::locator::WorkspaceContext;

/// Options whose values are resolved against the workspace root.
pub const ROOT_FOLDER_ARGS: [&str; 4] = [
    "--build-base",
    "--install-base",
    "--log-base",
    "--test-result-base",
];

/// `abspath(root / value)`; an absent value stays absent.
pub fn resolve_path(root: &Path, value: Option<&str>) -> Option<PathBuf> {
    value.map(|value| normalize_path(&root.join(value)))
}

/// Lexically drop `.` and fold `..` without touching the filesystem.
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(..) | Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

/// Decorator resolving the base directory options against the workspace root.
///
/// The root is looked up when a value is first converted, so the walk starts
/// from the working directory in effect during the strict parse.
pub struct WorkspaceRootArgumentDecorator {
    inner: Box<dyn ArgumentParser>,
    context: Rc<WorkspaceContext>,
}

impl WorkspaceRootArgumentDecorator {
    pub fn new(inner: Box<dyn ArgumentParser>, context: Rc<WorkspaceContext>) -> Self {
        Self { inner, context }
    }

    fn add_root_resolver(&self, argument: &mut Argument) {
        let context = Rc::clone(&self.context);
        argument.converter = Some(compose_converter(argument.converter.take(), move |raw| {
            let root = context.workspace_root().map_err(|err| err.to_string())?;
            Ok(resolve_path(root, Some(raw)).unwrap_or_default())
        }));
    }
}

impl ArgumentParser for WorkspaceRootArgumentDecorator {
    fn add_argument(&mut self, parser: ParserId, mut argument: Argument) -> Result<(), ParserError> {
        if ROOT_FOLDER_ARGS.iter().any(|flag| argument.has_flag(flag)) {
            debug!("resolving {:?} against the workspace root", argument.flags);
            self.add_root_resolver(&mut argument);
        }
        self.inner.add_argument(parser, argument)
    }

    fn add_subparsers(
        &mut self,
        parser: ParserId,
        subparsers: Subparsers,
    ) -> Result<GroupId, ParserError> {
        self.inner.add_subparsers(parser, subparsers)
    }

    fn add_parser(
        &mut self,
        group: GroupId,
        name: &str,
        help: Option<&str>,
    ) -> Result<ParserId, ParserError> {
        self.inner.add_parser(group, name, help)
    }

    fn behavior(&self, parser: ParserId) -> Result<Behavior, ParserError> {
        self.inner.behavior(parser)
    }

    fn set_behavior(&mut self, parser: ParserId, behavior: Behavior) -> Result<(), ParserError> {
        self.inner.set_behavior(parser, behavior)
    }

    fn parse_known_args(&mut self, args: &[String]) -> Result<Namespace, ParserError> {
        self.inner.parse_known_args(args)
    }

    /// Locate the root once parsing succeeded, even when no base option was
    /// converted, so the root marker and the log path default are in place.
    fn parse_args(&mut self, args: &[String]) -> Result<Namespace, ParserError> {
        let namespace = self.inner.parse_args(args)?;
        self.context.workspace_root()?;
        Ok(namespace)
    }
}
