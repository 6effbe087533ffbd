use std::{
    env,
    path::{Path, PathBuf},
};

use plugin_api::{
    Argument, ArgumentParser, Behavior, GroupId, Namespace, ParserError, ParserId, Subparsers,
    Suppressed,
};
use tracing::debug;

use crate::{
    error::WorkspaceError,
    search::{find_top_level_workspace, THIS_BUILD_TOOL},
};

/// Destinations consulted, in order, for the base directory.
pub const BASE_DESTINATIONS: [&str; 2] = ["build_base", "test_result_base"];

/// Base directory assumed when no base option was parsed.
pub const DEFAULT_BASE: &str = "build";

/// Decorator changing into an enclosing top-level workspace before parsing.
///
/// A relaxed first pass over the command line finds the requested base
/// directory; if an ancestor of the working directory holds that base with a
/// `.built_by` marker naming this tool, the process moves there before the
/// strict parse runs.
pub struct TopLevelWorkspaceArgumentDecorator {
    inner: Box<dyn ArgumentParser>,
    parsers: Vec<ParserId>,
    groups: Vec<GroupId>,
    this_build_tool: String,
}

impl TopLevelWorkspaceArgumentDecorator {
    pub fn new(inner: Box<dyn ArgumentParser>) -> Self {
        Self::with_build_tool(inner, THIS_BUILD_TOOL)
    }

    pub fn with_build_tool(inner: Box<dyn ArgumentParser>, this_build_tool: &str) -> Self {
        Self {
            inner,
            parsers: Vec::new(),
            groups: Vec::new(),
            this_build_tool: this_build_tool.to_string(),
        }
    }

    /// The root parser followed by every sub-parser registered so far.
    pub fn parsers(&self) -> Vec<ParserId> {
        let mut parsers = Vec::with_capacity(self.parsers.len() + 1);
        parsers.push(ParserId::ROOT);
        parsers.extend(self.parsers.iter().copied());
        parsers
    }

    pub fn groups(&self) -> &[GroupId] {
        &self.groups
    }

    /// Parse with usage output, conversions and required checks suppressed.
    /// Errors are swallowed; the strict parse reports them.
    fn relaxed_parse(&mut self, args: &[String]) -> Namespace {
        let parsers = self.parsers();
        parse_suppressed(self.inner.as_mut(), &parsers, args).unwrap_or_else(|err| {
            debug!("relaxed pre-parse failed: {err}");
            Namespace::new()
        })
    }

    fn change_to_workspace(&self, base: &Path) -> Result<(), WorkspaceError> {
        let cwd = env::current_dir().map_err(WorkspaceError::CurrentDir)?;
        let Some(workspace) = find_top_level_workspace(&cwd, base, &self.this_build_tool) else {
            debug!("no top-level workspace with base '{}'", base.display());
            return Ok(());
        };
        if workspace != cwd {
            println!("Using top-level workspace at '{}'", workspace.display());
            env::set_current_dir(&workspace).map_err(|source| WorkspaceError::ChangeDir {
                path: workspace.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

fn parse_suppressed(
    parser: &mut dyn ArgumentParser,
    parsers: &[ParserId],
    args: &[String],
) -> Result<Namespace, ParserError> {
    let mut usage = Suppressed::usage_output(parser, parsers)?;
    let mut types = Suppressed::type_conversions(&mut *usage, parsers)?;
    let mut required = Suppressed::required_actions(&mut *types, parsers)?;
    required.parse_known_args(args)
}

/// Base directory requested on a relaxed parse result.
pub fn requested_base(known: &Namespace) -> PathBuf {
    BASE_DESTINATIONS
        .iter()
        .find_map(|dest| known.get_path(dest))
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BASE))
}

impl ArgumentParser for TopLevelWorkspaceArgumentDecorator {
    fn add_argument(&mut self, parser: ParserId, argument: Argument) -> Result<(), ParserError> {
        self.inner.add_argument(parser, argument)
    }

    fn add_subparsers(
        &mut self,
        parser: ParserId,
        subparsers: Subparsers,
    ) -> Result<GroupId, ParserError> {
        let group = self.inner.add_subparsers(parser, subparsers)?;
        self.groups.push(group);
        Ok(group)
    }

    fn add_parser(
        &mut self,
        group: GroupId,
        name: &str,
        help: Option<&str>,
    ) -> Result<ParserId, ParserError> {
        let parser = self.inner.add_parser(group, name, help)?;
        self.parsers.push(parser);
        Ok(parser)
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

    fn parse_args(&mut self, args: &[String]) -> Result<Namespace, ParserError> {
        let known = self.relaxed_parse(args);
        let base = requested_base(&known);
        if base.is_relative() {
            self.change_to_workspace(&base)?;
        }
        self.inner.parse_args(args)
    }
}
