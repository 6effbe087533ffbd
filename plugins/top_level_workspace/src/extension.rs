use std::rc::Rc;

use plugin_api::{
    satisfies_version, ArgumentParser, ArgumentParserDecoratorExtension, EXTENSION_POINT_VERSION,
};

use crate::{
    error::WorkspaceError, locator::WorkspaceContext, redirect::TopLevelWorkspaceArgumentDecorator,
    resolve::WorkspaceRootArgumentDecorator, search::THIS_BUILD_TOOL,
};

/// Below the default so these decorators wrap the other extensions.
pub const PRIORITY: i32 = 75;

const SUPPORTED_VERSIONS: &str = "^1.0";

/// Resolves base directory options against the workspace root.
pub struct WorkspaceRootArgumentParserDecorator {
    context: Rc<WorkspaceContext>,
}

impl WorkspaceRootArgumentParserDecorator {
    pub const NAME: &'static str = "workspace_root";

    pub fn new(context: Rc<WorkspaceContext>) -> Result<Self, WorkspaceError> {
        satisfies_version(EXTENSION_POINT_VERSION, SUPPORTED_VERSIONS)?;
        Ok(Self { context })
    }
}

impl ArgumentParserDecoratorExtension for WorkspaceRootArgumentParserDecorator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn decorate_argument_parser(&self, parser: Box<dyn ArgumentParser>) -> Box<dyn ArgumentParser> {
        Box::new(WorkspaceRootArgumentDecorator::new(
            parser,
            Rc::clone(&self.context),
        ))
    }
}

/// Locates and uses a top-level workspace from a subdirectory.
pub struct TopLevelWorkspaceArgumentParserDecorator {
    this_build_tool: String,
}

impl TopLevelWorkspaceArgumentParserDecorator {
    pub const NAME: &'static str = "top_level_workspace";

    pub fn new() -> Result<Self, WorkspaceError> {
        Self::with_build_tool(THIS_BUILD_TOOL)
    }

    pub fn with_build_tool(this_build_tool: &str) -> Result<Self, WorkspaceError> {
        satisfies_version(EXTENSION_POINT_VERSION, SUPPORTED_VERSIONS)?;
        Ok(Self {
            this_build_tool: this_build_tool.to_string(),
        })
    }
}

impl ArgumentParserDecoratorExtension for TopLevelWorkspaceArgumentParserDecorator {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn priority(&self) -> i32 {
        PRIORITY
    }

    fn decorate_argument_parser(&self, parser: Box<dyn ArgumentParser>) -> Box<dyn ArgumentParser> {
        Box::new(TopLevelWorkspaceArgumentDecorator::with_build_tool(
            parser,
            &self.this_build_tool,
        ))
    }
}

/// Every extension this plugin provides, sharing one workspace context.
pub fn extensions(
    context: Rc<WorkspaceContext>,
) -> Result<Vec<Box<dyn ArgumentParserDecoratorExtension>>, WorkspaceError> {
    Ok(vec![
        Box::new(WorkspaceRootArgumentParserDecorator::new(context)?),
        Box::new(TopLevelWorkspaceArgumentParserDecorator::new()?),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provides_both_decorators_below_default_priority() {
        let exts = extensions(Rc::new(WorkspaceContext::new())).unwrap();
        let names: Vec<_> = exts.iter().map(|e| e.name().to_string()).collect();
        assert_eq!(names, vec!["workspace_root", "top_level_workspace"]);
        assert!(exts
            .iter()
            .all(|e| e.priority() < plugin_api::DEFAULT_PRIORITY));
        assert_eq!(exts[1].metadata().version, EXTENSION_POINT_VERSION);
    }

    #[test]
    fn construction_does_not_resolve_the_root() {
        let context = Rc::new(WorkspaceContext::new());
        WorkspaceRootArgumentParserDecorator::new(Rc::clone(&context)).unwrap();
        assert!(context.resolved().is_none());
    }
}
