//! Extension point shared between the colcon host and its argument parser
//! decorator plugins.

pub mod extension;
pub mod parser;
pub mod suppress;

pub use extension::{
    satisfies_version, ArgumentParserDecoratorExtension, ExtensionMetadata, VersionError,
    DEFAULT_PRIORITY, EXTENSION_POINT_VERSION,
};
pub use parser::{
    compose_converter, Action, Argument, ArgumentParser, Behavior, Converter, GroupId, Namespace,
    ParserError, ParserId, Subparsers, Value,
};
pub use suppress::Suppressed;
