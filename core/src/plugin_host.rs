use std::collections::HashSet;

use plugin_api::{ArgumentParser, ArgumentParserDecoratorExtension, ExtensionMetadata};
use tracing::{debug, info};

/// Status of a decorator extension managed by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionStatus {
    Enabled,
    Blocked,
}

/// Manager holding the argument parser decorator extensions.
pub struct PluginManager {
    extensions: Vec<Box<dyn ArgumentParserDecoratorExtension>>,
    blocklist: HashSet<String>,
}

impl PluginManager {
    pub fn new<I, S>(blocklist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: Vec::new(),
            blocklist: blocklist.into_iter().map(Into::into).collect(),
        }
    }

    pub fn register(&mut self, extension: Box<dyn ArgumentParserDecoratorExtension>) {
        debug!(
            "registered extension {} (priority {})",
            extension.name(),
            extension.priority()
        );
        self.extensions.push(extension);
    }

    fn status(&self, extension: &dyn ArgumentParserDecoratorExtension) -> ExtensionStatus {
        if self.blocklist.contains(extension.name()) {
            ExtensionStatus::Blocked
        } else {
            ExtensionStatus::Enabled
        }
    }

    /// Extensions by descending priority, ties broken by name.
    fn ordered(&self) -> Vec<&dyn ArgumentParserDecoratorExtension> {
        let mut ordered: Vec<&dyn ArgumentParserDecoratorExtension> =
            self.extensions.iter().map(|ext| &**ext).collect();
        ordered.sort_by(|a, b| {
            b.priority()
                .cmp(&a.priority())
                .then_with(|| a.name().cmp(b.name()))
        });
        ordered
    }

    /// List current extensions in application order with their status.
    pub fn list(&self) -> Vec<(ExtensionMetadata, ExtensionStatus)> {
        self.ordered()
            .into_iter()
            .map(|ext| (ext.metadata(), self.status(ext)))
            .collect()
    }

    /// Wrap `parser` with every enabled extension. The last one applied is
    /// the outermost wrapper.
    pub fn decorate(&self, parser: Box<dyn ArgumentParser>) -> Box<dyn ArgumentParser> {
        self.ordered()
            .into_iter()
            .fold(parser, |parser, ext| match self.status(ext) {
                ExtensionStatus::Enabled => {
                    debug!("decorating argument parser with {}", ext.name());
                    ext.decorate_argument_parser(parser)
                }
                ExtensionStatus::Blocked => {
                    info!("skipping blocklisted extension {}", ext.name());
                    parser
                }
            })
    }
}
