//! Host side of the colcon argument parser: a `clap` backed parser, the
//! decorator extension registry, configuration, logging and the verbs.

pub mod cli;
pub mod config;
pub mod logging;
pub mod parser;
pub mod plugin_host;
pub mod verbs;

pub use config::HostConfig;
pub use parser::ClapArgumentParser;
pub use plugin_host::{ExtensionStatus, PluginManager};

use std::rc::Rc;

use anyhow::Result;
use colcon_top_level_workspace::WorkspaceContext;
use plugin_api::ArgumentParser;

/// Build the decorated command line parser with every verb defined.
pub fn command_line(config: &HostConfig) -> Result<(Box<dyn ArgumentParser>, PluginManager)> {
    let context = Rc::new(WorkspaceContext::new());
    let mut plugins = PluginManager::new(config.blocklist.iter().cloned());
    for extension in colcon_top_level_workspace::extensions(context)? {
        plugins.register(extension);
    }
    let mut parser =
        plugins.decorate(Box::new(ClapArgumentParser::new(cli::PROG, Some(cli::ABOUT))));
    cli::define(&mut *parser)?;
    Ok((parser, plugins))
}
