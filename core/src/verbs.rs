use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use colcon_top_level_workspace::{locator::LOG_PATH_ENV, search::BUILT_BY_MARKER};
use plugin_api::Namespace;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::{cli::VERB_DEST, plugin_host::PluginManager};

#[derive(Debug, Error)]
pub enum VerbError {
    #[error("missing verb")]
    MissingVerb,
    #[error("unknown verb '{0}'")]
    UnknownVerb(String),
    #[error("the build directory {base} was created by '{owner}', not '{tool}'")]
    ForeignBuildTool {
        base: PathBuf,
        owner: String,
        tool: String,
    },
}

/// What a verb reports on stdout once it is done.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub verb: &'a str,
    pub log_path: PathBuf,
    pub args: &'a Namespace,
}

/// Create `base` and record `tool` as its owner.
///
/// A base already claimed by a different tool is left untouched.
pub fn check_and_mark_build_tool(base: &Path, tool: &str) -> Result<()> {
    fs::create_dir_all(base)
        .with_context(|| format!("failed to create build directory {}", base.display()))?;
    let marker = base.join(BUILT_BY_MARKER);
    match fs::read_to_string(&marker) {
        Ok(content) => {
            let owner = content.trim_end();
            if owner != tool {
                return Err(VerbError::ForeignBuildTool {
                    base: base.to_path_buf(),
                    owner: owner.to_string(),
                    tool: tool.to_string(),
                }
                .into());
            }
            debug!("{} already built by {}", base.display(), tool);
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            info!("marking {} as built by {}", base.display(), tool);
            fs::write(&marker, tool)
                .with_context(|| format!("failed to write {}", marker.display()))?;
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read {}", marker.display()));
        }
    }
    Ok(())
}

/// Log directory: `--log-base`, then `$COLCON_LOG_PATH`, then `./log`.
pub fn log_path(args: &Namespace) -> PathBuf {
    if let Some(path) = args.get_path("log_base") {
        return path.to_path_buf();
    }
    std::env::var_os(LOG_PATH_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("log"))
}

/// Execute the verb selected in `args`, writing its output to `out`.
pub fn run(
    args: &Namespace,
    plugins: &PluginManager,
    tool: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let verb = args.get_text(VERB_DEST).ok_or(VerbError::MissingVerb)?;
    match verb {
        "build" | "test" => {
            let base = args.get_path("build_base").unwrap_or(Path::new("build"));
            check_and_mark_build_tool(base, tool)?;
            if let Some(results) = args.get_path("test_result_base") {
                fs::create_dir_all(results).with_context(|| {
                    format!("failed to create test result directory {}", results.display())
                })?;
            }
        }
        "test-result" => {}
        "extensions" => {
            for (meta, status) in plugins.list() {
                writeln!(
                    out,
                    "{:<20} {:<8} {:<4} {:?}",
                    meta.name, meta.version, meta.priority, status
                )?;
            }
            return Ok(());
        }
        other => return Err(VerbError::UnknownVerb(other.to_string()).into()),
    }

    let report = Report {
        verb,
        log_path: log_path(args),
        args,
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}
