use std::process::ExitCode;

use anyhow::Result;
use colcon_top_level_workspace::THIS_BUILD_TOOL;
use plugin_api::ParserError;
use tracing::debug;

use colcon_host::{command_line, logging, verbs, HostConfig};

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}: error: {err:#}", colcon_host::cli::PROG);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let config = HostConfig::load()?;
    logging::init(&config.log_level);
    debug!(?config, "loaded configuration");

    let (mut parser, plugins) = command_line(&config)?;
    let args: Vec<String> = std::env::args().collect();
    let namespace = match parser.parse_args(&args) {
        Ok(namespace) => namespace,
        Err(err) => {
            // clap already printed help or usage
            if !matches!(err, ParserError::Usage { .. }) {
                eprintln!("{}: error: {err}", colcon_host::cli::PROG);
            }
            return Ok(ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(2)));
        }
    };

    let stdout = std::io::stdout();
    verbs::run(&namespace, &plugins, THIS_BUILD_TOOL, &mut stdout.lock())?;
    Ok(ExitCode::SUCCESS)
}
