use plugin_api::{Action, Argument, ArgumentParser, GroupId, ParserError, ParserId, Subparsers};

/// Program name shown in usage output.
pub const PROG: &str = "colcon";

pub const ABOUT: &str = "Build, test and inspect packages in a colcon workspace";

/// Destination receiving the selected verb.
pub const VERB_DEST: &str = "verb_name";

/// Handles to the parsers making up the command line.
#[derive(Debug, Clone, Copy)]
pub struct Verbs {
    pub group: GroupId,
    pub build: ParserId,
    pub test: ParserId,
    pub test_result: ParserId,
    pub extensions: ParserId,
}

/// Define the root options and every verb on `parser`.
pub fn define(parser: &mut dyn ArgumentParser) -> Result<Verbs, ParserError> {
    parser.add_argument(
        ParserId::ROOT,
        Argument::option(["--log-base"])
            .help("The base path for all log directories (default: $COLCON_LOG_PATH or ./log)"),
    )?;

    let group = parser.add_subparsers(
        ParserId::ROOT,
        Subparsers::new(VERB_DEST).title("colcon verbs").required(true),
    )?;

    let build = parser.add_parser(group, "build", Some("Build a set of packages"))?;
    add_build_base(parser, build)?;
    add_install_base(parser, build)?;
    parser.add_argument(
        build,
        Argument::option(["--merge-install"])
            .action(Action::StoreTrue)
            .help("Merge all install prefixes into a single location"),
    )?;
    add_packages_select(parser, build)?;

    let test = parser.add_parser(group, "test", Some("Test a set of packages"))?;
    add_build_base(parser, test)?;
    add_install_base(parser, test)?;
    parser.add_argument(
        test,
        Argument::option(["--test-result-base"])
            .help("The base path for all test results (default: --build-base)"),
    )?;
    add_packages_select(parser, test)?;

    let test_result = parser.add_parser(group, "test-result", Some("Show the test results"))?;
    parser.add_argument(
        test_result,
        Argument::option(["--test-result-base"])
            .default_value("build")
            .help("The base path for all test results"),
    )?;
    parser.add_argument(
        test_result,
        Argument::option(["--all"])
            .action(Action::StoreTrue)
            .help("Show all test result files including the ones without errors"),
    )?;

    let extensions = parser.add_parser(
        group,
        "extensions",
        Some("List the argument parser decorator extensions"),
    )?;

    Ok(Verbs {
        group,
        build,
        test,
        test_result,
        extensions,
    })
}

fn add_build_base(parser: &mut dyn ArgumentParser, verb: ParserId) -> Result<(), ParserError> {
    parser.add_argument(
        verb,
        Argument::option(["--build-base"])
            .default_value("build")
            .help("The base path for all build directories"),
    )
}

fn add_install_base(parser: &mut dyn ArgumentParser, verb: ParserId) -> Result<(), ParserError> {
    parser.add_argument(
        verb,
        Argument::option(["--install-base"])
            .default_value("install")
            .help("The base path for all install prefixes"),
    )
}

fn add_packages_select(parser: &mut dyn ArgumentParser, verb: ParserId) -> Result<(), ParserError> {
    parser.add_argument(
        verb,
        Argument::option(["--packages-select"])
            .action(Action::Append)
            .help("Only process a subset of packages"),
    )
}
