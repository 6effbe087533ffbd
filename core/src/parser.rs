use clap::{
    error::{ContextKind, ContextValue, ErrorKind},
    Arg, ArgAction, ArgMatches, Command,
};
use plugin_api::{
    Action, Argument, ArgumentParser, Behavior, GroupId, Namespace, ParserError, ParserId,
    Subparsers, Value,
};
use tracing::trace;

#[derive(Debug)]
struct ParserNode {
    name: String,
    about: Option<String>,
    arguments: Vec<Argument>,
    group: Option<GroupId>,
    behavior: Behavior,
}

impl ParserNode {
    fn new(name: &str, about: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            about: about.map(str::to_string),
            arguments: Vec::new(),
            group: None,
            behavior: Behavior::default(),
        }
    }
}

#[derive(Debug)]
struct GroupNode {
    spec: Subparsers,
    parsers: Vec<ParserId>,
}

/// Host argument parser backed by the `clap` builder API.
///
/// Definitions are recorded as they are added and turned into a fresh
/// `clap::Command` for every parse, so behavior changes made between parses
/// (for instance by a [`plugin_api::Suppressed`] guard) take effect.
#[derive(Debug)]
pub struct ClapArgumentParser {
    parsers: Vec<ParserNode>,
    groups: Vec<GroupNode>,
}

impl ClapArgumentParser {
    pub fn new(prog: &str, about: Option<&str>) -> Self {
        Self {
            parsers: vec![ParserNode::new(prog, about)],
            groups: Vec::new(),
        }
    }

    fn node(&self, id: ParserId) -> Result<&ParserNode, ParserError> {
        self.parsers.get(id.0).ok_or(ParserError::UnknownParser(id))
    }

    fn node_mut(&mut self, id: ParserId) -> Result<&mut ParserNode, ParserError> {
        self.parsers.get_mut(id.0).ok_or(ParserError::UnknownParser(id))
    }

    fn command(&self, id: ParserId, relaxed: bool) -> Command {
        let node = &self.parsers[id.0];
        let mut cmd = Command::new(node.name.clone());
        if let Some(about) = &node.about {
            cmd = cmd.about(about.clone());
        }
        if !node.behavior.usage_output {
            cmd = cmd
                .disable_help_flag(true)
                .disable_help_subcommand(true)
                .disable_version_flag(true);
        }
        if relaxed {
            cmd = cmd.ignore_errors(true);
        }
        for argument in &node.arguments {
            cmd = cmd.arg(clap_arg(argument, node.behavior));
        }
        if let Some(group) = node.group {
            let group = &self.groups[group.0];
            cmd = cmd.subcommand_required(group.spec.required && node.behavior.required_actions);
            if let Some(title) = &group.spec.title {
                cmd = cmd.subcommand_help_heading(title.clone());
            }
            for sub in &group.parsers {
                cmd = cmd.subcommand(self.command(*sub, relaxed));
            }
        }
        cmd
    }

    fn parse(&self, args: &[String], relaxed: bool) -> Result<Namespace, ParserError> {
        let matches = if relaxed {
            self.relaxed_matches(args)?
        } else {
            self.command(ParserId::ROOT, false)
                .try_get_matches_from(args)
                .map_err(|err| self.usage_error(err))?
        };
        let mut namespace = Namespace::new();
        self.collect(ParserId::ROOT, &matches, &mut namespace)?;
        trace!(?namespace, relaxed, "parsed command line");
        Ok(namespace)
    }

    /// Drop unknown arguments one at a time until the rest parses.
    ///
    /// `ignore_errors` alone stops at the first unknown argument and loses
    /// everything after it, so it only handles what is left once no unknown
    /// argument can be singled out.
    fn relaxed_matches(&self, args: &[String]) -> Result<ArgMatches, ParserError> {
        let mut args = args.to_vec();
        loop {
            let err = match self.command(ParserId::ROOT, false).try_get_matches_from(&args) {
                Ok(matches) => return Ok(matches),
                Err(err) => err,
            };
            match unknown_position(&err, &args) {
                Some(index) => {
                    let skipped = args.remove(index);
                    trace!(%skipped, "skipping unknown argument");
                }
                None => break,
            }
        }
        self.command(ParserId::ROOT, true)
            .try_get_matches_from(&args)
            .map_err(|err| self.usage_error(err))
    }

    fn usage_error(&self, err: clap::Error) -> ParserError {
        if self.parsers[0].behavior.usage_output {
            let _ = err.print();
        }
        ParserError::Usage {
            message: err.render().to_string().trim_end().to_string(),
            exit_code: err.exit_code(),
        }
    }

    fn collect(
        &self,
        id: ParserId,
        matches: &ArgMatches,
        namespace: &mut Namespace,
    ) -> Result<(), ParserError> {
        let node = &self.parsers[id.0];
        for argument in &node.arguments {
            let dest = destination(argument)?;
            let value = match argument.action {
                Action::StoreTrue => Some(Value::Bool(matches.get_flag(&dest))),
                Action::Store => match matches.get_one::<String>(&dest) {
                    Some(raw) => Some(convert(argument, &dest, raw, node.behavior)?),
                    None => self.default_value(argument, &dest, node.behavior)?,
                },
                Action::Append => match matches.get_many::<String>(&dest) {
                    Some(raws) => Some(Value::List(
                        raws.map(|raw| convert(argument, &dest, raw, node.behavior))
                            .collect::<Result<_, _>>()?,
                    )),
                    None => self
                        .default_value(argument, &dest, node.behavior)?
                        .map(|value| Value::List(vec![value])),
                },
            };
            namespace.insert(dest, value);
        }
        if let Some(group) = node.group {
            let group = &self.groups[group.0];
            match matches.subcommand() {
                Some((name, sub_matches)) => {
                    namespace.insert(group.spec.dest.clone(), Some(Value::Text(name.to_string())));
                    let sub = group
                        .parsers
                        .iter()
                        .copied()
                        .find(|p| self.parsers[p.0].name == name);
                    if let Some(sub) = sub {
                        self.collect(sub, sub_matches, namespace)?;
                    }
                }
                None => namespace.insert(group.spec.dest.clone(), None),
            }
        }
        Ok(())
    }

    /// Defaults go through the converter like supplied values do.
    fn default_value(
        &self,
        argument: &Argument,
        dest: &str,
        behavior: Behavior,
    ) -> Result<Option<Value>, ParserError> {
        argument
            .default
            .as_deref()
            .map(|raw| convert(argument, dest, raw, behavior))
            .transpose()
    }
}

/// Index in `args` of the argument clap rejected as unknown.
fn unknown_position(err: &clap::Error, args: &[String]) -> Option<usize> {
    if err.kind() != ErrorKind::UnknownArgument {
        return None;
    }
    let Some(ContextValue::String(token)) = err.get(ContextKind::InvalidArg) else {
        return None;
    };
    args.iter()
        .skip(1)
        .position(|arg| {
            arg == token
                || arg
                    .strip_prefix(token.as_str())
                    .is_some_and(|value| value.starts_with('='))
        })
        .map(|index| index + 1)
}

fn destination(argument: &Argument) -> Result<String, ParserError> {
    argument
        .destination()
        .ok_or_else(|| ParserError::InvalidArgument(format!("{argument:?}")))
}

fn convert(
    argument: &Argument,
    dest: &str,
    raw: &str,
    behavior: Behavior,
) -> Result<Value, ParserError> {
    match &argument.converter {
        Some(converter) if behavior.type_conversions => {
            converter(raw).map_err(|message| ParserError::Conversion {
                dest: dest.to_string(),
                message,
            })
        }
        _ => Ok(Value::Text(raw.to_string())),
    }
}

fn clap_arg(argument: &Argument, behavior: Behavior) -> Arg {
    // validated when the argument was added
    let dest = argument.destination().unwrap_or_default();
    let mut arg = Arg::new(dest).required(argument.required && behavior.required_actions);
    let mut has_long = false;
    for flag in &argument.flags {
        if let Some(long) = flag.strip_prefix("--") {
            arg = if has_long {
                arg.visible_alias(long.to_string())
            } else {
                arg.long(long.to_string())
            };
            has_long = true;
        } else if let Some(short) = flag.strip_prefix('-').and_then(|s| s.chars().next()) {
            arg = arg.short(short);
        }
    }
    arg = match argument.action {
        Action::Store => arg.action(ArgAction::Set),
        Action::StoreTrue => arg.action(ArgAction::SetTrue),
        Action::Append => arg.action(ArgAction::Append),
    };
    if argument.action != Action::StoreTrue {
        arg = arg.value_parser(clap::value_parser!(String));
        if argument.flags.is_empty() && argument.action == Action::Append {
            arg = arg.num_args(1..);
        }
    }
    if let Some(help) = &argument.help {
        arg = arg.help(help.clone());
    }
    arg
}

fn validate(node: &ParserNode, argument: &Argument) -> Result<(), ParserError> {
    let dest = destination(argument)?;
    if argument.flags.is_empty() && argument.name.is_none() {
        return Err(ParserError::InvalidArgument(dest));
    }
    if dest == "help" {
        return Err(ParserError::Conflict(dest));
    }
    for flag in &argument.flags {
        let valid =
            flag.len() > 1 && flag.starts_with('-') && (flag.starts_with("--") || flag.len() == 2);
        if !valid {
            return Err(ParserError::InvalidArgument(flag.clone()));
        }
        if flag == "-h" || flag == "--help" {
            return Err(ParserError::Conflict(flag.clone()));
        }
    }
    for existing in &node.arguments {
        if existing.destination().as_deref() == Some(dest.as_str()) {
            return Err(ParserError::Conflict(dest));
        }
        if let Some(flag) = argument.flags.iter().find(|f| existing.has_flag(f)) {
            return Err(ParserError::Conflict(flag.clone()));
        }
    }
    Ok(())
}

impl ArgumentParser for ClapArgumentParser {
    fn add_argument(&mut self, parser: ParserId, argument: Argument) -> Result<(), ParserError> {
        let node = self.node_mut(parser)?;
        validate(node, &argument)?;
        node.arguments.push(argument);
        Ok(())
    }

    fn add_subparsers(
        &mut self,
        parser: ParserId,
        subparsers: Subparsers,
    ) -> Result<GroupId, ParserError> {
        let id = GroupId(self.groups.len());
        let node = self.node_mut(parser)?;
        if node.group.is_some() {
            return Err(ParserError::DuplicateGroup(parser));
        }
        node.group = Some(id);
        self.groups.push(GroupNode {
            spec: subparsers,
            parsers: Vec::new(),
        });
        Ok(id)
    }

    fn add_parser(
        &mut self,
        group: GroupId,
        name: &str,
        help: Option<&str>,
    ) -> Result<ParserId, ParserError> {
        let siblings = &self
            .groups
            .get(group.0)
            .ok_or(ParserError::UnknownGroup(group))?
            .parsers;
        if siblings.iter().any(|p| self.parsers[p.0].name == name) {
            return Err(ParserError::Conflict(name.to_string()));
        }
        let id = ParserId(self.parsers.len());
        self.parsers.push(ParserNode::new(name, help));
        self.groups[group.0].parsers.push(id);
        Ok(id)
    }

    fn behavior(&self, parser: ParserId) -> Result<Behavior, ParserError> {
        Ok(self.node(parser)?.behavior)
    }

    fn set_behavior(&mut self, parser: ParserId, behavior: Behavior) -> Result<(), ParserError> {
        self.node_mut(parser)?.behavior = behavior;
        Ok(())
    }

    fn parse_known_args(&mut self, args: &[String]) -> Result<Namespace, ParserError> {
        self.parse(args, true)
    }

    fn parse_args(&mut self, args: &[String]) -> Result<Namespace, ParserError> {
        self.parse(args, false)
    }
}
