use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
    rc::Rc,
};

use serde::Serialize;
use thiserror::Error;

/// Handle to a parser (the root parser or a sub-parser) owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParserId(pub usize);

impl ParserId {
    /// The top-level parser every host starts with.
    pub const ROOT: ParserId = ParserId(0);
}

impl fmt::Display for ParserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parser#{}", self.0)
    }
}

/// Handle to a group of sub-parsers attached to a parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub usize);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group#{}", self.0)
    }
}

/// A parsed argument value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Path(PathBuf),
    Bool(bool),
    List(Vec<Value>),
}

impl Value {
    /// Borrow the value as a path, for both textual and path values.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Value::Text(text) => Some(Path::new(text)),
            Value::Path(path) => Some(path),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(flag) => Some(*flag),
            _ => None,
        }
    }
}

/// Converts a raw command line value into a typed [`Value`].
pub type Converter = Rc<dyn Fn(&str) -> Result<Value, String>>;

/// Run `pre` on the raw value first and feed its output into `existing`.
///
/// Without an existing converter the path produced by `pre` is the final
/// value, whatever its encoding. An existing converter takes text, so the
/// path must then be valid UTF-8.
pub fn compose_converter<F>(existing: Option<Converter>, pre: F) -> Converter
where
    F: Fn(&str) -> Result<PathBuf, String> + 'static,
{
    Rc::new(move |raw: &str| {
        let path = pre(raw)?;
        match &existing {
            Some(convert) => match path.to_str() {
                Some(text) => convert(text),
                None => Err(format!("non UTF-8 path {}", path.display())),
            },
            None => Ok(Value::Path(path)),
        }
    })
}

/// What the parser does when an argument is encountered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// Store the single value following the option.
    #[default]
    Store,
    /// Store `true` when the flag is present.
    StoreTrue,
    /// Collect every occurrence into a list.
    Append,
}

/// Definition of a single argument.
#[derive(Clone, Default)]
pub struct Argument {
    /// Option strings such as `--build-base` or `-b`; empty for positionals.
    pub flags: Vec<String>,
    /// Name of a positional argument.
    pub name: Option<String>,
    pub dest: Option<String>,
    pub action: Action,
    pub required: bool,
    pub default: Option<String>,
    pub help: Option<String>,
    pub converter: Option<Converter>,
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Argument")
            .field("flags", &self.flags)
            .field("name", &self.name)
            .field("dest", &self.dest)
            .field("action", &self.action)
            .field("required", &self.required)
            .field("default", &self.default)
            .field("converter", &self.converter.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl Argument {
    /// An optional argument identified by one or more option strings.
    pub fn option<I, S>(flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            flags: flags.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// A positional argument.
    pub fn positional(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            required: true,
            ..Default::default()
        }
    }

    pub fn action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    pub fn converter(mut self, converter: Converter) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Whether any of the option strings equals `flag`.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }

    /// Destination key in the parsed [`Namespace`].
    ///
    /// An explicit `dest` wins, then the positional name, then the first long
    /// option string, then the first short one. Leading dashes are stripped
    /// and inner dashes become underscores.
    pub fn destination(&self) -> Option<String> {
        if let Some(dest) = &self.dest {
            return Some(dest.clone());
        }
        if let Some(name) = &self.name {
            return Some(name.replace('-', "_"));
        }
        let flag = self
            .flags
            .iter()
            .find(|f| f.starts_with("--"))
            .or_else(|| self.flags.first())?;
        let stripped = flag.trim_start_matches('-');
        if stripped.is_empty() {
            return None;
        }
        Some(stripped.replace('-', "_"))
    }
}

/// Definition of a group of sub-parsers (verbs).
#[derive(Debug, Clone, Default)]
pub struct Subparsers {
    /// Destination receiving the name of the selected sub-parser.
    pub dest: String,
    pub title: Option<String>,
    pub required: bool,
}

impl Subparsers {
    pub fn new(dest: impl Into<String>) -> Self {
        Self {
            dest: dest.into(),
            ..Default::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

/// Toggleable parser behaviors, all enabled by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Behavior {
    /// Print usage, help and error messages.
    pub usage_output: bool,
    /// Run argument converters.
    pub type_conversions: bool,
    /// Enforce required arguments and required sub-parsers.
    pub required_actions: bool,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            usage_output: true,
            type_conversions: true,
            required_actions: true,
        }
    }
}

/// Result of a parse. Every destination defined on the parsers that took part
/// in the parse is present; destinations without a value map to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Namespace {
    values: BTreeMap<String, Option<Value>>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, dest: impl Into<String>, value: Option<Value>) {
        self.values.insert(dest.into(), value);
    }

    /// Whether the destination was defined, regardless of its value.
    pub fn contains(&self, dest: &str) -> bool {
        self.values.contains_key(dest)
    }

    pub fn get(&self, dest: &str) -> Option<&Value> {
        self.values.get(dest).and_then(Option::as_ref)
    }

    pub fn get_path(&self, dest: &str) -> Option<&Path> {
        self.get(dest).and_then(Value::as_path)
    }

    pub fn get_bool(&self, dest: &str) -> Option<bool> {
        self.get(dest).and_then(Value::as_bool)
    }

    pub fn get_text(&self, dest: &str) -> Option<&str> {
        match self.get(dest)? {
            Value::Text(text) => Some(text),
            Value::Path(path) => path.to_str(),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("unknown parser {0}")]
    UnknownParser(ParserId),
    #[error("unknown sub-parser group {0}")]
    UnknownGroup(GroupId),
    #[error("{0} already has a sub-parser group")]
    DuplicateGroup(ParserId),
    #[error("invalid argument definition: {0}")]
    InvalidArgument(String),
    #[error("conflicting destination `{0}`")]
    Conflict(String),
    #[error("argument {dest}: {message}")]
    Conversion { dest: String, message: String },
    /// The parser rejected the command line, or help was requested.
    #[error("{message}")]
    Usage { message: String, exit_code: i32 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Failure raised by a decorator while intercepting a call.
    #[error(transparent)]
    Extension(Box<dyn std::error::Error + Send + Sync>),
}

impl ParserError {
    /// Process exit code matching the error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ParserError::Usage { exit_code, .. } => *exit_code,
            _ => 2,
        }
    }
}

/// The argument parser capability a host exposes to decorators.
///
/// Parsers form a tree addressed through [`ParserId`] and [`GroupId`]
/// handles, so a decorator wrapping the root sees every registration,
/// including those of nested sub-parsers.
pub trait ArgumentParser {
    fn add_argument(&mut self, parser: ParserId, argument: Argument) -> Result<(), ParserError>;

    fn add_subparsers(
        &mut self,
        parser: ParserId,
        subparsers: Subparsers,
    ) -> Result<GroupId, ParserError>;

    fn add_parser(
        &mut self,
        group: GroupId,
        name: &str,
        help: Option<&str>,
    ) -> Result<ParserId, ParserError>;

    fn behavior(&self, parser: ParserId) -> Result<Behavior, ParserError>;

    fn set_behavior(&mut self, parser: ParserId, behavior: Behavior) -> Result<(), ParserError>;

    /// Best effort parse: unknown arguments and malformed input are skipped.
    ///
    /// `args` includes the program name as its first element.
    fn parse_known_args(&mut self, args: &[String]) -> Result<Namespace, ParserError>;

    /// Strict parse. `args` includes the program name as its first element.
    fn parse_args(&mut self, args: &[String]) -> Result<Namespace, ParserError>;
}

impl<P: ArgumentParser + ?Sized> ArgumentParser for Box<P> {
    fn add_argument(&mut self, parser: ParserId, argument: Argument) -> Result<(), ParserError> {
        (**self).add_argument(parser, argument)
    }

    fn add_subparsers(
        &mut self,
        parser: ParserId,
        subparsers: Subparsers,
    ) -> Result<GroupId, ParserError> {
        (**self).add_subparsers(parser, subparsers)
    }

    fn add_parser(
        &mut self,
        group: GroupId,
        name: &str,
        help: Option<&str>,
    ) -> Result<ParserId, ParserError> {
        (**self).add_parser(group, name, help)
    }

    fn behavior(&self, parser: ParserId) -> Result<Behavior, ParserError> {
        (**self).behavior(parser)
    }

    fn set_behavior(&mut self, parser: ParserId, behavior: Behavior) -> Result<(), ParserError> {
        (**self).set_behavior(parser, behavior)
    }

    fn parse_known_args(&mut self, args: &[String]) -> Result<Namespace, ParserError> {
        (**self).parse_known_args(args)
    }

    fn parse_args(&mut self, args: &[String]) -> Result<Namespace, ParserError> {
        (**self).parse_args(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_prefers_long_option() {
        let arg = Argument::option(["-b", "--build-base"]);
        assert_eq!(arg.destination().as_deref(), Some("build_base"));
    }

    #[test]
    fn destination_falls_back_to_short_option_and_explicit_dest() {
        assert_eq!(
            Argument::option(["-v"]).destination().as_deref(),
            Some("v")
        );
        let arg = Argument::option(["--log-base"]).dest("logs");
        assert_eq!(arg.destination().as_deref(), Some("logs"));
        assert_eq!(Argument::option(["--"]).destination(), None);
    }

    #[test]
    fn composed_converter_runs_pre_step_first() {
        let upper: Converter = Rc::new(|raw: &str| Ok(Value::Text(raw.to_uppercase())));
        let composed = compose_converter(Some(upper), |raw| Ok(Path::new(raw).join("x")));
        assert_eq!(composed("a").unwrap(), Value::Text("A/X".into()));

        let bare = compose_converter(None, |raw| Ok(Path::new("/root").join(raw)));
        assert_eq!(bare("b").unwrap(), Value::Path(PathBuf::from("/root/b")));
    }

    #[cfg(unix)]
    #[test]
    fn composed_converter_keeps_non_utf8_paths() {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        let root = PathBuf::from(OsStr::from_bytes(b"/ws-\xff"));
        let pre_root = root.clone();
        let bare = compose_converter(None, move |raw| Ok(pre_root.join(raw)));
        assert_eq!(bare("build").unwrap(), Value::Path(root.join("build")));

        let text: Converter = Rc::new(|raw: &str| Ok(Value::Text(raw.to_string())));
        let pre_root = root.clone();
        let composed = compose_converter(Some(text), move |raw| Ok(pre_root.join(raw)));
        assert!(composed("build").unwrap_err().starts_with("non UTF-8 path"));
    }

    #[test]
    fn composed_converter_propagates_pre_step_errors() {
        let composed = compose_converter(None, |_| Err("nope".to_string()));
        assert_eq!(composed("a").unwrap_err(), "nope");
    }

    #[test]
    fn namespace_distinguishes_unset_from_undefined() {
        let mut ns = Namespace::new();
        ns.insert("build_base", None);
        ns.insert("verb", Some(Value::Text("build".into())));
        assert!(ns.contains("build_base"));
        assert!(ns.get("build_base").is_none());
        assert!(!ns.contains("install_base"));
        assert_eq!(ns.get_text("verb"), Some("build"));
    }

    #[test]
    fn namespace_serializes_as_flat_object() {
        let mut ns = Namespace::new();
        ns.insert("build_base", Some(Value::Path(PathBuf::from("/ws/build"))));
        ns.insert("merge", Some(Value::Bool(false)));
        ns.insert("log_base", None);
        let json = serde_json::to_value(&ns).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"build_base": "/ws/build", "merge": false, "log_base": null})
        );
    }
}
