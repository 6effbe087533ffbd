use std::ops::{Deref, DerefMut};

use crate::parser::{ArgumentParser, Behavior, ParserError, ParserId};

/// Scoped suppression of one parser behavior.
///
/// The guard borrows the parser mutably, disables the behavior on every
/// listed parser and puts the previous behavior back when dropped. Guards
/// nest through `&mut *guard`.
pub struct Suppressed<'a> {
    parser: &'a mut dyn ArgumentParser,
    saved: Vec<(ParserId, Behavior)>,
}

impl<'a> Suppressed<'a> {
    /// Stop printing usage, help and error output.
    pub fn usage_output(
        parser: &'a mut dyn ArgumentParser,
        parsers: &[ParserId],
    ) -> Result<Self, ParserError> {
        Self::apply(parser, parsers, |b| b.usage_output = false)
    }

    /// Store raw values instead of running converters.
    pub fn type_conversions(
        parser: &'a mut dyn ArgumentParser,
        parsers: &[ParserId],
    ) -> Result<Self, ParserError> {
        Self::apply(parser, parsers, |b| b.type_conversions = false)
    }

    /// Treat required arguments and required sub-parsers as optional.
    pub fn required_actions(
        parser: &'a mut dyn ArgumentParser,
        parsers: &[ParserId],
    ) -> Result<Self, ParserError> {
        Self::apply(parser, parsers, |b| b.required_actions = false)
    }

    fn apply(
        parser: &'a mut dyn ArgumentParser,
        parsers: &[ParserId],
        disable: impl Fn(&mut Behavior),
    ) -> Result<Self, ParserError> {
        let mut guard = Self {
            parser,
            saved: Vec::with_capacity(parsers.len()),
        };
        for &id in parsers {
            let previous = guard.parser.behavior(id)?;
            let mut behavior = previous;
            disable(&mut behavior);
            guard.parser.set_behavior(id, behavior)?;
            // Record only after the change landed so drop never restores an
            // id that was rejected.
            guard.saved.push((id, previous));
        }
        Ok(guard)
    }
}

impl<'a> Deref for Suppressed<'a> {
    type Target = dyn ArgumentParser + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.parser
    }
}

impl<'a> DerefMut for Suppressed<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.parser
    }
}

impl Drop for Suppressed<'_> {
    fn drop(&mut self) {
        for (id, behavior) in self.saved.drain(..).rev() {
            let _ = self.parser.set_behavior(id, behavior);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::parser::{Argument, GroupId, Namespace, Subparsers};

    #[derive(Default)]
    struct Recorder {
        behaviors: HashMap<ParserId, Behavior>,
        seen: Vec<Behavior>,
    }

    impl ArgumentParser for Recorder {
        fn add_argument(&mut self, _: ParserId, _: Argument) -> Result<(), ParserError> {
            Ok(())
        }

        fn add_subparsers(&mut self, _: ParserId, _: Subparsers) -> Result<GroupId, ParserError> {
            Ok(GroupId(0))
        }

        fn add_parser(
            &mut self,
            _: GroupId,
            _: &str,
            _: Option<&str>,
        ) -> Result<ParserId, ParserError> {
            Ok(ParserId(1))
        }

        fn behavior(&self, parser: ParserId) -> Result<Behavior, ParserError> {
            if parser.0 > 1 {
                return Err(ParserError::UnknownParser(parser));
            }
            Ok(self.behaviors.get(&parser).copied().unwrap_or_default())
        }

        fn set_behavior(&mut self, parser: ParserId, behavior: Behavior) -> Result<(), ParserError> {
            self.behaviors.insert(parser, behavior);
            Ok(())
        }

        fn parse_known_args(&mut self, _: &[String]) -> Result<Namespace, ParserError> {
            let current = self.behavior(ParserId::ROOT)?;
            self.seen.push(current);
            Err(ParserError::Usage {
                message: "boom".into(),
                exit_code: 2,
            })
        }

        fn parse_args(&mut self, _: &[String]) -> Result<Namespace, ParserError> {
            Ok(Namespace::new())
        }
    }

    #[test]
    fn nested_guards_disable_all_behaviors_and_restore_on_error() {
        let mut recorder = Recorder::default();
        let parsers = [ParserId::ROOT, ParserId(1)];
        let result = {
            let mut usage = Suppressed::usage_output(&mut recorder, &parsers).unwrap();
            let mut types = Suppressed::type_conversions(&mut *usage, &parsers).unwrap();
            let mut required = Suppressed::required_actions(&mut *types, &parsers).unwrap();
            required.parse_known_args(&[])
        };
        assert!(result.is_err());
        assert_eq!(
            recorder.seen,
            vec![Behavior {
                usage_output: false,
                type_conversions: false,
                required_actions: false,
            }]
        );
        assert_eq!(recorder.behavior(ParserId::ROOT).unwrap(), Behavior::default());
        assert_eq!(recorder.behavior(ParserId(1)).unwrap(), Behavior::default());
    }

    #[test]
    fn failed_activation_restores_already_changed_parsers() {
        let mut recorder = Recorder::default();
        let rejected = matches!(
            Suppressed::usage_output(&mut recorder, &[ParserId::ROOT, ParserId(7)]),
            Err(ParserError::UnknownParser(ParserId(7)))
        );
        assert!(rejected);
        assert_eq!(recorder.behavior(ParserId::ROOT).unwrap(), Behavior::default());
    }

    #[test]
    fn pre_existing_suppression_survives_the_guard() {
        let mut recorder = Recorder::default();
        let quiet = Behavior {
            usage_output: false,
            ..Behavior::default()
        };
        recorder.set_behavior(ParserId::ROOT, quiet).unwrap();
        {
            let _guard = Suppressed::required_actions(&mut recorder, &[ParserId::ROOT]).unwrap();
        }
        assert_eq!(recorder.behavior(ParserId::ROOT).unwrap(), quiet);
    }
}
