use semver::{Version, VersionReq};
use thiserror::Error;

use crate::parser::ArgumentParser;

/// Version of the argument parser decorator extension point.
pub const EXTENSION_POINT_VERSION: &str = "1.0.0";

/// Priority assigned to extensions that do not override it.
pub const DEFAULT_PRIORITY: i32 = 100;

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("invalid version `{version}`: {source}")]
    InvalidVersion {
        version: String,
        source: semver::Error,
    },
    #[error("invalid version requirement `{requirement}`: {source}")]
    InvalidRequirement {
        requirement: String,
        source: semver::Error,
    },
    #[error("extension point version {version} does not satisfy {requirement}")]
    Unsatisfied {
        version: String,
        requirement: String,
    },
}

/// Check that an extension point `version` matches a caret style
/// `requirement` such as `^1.0`.
pub fn satisfies_version(version: &str, requirement: &str) -> Result<(), VersionError> {
    let parsed = Version::parse(version).map_err(|source| VersionError::InvalidVersion {
        version: version.to_string(),
        source,
    })?;
    let req = VersionReq::parse(requirement).map_err(|source| VersionError::InvalidRequirement {
        requirement: requirement.to_string(),
        source,
    })?;
    if !req.matches(&parsed) {
        return Err(VersionError::Unsatisfied {
            version: version.to_string(),
            requirement: requirement.to_string(),
        });
    }
    Ok(())
}

/// Metadata describing a registered extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionMetadata {
    pub name: String,
    pub version: String,
    pub priority: i32,
}

/// Extension point for decorating the host's argument parser.
///
/// The host applies extensions in descending priority order, so an extension
/// with a lower priority wraps the others and sees calls first.
pub trait ArgumentParserDecoratorExtension {
    /// Unique name used for ordering ties and blocklisting.
    fn name(&self) -> &str;

    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    fn decorate_argument_parser(&self, parser: Box<dyn ArgumentParser>) -> Box<dyn ArgumentParser>;

    fn metadata(&self) -> ExtensionMetadata {
        ExtensionMetadata {
            name: self.name().to_string(),
            version: EXTENSION_POINT_VERSION.to_string(),
            priority: self.priority(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_version_satisfies_caret_one() {
        satisfies_version(EXTENSION_POINT_VERSION, "^1.0").unwrap();
    }

    #[test]
    fn major_bump_is_rejected() {
        let err = satisfies_version("2.0.0", "^1.0").unwrap_err();
        assert!(matches!(err, VersionError::Unsatisfied { .. }));
        assert_eq!(
            err.to_string(),
            "extension point version 2.0.0 does not satisfy ^1.0"
        );
    }

    #[test]
    fn malformed_inputs_are_reported() {
        assert!(matches!(
            satisfies_version("1.0", "^1.0"),
            Err(VersionError::InvalidVersion { .. })
        ));
        assert!(matches!(
            satisfies_version("1.0.0", "not a req"),
            Err(VersionError::InvalidRequirement { .. })
        ));
    }
}
