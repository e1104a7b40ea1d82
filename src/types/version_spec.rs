// ABOUTME: Runtime-version specifier of the form <version>[@<namespace>].
// ABOUTME: Handles marker-file rendering/parsing and version-segment matching.

use std::fmt;
use thiserror::Error;

/// Prefix of the marker line written into each release.
const MARKER_PREFIX: &str = "use ";

#[derive(Debug, Error)]
pub enum VersionSpecError {
    #[error("runtime-version specifier cannot be empty")]
    Empty,

    #[error("runtime-version specifier has an empty version segment")]
    EmptyVersion,

    #[error("runtime-version specifier has an empty namespace segment")]
    EmptyNamespace,

    #[error("runtime-version specifier cannot contain whitespace")]
    Whitespace,

    #[error("unrecognized runtime-version marker line: {0:?}")]
    UnrecognizedMarker(String),
}

/// A runtime-version specifier: a runtime version plus an optional isolated
/// dependency namespace, e.g. `3.2.0` or `3.2.0@myapp`.
///
/// Two specs "match" when their version segments are equal; the namespace is
/// deliberately ignored for matching, mirroring how the recorded marker is
/// compared against the desired specifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionSpec {
    version: String,
    namespace: Option<String>,
}

impl VersionSpec {
    pub fn parse(value: &str) -> Result<Self, VersionSpecError> {
        if value.is_empty() {
            return Err(VersionSpecError::Empty);
        }

        if value.chars().any(char::is_whitespace) {
            return Err(VersionSpecError::Whitespace);
        }

        let (version, namespace) = match value.split_once('@') {
            None => (value, None),
            Some((v, ns)) => {
                if ns.is_empty() {
                    return Err(VersionSpecError::EmptyNamespace);
                }
                (v, Some(ns))
            }
        };

        if version.is_empty() {
            return Err(VersionSpecError::EmptyVersion);
        }

        Ok(Self {
            version: version.to_string(),
            namespace: namespace.map(str::to_string),
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Version-segment equality. Namespaces are not compared.
    pub fn matches_version(&self, other: &VersionSpec) -> bool {
        self.version == other.version
    }

    /// The single line persisted as the release's runtime-version marker.
    pub fn marker_line(&self) -> String {
        format!("{MARKER_PREFIX}{self} --create")
    }

    /// Parse a marker line written by [`VersionSpec::marker_line`].
    pub fn from_marker(line: &str) -> Result<Self, VersionSpecError> {
        let rest = line
            .trim()
            .strip_prefix(MARKER_PREFIX)
            .ok_or_else(|| VersionSpecError::UnrecognizedMarker(line.to_string()))?;

        let token = rest
            .split_whitespace()
            .next()
            .ok_or_else(|| VersionSpecError::UnrecognizedMarker(line.to_string()))?;

        Self::parse(token)
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}@{}", self.version, ns),
            None => write!(f, "{}", self.version),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_version_with_namespace() {
        let spec = VersionSpec::parse("3.2.0@myapp").unwrap();
        assert_eq!(spec.version(), "3.2.0");
        assert_eq!(spec.namespace(), Some("myapp"));
    }

    #[test]
    fn parses_bare_version() {
        let spec = VersionSpec::parse("3.2.0").unwrap();
        assert_eq!(spec.version(), "3.2.0");
        assert_eq!(spec.namespace(), None);
    }

    #[test]
    fn rejects_malformed_specs() {
        assert!(matches!(
            VersionSpec::parse(""),
            Err(VersionSpecError::Empty)
        ));
        assert!(matches!(
            VersionSpec::parse("@gemset"),
            Err(VersionSpecError::EmptyVersion)
        ));
        assert!(matches!(
            VersionSpec::parse("3.2.0@"),
            Err(VersionSpecError::EmptyNamespace)
        ));
        assert!(matches!(
            VersionSpec::parse("3.2.0 extra"),
            Err(VersionSpecError::Whitespace)
        ));
    }

    #[test]
    fn matching_ignores_namespace() {
        let a = VersionSpec::parse("3.2.0@app").unwrap();
        let b = VersionSpec::parse("3.2.0@other").unwrap();
        let c = VersionSpec::parse("3.3.0@app").unwrap();

        assert!(a.matches_version(&b));
        assert!(!a.matches_version(&c));
    }

    #[test]
    fn marker_round_trips() {
        let spec = VersionSpec::parse("3.2.0@myapp").unwrap();
        let line = spec.marker_line();
        assert_eq!(line, "use 3.2.0@myapp --create");
        assert_eq!(VersionSpec::from_marker(&line).unwrap(), spec);
    }

    #[test]
    fn marker_parse_fails_loudly_on_garbage() {
        assert!(matches!(
            VersionSpec::from_marker("rubby 3.2.0"),
            Err(VersionSpecError::UnrecognizedMarker(_))
        ));
        assert!(matches!(
            VersionSpec::from_marker(""),
            Err(VersionSpecError::UnrecognizedMarker(_))
        ));
    }

    #[test]
    fn marker_tolerates_surrounding_whitespace() {
        let spec = VersionSpec::from_marker("  use 3.2.0@app --create\n").unwrap();
        assert_eq!(spec.version(), "3.2.0");
        assert_eq!(spec.namespace(), Some("app"));
    }
}
