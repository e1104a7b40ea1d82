// ABOUTME: Validated revision identifier used as the release directory name.
// ABOUTME: Rejects anything that is not a single safe path component.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RevisionError {
    #[error("revision cannot be empty")]
    Empty,

    #[error("revision cannot be '.' or '..'")]
    Reserved,

    #[error("invalid character in revision: '{0}'")]
    InvalidChar(char),
}

/// A source revision. Release directories are keyed by revision, so the
/// value must be usable verbatim as a directory name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision(String);

impl Revision {
    pub fn new(value: &str) -> Result<Self, RevisionError> {
        if value.is_empty() {
            return Err(RevisionError::Empty);
        }

        if value == "." || value == ".." {
            return Err(RevisionError::Reserved);
        }

        for c in value.chars() {
            if c == '/' || c == '\\' || c == '\0' || c.is_whitespace() {
                return Err(RevisionError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_shas_branches_and_tags() {
        assert!(Revision::new("4a1f9c0d").is_ok());
        assert!(Revision::new("main").is_ok());
        assert!(Revision::new("v1.2.3").is_ok());
    }

    #[test]
    fn rejects_path_traversal() {
        assert!(matches!(Revision::new(".."), Err(RevisionError::Reserved)));
        assert!(matches!(
            Revision::new("releases/evil"),
            Err(RevisionError::InvalidChar('/'))
        ));
    }

    #[test]
    fn rejects_empty_and_whitespace() {
        assert!(matches!(Revision::new(""), Err(RevisionError::Empty)));
        assert!(matches!(
            Revision::new("a b"),
            Err(RevisionError::InvalidChar(' '))
        ));
    }
}
