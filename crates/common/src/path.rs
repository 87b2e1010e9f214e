//! Hierarchical node identifiers into a device data tree

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors parsing a textual path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("Path must start with '/': {0}")]
    NotAbsolute(String),

    #[error("Path contains an empty segment: {0}")]
    EmptySegment(String),
}

/// Structured path such as `/interfaces/interface/eth0`
///
/// The empty path addresses the root of the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Path(Vec<String>);

impl Path {
    /// The root of the data tree
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a child segment
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// True if `other` equals this path or lies beneath it
    pub fn contains(&self, other: &Path) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix('/')
            .ok_or_else(|| PathError::NotAbsolute(s.to_string()))?;
        if rest.is_empty() {
            return Ok(Self::root());
        }
        let segments: Vec<String> = rest.split('/').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(PathError::EmptySegment(s.to_string()));
        }
        Ok(Self(segments))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.0 {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let path: Path = "/a/b".parse().unwrap();
        assert_eq!(path.segments(), ["a", "b"]);
        assert_eq!(path.to_string(), "/a/b");
        assert_eq!("/".parse::<Path>().unwrap(), Path::root());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!("a/b".parse::<Path>(), Err(PathError::NotAbsolute(_))));
        assert!(matches!("/a//b".parse::<Path>(), Err(PathError::EmptySegment(_))));
    }

    #[test]
    fn test_contains() {
        let a: Path = "/a".parse().unwrap();
        let ab: Path = "/a/b".parse().unwrap();
        let ac: Path = "/ac".parse().unwrap();
        assert!(a.contains(&ab));
        assert!(a.contains(&a));
        assert!(!ab.contains(&a));
        assert!(!a.contains(&ac));
        assert!(Path::root().contains(&ab));
        assert_eq!(ab.parent(), Some(a));
    }
}
