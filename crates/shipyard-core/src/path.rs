//! Field paths addressing a location inside a resource config
//!
//! A path is a dot-separated list of field names, each optionally followed by
//! a list index: `image`, `ports`, `ports[1]`, `ports[1].local`.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// One `name` or `name[index]` component of a path.
static SEGMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-z][a-z0-9_]*)(?:\[(\d+)\])?$").expect("Invalid path segment regex")
});

/// A single step in a [`FieldPath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of a field inside a config
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath {
    segments: Vec<PathSegment>,
}

impl FieldPath {
    /// Path to a top-level field
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            segments: vec![PathSegment::Key(name.into())],
        }
    }

    /// Parse a path such as `ports[1].local`
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Err(Error::invalid_path(input, "empty path"));
        }

        let mut segments = Vec::new();
        for part in input.split('.') {
            let caps = SEGMENT_PATTERN
                .captures(part)
                .ok_or_else(|| Error::invalid_path(input, format!("malformed segment '{part}'")))?;
            segments.push(PathSegment::Key(caps[1].to_string()));
            if let Some(index) = caps.get(2) {
                let index = index
                    .as_str()
                    .parse::<usize>()
                    .map_err(|_| Error::invalid_path(input, "index too large"))?;
                segments.push(PathSegment::Index(index));
            }
        }
        Ok(Self { segments })
    }

    /// Append a list index
    pub fn index(mut self, index: usize) -> Self {
        self.segments.push(PathSegment::Index(index));
        self
    }

    /// Append a field name
    pub fn key(mut self, name: impl Into<String>) -> Self {
        self.segments.push(PathSegment::Key(name.into()));
        self
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Name of the top-level config key this path lives under
    pub fn root(&self) -> Option<&str> {
        match self.segments.first() {
            Some(PathSegment::Key(name)) => Some(name),
            _ => None,
        }
    }

    /// Split into the top-level key and the remaining segments
    pub fn split_root(&self) -> Result<(&str, &[PathSegment])> {
        match self.segments.split_first() {
            Some((PathSegment::Key(name), rest)) => Ok((name, rest)),
            _ => Err(Error::invalid_path(self, "path must start with a field name")),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Key(name) if i == 0 => write!(f, "{name}")?,
                PathSegment::Key(name) => write!(f, ".{name}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_field() {
        let path = FieldPath::parse("image").unwrap();
        assert_eq!(path.segments(), &[PathSegment::Key("image".into())]);
        assert_eq!(path.root(), Some("image"));
    }

    #[test]
    fn test_parse_indexed_subfield() {
        let path = FieldPath::parse("ports[1].local").unwrap();
        assert_eq!(
            path.segments(),
            &[
                PathSegment::Key("ports".into()),
                PathSegment::Index(1),
                PathSegment::Key("local".into()),
            ]
        );
        assert_eq!(path.to_string(), "ports[1].local");
    }

    #[test]
    fn test_builder_matches_parse() {
        let built = FieldPath::field("environment").index(0).key("value");
        assert_eq!(built, FieldPath::parse("environment[0].value").unwrap());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "ports[", "ports[x]", ".image", "image.", "Ports", "[0]"] {
            assert!(
                matches!(FieldPath::parse(bad), Err(Error::InvalidPath { .. })),
                "expected '{bad}' to be rejected"
            );
        }
    }

    #[test]
    fn test_serde_as_string() {
        let path = FieldPath::parse("volumes[2].container").unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, r#""volumes[2].container""#);
        let back: FieldPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }
}
