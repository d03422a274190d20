//! Hierarchical store paths

use std::fmt;

use mole_core::{MoleError, MoleResult};

/// Characters the realtime store refuses inside a key
const FORBIDDEN: &[char] = &['.', '#', '$', '[', ']', '/'];

/// A `/`-separated location in the store tree. The empty path is the root.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    pub fn root() -> Self {
        StorePath::default()
    }

    /// Parse a path such as `games/abc123/players`.
    /// Leading and trailing separators are ignored.
    pub fn parse(raw: &str) -> MoleResult<Self> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(StorePath::root());
        }

        let mut path = StorePath::root();
        for segment in trimmed.split('/') {
            path.push(segment)?;
        }
        Ok(path)
    }

    /// Append one key
    pub fn push(&mut self, segment: &str) -> MoleResult<()> {
        validate_segment(segment)?;
        self.segments.push(segment.to_string());
        Ok(())
    }

    /// New path with one more key
    pub fn child(&self, segment: &str) -> MoleResult<Self> {
        let mut path = self.clone();
        path.push(segment)?;
        Ok(path)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last key, if any
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        Some(StorePath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Whether `self` equals `other` or lies above it
    pub fn is_prefix_of(&self, other: &StorePath) -> bool {
        self.segments.len() <= other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }

    /// Whether a change at one path can alter the value at the other
    pub fn overlaps(&self, other: &StorePath) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }
}

fn validate_segment(segment: &str) -> MoleResult<()> {
    if segment.is_empty() {
        return Err(MoleError::InvalidPath("empty key".to_string()));
    }
    if let Some(c) = segment.chars().find(|c| FORBIDDEN.contains(c) || c.is_control()) {
        return Err(MoleError::InvalidPath(format!(
            "key {:?} contains forbidden character {:?}",
            segment, c
        )));
    }
    Ok(())
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}
