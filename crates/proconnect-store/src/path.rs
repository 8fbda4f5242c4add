use std::fmt;

use crate::error::{Result, StoreError};

/// Characters the hosted database refuses in keys, plus the separator.
const RESERVED: &[char] = &['.', '#', '$', '[', ']', '/'];

/// A validated path from the root of the store tree.
///
/// The empty path addresses the root itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    /// The root of the tree.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a path such as `chats/-Nabc/messages`.
    ///
    /// Leading and trailing slashes are ignored; empty inner segments are not.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        let mut path = Self::root();
        for segment in trimmed.split('/') {
            path.push(segment)?;
        }
        Ok(path)
    }

    /// Append a single key, validating it.
    pub fn push(&mut self, segment: &str) -> Result<()> {
        validate_segment(segment)?;
        self.segments.push(segment.to_string());
        Ok(())
    }

    /// Return a new path extended by `relative`, which may span several segments.
    pub fn join(&self, relative: &str) -> Result<Self> {
        let mut path = self.clone();
        let trimmed = relative.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(path);
        }
        for segment in trimmed.split('/') {
            path.push(segment)?;
        }
        Ok(path)
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment, or `None` at the root.
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// True when `self` equals `other` or lies above it.
    pub fn is_ancestor_of(&self, other: &StorePath) -> bool {
        other.segments.len() >= self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// True when a change at one path can affect the subtree at the other.
    pub fn overlaps(&self, other: &StorePath) -> bool {
        self.is_ancestor_of(other) || other.is_ancestor_of(self)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty() {
        return Err(StoreError::InvalidPath("empty path segment".into()));
    }
    if let Some(c) = segment.chars().find(|c| RESERVED.contains(c) || c.is_control()) {
        return Err(StoreError::InvalidPath(format!(
            "segment {segment:?} contains reserved character {c:?}"
        )));
    }
    Ok(())
}
