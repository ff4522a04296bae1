//! Structured breadcrumbs into a formula tree.
//!
//! A [`Location`] is pushed and popped in lockstep with evaluator recursion.
//! It never influences evaluation results; it only makes error reports
//! point at the failing node.

use serde::{Deserialize, Serialize};

/// One step of a [`Location`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathSegment {
    /// Descend into the child at this position of a list element.
    Child(usize),
    /// Enter the body of a derived constant's definition.
    Definition { constant: String },
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Child(index) => write!(f, "{index}"),
            Self::Definition { constant } => write!(f, "[{constant}]"),
        }
    }
}

/// Path from the root of the evaluated formula to the current node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    segments: Vec<PathSegment>,
}

impl Location {
    /// The location of the root element.
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// A copy of this location extended by one child step.
    pub fn child(mut self, index: usize) -> Self {
        self.segments.push(PathSegment::Child(index));
        self
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }

    pub fn pop(&mut self) -> Option<PathSegment> {
        self.segments.pop()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}
