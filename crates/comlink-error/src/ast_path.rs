// SPDX-License-Identifier: MIT OR Apache-2.0
//! AST path and source location attached to interpretation errors.

use std::fmt;

/// One step in the path from the document root to an offending AST node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Indexed into a named operation's body.
    Operation(String),
    /// Indexed into a statement or expression list by position.
    Index(usize),
    /// Indexed into a named field of a node (e.g. a `SetStatement`'s
    /// assignments, an `HttpRequest`'s headers).
    Field(&'static str),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Operation(name) => write!(f, "operation({name})"),
            PathSegment::Index(i) => write!(f, "[{i}]"),
            PathSegment::Field(name) => write!(f, ".{name}"),
        }
    }
}

/// Depth-first path from the document root to the node an error was raised
/// against.
///
/// Built by the interpreter the moment an error is raised — by construction
/// this is always the path as of "first access": a [`CoreError`](crate::CoreError)
/// is only ever constructed once, at the point of failure, so there is no
/// separate lazy-resolution step to model here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AstPath(pub Vec<PathSegment>);

impl AstPath {
    /// The empty path (the document root itself).
    #[must_use]
    pub fn root() -> Self {
        AstPath(Vec::new())
    }

    /// Append a segment, returning the extended path.
    #[must_use]
    pub fn push(mut self, segment: PathSegment) -> Self {
        self.0.push(segment);
        self
    }
}

impl fmt::Display for AstPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<document root>");
        }
        write!(f, "$")?;
        for segment in &self.0 {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// Source location carried by some AST nodes (line/column in the original
/// map source), used purely for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_path_displays_as_document_root() {
        assert_eq!(AstPath::root().to_string(), "<document root>");
    }

    #[test]
    fn path_renders_segments_in_order() {
        let path = AstPath::root()
            .push(PathSegment::Operation("GetUser".into()))
            .push(PathSegment::Field("statements"))
            .push(PathSegment::Index(2));
        assert_eq!(path.to_string(), "$operation(GetUser).statements[2]");
    }

    #[test]
    fn source_location_renders_line_colon_column() {
        let loc = SourceLocation { line: 4, column: 12 };
        assert_eq!(loc.to_string(), "4:12");
    }
}
