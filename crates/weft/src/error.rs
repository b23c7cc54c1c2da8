use std::fmt;

use thiserror::Error;

// ── Position ──────────────────────────────────────────────────────────────

/// A 1-based line/column location in the markup source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }

    /// Map a byte offset into `src` to a line/column pair.
    pub(crate) fn from_offset(src: &str, offset: usize) -> Self {
        let mut end = offset.min(src.len());
        while !src.is_char_boundary(end) {
            end -= 1;
        }
        let before = &src[..end];
        let line = before.matches('\n').count() + 1;
        let col = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
        Self { line, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

// ── ParseError ────────────────────────────────────────────────────────────

/// What went wrong while turning markup into instructions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("no type `{name}` is registered for prefix `{prefix}`")]
    UnknownType { prefix: String, name: String },

    #[error("type `{type_name}` has no member `{token}`")]
    UnknownMember { type_name: String, token: String },

    #[error("malformed member token `{token}`")]
    MalformedMemberToken { token: String },

    #[error("the root should be an element, found {found}")]
    InvalidRootElement { found: String },

    #[error("unbalanced structure: {message}")]
    UnbalancedStructure { message: String },

    #[error("invalid property element `{name}`: {reason}")]
    InvalidPropertyElement { name: String, reason: String },

    #[error("{message}")]
    Syntax { message: String },
}

/// A markup parse error, with the source position when one is known.
///
/// Errors raised while folding an already-produced instruction stream carry
/// no position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub pos: Option<Position>,
}

impl ParseError {
    pub(crate) fn at(kind: ParseErrorKind, pos: Position) -> Self {
        Self { kind, pos: Some(pos) }
    }

    pub(crate) fn unplaced(kind: ParseErrorKind) -> Self {
        Self { kind, pos: None }
    }

    pub(crate) fn unbalanced(message: impl Into<String>) -> Self {
        Self::unplaced(ParseErrorKind::UnbalancedStructure { message: message.into() })
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pos {
            Some(pos) => write!(f, "markup parse error at {}: {}", pos, self.kind),
            None => write!(f, "markup parse error: {}", self.kind),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

// ── BuildError ────────────────────────────────────────────────────────────

/// A failure while instantiating or wiring the object graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("cannot convert `{raw}` to {target}")]
    ValueConversion { target: String, raw: String },

    #[error("no callback method `{name}` on the root instance")]
    UnresolvedCallback { name: String },

    #[error("`{name}` is not a member of enumeration `{target}`")]
    InvalidEnumValue { name: String, target: String },

    #[error("the name `{name}` is already registered in this namescope")]
    DuplicateName { name: String },

    #[error("member `{member}` expects {expected}, got {found}")]
    TypeMismatch { member: String, expected: &'static str, found: &'static str },

    #[error("type `{type_name}` has no constructor")]
    NotInstantiable { type_name: String },

    #[error("type `{type_name}` has no content member to receive nested content")]
    NoContentMember { type_name: String },

    #[error("member `{member}` already holds a value and is not a collection")]
    DuplicateContent { member: String },

    #[error("instance of `{type_name}` is already borrowed")]
    InstanceBorrowed { type_name: String },

    #[error("the target of callback `{name}` has been dropped")]
    CallbackTargetDropped { name: String },

    #[error("{0}")]
    Host(String),
}

// ── LoadError ─────────────────────────────────────────────────────────────

/// Any error that aborts a [`Loader::load`](crate::Loader::load) call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_from_offset_counts_lines_and_columns() {
        let src = "<A>\n  <B/>\n</A>";
        assert_eq!(Position::from_offset(src, 0), Position::new(1, 1));
        assert_eq!(Position::from_offset(src, 6), Position::new(2, 3));
        assert_eq!(Position::from_offset(src, src.len()), Position::new(3, 5));
    }

    #[test]
    fn position_from_offset_clamps_inside_multibyte_chars() {
        let src = "é<A/>";
        // offset 1 falls inside the two-byte `é`
        assert_eq!(Position::from_offset(src, 1), Position::new(1, 1));
    }

    #[test]
    fn parse_error_display_includes_position() {
        let err = ParseError::at(
            ParseErrorKind::InvalidRootElement { found: "text".into() },
            Position::new(2, 7),
        );
        assert_eq!(
            err.to_string(),
            "markup parse error at 2:7: the root should be an element, found text"
        );
        assert_eq!(
            ParseError::unbalanced("no root").to_string(),
            "markup parse error: unbalanced structure: no root"
        );
    }
}
