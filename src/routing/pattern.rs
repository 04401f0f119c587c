//! Path patterns with named capture placeholders.
//!
//! # Grammar
//! ```text
//! /api/:path*          literal "api", then zero or more captured segments
//! /users/:id           literal "users", then exactly one captured segment
//! /static/:file+       literal "static", then one or more captured segments
//! ```
//!
//! # Design Decisions
//! - Literals are matched case-sensitively
//! - Catch-all placeholders (`*`, `+`) must be the last segment
//! - Captured values are kept raw; percent-encoding is never decoded
//! - A single trailing slash on the inbound path is ignored

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors produced while parsing or rendering a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("pattern must start with '/': {0:?}")]
    NotAbsolute(String),

    #[error("placeholder in {pattern:?} has an invalid name {name:?}")]
    InvalidName { pattern: String, name: String },

    #[error("placeholder :{name} appears more than once in {pattern:?}")]
    DuplicateName { pattern: String, name: String },

    #[error("catch-all :{name} must be the last segment of {pattern:?}")]
    CatchAllNotLast { pattern: String, name: String },

    #[error("no value captured for placeholder :{0}")]
    MissingCapture(String),
}

/// How many segments a placeholder consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    /// `:name`
    One,
    /// `:name*`
    ZeroOrMore,
    /// `:name+`
    OneOrMore,
}

/// A single `/`-delimited piece of a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder { name: String, repeat: Repeat },
}

/// Values captured by a successful match, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    values: Vec<(String, String)>,
}

impl Captures {
    /// Look up a captured value by placeholder name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn push(&mut self, name: &str, value: String) {
        self.values.push((name.to_string(), value));
    }
}

/// A parsed path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// The pattern exactly as it was written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholders in declaration order, with their repeat kind.
    pub fn placeholders(&self) -> impl Iterator<Item = (&str, Repeat)> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder { name, repeat } => Some((name.as_str(), *repeat)),
            Segment::Literal(_) => None,
        })
    }

    /// Match a request path (no query string) against this pattern.
    ///
    /// One trailing slash is dropped before matching and is not part of any
    /// capture, so `/api/users/` captures `users` under `/api/:path*` and the
    /// rendered destination has no trailing slash.
    pub fn match_path(&self, path: &str) -> Option<Captures> {
        let trimmed = path.strip_prefix('/')?;
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
        let parts: Vec<&str> = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('/').collect()
        };

        let mut captures = Captures::default();
        let mut idx = 0;

        for segment in &self.segments {
            match segment {
                Segment::Literal(lit) => {
                    if parts.get(idx) != Some(&lit.as_str()) {
                        return None;
                    }
                    idx += 1;
                }
                Segment::Placeholder { name, repeat: Repeat::One } => {
                    let part = parts.get(idx).filter(|p| !p.is_empty())?;
                    captures.push(name, part.to_string());
                    idx += 1;
                }
                Segment::Placeholder { name, repeat } => {
                    let rest = &parts[idx.min(parts.len())..];
                    if *repeat == Repeat::OneOrMore && rest.is_empty() {
                        return None;
                    }
                    captures.push(name, rest.join("/"));
                    idx = parts.len();
                }
            }
        }

        if idx == parts.len() {
            Some(captures)
        } else {
            None
        }
    }

    /// Captures with a one-segment stand-in value for every placeholder.
    pub(crate) fn sample_captures(&self) -> Captures {
        let mut captures = Captures::default();
        for (name, _) in self.placeholders() {
            captures.push(name, "x".to_string());
        }
        captures
    }

    /// Render this pattern as a path, substituting captured values.
    ///
    /// Empty catch-all captures are dropped, so a template that ends up with
    /// no segments renders as `/`.
    pub fn render(&self, captures: &Captures) -> Result<String, PatternError> {
        let mut parts: Vec<&str> = Vec::with_capacity(self.segments.len());

        for segment in &self.segments {
            match segment {
                Segment::Literal(lit) => parts.push(lit),
                Segment::Placeholder { name, .. } => {
                    let value = captures
                        .get(name)
                        .ok_or_else(|| PatternError::MissingCapture(name.clone()))?;
                    if !value.is_empty() {
                        parts.push(value);
                    }
                }
            }
        }

        Ok(format!("/{}", parts.join("/")))
    }
}

impl FromStr for PathPattern {
    type Err = PatternError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let body = raw
            .strip_prefix('/')
            .ok_or_else(|| PatternError::NotAbsolute(raw.to_string()))?;
        let body = body.strip_suffix('/').unwrap_or(body);

        let mut segments = Vec::new();
        if !body.is_empty() {
            for piece in body.split('/') {
                segments.push(parse_segment(raw, piece)?);
            }
        }

        let mut seen: Vec<&str> = Vec::new();
        for (i, segment) in segments.iter().enumerate() {
            if let Segment::Placeholder { name, repeat } = segment {
                if seen.contains(&name.as_str()) {
                    return Err(PatternError::DuplicateName {
                        pattern: raw.to_string(),
                        name: name.clone(),
                    });
                }
                seen.push(name);

                if *repeat != Repeat::One && i + 1 != segments.len() {
                    return Err(PatternError::CatchAllNotLast {
                        pattern: raw.to_string(),
                        name: name.clone(),
                    });
                }
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_segment(pattern: &str, piece: &str) -> Result<Segment, PatternError> {
    let Some(declared) = piece.strip_prefix(':') else {
        return Ok(Segment::Literal(piece.to_string()));
    };

    let (name, repeat) = if let Some(name) = declared.strip_suffix('*') {
        (name, Repeat::ZeroOrMore)
    } else if let Some(name) = declared.strip_suffix('+') {
        (name, Repeat::OneOrMore)
    } else {
        (declared, Repeat::One)
    };

    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(PatternError::InvalidName {
            pattern: pattern.to_string(),
            name: name.to_string(),
        });
    }

    Ok(Segment::Placeholder {
        name: name.to_string(),
        repeat,
    })
}
