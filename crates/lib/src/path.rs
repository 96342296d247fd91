//! Path types for addressing elements inside a provider.
//!
//! A path is an ordered sequence of element names serialized as `/`-joined text.
//! Each element is percent-encoded, so identifiers containing `/`, `:` or `%`
//! never collide with path or address syntax.
//!
//! # Core Types
//!
//! - [`Path`] - A parsed path holding decoded element names
//! - [`concat`], [`split`], [`split_last`] - Textual helpers that work on encoded path strings
//!
//! # Usage
//!
//! ```rust
//! use vab::path::{self, Path};
//!
//! let path = Path::root().push("plant").push("line/1");
//! assert_eq!(path.to_string(), "plant/line%2F1");
//!
//! let parsed: Path = "plant/line%2F1".parse()?;
//! assert_eq!(parsed.elements(), ["plant", "line/1"]);
//!
//! assert_eq!(path::concat("plant", "/line%2F1/"), "plant/line%2F1/");
//! # Ok::<(), vab::path::PathError>(())
//! ```

use std::{fmt, str::FromStr};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use thiserror::Error;

/// Separator between encoded path elements.
pub const SEPARATOR: char = '/';

/// Characters left untouched by element encoding (RFC 3986 unreserved set).
const ELEMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Error type for path parsing failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// An encoded element did not decode to valid UTF-8.
    #[error("Invalid path element '{element}': {reason}")]
    InvalidElement { element: String, reason: String },
}

/// Percent-encodes a single element name.
///
/// ```rust
/// # use vab::path::encode_element;
/// assert_eq!(encode_element("a/b"), "a%2Fb");
/// assert_eq!(encode_element("http://x"), "http%3A%2F%2Fx");
/// assert_eq!(encode_element("plain_name-1.0"), "plain_name-1.0");
/// ```
pub fn encode_element(element: &str) -> String {
    utf8_percent_encode(element, ELEMENT).to_string()
}

/// Decodes a single percent-encoded element name.
pub fn decode_element(encoded: &str) -> Result<String, PathError> {
    percent_decode_str(encoded)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| PathError::InvalidElement {
            element: encoded.to_string(),
            reason: e.to_string(),
        })
}

/// Splits an encoded path into its non-empty encoded elements.
///
/// Leading, trailing and repeated separators are ignored.
pub fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|element| !element.is_empty())
}

/// Splits an encoded path into its parent and its last encoded element.
///
/// Returns `None` for the root path.
///
/// ```rust
/// # use vab::path::split_last;
/// assert_eq!(split_last("a/b/c"), Some(("a/b", "c")));
/// assert_eq!(split_last("/c/"), Some(("", "c")));
/// assert_eq!(split_last(""), None);
/// ```
pub fn split_last(path: &str) -> Option<(&str, &str)> {
    let trimmed = path.trim_matches(SEPARATOR);
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rfind(SEPARATOR) {
        Some(idx) => Some((trimmed[..idx].trim_end_matches(SEPARATOR), &trimmed[idx + 1..])),
        None => Some(("", trimmed)),
    }
}

/// Returns true if the text addresses the root of a provider.
pub fn is_root(path: &str) -> bool {
    split(path).next().is_none()
}

/// Appends `path` to `prefix` textually.
///
/// Exactly one separator is placed between the two parts. Anything inside either
/// part is kept verbatim, which preserves the `//` marker of chained addresses
/// when the prefix is an address remainder.
///
/// ```rust
/// # use vab::path::concat;
/// assert_eq!(concat("a", "b/c"), "a/b/c");
/// assert_eq!(concat("a/", "/b"), "a/b");
/// assert_eq!(concat("", "b"), "b");
/// assert_eq!(concat("a", ""), "a");
/// assert_eq!(concat("http://host//local://x", "b"), "http://host//local://x/b");
/// ```
pub fn concat(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_end_matches(SEPARATOR);
    let path = path.trim_start_matches(SEPARATOR);
    match (prefix.is_empty(), path.is_empty()) {
        (true, _) => path.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{prefix}{SEPARATOR}{path}"),
    }
}

/// A parsed path: the decoded element names, root first.
///
/// The `Display` form is the normalized encoded text, so
/// `path.to_string().parse::<Path>()` yields the same path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    elements: Vec<String>,
}

impl Path {
    /// The root path (no elements).
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses encoded path text, decoding each element.
    pub fn parse(text: &str) -> Result<Self, PathError> {
        let elements = split(text)
            .map(decode_element)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { elements })
    }

    /// Builds a path from already decoded element names.
    pub fn from_elements<I, S>(elements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            elements: elements
                .into_iter()
                .map(Into::into)
                .filter(|e: &String| !e.is_empty())
                .collect(),
        }
    }

    /// Appends a decoded element name.
    ///
    /// Empty names are ignored, so building paths is infallible.
    pub fn push(mut self, element: impl Into<String>) -> Self {
        let element = element.into();
        if !element.is_empty() {
            self.elements.push(element);
        }
        self
    }

    /// Appends all elements of `other`.
    pub fn join(&self, other: &Path) -> Path {
        let mut elements = self.elements.clone();
        elements.extend(other.elements.iter().cloned());
        Path { elements }
    }

    /// The decoded element names.
    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    /// Returns true for the root path.
    pub fn is_root(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if the path has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The last element, if any.
    pub fn last(&self) -> Option<&str> {
        self.elements.last().map(String::as_str)
    }

    /// The parent path, or `None` for the root.
    pub fn parent(&self) -> Option<Path> {
        if self.elements.is_empty() {
            return None;
        }
        Some(Path {
            elements: self.elements[..self.elements.len() - 1].to_vec(),
        })
    }

    /// Returns true if `prefix` is an element-wise prefix of this path.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.elements.starts_with(&prefix.elements)
    }

    /// Removes an element-wise prefix, returning the remainder.
    pub fn strip_prefix(&self, prefix: &Path) -> Option<Path> {
        self.starts_with(prefix).then(|| Path {
            elements: self.elements[prefix.elements.len()..].to_vec(),
        })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            write!(f, "{}", encode_element(element))?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

impl TryFrom<&str> for Path {
    type Error = PathError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Path::parse(s)
    }
}
