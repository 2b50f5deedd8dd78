//! Paths into the configuration tree.
//!
//! A [`ConfigPath`] is an ordered sequence of tokens, each naming one step
//! from the root of a configuration tree: a fixed node name, a tag value, or
//! (in the last position) a candidate leaf value.
//!
//! Tokens are never empty and never contain whitespace. Paths can be built
//! from a whitespace-separated string or from a token sequence:
//!
//! ```rust
//! use cfgmgmt::path::ConfigPath;
//!
//! let a = ConfigPath::parse("interfaces ethernet eth0")?;
//! let b = ConfigPath::parse(["interfaces", "ethernet", "eth0"])?;
//! assert_eq!(a, b);
//! assert!(a.has_prefix(&ConfigPath::parse("interfaces")?));
//!
//! // Token sequences are checked, not re-split
//! assert!(ConfigPath::parse(["interfaces", "eth 0"]).is_err());
//! # Ok::<(), cfgmgmt::path::PathError>(())
//! ```

use std::{fmt, ops::Index, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for malformed path arguments.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum PathError {
    /// A token in a token sequence is empty or contains whitespace.
    #[error("Invalid path token {token:?} at position {position}: {reason}")]
    InvalidToken {
        token: String,
        position: usize,
        reason: &'static str,
    },
}

impl PathError {
    /// Check if this error was caused by a malformed token.
    pub fn is_invalid_token(&self) -> bool {
        matches!(self, PathError::InvalidToken { .. })
    }
}

impl From<PathError> for crate::Error {
    fn from(err: PathError) -> Self {
        crate::Error::Path(err)
    }
}

fn check_token(token: &str, position: usize) -> Result<(), PathError> {
    if token.is_empty() {
        return Err(PathError::InvalidToken {
            token: token.to_string(),
            position,
            reason: "tokens cannot be empty",
        });
    }
    if token.chars().any(char::is_whitespace) {
        return Err(PathError::InvalidToken {
            token: token.to_string(),
            position,
            reason: "tokens cannot contain whitespace",
        });
    }
    Ok(())
}

/// An owned, immutable position in a configuration tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ConfigPath {
    tokens: Vec<String>,
}

impl ConfigPath {
    /// The empty path, addressing the root of a tree.
    pub fn root() -> Self {
        Self { tokens: Vec::new() }
    }

    /// Parses a path from a whitespace-separated string or a token sequence.
    pub fn parse(input: impl IntoConfigPath) -> Result<Self, PathError> {
        input.into_config_path()
    }

    /// Builds a path from a token sequence, validating every token.
    pub fn from_tokens<I, S>(tokens: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        for (position, token) in tokens.iter().enumerate() {
            check_token(token, position)?;
        }
        Ok(Self { tokens })
    }

    /// Splits a string on whitespace; runs of whitespace collapse.
    ///
    /// Never fails: whitespace splitting can only produce valid tokens.
    pub fn from_words(input: &str) -> Self {
        Self {
            tokens: input.split_whitespace().map(str::to_string).collect(),
        }
    }

    /// Parses the slash-separated form used by the `EDIT_LEVEL` variable.
    ///
    /// Empty segments are skipped, so `"/system/login/"` is `system login`.
    pub fn from_slash_separated(input: &str) -> Result<Self, PathError> {
        Self::from_tokens(input.split('/').filter(|segment| !segment.is_empty()))
    }

    /// Prepends an edit level to a caller-supplied path.
    pub fn concat(level: &ConfigPath, suffix: &ConfigPath) -> ConfigPath {
        level.join(suffix)
    }

    /// Returns a new path with `suffix` appended.
    pub fn join(&self, suffix: &ConfigPath) -> ConfigPath {
        let mut tokens = Vec::with_capacity(self.tokens.len() + suffix.tokens.len());
        tokens.extend_from_slice(&self.tokens);
        tokens.extend_from_slice(&suffix.tokens);
        ConfigPath { tokens }
    }

    /// Returns a new path with one more token.
    pub fn child(&self, token: impl Into<String>) -> Result<ConfigPath, PathError> {
        let token = token.into();
        check_token(&token, self.tokens.len())?;
        Ok(self.child_unchecked(token))
    }

    /// Appends a token that is known to be valid, such as a key taken
    /// from an existing tree.
    pub(crate) fn child_unchecked(&self, token: impl Into<String>) -> ConfigPath {
        let mut tokens = self.tokens.clone();
        tokens.push(token.into());
        ConfigPath { tokens }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    /// The final token, if any.
    pub fn last(&self) -> Option<&str> {
        self.tokens.last().map(String::as_str)
    }

    /// The path without its final token, or `None` at the root.
    pub fn parent(&self) -> Option<ConfigPath> {
        if self.tokens.is_empty() {
            return None;
        }
        Some(ConfigPath {
            tokens: self.tokens[..self.tokens.len() - 1].to_vec(),
        })
    }

    /// True if `prefix` is an initial segment of this path (or equal to it).
    pub fn has_prefix(&self, prefix: &ConfigPath) -> bool {
        self.tokens.starts_with(&prefix.tokens)
    }

    /// The remainder of this path after `prefix`.
    pub fn strip_prefix(&self, prefix: &ConfigPath) -> Option<ConfigPath> {
        self.tokens
            .strip_prefix(prefix.tokens.as_slice())
            .map(|rest| ConfigPath {
                tokens: rest.to_vec(),
            })
    }

    /// The first `len` tokens.
    pub fn truncated(&self, len: usize) -> ConfigPath {
        ConfigPath {
            tokens: self.tokens[..len.min(self.tokens.len())].to_vec(),
        }
    }

    /// Renders the path in the slash-separated `EDIT_LEVEL` form.
    pub fn to_slash_separated(&self) -> String {
        self.tokens.join("/")
    }
}

impl Index<usize> for ConfigPath {
    type Output = str;

    fn index(&self, index: usize) -> &str {
        &self.tokens[index]
    }
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens.join(" "))
    }
}

impl FromStr for ConfigPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(ConfigPath::from_words(s))
    }
}

impl TryFrom<Vec<String>> for ConfigPath {
    type Error = PathError;

    fn try_from(tokens: Vec<String>) -> Result<Self, Self::Error> {
        ConfigPath::from_tokens(tokens)
    }
}

impl From<ConfigPath> for Vec<String> {
    fn from(path: ConfigPath) -> Self {
        path.tokens
    }
}

impl<'a> IntoIterator for &'a ConfigPath {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

/// Conversion into a [`ConfigPath`].
///
/// Strings are split on whitespace; sequences are validated token by token.
pub trait IntoConfigPath {
    fn into_config_path(self) -> Result<ConfigPath, PathError>;
}

impl IntoConfigPath for ConfigPath {
    fn into_config_path(self) -> Result<ConfigPath, PathError> {
        Ok(self)
    }
}

impl IntoConfigPath for &ConfigPath {
    fn into_config_path(self) -> Result<ConfigPath, PathError> {
        Ok(self.clone())
    }
}

impl IntoConfigPath for &str {
    fn into_config_path(self) -> Result<ConfigPath, PathError> {
        Ok(ConfigPath::from_words(self))
    }
}

impl IntoConfigPath for String {
    fn into_config_path(self) -> Result<ConfigPath, PathError> {
        Ok(ConfigPath::from_words(&self))
    }
}

impl IntoConfigPath for &String {
    fn into_config_path(self) -> Result<ConfigPath, PathError> {
        Ok(ConfigPath::from_words(self))
    }
}

impl IntoConfigPath for &[&str] {
    fn into_config_path(self) -> Result<ConfigPath, PathError> {
        ConfigPath::from_tokens(self.iter().copied())
    }
}

impl IntoConfigPath for &[String] {
    fn into_config_path(self) -> Result<ConfigPath, PathError> {
        ConfigPath::from_tokens(self.iter().cloned())
    }
}

impl IntoConfigPath for Vec<&str> {
    fn into_config_path(self) -> Result<ConfigPath, PathError> {
        ConfigPath::from_tokens(self)
    }
}

impl IntoConfigPath for Vec<String> {
    fn into_config_path(self) -> Result<ConfigPath, PathError> {
        ConfigPath::from_tokens(self)
    }
}

impl<const N: usize> IntoConfigPath for [&str; N] {
    fn into_config_path(self) -> Result<ConfigPath, PathError> {
        ConfigPath::from_tokens(self)
    }
}

/// Builds a [`ConfigPath`] from string-like arguments.
///
/// Each argument is split on whitespace, so the macro never fails:
///
/// ```rust
/// use cfgmgmt::config_path;
///
/// let path = config_path!("interfaces", "ethernet eth0", "address");
/// assert_eq!(path.len(), 4);
/// assert_eq!(path.to_string(), "interfaces ethernet eth0 address");
/// assert!(config_path!().is_root());
/// ```
#[macro_export]
macro_rules! config_path {
    () => {
        $crate::path::ConfigPath::root()
    };

    ($($part:expr),+ $(,)?) => {{
        let mut words: Vec<String> = Vec::new();
        $(
            words.extend($part.to_string().split_whitespace().map(str::to_string));
        )+
        $crate::path::ConfigPath::from_words(&words.join(" "))
    }};
}
