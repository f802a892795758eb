//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for remote identifiers and
//! folder path segments. Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::path::{Component, Path};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// Remote identifiers
// ============================================================================

/// Prefix carried by identifiers fabricated in dry-run mode
const DRY_RUN_PREFIX: &str = "dry_run_";

/// Storage-service identifier of a remote file or folder
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(String);

impl RemoteId {
    /// Create a new RemoteId
    ///
    /// # Errors
    /// Returns error if the ID format is invalid
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.is_empty() {
            return Err(DomainError::InvalidRemoteId(
                "Remote ID cannot be empty".to_string(),
            ));
        }

        // Drive IDs are URL-safe base64-like strings
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(DomainError::InvalidRemoteId(format!(
                "Remote ID contains invalid characters: {id}"
            )));
        }

        Ok(Self(id))
    }

    /// Create the synthetic identifier handed out by dry-run mutations
    #[must_use]
    pub fn synthetic(sequence: u64) -> Self {
        Self(format!("{DRY_RUN_PREFIX}{sequence}"))
    }

    /// Returns true if this identifier was fabricated by a dry run
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.0.starts_with(DRY_RUN_PREFIX)
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RemoteId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteId> for String {
    fn from(id: RemoteId) -> Self {
        id.0
    }
}

// ============================================================================
// Path segments
// ============================================================================

/// Ordered folder names leading from a root folder to a destination folder
///
/// Built either from a local directory relative to a declared root, or from a
/// `/`-separated remote path given on the command line. Empty and `.`
/// components are skipped; `..` and absolute components are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PathSegments(Vec<String>);

impl PathSegments {
    /// The empty sequence (resolves to the starting folder itself)
    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Builds segments from already-split names
    ///
    /// # Errors
    /// Returns error if any name is empty, `.`, `..` or contains a `/`
    pub fn new<I, S>(names: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut segments = Vec::new();
        for name in names {
            let name = name.into();
            if name.is_empty() || name == "." || name == ".." || name.contains('/') {
                return Err(DomainError::InvalidPathSegment(name));
            }
            segments.push(name);
        }
        Ok(Self(segments))
    }

    /// Parses a `/`-separated remote path such as `scarecrow/site-a/2024`
    ///
    /// # Errors
    /// Returns error if the path contains a `..` component
    pub fn parse_remote(path: &str) -> Result<Self, DomainError> {
        Self::new(path.split('/').filter(|part| !part.is_empty() && *part != "."))
    }

    /// Builds segments from a relative local path
    ///
    /// # Errors
    /// Returns error on absolute paths, `..` components or non UTF-8 names
    pub fn from_relative_path(path: &Path) -> Result<Self, DomainError> {
        let mut names = Vec::new();
        for component in path.components() {
            match component {
                Component::CurDir => {}
                Component::Normal(name) => {
                    let name = name.to_str().ok_or_else(|| {
                        DomainError::InvalidPathSegment(name.to_string_lossy().into_owned())
                    })?;
                    names.push(name.to_string());
                }
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(DomainError::InvalidPathSegment(
                        path.display().to_string(),
                    ));
                }
            }
        }
        Self::new(names)
    }

    /// Segments of `dir` relative to `root`
    ///
    /// # Errors
    /// Returns [`DomainError::PathOutsideRoot`] if `dir` is not under `root`
    pub fn relative_to(dir: &Path, root: &Path) -> Result<Self, DomainError> {
        let relative = dir
            .strip_prefix(root)
            .map_err(|_| DomainError::PathOutsideRoot {
                path: dir.display().to_string(),
                root: root.display().to_string(),
            })?;
        Self::from_relative_path(relative)
    }

    /// Returns the segments as a slice
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Iterates over the segment names
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of segments
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no segments
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new sequence with `name` appended
    ///
    /// # Errors
    /// Returns error if `name` is not a valid segment
    pub fn child(&self, name: &str) -> Result<Self, DomainError> {
        let mut names = self.0.clone();
        names.push(name.to_string());
        Self::new(names)
    }
}

impl Display for PathSegments {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}
