//! File commit requests and their validated form.
//!
//! [`FileCommitRequest`] mirrors caller input: every field is optional so a
//! missing field surfaces as a per-file [`ValidationError`] instead of
//! rejecting the whole request at parse time. [`FileCommitSpec`] is the
//! validated, immutable form handed to the contents client.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Branch used when a request does not name one.
pub const DEFAULT_BRANCH: &str = "main";

/// Placeholder reported for requests that carry no path.
pub const UNKNOWN_PATH: &str = "unknown";

/// Repository in `owner/name` form.
///
/// # Examples
///
/// ```
/// use file_committer_core::files::RepositoryName;
///
/// let repo: RepositoryName = "octocat/hello-world".parse().unwrap();
/// assert_eq!(repo.owner(), "octocat");
/// assert_eq!(repo.name(), "hello-world");
/// assert!("no-slash".parse::<RepositoryName>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryName {
    owner: String,
    name: String,
}

impl RepositoryName {
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepositoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepositoryName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidFormat {
            field: "repository".to_string(),
            message: format!("'{}' is not in owner/name form", s),
        };

        let (owner, name) = s.trim().split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

/// One file to commit, as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCommitRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl FileCommitRequest {
    /// Path for reporting, or `"unknown"` when absent.
    pub fn display_path(&self) -> &str {
        match self.path.as_deref() {
            Some(path) if !path.is_empty() => path,
            _ => UNKNOWN_PATH,
        }
    }

    /// Validate required fields and produce a [`FileCommitSpec`].
    ///
    /// Empty strings count as missing. An absent or empty branch defaults to
    /// [`DEFAULT_BRANCH`].
    ///
    /// # Errors
    ///
    /// - `ValidationError::MissingFields` naming every missing field
    /// - `ValidationError::InvalidFormat` if `repository` is not `owner/name`,
    ///   or `path` is empty after trimming slashes or has an empty, `.` or
    ///   `..` segment
    pub fn validate(&self) -> Result<FileCommitSpec, ValidationError> {
        let required = [
            ("repository", &self.repository),
            ("path", &self.path),
            ("content", &self.content),
            ("commitMessage", &self.commit_message),
        ];
        let missing: Vec<String> = required
            .iter()
            .filter(|(_, value)| value.as_deref().map_or(true, str::is_empty))
            .map(|(field, _)| field.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields { fields: missing });
        }

        let repository: RepositoryName = self.repository.as_deref().unwrap_or_default().parse()?;
        let path = self
            .path
            .as_deref()
            .unwrap_or_default()
            .trim_matches('/')
            .to_string();
        if path.is_empty() {
            return Err(ValidationError::InvalidFormat {
                field: "path".to_string(),
                message: "path must name a file".to_string(),
            });
        }
        if path
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(ValidationError::InvalidFormat {
                field: "path".to_string(),
                message: format!("'{}' contains an empty, '.' or '..' segment", path),
            });
        }

        let branch = match self.branch.as_deref() {
            Some(branch) if !branch.trim().is_empty() => branch.trim().to_string(),
            _ => DEFAULT_BRANCH.to_string(),
        };

        Ok(FileCommitSpec {
            repository,
            path,
            content: self.content.clone().unwrap_or_default(),
            commit_message: self.commit_message.clone().unwrap_or_default(),
            branch,
        })
    }
}

/// A validated file commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCommitSpec {
    repository: RepositoryName,
    path: String,
    content: String,
    commit_message: String,
    branch: String,
}

impl FileCommitSpec {
    /// Create a spec on the default branch.
    pub fn new(
        repository: RepositoryName,
        path: impl Into<String>,
        content: impl Into<String>,
        commit_message: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            path: path.into(),
            content: content.into(),
            commit_message: commit_message.into(),
            branch: DEFAULT_BRANCH.to_string(),
        }
    }

    /// Target a different branch.
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn repository(&self) -> &RepositoryName {
        &self.repository
    }

    /// Path of the file within the repository, without leading slash.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn commit_message(&self) -> &str {
        &self.commit_message
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }
}

#[cfg(test)]
#[path = "files_tests.rs"]
mod tests;
