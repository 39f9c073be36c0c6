//! Value types exchanged with the issue tracker.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A caller-supplied personal access token.
///
/// `Debug` output is redacted so the token never ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building request headers or persisting.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Parse an `Authorization` header value of the form `token <t>` or
    /// `Bearer <t>`. A bare token is accepted as well.
    pub fn from_authorization(header: &str) -> Option<Self> {
        let header = header.trim_start();
        let token = header
            .strip_prefix("token ")
            .or_else(|| header.strip_prefix("Bearer "))
            .or_else(|| header.strip_prefix("bearer "))
            .unwrap_or(header)
            .trim();
        if token.is_empty() || token.contains(' ') {
            return None;
        }
        Some(Self(token.to_owned()))
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Owner and name of a tracker repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepoRef<'a> {
    pub owner: &'a str,
    pub name: &'a str,
}

impl<'a> RepoRef<'a> {
    pub fn new(owner: &'a str, name: &'a str) -> Self {
        Self { owner, name }
    }
}

impl fmt::Display for RepoRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewRepository {
    pub name: String,
    pub description: String,
    pub private: bool,
}

/// A repository as created by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Name as normalized by the tracker (e.g. spaces become dashes).
    pub name: String,
    /// Browser URL of the repository.
    pub html_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewMilestone {
    pub title: String,
    pub description: String,
    /// Timestamp in `YYYY-MM-DDTHH:MM:SSZ` form, omitted when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_on: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    /// Number of the milestone the issue belongs to.
    pub milestone: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    Open,
    Closed,
}

/// State filter for list operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateFilter {
    Open,
    Closed,
    #[default]
    All,
}

impl StateFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::All => "all",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerMilestone {
    pub number: u64,
    pub title: String,
    pub state: ItemState,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub open_issues: u64,
    #[serde(default)]
    pub closed_issues: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerIssue {
    pub number: u64,
    pub title: String,
    pub state: ItemState,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
}

/// Failures from tracker operations.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The credential was rejected (HTTP 401).
    #[error("tracker rejected the credential")]
    Unauthorized,

    /// The request was refused with per-field messages.
    #[error("tracker rejected the request ({status}): {}", messages.join("; "))]
    Validation { status: u16, messages: Vec<String> },

    /// Any other non-success response.
    #[error("tracker returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("tracker request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected tracker response: {0}")]
    Decode(String),
}

impl TrackerError {
    /// HTTP status reported by the tracker, when there was a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Validation { status, .. } | Self::Remote { status, .. } => Some(*status),
            Self::Transport(_) | Self::Decode(_) => None,
        }
    }
}
