//! Issue-tracker integration.
//!
//! The [`Tracker`] trait abstracts the handful of GitHub operations the
//! materializer and the progress endpoints need. [`GitHubClient`] talks to
//! the REST API; [`GitHubOAuth`] covers the sign-in helpers, which are not
//! part of the trait.

pub mod github;
pub mod oauth;
pub mod progress;
pub mod trait_def;
pub mod types;

pub use github::GitHubClient;
pub use oauth::GitHubOAuth;
pub use progress::{MilestoneClose, MilestoneWithIssues, close_milestone_if_complete, fetch_roadmap};
pub use trait_def::Tracker;
pub use types::{
    Credential, ItemState, NewIssue, NewMilestone, NewRepository, RepoRef, Repository,
    StateFilter, TrackerError, TrackerIssue, TrackerMilestone,
};
