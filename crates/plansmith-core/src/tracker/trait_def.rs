//! The `Tracker` trait: the operations plansmith performs against an
//! issue tracker.
//!
//! [`super::GitHubClient`] is the production implementation. The trait is
//! object-safe so workflows take `&dyn Tracker` and tests can substitute a
//! recording fake.

use async_trait::async_trait;

use super::types::{
    Credential, NewIssue, NewMilestone, NewRepository, RepoRef, Repository, StateFilter,
    TrackerError, TrackerIssue, TrackerMilestone,
};

/// Issue-tracker operations. Every call is a single outbound request made
/// with the caller's credential; none of them retry.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// Create a repository owned by the credential's user.
    async fn create_repository(
        &self,
        credential: &Credential,
        repository: &NewRepository,
    ) -> Result<Repository, TrackerError>;

    /// Resolve the login of the user the credential belongs to.
    ///
    /// An invalid or expired credential yields [`TrackerError::Unauthorized`].
    async fn current_user(&self, credential: &Credential) -> Result<String, TrackerError>;

    /// Create a milestone and return its tracker-assigned number.
    async fn create_milestone(
        &self,
        credential: &Credential,
        repo: RepoRef<'_>,
        milestone: &NewMilestone,
    ) -> Result<u64, TrackerError>;

    /// Create an issue and return its tracker-assigned number.
    async fn create_issue(
        &self,
        credential: &Credential,
        repo: RepoRef<'_>,
        issue: &NewIssue,
    ) -> Result<u64, TrackerError>;

    /// List every milestone of the repository, open or closed.
    async fn list_milestones(
        &self,
        credential: &Credential,
        repo: RepoRef<'_>,
    ) -> Result<Vec<TrackerMilestone>, TrackerError>;

    /// List the issues attached to a milestone.
    async fn list_issues(
        &self,
        credential: &Credential,
        repo: RepoRef<'_>,
        milestone: u64,
        state: StateFilter,
    ) -> Result<Vec<TrackerIssue>, TrackerError>;

    async fn close_issue(
        &self,
        credential: &Credential,
        repo: RepoRef<'_>,
        number: u64,
    ) -> Result<(), TrackerError>;

    /// Close a milestone unconditionally. Callers wanting the "all issues
    /// closed first" rule use [`super::close_milestone_if_complete`].
    async fn close_milestone(
        &self,
        credential: &Credential,
        repo: RepoRef<'_>,
        number: u64,
    ) -> Result<(), TrackerError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn Tracker) {}
};
