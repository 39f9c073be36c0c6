//! Read-back and progress operations built on [`Tracker`] primitives.

use serde::Serialize;
use tracing::info;

use super::trait_def::Tracker;
use super::types::{
    Credential, ItemState, RepoRef, StateFilter, TrackerError, TrackerIssue, TrackerMilestone,
};

/// Outcome of [`close_milestone_if_complete`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MilestoneClose {
    Closed,
    /// At least one issue is still open; the milestone was left untouched.
    Blocked { open_issues: Vec<u64> },
}

impl MilestoneClose {
    pub fn message(&self) -> String {
        match self {
            Self::Closed => "Milestone closed".to_string(),
            Self::Blocked { open_issues } => format!(
                "Milestone cannot be closed: {} open issue(s) remain",
                open_issues.len()
            ),
        }
    }
}

/// Close milestone `number` only when every issue attached to it is closed.
///
/// The issue list is read first; if anything is still open the result is
/// [`MilestoneClose::Blocked`] and no close request is sent.
pub async fn close_milestone_if_complete(
    tracker: &dyn Tracker,
    credential: &Credential,
    repo: RepoRef<'_>,
    number: u64,
) -> Result<MilestoneClose, TrackerError> {
    let issues = tracker
        .list_issues(credential, repo, number, StateFilter::All)
        .await?;

    let open_issues: Vec<u64> = issues
        .iter()
        .filter(|issue| issue.state == ItemState::Open)
        .map(|issue| issue.number)
        .collect();

    if !open_issues.is_empty() {
        info!(%repo, milestone = number, open = open_issues.len(), "milestone close blocked");
        return Ok(MilestoneClose::Blocked { open_issues });
    }

    tracker.close_milestone(credential, repo, number).await?;
    info!(%repo, milestone = number, "milestone closed");
    Ok(MilestoneClose::Closed)
}

/// A milestone together with its issues, as shown on a roadmap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MilestoneWithIssues {
    #[serde(flatten)]
    pub milestone: TrackerMilestone,
    pub issues: Vec<TrackerIssue>,
}

/// Every milestone of `repo` (all states) with every issue under it.
pub async fn fetch_roadmap(
    tracker: &dyn Tracker,
    credential: &Credential,
    repo: RepoRef<'_>,
) -> Result<Vec<MilestoneWithIssues>, TrackerError> {
    let milestones = tracker.list_milestones(credential, repo).await?;
    let mut roadmap = Vec::with_capacity(milestones.len());
    for milestone in milestones {
        let issues = tracker
            .list_issues(credential, repo, milestone.number, StateFilter::All)
            .await?;
        roadmap.push(MilestoneWithIssues { milestone, issues });
    }
    Ok(roadmap)
}
