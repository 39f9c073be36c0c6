//! Plan materialization: turn a [`Plan`] into a repository with milestones
//! and issues on the tracker.
//!
//! The workflow is strictly sequential:
//!
//! 1. create the repository (abort on failure)
//! 2. resolve the owner login (abort on failure, repository is kept)
//! 3. for each milestone in plan order, create it, then create each of its
//!    issues tagged with the new milestone number
//!
//! Milestone and issue failures are logged, recorded in the
//! [`MaterializeReport`], and skipped. A failed milestone skips its issues.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::due_date::normalize_due_date;
use crate::tracker::{Credential, NewIssue, NewMilestone, NewRepository, RepoRef, Tracker, TrackerError};

use super::{Milestone, Plan};

/// Where and how to create the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializeRequest {
    pub repo_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub private: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error("repository creation failed: {0}")]
    RepositoryCreation(#[source] TrackerError),

    #[error("could not resolve repository owner: {0}")]
    IdentityResolution(#[source] TrackerError),
}

/// Result of a single milestone or issue submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Created { number: u64 },
    Failed { error: String },
}

impl ItemOutcome {
    pub fn number(&self) -> Option<u64> {
        match self {
            Self::Created { number } => Some(*number),
            Self::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueReport {
    pub title: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MilestoneReport {
    pub title: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
    pub issues: Vec<IssueReport>,
    /// Issues never submitted because the milestone itself failed.
    pub skipped_issues: usize,
}

/// Per-item account of a materialization that got past repository
/// creation and identity resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterializeReport {
    pub repo_url: String,
    pub owner: String,
    /// Repository name as normalized by the tracker.
    pub repo: String,
    pub milestones: Vec<MilestoneReport>,
}

impl MaterializeReport {
    pub fn milestones_created(&self) -> usize {
        self.milestones
            .iter()
            .filter(|m| m.outcome.number().is_some())
            .count()
    }

    pub fn issues_created(&self) -> usize {
        self.milestones
            .iter()
            .flat_map(|m| &m.issues)
            .filter(|i| i.outcome.number().is_some())
            .count()
    }

    /// Milestones and issues that were attempted or skipped but not created.
    pub fn failures(&self) -> usize {
        self.milestones
            .iter()
            .map(|m| {
                let milestone = usize::from(m.outcome.number().is_none());
                let issues = m.issues.iter().filter(|i| i.outcome.number().is_none()).count();
                milestone + issues + m.skipped_issues
            })
            .sum()
    }
}

/// Materialize `plan` into a new repository owned by `credential`'s user.
///
/// Returns an error only when the repository cannot be created or its owner
/// cannot be resolved. Everything after that is best-effort and reported
/// item by item.
pub async fn materialize_plan(
    tracker: &dyn Tracker,
    credential: &Credential,
    request: &MaterializeRequest,
    plan: &Plan,
) -> Result<MaterializeReport, MaterializeError> {
    let repository = tracker
        .create_repository(
            credential,
            &NewRepository {
                name: request.repo_name.clone(),
                description: request.description.clone(),
                private: request.private,
            },
        )
        .await
        .map_err(MaterializeError::RepositoryCreation)?;
    info!(repo = %repository.name, url = %repository.html_url, "repository created");

    let owner = tracker
        .current_user(credential)
        .await
        .map_err(MaterializeError::IdentityResolution)?;

    let repo = RepoRef::new(&owner, &repository.name);
    let mut milestones = Vec::with_capacity(plan.milestones.len());
    for milestone in &plan.milestones {
        milestones.push(materialize_milestone(tracker, credential, repo, milestone).await);
    }

    let report = MaterializeReport {
        repo_url: repository.html_url,
        owner,
        repo: repository.name,
        milestones,
    };
    info!(
        owner = %report.owner,
        repo = %report.repo,
        milestones = report.milestones_created(),
        issues = report.issues_created(),
        failures = report.failures(),
        "plan materialized"
    );
    Ok(report)
}

async fn materialize_milestone(
    tracker: &dyn Tracker,
    credential: &Credential,
    repo: RepoRef<'_>,
    milestone: &Milestone,
) -> MilestoneReport {
    let new_milestone = NewMilestone {
        title: milestone.title.clone(),
        description: milestone.description.clone(),
        due_on: normalize_due_date(milestone.due_date.as_deref()),
    };

    let number = match tracker.create_milestone(credential, repo, &new_milestone).await {
        Ok(number) => number,
        Err(e) => {
            warn!(
                %repo,
                milestone = %milestone.title,
                skipped_issues = milestone.issues.len(),
                error = %e,
                "milestone creation failed; skipping its issues"
            );
            return MilestoneReport {
                title: milestone.title.clone(),
                outcome: ItemOutcome::Failed {
                    error: e.to_string(),
                },
                issues: Vec::new(),
                skipped_issues: milestone.issues.len(),
            };
        }
    };
    info!(%repo, milestone = %milestone.title, number, "milestone created");

    let mut issues = Vec::with_capacity(milestone.issues.len());
    for issue in &milestone.issues {
        let new_issue = NewIssue {
            title: issue.title.clone(),
            body: issue.description.clone(),
            milestone: number,
        };
        let outcome = match tracker.create_issue(credential, repo, &new_issue).await {
            Ok(issue_number) => ItemOutcome::Created {
                number: issue_number,
            },
            Err(e) => {
                warn!(%repo, issue = %issue.title, milestone = number, error = %e, "issue creation failed");
                ItemOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };
        issues.push(IssueReport {
            title: issue.title.clone(),
            outcome,
        });
    }

    MilestoneReport {
        title: milestone.title.clone(),
        outcome: ItemOutcome::Created { number },
        issues,
        skipped_issues: 0,
    }
}
