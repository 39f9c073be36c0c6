//! In-memory [`Tracker`] that records every call and can be told to fail
//! specific operations.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use plansmith_core::plan::{Issue, Milestone, Plan};
use plansmith_core::tracker::{
    Credential, ItemState, NewIssue, NewMilestone, NewRepository, RepoRef, Repository,
    StateFilter, Tracker, TrackerError, TrackerIssue, TrackerMilestone,
};

pub const OWNER: &str = "octocat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateRepository(String),
    CurrentUser,
    CreateMilestone { title: String, due_on: Option<String> },
    CreateIssue { title: String, milestone: u64 },
    ListMilestones,
    ListIssues { milestone: u64 },
    CloseIssue(u64),
    CloseMilestone(u64),
}

/// Operations that should fail, keyed by item title where applicable.
#[derive(Debug, Default)]
pub struct Failures {
    pub repository: bool,
    pub identity: bool,
    pub milestones: HashSet<String>,
    pub issues: HashSet<String>,
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    repo: Option<String>,
    milestones: Vec<TrackerMilestone>,
    /// `(milestone number, issue)`.
    issues: Vec<(u64, TrackerIssue)>,
}

#[derive(Default)]
pub struct RecordingTracker {
    failures: Failures,
    state: Mutex<State>,
}

impl RecordingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(failures: Failures) -> Self {
        Self {
            failures,
            state: Mutex::default(),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn issues_in(&self, milestone: u64) -> Vec<TrackerIssue> {
        self.state
            .lock()
            .unwrap()
            .issues
            .iter()
            .filter(|(m, _)| *m == milestone)
            .map(|(_, issue)| issue.clone())
            .collect()
    }

    pub fn milestone(&self, number: u64) -> Option<TrackerMilestone> {
        self.state
            .lock()
            .unwrap()
            .milestones
            .iter()
            .find(|m| m.number == number)
            .cloned()
    }

    /// Add a milestone with issues in the given states, bypassing the call
    /// log. Returns the milestone number.
    pub fn seed_milestone(&self, title: &str, issue_states: &[ItemState]) -> u64 {
        let mut state = self.state.lock().unwrap();
        let number = state.milestones.len() as u64 + 1;
        state.milestones.push(milestone_record(number, title, None));
        for issue_state in issue_states {
            let issue_number = state.issues.len() as u64 + 1;
            let mut issue = issue_record(issue_number, &format!("{title} #{issue_number}"));
            if *issue_state == ItemState::Closed {
                issue.state = ItemState::Closed;
                issue.closed_at = Some(Utc::now());
            }
            state.issues.push((number, issue));
        }
        number
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

fn rejected(what: &str) -> TrackerError {
    TrackerError::Validation {
        status: 422,
        messages: vec![format!("{what} rejected")],
    }
}

fn milestone_record(number: u64, title: &str, due_on: Option<&str>) -> TrackerMilestone {
    TrackerMilestone {
        number,
        title: title.to_string(),
        state: ItemState::Open,
        description: None,
        due_on: due_on.and_then(|d| d.parse().ok()),
        open_issues: 0,
        closed_issues: 0,
    }
}

fn issue_record(number: u64, title: &str) -> TrackerIssue {
    TrackerIssue {
        number,
        title: title.to_string(),
        state: ItemState::Open,
        created_at: Utc::now(),
        closed_at: None,
    }
}

#[async_trait]
impl Tracker for RecordingTracker {
    async fn create_repository(
        &self,
        _credential: &Credential,
        repository: &NewRepository,
    ) -> Result<Repository, TrackerError> {
        self.record(Call::CreateRepository(repository.name.clone()));
        if self.failures.repository {
            return Err(TrackerError::Validation {
                status: 422,
                messages: vec!["name already exists on this account".to_string()],
            });
        }
        let name = repository.name.replace(' ', "-");
        self.state.lock().unwrap().repo = Some(name.clone());
        Ok(Repository {
            html_url: format!("https://github.com/{OWNER}/{name}"),
            name,
        })
    }

    async fn current_user(&self, _credential: &Credential) -> Result<String, TrackerError> {
        self.record(Call::CurrentUser);
        if self.failures.identity {
            return Err(TrackerError::Unauthorized);
        }
        Ok(OWNER.to_string())
    }

    async fn create_milestone(
        &self,
        _credential: &Credential,
        _repo: RepoRef<'_>,
        milestone: &NewMilestone,
    ) -> Result<u64, TrackerError> {
        self.record(Call::CreateMilestone {
            title: milestone.title.clone(),
            due_on: milestone.due_on.clone(),
        });
        if self.failures.milestones.contains(&milestone.title) {
            return Err(rejected("milestone"));
        }
        let mut state = self.state.lock().unwrap();
        let number = state.milestones.len() as u64 + 1;
        state.milestones.push(milestone_record(
            number,
            &milestone.title,
            milestone.due_on.as_deref(),
        ));
        Ok(number)
    }

    async fn create_issue(
        &self,
        _credential: &Credential,
        _repo: RepoRef<'_>,
        issue: &NewIssue,
    ) -> Result<u64, TrackerError> {
        self.record(Call::CreateIssue {
            title: issue.title.clone(),
            milestone: issue.milestone,
        });
        if self.failures.issues.contains(&issue.title) {
            return Err(rejected("issue"));
        }
        let mut state = self.state.lock().unwrap();
        let number = state.issues.len() as u64 + 1;
        state
            .issues
            .push((issue.milestone, issue_record(number, &issue.title)));
        Ok(number)
    }

    async fn list_milestones(
        &self,
        _credential: &Credential,
        _repo: RepoRef<'_>,
    ) -> Result<Vec<TrackerMilestone>, TrackerError> {
        self.record(Call::ListMilestones);
        Ok(self.state.lock().unwrap().milestones.clone())
    }

    async fn list_issues(
        &self,
        _credential: &Credential,
        _repo: RepoRef<'_>,
        milestone: u64,
        state: StateFilter,
    ) -> Result<Vec<TrackerIssue>, TrackerError> {
        self.record(Call::ListIssues { milestone });
        Ok(self
            .issues_in(milestone)
            .into_iter()
            .filter(|issue| match state {
                StateFilter::All => true,
                StateFilter::Open => issue.state == ItemState::Open,
                StateFilter::Closed => issue.state == ItemState::Closed,
            })
            .collect())
    }

    async fn close_issue(
        &self,
        _credential: &Credential,
        _repo: RepoRef<'_>,
        number: u64,
    ) -> Result<(), TrackerError> {
        self.record(Call::CloseIssue(number));
        let mut state = self.state.lock().unwrap();
        let (_, issue) = state
            .issues
            .iter_mut()
            .find(|(_, issue)| issue.number == number)
            .ok_or_else(|| TrackerError::Remote {
                status: 404,
                message: "Not Found".to_string(),
            })?;
        issue.state = ItemState::Closed;
        issue.closed_at = Some(Utc::now());
        Ok(())
    }

    async fn close_milestone(
        &self,
        _credential: &Credential,
        _repo: RepoRef<'_>,
        number: u64,
    ) -> Result<(), TrackerError> {
        self.record(Call::CloseMilestone(number));
        let mut state = self.state.lock().unwrap();
        let milestone = state
            .milestones
            .iter_mut()
            .find(|m| m.number == number)
            .ok_or_else(|| TrackerError::Remote {
                status: 404,
                message: "Not Found".to_string(),
            })?;
        milestone.state = ItemState::Closed;
        Ok(())
    }
}

pub fn credential() -> Credential {
    Credential::new("ghp_test")
}

pub fn milestone(title: &str, due_date: Option<&str>, issues: &[&str]) -> Milestone {
    Milestone {
        title: title.to_string(),
        description: format!("{title} description"),
        due_date: due_date.map(str::to_string),
        issues: issues
            .iter()
            .map(|t| Issue {
                title: t.to_string(),
                description: format!("1. Do {t}"),
            })
            .collect(),
    }
}

pub fn plan(milestones: Vec<Milestone>) -> Plan {
    Plan {
        summary: "A habit tracker".to_string(),
        milestones,
    }
}
