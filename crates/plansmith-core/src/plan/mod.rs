//! Project plans: generation from a description, materialization into a
//! tracker, and recording of the resulting project.

pub mod generate;
pub mod materialize;
pub mod service;

use serde::{Deserialize, Serialize};

pub use generate::{GenerateError, GenerationRequest, build_tool_request, generate_plan};
pub use materialize::{
    IssueReport, ItemOutcome, MaterializeError, MaterializeReport, MaterializeRequest,
    MilestoneReport, materialize_plan,
};
pub use service::{MaterializedProject, ServiceError, materialize_and_record};

/// A generated project plan: a summary plus milestones in delivery order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub summary: String,
    pub milestones: Vec<Milestone>,
}

/// A plan-side milestone. `due_date` is free text; anything that is not a
/// `YYYY-MM-DD` date is dropped when the milestone is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub due_date: Option<String>,
    pub issues: Vec<Issue>,
}

/// A plan-side issue. The description holds step-by-step instructions and
/// becomes the issue body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub title: String,
    pub description: String,
}

impl Plan {
    /// Total number of issues across all milestones.
    pub fn issue_count(&self) -> usize {
        self.milestones.iter().map(|m| m.issues.len()).sum()
    }
}
