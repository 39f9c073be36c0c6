//! Materialize a plan and record the resulting project in one step.

use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};

use plansmith_db::models::{NewProject, ProjectRecord};
use plansmith_db::queries::projects;

use crate::tracker::{Credential, Tracker};

use super::materialize::{MaterializeError, MaterializeReport, MaterializeRequest, materialize_plan};
use super::Plan;

#[derive(Debug, Clone, Serialize)]
pub struct MaterializedProject {
    pub report: MaterializeReport,
    pub project: ProjectRecord,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    /// The repository and its items exist; only the record is missing.
    #[error(
        "repository {} created but the project record could not be saved: {source:#}",
        .report.repo_url
    )]
    Store {
        report: Box<MaterializeReport>,
        source: anyhow::Error,
    },
}

/// Run [`materialize_plan`] and, once the repository exists, insert a
/// [`ProjectRecord`] owned by the resolved tracker user.
///
/// The record is written even when some milestones or issues failed; the
/// report says which.
pub async fn materialize_and_record(
    pool: &PgPool,
    tracker: &dyn Tracker,
    credential: &Credential,
    request: &MaterializeRequest,
    plan: &Plan,
) -> Result<MaterializedProject, ServiceError> {
    let report = materialize_plan(tracker, credential, request, plan).await?;

    let inserted = projects::insert_project(
        pool,
        &NewProject {
            username: report.owner.clone(),
            credential: credential.expose().to_string(),
            title: report.repo.clone(),
            description: request.description.clone(),
            link: report.repo_url.clone(),
        },
    )
    .await;
    let project = match inserted {
        Ok(project) => project,
        Err(source) => {
            warn!(repo_url = %report.repo_url, "project record not saved: {source:#}");
            return Err(ServiceError::Store {
                report: Box::new(report),
                source,
            });
        }
    };
    info!(project_id = %project.id, username = %project.username, "project recorded");

    Ok(MaterializedProject { report, project })
}
