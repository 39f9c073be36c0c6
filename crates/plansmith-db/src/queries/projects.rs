//! Database query functions for the `projects` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{NewProject, ProjectRecord, ProjectUpdate};

/// Failures from [`update_project`] that callers branch on.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("project {0} not found")]
    NotFound(Uuid),

    #[error("update must set at least one of title or description")]
    EmptyUpdate,

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

/// Insert a new project row. Returns the record with the store-assigned id
/// and creation time. Duplicate submissions produce duplicate rows.
pub async fn insert_project(pool: &PgPool, project: &NewProject) -> Result<ProjectRecord> {
    let record = sqlx::query_as::<_, ProjectRecord>(
        "INSERT INTO projects (username, credential, title, description, link) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING *",
    )
    .bind(&project.username)
    .bind(&project.credential)
    .bind(&project.title)
    .bind(&project.description)
    .bind(&project.link)
    .fetch_one(pool)
    .await
    .context("failed to insert project")?;

    Ok(record)
}

/// Fetch a project by its ID.
pub async fn get_project(pool: &PgPool, id: Uuid) -> Result<Option<ProjectRecord>> {
    let record = sqlx::query_as::<_, ProjectRecord>("SELECT * FROM projects WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch project")?;

    Ok(record)
}

/// List every project owned by `username`, newest first.
pub async fn list_projects_for_user(pool: &PgPool, username: &str) -> Result<Vec<ProjectRecord>> {
    let records = sqlx::query_as::<_, ProjectRecord>(
        "SELECT * FROM projects WHERE username = $1 ORDER BY created_at DESC",
    )
    .bind(username)
    .fetch_all(pool)
    .await
    .context("failed to list projects")?;

    Ok(records)
}

/// Apply a partial update to a project's title and/or description.
///
/// Fields left as `None` keep their stored value. An update with neither
/// field set is rejected before touching the database.
pub async fn update_project(
    pool: &PgPool,
    id: Uuid,
    update: &ProjectUpdate,
) -> Result<ProjectRecord, StoreError> {
    if update.is_empty() {
        return Err(StoreError::EmptyUpdate);
    }

    let record = sqlx::query_as::<_, ProjectRecord>(
        "UPDATE projects \
         SET title = COALESCE($2, title), description = COALESCE($3, description) \
         WHERE id = $1 \
         RETURNING *",
    )
    .bind(id)
    .bind(update.title.as_deref())
    .bind(update.description.as_deref())
    .fetch_optional(pool)
    .await
    .context("failed to update project")?;

    record.ok_or(StoreError::NotFound(id))
}
