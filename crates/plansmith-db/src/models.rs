use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A tracker project created through plansmith.
///
/// The credential is stored so later tracker calls can be made on the
/// owner's behalf, but it is never serialized into API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ProjectRecord {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub credential: String,
    pub title: String,
    pub description: String,
    /// Tracker repository URL.
    pub link: String,
    pub created_at: DateTime<Utc>,
}

/// Fields required to insert a [`ProjectRecord`].
#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
    pub username: String,
    pub credential: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub link: String,
}

/// Partial update for a [`ProjectRecord`]. Only title and description are
/// mutable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProjectUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl ProjectUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}
