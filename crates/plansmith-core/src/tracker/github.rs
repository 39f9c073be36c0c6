//! GitHub REST v3 implementation of [`Tracker`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;

use super::trait_def::Tracker;
use super::types::{
    Credential, NewIssue, NewMilestone, NewRepository, RepoRef, Repository, StateFilter,
    TrackerError, TrackerIssue, TrackerMilestone,
};

const USER_AGENT: &str = concat!("plansmith/", env!("CARGO_PKG_VERSION"));
const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const DEFAULT_PAGE_SIZE: usize = 100;

/// Stateless GitHub client. The credential is supplied per call.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    page_size: usize,
}

impl GitHubClient {
    pub const DEFAULT_API_URL: &str = "https://api.github.com";

    pub fn new(api_url: impl Into<String>) -> Result<Self, TrackerError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_owned(),
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    /// Override the `per_page` used by list operations.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, DEFAULT_PAGE_SIZE);
        self
    }

    fn request(&self, method: Method, path: &str, credential: &Credential) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_url, path))
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(AUTHORIZATION, format!("token {}", credential.expose()))
    }

    /// GET every page of a list endpoint.
    async fn get_all<T: DeserializeOwned>(
        &self,
        credential: &Credential,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, TrackerError> {
        let mut items = Vec::new();
        for page in 1u32.. {
            let batch: Vec<T> = send_json(
                self.request(Method::GET, path, credential)
                    .query(query)
                    .query(&[
                        ("per_page", self.page_size.to_string()),
                        ("page", page.to_string()),
                    ]),
            )
            .await?;
            let last_page = batch.len() < self.page_size;
            items.extend(batch);
            if last_page {
                break;
            }
        }
        Ok(items)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct Numbered {
    number: u64,
}

#[derive(Deserialize)]
struct User {
    login: String,
}

#[derive(Deserialize)]
struct WireIssue {
    #[serde(flatten)]
    issue: TrackerIssue,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Vec<FieldError>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FieldError {
    Text(String),
    Detail {
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        field: Option<String>,
        #[serde(default)]
        code: Option<String>,
    },
}

impl FieldError {
    fn describe(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Detail {
                message: Some(message),
                ..
            } => message.clone(),
            Self::Detail { field, code, .. } => [field.as_deref(), code.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

// ---------------------------------------------------------------------------
// Response handling
// ---------------------------------------------------------------------------

async fn check_status(response: Response) -> Result<Response, TrackerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(TrackerError::Unauthorized);
    }
    let body: ErrorBody = response.json().await.unwrap_or_default();
    Err(error_from_body(status.as_u16(), body))
}

fn error_from_body(status: u16, body: ErrorBody) -> TrackerError {
    let messages: Vec<String> = body
        .errors
        .iter()
        .map(FieldError::describe)
        .filter(|m| !m.is_empty())
        .collect();
    if !messages.is_empty() {
        return TrackerError::Validation { status, messages };
    }
    TrackerError::Remote {
        status,
        message: body.message.unwrap_or_else(|| "Unknown error".to_string()),
    }
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, TrackerError> {
    let response = check_status(request.send().await?).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| TrackerError::Decode(e.to_string()))
}

async fn send_discarding_body(request: RequestBuilder) -> Result<(), TrackerError> {
    check_status(request.send().await?).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tracker implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl Tracker for GitHubClient {
    async fn create_repository(
        &self,
        credential: &Credential,
        repository: &NewRepository,
    ) -> Result<Repository, TrackerError> {
        debug!(name = %repository.name, private = repository.private, "creating repository");
        let body = json!({
            "name": repository.name,
            "description": repository.description,
            "private": repository.private,
            "auto_init": true,
        });
        send_json(
            self.request(Method::POST, "/user/repos", credential)
                .json(&body),
        )
        .await
    }

    async fn current_user(&self, credential: &Credential) -> Result<String, TrackerError> {
        let user: User = send_json(self.request(Method::GET, "/user", credential)).await?;
        Ok(user.login)
    }

    async fn create_milestone(
        &self,
        credential: &Credential,
        repo: RepoRef<'_>,
        milestone: &NewMilestone,
    ) -> Result<u64, TrackerError> {
        debug!(%repo, title = %milestone.title, "creating milestone");
        let path = format!("/repos/{}/{}/milestones", repo.owner, repo.name);
        let created: Numbered =
            send_json(self.request(Method::POST, &path, credential).json(milestone)).await?;
        Ok(created.number)
    }

    async fn create_issue(
        &self,
        credential: &Credential,
        repo: RepoRef<'_>,
        issue: &NewIssue,
    ) -> Result<u64, TrackerError> {
        debug!(%repo, title = %issue.title, milestone = issue.milestone, "creating issue");
        let path = format!("/repos/{}/{}/issues", repo.owner, repo.name);
        let created: Numbered =
            send_json(self.request(Method::POST, &path, credential).json(issue)).await?;
        Ok(created.number)
    }

    async fn list_milestones(
        &self,
        credential: &Credential,
        repo: RepoRef<'_>,
    ) -> Result<Vec<TrackerMilestone>, TrackerError> {
        let path = format!("/repos/{}/{}/milestones", repo.owner, repo.name);
        let mut milestones: Vec<TrackerMilestone> = self
            .get_all(credential, &path, &[("state", "all".to_string())])
            .await?;
        // Creation order, which is plan order for materialized repositories.
        milestones.sort_by_key(|m| m.number);
        Ok(milestones)
    }

    async fn list_issues(
        &self,
        credential: &Credential,
        repo: RepoRef<'_>,
        milestone: u64,
        state: StateFilter,
    ) -> Result<Vec<TrackerIssue>, TrackerError> {
        let path = format!("/repos/{}/{}/issues", repo.owner, repo.name);
        let issues: Vec<WireIssue> = self
            .get_all(
                credential,
                &path,
                &[
                    ("milestone", milestone.to_string()),
                    ("state", state.as_str().to_string()),
                    ("direction", "asc".to_string()),
                ],
            )
            .await?;
        Ok(issues
            .into_iter()
            .filter(|w| w.pull_request.is_none())
            .map(|w| w.issue)
            .collect())
    }

    async fn close_issue(
        &self,
        credential: &Credential,
        repo: RepoRef<'_>,
        number: u64,
    ) -> Result<(), TrackerError> {
        let path = format!("/repos/{}/{}/issues/{number}", repo.owner, repo.name);
        send_discarding_body(
            self.request(Method::PATCH, &path, credential)
                .json(&json!({ "state": "closed" })),
        )
        .await
    }

    async fn close_milestone(
        &self,
        credential: &Credential,
        repo: RepoRef<'_>,
        number: u64,
    ) -> Result<(), TrackerError> {
        let path = format!("/repos/{}/{}/milestones/{number}", repo.owner, repo.name);
        send_discarding_body(
            self.request(Method::PATCH, &path, credential)
                .json(&json!({ "state": "closed" })),
        )
        .await
    }
}
