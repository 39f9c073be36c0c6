//! GitHub OAuth helpers used by the web sign-in flow.
//!
//! Both calls pass GitHub's JSON through untouched; the caller decides what
//! to do with `access_token` or an `error` field.

use std::fmt;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde_json::Value;
use tracing::debug;

use super::types::TrackerError;

const USER_AGENT: &str = concat!("plansmith/", env!("CARGO_PKG_VERSION"));

/// OAuth application settings plus the two endpoints it talks to.
#[derive(Clone)]
pub struct GitHubOAuth {
    http: reqwest::Client,
    oauth_url: String,
    api_url: String,
    client_id: String,
    client_secret: String,
}

impl fmt::Debug for GitHubOAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubOAuth")
            .field("oauth_url", &self.oauth_url)
            .field("api_url", &self.api_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish_non_exhaustive()
    }
}

impl GitHubOAuth {
    pub const DEFAULT_OAUTH_URL: &str = "https://github.com";

    pub fn new(
        oauth_url: impl Into<String>,
        api_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, TrackerError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            oauth_url: oauth_url.into().trim_end_matches('/').to_owned(),
            api_url: api_url.into().trim_end_matches('/').to_owned(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        })
    }

    /// Exchange an authorization `code` for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<Value, TrackerError> {
        debug!("exchanging oauth code");
        let response = self
            .http
            .post(format!("{}/login/oauth/access_token", self.oauth_url))
            .query(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
            ])
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        decode(response).await
    }

    /// Fetch the profile of the user behind `authorization`, which is
    /// forwarded verbatim as the `Authorization` header.
    pub async fn user_profile(&self, authorization: &str) -> Result<Value, TrackerError> {
        let response = self
            .http
            .get(format!("{}/user", self.api_url))
            .header(AUTHORIZATION, authorization)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode(response: reqwest::Response) -> Result<Value, TrackerError> {
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(TrackerError::Unauthorized);
    }
    let body: Value = response
        .json()
        .await
        .map_err(|e| TrackerError::Decode(e.to_string()))?;
    if !status.is_success() {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Unknown error")
            .to_string();
        return Err(TrackerError::Remote {
            status: status.as_u16(),
            message,
        });
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    fn oauth(server: &mockito::ServerGuard) -> GitHubOAuth {
        GitHubOAuth::new(server.url(), server.url(), "client-1", "shh").unwrap()
    }

    #[tokio::test]
    async fn exchange_code_passes_credentials_and_returns_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/login/oauth/access_token")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("client_id".into(), "client-1".into()),
                Matcher::UrlEncoded("client_secret".into(), "shh".into()),
                Matcher::UrlEncoded("code".into(), "abc".into()),
            ]))
            .match_header("accept", "application/json")
            .with_status(200)
            .with_body(r#"{"access_token":"gho_1","token_type":"bearer","scope":"repo"}"#)
            .create_async()
            .await;

        let body = oauth(&server).exchange_code("abc").await.unwrap();
        mock.assert_async().await;
        assert_eq!(body["access_token"], "gho_1");
    }

    #[tokio::test]
    async fn exchange_code_error_payload_is_passed_through() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/login/oauth/access_token")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"error":"bad_verification_code"}"#)
            .create_async()
            .await;

        let body = oauth(&server).exchange_code("stale").await.unwrap();
        assert_eq!(body, json!({ "error": "bad_verification_code" }));
    }

    #[tokio::test]
    async fn user_profile_forwards_authorization() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/user")
            .match_header("authorization", "Bearer gho_1")
            .with_status(200)
            .with_body(r#"{"login":"octocat","avatar_url":"https://example.test/a.png"}"#)
            .create_async()
            .await;

        let body = oauth(&server).user_profile("Bearer gho_1").await.unwrap();
        mock.assert_async().await;
        assert_eq!(body["login"], "octocat");
    }

    #[tokio::test]
    async fn user_profile_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/user")
            .with_status(401)
            .with_body(r#"{"message":"Bad credentials"}"#)
            .create_async()
            .await;

        let err = oauth(&server).user_profile("Bearer nope").await.unwrap_err();
        assert!(matches!(err, TrackerError::Unauthorized));
    }

    #[test]
    fn debug_redacts_client_secret() {
        let oauth = GitHubOAuth::new("http://localhost", "http://localhost", "client-1", "shh-123")
            .unwrap();
        let shown = format!("{oauth:?}");
        assert!(!shown.contains("shh-123"));
        assert!(shown.contains("client-1"));
    }
}
