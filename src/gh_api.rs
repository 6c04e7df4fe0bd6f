//! Thin client over the GitHub REST API.
//!
//! Carries the bearer token and accept header, hands page fetches to the
//! paginated collector, and maps 404 on existence-style lookups to `false`
//! rather than an error. No retries, no rate-limit handling.

use anyhow::{Context as _, Result as AnyhowResult};
use chrono::{DateTime, Utc};
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::collector::{self, FetchError, DEFAULT_PAGE_SIZE};

const GITHUB_API: &str = "https://api.github.com";
const ACCEPT: &str = "application/vnd.github+json";

#[derive(Deserialize, Debug, Clone)]
pub struct Team {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Repo {
    pub name: String,
    pub full_name: String,
    pub default_branch: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Label {
    pub name: String,
}

#[derive(Deserialize, Debug)]
struct Event {
    #[serde(rename = "type")]
    kind: String,
    actor: Option<EventActor>,
}

#[derive(Deserialize, Debug)]
struct EventActor {
    login: String,
}

#[derive(Deserialize, Debug)]
struct CommitEntry {
    commit: CommitDetail,
}

#[derive(Deserialize, Debug)]
struct CommitDetail {
    author: Option<CommitAuthor>,
}

#[derive(Deserialize, Debug)]
struct CommitAuthor {
    name: String,
}

#[derive(Deserialize, Debug)]
struct CustomProperty {
    property_name: String,
    value: Option<Value>,
}

/// 2xx means the resource exists, 404 means it does not; anything else is
/// not a presence answer at all.
fn presence_from_status(status: StatusCode) -> Option<bool> {
    if status.is_success() {
        Some(true)
    } else if status == StatusCode::NOT_FOUND {
        Some(false)
    } else {
        None
    }
}

pub struct GhClient {
    client: Client,
    base_url: String,
    token: String,
}

impl GhClient {
    pub fn new(token: String) -> AnyhowResult<Self> {
        Self::with_base_url(token, GITHUB_API.to_string())
    }

    /// Point the client at a non-default API root (GitHub Enterprise, or a
    /// local stub in tests).
    pub fn with_base_url(token: String, base_url: String) -> AnyhowResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("gh-org-audit/", env!("CARGO_PKG_VERSION")))
            .build()
            .with_context(|| "Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .header(header::ACCEPT, ACCEPT)
    }

    async fn send(
        &self,
        path: &str,
        req: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, FetchError> {
        debug!(path, "sending request");
        req.send().await.map_err(|source| FetchError::Transport {
            path: path.to_string(),
            source,
        })
    }

    async fn status_error(path: &str, resp: reqwest::Response) -> FetchError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        FetchError::Status {
            path: path.to_string(),
            status,
            body,
        }
    }

    /// One page of a paginated listing.
    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<T>, FetchError> {
        let sep = if path.contains('?') { '&' } else { '?' };
        let paged = format!("{path}{sep}per_page={per_page}&page={page}");
        let resp = self
            .send(&paged, self.request(reqwest::Method::GET, &paged))
            .await?;
        if !resp.status().is_success() {
            return Err(Self::status_error(&paged, resp).await);
        }
        resp.json()
            .await
            .map_err(|source| FetchError::Transport { path: paged, source })
    }

    /// Fetch every page of `path` until the listing is exhausted.
    pub async fn list_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, FetchError> {
        collector::collect_pages(DEFAULT_PAGE_SIZE, |page, per_page| {
            self.get_page(path, page, per_page)
        })
        .await
    }

    /// GET a single resource; 404 becomes `None`.
    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, FetchError> {
        let resp = self
            .send(path, self.request(reqwest::Method::GET, path))
            .await?;
        match presence_from_status(resp.status()) {
            Some(true) => {
                let value = resp.json().await.map_err(|source| FetchError::Transport {
                    path: path.to_string(),
                    source,
                })?;
                Ok(Some(value))
            }
            Some(false) => Ok(None),
            None => Err(Self::status_error(path, resp).await),
        }
    }

    /// GET a resource purely for its presence; 404 becomes `false`.
    async fn exists(&self, path: &str) -> Result<bool, FetchError> {
        let resp = self
            .send(path, self.request(reqwest::Method::GET, path))
            .await?;
        match presence_from_status(resp.status()) {
            Some(present) => Ok(present),
            None => Err(Self::status_error(path, resp).await),
        }
    }

    async fn put_json(&self, path: &str, body: &Value) -> Result<(), FetchError> {
        let req = self.request(reqwest::Method::PUT, path).json(body);
        let resp = self.send(path, req).await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Self::status_error(path, resp).await)
        }
    }

    pub async fn org_teams(&self, org: &str) -> Result<Vec<Team>, FetchError> {
        self.list_all(&format!("/orgs/{org}/teams")).await
    }

    pub async fn team_repos(&self, org: &str, team_slug: &str) -> Result<Vec<Repo>, FetchError> {
        self.list_all(&format!("/orgs/{org}/teams/{team_slug}/repos"))
            .await
    }

    pub async fn org_repos(&self, org: &str) -> Result<Vec<Repo>, FetchError> {
        self.list_all(&format!("/orgs/{org}/repos")).await
    }

    pub async fn repo_labels(&self, full_name: &str) -> Result<Vec<Label>, FetchError> {
        self.list_all(&format!("/repos/{full_name}/labels")).await
    }

    /// Whether the branch carries a protection rule. 404 means unprotected.
    pub async fn branch_protected(
        &self,
        full_name: &str,
        branch: &str,
    ) -> Result<bool, FetchError> {
        self.exists(&format!("/repos/{full_name}/branches/{branch}/protection"))
            .await
    }

    /// Whether the repository has any rulesets configured. 404 means none.
    pub async fn has_rulesets(&self, full_name: &str) -> Result<bool, FetchError> {
        let rulesets: Option<Vec<Value>> = self
            .get_optional(&format!("/repos/{full_name}/rulesets"))
            .await?;
        Ok(rulesets.map_or(false, |r| !r.is_empty()))
    }

    pub async fn apply_branch_protection(
        &self,
        full_name: &str,
        branch: &str,
    ) -> Result<(), FetchError> {
        self.put_json(
            &format!("/repos/{full_name}/branches/{branch}/protection"),
            &protection_payload(),
        )
        .await
    }

    /// Actor of the first `CreateEvent` in the repository's event feed, if
    /// one is still within the feed's retention window.
    pub async fn repo_creator(&self, full_name: &str) -> Result<Option<String>, FetchError> {
        let events: Vec<Event> = self
            .get_optional(&format!("/repos/{full_name}/events"))
            .await?
            .unwrap_or_default();
        Ok(events
            .into_iter()
            .find(|e| e.kind == "CreateEvent")
            .and_then(|e| e.actor.map(|a| a.login)))
    }

    pub async fn last_commit_author(&self, full_name: &str) -> Result<Option<String>, FetchError> {
        let commits: Vec<CommitEntry> = self
            .get_optional(&format!("/repos/{full_name}/commits?per_page=1"))
            .await?
            .unwrap_or_default();
        Ok(commits
            .into_iter()
            .next()
            .and_then(|c| c.commit.author.map(|a| a.name)))
    }

    pub async fn has_file(&self, full_name: &str, file_path: &str) -> Result<bool, FetchError> {
        self.exists(&format!("/repos/{full_name}/contents/{file_path}"))
            .await
    }

    /// Value of the `Repo_Type` custom property, if the org defines one.
    pub async fn repo_type(&self, full_name: &str) -> Result<Option<String>, FetchError> {
        let properties: Vec<CustomProperty> = self
            .get_optional(&format!("/repos/{full_name}/properties/values"))
            .await?
            .unwrap_or_default();
        Ok(properties
            .into_iter()
            .find(|p| p.property_name == "Repo_Type")
            .and_then(|p| p.value)
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            }))
    }
}

/// The organization's standard protection rule for default branches.
pub fn protection_payload() -> Value {
    json!({
        "required_status_checks": {
            "strict": true,
            "contexts": ["scan / Gitleaks Secret Scanning"]
        },
        "enforce_admins": true,
        "required_conversation_resolution": true,
        "required_pull_request_reviews": {
            "dismiss_stale_reviews": true,
            "require_code_owner_reviews": true,
            "required_approving_review_count": 1
        },
        "restrictions": null,
        "allow_force_pushes": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_means_absent_not_error() {
        assert_eq!(presence_from_status(StatusCode::OK), Some(true));
        assert_eq!(presence_from_status(StatusCode::NO_CONTENT), Some(true));
        assert_eq!(presence_from_status(StatusCode::NOT_FOUND), Some(false));
        assert_eq!(presence_from_status(StatusCode::FORBIDDEN), None);
        assert_eq!(
            presence_from_status(StatusCode::INTERNAL_SERVER_ERROR),
            None
        );
    }

    #[test]
    fn protection_payload_matches_policy() {
        let payload = protection_payload();
        assert_eq!(payload["enforce_admins"], json!(true));
        assert_eq!(payload["allow_force_pushes"], json!(false));
        assert_eq!(payload["restrictions"], Value::Null);
        assert_eq!(
            payload["required_status_checks"]["contexts"][0],
            json!("scan / Gitleaks Secret Scanning")
        );
        assert_eq!(
            payload["required_pull_request_reviews"]["required_approving_review_count"],
            json!(1)
        );
    }

    #[test]
    fn team_listing_projects_expected_fields() {
        let body = r#"[
            {"id": 1, "name": "Platform Team", "slug": "platform",
             "description": "Owns the platform", "privacy": "closed", "permission": "pull"},
            {"id": 2, "name": "Infra", "slug": "infra", "description": null, "privacy": "closed"}
        ]"#;
        let teams: Vec<Team> = serde_json::from_str(body).unwrap();
        assert_eq!(teams[0].slug, "platform");
        assert_eq!(teams[1].description, None);
    }

    #[test]
    fn repo_listing_tolerates_missing_default_branch() {
        let body = r#"[
            {"id": 7, "name": "api", "full_name": "acme/api", "default_branch": "main",
             "created_at": "2026-07-30T12:00:00Z", "private": true},
            {"id": 8, "name": "empty", "full_name": "acme/empty"}
        ]"#;
        let repos: Vec<Repo> = serde_json::from_str(body).unwrap();
        assert_eq!(repos[0].default_branch.as_deref(), Some("main"));
        assert!(repos[1].default_branch.is_none());
        assert!(repos[1].created_at.is_none());
    }

    #[test]
    fn custom_property_value_may_be_non_string() {
        let body = r#"[
            {"property_name": "Repo_Type", "value": "service"},
            {"property_name": "Tier", "value": 2}
        ]"#;
        let props: Vec<CustomProperty> = serde_json::from_str(body).unwrap();
        assert_eq!(props[0].property_name, "Repo_Type");
        assert_eq!(props[0].value, Some(json!("service")));
    }
}
