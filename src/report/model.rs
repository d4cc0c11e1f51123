use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RepoOwner {
    pub login: String,
    pub avatar_url: String,
}

/// One repository as returned by the repository-listing boundary.
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub html_url: String,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub watchers_count: u64,
    #[serde(default)]
    pub language: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub owner: RepoOwner,
}

/// Wire shape of the per-repository commit-count lookup.
#[derive(Debug, Deserialize)]
pub struct CommitCountResponse {
    pub success: bool,
    #[serde(default)]
    pub count: u64,
}
