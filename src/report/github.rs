use std::sync::Arc;

use tracing::{debug, info};

use super::enrich::{enrich_in_batches, EnrichedCollection, Enrichment};
use super::model::{CommitCountResponse, Repository};
use crate::client::error::ApiError;
use crate::client::pipeline::ApiClient;
use crate::client::request::PendingRequest;

/// Repository-report surface: list repositories for a user, then enrich the
/// list with per-repository commit counts. This boundary is public, so the
/// pipeline's credential attachment is a harmless no-op here.
#[derive(Clone)]
pub struct GitReportApi {
    client: Arc<ApiClient>,
    batch_size: usize,
}

impl GitReportApi {
    pub fn new(client: Arc<ApiClient>, batch_size: usize) -> Self {
        Self { client, batch_size }
    }

    /// List a user's repositories.
    pub async fn repositories(&self, username: &str) -> Result<Vec<Repository>, ApiError> {
        let response = self
            .client
            .execute(
                PendingRequest::get("/integrations/github/repos/").query("username", username),
            )
            .await?
            .error_for_status()?;
        response.json()
    }

    /// Commit count for one repository. Failures here are item-level
    /// diagnostics, never pipeline errors.
    pub async fn commit_count(
        &self,
        username: &str,
        owner: &str,
        repo: &str,
    ) -> anyhow::Result<u64> {
        let response = self
            .client
            .execute(
                PendingRequest::get("/integrations/github/repo-commits/")
                    .query("username", username)
                    .query("owner", owner)
                    .query("repo", repo),
            )
            .await?
            .error_for_status()?;
        let payload: CommitCountResponse = response.json()?;
        if !payload.success {
            anyhow::bail!("commit lookup reported failure for {}/{}", owner, repo);
        }
        Ok(payload.count)
    }

    /// Fetch the repository list and start enriching it with commit counts.
    ///
    /// The fanout runs in the background: the returned report shows partial
    /// results immediately, and `wait_settled` awaits the rest. Dropping the
    /// report abandons interest but lets in-flight lookups run out; their
    /// merges are idempotent and harmless.
    pub async fn report(&self, username: &str) -> Result<RepoReport, ApiError> {
        let repositories = self.repositories(username).await?;
        info!(
            "git report user={} repositories={}",
            username,
            repositories.len()
        );

        let counts = Arc::new(EnrichedCollection::new(repositories.iter().map(|r| r.id)));

        let api = self.clone();
        let user = username.to_string();
        let repos = repositories.clone();
        let fanout_counts = Arc::clone(&counts);
        tokio::spawn(async move {
            enrich_in_batches(
                &repos,
                api.batch_size,
                &fanout_counts,
                |repo| repo.id,
                |repo: Repository| {
                    let api = api.clone();
                    let user = user.clone();
                    async move { api.commit_count(&user, &repo.owner.login, &repo.name).await }
                },
            )
            .await;
            debug!("git report fanout settled user={}", user);
        });

        Ok(RepoReport {
            repositories,
            counts,
        })
    }
}

/// A repository report whose commit counts fill in as lookups settle.
pub struct RepoReport {
    pub repositories: Vec<Repository>,
    counts: Arc<EnrichedCollection<u64, u64>>,
}

impl RepoReport {
    /// Commit-count state for one repository id; `None` for an id outside
    /// this report.
    pub fn commit_count(&self, repo_id: u64) -> Option<Enrichment<u64>> {
        self.counts.get(&repo_id)
    }

    pub fn is_settled(&self) -> bool {
        self.counts.is_settled()
    }

    /// Wait until every repository's lookup has settled.
    pub async fn wait_settled(&self) {
        self.counts.wait_settled().await
    }

    pub fn counts(&self) -> &EnrichedCollection<u64, u64> {
        &self.counts
    }
}
