use std::sync::Arc;

use super::model::{DashboardStats, Envelope, Task, TaskDraft, TaskFilter, TaskPage, TaskStatus};
use crate::client::error::ApiError;
use crate::client::pipeline::ApiClient;
use crate::client::request::PendingRequest;

/// Task CRUD and analytics, all through the credentialed pipeline.
pub struct TasksApi {
    client: Arc<ApiClient>,
}

impl TasksApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// List tasks, optionally filtered by status and a search term.
    pub async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, ApiError> {
        let mut request = PendingRequest::get("/tasks/");
        if let Some(status) = filter.status {
            request = request.query("status", status.as_str());
        }
        if let Some(search) = &filter.search {
            request = request.query("search", search.clone());
        }
        let response = self.client.execute(request).await?.error_for_status()?;
        let page: TaskPage = response.json()?;
        Ok(page.results)
    }

    pub async fn create(&self, draft: &TaskDraft) -> Result<Task, ApiError> {
        let response = self
            .client
            .execute(PendingRequest::post("/tasks/").json(draft)?)
            .await?
            .error_for_status()?;
        response.json()
    }

    pub async fn update(&self, id: &str, draft: &TaskDraft) -> Result<Task, ApiError> {
        let response = self
            .client
            .execute(PendingRequest::put(format!("/tasks/{}/", id)).json(draft)?)
            .await?
            .error_for_status()?;
        response.json()
    }

    /// Partial update of just the status (the mark-completed shortcut).
    pub async fn set_status(&self, id: &str, status: TaskStatus) -> Result<Task, ApiError> {
        let body = serde_json::json!({ "status": status });
        let response = self
            .client
            .execute(PendingRequest::patch(format!("/tasks/{}/", id)).json(&body)?)
            .await?
            .error_for_status()?;
        response.json()
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .execute(PendingRequest::delete(format!("/tasks/{}/", id)))
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Trigger the reminder email for a task.
    pub async fn send_reminder(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .execute(PendingRequest::post(format!("/tasks/{}/send-reminder/", id)))
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// The dashboard aggregate of status, priority, and trend summaries.
    pub async fn dashboard(&self) -> Result<DashboardStats, ApiError> {
        let response = self
            .client
            .execute(PendingRequest::get("/analytics/dashboard/"))
            .await?
            .error_for_status()?;
        let envelope: Envelope<DashboardStats> = response.json()?;
        match envelope {
            Envelope {
                success: true,
                data: Some(stats),
            } => Ok(stats),
            _ => Err(ApiError::Rejected(
                "dashboard aggregate unavailable".to_string(),
            )),
        }
    }
}
