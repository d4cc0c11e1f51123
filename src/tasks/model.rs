use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Wire spelling, also used for query parameters.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

/// One task record as the backend returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Payload for creating or fully updating a task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
}

/// Optional list filters, mapped onto query parameters.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub search: Option<String>,
}

/// Envelope of the task list endpoint.
#[derive(Debug, Deserialize)]
pub struct TaskPage {
    pub results: Vec<Task>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardOverview {
    pub total_tasks: u64,
    pub completed_tasks: u64,
    pub in_progress_tasks: u64,
    pub overdue_tasks: u64,
    pub recent_tasks_7days: u64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpcomingTask {
    pub id: String,
    pub title: String,
    pub due_date: Option<DateTime<Utc>>,
    pub days_until_due: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub created: u64,
    pub completed: u64,
}

/// The dashboard aggregate: status/priority/trend summaries.
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardStats {
    pub overview: DashboardOverview,
    pub status_breakdown: HashMap<String, u64>,
    pub priority_distribution: HashMap<String, u64>,
    pub upcoming_tasks: Vec<UpcomingTask>,
    pub trends_30days: Vec<TrendPoint>,
}

/// Generic `{ success, data }` envelope used by the analytics endpoints.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
}
