use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskBoard {
    pub id: Uuid,
    pub user_id: Uuid,
    pub week_start_date: NaiveDate,
    pub week_end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub task_board_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub category: TaskCategory,
    /// Zero-based position within the (board, status) column.
    #[sqlx(rename = "sort_order")]
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "task_category", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskCategory {
    WellnessSelfcare,
    SocialRelationships,
    ProductivityOrganization,
}

impl TaskCategory {
    pub fn label(&self) -> &'static str {
        match self {
            TaskCategory::WellnessSelfcare => "Wellness & Self-Care",
            TaskCategory::SocialRelationships => "Social & Relationships",
            TaskCategory::ProductivityOrganization => "Productivity & Organization",
        }
    }
}

// ── Requests ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub task_board_id: Uuid,

    #[validate(length(min = 1, max = 200, message = "Task title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(max = 2000, message = "Description must be under 2000 characters"))]
    #[serde(default)]
    pub description: Option<String>,

    pub category: TaskCategory,
}

/// PUT /api/tasks/{id}. Status and order only change through reorder.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(length(max = 200, message = "Task title must be under 200 characters"))]
    #[serde(default)]
    pub title: Option<String>,

    #[validate(length(max = 2000, message = "Description must be under 2000 characters"))]
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub category: Option<TaskCategory>,
}

/// POST /api/tasks/reorder. Every field is optional on the wire so a missing
/// one surfaces as a 400 with a clear message instead of a parse failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub task_id: Option<Uuid>,
    pub source_status: Option<TaskStatus>,
    pub destination_status: Option<TaskStatus>,
    pub source_index: Option<i32>,
    pub destination_index: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    pub task_board_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskBoardQuery {
    pub week_date: Option<String>,
}

// ── Responses ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskBoardResponse {
    #[serde(flatten)]
    pub board: TaskBoard,
    pub tasks: Vec<Task>,
    pub formatted_date_range: String,
}

#[derive(Debug, Serialize)]
pub struct ReorderResponse {
    pub success: bool,
    pub tasks: Vec<Task>,
}
