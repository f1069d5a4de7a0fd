use axum::{extract::State, Extension, Json};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::extract::AppQuery;
use crate::models::task::{TaskBoard, TaskBoardQuery, TaskBoardResponse};
use crate::services::task_ordering::board_tasks;
use crate::services::week::{format_week_range, parse_week_date, week_bounds};
use crate::AppState;

/// Find or lazily create the board for the week containing `weekDate`.
pub async fn get_task_board(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    AppQuery(query): AppQuery<TaskBoardQuery>,
) -> AppResult<Json<TaskBoardResponse>> {
    let day = match query.week_date.as_deref() {
        Some(raw) => parse_week_date(raw).map_err(AppError::Validation)?,
        None => Utc::now().date_naive(),
    };
    let (week_start, week_end) = week_bounds(day);

    // Concurrent first visits race on the unique key; the loser inserts nothing
    let inserted = sqlx::query(
        r#"
        INSERT INTO task_boards (id, user_id, week_start_date, week_end_date)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, week_start_date) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(auth_user.id)
    .bind(week_start)
    .bind(week_end)
    .execute(&state.db)
    .await?
    .rows_affected();

    if inserted > 0 {
        tracing::info!(user_id = %auth_user.id, week_start = %week_start, "Task board created");
    }

    let board = sqlx::query_as::<_, TaskBoard>(
        "SELECT * FROM task_boards WHERE user_id = $1 AND week_start_date = $2",
    )
    .bind(auth_user.id)
    .bind(week_start)
    .fetch_one(&state.db)
    .await?;

    let mut conn = state.db.acquire().await?;
    let tasks = board_tasks(&mut conn, board.id).await?;

    Ok(Json(TaskBoardResponse {
        formatted_date_range: format_week_range(board.week_start_date, board.week_end_date),
        board,
        tasks,
    }))
}
