use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde_json::{json, Value};
use sqlx::PgConnection;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::db::with_transaction;
use crate::error::{AppError, AppResult};
use crate::extract::{AppJson, AppQuery};
use crate::models::task::{
    CreateTaskRequest, ReorderRequest, ReorderResponse, Task, TaskListQuery, UpdateTaskRequest,
};
use crate::services::task_ordering::{
    append_position, apply_move, apply_shift, board_tasks, broken_columns, column_len, lock_board,
    plan_delete, plan_move, Position, TaskMove,
};
use crate::AppState;

/// 404 when the board does not exist, 403 when it belongs to someone else.
async fn ensure_board_owner(
    conn: &mut PgConnection,
    user_id: Uuid,
    board_id: Uuid,
) -> AppResult<()> {
    let owner = sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM task_boards WHERE id = $1")
        .bind(board_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Task board not found".into()))?;

    if owner != user_id {
        tracing::warn!(user_id = %user_id, board_id = %board_id, "Task board access denied");
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Load a task whose board is owned by `user_id`.
async fn owned_task(conn: &mut PgConnection, user_id: Uuid, task_id: Uuid) -> AppResult<Task> {
    let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
        .bind(task_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    ensure_board_owner(conn, user_id, task.task_board_id).await?;
    Ok(task)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    AppQuery(query): AppQuery<TaskListQuery>,
) -> AppResult<Json<Vec<Task>>> {
    let board_id = query
        .task_board_id
        .ok_or_else(|| AppError::Validation("taskBoardId is required".into()))?;

    let mut conn = state.db.acquire().await?;
    ensure_board_owner(&mut conn, auth_user.id, board_id).await?;

    Ok(Json(board_tasks(&mut conn, board_id).await?))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
) -> AppResult<Json<Task>> {
    let mut conn = state.db.acquire().await?;
    Ok(Json(owned_task(&mut conn, auth_user.id, task_id).await?))
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    AppJson(body): AppJson<CreateTaskRequest>,
) -> AppResult<Json<Task>> {
    body.validate()?;

    let title = body.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::Validation("Task title must not be blank".into()));
    }

    let user_id = auth_user.id;
    let task = with_transaction(&state.db, move |tx| {
        Box::pin(async move {
            ensure_board_owner(&mut **tx, user_id, body.task_board_id).await?;
            lock_board(&mut **tx, body.task_board_id).await?;
            let position = append_position(&mut **tx, body.task_board_id).await?;

            let task = sqlx::query_as::<_, Task>(
                r#"
                INSERT INTO tasks (id, task_board_id, title, description, status, category, sort_order)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(body.task_board_id)
            .bind(&title)
            .bind(non_blank(body.description))
            .bind(position.status)
            .bind(body.category)
            .bind(position.index)
            .fetch_one(&mut **tx)
            .await?;

            Ok(task)
        })
    })
    .await?;

    tracing::info!(user_id = %user_id, task_id = %task.id, order = task.order, "Task created");

    Ok(Json(task))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
    AppJson(body): AppJson<UpdateTaskRequest>,
) -> AppResult<Json<Task>> {
    body.validate()?;

    let mut conn = state.db.acquire().await?;
    owned_task(&mut conn, auth_user.id, task_id).await?;

    Ok(Json(edit_task(&mut conn, task_id, body).await?))
}

/// Absent fields keep their value. A blank title is ignored; a blank
/// description clears it, matching how create stores one.
async fn edit_task(
    conn: &mut PgConnection,
    task_id: Uuid,
    body: UpdateTaskRequest,
) -> AppResult<Task> {
    let task = sqlx::query_as::<_, Task>(
        r#"
        UPDATE tasks SET
            title = COALESCE($2, title),
            description = CASE WHEN $3::BOOLEAN THEN $4 ELSE description END,
            category = COALESCE($5, category),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(task_id)
    .bind(non_blank(body.title))
    .bind(body.description.is_some())
    .bind(non_blank(body.description))
    .bind(body.category)
    .fetch_one(&mut *conn)
    .await?;

    Ok(task)
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let user_id = auth_user.id;
    with_transaction(&state.db, move |tx| {
        Box::pin(async move { remove_task(&mut **tx, user_id, task_id).await })
    })
    .await?;

    tracing::info!(user_id = %user_id, task_id = %task_id, "Task deleted");

    Ok(Json(json!({ "success": true })))
}

/// Delete a task and close the gap in its column.
async fn remove_task(conn: &mut PgConnection, user_id: Uuid, task_id: Uuid) -> AppResult<()> {
    let task = owned_task(conn, user_id, task_id).await?;
    lock_board(conn, task.task_board_id).await?;

    // Re-read under the lock, a concurrent move may have shifted it
    let task = owned_task(conn, user_id, task_id).await?;

    sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(task_id)
        .execute(&mut *conn)
        .await?;

    let closed = plan_delete(Position {
        status: task.status,
        index: task.order,
    });
    apply_shift(conn, task.task_board_id, &closed).await?;
    Ok(())
}

pub async fn reorder_tasks(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    AppJson(body): AppJson<ReorderRequest>,
) -> AppResult<Json<ReorderResponse>> {
    let mv = TaskMove::from_request(&body).map_err(AppError::Validation)?;

    let user_id = auth_user.id;
    let (board_id, tasks) = with_transaction(&state.db, move |tx| {
        Box::pin(async move { move_task(&mut **tx, user_id, mv).await })
    })
    .await?;

    let broken = broken_columns(&tasks);
    if !broken.is_empty() {
        tracing::error!(board_id = %board_id, columns = ?broken, "Task order is no longer dense");
    }

    tracing::info!(
        user_id = %user_id,
        task_id = %mv.task_id,
        from = ?mv.source,
        to = ?mv.destination,
        "Task reordered"
    );

    Ok(Json(ReorderResponse {
        success: true,
        tasks,
    }))
}

/// Validate a move against the stored position and execute it. Returns the
/// board and its tasks after the move.
async fn move_task(
    conn: &mut PgConnection,
    user_id: Uuid,
    mv: TaskMove,
) -> AppResult<(Uuid, Vec<Task>)> {
    let task = owned_task(conn, user_id, mv.task_id).await?;
    let board_id = task.task_board_id;
    lock_board(conn, board_id).await?;

    let task = owned_task(conn, user_id, mv.task_id).await?;
    let stored = Position {
        status: task.status,
        index: task.order,
    };
    let destination_len = column_len(conn, board_id, mv.destination.status).await?;
    mv.check_against(stored, destination_len)
        .map_err(AppError::Validation)?;

    let plan = plan_move(mv.source, mv.destination);
    apply_move(conn, board_id, mv.task_id, &plan).await?;

    let tasks = board_tasks(conn, board_id).await?;
    Ok((board_id, tasks))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  Stretch ".into())), Some("Stretch".into()));
        assert_eq!(non_blank(Some("   ".into())), None);
        assert_eq!(non_blank(None), None);
    }

    mod storage {
        use super::*;
        use crate::db::fixtures::{insert_board, insert_task, insert_user};
        use crate::models::task::{TaskCategory, TaskStatus};
        use sqlx::PgPool;

        use TaskStatus::{InProgress, Todo};

        fn column(tasks: &[Task], status: TaskStatus) -> Vec<(String, i32)> {
            tasks
                .iter()
                .filter(|t| t.status == status)
                .map(|t| (t.title.clone(), t.order))
                .collect()
        }

        fn named(pairs: &[(&str, i32)]) -> Vec<(String, i32)> {
            pairs.iter().map(|(t, o)| (t.to_string(), *o)).collect()
        }

        fn moving(task_id: Uuid, from: (TaskStatus, i32), to: (TaskStatus, i32)) -> TaskMove {
            TaskMove {
                task_id,
                source: Position { status: from.0, index: from.1 },
                destination: Position { status: to.0, index: to.1 },
            }
        }

        #[sqlx::test(migrations = "./migrations")]
        #[ignore = "Requires PostgreSQL (DATABASE_URL)"]
        async fn test_delete_then_cross_column_move(pool: PgPool) {
            let mut conn = pool.acquire().await.unwrap();
            let user = insert_user(&mut conn).await;
            let board = insert_board(&mut conn, user).await;
            let a = insert_task(&mut conn, board, "A", Todo, 0).await;
            let b = insert_task(&mut conn, board, "B", Todo, 1).await;
            insert_task(&mut conn, board, "C", Todo, 2).await;
            insert_task(&mut conn, board, "X", InProgress, 0).await;

            remove_task(&mut conn, user, b).await.unwrap();
            let tasks = board_tasks(&mut conn, board).await.unwrap();
            assert_eq!(column(&tasks, Todo), named(&[("A", 0), ("C", 1)]));

            let (_, tasks) = move_task(&mut conn, user, moving(a, (Todo, 0), (InProgress, 0)))
                .await
                .unwrap();
            assert_eq!(column(&tasks, Todo), named(&[("C", 0)]));
            assert_eq!(column(&tasks, InProgress), named(&[("A", 0), ("X", 1)]));
            assert!(broken_columns(&tasks).is_empty());
        }

        #[sqlx::test(migrations = "./migrations")]
        #[ignore = "Requires PostgreSQL (DATABASE_URL)"]
        async fn test_bounded_shift_matches_in_memory_plan(pool: PgPool) {
            let mut conn = pool.acquire().await.unwrap();
            let user = insert_user(&mut conn).await;
            let board = insert_board(&mut conn, user).await;
            for (i, title) in ["T0", "T1", "T2", "T3", "T4"].iter().enumerate() {
                insert_task(&mut conn, board, title, Todo, i as i32).await;
            }
            insert_task(&mut conn, board, "P0", InProgress, 0).await;

            let before = board_tasks(&mut conn, board).await.unwrap();
            let shift = plan_move(
                Position { status: Todo, index: 1 },
                Position { status: Todo, index: 3 },
            )
            .shifts[0];
            let shifted = apply_shift(&mut conn, board, &shift).await.unwrap();
            assert_eq!(shifted, 2);

            let after = board_tasks(&mut conn, board).await.unwrap();
            for task in &before {
                let stored = after.iter().find(|t| t.id == task.id).unwrap();
                assert_eq!(stored.order, shift.apply(task.status, task.order), "{}", task.title);
            }
        }

        #[sqlx::test(migrations = "./migrations")]
        #[ignore = "Requires PostgreSQL (DATABASE_URL)"]
        async fn test_rejected_and_aborted_moves_leave_board_untouched(pool: PgPool) {
            let mut conn = pool.acquire().await.unwrap();
            let user = insert_user(&mut conn).await;
            let board = insert_board(&mut conn, user).await;
            let a = insert_task(&mut conn, board, "A", Todo, 0).await;
            insert_task(&mut conn, board, "B", Todo, 1).await;
            drop(conn);

            // Stale source position
            let stale = moving(a, (Todo, 1), (Todo, 0));
            let result = with_transaction(&pool, move |tx| {
                Box::pin(async move { move_task(&mut **tx, user, stale).await })
            })
            .await;
            assert!(matches!(result, Err(AppError::Validation(_))));

            // Valid move followed by a failure in the same transaction
            let valid = moving(a, (Todo, 0), (Todo, 1));
            let result: AppResult<()> = with_transaction(&pool, move |tx| {
                Box::pin(async move {
                    move_task(&mut **tx, user, valid).await?;
                    Err(AppError::Internal(anyhow::anyhow!("abort")))
                })
            })
            .await;
            assert!(result.is_err());

            let mut conn = pool.acquire().await.unwrap();
            let tasks = board_tasks(&mut conn, board).await.unwrap();
            assert_eq!(column(&tasks, Todo), named(&[("A", 0), ("B", 1)]));
        }

        #[sqlx::test(migrations = "./migrations")]
        #[ignore = "Requires PostgreSQL (DATABASE_URL)"]
        async fn test_foreign_and_missing_tasks(pool: PgPool) {
            let mut conn = pool.acquire().await.unwrap();
            let owner = insert_user(&mut conn).await;
            let stranger = insert_user(&mut conn).await;
            let board = insert_board(&mut conn, owner).await;
            let a = insert_task(&mut conn, board, "A", Todo, 0).await;

            let err = move_task(&mut conn, stranger, moving(a, (Todo, 0), (InProgress, 0)))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Forbidden));

            let err = owned_task(&mut conn, owner, Uuid::new_v4()).await.unwrap_err();
            assert!(matches!(err, AppError::NotFound(ref msg) if msg == "Task not found"));
        }

        #[sqlx::test(migrations = "./migrations")]
        #[ignore = "Requires PostgreSQL (DATABASE_URL)"]
        async fn test_edit_handles_blank_fields_like_create(pool: PgPool) {
            let mut conn = pool.acquire().await.unwrap();
            let user = insert_user(&mut conn).await;
            let board = insert_board(&mut conn, user).await;
            let id = insert_task(&mut conn, board, "Walk", Todo, 0).await;

            let edit = |title: Option<&str>, description: Option<&str>| UpdateTaskRequest {
                title: title.map(String::from),
                description: description.map(String::from),
                category: None,
            };

            let task = edit_task(&mut conn, id, edit(None, Some(" 20 minutes "))).await.unwrap();
            assert_eq!(task.description.as_deref(), Some("20 minutes"));

            // Absent description is kept, blank title ignored
            let task = edit_task(&mut conn, id, edit(Some("  "), None)).await.unwrap();
            assert_eq!(task.title, "Walk");
            assert_eq!(task.description.as_deref(), Some("20 minutes"));

            // Blank description is stored as NULL
            let task = edit_task(&mut conn, id, edit(None, Some("   "))).await.unwrap();
            assert_eq!(task.description, None);
            assert_eq!(task.category, TaskCategory::ProductivityOrganization);
        }
    }
}
