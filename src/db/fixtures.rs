//! Rows for storage-backed tests.

use chrono::Utc;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::task::{TaskCategory, TaskStatus};
use crate::services::week::week_bounds;

pub async fn insert_user(conn: &mut PgConnection) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, email, password_hash, name) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(format!("{}@example.com", id))
        .bind("$argon2id$unused")
        .bind("Test User")
        .execute(&mut *conn)
        .await
        .unwrap();
    id
}

pub async fn insert_board(conn: &mut PgConnection, user_id: Uuid) -> Uuid {
    let (start, end) = week_bounds(Utc::now().date_naive());
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO task_boards (id, user_id, week_start_date, week_end_date)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_one(&mut *conn)
    .await
    .unwrap()
}

pub async fn insert_task(
    conn: &mut PgConnection,
    board_id: Uuid,
    title: &str,
    status: TaskStatus,
    order: i32,
) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO tasks (id, task_board_id, title, status, category, sort_order)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(board_id)
    .bind(title)
    .bind(status)
    .bind(TaskCategory::ProductivityOrganization)
    .bind(order)
    .fetch_one(&mut *conn)
    .await
    .unwrap()
}
