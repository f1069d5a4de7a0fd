//! Dense per-column ordering for task boards.
//!
//! Every task carries an `order` that is zero-based and gapless within its
//! `(task_board_id, status)` column. Create appends, delete closes the gap and
//! a move shifts the neighbours it passes over. The planning half of this
//! module is pure; the SQL half executes a plan on a connection that the
//! caller has already placed inside a transaction.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::task::{ReorderRequest, Task, TaskStatus};

/// A slot on the board: column plus index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub status: TaskStatus,
    pub index: i32,
}

/// Adds `delta` to the order of every task in `status` whose order lies in
/// `from..=to` (unbounded above when `to` is `None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    pub status: TaskStatus,
    pub from: i32,
    pub to: Option<i32>,
    pub delta: i32,
}

impl Shift {
    pub fn covers(&self, status: TaskStatus, order: i32) -> bool {
        status == self.status && order >= self.from && self.to.map_or(true, |to| order <= to)
    }

    /// New order for a task currently at `(status, order)`.
    pub fn apply(&self, status: TaskStatus, order: i32) -> i32 {
        if self.covers(status, order) {
            order + self.delta
        } else {
            order
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlan {
    /// Neighbour shifts, applied before the moved task is written.
    pub shifts: Vec<Shift>,
    pub target: Position,
}

/// A reorder request with every field present and indices non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskMove {
    pub task_id: Uuid,
    pub source: Position,
    pub destination: Position,
}

impl TaskMove {
    pub fn from_request(req: &ReorderRequest) -> Result<Self, String> {
        let (
            Some(task_id),
            Some(source_status),
            Some(destination_status),
            Some(source_index),
            Some(destination_index),
        ) = (
            req.task_id,
            req.source_status,
            req.destination_status,
            req.source_index,
            req.destination_index,
        )
        else {
            return Err("Missing required fields".into());
        };

        if source_index < 0 || destination_index < 0 {
            return Err("Indices must be non-negative".into());
        }

        Ok(Self {
            task_id,
            source: Position {
                status: source_status,
                index: source_index,
            },
            destination: Position {
                status: destination_status,
                index: destination_index,
            },
        })
    }

    pub fn is_same_column(&self) -> bool {
        self.source.status == self.destination.status
    }

    /// Reject moves whose source does not match where the task actually sits,
    /// or whose destination lies outside the column. `destination_len` is the
    /// current length of the destination column (which includes the task
    /// itself for same-column moves).
    pub fn check_against(&self, stored: Position, destination_len: i64) -> Result<(), String> {
        if stored != self.source {
            return Err(format!(
                "Task is at {:?}[{}], not {:?}[{}]",
                stored.status, stored.index, self.source.status, self.source.index
            ));
        }

        let max_index = if self.is_same_column() {
            destination_len - 1
        } else {
            destination_len
        };
        if i64::from(self.destination.index) > max_index {
            return Err(format!(
                "Destination index {} is out of range (max {})",
                self.destination.index, max_index
            ));
        }

        Ok(())
    }
}

/// Shifts needed to move a task from `source` to `destination`.
pub fn plan_move(source: Position, destination: Position) -> MovePlan {
    let mut shifts = Vec::with_capacity(2);

    if source.status == destination.status {
        if source.index < destination.index {
            // Moving down: the tasks passed over move up one
            shifts.push(Shift {
                status: source.status,
                from: source.index + 1,
                to: Some(destination.index),
                delta: -1,
            });
        } else if source.index > destination.index {
            shifts.push(Shift {
                status: source.status,
                from: destination.index,
                to: Some(source.index - 1),
                delta: 1,
            });
        }
    } else {
        shifts.push(Shift {
            status: source.status,
            from: source.index + 1,
            to: None,
            delta: -1,
        });
        shifts.push(Shift {
            status: destination.status,
            from: destination.index,
            to: None,
            delta: 1,
        });
    }

    MovePlan {
        shifts,
        target: destination,
    }
}

/// Shift that closes the gap left by a task removed from `removed`.
pub fn plan_delete(removed: Position) -> Shift {
    Shift {
        status: removed.status,
        from: removed.index + 1,
        to: None,
        delta: -1,
    }
}

/// True when `orders` is a permutation of `0..n`.
pub fn is_dense<I: IntoIterator<Item = i32>>(orders: I) -> bool {
    let mut orders: Vec<i32> = orders.into_iter().collect();
    orders.sort_unstable();
    orders.iter().zip(0..).all(|(&order, expected)| order == expected)
}

/// Group a board's tasks by column and report the columns that are not dense.
pub fn broken_columns(tasks: &[Task]) -> Vec<TaskStatus> {
    TaskStatus::ALL
        .into_iter()
        .filter(|status| {
            !is_dense(
                tasks
                    .iter()
                    .filter(|t| t.status == *status)
                    .map(|t| t.order),
            )
        })
        .collect()
}

// ── SQL execution ────────────────────────────────────────────────────────────

/// Take a row lock on the board so concurrent mutations of its columns run
/// one after another.
pub async fn lock_board(conn: &mut PgConnection, board_id: Uuid) -> AppResult<()> {
    sqlx::query("SELECT id FROM task_boards WHERE id = $1 FOR UPDATE")
        .bind(board_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Task board not found".into()))?;
    Ok(())
}

pub async fn column_len(
    conn: &mut PgConnection,
    board_id: Uuid,
    status: TaskStatus,
) -> AppResult<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM tasks WHERE task_board_id = $1 AND status = $2",
    )
    .bind(board_id)
    .bind(status)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count)
}

/// Order a newly created task receives: the end of the TODO column.
pub async fn append_position(conn: &mut PgConnection, board_id: Uuid) -> AppResult<Position> {
    let len = column_len(conn, board_id, TaskStatus::Todo).await?;
    let index = i32::try_from(len)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("TODO column too large")))?;
    Ok(Position {
        status: TaskStatus::Todo,
        index,
    })
}

pub async fn apply_shift(conn: &mut PgConnection, board_id: Uuid, shift: &Shift) -> AppResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE tasks SET
            sort_order = sort_order + $4,
            updated_at = NOW()
        WHERE task_board_id = $1
          AND status = $2
          AND sort_order >= $3
          AND ($5::INT IS NULL OR sort_order <= $5)
        "#,
    )
    .bind(board_id)
    .bind(shift.status)
    .bind(shift.from)
    .bind(shift.delta)
    .bind(shift.to)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

/// Execute a move plan: neighbour shifts, then the moved task itself.
pub async fn apply_move(
    conn: &mut PgConnection,
    board_id: Uuid,
    task_id: Uuid,
    plan: &MovePlan,
) -> AppResult<()> {
    for shift in &plan.shifts {
        let shifted = apply_shift(conn, board_id, shift).await?;
        tracing::debug!(
            board_id = %board_id,
            status = ?shift.status,
            from = shift.from,
            to = ?shift.to,
            delta = shift.delta,
            shifted,
            "Shifted column"
        );
    }

    sqlx::query(
        r#"
        UPDATE tasks SET
            status = $2,
            sort_order = $3,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(task_id)
    .bind(plan.target.status)
    .bind(plan.target.index)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn board_tasks(conn: &mut PgConnection, board_id: Uuid) -> AppResult<Vec<Task>> {
    let tasks = sqlx::query_as::<_, Task>(
        r#"
        SELECT * FROM tasks
        WHERE task_board_id = $1
        ORDER BY status ASC, sort_order ASC, created_at ASC
        "#,
    )
    .bind(board_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(tasks)
}
