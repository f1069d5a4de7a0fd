use futures_util::future::BoxFuture;
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::AppResult;

pub type Tx = Transaction<'static, Postgres>;

/// Run `work` inside a single database transaction.
///
/// The transaction commits only when `work` returns `Ok`; any error rolls back
/// every statement issued through the handle and is returned unchanged. No
/// retry is attempted, a serialization failure surfaces to the caller.
///
/// Callers move owned inputs into the closure:
///
/// ```ignore
/// with_transaction(&state.db, move |tx| Box::pin(async move {
///     sqlx::query("...").execute(&mut **tx).await?;
///     Ok(())
/// })).await?;
/// ```
pub async fn with_transaction<T, F>(pool: &PgPool, work: F) -> AppResult<T>
where
    T: Send,
    F: for<'t> FnOnce(&'t mut Tx) -> BoxFuture<'t, AppResult<T>>,
{
    let mut tx = pool.begin().await?;

    match work(&mut tx).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "Transaction rollback failed");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::insert_user;
    use crate::error::AppError;

    async fn user_count(pool: &PgPool) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires PostgreSQL (DATABASE_URL)"]
    async fn test_commit_on_ok(pool: PgPool) {
        let id = with_transaction(&pool, |tx| {
            Box::pin(async move { Ok(insert_user(&mut **tx).await) })
        })
        .await
        .unwrap();

        let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(found, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "Requires PostgreSQL (DATABASE_URL)"]
    async fn test_rollback_on_err(pool: PgPool) {
        let result: AppResult<()> = with_transaction(&pool, |tx| {
            Box::pin(async move {
                insert_user(&mut **tx).await;
                Err(AppError::Validation("stop".into()))
            })
        })
        .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(user_count(&pool).await, 0);
    }
}
