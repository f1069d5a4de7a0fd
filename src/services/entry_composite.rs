//! Daily entries and their four section records.
//!
//! An entry always links a mood. Sleep, exercise and diet are linked
//! independently: on create a missing section is back-filled with a neutral
//! placeholder row, on update a missing section is unlinked (the row stays in
//! its table, orphaned). All functions here expect to run on a connection
//! inside a transaction when they write.

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::daily_entry::{
    DailyEntry, DailyEntryDetail, DailyEntryRequest, Diet, DietSection, EntryStatus, Exercise,
    ExerciseSection, Mood, MoodSection, Sleep, SleepSection,
};

/// What an update does to one optional section.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionChange<T> {
    UpdateInPlace { id: Uuid, data: T },
    CreateAndConnect(T),
    Disconnect,
    Unchanged,
}

pub fn plan_section<T>(linked: Option<Uuid>, input: Option<T>) -> SectionChange<T> {
    match (linked, input) {
        (Some(id), Some(data)) => SectionChange::UpdateInPlace { id, data },
        (None, Some(data)) => SectionChange::CreateAndConnect(data),
        (Some(_), None) => SectionChange::Disconnect,
        (None, None) => SectionChange::Unchanged,
    }
}

/// A section payload that knows how to persist itself.
pub trait SectionRecord: Send + Sync {
    /// Column on `daily_entries` linking to the row.
    const LINK_COLUMN: &'static str;

    fn insert<'c>(&'c self, conn: &'c mut PgConnection) -> BoxFuture<'c, Result<Uuid, sqlx::Error>>;

    fn update<'c>(
        &'c self,
        id: Uuid,
        conn: &'c mut PgConnection,
    ) -> BoxFuture<'c, Result<(), sqlx::Error>>;
}

impl SectionRecord for MoodSection {
    const LINK_COLUMN: &'static str = "mood_id";

    fn insert<'c>(&'c self, conn: &'c mut PgConnection) -> BoxFuture<'c, Result<Uuid, sqlx::Error>> {
        Box::pin(async move {
            sqlx::query_scalar::<_, Uuid>(
                "INSERT INTO moods (id, rating, notes) VALUES ($1, $2, $3) RETURNING id",
            )
            .bind(Uuid::new_v4())
            .bind(self.rating)
            .bind(non_empty(&self.notes))
            .fetch_one(conn)
            .await
        })
    }

    fn update<'c>(
        &'c self,
        id: Uuid,
        conn: &'c mut PgConnection,
    ) -> BoxFuture<'c, Result<(), sqlx::Error>> {
        Box::pin(async move {
            sqlx::query("UPDATE moods SET rating = $2, notes = $3, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(self.rating)
                .bind(non_empty(&self.notes))
                .execute(conn)
                .await
                .map(|_| ())
        })
    }
}

impl SectionRecord for SleepSection {
    const LINK_COLUMN: &'static str = "sleep_id";

    fn insert<'c>(&'c self, conn: &'c mut PgConnection) -> BoxFuture<'c, Result<Uuid, sqlx::Error>> {
        Box::pin(async move {
            sqlx::query_scalar::<_, Uuid>(
                "INSERT INTO sleeps (id, hours, quality) VALUES ($1, $2, $3) RETURNING id",
            )
            .bind(Uuid::new_v4())
            .bind(self.hours)
            .bind(self.quality)
            .fetch_one(conn)
            .await
        })
    }

    fn update<'c>(
        &'c self,
        id: Uuid,
        conn: &'c mut PgConnection,
    ) -> BoxFuture<'c, Result<(), sqlx::Error>> {
        Box::pin(async move {
            sqlx::query("UPDATE sleeps SET hours = $2, quality = $3, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(self.hours)
                .bind(self.quality)
                .execute(conn)
                .await
                .map(|_| ())
        })
    }
}

impl SectionRecord for ExerciseSection {
    const LINK_COLUMN: &'static str = "exercise_id";

    fn insert<'c>(&'c self, conn: &'c mut PgConnection) -> BoxFuture<'c, Result<Uuid, sqlx::Error>> {
        Box::pin(async move {
            sqlx::query_scalar::<_, Uuid>(
                r#"
                INSERT INTO exercises (id, did_exercise, exercise_type, duration)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(self.did_exercise)
            .bind(&self.exercise_type)
            .bind(self.duration)
            .fetch_one(conn)
            .await
        })
    }

    fn update<'c>(
        &'c self,
        id: Uuid,
        conn: &'c mut PgConnection,
    ) -> BoxFuture<'c, Result<(), sqlx::Error>> {
        Box::pin(async move {
            sqlx::query(
                r#"
                UPDATE exercises SET
                    did_exercise = $2,
                    exercise_type = $3,
                    duration = $4,
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(self.did_exercise)
            .bind(&self.exercise_type)
            .bind(self.duration)
            .execute(conn)
            .await
            .map(|_| ())
        })
    }
}

impl SectionRecord for DietSection {
    const LINK_COLUMN: &'static str = "diet_id";

    fn insert<'c>(&'c self, conn: &'c mut PgConnection) -> BoxFuture<'c, Result<Uuid, sqlx::Error>> {
        Box::pin(async move {
            sqlx::query_scalar::<_, Uuid>(
                r#"
                INSERT INTO diets (id, rating, food_choices, water_intake)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(self.rating)
            .bind(&self.food_choices)
            .bind(self.water_intake)
            .fetch_one(conn)
            .await
        })
    }

    fn update<'c>(
        &'c self,
        id: Uuid,
        conn: &'c mut PgConnection,
    ) -> BoxFuture<'c, Result<(), sqlx::Error>> {
        Box::pin(async move {
            sqlx::query(
                r#"
                UPDATE diets SET
                    rating = $2,
                    food_choices = $3,
                    water_intake = $4,
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(self.rating)
            .bind(&self.food_choices)
            .bind(self.water_intake)
            .execute(conn)
            .await
            .map(|_| ())
        })
    }
}

fn non_empty(notes: &Option<String>) -> Option<&str> {
    notes.as_deref().map(str::trim).filter(|n| !n.is_empty())
}

async fn set_link(
    conn: &mut PgConnection,
    entry_id: Uuid,
    column: &'static str,
    target: Option<Uuid>,
) -> AppResult<()> {
    let sql = format!(
        "UPDATE daily_entries SET {} = $2, updated_at = NOW() WHERE id = $1",
        column
    );
    sqlx::query(&sql)
        .bind(entry_id)
        .bind(target)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn apply_section<S: SectionRecord>(
    conn: &mut PgConnection,
    entry_id: Uuid,
    change: SectionChange<S>,
) -> AppResult<()> {
    match change {
        SectionChange::UpdateInPlace { id, data } => data.update(id, &mut *conn).await?,
        SectionChange::CreateAndConnect(data) => {
            let id = data.insert(&mut *conn).await?;
            set_link(conn, entry_id, S::LINK_COLUMN, Some(id)).await?;
        }
        SectionChange::Disconnect => {
            set_link(conn, entry_id, S::LINK_COLUMN, None).await?;
            tracing::debug!(entry_id = %entry_id, section = S::LINK_COLUMN, "Section disconnected");
        }
        SectionChange::Unchanged => {}
    }
    Ok(())
}

// ── Loading ──────────────────────────────────────────────────────────────────

/// An entry plus whichever linked rows could be read.
#[derive(Debug, Clone)]
pub struct LoadedEntry {
    pub entry: DailyEntry,
    pub mood: Option<Mood>,
    pub sleep: Option<Sleep>,
    pub exercise: Option<Exercise>,
    pub diet: Option<Diet>,
}

impl LoadedEntry {
    /// Completed when the mood is present and every optional section is
    /// either present or not linked at all. An unlinked section therefore
    /// counts as satisfied; only a link whose row cannot be read leaves the
    /// entry "started".
    pub fn status(&self) -> EntryStatus {
        fn satisfied<T>(link: Option<Uuid>, row: &Option<T>) -> bool {
            row.is_some() || link.is_none()
        }

        let complete = self.mood.is_some()
            && satisfied(self.entry.sleep_id, &self.sleep)
            && satisfied(self.entry.exercise_id, &self.exercise)
            && satisfied(self.entry.diet_id, &self.diet);

        if complete {
            EntryStatus::Completed
        } else {
            EntryStatus::Started
        }
    }

    pub fn into_detail(self) -> AppResult<DailyEntryDetail> {
        let mood = self.mood.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("Entry {} has no mood row", self.entry.id))
        })?;

        Ok(DailyEntryDetail {
            id: self.entry.id,
            date: self.entry.date,
            mood: mood.into(),
            sleep: self.sleep.map(Into::into),
            exercise: self.exercise.map(Into::into),
            diet: self.diet.map(Into::into),
            mood_id: self.entry.mood_id,
            sleep_id: self.entry.sleep_id,
            exercise_id: self.entry.exercise_id,
            diet_id: self.entry.diet_id,
            created_at: self.entry.created_at,
            updated_at: self.entry.updated_at,
        })
    }
}

async fn fetch_row<T>(conn: &mut PgConnection, table: &'static str, id: Option<Uuid>) -> AppResult<Option<T>>
where
    T: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    let Some(id) = id else {
        return Ok(None);
    };
    let sql = format!("SELECT * FROM {} WHERE id = $1", table);
    let row = sqlx::query_as::<_, T>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub async fn load_sections(conn: &mut PgConnection, entry: DailyEntry) -> AppResult<LoadedEntry> {
    let mood = fetch_row::<Mood>(conn, "moods", Some(entry.mood_id)).await?;
    let sleep = fetch_row::<Sleep>(conn, "sleeps", entry.sleep_id).await?;
    let exercise = fetch_row::<Exercise>(conn, "exercises", entry.exercise_id).await?;
    let diet = fetch_row::<Diet>(conn, "diets", entry.diet_id).await?;

    Ok(LoadedEntry {
        entry,
        mood,
        sleep,
        exercise,
        diet,
    })
}

/// Load an entry owned by `user_id`. Entries of other users read as absent.
pub async fn find_owned(
    conn: &mut PgConnection,
    user_id: Uuid,
    entry_id: Uuid,
) -> AppResult<Option<LoadedEntry>> {
    let entry = sqlx::query_as::<_, DailyEntry>(
        "SELECT * FROM daily_entries WHERE id = $1 AND user_id = $2",
    )
    .bind(entry_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    match entry {
        Some(entry) => Ok(Some(load_sections(conn, entry).await?)),
        None => Ok(None),
    }
}

/// First entry of the user dated within `start..=end`.
pub async fn find_in_range(
    conn: &mut PgConnection,
    user_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AppResult<Option<DailyEntry>> {
    let entry = sqlx::query_as::<_, DailyEntry>(
        r#"
        SELECT * FROM daily_entries
        WHERE user_id = $1 AND date BETWEEN $2 AND $3
        ORDER BY date ASC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(entry)
}

// ── Writes ───────────────────────────────────────────────────────────────────

/// Create an entry with all four sections linked. Sections missing from the
/// request are stored as placeholders.
pub async fn create_entry(
    conn: &mut PgConnection,
    user_id: Uuid,
    req: DailyEntryRequest,
) -> AppResult<DailyEntryDetail> {
    let mood_id = req.mood.insert(&mut *conn).await?;
    let sleep_id = req
        .sleep
        .unwrap_or_else(SleepSection::placeholder)
        .insert(&mut *conn)
        .await?;
    let exercise_id = req
        .exercise
        .unwrap_or_else(ExerciseSection::placeholder)
        .insert(&mut *conn)
        .await?;
    let diet_id = req
        .diet
        .unwrap_or_else(DietSection::placeholder)
        .insert(&mut *conn)
        .await?;

    let entry = sqlx::query_as::<_, DailyEntry>(
        r#"
        INSERT INTO daily_entries (id, user_id, date, mood_id, sleep_id, exercise_id, diet_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(req.date.unwrap_or_else(Utc::now))
    .bind(mood_id)
    .bind(sleep_id)
    .bind(exercise_id)
    .bind(diet_id)
    .fetch_one(&mut *conn)
    .await?;

    load_sections(conn, entry).await?.into_detail()
}

/// Update an owned entry section by section and return it re-read.
pub async fn update_entry(
    conn: &mut PgConnection,
    user_id: Uuid,
    entry_id: Uuid,
    req: DailyEntryRequest,
) -> AppResult<DailyEntryDetail> {
    let existing = sqlx::query_as::<_, DailyEntry>(
        "SELECT * FROM daily_entries WHERE id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(entry_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Entry not found".into()))?;

    req.mood.update(existing.mood_id, &mut *conn).await?;

    apply_section(conn, entry_id, plan_section(existing.sleep_id, req.sleep)).await?;
    apply_section(conn, entry_id, plan_section(existing.exercise_id, req.exercise)).await?;
    apply_section(conn, entry_id, plan_section(existing.diet_id, req.diet)).await?;

    if let Some(date) = req.date {
        sqlx::query("UPDATE daily_entries SET date = $2, updated_at = NOW() WHERE id = $1")
            .bind(entry_id)
            .bind(date)
            .execute(&mut *conn)
            .await?;
    }

    find_owned(conn, user_id, entry_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Entry not found".into()))?
        .into_detail()
}

/// Entries of the user dated within `start..=end`, newest first.
pub async fn list_in_range(
    conn: &mut PgConnection,
    user_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AppResult<Vec<DailyEntryDetail>> {
    let entries = sqlx::query_as::<_, DailyEntry>(
        r#"
        SELECT * FROM daily_entries
        WHERE user_id = $1 AND date BETWEEN $2 AND $3
        ORDER BY date DESC
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(&mut *conn)
    .await?;

    let mut details = Vec::with_capacity(entries.len());
    for entry in entries {
        details.push(load_sections(conn, entry).await?.into_detail()?);
    }
    Ok(details)
}
