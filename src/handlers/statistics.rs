use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::auth::middleware::AuthUser;
use crate::error::{AppError, AppResult};
use crate::extract::AppQuery;
use crate::models::daily_entry::DidExercise;
use crate::services::statistics::{
    food_breakdown, mood_series, mood_sleep_series, sample_food_breakdown, sample_mood_sleep,
    summarize, DietBreakdown, EntrySummary, MoodPoint, MoodSleepPoint, MoodSleepRow, SummaryRow,
    TimeRange,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct StatsRangeQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl StatsRangeQuery {
    /// `start` is required, `end` defaults to now.
    fn bounds(&self) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
        let start = self
            .start
            .ok_or_else(|| AppError::Validation("Start date is required".into()))?;
        let end = self.end.unwrap_or_else(Utc::now);
        if start > end {
            return Err(AppError::Validation(
                "Start date must not be after end date".into(),
            ));
        }
        Ok((start, end))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DietStatsQuery {
    pub time_range: Option<String>,
}

pub async fn mood_stats(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    AppQuery(query): AppQuery<StatsRangeQuery>,
) -> AppResult<Json<Vec<MoodPoint>>> {
    let (start, end) = query.bounds()?;

    let rows = sqlx::query_as::<_, (DateTime<Utc>, i32)>(
        r#"
        SELECT d.date, m.rating
        FROM daily_entries d
        JOIN moods m ON m.id = d.mood_id
        WHERE d.user_id = $1 AND d.date BETWEEN $2 AND $3
        ORDER BY d.date ASC
        "#,
    )
    .bind(auth_user.id)
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(mood_series(rows)))
}

pub async fn mood_sleep_stats(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    AppQuery(query): AppQuery<StatsRangeQuery>,
) -> AppResult<Json<Vec<MoodSleepPoint>>> {
    let (start, end) = query.bounds()?;

    // Inner join on sleeps: entries with sleep disconnected are skipped,
    // placeholder rows are dropped by mood_sleep_series
    let rows = sqlx::query_as::<_, (DateTime<Utc>, i32, f64, i32)>(
        r#"
        SELECT d.date, m.rating, s.hours, s.quality
        FROM daily_entries d
        JOIN moods m ON m.id = d.mood_id
        JOIN sleeps s ON s.id = d.sleep_id
        WHERE d.user_id = $1 AND d.date BETWEEN $2 AND $3
        ORDER BY d.date ASC
        "#,
    )
    .bind(auth_user.id)
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await?;

    let rows = rows
        .into_iter()
        .map(|(date, mood, sleep_hours, sleep_quality)| MoodSleepRow {
            date,
            mood,
            sleep_hours,
            sleep_quality,
        })
        .collect();
    let series = mood_sleep_series(rows);

    if series.is_empty() && state.config.stats_sample_fallback {
        tracing::info!(user_id = %auth_user.id, chart = "mood-sleep", "Sample data substituted");
        let today = Utc::now().date_naive();
        return Ok(Json(sample_mood_sleep(today, &mut rand::thread_rng())));
    }

    Ok(Json(series))
}

pub async fn diet_stats(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    AppQuery(query): AppQuery<DietStatsQuery>,
) -> AppResult<Json<DietBreakdown>> {
    let range = TimeRange::parse(query.time_range.as_deref()).map_err(AppError::Validation)?;
    let since = range.start_from(Utc::now());

    let choices = sqlx::query_scalar::<_, Vec<String>>(
        r#"
        SELECT di.food_choices
        FROM daily_entries d
        JOIN diets di ON di.id = d.diet_id
        WHERE d.user_id = $1 AND d.date >= $2
        "#,
    )
    .bind(auth_user.id)
    .bind(since)
    .fetch_all(&state.db)
    .await?;

    let breakdown = food_breakdown(choices);

    if breakdown.total_entries == 0 && state.config.stats_sample_fallback {
        tracing::info!(user_id = %auth_user.id, chart = "diet", "Sample data substituted");
        return Ok(Json(sample_food_breakdown()));
    }

    Ok(Json(breakdown))
}

pub async fn summary_stats(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    AppQuery(query): AppQuery<StatsRangeQuery>,
) -> AppResult<Json<EntrySummary>> {
    let (start, end) = query.bounds()?;

    let rows = sqlx::query_as::<_, (i32, Option<f64>, Option<i32>, Option<DidExercise>)>(
        r#"
        SELECT m.rating, s.hours, s.quality, e.did_exercise
        FROM daily_entries d
        JOIN moods m ON m.id = d.mood_id
        LEFT JOIN sleeps s ON s.id = d.sleep_id
        LEFT JOIN exercises e ON e.id = d.exercise_id
        WHERE d.user_id = $1 AND d.date BETWEEN $2 AND $3
        "#,
    )
    .bind(auth_user.id)
    .bind(start)
    .bind(end)
    .fetch_all(&state.db)
    .await?;

    let rows: Vec<SummaryRow> = rows
        .into_iter()
        .map(|(mood, hours, quality, did_exercise)| SummaryRow {
            mood,
            sleep: hours.zip(quality),
            did_exercise: did_exercise.map(|d| d == DidExercise::Yes),
        })
        .collect();

    Ok(Json(summarize(&rows)))
}
