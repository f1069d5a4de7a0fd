use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::db::with_transaction;
use crate::error::{AppError, AppResult};
use crate::extract::{AppJson, AppQuery};
use crate::models::daily_entry::{
    DailyEntryDetail, DailyEntryRequest, EntryCheckResponse, EntryListQuery, EntryRangeQuery,
    EntryStatus, EntryStatusResponse,
};
use crate::services::entry_composite::{
    create_entry, find_in_range, find_owned, list_in_range, load_sections, update_entry,
};
use crate::AppState;

/// Window listed when the client sends no bounds.
const DEFAULT_LIST_DAYS: i64 = 30;

pub async fn create_daily_entry(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    AppJson(body): AppJson<DailyEntryRequest>,
) -> AppResult<Json<DailyEntryDetail>> {
    body.validate()?;

    let user_id = auth_user.id;
    let detail = with_transaction(&state.db, move |tx| {
        Box::pin(async move { create_entry(&mut **tx, user_id, body).await })
    })
    .await?;

    tracing::info!(user_id = %user_id, entry_id = %detail.id, "Daily entry created");

    Ok(Json(detail))
}

pub async fn get_daily_entry(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(entry_id): Path<Uuid>,
) -> AppResult<Json<DailyEntryDetail>> {
    let mut conn = state.db.acquire().await?;

    let loaded = find_owned(&mut conn, auth_user.id, entry_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Entry not found".into()))?;

    Ok(Json(loaded.into_detail()?))
}

pub async fn update_daily_entry(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(entry_id): Path<Uuid>,
    AppJson(body): AppJson<DailyEntryRequest>,
) -> AppResult<Json<DailyEntryDetail>> {
    body.validate()?;

    let user_id = auth_user.id;
    let detail = with_transaction(&state.db, move |tx| {
        Box::pin(async move { update_entry(&mut **tx, user_id, entry_id, body).await })
    })
    .await?;

    tracing::info!(user_id = %user_id, entry_id = %entry_id, "Daily entry updated");

    Ok(Json(detail))
}

pub async fn list_daily_entries(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    AppQuery(query): AppQuery<EntryListQuery>,
) -> AppResult<Json<Vec<DailyEntryDetail>>> {
    let end = query.end.unwrap_or_else(Utc::now);
    let start = query
        .start
        .unwrap_or_else(|| end - Duration::days(DEFAULT_LIST_DAYS));

    if start > end {
        return Err(AppError::Validation(
            "Start date must not be after end date".into(),
        ));
    }

    let mut conn = state.db.acquire().await?;
    let entries = list_in_range(&mut conn, auth_user.id, start, end).await?;

    Ok(Json(entries))
}

pub async fn check_daily_entry(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    AppQuery(query): AppQuery<EntryRangeQuery>,
) -> AppResult<Json<EntryCheckResponse>> {
    let (start, end) = query.require().map_err(AppError::Validation)?;

    let mut conn = state.db.acquire().await?;
    let entry = find_in_range(&mut conn, auth_user.id, start, end).await?;

    Ok(Json(EntryCheckResponse {
        exists: entry.is_some(),
        entry_id: entry.map(|e| e.id),
    }))
}

pub async fn daily_entry_status(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    AppQuery(query): AppQuery<EntryRangeQuery>,
) -> AppResult<Json<EntryStatusResponse>> {
    let (start, end) = query.require().map_err(AppError::Validation)?;

    let mut conn = state.db.acquire().await?;
    let Some(entry) = find_in_range(&mut conn, auth_user.id, start, end).await? else {
        return Ok(Json(EntryStatusResponse {
            status: EntryStatus::None,
            entry_id: None,
        }));
    };

    let entry_id = entry.id;
    let loaded = load_sections(&mut conn, entry).await?;

    Ok(Json(EntryStatusResponse {
        status: loaded.status(),
        entry_id: Some(entry_id),
    }))
}
