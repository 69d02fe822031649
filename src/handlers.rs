use crate::errors::AppError;
use crate::models::{
    AnchorQuery, CalendarQuery, CreateHabitRequest, Habit, HabitId, RenameHabitRequest,
    SyncResponse, ToggleRequest, normalize_day,
};
use crate::report::{REPORT_FILE_NAME, build_report, render_text};
use crate::state::AppState;
use crate::stats::{DayStatus, StatsResponse, build_stats_at, month_calendar};
use crate::ui::render_index;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse},
};
use chrono::{Datelike, Local, NaiveDate};

pub async fn index() -> Html<String> {
    Html(render_index(&today().to_string()))
}

pub async fn list_habits(State(state): State<AppState>) -> Json<Vec<Habit>> {
    Json(state.tracker.snapshot().await)
}

pub async fn create_habit(
    State(state): State<AppState>,
    Json(payload): Json<CreateHabitRequest>,
) -> Result<(StatusCode, Json<Habit>), AppError> {
    let habit = state.tracker.create(&payload.name).await?;
    Ok((StatusCode::CREATED, Json(habit)))
}

pub async fn rename_habit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<RenameHabitRequest>,
) -> Result<Json<Habit>, AppError> {
    let habit = state
        .tracker
        .rename(&HabitId::new(id), &payload.name)
        .await?;
    Ok(Json(habit))
}

pub async fn delete_habit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.tracker.remove(&HabitId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_habit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Option<Json<ToggleRequest>>,
) -> Result<Json<Habit>, AppError> {
    let request = payload.map(|Json(body)| body).unwrap_or_default();
    let day = anchor_day(request.date.as_deref())?;
    let habit = state
        .tracker
        .toggle_completion(&HabitId::new(id), day)
        .await?;
    Ok(Json(habit))
}

pub async fn get_stats(
    State(state): State<AppState>,
    Query(query): Query<AnchorQuery>,
) -> Result<Json<StatsResponse>, AppError> {
    let today = anchor_day(query.today.as_deref())?;
    let snapshot = state.tracker.snapshot().await;
    Ok(Json(build_stats_at(today, &snapshot)))
}

pub async fn get_calendar(
    State(state): State<AppState>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<Vec<DayStatus>>, AppError> {
    let (year, month) = match query.month.as_deref() {
        Some(value) => parse_month(value)?,
        None => {
            let today = today();
            (today.year(), today.month())
        }
    };
    let snapshot = state.tracker.snapshot().await;
    let days = month_calendar(&snapshot, year, month)
        .ok_or_else(|| AppError::bad_request("month out of range"))?;
    Ok(Json(days))
}

pub async fn get_report(
    State(state): State<AppState>,
    Query(query): Query<AnchorQuery>,
) -> Result<impl IntoResponse, AppError> {
    let today = anchor_day(query.today.as_deref())?;
    let snapshot = state.tracker.snapshot().await;
    let body = render_text(&build_report(&snapshot, today));
    let headers = [
        (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{REPORT_FILE_NAME}\""),
        ),
    ];
    Ok((headers, body))
}

pub async fn sync(State(state): State<AppState>) -> Result<Json<SyncResponse>, AppError> {
    let report = state.tracker.refresh().await?;
    Ok(Json(SyncResponse {
        habit_count: report.habit_count,
        pushed: report.pushed,
        failed: report.failed,
    }))
}

fn anchor_day(value: Option<&str>) -> Result<NaiveDate, AppError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(normalize_day(value)?),
        _ => Ok(today()),
    }
}

fn parse_month(value: &str) -> Result<(i32, u32), AppError> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", value.trim()), "%Y-%m-%d")
        .map_err(|_| AppError::bad_request("month must look like YYYY-MM"))?;
    Ok((first.year(), first.month()))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
