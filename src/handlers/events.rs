//! Event route handlers

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::handlers::{ApiError, ApiResponse, AppState};
use crate::middleware::auth::CurrentUser;
use crate::models::event::{
    CreateEventRequest, Event, EventFilter, EventStatus, Pagination, UpdateEventRequest,
};

pub async fn create_event(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Json(request): Json<CreateEventRequest>,
) -> Result<Json<ApiResponse<Event>>, ApiError> {
    let event = state
        .services
        .event_service
        .create_event(&caller, request)
        .await?;

    Ok(ApiResponse::ok(event))
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Json<ApiResponse<Event>>, ApiError> {
    let event = state.services.event_service.get_event(event_id).await?;

    Ok(ApiResponse::ok(event))
}

pub async fn update_event(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(event_id): Path<i64>,
    Json(request): Json<UpdateEventRequest>,
) -> Result<Json<ApiResponse<Event>>, ApiError> {
    let event = state
        .services
        .event_service
        .update_event(&caller, event_id, request)
        .await?;

    Ok(ApiResponse::ok(event))
}

pub async fn archive_event(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(event_id): Path<i64>,
) -> Result<Json<ApiResponse<Event>>, ApiError> {
    let event = state
        .services
        .event_service
        .archive_event(&caller, event_id)
        .await?;

    Ok(ApiResponse::ok(event))
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<ApiResponse<Vec<Event>>>, ApiError> {
    let events = state
        .services
        .event_service
        .list_events(&filter, pagination)
        .await?;

    Ok(ApiResponse::ok(events))
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub async fn status_counts(
    State(state): State<AppState>,
    CurrentUser(_caller): CurrentUser,
    Query(query): Query<StatsQuery>,
) -> Result<Json<ApiResponse<HashMap<String, i64>>>, ApiError> {
    let counts = state
        .services
        .event_service
        .status_counts(query.from, query.to)
        .await?;

    Ok(ApiResponse::ok(counts))
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    #[serde(default = "default_days_ahead")]
    pub days_ahead: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_days_ahead() -> i64 {
    30
}

fn default_limit() -> i64 {
    50
}

pub async fn upcoming_events(
    State(state): State<AppState>,
    Query(query): Query<UpcomingQuery>,
) -> Result<Json<ApiResponse<Vec<Event>>>, ApiError> {
    let events = state
        .services
        .event_service
        .upcoming_events(
            query.days_ahead,
            &[EventStatus::Upcoming, EventStatus::Ongoing],
            query.limit,
        )
        .await?;

    Ok(ApiResponse::ok(events))
}
