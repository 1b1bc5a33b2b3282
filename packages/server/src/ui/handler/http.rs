//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{
    domain::{CreateSession, MessageQuery, RelayError, SessionId},
    infrastructure::dto::{
        export::{self, ExportFormat, MessagesExportDto, SessionSummaryExportDto},
        http::{
            CreateSessionDto, ExportQuery, HealthDto, HistoryMessageDto, ListSessionsQuery,
            MessagesQuery, SessionDetailDto, SessionListDto, SessionMessagesDto,
            SessionStatisticsDto, SessionSummaryDto,
        },
    },
    ui::state::AppState,
    usecase::SessionDetail,
};
use hiroba_shared::time::{format_duration, timestamp_to_rfc3339};

use super::error::ApiError;

/// Health check endpoint
pub async fn health_check() -> Json<HealthDto> {
    Json(HealthDto {
        status: "ok".to_string(),
    })
}

/// Get list of sessions, newest first
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListSessionsQuery>,
) -> Result<Json<SessionListDto>, ApiError> {
    let status = query.status()?;
    let sessions = state.list_sessions_usecase.execute(status).await;

    Ok(Json(SessionListDto {
        sessions: sessions.iter().map(SessionSummaryDto::from).collect(),
    }))
}

/// Create a session explicitly (idempotent on the session id)
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateSessionDto>,
) -> Result<(StatusCode, Json<SessionDetailDto>), ApiError> {
    let request = CreateSession::try_from(body)?;
    let session = state.create_session_usecase.execute(request).await?;
    tracing::info!(session_id = %session.id, "Session created over HTTP");

    let detail = state.get_session_detail_usecase.execute(&session.id).await?;
    Ok((StatusCode::CREATED, Json(detail_dto(detail))))
}

/// Get session detail by ID
pub async fn get_session_detail(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionDetailDto>, ApiError> {
    let session_id = SessionId::new(session_id)?;
    let detail = state.get_session_detail_usecase.execute(&session_id).await?;
    Ok(Json(detail_dto(detail)))
}

/// End a session; ending an ended session returns its detail unchanged
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionDetailDto>, ApiError> {
    let session_id = SessionId::new(session_id)?;
    state.end_session_usecase.execute(&session_id).await?;
    let detail = state.get_session_detail_usecase.execute(&session_id).await?;
    Ok(Json(detail_dto(detail)))
}

/// Delete an ended session together with its log
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSummaryDto>, ApiError> {
    let session_id = SessionId::new(session_id)?;
    let session = state.delete_session_usecase.execute(&session_id).await?;
    tracing::info!(session_id = %session_id, "Session deleted over HTTP");
    Ok(Json(SessionSummaryDto::from(&session)))
}

/// Download the session as CSV or JSON (`?format=csv|json|contributions|summary`)
pub async fn export_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let session_id = SessionId::new(session_id)?;
    let format = query.format()?;
    let snapshot = state.export_session_usecase.execute(&session_id).await?;
    let exported_at = timestamp_to_rfc3339(snapshot.exported_at.value());

    let body = match format {
        ExportFormat::Csv => export::messages_csv(&snapshot.messages).map_err(export_failed)?,
        ExportFormat::Contributions => {
            export::contributions_csv(&snapshot.statistics).map_err(export_failed)?
        }
        ExportFormat::Json => to_json(&MessagesExportDto {
            session_id: session_id.as_str().to_string(),
            exported_at,
            total_messages: snapshot.messages.len(),
            messages: snapshot.messages.iter().map(HistoryMessageDto::from).collect(),
        })?,
        ExportFormat::Summary => to_json(&SessionSummaryExportDto {
            session: detail_dto(snapshot.detail),
            statistics: SessionStatisticsDto::from_domain(&session_id, snapshot.statistics),
            exported_at,
        })?,
    };
    tracing::info!(session_id = %session_id, format = format.as_str(), "Session exported");

    let file_name = format.file_name(session_id.as_str(), snapshot.exported_at.value());
    let headers = [
        (header::CONTENT_TYPE, format.content_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        ),
    ];
    Ok((headers, body).into_response())
}

/// Get the session log, optionally filtered
pub async fn get_session_messages(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<SessionMessagesDto>, ApiError> {
    let session_id = SessionId::new(session_id)?;
    let query = MessageQuery::try_from(query)?;
    let messages = state
        .get_session_messages_usecase
        .execute(&session_id, &query)
        .await?;

    Ok(Json(SessionMessagesDto {
        session_id: session_id.into_string(),
        messages: messages.iter().map(HistoryMessageDto::from).collect(),
    }))
}

/// Get per-session and per-user message statistics
pub async fn get_session_statistics(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionStatisticsDto>, ApiError> {
    let session_id = SessionId::new(session_id)?;
    let stats = state
        .get_session_statistics_usecase
        .execute(&session_id)
        .await?;
    Ok(Json(SessionStatisticsDto::from_domain(&session_id, stats)))
}

fn export_failed(error: csv::Error) -> ApiError {
    ApiError(RelayError::Transport(format!("export failed: {}", error)))
}

fn to_json<T: Serialize>(document: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(document)
        .map_err(|e| ApiError(RelayError::Transport(format!("export failed: {}", e))))
}

// Domain Model から DTO への変換
fn detail_dto(detail: SessionDetail) -> SessionDetailDto {
    let session = detail.session;
    SessionDetailDto {
        session_id: session.id.as_str().to_string(),
        active: !session.is_ended(),
        status: session.status.as_str().to_string(),
        created_at: timestamp_to_rfc3339(session.created_at.value()),
        ended_at: session.ended_at.map(|t| timestamp_to_rfc3339(t.value())),
        password_protected: session.is_password_protected(),
        require_user_password: session.require_user_password,
        disable_user_password: session.disable_user_password,
        protected_users: session.protected_users(),
        participants: detail
            .participants
            .into_iter()
            .map(|id| id.into_string())
            .collect(),
        viewer_count: detail.viewer_count,
        total_messages: detail.total_messages,
        duration: session.duration_millis().map(format_duration),
        purpose: session.metadata.purpose,
        notes: session.metadata.notes,
    }
}
