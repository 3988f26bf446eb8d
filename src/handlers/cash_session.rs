// src/handlers/cash_session.rs

use std::{convert::Infallible, time::Duration};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event as SseEvent, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio_stream::{once, wrappers::BroadcastStream, StreamExt};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::{
        db_utils::get_connection,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::i18n::Locale,
    models::cash_session::{CashOpening, OpeningDecision, OpeningEvent},
};

fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if *val < Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

// =============================================================================
//  1. PEDIDO E AUTORIZAÇÃO
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenCashPayload {
    pub user_id: Uuid,
    pub sales_day_id: Uuid,
}

// POST /api/sales/open-cash
#[utoipa::path(
    post,
    path = "/api/sales/open-cash",
    tag = "Cash Session",
    request_body = OpenCashPayload,
    responses(
        (status = 201, description = "Pedido de abertura criado", body = CashOpening),
        (status = 409, description = "Já existe sessão aberta para o usuário no dia")
    )
)]
pub async fn request_opening(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<OpenCashPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = get_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let opening = app_state
        .cash_session_service
        .request_opening(&mut *conn, payload.user_id, payload.sales_day_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(opening)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeOpeningPayload {
    pub admin_id: Uuid,
    #[schema(example = "authorized")]
    pub status: OpeningDecision,
}

// POST /api/sales/authorize-opening/{id}
#[utoipa::path(
    post,
    path = "/api/sales/authorize-opening/{id}",
    tag = "Cash Session",
    request_body = AuthorizeOpeningPayload,
    params(("id" = Uuid, Path, description = "ID da abertura")),
    responses(
        (status = 200, description = "Decisão registrada", body = CashOpening),
        (status = 403, description = "Usuário não é administrador"),
        (status = 409, description = "Transição inválida")
    )
)]
pub async fn decide_opening(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(opening_id): Path<Uuid>,
    Json(payload): Json<AuthorizeOpeningPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = get_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let opening = app_state
        .cash_session_service
        .decide_opening(&mut *conn, opening_id, payload.admin_id, payload.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(opening))
}

// =============================================================================
//  2. CONFIRMAÇÃO E FECHAMENTO
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmOpeningPayload {
    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "25000")]
    pub initial_cash: Option<Decimal>,

    pub user_id: Option<Uuid>,
}

// POST /api/sales/confirm-opening/{id}
#[utoipa::path(
    post,
    path = "/api/sales/confirm-opening/{id}",
    tag = "Cash Session",
    request_body = ConfirmOpeningPayload,
    params(("id" = Uuid, Path, description = "ID da abertura")),
    responses(
        (status = 200, description = "Sessão ativa", body = CashOpening),
        (status = 400, description = "Valor inicial ausente ou negativo"),
        (status = 409, description = "Abertura não autorizada")
    )
)]
pub async fn confirm_opening(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(opening_id): Path<Uuid>,
    Json(payload): Json<ConfirmOpeningPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut conn = get_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let opening = app_state
        .cash_session_service
        .confirm_opening(&mut *conn, opening_id, payload.initial_cash, payload.user_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(opening))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloseCashPayload {
    pub user_id: Uuid,
}

// PUT /api/sales/close-cash/{id}
#[utoipa::path(
    put,
    path = "/api/sales/close-cash/{id}",
    tag = "Cash Session",
    request_body = CloseCashPayload,
    params(("id" = Uuid, Path, description = "ID da abertura")),
    responses(
        (status = 200, description = "Sessão fechada", body = CashOpening),
        (status = 403, description = "Nem dono da sessão nem administrador"),
        (status = 409, description = "Sessão não ativa ou com vendas não conciliadas")
    )
)]
pub async fn close_session(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(opening_id): Path<Uuid>,
    Json(payload): Json<CloseCashPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = get_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let opening = app_state
        .cash_session_service
        .close_session(&mut *conn, opening_id, payload.user_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(opening))
}

// =============================================================================
//  3. ESTADO (polling e push)
// =============================================================================

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ActiveOpeningQuery {
    pub sales_day_id: Uuid,
    pub user_id: Uuid,
}

// GET /api/sales/active-opening
#[utoipa::path(
    get,
    path = "/api/sales/active-opening",
    tag = "Cash Session",
    params(ActiveOpeningQuery),
    responses(
        (status = 200, description = "Abertura mais recente não fechada (ou null)", body = CashOpening)
    )
)]
pub async fn active_opening(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<ActiveOpeningQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let opening = app_state
        .cash_session_service
        .active_opening(query.sales_day_id, query.user_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(opening))
}

fn to_sse(event: &OpeningEvent) -> SseEvent {
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    SseEvent::default().event("opening").data(data)
}

// GET /api/sales/openings/{id}/events
#[utoipa::path(
    get,
    path = "/api/sales/openings/{id}/events",
    tag = "Cash Session",
    params(("id" = Uuid, Path, description = "ID da abertura")),
    responses(
        (status = 200, description = "Stream SSE com o estado atual e cada transição", content_type = "text/event-stream", body = OpeningEvent),
        (status = 404, description = "Abertura inexistente")
    )
)]
pub async fn opening_events(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(opening_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    // Assina antes de ler: nenhuma transição se perde entre a leitura e o stream
    let rx = app_state.cash_session_service.notifier().subscribe();

    let current = app_state
        .cash_session_service
        .find_opening(&app_state.db_pool, opening_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let first = once(Ok::<_, Infallible>(to_sse(&OpeningEvent::from(&current))));
    let updates = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(event) if event.opening_id == opening_id => Some(Ok::<_, Infallible>(to_sse(&event))),
        Ok(_) => None,
        Err(lagged) => {
            tracing::warn!("Assinante da abertura {} atrasado: {}", opening_id, lagged);
            None
        }
    });

    Ok(Sse::new(first.chain(updates)).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
