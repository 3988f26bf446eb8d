// src/handlers/sales.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::get_connection,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::i18n::Locale,
    models::{
        closing::CashClosing,
        ledger::{CartItem, RecordedSale, Transaction, TransactionCancellation, TransactionDetail},
        reconciliation::ReconciliationSummary,
    },
};

// =============================================================================
//  1. REGISTRO DE VENDAS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItemPayload {
    pub product_id: Uuid,

    #[validate(range(min = 1, message = "A quantidade deve ser maior que zero."))]
    #[schema(example = 2)]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordSalePayload {
    pub sales_day_id: Uuid,
    pub payment_type_id: Uuid,

    #[validate(nested)]
    #[serde(default)]
    pub items: Vec<CartItemPayload>,

    #[validate(length(max = 500, message = "Observação muito longa."))]
    #[schema(example = "Mesa 4")]
    pub observation: Option<String>,

    /// Operador do caixa; se informado, precisa de sessão ativa no dia
    pub user_id: Option<Uuid>,
}

// POST /api/sales
#[utoipa::path(
    post,
    path = "/api/sales",
    tag = "Sales",
    request_body = RecordSalePayload,
    responses(
        (status = 201, description = "Venda registrada", body = RecordedSale),
        (status = 400, description = "Carrinho ou forma de pagamento inválidos"),
        (status = 404, description = "Dia ou produto inexistente"),
        (status = 409, description = "Operador sem sessão ativa")
    )
)]
pub async fn record_sale(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<RecordSalePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let items: Vec<CartItem> = payload
        .items
        .iter()
        .map(|i| CartItem { product_id: i.product_id, quantity: i.quantity })
        .collect();

    let mut conn = get_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let recorded = app_state
        .ledger_service
        .record_sale(
            &mut *conn,
            payload.sales_day_id,
            payload.payment_type_id,
            &items,
            payload.observation.as_deref(),
            payload.user_id,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(recorded)))
}

// =============================================================================
//  2. PENDENTES
// =============================================================================

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SalesDayQuery {
    pub sales_day_id: Uuid,
}

// GET /api/sales/pending
#[utoipa::path(
    get,
    path = "/api/sales/pending",
    tag = "Sales",
    params(SalesDayQuery),
    responses(
        (status = 200, description = "Transações pendentes do dia", body = Vec<TransactionDetail>)
    )
)]
pub async fn list_pending(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<SalesDayQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = get_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let pending = app_state
        .pending_service
        .list_pending(&mut *conn, query.sales_day_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(pending))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolvePendingPayload {
    pub payment_type_id: Uuid,
}

// PUT /api/sales/{id}/payment-type
#[utoipa::path(
    put,
    path = "/api/sales/{id}/payment-type",
    tag = "Sales",
    request_body = ResolvePendingPayload,
    params(("id" = Uuid, Path, description = "ID da transação")),
    responses(
        (status = 200, description = "Forma de pagamento atualizada", body = Transaction),
        (status = 404, description = "Transação inexistente")
    )
)]
pub async fn resolve_pending(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(transaction_id): Path<Uuid>,
    Json(payload): Json<ResolvePendingPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = get_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let transaction = app_state
        .pending_service
        .resolve_pending(&mut *conn, transaction_id, payload.payment_type_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(transaction))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelTransactionPayload {
    #[serde(default)]
    #[validate(length(max = 500, message = "Motivo muito longo."))]
    #[schema(example = "Cliente desistiu")]
    pub reason: String,

    pub user_id: Option<Uuid>,
}

// DELETE /api/sales/{id}
#[utoipa::path(
    delete,
    path = "/api/sales/{id}",
    tag = "Sales",
    request_body = CancelTransactionPayload,
    params(("id" = Uuid, Path, description = "ID da transação")),
    responses(
        (status = 200, description = "Transação cancelada", body = TransactionCancellation),
        (status = 400, description = "Motivo ausente"),
        (status = 404, description = "Transação inexistente")
    )
)]
pub async fn cancel_transaction(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(transaction_id): Path<Uuid>,
    Json(payload): Json<CancelTransactionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut conn = get_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let tombstone = app_state
        .pending_service
        .cancel_transaction(&mut *conn, transaction_id, &payload.reason, payload.user_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(tombstone))
}

// GET /api/sales/cancellations
#[utoipa::path(
    get,
    path = "/api/sales/cancellations",
    tag = "Sales",
    params(SalesDayQuery),
    responses(
        (status = 200, description = "Cancelamentos do dia", body = Vec<TransactionCancellation>)
    )
)]
pub async fn list_cancellations(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<SalesDayQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let cancellations = app_state
        .pending_service
        .list_cancellations(query.sales_day_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(cancellations))
}

// =============================================================================
//  3. RESUMO
// =============================================================================

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SummaryQuery {
    pub sales_day_id: Uuid,
    /// Início da janela (inclusivo)
    pub window_start: Option<DateTime<Utc>>,
    /// Só as vendas desta sessão de caixa
    pub opening_id: Option<Uuid>,
}

// GET /api/sales/summary
#[utoipa::path(
    get,
    path = "/api/sales/summary",
    tag = "Sales",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Resumo da janela corrente", body = ReconciliationSummary),
        (status = 404, description = "Dia inexistente")
    )
)]
pub async fn get_summary(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<SummaryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = get_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let summary = app_state
        .reconciliation_service
        .summarize(&mut *conn, query.sales_day_id, query.window_start, query.opening_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(summary))
}

// =============================================================================
//  4. FECHAMENTOS
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartialClosingPayload {
    pub sales_day_id: Uuid,
    pub user_id: Uuid,
    pub opening_id: Option<Uuid>,
    /// O resumo que o operador conferiu
    pub summary: ReconciliationSummary,
}

// POST /api/sales/closing
#[utoipa::path(
    post,
    path = "/api/sales/closing",
    tag = "Closings",
    request_body = PartialClosingPayload,
    responses(
        (status = 201, description = "Fechamento parcial gravado", body = CashClosing),
        (status = 400, description = "Nada para fechar"),
        (status = 409, description = "Resumo desatualizado, pendentes, vendas fora do recorte ou dia finalizado")
    )
)]
pub async fn create_partial_closing(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<PartialClosingPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = get_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let closing = app_state
        .closing_service
        .create_partial_closing(
            &mut *conn,
            payload.sales_day_id,
            payload.user_id,
            &payload.summary,
            payload.opening_id,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(closing)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinalClosingPayload {
    pub sales_day_id: Uuid,
    pub user_id: Uuid,
}

// POST /api/sales/final-closing
#[utoipa::path(
    post,
    path = "/api/sales/final-closing",
    tag = "Closings",
    request_body = FinalClosingPayload,
    responses(
        (status = 201, description = "Fechamento final gravado", body = CashClosing),
        (status = 409, description = "Sem parciais, vendas abertas ou dia já finalizado")
    )
)]
pub async fn create_final_closing(
    State(app_state): State<AppState>,
    locale: Locale,
    Json(payload): Json<FinalClosingPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut conn = get_connection(&app_state)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let closing = app_state
        .closing_service
        .create_final_closing(&mut *conn, payload.sales_day_id, payload.user_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(closing)))
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ClosingsQuery {
    pub sales_day_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

// GET /api/sales/closings
#[utoipa::path(
    get,
    path = "/api/sales/closings",
    tag = "Closings",
    params(ClosingsQuery),
    responses(
        (status = 200, description = "Histórico de fechamentos", body = Vec<CashClosing>)
    )
)]
pub async fn list_closings(
    State(app_state): State<AppState>,
    locale: Locale,
    Query(query): Query<ClosingsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let closings = app_state
        .closing_service
        .list_closings(query.sales_day_id, query.user_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(closings))
}
