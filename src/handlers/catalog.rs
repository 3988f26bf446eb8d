// src/handlers/catalog.rs

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
    models::catalog::{PaymentType, SellableProduct},
};

// GET /api/catalog/payment-types
#[utoipa::path(
    get,
    path = "/api/catalog/payment-types",
    tag = "Catalog",
    responses(
        (status = 200, description = "Formas de pagamento", body = Vec<PaymentType>)
    )
)]
pub async fn list_payment_types(
    State(app_state): State<AppState>,
    locale: Locale,
) -> Result<impl IntoResponse, ApiError> {
    let types = app_state
        .catalog_repo
        .list_payment_types()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(types))
}

// GET /api/catalog/sales-days/{id}/products
#[utoipa::path(
    get,
    path = "/api/catalog/sales-days/{id}/products",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "ID do dia de vendas")),
    responses(
        (status = 200, description = "Produtos vendáveis no dia", body = Vec<SellableProduct>),
        (status = 404, description = "Dia inexistente")
    )
)]
pub async fn list_sellable_products(
    State(app_state): State<AppState>,
    locale: Locale,
    Path(sales_day_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .catalog_repo
        .find_sales_day(&app_state.db_pool, sales_day_id)
        .await
        .and_then(|day| day.ok_or(AppError::SalesDayNotFound(sales_day_id)))
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let products = app_state
        .catalog_repo
        .list_sellable_products(sales_day_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(products))
}
