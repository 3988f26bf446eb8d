// src/main.rs

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppConfig, AppState};
use crate::docs::ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG controla o nível; padrão "info"
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = AppConfig::from_env()?;
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(config).await?;

    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let app = router(app_state);

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(app_state: AppState) -> Router {
    // Vendas, pendentes, resumo e fechamentos
    let sales_routes = Router::new()
        .route("/", post(handlers::sales::record_sale))
        .route("/pending", get(handlers::sales::list_pending))
        .route("/cancellations", get(handlers::sales::list_cancellations))
        .route("/summary", get(handlers::sales::get_summary))
        .route("/closing", post(handlers::sales::create_partial_closing))
        .route("/final-closing", post(handlers::sales::create_final_closing))
        .route("/closings", get(handlers::sales::list_closings))
        .route("/{id}", delete(handlers::sales::cancel_transaction))
        .route("/{id}/payment-type", put(handlers::sales::resolve_pending))
        // Sessão de caixa
        .route("/open-cash", post(handlers::cash_session::request_opening))
        .route("/authorize-opening/{id}", post(handlers::cash_session::decide_opening))
        .route("/confirm-opening/{id}", post(handlers::cash_session::confirm_opening))
        .route("/active-opening", get(handlers::cash_session::active_opening))
        .route("/openings/{id}/events", get(handlers::cash_session::opening_events))
        .route("/close-cash/{id}", put(handlers::cash_session::close_session));

    let catalog_routes = Router::new()
        .route("/payment-types", get(handlers::catalog::list_payment_types))
        .route("/sales-days/{id}/products", get(handlers::catalog::list_sellable_products));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/sales", sales_routes)
        .nest("/api/catalog", catalog_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}
