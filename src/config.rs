// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    common::i18n::I18nStore,
    db::{
        CashSessionRepository, CatalogRepository, ClosingRepository, LedgerRepository,
        ReconciliationRepository,
    },
    services::{
        CashSessionService, ClosingService, LedgerService, OpeningNotifier, PendingService,
        ReconciliationService,
    },
};

// =========================================================================
//  CONFIGURAÇÃO (variáveis de ambiente / .env)
// =========================================================================

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    /// E-mail tratado como administrador além do papel ADMIN
    pub admin_email: Option<String>,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub opening_events_buffer: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        // Sem .env tudo bem: em produção as variáveis vêm do ambiente
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let admin_email = env::var("ADMIN_EMAIL")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Ok(Self {
            database_url,
            bind_addr,
            admin_email,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 5)?,
            db_acquire_timeout: Duration::from_secs(parse_or("DB_ACQUIRE_TIMEOUT_SECS", 3)?),
            opening_events_buffer: parse_or("OPENING_EVENTS_BUFFER", 64)?,
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} inválida ('{}'): {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

// =========================================================================
//  ESTADO COMPARTILHADO
// =========================================================================

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub i18n_store: Arc<I18nStore>,

    pub catalog_repo: CatalogRepository,
    pub ledger_service: LedgerService,
    pub pending_service: PendingService,
    pub reconciliation_service: ReconciliationService,
    pub cash_session_service: CashSessionService,
    pub closing_service: ClosingService,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(config.db_acquire_timeout)
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let i18n_store = I18nStore::load()?;

        // --- Monta o gráfico de dependências ---
        let catalog_repo = CatalogRepository::new(db_pool.clone());
        let session_repo = CashSessionRepository::new(db_pool.clone());
        let ledger_repo = LedgerRepository::new(db_pool.clone());
        let reconciliation_repo = ReconciliationRepository::new();
        let closing_repo = ClosingRepository::new(db_pool.clone());

        let notifier = OpeningNotifier::new(config.opening_events_buffer);

        let reconciliation_service = ReconciliationService::new(
            reconciliation_repo,
            catalog_repo.clone(),
            session_repo.clone(),
        );
        let ledger_service =
            LedgerService::new(ledger_repo.clone(), catalog_repo.clone(), session_repo.clone());
        let pending_service = PendingService::new(ledger_repo, catalog_repo.clone());
        let cash_session_service = CashSessionService::new(
            session_repo,
            catalog_repo.clone(),
            reconciliation_service.clone(),
            notifier,
            config.admin_email.clone(),
        );
        let closing_service = ClosingService::new(
            closing_repo,
            catalog_repo.clone(),
            reconciliation_service.clone(),
        );

        Ok(Self {
            db_pool,
            i18n_store: Arc::new(i18n_store),
            catalog_repo,
            ledger_service,
            pending_service,
            reconciliation_service,
            cash_session_service,
            closing_service,
        })
    }
}
