// src/common/db_utils.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::config::AppState;

// ---
// Helper: conexão da pool para os handlers
// ---
pub(crate) async fn get_connection(
    app_state: &AppState,
) -> Result<sqlx::pool::PoolConnection<Postgres>, AppError> {
    // O operador '?' converte automaticamente sqlx::Error -> AppError::DatabaseError
    let conn = app_state.db_pool.acquire().await?;
    Ok(conn)
}

/// Trava por dia de vendas.
/// Vendas usam `Share` (podem correr em paralelo entre si);
/// fechamentos usam `Exclusive` e esperam as vendas em curso.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayLock {
    Share,
    Exclusive,
}

impl DayLock {
    fn sql(self) -> &'static str {
        match self {
            DayLock::Share => "SELECT id FROM sales_days WHERE id = $1 FOR SHARE",
            DayLock::Exclusive => "SELECT id FROM sales_days WHERE id = $1 FOR UPDATE",
        }
    }
}

/// Adquire a trava do dia dentro da transação corrente.
/// Falha com `SalesDayNotFound` se o dia não existir.
pub(crate) async fn lock_sales_day<'e, E>(
    executor: E,
    sales_day_id: Uuid,
    mode: DayLock,
) -> Result<(), AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    let locked: Option<(Uuid,)> = sqlx::query_as(mode.sql())
        .bind(sales_day_id)
        .fetch_optional(executor)
        .await?;

    locked
        .map(|_| ())
        .ok_or(AppError::SalesDayNotFound(sales_day_id))
}
