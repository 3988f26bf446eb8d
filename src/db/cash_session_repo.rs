// src/db/cash_session_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::cash_session::{CashOpening, CashOpeningStatus},
};

const OPENING_COLUMNS: &str = "id, user_id, sales_day_id, initial_cash, status, requested_at, \
     opened_at, closed_at, authorized_by, closed_by";

#[derive(Clone)]
pub struct CashSessionRepository {
    pool: PgPool,
}

impl CashSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  LEITURAS
    // =========================================================================

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        opening_id: Uuid,
    ) -> Result<Option<CashOpening>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {OPENING_COLUMNS} FROM cash_openings WHERE id = $1");
        let opening = sqlx::query_as::<_, CashOpening>(&sql)
            .bind(opening_id)
            .fetch_optional(executor)
            .await?;

        Ok(opening)
    }

    /// Mesma leitura, travando a linha até o fim da transação.
    pub async fn find_by_id_for_update<'e, E>(
        &self,
        executor: E,
        opening_id: Uuid,
    ) -> Result<Option<CashOpening>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {OPENING_COLUMNS} FROM cash_openings WHERE id = $1 FOR UPDATE");
        let opening = sqlx::query_as::<_, CashOpening>(&sql)
            .bind(opening_id)
            .fetch_optional(executor)
            .await?;

        Ok(opening)
    }

    /// Sessão que ocupa a vaga do (usuário, dia): pendente, autorizada ou ativa.
    pub async fn find_open<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        sales_day_id: Uuid,
    ) -> Result<Option<CashOpening>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {OPENING_COLUMNS} FROM cash_openings \
             WHERE user_id = $1 AND sales_day_id = $2 \
               AND status IN ('PENDING', 'AUTHORIZED', 'ACTIVE') \
             LIMIT 1"
        );
        let opening = sqlx::query_as::<_, CashOpening>(&sql)
            .bind(user_id)
            .bind(sales_day_id)
            .fetch_optional(executor)
            .await?;

        Ok(opening)
    }

    /// Mais recente não fechada (inclui negada, para o cliente ver a decisão).
    pub async fn find_latest_not_closed(
        &self,
        user_id: Uuid,
        sales_day_id: Uuid,
    ) -> Result<Option<CashOpening>, AppError> {
        let sql = format!(
            "SELECT {OPENING_COLUMNS} FROM cash_openings \
             WHERE user_id = $1 AND sales_day_id = $2 AND status <> 'CLOSED' \
             ORDER BY requested_at DESC \
             LIMIT 1"
        );
        let opening = sqlx::query_as::<_, CashOpening>(&sql)
            .bind(user_id)
            .bind(sales_day_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(opening)
    }

    // =========================================================================
    //  ESCRITAS
    // =========================================================================

    pub async fn insert_pending<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        sales_day_id: Uuid,
    ) -> Result<CashOpening, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Devolve sqlx::Error cru: o service decide o que é violação de unicidade
        let sql = format!(
            "INSERT INTO cash_openings (user_id, sales_day_id, status) \
             VALUES ($1, $2, 'PENDING') \
             RETURNING {OPENING_COLUMNS}"
        );
        sqlx::query_as::<_, CashOpening>(&sql)
            .bind(user_id)
            .bind(sales_day_id)
            .fetch_one(executor)
            .await
    }

    pub async fn record_decision<'e, E>(
        &self,
        executor: E,
        opening_id: Uuid,
        status: CashOpeningStatus,
        admin_id: Uuid,
    ) -> Result<CashOpening, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "UPDATE cash_openings SET status = $1, authorized_by = $2 \
             WHERE id = $3 \
             RETURNING {OPENING_COLUMNS}"
        );
        let opening = sqlx::query_as::<_, CashOpening>(&sql)
            .bind(status)
            .bind(admin_id)
            .bind(opening_id)
            .fetch_one(executor)
            .await?;

        Ok(opening)
    }

    pub async fn activate<'e, E>(
        &self,
        executor: E,
        opening_id: Uuid,
        initial_cash: Decimal,
    ) -> Result<CashOpening, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // clock_timestamp(): início real da sessão, limite inferior do resumo
        let sql = format!(
            "UPDATE cash_openings \
             SET status = 'ACTIVE', initial_cash = $1, opened_at = clock_timestamp() \
             WHERE id = $2 \
             RETURNING {OPENING_COLUMNS}"
        );
        let opening = sqlx::query_as::<_, CashOpening>(&sql)
            .bind(initial_cash)
            .bind(opening_id)
            .fetch_one(executor)
            .await?;

        Ok(opening)
    }

    pub async fn close<'e, E>(
        &self,
        executor: E,
        opening_id: Uuid,
        closed_by: Uuid,
    ) -> Result<CashOpening, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "UPDATE cash_openings \
             SET status = 'CLOSED', closed_at = clock_timestamp(), closed_by = $1 \
             WHERE id = $2 \
             RETURNING {OPENING_COLUMNS}"
        );
        let opening = sqlx::query_as::<_, CashOpening>(&sql)
            .bind(closed_by)
            .bind(opening_id)
            .fetch_one(executor)
            .await?;

        Ok(opening)
    }
}
