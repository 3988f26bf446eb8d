// src/db/closing_repo.rs

use sqlx::types::Json;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::closing::{CashClosing, NewClosing},
};

const CLOSING_COLUMNS: &str = "id, sales_day_id, user_id, cash_opening_id, is_final, \
     total_general, total_efectivo, total_tarjeta, total_sinpe, total_otros, total_pendiente, \
     total_comisiones, total_ganancia_grupos, details, window_start, created_at";

// Fechamentos são só-inserção (o banco rejeita UPDATE/DELETE)
#[derive(Clone)]
pub struct ClosingRepository {
    pool: PgPool,
}

impl ClosingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Grava o fechamento. `created_at` é o relógio real, já dentro da trava do dia.
    pub async fn insert<'e, E>(
        &self,
        executor: E,
        closing: &NewClosing,
    ) -> Result<CashClosing, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // sqlx::Error cru: o índice de final único vira conflito no service
        let sql = format!(
            r#"
            INSERT INTO cash_closings (
                sales_day_id, user_id, cash_opening_id, is_final,
                total_general, total_efectivo, total_tarjeta, total_sinpe,
                total_otros, total_pendiente, total_comisiones, total_ganancia_grupos,
                details, window_start, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, clock_timestamp())
            RETURNING {CLOSING_COLUMNS}
            "#
        );
        let totals = &closing.totals;

        sqlx::query_as::<_, CashClosing>(&sql)
            .bind(closing.sales_day_id)
            .bind(closing.user_id)
            .bind(closing.cash_opening_id)
            .bind(closing.is_final)
            .bind(totals.total_general)
            .bind(totals.total_efectivo)
            .bind(totals.total_tarjeta)
            .bind(totals.total_sinpe)
            .bind(totals.total_otros)
            .bind(totals.total_pendiente)
            .bind(totals.total_comisiones)
            .bind(totals.total_ganancia_grupos)
            .bind(Json(&closing.details))
            .bind(closing.window_start)
            .fetch_one(executor)
            .await
    }

    /// Fechamentos do dia em ordem cronológica.
    pub async fn list_for_day<'e, E>(
        &self,
        executor: E,
        sales_day_id: Uuid,
    ) -> Result<Vec<CashClosing>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {CLOSING_COLUMNS} FROM cash_closings \
             WHERE sales_day_id = $1 \
             ORDER BY created_at ASC"
        );
        let closings = sqlx::query_as::<_, CashClosing>(&sql)
            .bind(sales_day_id)
            .fetch_all(executor)
            .await?;

        Ok(closings)
    }

    /// Histórico, mais recentes primeiro. Filtros opcionais.
    pub async fn list(
        &self,
        sales_day_id: Option<Uuid>,
        user_id: Option<Uuid>,
    ) -> Result<Vec<CashClosing>, AppError> {
        let sql = format!(
            "SELECT {CLOSING_COLUMNS} FROM cash_closings \
             WHERE ($1::uuid IS NULL OR sales_day_id = $1) \
               AND ($2::uuid IS NULL OR user_id = $2) \
             ORDER BY created_at DESC"
        );
        let closings = sqlx::query_as::<_, CashClosing>(&sql)
            .bind(sales_day_id)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(closings)
    }
}
