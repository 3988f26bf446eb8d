// src/db/ledger_repo.rs

use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::ledger::{
        Sale, SaleDetail, Transaction, TransactionCancellation, TransactionHeader,
    },
};

const HEADER_SELECT: &str = r#"
    SELECT
        t.id, t.sales_day_id, t.payment_type_id,
        pt.name AS payment_type_name,
        pt.kind AS payment_kind,
        t.user_id, t.cash_opening_id, t.total, t.observation, t.created_at
    FROM transactions t
    JOIN payment_types pt ON pt.id = t.payment_type_id
"#;

#[derive(Clone)]
pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  REGISTRO DE VENDAS
    // =========================================================================

    pub async fn insert_transaction<'e, E>(
        &self,
        executor: E,
        sales_day_id: Uuid,
        payment_type_id: Uuid,
        user_id: Option<Uuid>,
        cash_opening_id: Option<Uuid>,
        total: Decimal,
        observation: Option<&str>,
    ) -> Result<Transaction, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (
                sales_day_id, payment_type_id, user_id, cash_opening_id,
                total, observation, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, clock_timestamp())
            RETURNING
                id, sales_day_id, payment_type_id, user_id, cash_opening_id,
                total, observation, created_at
            "#,
        )
        .bind(sales_day_id)
        .bind(payment_type_id)
        .bind(user_id)
        .bind(cash_opening_id)
        .bind(total)
        .bind(observation)
        .fetch_one(executor)
        .await?;

        Ok(transaction)
    }

    pub async fn insert_sale<'e, E>(
        &self,
        executor: E,
        transaction_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        total: Decimal,
    ) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            INSERT INTO sales (transaction_id, product_id, quantity, total)
            VALUES ($1, $2, $3, $4)
            RETURNING id, transaction_id, product_id, quantity, total, created_at
            "#,
        )
        .bind(transaction_id)
        .bind(product_id)
        .bind(quantity)
        .bind(total)
        .fetch_one(executor)
        .await?;

        Ok(sale)
    }

    // =========================================================================
    //  CONSULTAS
    // =========================================================================

    pub async fn find_header<'e, E>(
        &self,
        executor: E,
        transaction_id: Uuid,
    ) -> Result<Option<TransactionHeader>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("{HEADER_SELECT} WHERE t.id = $1");
        let header = sqlx::query_as::<_, TransactionHeader>(&sql)
            .bind(transaction_id)
            .fetch_optional(executor)
            .await?;

        Ok(header)
    }

    /// Pendentes do dia, mais recentes primeiro.
    pub async fn list_pending_headers<'e, E>(
        &self,
        executor: E,
        sales_day_id: Uuid,
    ) -> Result<Vec<TransactionHeader>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "{HEADER_SELECT} WHERE t.sales_day_id = $1 AND pt.kind = 'DEFERRED' \
             ORDER BY t.created_at DESC"
        );
        let headers = sqlx::query_as::<_, TransactionHeader>(&sql)
            .bind(sales_day_id)
            .fetch_all(executor)
            .await?;

        Ok(headers)
    }

    /// Linhas (com produto) de um conjunto de transações.
    pub async fn list_sale_details<'e, E>(
        &self,
        executor: E,
        transaction_ids: &[Uuid],
    ) -> Result<Vec<SaleDetail>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let details = sqlx::query_as::<_, SaleDetail>(
            r#"
            SELECT
                s.id, s.transaction_id, s.product_id,
                p.name AS product_name,
                p.price AS product_price,
                s.quantity, s.total
            FROM sales s
            JOIN products p ON p.id = s.product_id
            WHERE s.transaction_id = ANY($1)
            ORDER BY s.created_at ASC, s.id ASC
            "#,
        )
        .bind(transaction_ids)
        .fetch_all(executor)
        .await?;

        Ok(details)
    }

    // =========================================================================
    //  PENDENTES: RESOLUÇÃO E CANCELAMENTO
    // =========================================================================

    pub async fn update_payment_type<'e, E>(
        &self,
        executor: E,
        transaction_id: Uuid,
        payment_type_id: Uuid,
    ) -> Result<Option<Transaction>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let transaction = sqlx::query_as::<_, Transaction>(
            r#"
            UPDATE transactions SET payment_type_id = $1
            WHERE id = $2
            RETURNING
                id, sales_day_id, payment_type_id, user_id, cash_opening_id,
                total, observation, created_at
            "#,
        )
        .bind(payment_type_id)
        .bind(transaction_id)
        .fetch_optional(executor)
        .await?;

        Ok(transaction)
    }

    pub async fn insert_cancellation<'e, E>(
        &self,
        executor: E,
        header: &TransactionHeader,
        lines: &[SaleDetail],
        reason: &str,
        cancelled_by: Option<Uuid>,
    ) -> Result<TransactionCancellation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tombstone = sqlx::query_as::<_, TransactionCancellation>(
            r#"
            INSERT INTO transaction_cancellations (
                transaction_id, sales_day_id, payment_type_id, user_id, total,
                observation, lines, reason, cancelled_by, transaction_created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING
                id, transaction_id, sales_day_id, payment_type_id, user_id, total,
                observation, lines, reason, cancelled_by, transaction_created_at, cancelled_at
            "#,
        )
        .bind(header.id)
        .bind(header.sales_day_id)
        .bind(header.payment_type_id)
        .bind(header.user_id)
        .bind(header.total)
        .bind(header.observation.as_deref())
        .bind(Json(lines))
        .bind(reason)
        .bind(cancelled_by)
        .bind(header.created_at)
        .fetch_one(executor)
        .await?;

        Ok(tombstone)
    }

    /// Remove a transação; as linhas caem em cascata.
    pub async fn delete_transaction<'e, E>(
        &self,
        executor: E,
        transaction_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(transaction_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn list_cancellations(
        &self,
        sales_day_id: Uuid,
    ) -> Result<Vec<TransactionCancellation>, AppError> {
        let rows = sqlx::query_as::<_, TransactionCancellation>(
            r#"
            SELECT
                id, transaction_id, sales_day_id, payment_type_id, user_id, total,
                observation, lines, reason, cancelled_by, transaction_created_at, cancelled_at
            FROM transaction_cancellations
            WHERE sales_day_id = $1
            ORDER BY cancelled_at DESC
            "#,
        )
        .bind(sales_day_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
