// src/db/reconciliation_repo.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, FromRow, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        catalog::PaymentKind,
        reconciliation::{SupplierRates, WindowLine, WindowTransaction},
    },
};

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: Uuid,
    cash_opening_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    total: Decimal,
    payment_kind: PaymentKind,
}

#[derive(Debug, FromRow)]
struct LineRow {
    transaction_id: Uuid,
    product_id: Uuid,
    product_name: String,
    quantity: i32,
    total: Decimal,
    supplier_id: Option<Uuid>,
    supplier_name: Option<String>,
    commission: Option<Decimal>,
    dataphone_commission: Option<Decimal>,
}

// Leituras de apuração (o "dashboard" do caixa).
// Sem pool própria: roda sempre dentro da transação de quem chama.
#[derive(Clone, Default)]
pub struct ReconciliationRepository;

impl ReconciliationRepository {
    pub fn new() -> Self {
        Self
    }

    /// Instante do último fechamento (parcial ou final) do dia.
    pub async fn last_closing_at<'e, E>(
        &self,
        executor: E,
        sales_day_id: Uuid,
    ) -> Result<Option<DateTime<Utc>>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row: (Option<DateTime<Utc>>,) =
            sqlx::query_as("SELECT MAX(created_at) FROM cash_closings WHERE sales_day_id = $1")
                .bind(sales_day_id)
                .fetch_one(executor)
                .await?;

        Ok(row.0)
    }

    /// Transações do dia posteriores a `after`.
    pub async fn list_transactions<'e, E>(
        &self,
        executor: E,
        sales_day_id: Uuid,
        after: Option<DateTime<Utc>>,
    ) -> Result<Vec<WindowTransaction>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT t.id, t.cash_opening_id, t.created_at, t.total, pt.kind AS payment_kind
            FROM transactions t
            JOIN payment_types pt ON pt.id = t.payment_type_id
            WHERE t.sales_day_id = $1
              AND ($2::timestamptz IS NULL OR t.created_at > $2)
            ORDER BY t.created_at ASC
            "#,
        )
        .bind(sales_day_id)
        .bind(after)
        .fetch_all(executor)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| WindowTransaction {
                id: r.id,
                cash_opening_id: r.cash_opening_id,
                created_at: r.created_at,
                total: r.total,
                payment_kind: r.payment_kind,
                lines: Vec::new(),
            })
            .collect())
    }

    /// Linhas das transações do dia, com produto e fornecedor.
    pub async fn list_lines<'e, E>(
        &self,
        executor: E,
        sales_day_id: Uuid,
        after: Option<DateTime<Utc>>,
    ) -> Result<HashMap<Uuid, Vec<WindowLine>>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, LineRow>(
            r#"
            SELECT
                s.transaction_id,
                p.id AS product_id,
                p.name AS product_name,
                s.quantity,
                s.total,
                sup.id AS supplier_id,
                sup.name AS supplier_name,
                sup.commission,
                sup.dataphone_commission
            FROM sales s
            JOIN transactions t ON t.id = s.transaction_id
            JOIN products p ON p.id = s.product_id
            LEFT JOIN suppliers sup ON sup.id = p.supplier_id
            WHERE t.sales_day_id = $1
              AND ($2::timestamptz IS NULL OR t.created_at > $2)
            ORDER BY s.created_at ASC, s.id ASC
            "#,
        )
        .bind(sales_day_id)
        .bind(after)
        .fetch_all(executor)
        .await?;

        let mut by_transaction: HashMap<Uuid, Vec<WindowLine>> = HashMap::new();
        for row in rows {
            let supplier = match (row.supplier_id, row.supplier_name) {
                (Some(id), Some(name)) => Some(SupplierRates {
                    id,
                    name,
                    commission: row.commission,
                    dataphone_commission: row.dataphone_commission,
                }),
                _ => None,
            };

            by_transaction
                .entry(row.transaction_id)
                .or_default()
                .push(WindowLine {
                    product_id: row.product_id,
                    product_name: row.product_name,
                    quantity: row.quantity,
                    total: row.total,
                    supplier,
                });
        }

        Ok(by_transaction)
    }
}

/// Junta cabeçalhos e linhas na entrada do motor de apuração.
pub fn assemble_window(
    mut transactions: Vec<WindowTransaction>,
    mut lines: HashMap<Uuid, Vec<WindowLine>>,
) -> Vec<WindowTransaction> {
    for transaction in &mut transactions {
        transaction.lines = lines.remove(&transaction.id).unwrap_or_default();
    }
    transactions
}
