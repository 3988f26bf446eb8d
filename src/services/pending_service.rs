// src/services/pending_service.rs

use std::collections::HashMap;

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{lock_sales_day, DayLock},
        error::AppError,
    },
    db::{CatalogRepository, LedgerRepository},
    models::ledger::{
        SaleDetail, Transaction, TransactionCancellation, TransactionDetail, TransactionHeader,
    },
};

/// Motivo de cancelamento já aparado; vazio é rejeitado.
pub fn normalize_reason(reason: &str) -> Result<&str, AppError> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(AppError::ReasonRequired);
    }
    Ok(trimmed)
}

/// Distribui as linhas pelos cabeçalhos, preservando a ordem dos cabeçalhos.
pub fn attach_sales(headers: Vec<TransactionHeader>, details: Vec<SaleDetail>) -> Vec<TransactionDetail> {
    let mut by_transaction: HashMap<Uuid, Vec<SaleDetail>> = HashMap::new();
    for detail in details {
        by_transaction.entry(detail.transaction_id).or_default().push(detail);
    }

    headers
        .into_iter()
        .map(|header| {
            let sales = by_transaction.remove(&header.id).unwrap_or_default();
            TransactionDetail { header, sales }
        })
        .collect()
}

#[derive(Clone)]
pub struct PendingService {
    repo: LedgerRepository,
    catalog_repo: CatalogRepository,
}

impl PendingService {
    pub fn new(repo: LedgerRepository, catalog_repo: CatalogRepository) -> Self {
        Self { repo, catalog_repo }
    }

    /// Pendentes do dia com linhas e produtos expandidos.
    pub async fn list_pending<'e, E>(
        &self,
        executor: E,
        sales_day_id: Uuid,
    ) -> Result<Vec<TransactionDetail>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        self.catalog_repo
            .find_sales_day(&mut *tx, sales_day_id)
            .await?
            .ok_or(AppError::SalesDayNotFound(sales_day_id))?;

        let headers = self.repo.list_pending_headers(&mut *tx, sales_day_id).await?;
        let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
        let details = if ids.is_empty() {
            Vec::new()
        } else {
            self.repo.list_sale_details(&mut *tx, &ids).await?
        };

        tx.commit().await?;

        Ok(attach_sales(headers, details))
    }

    /// Troca a forma de pagamento. As linhas não mudam.
    pub async fn resolve_pending<'e, E>(
        &self,
        executor: E,
        transaction_id: Uuid,
        payment_type_id: Uuid,
    ) -> Result<Transaction, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let header = self
            .repo
            .find_header(&mut *tx, transaction_id)
            .await?
            .ok_or(AppError::TransactionNotFound(transaction_id))?;

        lock_sales_day(&mut *tx, header.sales_day_id, DayLock::Share).await?;

        let payment_type = self
            .catalog_repo
            .find_payment_type(&mut *tx, payment_type_id)
            .await?
            .ok_or(AppError::UnknownPaymentType(payment_type_id))?;

        let updated = self
            .repo
            .update_payment_type(&mut *tx, transaction_id, payment_type.id)
            .await?
            // Cancelada entre a leitura e a trava
            .ok_or(AppError::TransactionNotFound(transaction_id))?;

        tx.commit().await?;

        tracing::info!(
            "Transação {} resolvida: {} -> {}",
            transaction_id,
            header.payment_type_name,
            payment_type.name
        );

        Ok(updated)
    }

    /// Cancela a transação: grava a lápide e apaga o original (linhas em cascata).
    pub async fn cancel_transaction<'e, E>(
        &self,
        executor: E,
        transaction_id: Uuid,
        reason: &str,
        cancelled_by: Option<Uuid>,
    ) -> Result<TransactionCancellation, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let reason = normalize_reason(reason)?;

        let mut tx = executor.begin().await?;

        let header = self
            .repo
            .find_header(&mut *tx, transaction_id)
            .await?
            .ok_or(AppError::TransactionNotFound(transaction_id))?;

        lock_sales_day(&mut *tx, header.sales_day_id, DayLock::Share).await?;

        if let Some(user_id) = cancelled_by {
            self.catalog_repo
                .find_user(&mut *tx, user_id)
                .await?
                .ok_or(AppError::UserNotFound(user_id))?;
        }

        let lines = self.repo.list_sale_details(&mut *tx, &[transaction_id]).await?;
        let tombstone = self
            .repo
            .insert_cancellation(&mut *tx, &header, &lines, reason, cancelled_by)
            .await?;

        // Outra requisição pode ter apagado entre a leitura e aqui
        if self.repo.delete_transaction(&mut *tx, transaction_id).await? == 0 {
            return Err(AppError::TransactionNotFound(transaction_id));
        }

        tx.commit().await?;

        tracing::warn!(
            "Transação {} cancelada ({} linhas, total {}): {}",
            transaction_id,
            lines.len(),
            header.total,
            reason
        );

        Ok(tombstone)
    }

    pub async fn list_cancellations(
        &self,
        sales_day_id: Uuid,
    ) -> Result<Vec<TransactionCancellation>, AppError> {
        self.repo.list_cancellations(sales_day_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::PaymentKind;
    use crate::services::fixtures::Fixture;
    use sqlx::PgPool;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn header(total: i64) -> TransactionHeader {
        TransactionHeader {
            id: Uuid::new_v4(),
            sales_day_id: Uuid::new_v4(),
            payment_type_id: Uuid::new_v4(),
            payment_type_name: "Pendiente".to_string(),
            payment_kind: PaymentKind::Deferred,
            user_id: None,
            cash_opening_id: None,
            total: Decimal::from(total),
            observation: None,
            created_at: Utc::now(),
        }
    }

    fn detail(transaction_id: Uuid, total: i64) -> SaleDetail {
        SaleDetail {
            id: Uuid::new_v4(),
            transaction_id,
            product_id: Uuid::new_v4(),
            product_name: "Tamal".to_string(),
            product_price: Decimal::from(total),
            quantity: 1,
            total: Decimal::from(total),
        }
    }

    #[test]
    fn blank_reason_is_rejected() {
        assert!(matches!(normalize_reason(""), Err(AppError::ReasonRequired)));
        assert!(matches!(normalize_reason("   \t"), Err(AppError::ReasonRequired)));
        assert_eq!(normalize_reason("  Duplicado ").unwrap(), "Duplicado");
    }

    #[test]
    fn sales_are_grouped_under_their_transaction() {
        let newest = header(2000);
        let oldest = header(500);
        let details = vec![
            detail(oldest.id, 500),
            detail(newest.id, 1500),
            detail(newest.id, 500),
        ];

        let grouped = attach_sales(vec![newest.clone(), oldest.clone()], details);

        assert_eq!(grouped[0].header.id, newest.id);
        assert_eq!(grouped[0].sales.len(), 2);
        assert_eq!(grouped[1].header.id, oldest.id);
        assert_eq!(grouped[1].sales.len(), 1);
    }

    #[test]
    fn transaction_without_lines_gets_empty_list() {
        let lonely = header(0);
        let grouped = attach_sales(vec![lonely], vec![]);
        assert!(grouped[0].sales.is_empty());
    }

    // --- Com banco ---

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de Postgres em DATABASE_URL"]
    async fn cancelled_sale_leaves_pending_list_and_keeps_tombstone(pool: PgPool) {
        let fx = Fixture::seed(pool).await;
        let sale = fx.sell(fx.deferred, fx.coffee, 2, None).await;
        let id = sale.transaction.id;

        let listed = fx.pending.list_pending(&fx.pool, fx.day).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].sales.len(), 1);

        let err = fx
            .pending
            .cancel_transaction(&fx.pool, id, "   ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ReasonRequired));

        let tombstone = fx
            .pending
            .cancel_transaction(&fx.pool, id, " Duplicado ", Some(fx.admin))
            .await
            .unwrap();
        assert_eq!(tombstone.transaction_id, id);
        assert_eq!(tombstone.reason, "Duplicado");
        assert_eq!(tombstone.total, Decimal::from(1000));
        assert_eq!(tombstone.lines.0.len(), 1);

        assert!(fx.pending.list_pending(&fx.pool, fx.day).await.unwrap().is_empty());
        assert_eq!(fx.count("sales").await, 0);

        let history = fx.pending.list_cancellations(fx.day).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].transaction_id, id);

        let err = fx
            .pending
            .resolve_pending(&fx.pool, id, fx.card)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TransactionNotFound(missing) if missing == id));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de Postgres em DATABASE_URL"]
    async fn pending_sale_resolved_to_card_earns_commission(pool: PgPool) {
        let fx = Fixture::seed(pool).await;
        let sale = fx.sell(fx.deferred, fx.shirt, 2, None).await;

        let before = fx
            .reconciliation
            .summarize(&fx.pool, fx.day, None, None)
            .await
            .unwrap();
        assert_eq!(before.total_general, Decimal::ZERO);
        assert_eq!(before.total_pendiente, Decimal::from(2000));
        assert_eq!(before.pending_count, 1);

        let resolved = fx
            .pending
            .resolve_pending(&fx.pool, sale.transaction.id, fx.card)
            .await
            .unwrap();
        assert_eq!(resolved.payment_type_id, fx.card);

        let after = fx
            .reconciliation
            .summarize(&fx.pool, fx.day, None, None)
            .await
            .unwrap();
        assert_eq!(after.total_pendiente, Decimal::ZERO);
        assert_eq!(after.total_general, Decimal::from(2000));
        assert_eq!(after.total_tarjeta, Decimal::from(2000));
        assert_eq!(after.total_comisiones, Decimal::from(100));
        assert_eq!(after.total_ganancia_grupos, Decimal::from(1710));
        assert_eq!(after.suppliers[0].supplier_payment, Decimal::from(190));
    }
}
