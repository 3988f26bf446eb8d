// src/services/closing_service.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{lock_sales_day, DayLock},
        error::{map_unique_violation, AppError},
    },
    db::{CatalogRepository, ClosingRepository},
    models::{
        closing::{CashClosing, ClosingDetails, ClosingKind, ClosingSnapshot, ClosingTotals, NewClosing},
        reconciliation::{ReconciliationSummary, SummaryScope},
    },
    services::reconciliation_service::ReconciliationService,
};

// =========================================================================
//  REGRAS (puras)
// =========================================================================

/// Confere o resumo enviado pelo cliente contra o recalculado sob a trava.
pub fn validate_partial(
    submitted: &ReconciliationSummary,
    recomputed: &ReconciliationSummary,
) -> Result<(), AppError> {
    if !submitted.same_totals(recomputed) {
        return Err(AppError::StaleSummary);
    }
    if recomputed.total_general <= Decimal::ZERO {
        return Err(AppError::NothingToClose);
    }
    if recomputed.total_pendiente > Decimal::ZERO {
        return Err(AppError::PendingSalesRemain(recomputed.total_pendiente));
    }
    Ok(())
}

/// O recorte pedido (sessão ou instante) não pode deixar vendas da janela
/// do dia de fora: o fechamento move o corte do dia inteiro.
pub fn ensure_scope_covers_window(
    scoped: &ReconciliationSummary,
    day: &ReconciliationSummary,
) -> Result<(), AppError> {
    let left_out = day.transaction_count - scoped.transaction_count;
    if left_out > 0 {
        return Err(AppError::SalesOutsideScope(left_out));
    }
    Ok(())
}

/// Dia já tem fechamento final?
pub fn ensure_not_finalized(closings: &[CashClosing]) -> Result<(), AppError> {
    if closings.iter().any(|c| c.is_final) {
        return Err(AppError::DayAlreadyFinalized);
    }
    Ok(())
}

/// Consolida os parciais do dia no documento do fechamento final.
/// `closings` em ordem cronológica; `current` é a janela aberta agora.
pub fn consolidate(
    closings: &[CashClosing],
    current: &ReconciliationSummary,
    as_of: DateTime<Utc>,
) -> Result<(ClosingTotals, ClosingSnapshot), AppError> {
    ensure_not_finalized(closings)?;

    let partials: Vec<&CashClosing> = closings.iter().filter(|c| !c.is_final).collect();
    if partials.is_empty() {
        return Err(AppError::NoPartialClosings);
    }
    if current.has_unreconciled_sales() {
        return Err(AppError::UnreconciledSales(
            current.total_general + current.total_pendiente,
        ));
    }

    let mut totals = ClosingTotals::default();
    let mut merged = ReconciliationSummary::empty(current.sales_day_id, None, as_of);
    for partial in &partials {
        totals.add(&partial.totals());
        merged.merge(&partial.details.snapshot().summary);
    }
    // Os totais gravados nas colunas mandam sobre os do documento
    merged.total_general = totals.total_general;
    merged.total_efectivo = totals.total_efectivo;
    merged.total_tarjeta = totals.total_tarjeta;
    merged.total_sinpe = totals.total_sinpe;
    merged.total_otros = totals.total_otros;
    merged.total_pendiente = totals.total_pendiente;
    merged.total_comisiones = totals.total_comisiones;
    merged.total_ganancia_grupos = totals.total_ganancia_grupos;
    merged.last_closing_at = partials.last().map(|c| c.created_at);
    merged.as_of = as_of;

    let snapshot = ClosingSnapshot {
        kind: ClosingKind::Final,
        summary: merged,
        partial_closing_ids: partials.iter().map(|c| c.id).collect(),
    };

    Ok((totals, snapshot))
}

// =========================================================================
//  SERVIÇO
// =========================================================================

#[derive(Clone)]
pub struct ClosingService {
    repo: ClosingRepository,
    catalog_repo: CatalogRepository,
    reconciliation: ReconciliationService,
}

impl ClosingService {
    pub fn new(
        repo: ClosingRepository,
        catalog_repo: CatalogRepository,
        reconciliation: ReconciliationService,
    ) -> Self {
        Self { repo, catalog_repo, reconciliation }
    }

    /// Fechamento parcial: congela a janela corrente do dia inteiro.
    /// `opening_id` só identifica quem fechou; o recorte não pode omitir vendas.
    pub async fn create_partial_closing<'e, E>(
        &self,
        executor: E,
        sales_day_id: Uuid,
        user_id: Uuid,
        submitted: &ReconciliationSummary,
        opening_id: Option<Uuid>,
    ) -> Result<CashClosing, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        // 1. Trava exclusiva: nenhuma venda entra até o commit
        lock_sales_day(&mut *tx, sales_day_id, DayLock::Exclusive).await?;

        self.catalog_repo
            .find_user(&mut *tx, user_id)
            .await?
            .ok_or(AppError::UserNotFound(user_id))?;

        let closings = self.repo.list_for_day(&mut *tx, sales_day_id).await?;
        ensure_not_finalized(&closings)?;

        // 2. Recalcula a janela inteira do dia
        if let Some(id) = opening_id {
            self.reconciliation
                .ensure_opening_on_day(&mut *tx, id, sales_day_id)
                .await?;
        }
        let window = self.reconciliation.read_window(&mut *tx, sales_day_id).await?;
        let as_of = Utc::now();
        let recomputed = window.summarize(SummaryScope::default(), as_of);

        // 3. Recorte do cliente só passa se cobrir a janela toda
        let scope = SummaryScope { from: submitted.window_start, opening_id };
        if scope.is_narrowed() {
            ensure_scope_covers_window(&window.summarize(scope, as_of), &recomputed)?;
        }
        validate_partial(submitted, &recomputed)?;

        // 4. Grava com a foto recalculada
        let new_closing = NewClosing {
            sales_day_id,
            user_id,
            cash_opening_id: opening_id,
            is_final: false,
            totals: ClosingTotals::from(&recomputed),
            details: ClosingDetails::V1(ClosingSnapshot {
                kind: ClosingKind::Partial,
                summary: recomputed,
                partial_closing_ids: Vec::new(),
            }),
            window_start: None,
        };
        let closing = self.repo.insert(&mut *tx, &new_closing).await?;

        tx.commit().await?;

        tracing::info!(
            "Fechamento parcial {} do dia {}: geral {}",
            closing.id,
            sales_day_id,
            closing.total_general
        );

        Ok(closing)
    }

    /// Fechamento final: soma os parciais do dia. Só um por dia.
    pub async fn create_final_closing<'e, E>(
        &self,
        executor: E,
        sales_day_id: Uuid,
        user_id: Uuid,
    ) -> Result<CashClosing, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        lock_sales_day(&mut *tx, sales_day_id, DayLock::Exclusive).await?;

        self.catalog_repo
            .find_user(&mut *tx, user_id)
            .await?
            .ok_or(AppError::UserNotFound(user_id))?;

        let closings = self.repo.list_for_day(&mut *tx, sales_day_id).await?;
        let current = self
            .reconciliation
            .load(&mut *tx, sales_day_id, SummaryScope::default())
            .await?;
        let (totals, snapshot) = consolidate(&closings, &current, Utc::now())?;
        let partial_count = snapshot.partial_closing_ids.len();

        let new_closing = NewClosing {
            sales_day_id,
            user_id,
            cash_opening_id: None,
            is_final: true,
            totals,
            details: ClosingDetails::V1(snapshot),
            window_start: None,
        };
        let closing = self
            .repo
            .insert(&mut *tx, &new_closing)
            .await
            .map_err(|e| map_unique_violation(e, AppError::DayAlreadyFinalized))?;

        tx.commit().await?;

        tracing::info!(
            "Fechamento final {} do dia {}: {} parciais, geral {}",
            closing.id,
            sales_day_id,
            partial_count,
            closing.total_general
        );

        Ok(closing)
    }

    pub async fn list_closings(
        &self,
        sales_day_id: Option<Uuid>,
        user_id: Option<Uuid>,
    ) -> Result<Vec<CashClosing>, AppError> {
        self.repo.list(sales_day_id, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::reconciliation::SupplierSummary;
    use crate::services::fixtures::Fixture;
    use sqlx::PgPool;
    use chrono::Duration;
    use sqlx::types::Json;

    fn dec(value: i64) -> Decimal {
        Decimal::from(value)
    }

    fn summary(day: Uuid, general: i64, pendiente: i64) -> ReconciliationSummary {
        let mut s = ReconciliationSummary::empty(day, None, Utc::now());
        s.total_general = dec(general);
        s.total_efectivo = dec(general);
        s.total_pendiente = dec(pendiente);
        s
    }

    fn stored(day: Uuid, summary: ReconciliationSummary, is_final: bool, at: DateTime<Utc>) -> CashClosing {
        let totals = ClosingTotals::from(&summary);
        CashClosing {
            id: Uuid::new_v4(),
            sales_day_id: day,
            user_id: Uuid::new_v4(),
            cash_opening_id: None,
            is_final,
            total_general: totals.total_general,
            total_efectivo: totals.total_efectivo,
            total_tarjeta: totals.total_tarjeta,
            total_sinpe: totals.total_sinpe,
            total_otros: totals.total_otros,
            total_pendiente: totals.total_pendiente,
            total_comisiones: totals.total_comisiones,
            total_ganancia_grupos: totals.total_ganancia_grupos,
            details: Json(ClosingDetails::V1(ClosingSnapshot {
                kind: if is_final { ClosingKind::Final } else { ClosingKind::Partial },
                summary,
                partial_closing_ids: vec![],
            })),
            window_start: None,
            created_at: at,
        }
    }

    #[test]
    fn partial_requires_fresh_summary() {
        let day = Uuid::new_v4();
        let seen = summary(day, 1500, 0);
        let now = summary(day, 2500, 0);
        assert!(matches!(validate_partial(&seen, &now), Err(AppError::StaleSummary)));
        assert!(validate_partial(&now, &now.clone()).is_ok());
    }

    #[test]
    fn partial_rejects_empty_window_and_pending_sales() {
        let day = Uuid::new_v4();
        let empty = summary(day, 0, 0);
        assert!(matches!(validate_partial(&empty, &empty), Err(AppError::NothingToClose)));

        let pending = summary(day, 1500, 2000);
        assert!(matches!(
            validate_partial(&pending, &pending),
            Err(AppError::PendingSalesRemain(amount)) if amount == dec(2000)
        ));
    }

    #[test]
    fn narrowed_scope_must_cover_the_day_window() {
        let day = Uuid::new_v4();
        let mut whole = summary(day, 2500, 0);
        whole.transaction_count = 2;
        let mut session = summary(day, 1000, 0);
        session.transaction_count = 1;

        assert!(matches!(
            ensure_scope_covers_window(&session, &whole),
            Err(AppError::SalesOutsideScope(1))
        ));
        assert!(ensure_scope_covers_window(&whole, &whole.clone()).is_ok());
    }

    #[test]
    fn final_needs_at_least_one_partial() {
        let day = Uuid::new_v4();
        let current = summary(day, 0, 0);
        assert!(matches!(
            consolidate(&[], &current, Utc::now()),
            Err(AppError::NoPartialClosings)
        ));
    }

    #[test]
    fn final_rejects_open_sales() {
        let day = Uuid::new_v4();
        let t0 = Utc::now();
        let closings = vec![stored(day, summary(day, 1500, 0), false, t0)];

        let current = summary(day, 700, 0);
        assert!(matches!(
            consolidate(&closings, &current, t0 + Duration::minutes(1)),
            Err(AppError::UnreconciledSales(_))
        ));

        let current = summary(day, 0, 300);
        assert!(matches!(
            consolidate(&closings, &current, t0 + Duration::minutes(1)),
            Err(AppError::UnreconciledSales(_))
        ));
    }

    #[test]
    fn final_is_not_repeatable() {
        let day = Uuid::new_v4();
        let t0 = Utc::now();
        let closings = vec![
            stored(day, summary(day, 1500, 0), false, t0),
            stored(day, summary(day, 1500, 0), true, t0 + Duration::minutes(1)),
        ];
        assert!(matches!(
            consolidate(&closings, &summary(day, 0, 0), t0 + Duration::minutes(2)),
            Err(AppError::DayAlreadyFinalized)
        ));
        assert!(matches!(ensure_not_finalized(&closings), Err(AppError::DayAlreadyFinalized)));
    }

    #[test]
    fn final_sums_partials_and_merges_suppliers() {
        let day = Uuid::new_v4();
        let product = Uuid::new_v4();
        let t0 = Utc::now();

        let mut first = summary(day, 1500, 0);
        let mut bucket = SupplierSummary::new(None);
        bucket.total = dec(1500);
        bucket.total_efectivo = dec(1500);
        bucket.add_product(product, "Tamal", 3, dec(1500));
        first.suppliers.push(bucket.clone());

        let mut second = summary(day, 500, 0);
        bucket.total = dec(500);
        bucket.total_efectivo = dec(500);
        bucket.products.clear();
        bucket.add_product(product, "Tamal", 1, dec(500));
        second.suppliers.push(bucket);

        let closings = vec![
            stored(day, first, false, t0),
            stored(day, second, false, t0 + Duration::minutes(30)),
        ];

        let (totals, snapshot) =
            consolidate(&closings, &summary(day, 0, 0), t0 + Duration::hours(1)).unwrap();

        assert_eq!(totals.total_general, dec(2000));
        assert_eq!(totals.total_efectivo, dec(2000));
        assert_eq!(snapshot.kind, ClosingKind::Final);
        assert_eq!(snapshot.partial_closing_ids, vec![closings[0].id, closings[1].id]);
        assert_eq!(snapshot.summary.total_general, dec(2000));
        assert_eq!(snapshot.summary.last_closing_at, Some(closings[1].created_at));

        let merged = &snapshot.summary.suppliers[0];
        assert_eq!(merged.total_efectivo, dec(2000));
        assert_eq!(merged.products[0].quantity, 4);
    }

    // --- Com banco ---

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de Postgres em DATABASE_URL"]
    async fn session_scoped_closing_cannot_drop_earlier_sales(pool: PgPool) {
        let fx = Fixture::seed(pool).await;
        fx.sell(fx.cash, fx.coffee, 3, None).await;
        let opening = fx.open_session(fx.cashier).await;
        fx.sell(fx.cash, fx.shirt, 1, Some(fx.cashier)).await;

        let session = fx
            .reconciliation
            .summarize(&fx.pool, fx.day, None, Some(opening))
            .await
            .unwrap();
        assert_eq!(session.total_general, dec(1000));

        let err = fx
            .closings
            .create_partial_closing(&fx.pool, fx.day, fx.cashier, &session, Some(opening))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SalesOutsideScope(1)));

        let whole = fx
            .reconciliation
            .summarize(&fx.pool, fx.day, None, None)
            .await
            .unwrap();
        assert_eq!(whole.total_general, dec(2500));

        let partial = fx
            .closings
            .create_partial_closing(&fx.pool, fx.day, fx.cashier, &whole, Some(opening))
            .await
            .unwrap();
        assert_eq!(partial.total_general, dec(2500));
        assert_eq!(partial.cash_opening_id, Some(opening));

        let after = fx
            .reconciliation
            .summarize(&fx.pool, fx.day, None, None)
            .await
            .unwrap();
        assert_eq!(after.transaction_count, 0);
        assert_eq!(after.total_general, Decimal::ZERO);

        let last = fx
            .closings
            .create_final_closing(&fx.pool, fx.day, fx.admin)
            .await
            .unwrap();
        assert!(last.is_final);
        assert_eq!(last.total_general, dec(2500));
        assert_eq!(last.details.snapshot().partial_closing_ids, vec![partial.id]);

        let err = fx
            .closings
            .create_final_closing(&fx.pool, fx.day, fx.admin)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DayAlreadyFinalized));
        assert_eq!(fx.count("cash_closings").await, 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "precisa de Postgres em DATABASE_URL"]
    async fn echoed_summary_with_fractional_rates_closes_exactly(pool: PgPool) {
        let fx = Fixture::seed(pool).await;
        sqlx::query("UPDATE suppliers SET commission = 12.345, dataphone_commission = 3.333")
            .execute(&fx.pool)
            .await
            .unwrap();
        sqlx::query("UPDATE products SET price = 987654.32 WHERE id = $1")
            .bind(fx.shirt)
            .execute(&fx.pool)
            .await
            .unwrap();
        fx.sell(fx.card, fx.shirt, 1, None).await;

        let summary = fx
            .reconciliation
            .summarize(&fx.pool, fx.day, None, None)
            .await
            .unwrap();
        let exact: Decimal = "836873.66681744732".parse().unwrap();
        assert_eq!(summary.total_ganancia_grupos, exact);

        // O cliente recebe o resumo em JSON e devolve o mesmo documento
        let echoed: ReconciliationSummary =
            serde_json::from_str(&serde_json::to_string(&summary).unwrap()).unwrap();

        let closing = fx
            .closings
            .create_partial_closing(&fx.pool, fx.day, fx.cashier, &echoed, None)
            .await
            .unwrap();
        assert_eq!(closing.total_ganancia_grupos, exact);

        let stored = fx.closings.list_closings(Some(fx.day), None).await.unwrap();
        let snapshot = stored[0].details.snapshot();
        assert_eq!(snapshot.summary.total_ganancia_grupos, exact);
        assert!(snapshot.summary.same_totals(&summary));
    }
}
