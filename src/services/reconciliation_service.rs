// src/services/reconciliation_service.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{
        reconciliation_repo::assemble_window, CashSessionRepository, CatalogRepository,
        ReconciliationRepository,
    },
    models::{
        catalog::PaymentKind,
        reconciliation::{
            ReconciliationSummary, SummaryScope, SummaryWindow, SupplierSummary,
            WindowTransaction, UNASSIGNED_SUPPLIER_KEY,
        },
    },
};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

// =========================================================================
//  MOTOR DE APURAÇÃO (puro, sem banco)
// =========================================================================

pub struct ReconciliationEngine;

impl ReconciliationEngine {
    /// Agrega as transações da janela em totais por meio de pagamento e por fornecedor.
    pub fn summarize(
        transactions: &[WindowTransaction],
        window: &SummaryWindow,
        sales_day_id: Uuid,
        last_closing_at: Option<DateTime<Utc>>,
        as_of: DateTime<Utc>,
    ) -> ReconciliationSummary {
        let mut summary = ReconciliationSummary::empty(sales_day_id, window.scope.from, as_of);
        summary.opening_id = window.scope.opening_id;
        summary.last_closing_at = last_closing_at;

        let mut suppliers: HashMap<String, SupplierSummary> = HashMap::new();

        for transaction in transactions.iter().filter(|t| window.covers(t)) {
            summary.transaction_count += 1;
            let kind = transaction.payment_kind;

            // 1. Totais do caixa
            if kind.is_deferred() {
                summary.pending_count += 1;
                summary.total_pendiente += transaction.total;
            } else {
                summary.total_general += transaction.total;
                *method_total(&mut summary, kind) += transaction.total;
            }

            // 2. Liquidação por fornecedor, linha a linha
            for line in &transaction.lines {
                let key = line
                    .supplier
                    .as_ref()
                    .map(|s| s.id.to_string())
                    .unwrap_or_else(|| UNASSIGNED_SUPPLIER_KEY.to_string());
                let bucket = suppliers
                    .entry(key)
                    .or_insert_with(|| SupplierSummary::new(line.supplier.as_ref()));

                match kind {
                    PaymentKind::Deferred => {
                        bucket.total_pendiente += line.total;
                        continue;
                    }
                    PaymentKind::Cash => bucket.total_efectivo += line.total,
                    PaymentKind::Card => bucket.total_tarjeta += line.total,
                    PaymentKind::Sinpe => bucket.total_sinpe += line.total,
                    PaymentKind::Other => bucket.total_otros += line.total,
                }
                bucket.total += line.total;
                bucket.add_product(
                    line.product_id,
                    &line.product_name,
                    i64::from(line.quantity),
                    line.total,
                );

                // 3. Comissões só incidem sobre tarjeta
                if kind == PaymentKind::Card {
                    let split = CardSplit::compute(line.total, bucket.dataphone_rate, bucket.commission_rate);
                    bucket.bank_commission += split.bank_commission;
                    bucket.supplier_payment += split.supplier_payment;
                    bucket.group_profit += split.group_profit;

                    summary.total_comisiones += split.bank_commission;
                    summary.total_ganancia_grupos += split.group_profit;
                    summary.total_pago_proveedores += split.supplier_payment;
                }
            }
        }

        let mut suppliers: Vec<SupplierSummary> = suppliers.into_values().collect();
        suppliers.sort_by(|a, b| a.supplier_name.cmp(&b.supplier_name));
        summary.suppliers = suppliers;

        summary
    }
}

fn method_total(summary: &mut ReconciliationSummary, kind: PaymentKind) -> &mut Decimal {
    match kind {
        PaymentKind::Cash => &mut summary.total_efectivo,
        PaymentKind::Card => &mut summary.total_tarjeta,
        PaymentKind::Sinpe => &mut summary.total_sinpe,
        PaymentKind::Other | PaymentKind::Deferred => &mut summary.total_otros,
    }
}

/// Divisão de uma venda em tarjeta: banco, fornecedor e grupo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardSplit {
    pub bank_commission: Decimal,
    pub net: Decimal,
    pub supplier_payment: Decimal,
    pub group_profit: Decimal,
}

impl CardSplit {
    pub fn compute(total: Decimal, dataphone_rate: Decimal, commission_rate: Decimal) -> Self {
        let bank_commission = total * dataphone_rate / HUNDRED;
        let net = total - bank_commission;
        let supplier_payment = net * commission_rate / HUNDRED;
        let group_profit = net - supplier_payment;

        Self { bank_commission, net, supplier_payment, group_profit }
    }
}

// =========================================================================
//  SERVIÇO (leitura consistente + motor)
// =========================================================================

#[derive(Clone)]
pub struct ReconciliationService {
    repo: ReconciliationRepository,
    catalog_repo: CatalogRepository,
    session_repo: CashSessionRepository,
}

impl ReconciliationService {
    pub fn new(
        repo: ReconciliationRepository,
        catalog_repo: CatalogRepository,
        session_repo: CashSessionRepository,
    ) -> Self {
        Self { repo, catalog_repo, session_repo }
    }

    /// Resumo da janela corrente do dia.
    /// Com `opening_id`, só entram as vendas daquela sessão de caixa.
    pub async fn summarize<'e, E>(
        &self,
        executor: E,
        sales_day_id: Uuid,
        window_start: Option<DateTime<Utc>>,
        opening_id: Option<Uuid>,
    ) -> Result<ReconciliationSummary, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        // Uma única foto do banco para todas as leituras
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        self.catalog_repo
            .find_sales_day(&mut *tx, sales_day_id)
            .await?
            .ok_or(AppError::SalesDayNotFound(sales_day_id))?;

        if let Some(id) = opening_id {
            self.ensure_opening_on_day(&mut *tx, id, sales_day_id).await?;
        }

        let scope = SummaryScope { from: window_start, opening_id };
        let summary = self.load(&mut *tx, sales_day_id, scope).await?;
        tx.commit().await?;

        Ok(summary)
    }

    /// A sessão existe e pertence ao dia?
    pub(crate) async fn ensure_opening_on_day(
        &self,
        conn: &mut PgConnection,
        opening_id: Uuid,
        sales_day_id: Uuid,
    ) -> Result<(), AppError> {
        self.session_repo
            .find_by_id(&mut *conn, opening_id)
            .await?
            .filter(|o| o.sales_day_id == sales_day_id)
            .map(|_| ())
            .ok_or(AppError::OpeningNotFound(opening_id))
    }

    /// Lê as transações posteriores ao último fechamento do dia.
    pub(crate) async fn read_window(
        &self,
        conn: &mut PgConnection,
        sales_day_id: Uuid,
    ) -> Result<DayWindow, AppError> {
        let last_closing_at = self.repo.last_closing_at(&mut *conn, sales_day_id).await?;
        let transactions = self
            .repo
            .list_transactions(&mut *conn, sales_day_id, last_closing_at)
            .await?;
        let lines = self.repo.list_lines(&mut *conn, sales_day_id, last_closing_at).await?;

        Ok(DayWindow {
            sales_day_id,
            last_closing_at,
            transactions: assemble_window(transactions, lines),
        })
    }

    /// Lê a janela e roda o motor na conexão dada.
    /// Os fechamentos chamam isto já com a trava exclusiva do dia.
    pub(crate) async fn load(
        &self,
        conn: &mut PgConnection,
        sales_day_id: Uuid,
        scope: SummaryScope,
    ) -> Result<ReconciliationSummary, AppError> {
        let window = self.read_window(conn, sales_day_id).await?;
        let summary = window.summarize(scope, Utc::now());

        tracing::debug!(
            "Resumo do dia {}: {} transações, geral {}, pendente {}",
            sales_day_id,
            summary.transaction_count,
            summary.total_general,
            summary.total_pendiente
        );

        Ok(summary)
    }
}

/// Transações ainda não cobertas por nenhum fechamento do dia.
#[derive(Debug, Clone)]
pub struct DayWindow {
    pub sales_day_id: Uuid,
    pub last_closing_at: Option<DateTime<Utc>>,
    pub transactions: Vec<WindowTransaction>,
}

impl DayWindow {
    pub fn summarize(&self, scope: SummaryScope, as_of: DateTime<Utc>) -> ReconciliationSummary {
        let window = SummaryWindow { after: self.last_closing_at, scope };
        ReconciliationEngine::summarize(
            &self.transactions,
            &window,
            self.sales_day_id,
            self.last_closing_at,
            as_of,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::reconciliation::{SupplierRates, WindowLine, UNASSIGNED_SUPPLIER_NAME};
    use chrono::Duration;

    fn dec(value: i64) -> Decimal {
        Decimal::from(value)
    }

    fn supplier(name: &str, commission: i64, dataphone: i64) -> SupplierRates {
        SupplierRates {
            id: Uuid::new_v4(),
            name: name.to_string(),
            commission: Some(dec(commission)),
            dataphone_commission: Some(dec(dataphone)),
        }
    }

    fn line(product_id: Uuid, name: &str, quantity: i32, total: i64, supplier: Option<&SupplierRates>) -> WindowLine {
        WindowLine {
            product_id,
            product_name: name.to_string(),
            quantity,
            total: dec(total),
            supplier: supplier.cloned(),
        }
    }

    fn transaction(at: DateTime<Utc>, kind: PaymentKind, lines: Vec<WindowLine>) -> WindowTransaction {
        WindowTransaction {
            id: Uuid::new_v4(),
            cash_opening_id: None,
            created_at: at,
            total: lines.iter().map(|l| l.total).sum(),
            payment_kind: kind,
            lines,
        }
    }

    #[test]
    fn card_split_matches_worked_example() {
        let split = CardSplit::compute(dec(2000), dec(5), dec(10));
        assert_eq!(split.bank_commission, dec(100));
        assert_eq!(split.net, dec(1900));
        assert_eq!(split.supplier_payment, dec(190));
        assert_eq!(split.group_profit, dec(1710));
    }

    #[test]
    fn card_sale_accumulates_commission_and_profit() {
        let day = Uuid::new_v4();
        let now = Utc::now();
        let acme = supplier("Acme", 10, 5);
        let product = Uuid::new_v4();
        let txs = vec![transaction(
            now,
            PaymentKind::Card,
            vec![line(product, "Camiseta", 2, 2000, Some(&acme))],
        )];

        let summary = ReconciliationEngine::summarize(&txs, &SummaryWindow::default(), day, None, now);

        assert_eq!(summary.total_general, dec(2000));
        assert_eq!(summary.total_tarjeta, dec(2000));
        assert_eq!(summary.total_comisiones, dec(100));
        assert_eq!(summary.total_ganancia_grupos, dec(1710));
        assert_eq!(summary.total_pago_proveedores, dec(190));

        let bucket = &summary.suppliers[0];
        assert_eq!(bucket.supplier_id, Some(acme.id));
        assert_eq!(bucket.bank_commission, dec(100));
        assert_eq!(bucket.supplier_payment, dec(190));
        assert_eq!(bucket.group_profit, dec(1710));
        assert_eq!(bucket.products[0].quantity, 2);
    }

    #[test]
    fn cash_sale_has_no_commission() {
        let now = Utc::now();
        let acme = supplier("Acme", 10, 5);
        let txs = vec![transaction(
            now,
            PaymentKind::Cash,
            vec![line(Uuid::new_v4(), "Café", 3, 1500, Some(&acme))],
        )];

        let summary =
            ReconciliationEngine::summarize(&txs, &SummaryWindow::default(), Uuid::new_v4(), None, now);

        assert_eq!(summary.total_general, dec(1500));
        assert_eq!(summary.total_efectivo, dec(1500));
        assert_eq!(summary.total_tarjeta, Decimal::ZERO);
        assert_eq!(summary.total_pendiente, Decimal::ZERO);
        assert_eq!(summary.total_comisiones, Decimal::ZERO);
        assert_eq!(summary.total_ganancia_grupos, Decimal::ZERO);
        assert_eq!(summary.suppliers[0].total_efectivo, dec(1500));
    }

    #[test]
    fn pending_counts_apart_until_resolved() {
        let now = Utc::now();
        let acme = supplier("Acme", 10, 5);
        let mut pending = transaction(
            now,
            PaymentKind::Deferred,
            vec![line(Uuid::new_v4(), "Camiseta", 1, 2000, Some(&acme))],
        );

        let summary = ReconciliationEngine::summarize(
            std::slice::from_ref(&pending),
            &SummaryWindow::default(),
            Uuid::new_v4(),
            None,
            now,
        );
        assert_eq!(summary.total_general, Decimal::ZERO);
        assert_eq!(summary.total_pendiente, dec(2000));
        assert_eq!(summary.pending_count, 1);
        assert_eq!(summary.suppliers[0].total_pendiente, dec(2000));
        assert!(summary.suppliers[0].products.is_empty());

        // Resolvida para tarjeta: sai do pendente e passa a gerar comissão
        pending.payment_kind = PaymentKind::Card;
        let summary = ReconciliationEngine::summarize(
            std::slice::from_ref(&pending),
            &SummaryWindow::default(),
            Uuid::new_v4(),
            None,
            now,
        );
        assert_eq!(summary.total_pendiente, Decimal::ZERO);
        assert_eq!(summary.total_tarjeta, dec(2000));
        assert_eq!(summary.total_comisiones, dec(100));
        assert_eq!(summary.total_ganancia_grupos, dec(1710));
    }

    #[test]
    fn products_without_supplier_go_to_unassigned_bucket() {
        let now = Utc::now();
        let txs = vec![transaction(
            now,
            PaymentKind::Card,
            vec![line(Uuid::new_v4(), "Agua", 1, 1000, None)],
        )];

        let summary =
            ReconciliationEngine::summarize(&txs, &SummaryWindow::default(), Uuid::new_v4(), None, now);

        let bucket = &summary.suppliers[0];
        assert_eq!(bucket.supplier_key, UNASSIGNED_SUPPLIER_KEY);
        assert_eq!(bucket.supplier_name, UNASSIGNED_SUPPLIER_NAME);
        assert_eq!(bucket.supplier_id, None);
        // Taxas ausentes valem 0: nada para o banco nem para fornecedor
        assert_eq!(bucket.bank_commission, Decimal::ZERO);
        assert_eq!(bucket.supplier_payment, Decimal::ZERO);
        assert_eq!(bucket.group_profit, dec(1000));
    }

    #[test]
    fn window_drops_transactions_up_to_last_closing() {
        let closing = Utc::now();
        let before = transaction(
            closing - Duration::minutes(5),
            PaymentKind::Cash,
            vec![line(Uuid::new_v4(), "Café", 1, 500, None)],
        );
        let at_closing = transaction(closing, PaymentKind::Cash, vec![line(Uuid::new_v4(), "Café", 1, 500, None)]);
        let after = transaction(
            closing + Duration::seconds(1),
            PaymentKind::Sinpe,
            vec![line(Uuid::new_v4(), "Té", 1, 700, None)],
        );
        let window = SummaryWindow { after: Some(closing), ..Default::default() };

        let summary = ReconciliationEngine::summarize(
            &[before, at_closing, after],
            &window,
            Uuid::new_v4(),
            Some(closing),
            closing + Duration::seconds(2),
        );

        assert_eq!(summary.transaction_count, 1);
        assert_eq!(summary.total_general, dec(700));
        assert_eq!(summary.total_sinpe, dec(700));
        assert_eq!(summary.last_closing_at, Some(closing));
    }

    #[test]
    fn empty_window_is_all_zero() {
        let now = Utc::now();
        let summary =
            ReconciliationEngine::summarize(&[], &SummaryWindow::default(), Uuid::new_v4(), Some(now), now);
        assert_eq!(summary.transaction_count, 0);
        assert_eq!(summary.total_general, Decimal::ZERO);
        assert_eq!(summary.total_pendiente, Decimal::ZERO);
        assert!(!summary.has_unreconciled_sales());
        assert!(summary.suppliers.is_empty());
    }

    #[test]
    fn other_methods_count_as_settled() {
        let now = Utc::now();
        let txs = vec![transaction(now, PaymentKind::Other, vec![line(Uuid::new_v4(), "Vale", 1, 300, None)])];
        let summary =
            ReconciliationEngine::summarize(&txs, &SummaryWindow::default(), Uuid::new_v4(), None, now);
        assert_eq!(summary.total_general, dec(300));
        assert_eq!(summary.total_otros, dec(300));
        assert_eq!(summary.suppliers[0].total_otros, dec(300));
    }

    #[test]
    fn fractional_rates_survive_json_round_trip() {
        let now = Utc::now();
        let rates = SupplierRates {
            id: Uuid::new_v4(),
            name: "Feria".to_string(),
            commission: Some(Decimal::new(12345, 3)),
            dataphone_commission: Some(Decimal::new(3333, 3)),
        };
        let txs = vec![transaction(
            now,
            PaymentKind::Card,
            vec![WindowLine {
                product_id: Uuid::new_v4(),
                product_name: "Artesanía".to_string(),
                quantity: 1,
                total: Decimal::new(98765432, 2),
                supplier: Some(rates),
            }],
        )];

        let server =
            ReconciliationEngine::summarize(&txs, &SummaryWindow::default(), Uuid::new_v4(), None, now);
        let exact: Decimal = "836873.66681744732".parse().unwrap();
        assert_eq!(server.total_ganancia_grupos, exact);

        // O cliente devolve exatamente o que recebeu
        let json = serde_json::to_string(&server).unwrap();
        let echoed: ReconciliationSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(echoed, server);
        assert!(echoed.same_totals(&server));
    }

    #[test]
    fn session_summary_ignores_other_cashiers() {
        let now = Utc::now();
        let mine = Uuid::new_v4();
        let mut own = transaction(now, PaymentKind::Cash, vec![line(Uuid::new_v4(), "Café", 1, 1000, None)]);
        own.cash_opening_id = Some(mine);
        let mut other = transaction(now, PaymentKind::Cash, vec![line(Uuid::new_v4(), "Té", 1, 500, None)]);
        other.cash_opening_id = Some(Uuid::new_v4());
        let anonymous = transaction(now, PaymentKind::Sinpe, vec![line(Uuid::new_v4(), "Agua", 1, 300, None)]);

        let window = DayWindow {
            sales_day_id: Uuid::new_v4(),
            last_closing_at: None,
            transactions: vec![own, other, anonymous],
        };

        let session = window.summarize(SummaryScope::session(mine), now);
        assert_eq!(session.opening_id, Some(mine));
        assert_eq!(session.transaction_count, 1);
        assert_eq!(session.total_general, dec(1000));

        let day = window.summarize(SummaryScope::default(), now);
        assert_eq!(day.transaction_count, 3);
        assert_eq!(day.total_general, dec(1800));
    }
}
