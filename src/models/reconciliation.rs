// src/models/reconciliation.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::catalog::PaymentKind;

pub const UNASSIGNED_SUPPLIER_KEY: &str = "unassigned";
pub const UNASSIGNED_SUPPLIER_NAME: &str = "Sin proveedor";

// =========================================================================
//  ENTRADA DO MOTOR (linhas lidas do banco)
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SupplierRates {
    pub id: Uuid,
    pub name: String,
    pub commission: Option<Decimal>,
    pub dataphone_commission: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub total: Decimal,
    pub supplier: Option<SupplierRates>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowTransaction {
    pub id: Uuid,
    pub cash_opening_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub total: Decimal,
    pub payment_kind: PaymentKind,
    pub lines: Vec<WindowLine>,
}

/// Recorte pedido pelo cliente dentro da janela do dia:
/// a partir de um instante e/ou só as vendas de uma sessão de caixa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SummaryScope {
    pub from: Option<DateTime<Utc>>,
    pub opening_id: Option<Uuid>,
}

impl SummaryScope {
    pub fn session(opening_id: Uuid) -> Self {
        Self { from: None, opening_id: Some(opening_id) }
    }

    pub fn is_narrowed(&self) -> bool {
        self.from.is_some() || self.opening_id.is_some()
    }
}

/// Janela de apuração: depois do último fechamento do dia,
/// opcionalmente recortada por um `SummaryScope`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SummaryWindow {
    pub after: Option<DateTime<Utc>>,
    pub scope: SummaryScope,
}

impl SummaryWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let after_ok = self.after.map(|cut| at > cut).unwrap_or(true);
        let from_ok = self.scope.from.map(|start| at >= start).unwrap_or(true);
        after_ok && from_ok
    }

    pub fn covers(&self, transaction: &WindowTransaction) -> bool {
        let session_ok = match self.scope.opening_id {
            Some(id) => transaction.cash_opening_id == Some(id),
            None => true,
        };
        session_ok && self.contains(transaction.created_at)
    }
}

// =========================================================================
//  SAÍDA DO MOTOR
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductBreakdown {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i64,
    #[serde(with = "rust_decimal::serde::str")]
    pub total: Decimal,
}

/// Liquidação de um fornecedor dentro da janela.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupplierSummary {
    #[schema(example = "unassigned")]
    pub supplier_key: String,
    pub supplier_id: Option<Uuid>,
    pub supplier_name: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub commission_rate: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub dataphone_rate: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_efectivo: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_tarjeta: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_sinpe: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_otros: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_pendiente: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub bank_commission: Decimal,
    /// Liquidación: o que se paga ao fornecedor
    #[serde(with = "rust_decimal::serde::str")]
    pub supplier_payment: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub group_profit: Decimal,
    #[serde(default)]
    pub products: Vec<ProductBreakdown>,
}

impl SupplierSummary {
    pub fn new(supplier: Option<&SupplierRates>) -> Self {
        let (key, id, name, commission, dataphone) = match supplier {
            Some(s) => (
                s.id.to_string(),
                Some(s.id),
                s.name.clone(),
                s.commission.unwrap_or(Decimal::ZERO),
                s.dataphone_commission.unwrap_or(Decimal::ZERO),
            ),
            None => (
                UNASSIGNED_SUPPLIER_KEY.to_string(),
                None,
                UNASSIGNED_SUPPLIER_NAME.to_string(),
                Decimal::ZERO,
                Decimal::ZERO,
            ),
        };

        Self {
            supplier_key: key,
            supplier_id: id,
            supplier_name: name,
            commission_rate: commission,
            dataphone_rate: dataphone,
            total: Decimal::ZERO,
            total_efectivo: Decimal::ZERO,
            total_tarjeta: Decimal::ZERO,
            total_sinpe: Decimal::ZERO,
            total_otros: Decimal::ZERO,
            total_pendiente: Decimal::ZERO,
            bank_commission: Decimal::ZERO,
            supplier_payment: Decimal::ZERO,
            group_profit: Decimal::ZERO,
            products: Vec::new(),
        }
    }

    pub fn add_product(&mut self, product_id: Uuid, product_name: &str, quantity: i64, total: Decimal) {
        match self.products.iter_mut().find(|p| p.product_id == product_id) {
            Some(entry) => {
                entry.quantity += quantity;
                entry.total += total;
            }
            None => self.products.push(ProductBreakdown {
                product_id,
                product_name: product_name.to_string(),
                quantity,
                total,
            }),
        }
    }

    /// Soma outro resumo do mesmo fornecedor (fechamento final).
    pub fn absorb(&mut self, other: &SupplierSummary) {
        self.total += other.total;
        self.total_efectivo += other.total_efectivo;
        self.total_tarjeta += other.total_tarjeta;
        self.total_sinpe += other.total_sinpe;
        self.total_otros += other.total_otros;
        self.total_pendiente += other.total_pendiente;
        self.bank_commission += other.bank_commission;
        self.supplier_payment += other.supplier_payment;
        self.group_profit += other.group_profit;
        for product in &other.products {
            self.add_product(product.product_id, &product.product_name, product.quantity, product.total);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationSummary {
    pub sales_day_id: Uuid,
    pub window_start: Option<DateTime<Utc>>,
    /// Presente quando o resumo é de uma sessão de caixa
    #[serde(default)]
    pub opening_id: Option<Uuid>,
    pub last_closing_at: Option<DateTime<Utc>>,
    pub as_of: DateTime<Utc>,
    #[serde(default)]
    pub transaction_count: i64,
    #[serde(default)]
    pub pending_count: i64,
    #[schema(example = "1500")]
    #[serde(with = "rust_decimal::serde::str")]
    pub total_general: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_efectivo: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_tarjeta: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_sinpe: Decimal,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub total_otros: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_pendiente: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_comisiones: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_ganancia_grupos: Decimal,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub total_pago_proveedores: Decimal,
    #[serde(default)]
    pub suppliers: Vec<SupplierSummary>,
}

impl ReconciliationSummary {
    pub fn empty(sales_day_id: Uuid, window_start: Option<DateTime<Utc>>, as_of: DateTime<Utc>) -> Self {
        Self {
            sales_day_id,
            window_start,
            opening_id: None,
            last_closing_at: None,
            as_of,
            transaction_count: 0,
            pending_count: 0,
            total_general: Decimal::ZERO,
            total_efectivo: Decimal::ZERO,
            total_tarjeta: Decimal::ZERO,
            total_sinpe: Decimal::ZERO,
            total_otros: Decimal::ZERO,
            total_pendiente: Decimal::ZERO,
            total_comisiones: Decimal::ZERO,
            total_ganancia_grupos: Decimal::ZERO,
            total_pago_proveedores: Decimal::ZERO,
            suppliers: Vec::new(),
        }
    }

    /// Compara só os valores monetários (o `asOf` muda a cada leitura).
    pub fn same_totals(&self, other: &ReconciliationSummary) -> bool {
        self.total_general == other.total_general
            && self.total_efectivo == other.total_efectivo
            && self.total_tarjeta == other.total_tarjeta
            && self.total_sinpe == other.total_sinpe
            && self.total_otros == other.total_otros
            && self.total_pendiente == other.total_pendiente
            && self.total_comisiones == other.total_comisiones
            && self.total_ganancia_grupos == other.total_ganancia_grupos
    }

    pub fn has_unreconciled_sales(&self) -> bool {
        self.total_general > Decimal::ZERO || self.total_pendiente > Decimal::ZERO
    }

    /// Acumula outro resumo no atual, fornecedor a fornecedor.
    pub fn merge(&mut self, other: &ReconciliationSummary) {
        self.transaction_count += other.transaction_count;
        self.pending_count += other.pending_count;
        self.total_general += other.total_general;
        self.total_efectivo += other.total_efectivo;
        self.total_tarjeta += other.total_tarjeta;
        self.total_sinpe += other.total_sinpe;
        self.total_otros += other.total_otros;
        self.total_pendiente += other.total_pendiente;
        self.total_comisiones += other.total_comisiones;
        self.total_ganancia_grupos += other.total_ganancia_grupos;
        self.total_pago_proveedores += other.total_pago_proveedores;
        if other.as_of > self.as_of {
            self.as_of = other.as_of;
        }

        for supplier in &other.suppliers {
            match self
                .suppliers
                .iter_mut()
                .find(|s| s.supplier_key == supplier.supplier_key)
            {
                Some(entry) => entry.absorb(supplier),
                None => self.suppliers.push(supplier.clone()),
            }
        }
        self.suppliers.sort_by(|a, b| a.supplier_name.cmp(&b.supplier_name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn window_excludes_the_closing_instant_itself() {
        let cut = Utc::now();
        let window = SummaryWindow { after: Some(cut), ..Default::default() };
        assert!(!window.contains(cut));
        assert!(window.contains(cut + Duration::milliseconds(1)));
        assert!(!window.contains(cut - Duration::seconds(5)));
    }

    #[test]
    fn window_start_is_inclusive() {
        let start = Utc::now();
        let window = SummaryWindow {
            after: None,
            scope: SummaryScope { from: Some(start), opening_id: None },
        };
        assert!(window.contains(start));
        assert!(!window.contains(start - Duration::seconds(1)));
        assert!(SummaryWindow::default().contains(start - Duration::days(3)));
    }

    #[test]
    fn session_scope_keeps_only_that_session() {
        let now = Utc::now();
        let mine = Uuid::new_v4();
        let sale = |opening: Option<Uuid>| WindowTransaction {
            id: Uuid::new_v4(),
            cash_opening_id: opening,
            created_at: now,
            total: Decimal::from(500),
            payment_kind: PaymentKind::Cash,
            lines: vec![],
        };

        let window = SummaryWindow { after: None, scope: SummaryScope::session(mine) };
        assert!(window.scope.is_narrowed());
        assert!(window.covers(&sale(Some(mine))));
        assert!(!window.covers(&sale(Some(Uuid::new_v4()))));
        assert!(!window.covers(&sale(None)));
        assert!(SummaryWindow::default().covers(&sale(None)));
    }

    #[test]
    fn merge_sums_suppliers_by_key() {
        let day = Uuid::new_v4();
        let product = Uuid::new_v4();
        let now = Utc::now();

        let mut unassigned = SupplierSummary::new(None);
        unassigned.total = Decimal::from(300);
        unassigned.total_efectivo = Decimal::from(300);
        unassigned.add_product(product, "Café", 3, Decimal::from(300));

        let mut first = ReconciliationSummary::empty(day, None, now);
        first.total_general = Decimal::from(300);
        first.total_efectivo = Decimal::from(300);
        first.suppliers.push(unassigned.clone());

        let mut consolidated = ReconciliationSummary::empty(day, None, now);
        consolidated.merge(&first);
        consolidated.merge(&first);

        assert_eq!(consolidated.total_general, Decimal::from(600));
        assert_eq!(consolidated.suppliers.len(), 1);
        let supplier = &consolidated.suppliers[0];
        assert_eq!(supplier.supplier_key, UNASSIGNED_SUPPLIER_KEY);
        assert_eq!(supplier.total_efectivo, Decimal::from(600));
        assert_eq!(supplier.products[0].quantity, 6);
        assert_eq!(supplier.products[0].total, Decimal::from(600));
    }
}
