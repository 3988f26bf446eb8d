// src/models/closing.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::reconciliation::ReconciliationSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClosingKind {
    Partial,
    Final,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClosingSnapshot {
    pub kind: ClosingKind,
    pub summary: ReconciliationSummary,
    /// Só no fechamento final: os parciais consolidados
    #[serde(default)]
    pub partial_closing_ids: Vec<Uuid>,
}

/// Documento guardado em `cash_closings.details`.
/// Versionado para que mudanças futuras no resumo não corrompam o histórico.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "schemaVersion")]
pub enum ClosingDetails {
    #[serde(rename = "1")]
    V1(ClosingSnapshot),
}

impl ClosingDetails {
    pub fn snapshot(&self) -> &ClosingSnapshot {
        match self {
            ClosingDetails::V1(snapshot) => snapshot,
        }
    }
}

/// Totais por coluna de um fechamento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClosingTotals {
    pub total_general: Decimal,
    pub total_efectivo: Decimal,
    pub total_tarjeta: Decimal,
    pub total_sinpe: Decimal,
    pub total_otros: Decimal,
    pub total_pendiente: Decimal,
    pub total_comisiones: Decimal,
    pub total_ganancia_grupos: Decimal,
}

impl ClosingTotals {
    pub fn add(&mut self, other: &ClosingTotals) {
        self.total_general += other.total_general;
        self.total_efectivo += other.total_efectivo;
        self.total_tarjeta += other.total_tarjeta;
        self.total_sinpe += other.total_sinpe;
        self.total_otros += other.total_otros;
        self.total_pendiente += other.total_pendiente;
        self.total_comisiones += other.total_comisiones;
        self.total_ganancia_grupos += other.total_ganancia_grupos;
    }
}

impl From<&ReconciliationSummary> for ClosingTotals {
    fn from(summary: &ReconciliationSummary) -> Self {
        Self {
            total_general: summary.total_general,
            total_efectivo: summary.total_efectivo,
            total_tarjeta: summary.total_tarjeta,
            total_sinpe: summary.total_sinpe,
            total_otros: summary.total_otros,
            total_pendiente: summary.total_pendiente,
            total_comisiones: summary.total_comisiones,
            total_ganancia_grupos: summary.total_ganancia_grupos,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CashClosing {
    pub id: Uuid,
    pub sales_day_id: Uuid,
    pub user_id: Uuid,
    pub cash_opening_id: Option<Uuid>,
    pub is_final: bool,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_general: Decimal,
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
    pub total_comisiones: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_ganancia_grupos: Decimal,
    #[schema(value_type = Object)]
    pub details: Json<ClosingDetails>,
    pub window_start: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl CashClosing {
    pub fn totals(&self) -> ClosingTotals {
        ClosingTotals {
            total_general: self.total_general,
            total_efectivo: self.total_efectivo,
            total_tarjeta: self.total_tarjeta,
            total_sinpe: self.total_sinpe,
            total_otros: self.total_otros,
            total_pendiente: self.total_pendiente,
            total_comisiones: self.total_comisiones,
            total_ganancia_grupos: self.total_ganancia_grupos,
        }
    }
}

/// Dados para gravar um fechamento.
#[derive(Debug, Clone)]
pub struct NewClosing {
    pub sales_day_id: Uuid,
    pub user_id: Uuid,
    pub cash_opening_id: Option<Uuid>,
    pub is_final: bool,
    pub totals: ClosingTotals,
    pub details: ClosingDetails,
    pub window_start: Option<DateTime<Utc>>,
}
