// src/models/ledger.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::catalog::PaymentKind;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub sales_day_id: Uuid,
    pub payment_type_id: Uuid,
    pub user_id: Option<Uuid>,
    pub cash_opening_id: Option<Uuid>,
    #[schema(example = "1500")]
    pub total: Decimal,
    #[schema(example = "Mesa 4")]
    pub observation: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub product_id: Uuid,
    #[schema(example = 3)]
    pub quantity: i32,
    /// quantidade × preço no momento da venda (congelado)
    #[schema(example = "1500")]
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Linha de venda com o produto expandido.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_price: Decimal,
    pub quantity: i32,
    pub total: Decimal,
}

/// Transação com o meio de pagamento resolvido.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionHeader {
    pub id: Uuid,
    pub sales_day_id: Uuid,
    pub payment_type_id: Uuid,
    pub payment_type_name: String,
    pub payment_kind: PaymentKind,
    pub user_id: Option<Uuid>,
    pub cash_opening_id: Option<Uuid>,
    pub total: Decimal,
    pub observation: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetail {
    #[serde(flatten)]
    pub header: TransactionHeader,
    pub sales: Vec<SaleDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordedSale {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub sales: Vec<Sale>,
}

/// Item do carrinho recebido do caixa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Linha precificada, pronta para gravar.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    pub total: Decimal,
}

/// Lápide gravada quando uma transação é cancelada.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionCancellation {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub sales_day_id: Uuid,
    pub payment_type_id: Uuid,
    pub user_id: Option<Uuid>,
    pub total: Decimal,
    pub observation: Option<String>,
    #[schema(value_type = Vec<SaleDetail>)]
    pub lines: Json<Vec<SaleDetail>>,
    #[schema(example = "Duplicado")]
    pub reason: String,
    pub cancelled_by: Option<Uuid>,
    pub transaction_created_at: DateTime<Utc>,
    pub cancelled_at: DateTime<Utc>,
}
