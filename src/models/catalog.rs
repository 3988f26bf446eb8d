// src/models/catalog.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Cashier,
}

/// Forma de pagamento tipada. Substitui a comparação por nome
/// (`efectivo`, `tarjeta`, `sinpe`, `pendiente`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    Cash,     // Efectivo
    Card,     // Tarjeta (sofre comissão do datáfono)
    Sinpe,    // SINPE Móvil
    Deferred, // Pendiente
    Other,
}

impl PaymentKind {
    pub fn is_deferred(self) -> bool {
        matches!(self, PaymentKind::Deferred)
    }
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    #[schema(example = "Ana Mora")]
    pub name: String,
    #[schema(example = "ana@feria.cr")]
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Administrador pelo papel ou pelo e-mail configurado no arranque.
    pub fn is_admin(&self, admin_email: Option<&str>) -> bool {
        if self.role == UserRole::Admin {
            return true;
        }
        admin_email
            .map(|email| email.trim().eq_ignore_ascii_case(self.email.trim()))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalesDay {
    pub id: Uuid,
    pub event_id: Uuid,
    #[schema(value_type = String, format = Date, example = "2025-03-15")]
    pub day: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentType {
    pub id: Uuid,
    #[schema(example = "Tarjeta")]
    pub name: String,
    pub kind: PaymentKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: Uuid,
    #[schema(example = "Grupo Scout 12")]
    pub name: String,
    /// Percentual do fornecedor sobre o líquido (10 = 10%)
    #[schema(example = "10")]
    pub commission: Option<Decimal>,
    /// Percentual cobrado pelo datáfono nas vendas com cartão
    #[schema(example = "5")]
    pub dataphone_commission: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    #[schema(example = "Tamal de cerdo")]
    pub name: String,
    #[schema(example = "1000")]
    pub price: Decimal,
    pub supplier_id: Option<Uuid>,
}

/// Produto vendável num dia (linha de `sales_day_products` + produto).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SellableProduct {
    pub association_id: Uuid,
    pub sales_day_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub supplier_id: Option<Uuid>,
    pub supplier_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole, email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Teste".into(),
            email: email.into(),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn admin_by_role_or_configured_email() {
        assert!(user(UserRole::Admin, "x@y.cr").is_admin(None));
        assert!(user(UserRole::Cashier, "Jefa@Feria.cr").is_admin(Some("jefa@feria.cr")));
        assert!(!user(UserRole::Cashier, "caja1@feria.cr").is_admin(Some("jefa@feria.cr")));
        assert!(!user(UserRole::Cashier, "caja1@feria.cr").is_admin(None));
    }

    #[test]
    fn only_deferred_kind_is_deferred() {
        assert!(PaymentKind::Deferred.is_deferred());
        for kind in [PaymentKind::Cash, PaymentKind::Card, PaymentKind::Sinpe, PaymentKind::Other] {
            assert!(!kind.is_deferred());
        }
    }
}
