// src/models/cash_session.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Máquina de estados da sessão de caixa ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "cash_opening_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum CashOpeningStatus {
    Pending,
    Authorized,
    Denied,
    Active,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OpeningAction {
    Authorize,
    Deny,
    Confirm,
    Close,
}

impl CashOpeningStatus {
    /// Valida uma transição. `None` = transição ilegal.
    pub fn apply(self, action: OpeningAction) -> Option<CashOpeningStatus> {
        use CashOpeningStatus::*;
        use OpeningAction::*;

        match (self, action) {
            (Pending, Authorize) => Some(Authorized),
            (Pending, Deny) => Some(Denied),
            (Authorized, Confirm) => Some(Active),
            (Active, Close) => Some(Closed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, CashOpeningStatus::Denied | CashOpeningStatus::Closed)
    }

    /// Estados que ocupam a vaga única por (usuário, dia).
    pub fn holds_slot(self) -> bool {
        !self.is_terminal()
    }
}

/// Decisão do administrador sobre um pedido de abertura.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OpeningDecision {
    Authorized,
    Denied,
}

impl OpeningDecision {
    pub fn action(self) -> OpeningAction {
        match self {
            OpeningDecision::Authorized => OpeningAction::Authorize,
            OpeningDecision::Denied => OpeningAction::Deny,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CashOpening {
    pub id: Uuid,
    pub user_id: Uuid,
    pub sales_day_id: Uuid,
    #[schema(example = "25000")]
    pub initial_cash: Option<Decimal>,
    pub status: CashOpeningStatus,
    pub requested_at: DateTime<Utc>,
    pub opened_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub authorized_by: Option<Uuid>,
    pub closed_by: Option<Uuid>,
}

/// Evento publicado a cada transição (canal push / SSE).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpeningEvent {
    pub opening_id: Uuid,
    pub user_id: Uuid,
    pub sales_day_id: Uuid,
    pub status: CashOpeningStatus,
    pub at: DateTime<Utc>,
}

impl From<&CashOpening> for OpeningEvent {
    fn from(opening: &CashOpening) -> Self {
        Self {
            opening_id: opening.id,
            user_id: opening.user_id,
            sales_day_id: opening.sales_day_id,
            status: opening.status,
            at: Utc::now(),
        }
    }
}
