// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    common::i18n::I18nStore,
    middleware::i18n::Locale,
    models::cash_session::{CashOpeningStatus, OpeningAction},
};

/// Categoria do erro, como o cliente a percebe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Forbidden,
    Conflict,
    Internal,
}

#[derive(Debug, Error)]
pub enum AppError {
    // --- Validação ---
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Carrinho vazio")]
    EmptyCart,

    #[error("Quantidade inválida para o produto {0}")]
    InvalidQuantity(Uuid),

    #[error("Forma de pagamento desconhecida: {0}")]
    UnknownPaymentType(Uuid),

    #[error("Motivo obrigatório")]
    ReasonRequired,

    #[error("Valor inicial obrigatório")]
    InitialCashRequired,

    #[error("Valor inicial negativo")]
    NegativeInitialCash,

    #[error("Nada para fechar")]
    NothingToClose,

    // --- Não encontrado ---
    #[error("Dia de vendas não encontrado: {0}")]
    SalesDayNotFound(Uuid),

    #[error("Produto não encontrado: {0}")]
    ProductNotFound(Uuid),

    #[error("Transação não encontrada: {0}")]
    TransactionNotFound(Uuid),

    #[error("Abertura de caixa não encontrada: {0}")]
    OpeningNotFound(Uuid),

    #[error("Usuário não encontrado: {0}")]
    UserNotFound(Uuid),

    // --- Permissão ---
    #[error("Usuário {0} não é administrador")]
    NotAdmin(Uuid),

    #[error("Usuário {0} não é dono da sessão")]
    NotSessionOwner(Uuid),

    // --- Conflito ---
    #[error("Já existe uma sessão aberta para este usuário e dia")]
    SessionAlreadyOpen,

    #[error("Transição inválida: {from:?} -> {action:?}")]
    InvalidTransition {
        from: CashOpeningStatus,
        action: OpeningAction,
    },

    #[error("Usuário sem sessão ativa no dia")]
    NoActiveSession,

    #[error("Existem vendas pendentes: {0}")]
    PendingSalesRemain(Decimal),

    #[error("Existem vendas não conciliadas: {0}")]
    UnreconciledSales(Decimal),

    #[error("Resumo desatualizado")]
    StaleSummary,

    #[error("{0} transações da janela ficariam fora do fechamento")]
    SalesOutsideScope(i64),

    #[error("Nenhum fechamento parcial no dia")]
    NoPartialClosings,

    #[error("Dia já possui fechamento final")]
    DayAlreadyFinalized,

    // --- Infra ---
    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        use AppError::*;

        match self {
            ValidationError(_) | EmptyCart | InvalidQuantity(_) | UnknownPaymentType(_)
            | ReasonRequired | InitialCashRequired | NegativeInitialCash | NothingToClose => {
                ErrorKind::Validation
            }
            SalesDayNotFound(_) | ProductNotFound(_) | TransactionNotFound(_)
            | OpeningNotFound(_) | UserNotFound(_) => ErrorKind::NotFound,
            NotAdmin(_) | NotSessionOwner(_) => ErrorKind::Forbidden,
            SessionAlreadyOpen | InvalidTransition { .. } | NoActiveSession
            | PendingSalesRemain(_) | UnreconciledSales(_) | StaleSummary
            | SalesOutsideScope(_) | NoPartialClosings | DayAlreadyFinalized => ErrorKind::Conflict,
            DatabaseError(_) | InternalServerError(_) => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Chave de tradução + argumentos para a mensagem.
    fn message_key(&self) -> (&'static str, Vec<String>) {
        use AppError::*;

        match self {
            ValidationError(_) => ("validation.invalid_fields", vec![]),
            EmptyCart => ("validation.empty_cart", vec![]),
            InvalidQuantity(id) => ("validation.invalid_quantity", vec![id.to_string()]),
            UnknownPaymentType(id) => ("validation.unknown_payment_type", vec![id.to_string()]),
            ReasonRequired => ("validation.reason_required", vec![]),
            InitialCashRequired => ("validation.initial_cash_required", vec![]),
            NegativeInitialCash => ("validation.initial_cash_negative", vec![]),
            NothingToClose => ("validation.nothing_to_close", vec![]),
            SalesDayNotFound(id) => ("not_found.sales_day", vec![id.to_string()]),
            ProductNotFound(id) => ("not_found.product", vec![id.to_string()]),
            TransactionNotFound(id) => ("not_found.transaction", vec![id.to_string()]),
            OpeningNotFound(id) => ("not_found.opening", vec![id.to_string()]),
            UserNotFound(id) => ("not_found.user", vec![id.to_string()]),
            NotAdmin(id) => ("forbidden.not_admin", vec![id.to_string()]),
            NotSessionOwner(id) => ("forbidden.not_owner", vec![id.to_string()]),
            SessionAlreadyOpen => ("conflict.session_already_open", vec![]),
            InvalidTransition { from, action } => (
                "conflict.invalid_transition",
                vec![format!("{from:?}").to_lowercase(), format!("{action:?}").to_lowercase()],
            ),
            NoActiveSession => ("conflict.no_active_session", vec![]),
            PendingSalesRemain(amount) => ("conflict.pending_sales", vec![amount.to_string()]),
            UnreconciledSales(amount) => ("conflict.unreconciled_sales", vec![amount.to_string()]),
            StaleSummary => ("conflict.stale_summary", vec![]),
            SalesOutsideScope(count) => ("conflict.sales_outside_scope", vec![count.to_string()]),
            NoPartialClosings => ("conflict.no_partial_closings", vec![]),
            DayAlreadyFinalized => ("conflict.day_finalized", vec![]),
            DatabaseError(_) | InternalServerError(_) => ("internal.unexpected", vec![]),
        }
    }

    /// Converte o erro de domínio numa resposta traduzida para o idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        let status = self.status();

        if self.kind() == ErrorKind::Internal {
            // O detalhe fica no log, o cliente recebe a mensagem genérica
            tracing::error!("Erro Interno do Servidor: {}", self);
        }

        let (key, args) = self.message_key();
        let error = store.translate(&locale.0, key, &args);

        let details = match self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<Value> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .map(Value::String)
                        .collect();
                    details.insert(field.to_string(), Value::Array(messages));
                }
                Some(Value::Object(details))
            }
            _ => None,
        };

        ApiError { status, error, details }
    }
}

/// Mapeia violação de índice único para um erro de domínio.
pub fn map_unique_violation(e: sqlx::Error, conflict: AppError) -> AppError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return conflict;
        }
    }
    AppError::DatabaseError(e)
}

// ---
// ApiError: o que efetivamente vai para o cliente
// ---
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_expected_status() {
        assert_eq!(AppError::EmptyCart.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::UnknownPaymentType(Uuid::nil()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::ProductNotFound(Uuid::nil()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::NotAdmin(Uuid::nil()).status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::SessionAlreadyOpen.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::DayAlreadyFinalized.status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::InternalServerError(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn api_error_is_localized_and_hides_internal_detail() {
        let store = I18nStore::load().unwrap();
        let es = Locale("es".into());

        let api = AppError::PendingSalesRemain(Decimal::from(1500)).to_api_error(&es, &store);
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert!(api.error.contains("1500"));

        let api = AppError::InternalServerError(anyhow::anyhow!("senha do banco"))
            .to_api_error(&es, &store);
        assert!(!api.error.contains("senha"));
    }
}
