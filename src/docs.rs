// src/docs.rs

use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Caja Eventos",
        description = "Caixa de eventos: sessões, vendas, pendentes, apuração e fechamentos"
    ),
    paths(
        // --- Sales ---
        handlers::sales::record_sale,
        handlers::sales::list_pending,
        handlers::sales::resolve_pending,
        handlers::sales::cancel_transaction,
        handlers::sales::list_cancellations,
        handlers::sales::get_summary,

        // --- Closings ---
        handlers::sales::create_partial_closing,
        handlers::sales::create_final_closing,
        handlers::sales::list_closings,

        // --- Cash Session ---
        handlers::cash_session::request_opening,
        handlers::cash_session::decide_opening,
        handlers::cash_session::confirm_opening,
        handlers::cash_session::close_session,
        handlers::cash_session::active_opening,
        handlers::cash_session::opening_events,

        // --- Catalog ---
        handlers::catalog::list_payment_types,
        handlers::catalog::list_sellable_products,
    ),
    components(
        schemas(
            // --- Catálogo ---
            models::catalog::UserRole,
            models::catalog::PaymentKind,
            models::catalog::User,
            models::catalog::SalesDay,
            models::catalog::PaymentType,
            models::catalog::Supplier,
            models::catalog::Product,
            models::catalog::SellableProduct,

            // --- Sessão de caixa ---
            models::cash_session::CashOpeningStatus,
            models::cash_session::OpeningAction,
            models::cash_session::OpeningDecision,
            models::cash_session::CashOpening,
            models::cash_session::OpeningEvent,

            // --- Vendas ---
            models::ledger::Transaction,
            models::ledger::Sale,
            models::ledger::SaleDetail,
            models::ledger::TransactionHeader,
            models::ledger::TransactionDetail,
            models::ledger::RecordedSale,
            models::ledger::TransactionCancellation,

            // --- Apuração e fechamentos ---
            models::reconciliation::ProductBreakdown,
            models::reconciliation::SupplierSummary,
            models::reconciliation::ReconciliationSummary,
            models::closing::ClosingKind,
            models::closing::ClosingSnapshot,
            models::closing::ClosingTotals,
            models::closing::CashClosing,

            // --- Payloads ---
            handlers::sales::CartItemPayload,
            handlers::sales::RecordSalePayload,
            handlers::sales::ResolvePendingPayload,
            handlers::sales::CancelTransactionPayload,
            handlers::sales::PartialClosingPayload,
            handlers::sales::FinalClosingPayload,
            handlers::cash_session::OpenCashPayload,
            handlers::cash_session::AuthorizeOpeningPayload,
            handlers::cash_session::ConfirmOpeningPayload,
            handlers::cash_session::CloseCashPayload,
        )
    ),
    tags(
        (name = "Sales", description = "Registro de vendas, pendentes e resumo"),
        (name = "Closings", description = "Fechamentos parciais e final do dia"),
        (name = "Cash Session", description = "Abertura, autorização e fechamento de caixa"),
        (name = "Catalog", description = "Catálogo de referência (somente leitura)")
    )
)]
pub struct ApiDoc;
