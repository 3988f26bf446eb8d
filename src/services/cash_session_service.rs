// src/services/cash_session_service.rs

use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{lock_sales_day, DayLock},
        error::{map_unique_violation, AppError},
    },
    db::{CashSessionRepository, CatalogRepository},
    models::{
        cash_session::{CashOpening, CashOpeningStatus, OpeningAction, OpeningDecision},
        reconciliation::SummaryScope,
    },
    services::{notifier::OpeningNotifier, reconciliation_service::ReconciliationService},
};

/// Aplica a ação ao estado atual ou devolve o conflito.
pub fn transition(
    from: CashOpeningStatus,
    action: OpeningAction,
) -> Result<CashOpeningStatus, AppError> {
    from.apply(action)
        .ok_or(AppError::InvalidTransition { from, action })
}

/// Valor inicial do caixa: obrigatório e não negativo.
pub fn validate_initial_cash(initial_cash: Option<Decimal>) -> Result<Decimal, AppError> {
    let amount = initial_cash.ok_or(AppError::InitialCashRequired)?;
    if amount < Decimal::ZERO {
        return Err(AppError::NegativeInitialCash);
    }
    Ok(amount)
}

#[derive(Clone)]
pub struct CashSessionService {
    repo: CashSessionRepository,
    catalog_repo: CatalogRepository,
    reconciliation: ReconciliationService,
    notifier: OpeningNotifier,
    admin_email: Option<String>,
}

impl CashSessionService {
    pub fn new(
        repo: CashSessionRepository,
        catalog_repo: CatalogRepository,
        reconciliation: ReconciliationService,
        notifier: OpeningNotifier,
        admin_email: Option<String>,
    ) -> Self {
        Self { repo, catalog_repo, reconciliation, notifier, admin_email }
    }

    pub fn notifier(&self) -> &OpeningNotifier {
        &self.notifier
    }

    // =========================================================================
    //  PEDIDO E DECISÃO
    // =========================================================================

    /// Cria um pedido de abertura (PENDING) para o operador no dia.
    pub async fn request_opening<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        sales_day_id: Uuid,
    ) -> Result<CashOpening, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        self.catalog_repo
            .find_user(&mut *tx, user_id)
            .await?
            .ok_or(AppError::UserNotFound(user_id))?;
        self.catalog_repo
            .find_sales_day(&mut *tx, sales_day_id)
            .await?
            .ok_or(AppError::SalesDayNotFound(sales_day_id))?;

        // 1. Verificação explícita (mensagem clara)
        let open = self.repo.find_open(&mut *tx, user_id, sales_day_id).await?;
        if open.is_some_and(|o| o.status.holds_slot()) {
            return Err(AppError::SessionAlreadyOpen);
        }

        // 2. O índice parcial cobre a corrida entre duas requisições
        let opening = self
            .repo
            .insert_pending(&mut *tx, user_id, sales_day_id)
            .await
            .map_err(|e| map_unique_violation(e, AppError::SessionAlreadyOpen))?;

        tx.commit().await?;

        tracing::info!("Pedido de abertura {} do usuário {}", opening.id, user_id);
        self.notifier.publish(&opening);

        Ok(opening)
    }

    /// Decisão do administrador: autoriza ou nega.
    pub async fn decide_opening<'e, E>(
        &self,
        executor: E,
        opening_id: Uuid,
        admin_id: Uuid,
        decision: OpeningDecision,
    ) -> Result<CashOpening, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let admin = self
            .catalog_repo
            .find_user(&mut *tx, admin_id)
            .await?
            .ok_or(AppError::UserNotFound(admin_id))?;
        if !admin.is_admin(self.admin_email.as_deref()) {
            return Err(AppError::NotAdmin(admin_id));
        }

        let opening = self
            .repo
            .find_by_id_for_update(&mut *tx, opening_id)
            .await?
            .ok_or(AppError::OpeningNotFound(opening_id))?;

        let next = transition(opening.status, decision.action())?;
        let decided = self
            .repo
            .record_decision(&mut *tx, opening_id, next, admin_id)
            .await?;

        tx.commit().await?;

        tracing::info!("Abertura {} {:?} por {}", opening_id, next, admin_id);
        self.notifier.publish(&decided);

        Ok(decided)
    }

    // =========================================================================
    //  CONFIRMAÇÃO E FECHAMENTO DA SESSÃO
    // =========================================================================

    /// O operador informa o fundo de caixa e a sessão fica ativa.
    pub async fn confirm_opening<'e, E>(
        &self,
        executor: E,
        opening_id: Uuid,
        initial_cash: Option<Decimal>,
        user_id: Option<Uuid>,
    ) -> Result<CashOpening, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let initial_cash = validate_initial_cash(initial_cash)?;

        let mut tx = executor.begin().await?;

        let opening = self
            .repo
            .find_by_id_for_update(&mut *tx, opening_id)
            .await?
            .ok_or(AppError::OpeningNotFound(opening_id))?;

        if let Some(uid) = user_id {
            if uid != opening.user_id {
                return Err(AppError::NotSessionOwner(uid));
            }
        }

        transition(opening.status, OpeningAction::Confirm)?;
        let active = self.repo.activate(&mut *tx, opening_id, initial_cash).await?;

        tx.commit().await?;

        tracing::info!("Sessão {} ativa com fundo {}", opening_id, initial_cash);
        self.notifier.publish(&active);

        Ok(active)
    }

    /// Fecha a sessão. Só passa se as vendas da sessão já foram fechadas.
    pub async fn close_session<'e, E>(
        &self,
        executor: E,
        opening_id: Uuid,
        user_id: Uuid,
    ) -> Result<CashOpening, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let sales_day_id = self
            .repo
            .find_by_id(&mut *tx, opening_id)
            .await?
            .ok_or(AppError::OpeningNotFound(opening_id))?
            .sales_day_id;

        // Trava do dia antes da linha da sessão, na mesma ordem das vendas
        lock_sales_day(&mut *tx, sales_day_id, DayLock::Exclusive).await?;

        let opening = self
            .repo
            .find_by_id_for_update(&mut *tx, opening_id)
            .await?
            .ok_or(AppError::OpeningNotFound(opening_id))?;

        if user_id != opening.user_id {
            let caller = self
                .catalog_repo
                .find_user(&mut *tx, user_id)
                .await?
                .ok_or(AppError::UserNotFound(user_id))?;
            if !caller.is_admin(self.admin_email.as_deref()) {
                return Err(AppError::NotSessionOwner(user_id));
            }
        }

        transition(opening.status, OpeningAction::Close)?;

        let summary = self
            .reconciliation
            .load(&mut *tx, opening.sales_day_id, SummaryScope::session(opening.id))
            .await?;
        if summary.has_unreconciled_sales() {
            return Err(AppError::UnreconciledSales(
                summary.total_general + summary.total_pendiente,
            ));
        }

        let closed = self.repo.close(&mut *tx, opening_id, user_id).await?;

        tx.commit().await?;

        tracing::info!("Sessão {} fechada por {}", opening_id, user_id);
        self.notifier.publish(&closed);

        Ok(closed)
    }

    // =========================================================================
    //  CONSULTA (polling)
    // =========================================================================

    /// Estado atual, sem efeitos colaterais.
    pub async fn active_opening(
        &self,
        sales_day_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<CashOpening>, AppError> {
        self.repo.find_latest_not_closed(user_id, sales_day_id).await
    }

    pub async fn find_opening<'e, E>(
        &self,
        executor: E,
        opening_id: Uuid,
    ) -> Result<CashOpening, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .find_by_id(executor, opening_id)
            .await?
            .ok_or(AppError::OpeningNotFound(opening_id))
    }
}
