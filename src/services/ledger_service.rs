// src/services/ledger_service.rs

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{lock_sales_day, DayLock},
        error::AppError,
    },
    db::{CashSessionRepository, CatalogRepository, LedgerRepository},
    models::{
        cash_session::CashOpeningStatus,
        catalog::Product,
        ledger::{CartItem, PricedCart, PricedLine, RecordedSale},
    },
};

/// Precifica o carrinho com o preço atual de cada produto.
/// Falha no primeiro item inválido; nada é gravado.
pub fn price_cart(items: &[CartItem], products: &[Product]) -> Result<PricedCart, AppError> {
    if items.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let by_id: HashMap<Uuid, &Product> = products.iter().map(|p| (p.id, p)).collect();

    let mut lines = Vec::with_capacity(items.len());
    let mut total = Decimal::ZERO;

    for item in items {
        if item.quantity <= 0 {
            return Err(AppError::InvalidQuantity(item.product_id));
        }
        let product = by_id
            .get(&item.product_id)
            .ok_or(AppError::ProductNotFound(item.product_id))?;

        let line_total = product.price * Decimal::from(item.quantity);
        total += line_total;
        lines.push(PricedLine {
            product_id: item.product_id,
            quantity: item.quantity,
            total: line_total,
        });
    }

    Ok(PricedCart { lines, total })
}

#[derive(Clone)]
pub struct LedgerService {
    repo: LedgerRepository,
    catalog_repo: CatalogRepository,
    session_repo: CashSessionRepository,
}

impl LedgerService {
    pub fn new(
        repo: LedgerRepository,
        catalog_repo: CatalogRepository,
        session_repo: CashSessionRepository,
    ) -> Self {
        Self { repo, catalog_repo, session_repo }
    }

    /// Registra uma venda: uma transação e suas linhas, tudo ou nada.
    pub async fn record_sale<'e, E>(
        &self,
        executor: E,
        sales_day_id: Uuid,
        payment_type_id: Uuid,
        items: &[CartItem],
        observation: Option<&str>,
        user_id: Option<Uuid>,
    ) -> Result<RecordedSale, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        // 0. Validações que não precisam do banco
        if items.is_empty() {
            return Err(AppError::EmptyCart);
        }
        if let Some(bad) = items.iter().find(|i| i.quantity <= 0) {
            return Err(AppError::InvalidQuantity(bad.product_id));
        }

        let mut tx = executor.begin().await?;

        // 1. Trava compartilhada: vendas não cruzam um fechamento em curso
        lock_sales_day(&mut *tx, sales_day_id, DayLock::Share).await?;

        // 2. Forma de pagamento
        self.catalog_repo
            .find_payment_type(&mut *tx, payment_type_id)
            .await?
            .ok_or(AppError::UnknownPaymentType(payment_type_id))?;

        // 3. Sessão do operador, se informado
        let cash_opening_id = match user_id {
            Some(uid) => {
                let opening = self
                    .session_repo
                    .find_open(&mut *tx, uid, sales_day_id)
                    .await?
                    .filter(|o| o.status == CashOpeningStatus::Active)
                    .ok_or(AppError::NoActiveSession)?;
                Some(opening.id)
            }
            None => None,
        };

        // 4. Preços atuais
        let product_ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let products = self.catalog_repo.find_products(&mut *tx, &product_ids).await?;
        let cart = price_cart(items, &products)?;

        // 5. Cabeçalho + linhas
        let transaction = self
            .repo
            .insert_transaction(
                &mut *tx,
                sales_day_id,
                payment_type_id,
                user_id,
                cash_opening_id,
                cart.total,
                observation,
            )
            .await?;

        let mut sales = Vec::with_capacity(cart.lines.len());
        for line in &cart.lines {
            let sale = self
                .repo
                .insert_sale(&mut *tx, transaction.id, line.product_id, line.quantity, line.total)
                .await?;
            sales.push(sale);
        }

        tx.commit().await?;

        tracing::info!(
            "Venda {} registrada no dia {}: {} linhas, total {}",
            transaction.id,
            sales_day_id,
            sales.len(),
            transaction.total
        );

        Ok(RecordedSale { transaction, sales })
    }
}
