// src/services/fixtures.rs
//
// Dados mínimos para os testes que usam o banco (`#[sqlx::test]`).

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::{
        CashSessionRepository, CatalogRepository, ClosingRepository, LedgerRepository,
        ReconciliationRepository,
    },
    models::{cash_session::OpeningDecision, ledger::CartItem, ledger::RecordedSale},
    services::{
        CashSessionService, ClosingService, LedgerService, OpeningNotifier, PendingService,
        ReconciliationService,
    },
};

pub struct Fixture {
    pub pool: PgPool,
    pub day: Uuid,
    pub admin: Uuid,
    pub cashier: Uuid,
    pub other_cashier: Uuid,
    /// Camiseta, 1000, fornecedor Acme (comissão 10, datáfono 5)
    pub shirt: Uuid,
    /// Café, 500, sem fornecedor
    pub coffee: Uuid,
    pub cash: Uuid,
    pub card: Uuid,
    pub deferred: Uuid,

    pub ledger: LedgerService,
    pub pending: PendingService,
    pub reconciliation: ReconciliationService,
    pub sessions: CashSessionService,
    pub closings: ClosingService,
}

impl Fixture {
    pub async fn seed(pool: PgPool) -> Self {
        let admin = insert_user(&pool, "Jefa", "jefa@feria.cr", true).await;
        let cashier = insert_user(&pool, "Caja 1", "caja1@feria.cr", false).await;
        let other_cashier = insert_user(&pool, "Caja 2", "caja2@feria.cr", false).await;

        let event: Uuid = sqlx::query_scalar(
            "INSERT INTO events (name, starts_on, ends_on) VALUES ('Feria', CURRENT_DATE, CURRENT_DATE) RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        let day: Uuid = sqlx::query_scalar(
            "INSERT INTO sales_days (event_id, day) VALUES ($1, CURRENT_DATE) RETURNING id",
        )
        .bind(event)
        .fetch_one(&pool)
        .await
        .unwrap();

        let acme: Uuid = sqlx::query_scalar(
            "INSERT INTO suppliers (name, commission, dataphone_commission) VALUES ('Acme', 10, 5) RETURNING id",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        let shirt = insert_product(&pool, "Camiseta", Decimal::from(1000), Some(acme)).await;
        let coffee = insert_product(&pool, "Café", Decimal::from(500), None).await;

        let cash = payment_type(&pool, "Efectivo").await;
        let card = payment_type(&pool, "Tarjeta").await;
        let deferred = payment_type(&pool, "Pendiente").await;

        let catalog_repo = CatalogRepository::new(pool.clone());
        let session_repo = CashSessionRepository::new(pool.clone());
        let ledger_repo = LedgerRepository::new(pool.clone());

        let reconciliation = ReconciliationService::new(
            ReconciliationRepository::new(),
            catalog_repo.clone(),
            session_repo.clone(),
        );
        let ledger = LedgerService::new(ledger_repo.clone(), catalog_repo.clone(), session_repo.clone());
        let pending = PendingService::new(ledger_repo, catalog_repo.clone());
        let sessions = CashSessionService::new(
            session_repo,
            catalog_repo.clone(),
            reconciliation.clone(),
            OpeningNotifier::new(16),
            None,
        );
        let closings = ClosingService::new(
            ClosingRepository::new(pool.clone()),
            catalog_repo,
            reconciliation.clone(),
        );

        Self {
            pool,
            day,
            admin,
            cashier,
            other_cashier,
            shirt,
            coffee,
            cash,
            card,
            deferred,
            ledger,
            pending,
            reconciliation,
            sessions,
            closings,
        }
    }

    /// Pedido, autorização e confirmação: devolve a sessão ativa.
    pub async fn open_session(&self, user_id: Uuid) -> Uuid {
        let opening = self
            .sessions
            .request_opening(&self.pool, user_id, self.day)
            .await
            .unwrap();
        self.sessions
            .decide_opening(&self.pool, opening.id, self.admin, OpeningDecision::Authorized)
            .await
            .unwrap();
        self.sessions
            .confirm_opening(&self.pool, opening.id, Some(Decimal::from(20000)), Some(user_id))
            .await
            .unwrap();
        opening.id
    }

    pub async fn sell(
        &self,
        payment_type_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        user_id: Option<Uuid>,
    ) -> RecordedSale {
        self.ledger
            .record_sale(
                &self.pool,
                self.day,
                payment_type_id,
                &[CartItem { product_id, quantity }],
                None,
                user_id,
            )
            .await
            .unwrap()
    }

    pub async fn count(&self, table: &str) -> i64 {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

async fn insert_user(pool: &PgPool, name: &str, email: &str, admin: bool) -> Uuid {
    let sql = if admin {
        "INSERT INTO users (name, email, role) VALUES ($1, $2, 'ADMIN') RETURNING id"
    } else {
        "INSERT INTO users (name, email) VALUES ($1, $2) RETURNING id"
    };
    sqlx::query_scalar(sql)
        .bind(name)
        .bind(email)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn insert_product(pool: &PgPool, name: &str, price: Decimal, supplier_id: Option<Uuid>) -> Uuid {
    sqlx::query_scalar("INSERT INTO products (name, price, supplier_id) VALUES ($1, $2, $3) RETURNING id")
        .bind(name)
        .bind(price)
        .bind(supplier_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn payment_type(pool: &PgPool, name: &str) -> Uuid {
    sqlx::query_scalar("SELECT id FROM payment_types WHERE name = $1")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}
