// src/db/catalog_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::catalog::{PaymentType, Product, SalesDay, SellableProduct, User},
};

// Catálogo de referência: o núcleo só lê estas tabelas.
#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_user<'e, E>(&self, executor: E, user_id: Uuid) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, role, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    pub async fn find_sales_day<'e, E>(
        &self,
        executor: E,
        sales_day_id: Uuid,
    ) -> Result<Option<SalesDay>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let day = sqlx::query_as::<_, SalesDay>(
            "SELECT id, event_id, day, created_at FROM sales_days WHERE id = $1",
        )
        .bind(sales_day_id)
        .fetch_optional(executor)
        .await?;

        Ok(day)
    }

    pub async fn find_payment_type<'e, E>(
        &self,
        executor: E,
        payment_type_id: Uuid,
    ) -> Result<Option<PaymentType>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payment_type = sqlx::query_as::<_, PaymentType>(
            "SELECT id, name, kind, created_at FROM payment_types WHERE id = $1",
        )
        .bind(payment_type_id)
        .fetch_optional(executor)
        .await?;

        Ok(payment_type)
    }

    pub async fn list_payment_types(&self) -> Result<Vec<PaymentType>, AppError> {
        let types = sqlx::query_as::<_, PaymentType>(
            "SELECT id, name, kind, created_at FROM payment_types ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(types)
    }

    /// Busca vários produtos de uma vez (preço atual).
    pub async fn find_products<'e, E>(
        &self,
        executor: E,
        product_ids: &[Uuid],
    ) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let products = sqlx::query_as::<_, Product>(
            "SELECT id, name, price, supplier_id FROM products WHERE id = ANY($1)",
        )
        .bind(product_ids)
        .fetch_all(executor)
        .await?;

        Ok(products)
    }

    /// Produtos vendáveis no dia (associação `sales_day_products`).
    pub async fn list_sellable_products(
        &self,
        sales_day_id: Uuid,
    ) -> Result<Vec<SellableProduct>, AppError> {
        let products = sqlx::query_as::<_, SellableProduct>(
            r#"
            SELECT
                sdp.id AS association_id,
                sdp.sales_day_id,
                p.id AS product_id,
                p.name,
                p.price,
                p.supplier_id,
                s.name AS supplier_name
            FROM sales_day_products sdp
            JOIN products p ON p.id = sdp.product_id
            LEFT JOIN suppliers s ON s.id = p.supplier_id
            WHERE sdp.sales_day_id = $1
            ORDER BY p.name ASC
            "#,
        )
        .bind(sales_day_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }
}
