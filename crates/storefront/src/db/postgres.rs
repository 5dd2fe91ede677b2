//! Direct `PostgreSQL` backend for self-hosted deployments.
//!
//! Talks to the same `cart_items` schema the hosted backend exposes through
//! `PostgREST`. Queries are runtime-checked (`sqlx::query_as`) so the crate
//! builds without a live database.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use mauve_core::{CartId, CartItemId, Price, Quantity};

use super::{CartItemRow, CartItemTable, NewCartItem, RepositoryError};

/// Raw row as decoded by sqlx. `id` is selected as text so the key column
/// may be `uuid` or an integer identity.
#[derive(Debug, sqlx::FromRow)]
struct CartItemRecord {
    id: String,
    cart_id: Uuid,
    name: String,
    image: Option<String>,
    price: Decimal,
    qty: i32,
}

impl From<CartItemRecord> for CartItemRow {
    fn from(r: CartItemRecord) -> Self {
        Self {
            id: CartItemId::new(r.id),
            cart_id: CartId::new(r.cart_id),
            name: r.name,
            image: r.image,
            price: Price::new(r.price),
            qty: i64::from(r.qty),
        }
    }
}

/// Repository for `cart_items` over a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgCartTable {
    pool: PgPool,
}

impl PgCartTable {
    /// Create a new table handle.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartItemTable for PgCartTable {
    #[instrument(skip(self))]
    async fn fetch_by_cart(&self, cart_id: CartId) -> Result<Vec<CartItemRow>, RepositoryError> {
        let records = sqlx::query_as::<_, CartItemRecord>(
            r"
            SELECT id::text AS id, cart_id, name, image, price, qty
            FROM cart_items
            WHERE cart_id = $1
            ORDER BY created_at, id
            ",
        )
        .bind(cart_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(CartItemRow::from).collect())
    }

    #[instrument(skip(self, item), fields(cart_id = %item.cart_id, name = %item.name))]
    async fn insert(&self, item: &NewCartItem) -> Result<CartItemRow, RepositoryError> {
        let record = sqlx::query_as::<_, CartItemRecord>(
            r"
            INSERT INTO cart_items (cart_id, name, image, price, qty)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id::text AS id, cart_id, name, image, price, qty
            ",
        )
        .bind(item.cart_id)
        .bind(item.name.as_str())
        .bind(item.image.as_deref())
        .bind(item.price.amount())
        .bind(item.qty.as_i32())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict(format!(
                    "cart {} already has an item named {}",
                    item.cart_id, item.name
                ));
            }
            RepositoryError::Database(e)
        })?;

        Ok(record.into())
    }

    #[instrument(skip(self))]
    async fn update_quantity(
        &self,
        id: &CartItemId,
        qty: Quantity,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE cart_items SET qty = $2 WHERE id::text = $1")
            .bind(id.as_str())
            .bind(qty.as_i32())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(count = ids.len()))]
    async fn delete_by_ids(&self, ids: &[CartItemId]) -> Result<(), RepositoryError> {
        if ids.is_empty() {
            return Ok(());
        }

        let ids: Vec<&str> = ids.iter().map(CartItemId::as_str).collect();
        sqlx::query("DELETE FROM cart_items WHERE id::text = ANY($1)")
            .bind(&ids)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
