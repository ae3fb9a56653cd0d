//! # Order Repository
//!
//! Customer orders and the stock reservations they hold.
//!
//! ## Order Lifecycle vs Stock
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  create_order ──► reserved += qty per line      (status: pending)       │
//! │       │                                                                 │
//! │       ├── update_order(confirmed / shipped / delivered)                 │
//! │       │        no stock effect; the sale transaction consumes           │
//! │       │        the reservation when goods leave                         │
//! │       │                                                                 │
//! │       ├── update_order(cancelled) ──► reserved -= qty per line          │
//! │       │                                                                 │
//! │       └── delete_order                                                  │
//! │                ├── not cancelled ──► reserved -= qty per line           │
//! │                └── cancelled     ──► nothing left to release            │
//! │                                                                         │
//! │  Every path runs in one SQL transaction. A product without an           │
//! │  inventory row fails the whole call with NotFound.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use depot_core::ledger::NegativeStockPolicy;
use depot_core::numbering::{generate_document_number, DocumentKind};
use depot_core::order::{plan_status_change, ReservationEffect};
use depot_core::validation::{validate_new_order, validate_required_id};
use depot_core::{NewOrder, Order, OrderDetail, OrderItem, OrderUpdate};

use crate::error::{DbError, DbResult};
use crate::repository::ledger::{release, reserve};
use crate::repository::MAX_NUMBER_ATTEMPTS;

const ORDER_COLUMNS: &str = r#"
    id, order_number, customer_id, user_id, status, total_cents, notes, created_at, updated_at
"#;

/// Repository for customer orders.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
    policy: NegativeStockPolicy,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool, policy: NegativeStockPolicy) -> Self {
        OrderRepository { pool, policy }
    }

    /// Creates an order and reserves stock for every line.
    ///
    /// ## Returns
    /// * `Ok(OrderDetail)` - the stored order and its items
    /// * `Err(DbError::Domain(..))` - no items, bad quantity or price,
    ///   or insufficient stock under the reject policy
    /// * `Err(DbError::NotFound)` - a line's product has no inventory row
    /// * `Err(DbError::UniqueViolation)` - order number collided on every attempt
    pub async fn create_order(&self, user_id: &str, input: &NewOrder) -> DbResult<OrderDetail> {
        validate_required_id("user_id", user_id)?;
        validate_new_order(input)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let mut order = Order {
            id: Uuid::new_v4().to_string(),
            order_number: String::new(),
            customer_id: input.customer_id.clone(),
            user_id: user_id.to_string(),
            status: Default::default(),
            total_cents: input.total()?.cents(),
            notes: input.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        order.order_number = insert_order_row(&mut tx, &order).await?;

        let mut items = Vec::with_capacity(input.items.len());
        for line in &input.items {
            reserve(&mut tx, self.policy, &line.product_id, line.quantity).await?;

            let item = OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: order.id.clone(),
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                total_price_cents: line.line_total()?.cents(),
            };

            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, quantity, unit_price_cents, total_price_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&item.id)
            .bind(&item.order_id)
            .bind(&item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.total_price_cents)
            .execute(&mut *tx)
            .await?;

            items.push(item);
        }

        tx.commit().await?;

        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            items = items.len(),
            total_cents = order.total_cents,
            "Order created"
        );

        Ok(OrderDetail { order, items })
    }

    /// Gets an order by ID.
    pub async fn get_order(&self, id: &str) -> DbResult<Order> {
        let mut conn = self.pool.acquire().await?;
        fetch_order(&mut conn, id).await
    }

    pub async fn get_order_detail(&self, id: &str) -> DbResult<OrderDetail> {
        let mut conn = self.pool.acquire().await?;
        let order = fetch_order(&mut conn, id).await?;
        let items = fetch_items(&mut conn, id).await?;
        Ok(OrderDetail { order, items })
    }

    /// Lists orders newest first, optionally for one customer.
    pub async fn list_orders(
        &self,
        customer_id: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {ORDER_COLUMNS}
            FROM orders
            WHERE (?1 IS NULL OR customer_id = ?1)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2 OFFSET ?3
            "#
        ))
        .bind(customer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Changes status and/or notes.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - order doesn't exist
    /// * `Err(DbError::Domain(InvalidStatusTransition))` - move not allowed
    pub async fn update_order(&self, id: &str, update: &OrderUpdate) -> DbResult<Order> {
        debug!(id = %id, ?update, "Updating order");

        let mut tx = self.pool.begin().await?;
        let mut order = fetch_order(&mut tx, id).await?;

        if let Some(status) = update.status {
            let change = plan_status_change("Order", id, order.status, status)?;

            if change.reservations == ReservationEffect::Release {
                let items = fetch_items(&mut tx, id).await?;
                release_items(&mut tx, self.policy, &items).await?;
            }

            if !change.is_noop() {
                info!(order_id = %id, from = %change.from, to = %change.to, "Order status changed");
            }
            order.status = status;
        }

        if let Some(notes) = &update.notes {
            order.notes = Some(notes.clone());
        }

        if update.status.is_some() || update.notes.is_some() {
            order.updated_at = Utc::now();
            sqlx::query("UPDATE orders SET status = ?2, notes = ?3, updated_at = ?4 WHERE id = ?1")
                .bind(&order.id)
                .bind(order.status)
                .bind(&order.notes)
                .bind(order.updated_at)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(order)
    }

    /// Deletes an order, releasing its reservations unless it was cancelled.
    pub async fn delete_order(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting order");

        let mut tx = self.pool.begin().await?;
        let order = fetch_order(&mut tx, id).await?;
        let items = fetch_items(&mut tx, id).await?;

        if order.status.holds_reservation() {
            release_items(&mut tx, self.policy, &items).await?;
        }

        sqlx::query("DELETE FROM order_items WHERE order_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM orders WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(order_id = %id, order_number = %order.order_number, "Order deleted");
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Inserts the order row, regenerating the number on collision.
async fn insert_order_row(conn: &mut SqliteConnection, order: &Order) -> DbResult<String> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let number = generate_document_number(DocumentKind::Order);

        let result = sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, customer_id, user_id, status,
                total_cents, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&order.id)
        .bind(&number)
        .bind(&order.customer_id)
        .bind(&order.user_id)
        .bind(order.status)
        .bind(order.total_cents)
        .bind(&order.notes)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *conn)
        .await;

        match result.map_err(DbError::from) {
            Ok(_) => return Ok(number),
            Err(err) if err.is_unique_violation_on("order_number") => {
                if attempt >= MAX_NUMBER_ATTEMPTS {
                    return Err(DbError::duplicate("order_number", number));
                }
                warn!(order_number = %number, attempt, "Order number collision, regenerating");
            }
            Err(err) => return Err(err),
        }
    }
}

async fn fetch_order(conn: &mut SqliteConnection, id: &str) -> DbResult<Order> {
    sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Order", id))
}

async fn fetch_items(conn: &mut SqliteConnection, order_id: &str) -> DbResult<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>(
        r#"
        SELECT id, order_id, product_id, quantity, unit_price_cents, total_price_cents
        FROM order_items
        WHERE order_id = ?1
        ORDER BY rowid
        "#,
    )
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

async fn release_items(
    conn: &mut SqliteConnection,
    policy: NegativeStockPolicy,
    items: &[OrderItem],
) -> DbResult<()> {
    for item in items {
        release(conn, policy, &item.product_id, item.quantity).await?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
