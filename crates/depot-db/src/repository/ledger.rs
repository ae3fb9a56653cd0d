//! # Stock Ledger Repository
//!
//! Applies audited stock movements and owns the one code path that writes
//! inventory counters.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply_transaction(user, NewTransaction)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │       │                                                                 │
//! │       ├── fetch_levels(product)           no row → NotFound             │
//! │       │                                                                 │
//! │       ├── depot_core::ledger::plan_transaction                          │
//! │       │        negative qty → Validation                                │
//! │       │        reject policy + negative → InsufficientStock             │
//! │       │                                                                 │
//! │       ├── swap_levels                                                   │
//! │       │     UPDATE inventory SET current, reserved, available           │
//! │       │     WHERE product_id = ? AND current = <read> AND reserved = <read>
//! │       │     0 rows → Conflict                                           │
//! │       │                                                                 │
//! │       └── INSERT inventory_transactions (previous_stock, new_stock)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT   (any error above rolls everything back)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use depot_core::ledger::{self, NegativeStockPolicy, StockLevels};
use depot_core::validation::{validate_required_id, validate_transaction_quantity};
use depot_core::{InventoryTransaction, NewTransaction};

use crate::error::{DbError, DbResult};

// =============================================================================
// Counter primitives
// =============================================================================

/// Reads the counters of one inventory row.
pub(crate) async fn fetch_levels(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> DbResult<StockLevels> {
    let row: Option<(i64, i64)> = sqlx::query_as(
        "SELECT current_stock, reserved_stock FROM inventory WHERE product_id = ?1",
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(|(current, reserved)| StockLevels::new(current, reserved))
        .ok_or_else(|| DbError::not_found("Inventory", product_id))
}

/// Writes `next` only if the row still holds `expected`.
pub(crate) async fn swap_levels(
    conn: &mut SqliteConnection,
    product_id: &str,
    expected: StockLevels,
    next: StockLevels,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE inventory SET
            current_stock = ?1,
            reserved_stock = ?2,
            available_stock = ?3,
            last_updated = ?4
        WHERE product_id = ?5
          AND current_stock = ?6
          AND reserved_stock = ?7
        "#,
    )
    .bind(next.current)
    .bind(next.reserved)
    .bind(next.available)
    .bind(Utc::now())
    .bind(product_id)
    .bind(expected.current)
    .bind(expected.reserved)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        warn!(
            product_id = %product_id,
            expected_current = expected.current,
            expected_reserved = expected.reserved,
            "Inventory changed concurrently, write rejected"
        );
        return Err(DbError::conflict("Inventory", product_id));
    }

    Ok(())
}

/// Reserves `quantity` units for an order line.
pub(crate) async fn reserve(
    conn: &mut SqliteConnection,
    policy: NegativeStockPolicy,
    product_id: &str,
    quantity: i64,
) -> DbResult<StockLevels> {
    let levels = fetch_levels(conn, product_id).await?;
    let next = ledger::plan_reservation(product_id, levels, quantity, policy)?;
    swap_levels(conn, product_id, levels, next).await?;

    debug!(product_id = %product_id, quantity, reserved = next.reserved, "Reserved stock");
    Ok(next)
}

/// Releases a reservation of `quantity` units.
pub(crate) async fn release(
    conn: &mut SqliteConnection,
    policy: NegativeStockPolicy,
    product_id: &str,
    quantity: i64,
) -> DbResult<StockLevels> {
    let levels = fetch_levels(conn, product_id).await?;
    let next = ledger::plan_release(product_id, levels, quantity, policy)?;
    swap_levels(conn, product_id, levels, next).await?;

    debug!(product_id = %product_id, quantity, reserved = next.reserved, "Released stock");
    Ok(next)
}

// =============================================================================
// Composable transaction
// =============================================================================

/// Applies a ledger transaction on a caller-owned connection.
///
/// Does not begin or commit. Pass `&mut *tx` to batch several movements
/// (or a movement plus other writes) into one SQL transaction:
///
/// ```rust,ignore
/// let mut tx = db.pool().begin().await?;
/// for input in &inputs {
///     apply_transaction_in(&mut tx, db.stock_policy(), "user-1", input).await?;
/// }
/// tx.commit().await?;
/// ```
pub async fn apply_transaction_in(
    conn: &mut SqliteConnection,
    policy: NegativeStockPolicy,
    user_id: &str,
    input: &NewTransaction,
) -> DbResult<InventoryTransaction> {
    validate_required_id("user_id", user_id)?;
    validate_required_id("product_id", &input.product_id)?;
    validate_transaction_quantity(input.quantity)?;

    let levels = fetch_levels(conn, &input.product_id).await?;
    let movement = ledger::plan_transaction(
        &input.product_id,
        levels,
        input.transaction_type,
        input.quantity,
        policy,
    )?;

    if !movement.is_noop() {
        swap_levels(conn, &input.product_id, movement.previous, movement.next).await?;
    }

    let record = InventoryTransaction {
        id: Uuid::new_v4().to_string(),
        product_id: input.product_id.clone(),
        transaction_type: input.transaction_type,
        quantity: input.quantity,
        previous_stock: movement.previous.current,
        new_stock: movement.next.current,
        reference_id: input.reference_id.clone(),
        reference_type: input.reference_type.clone(),
        notes: input.notes.clone(),
        user_id: user_id.to_string(),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO inventory_transactions (
            id, product_id, transaction_type, quantity,
            previous_stock, new_stock,
            reference_id, reference_type, notes,
            user_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&record.id)
    .bind(&record.product_id)
    .bind(record.transaction_type)
    .bind(record.quantity)
    .bind(record.previous_stock)
    .bind(record.new_stock)
    .bind(&record.reference_id)
    .bind(&record.reference_type)
    .bind(&record.notes)
    .bind(&record.user_id)
    .bind(record.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(record)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the stock ledger.
///
/// ## Usage
/// ```rust,ignore
/// let tx = db.ledger()
///     .apply_transaction("user-1", &NewTransaction::new(&product_id, TransactionKind::Sale, 5))
///     .await?;
/// assert_eq!(tx.new_stock, tx.previous_stock - 5);
/// ```
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
    policy: NegativeStockPolicy,
}

impl LedgerRepository {
    pub fn new(pool: SqlitePool, policy: NegativeStockPolicy) -> Self {
        LedgerRepository { pool, policy }
    }

    pub fn policy(&self) -> NegativeStockPolicy {
        self.policy
    }

    /// Applies one stock movement and records it, atomically.
    ///
    /// ## Returns
    /// * `Ok(InventoryTransaction)` - the audit record just written
    /// * `Err(DbError::NotFound)` - the product has no inventory row
    /// * `Err(DbError::Domain(..))` - negative quantity or insufficient stock
    /// * `Err(DbError::Conflict)` - a concurrent writer changed the row
    pub async fn apply_transaction(
        &self,
        user_id: &str,
        input: &NewTransaction,
    ) -> DbResult<InventoryTransaction> {
        debug!(
            product_id = %input.product_id,
            kind = %input.transaction_type,
            quantity = input.quantity,
            "Applying stock transaction"
        );

        let mut tx = self.pool.begin().await?;
        let record = apply_transaction_in(&mut tx, self.policy, user_id, input).await?;
        tx.commit().await?;

        info!(
            product_id = %record.product_id,
            kind = %record.transaction_type,
            quantity = record.quantity,
            previous_stock = record.previous_stock,
            new_stock = record.new_stock,
            "Stock transaction applied"
        );

        Ok(record)
    }

    /// Lists transactions, newest first, optionally for one product.
    pub async fn list_transactions(
        &self,
        product_id: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> DbResult<Vec<InventoryTransaction>> {
        let rows = sqlx::query_as::<_, InventoryTransaction>(
            r#"
            SELECT id, product_id, transaction_type, quantity,
                   previous_stock, new_stock,
                   reference_id, reference_type, notes,
                   user_id, created_at
            FROM inventory_transactions
            WHERE (?1 IS NULL OR product_id = ?1)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(product_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Transactions caused by one document (e.g. `("purchase_order", po_id)`),
    /// in the order they were written.
    pub async fn transactions_for_reference(
        &self,
        reference_type: &str,
        reference_id: &str,
    ) -> DbResult<Vec<InventoryTransaction>> {
        let rows = sqlx::query_as::<_, InventoryTransaction>(
            r#"
            SELECT id, product_id, transaction_type, quantity,
                   previous_stock, new_stock,
                   reference_id, reference_type, notes,
                   user_id, created_at
            FROM inventory_transactions
            WHERE reference_type = ?1 AND reference_id = ?2
            ORDER BY rowid
            "#,
        )
        .bind(reference_type)
        .bind(reference_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn count_transactions(&self, product_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM inventory_transactions WHERE product_id = ?1")
                .bind(product_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
