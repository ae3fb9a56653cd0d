//! # Inventory Repository
//!
//! Reads of the per-product counters, manual corrections and the low-stock
//! report.
//!
//! ## Manual Corrections
//! ```text
//! update_inventory(user, product, { current_stock: 40 })
//!      │
//!      ├── current changed?  ──► ledger adjustment (reference "manual")
//!      │                          so the audit log explains the new level
//!      │
//!      └── reserved changed? ──► counter write only
//!
//! available_stock is always recomputed; a caller never supplies it.
//! ```

use sqlx::SqlitePool;
use tracing::{debug, info};

use depot_core::ledger::{self, NegativeStockPolicy, TransactionKind};
use depot_core::validation::{validate_required_id, validate_stock_count};
use depot_core::{
    CoreError, Inventory, InventoryUpdate, LowStockItem, NewTransaction, REFERENCE_MANUAL,
};

use crate::error::{DbError, DbResult};
use crate::repository::ledger::{apply_transaction_in, fetch_levels, swap_levels};

/// Repository for inventory counters.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
    policy: NegativeStockPolicy,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool, policy: NegativeStockPolicy) -> Self {
        InventoryRepository { pool, policy }
    }

    /// Gets the inventory row of a product.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - the product has no inventory row
    pub async fn get(&self, product_id: &str) -> DbResult<Inventory> {
        self.find(product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Inventory", product_id))
    }

    pub async fn find(&self, product_id: &str) -> DbResult<Option<Inventory>> {
        let inventory = sqlx::query_as::<_, Inventory>(
            r#"
            SELECT id, product_id, current_stock, reserved_stock, available_stock, last_updated
            FROM inventory
            WHERE product_id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(inventory)
    }

    pub async fn list(&self, limit: u32, offset: u32) -> DbResult<Vec<Inventory>> {
        let rows = sqlx::query_as::<_, Inventory>(
            r#"
            SELECT i.id, i.product_id, i.current_stock, i.reserved_stock,
                   i.available_stock, i.last_updated
            FROM inventory i
            INNER JOIN products p ON p.id = i.product_id
            ORDER BY p.sku
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Corrects counters directly.
    ///
    /// A new `current_stock` goes through the ledger as an `adjustment`, so
    /// it is audited and checked against the negative stock policy. A new
    /// `reserved_stock` is written with the same compare-and-swap.
    pub async fn update_inventory(
        &self,
        user_id: &str,
        product_id: &str,
        update: &InventoryUpdate,
    ) -> DbResult<Inventory> {
        validate_required_id("user_id", user_id)?;
        if let Some(current) = update.current_stock {
            validate_stock_count("current_stock", current)?;
        }
        if let Some(reserved) = update.reserved_stock {
            validate_stock_count("reserved_stock", reserved)?;
        }

        debug!(product_id = %product_id, ?update, "Updating inventory");

        let mut tx = self.pool.begin().await?;
        let levels = fetch_levels(&mut tx, product_id).await?;

        if let Some(current) = update.current_stock.filter(|c| *c != levels.current) {
            let input = NewTransaction::new(product_id, TransactionKind::Adjustment, current)
                .with_reference(REFERENCE_MANUAL, product_id)
                .with_notes("manual inventory correction");
            apply_transaction_in(&mut tx, self.policy, user_id, &input).await?;
        }

        if let Some(reserved) = update.reserved_stock {
            let expected = fetch_levels(&mut tx, product_id).await?;
            let next = update
                .apply_to(expected)
                .ok_or_else(|| CoreError::StockOverflow {
                    product_id: product_id.to_string(),
                })?;
            if reserved != expected.reserved {
                self.policy.check(product_id, &next)?;
                swap_levels(&mut tx, product_id, expected, next).await?;
            }
        }

        let inventory = sqlx::query_as::<_, Inventory>(
            r#"
            SELECT id, product_id, current_stock, reserved_stock, available_stock, last_updated
            FROM inventory
            WHERE product_id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            product_id = %product_id,
            current_stock = inventory.current_stock,
            reserved_stock = inventory.reserved_stock,
            "Inventory corrected"
        );

        Ok(inventory)
    }

    /// Every product whose on-hand stock is at or below its minimum level,
    /// ordered by SKU.
    pub async fn low_stock_products(&self) -> DbResult<Vec<LowStockItem>> {
        let rows = sqlx::query_as::<_, LowStockItem>(
            r#"
            SELECT p.id AS product_id, p.sku, p.name,
                   p.min_stock_level, p.max_stock_level,
                   i.current_stock, i.reserved_stock, i.available_stock
            FROM products p
            INNER JOIN inventory i ON i.product_id = p.id
            WHERE i.current_stock <= p.min_stock_level
            ORDER BY p.sku
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug_assert!(rows
            .iter()
            .all(|row| ledger::is_low_stock(row.current_stock, row.min_stock_level)));
        debug!(count = rows.len(), "Low stock query");
        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
