//! # Repository Module
//!
//! Database repository implementations for Depot.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Layout                                    │
//! │                                                                         │
//! │  Database (pool.rs)                                                     │
//! │   ├── products()        → ProductRepository       catalog CRUD          │
//! │   ├── inventory()       → InventoryRepository     counters, low stock   │
//! │   ├── ledger()          → LedgerRepository        audited movements     │
//! │   ├── orders()          → OrderRepository         reserve / release     │
//! │   └── purchase_orders() → PurchaseOrderRepository receive into stock    │
//! │                                                                         │
//! │  Every counter write goes through ledger.rs:                            │
//! │                                                                         │
//! │   fetch_levels ──► depot_core::ledger::plan_* ──► swap_levels (CAS)     │
//! │                                                                         │
//! │  so orders, purchase orders and manual corrections share one rule set   │
//! │  and one concurrency check.                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod inventory;
pub mod ledger;
pub mod order;
pub mod product;
pub mod purchase_order;

/// How many times an order or PO number is regenerated after a collision.
pub(crate) const MAX_NUMBER_ATTEMPTS: usize = 5;

#[cfg(test)]
pub(crate) mod test_support {
    use depot_core::{NewProduct, NewTransaction, NegativeStockPolicy, Product, TransactionKind};

    use crate::{Database, DbConfig};

    pub(crate) async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub(crate) async fn setup_with_policy(policy: NegativeStockPolicy) -> Database {
        Database::new(DbConfig::in_memory().stock_policy(policy))
            .await
            .unwrap()
    }

    /// Creates a product and brings it to `stock` units with a purchase.
    pub(crate) async fn stocked_product(db: &Database, sku: &str, stock: i64) -> Product {
        let product = db
            .products()
            .create(&NewProduct::new(sku, format!("Product {sku}"), 9999, 4500))
            .await
            .unwrap();

        if stock > 0 {
            db.ledger()
                .apply_transaction(
                    "user-1",
                    &NewTransaction::new(&product.id, TransactionKind::Purchase, stock),
                )
                .await
                .unwrap();
        }

        product
    }
}
