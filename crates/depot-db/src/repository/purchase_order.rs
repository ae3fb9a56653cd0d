//! # Purchase Order Repository
//!
//! Supplier orders. Creating one has no stock effect; stock arrives when the
//! PO is received.
//!
//! ## Receiving
//! ```text
//! receive(user, po)            update(user, po, { status: delivered })
//!      │                                │ (only from shipped)
//!      └──────────────┬─────────────────┘
//!                     ▼
//!     one SQL transaction:
//!       for each line ──► ledger purchase (reference purchase_order/po id)
//!       status ──► delivered
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use depot_core::ledger::{NegativeStockPolicy, TransactionKind};
use depot_core::numbering::{generate_document_number, DocumentKind};
use depot_core::order::plan_status_change;
use depot_core::validation::{validate_new_purchase_order, validate_required_id};
use depot_core::{
    CoreError, InventoryTransaction, NewPurchaseOrder, NewTransaction, OrderStatus,
    PurchaseOrder, PurchaseOrderDetail, PurchaseOrderItem, PurchaseOrderUpdate,
    REFERENCE_PURCHASE_ORDER,
};

use crate::error::{DbError, DbResult};
use crate::repository::ledger::apply_transaction_in;
use crate::repository::MAX_NUMBER_ATTEMPTS;

const PO_COLUMNS: &str = r#"
    id, po_number, supplier_id, user_id, status, total_cents,
    expected_delivery, notes, created_at, updated_at
"#;

/// Repository for purchase orders.
#[derive(Debug, Clone)]
pub struct PurchaseOrderRepository {
    pool: SqlitePool,
    policy: NegativeStockPolicy,
}

impl PurchaseOrderRepository {
    pub fn new(pool: SqlitePool, policy: NegativeStockPolicy) -> Self {
        PurchaseOrderRepository { pool, policy }
    }

    /// Creates a pending purchase order with its lines.
    pub async fn create(
        &self,
        user_id: &str,
        input: &NewPurchaseOrder,
    ) -> DbResult<PurchaseOrderDetail> {
        validate_required_id("user_id", user_id)?;
        validate_new_purchase_order(input)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let mut purchase_order = PurchaseOrder {
            id: Uuid::new_v4().to_string(),
            po_number: String::new(),
            supplier_id: input.supplier_id.clone(),
            user_id: user_id.to_string(),
            status: OrderStatus::Pending,
            total_cents: input.total()?.cents(),
            expected_delivery: input.expected_delivery,
            notes: input.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        purchase_order.po_number = insert_po_row(&mut tx, &purchase_order).await?;

        let mut items = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let item = PurchaseOrderItem {
                id: Uuid::new_v4().to_string(),
                purchase_order_id: purchase_order.id.clone(),
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                unit_cost_cents: line.unit_cost_cents,
                total_cost_cents: line.line_total()?.cents(),
            };

            sqlx::query(
                r#"
                INSERT INTO purchase_order_items (
                    id, purchase_order_id, product_id, quantity, unit_cost_cents, total_cost_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&item.id)
            .bind(&item.purchase_order_id)
            .bind(&item.product_id)
            .bind(item.quantity)
            .bind(item.unit_cost_cents)
            .bind(item.total_cost_cents)
            .execute(&mut *tx)
            .await?;

            items.push(item);
        }

        tx.commit().await?;

        info!(
            po_id = %purchase_order.id,
            po_number = %purchase_order.po_number,
            supplier_id = %purchase_order.supplier_id,
            items = items.len(),
            "Purchase order created"
        );

        Ok(PurchaseOrderDetail {
            purchase_order,
            items,
        })
    }

    pub async fn get(&self, id: &str) -> DbResult<PurchaseOrder> {
        let mut conn = self.pool.acquire().await?;
        fetch_po(&mut conn, id).await
    }

    pub async fn get_detail(&self, id: &str) -> DbResult<PurchaseOrderDetail> {
        let mut conn = self.pool.acquire().await?;
        let purchase_order = fetch_po(&mut conn, id).await?;
        let items = fetch_items(&mut conn, id).await?;
        Ok(PurchaseOrderDetail {
            purchase_order,
            items,
        })
    }

    /// Lists purchase orders newest first, optionally for one supplier.
    pub async fn list(
        &self,
        supplier_id: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> DbResult<Vec<PurchaseOrder>> {
        let rows = sqlx::query_as::<_, PurchaseOrder>(&format!(
            r#"
            SELECT {PO_COLUMNS}
            FROM purchase_orders
            WHERE (?1 IS NULL OR supplier_id = ?1)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?2 OFFSET ?3
            "#
        ))
        .bind(supplier_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Changes status, expected delivery and/or notes.
    ///
    /// Moving to `delivered` receives the goods in the same transaction.
    pub async fn update(
        &self,
        user_id: &str,
        id: &str,
        update: &PurchaseOrderUpdate,
    ) -> DbResult<PurchaseOrder> {
        validate_required_id("user_id", user_id)?;
        debug!(id = %id, ?update, "Updating purchase order");

        let mut tx = self.pool.begin().await?;
        let mut purchase_order = fetch_po(&mut tx, id).await?;

        if let Some(status) = update.status {
            let change = plan_status_change("PurchaseOrder", id, purchase_order.status, status)?;

            if !change.is_noop() && status == OrderStatus::Delivered {
                receive_items(&mut tx, self.policy, user_id, id).await?;
            }
            purchase_order.status = status;
        }

        if let Some(expected) = update.expected_delivery {
            purchase_order.expected_delivery = Some(expected);
        }
        if let Some(notes) = &update.notes {
            purchase_order.notes = Some(notes.clone());
        }

        purchase_order.updated_at = Utc::now();
        write_header(&mut tx, &purchase_order).await?;

        tx.commit().await?;
        Ok(purchase_order)
    }

    /// Receives every line into stock and marks the PO delivered.
    ///
    /// Works from any non-terminal status.
    ///
    /// ## Returns
    /// * `Ok(Vec<InventoryTransaction>)` - one `purchase` per line
    /// * `Err(DbError::Domain(InvalidStatusTransition))` - already delivered or cancelled
    /// * `Err(DbError::NotFound)` - PO missing, or a line's product has no inventory row
    pub async fn receive(&self, user_id: &str, id: &str) -> DbResult<Vec<InventoryTransaction>> {
        validate_required_id("user_id", user_id)?;

        let mut tx = self.pool.begin().await?;
        let mut purchase_order = fetch_po(&mut tx, id).await?;

        if purchase_order.status.is_terminal() {
            return Err(CoreError::InvalidStatusTransition {
                entity: "PurchaseOrder".to_string(),
                id: id.to_string(),
                from: purchase_order.status.to_string(),
                to: OrderStatus::Delivered.to_string(),
            }
            .into());
        }

        let records = receive_items(&mut tx, self.policy, user_id, id).await?;

        purchase_order.status = OrderStatus::Delivered;
        purchase_order.updated_at = Utc::now();
        write_header(&mut tx, &purchase_order).await?;

        tx.commit().await?;

        info!(
            po_id = %id,
            po_number = %purchase_order.po_number,
            lines = records.len(),
            "Purchase order received"
        );

        Ok(records)
    }

    /// Deletes a purchase order and its lines. Received stock stays.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        fetch_po(&mut tx, id).await?;

        sqlx::query("DELETE FROM purchase_order_items WHERE purchase_order_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM purchase_orders WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(po_id = %id, "Purchase order deleted");
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

async fn insert_po_row(conn: &mut SqliteConnection, po: &PurchaseOrder) -> DbResult<String> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let number = generate_document_number(DocumentKind::PurchaseOrder);

        let result = sqlx::query(
            r#"
            INSERT INTO purchase_orders (
                id, po_number, supplier_id, user_id, status, total_cents,
                expected_delivery, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&po.id)
        .bind(&number)
        .bind(&po.supplier_id)
        .bind(&po.user_id)
        .bind(po.status)
        .bind(po.total_cents)
        .bind(po.expected_delivery)
        .bind(&po.notes)
        .bind(po.created_at)
        .bind(po.updated_at)
        .execute(&mut *conn)
        .await;

        match result.map_err(DbError::from) {
            Ok(_) => return Ok(number),
            Err(err) if err.is_unique_violation_on("po_number") => {
                if attempt >= MAX_NUMBER_ATTEMPTS {
                    return Err(DbError::duplicate("po_number", number));
                }
                warn!(po_number = %number, attempt, "PO number collision, regenerating");
            }
            Err(err) => return Err(err),
        }
    }
}

async fn write_header(conn: &mut SqliteConnection, po: &PurchaseOrder) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE purchase_orders SET
            status = ?2,
            expected_delivery = ?3,
            notes = ?4,
            updated_at = ?5
        WHERE id = ?1
        "#,
    )
    .bind(&po.id)
    .bind(po.status)
    .bind(po.expected_delivery)
    .bind(&po.notes)
    .bind(po.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn fetch_po(conn: &mut SqliteConnection, id: &str) -> DbResult<PurchaseOrder> {
    sqlx::query_as::<_, PurchaseOrder>(&format!(
        "SELECT {PO_COLUMNS} FROM purchase_orders WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("PurchaseOrder", id))
}

async fn fetch_items(
    conn: &mut SqliteConnection,
    purchase_order_id: &str,
) -> DbResult<Vec<PurchaseOrderItem>> {
    let items = sqlx::query_as::<_, PurchaseOrderItem>(
        r#"
        SELECT id, purchase_order_id, product_id, quantity, unit_cost_cents, total_cost_cents
        FROM purchase_order_items
        WHERE purchase_order_id = ?1
        ORDER BY rowid
        "#,
    )
    .bind(purchase_order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

async fn receive_items(
    conn: &mut SqliteConnection,
    policy: NegativeStockPolicy,
    user_id: &str,
    purchase_order_id: &str,
) -> DbResult<Vec<InventoryTransaction>> {
    let items = fetch_items(conn, purchase_order_id).await?;

    let mut records = Vec::with_capacity(items.len());
    for item in &items {
        let input = NewTransaction::new(&item.product_id, TransactionKind::Purchase, item.quantity)
            .with_reference(REFERENCE_PURCHASE_ORDER, purchase_order_id);
        records.push(apply_transaction_in(conn, policy, user_id, &input).await?);
    }

    Ok(records)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{setup, stocked_product};
    use depot_core::numbering::is_valid_document_number;
    use depot_core::{ErrorKind, NewPurchaseOrderItem};

    fn po_for(items: Vec<NewPurchaseOrderItem>) -> NewPurchaseOrder {
        NewPurchaseOrder {
            supplier_id: "supplier-1".to_string(),
            expected_delivery: None,
            notes: None,
            items,
        }
    }

    #[tokio::test]
    async fn test_create_has_no_stock_effect() {
        let db = setup().await;
        let product = stocked_product(&db, "PO-P1", 4).await;

        let detail = db
            .purchase_orders()
            .create(
                "user-1",
                &po_for(vec![NewPurchaseOrderItem::new(&product.id, 10, 450)]),
            )
            .await
            .unwrap();

        assert!(is_valid_document_number(
            DocumentKind::PurchaseOrder,
            &detail.purchase_order.po_number
        ));
        assert_eq!(detail.purchase_order.total_cents, 4500);
        assert_eq!(detail.items[0].total_cost_cents, 4500);
        assert_eq!(db.inventory().get(&product.id).await.unwrap().current_stock, 4);
    }

    #[tokio::test]
    async fn test_create_rejects_unrepresentable_totals() {
        let db = setup().await;
        let product = stocked_product(&db, "PO-P9", 4).await;

        let err = db
            .purchase_orders()
            .create(
                "user-1",
                &po_for(vec![NewPurchaseOrderItem::new(&product.id, 2, i64::MAX / 2 + 1)]),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(db.purchase_orders().list(None, 10, 0).await.unwrap().is_empty());

        let lines = (0..depot_core::MAX_ORDER_ITEMS)
            .map(|_| {
                NewPurchaseOrderItem::new(
                    &product.id,
                    depot_core::MAX_LINE_QUANTITY,
                    depot_core::MAX_PRICE_CENTS,
                )
            })
            .collect();
        let detail = db
            .purchase_orders()
            .create("user-1", &po_for(lines))
            .await
            .unwrap();
        assert_eq!(
            detail.purchase_order.total_cents,
            depot_core::MAX_ORDER_ITEMS as i64
                * depot_core::MAX_LINE_QUANTITY
                * depot_core::MAX_PRICE_CENTS
        );
    }

    #[tokio::test]
    async fn test_receive_adds_stock_and_logs() {
        let db = setup().await;
        let first = stocked_product(&db, "PO-P2", 4).await;
        let second = stocked_product(&db, "PO-P3", 0).await;

        let id = db
            .purchase_orders()
            .create(
                "user-1",
                &po_for(vec![
                    NewPurchaseOrderItem::new(&first.id, 10, 450),
                    NewPurchaseOrderItem::new(&second.id, 3, 200),
                ]),
            )
            .await
            .unwrap()
            .purchase_order
            .id;

        let records = db.purchase_orders().receive("user-2", &id).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records
            .iter()
            .all(|r| r.transaction_type == TransactionKind::Purchase));

        assert_eq!(db.inventory().get(&first.id).await.unwrap().current_stock, 14);
        assert_eq!(db.inventory().get(&second.id).await.unwrap().available_stock, 3);

        let logged = db
            .ledger()
            .transactions_for_reference(REFERENCE_PURCHASE_ORDER, &id)
            .await
            .unwrap();
        assert_eq!(logged.len(), 2);

        let po = db.purchase_orders().get(&id).await.unwrap();
        assert_eq!(po.status, OrderStatus::Delivered);

        let again = db.purchase_orders().receive("user-2", &id).await.unwrap_err();
        assert_eq!(again.kind(), ErrorKind::Validation);
        assert_eq!(db.inventory().get(&first.id).await.unwrap().current_stock, 14);
    }

    #[tokio::test]
    async fn test_receive_cancelled_rejected() {
        let db = setup().await;
        let product = stocked_product(&db, "PO-P4", 0).await;
        let id = db
            .purchase_orders()
            .create("user-1", &po_for(vec![NewPurchaseOrderItem::new(&product.id, 1, 1)]))
            .await
            .unwrap()
            .purchase_order
            .id;

        db.purchase_orders()
            .update(
                "user-1",
                &id,
                &PurchaseOrderUpdate {
                    status: Some(OrderStatus::Cancelled),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = db.purchase_orders().receive("user-1", &id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(db.ledger().count_transactions(&product.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_to_delivered_receives() {
        let db = setup().await;
        let product = stocked_product(&db, "PO-P5", 1).await;
        let id = db
            .purchase_orders()
            .create("user-1", &po_for(vec![NewPurchaseOrderItem::new(&product.id, 6, 1)]))
            .await
            .unwrap()
            .purchase_order
            .id;

        for status in [OrderStatus::Confirmed, OrderStatus::Shipped, OrderStatus::Delivered] {
            db.purchase_orders()
                .update(
                    "user-1",
                    &id,
                    &PurchaseOrderUpdate {
                        status: Some(status),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }

        assert_eq!(db.inventory().get(&product.id).await.unwrap().current_stock, 7);
    }

    #[tokio::test]
    async fn test_receive_rolls_back_on_missing_inventory() {
        let db = setup().await;
        let kept = stocked_product(&db, "PO-P6", 2).await;
        let gone = stocked_product(&db, "PO-P7", 2).await;
        let id = db
            .purchase_orders()
            .create(
                "user-1",
                &po_for(vec![
                    NewPurchaseOrderItem::new(&kept.id, 5, 1),
                    NewPurchaseOrderItem::new(&gone.id, 5, 1),
                ]),
            )
            .await
            .unwrap()
            .purchase_order
            .id;

        sqlx::query("DELETE FROM inventory WHERE product_id = ?1")
            .bind(&gone.id)
            .execute(db.pool())
            .await
            .unwrap();

        let err = db.purchase_orders().receive("user-1", &id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(db.inventory().get(&kept.id).await.unwrap().current_stock, 2);
        assert_eq!(
            db.purchase_orders().get(&id).await.unwrap().status,
            OrderStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_list_delete_and_validation() {
        let db = setup().await;
        let product = stocked_product(&db, "PO-P8", 0).await;

        for supplier in ["s-1", "s-2"] {
            db.purchase_orders()
                .create(
                    "user-1",
                    &NewPurchaseOrder {
                        supplier_id: supplier.to_string(),
                        expected_delivery: Some(Utc::now()),
                        notes: Some("net 30".to_string()),
                        items: vec![NewPurchaseOrderItem::new(&product.id, 1, 1)],
                    },
                )
                .await
                .unwrap();
        }

        let s1 = db.purchase_orders().list(Some("s-1"), 10, 0).await.unwrap();
        assert_eq!(s1.len(), 1);
        assert_eq!(db.purchase_orders().list(None, 10, 0).await.unwrap().len(), 2);

        db.purchase_orders().delete(&s1[0].id).await.unwrap();
        assert_eq!(
            db.purchase_orders().get_detail(&s1[0].id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            db.purchase_orders().delete(&s1[0].id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );

        let empty = db.purchase_orders().create("user-1", &po_for(vec![])).await;
        assert_eq!(empty.unwrap_err().kind(), ErrorKind::Validation);
    }
}
