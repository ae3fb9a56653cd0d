//! # Product Repository
//!
//! Database operations for the product catalog.
//!
//! ## Product ⇄ Inventory
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create(NewProduct)                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │   ├── INSERT products          duplicate SKU → UniqueViolation          │
//! │   └── INSERT inventory (0, 0, 0)                                        │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  delete(id)                                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │   ├── DELETE inventory                                                  │
//! │   └── DELETE products          still on an order → ForeignKeyViolation │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  The ledger history (inventory_transactions) is kept.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use depot_core::validation::{
    validate_new_product, validate_product_update, validate_search_query, validate_stock_levels,
};
use depot_core::{NewProduct, Product, ProductUpdate};

use crate::error::{DbError, DbResult};

const PRODUCT_COLUMNS: &str = r#"
    id, sku, name, description, price_cents, cost_cents,
    category_id, brand, model, status,
    min_stock_level, max_stock_level, created_at, updated_at
"#;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let product = repo.create(&NewProduct::new("WIDGET-1", "Widget", 999, 450)).await?;
/// let found = repo.get_by_sku("WIDGET-1").await?;
/// let results = repo.search("widg", 20, 0).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product together with its zero inventory row.
    ///
    /// ## Returns
    /// * `Ok(Product)` - the stored product
    /// * `Err(DbError::Domain(..))` - invalid SKU, name, price or levels
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn create(&self, input: &NewProduct) -> DbResult<Product> {
        validate_new_product(input)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            sku: input.sku.trim().to_string(),
            name: input.name.trim().to_string(),
            description: input.description.clone(),
            price_cents: input.price_cents,
            cost_cents: input.cost_cents,
            category_id: input.category_id.clone(),
            brand: input.brand.clone(),
            model: input.model.clone(),
            status: input.status,
            min_stock_level: input.min_stock_level,
            max_stock_level: input.max_stock_level,
            created_at: now,
            updated_at: now,
        };

        debug!(sku = %product.sku, "Inserting product");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, description, price_cents, cost_cents,
                category_id, brand, model, status,
                min_stock_level, max_stock_level, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(&product.category_id)
        .bind(&product.brand)
        .bind(&product.model)
        .bind(product.status)
        .bind(product.min_stock_level)
        .bind(product.max_stock_level)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| sku_conflict(e, &product.sku))?;

        sqlx::query(
            r#"
            INSERT INTO inventory (
                id, product_id, current_stock, reserved_stock, available_stock, last_updated
            ) VALUES (?1, ?2, 0, 0, 0, ?3)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&product.id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(id = %product.id, sku = %product.sku, "Product created");
        Ok(product)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1"
        ))
        .bind(sku.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists products ordered by name, optionally within one category.
    pub async fn list(
        &self,
        category_id: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE (?1 IS NULL OR category_id = ?1)
            ORDER BY name, sku
            LIMIT ?2 OFFSET ?3
            "#
        ))
        .bind(category_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Case-insensitive substring search over name, SKU and description.
    ///
    /// An empty term behaves like [`list`](Self::list) without a category.
    pub async fn search(&self, term: &str, limit: u32, offset: u32) -> DbResult<Vec<Product>> {
        let term = validate_search_query(term)?;

        debug!(term = %term, limit, "Searching products");

        if term.is_empty() {
            return self.list(None, limit, offset).await;
        }

        let pattern = format!("%{}%", escape_like(&term));

        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE name LIKE ?1 ESCAPE '\'
               OR sku LIKE ?1 ESCAPE '\'
               OR description LIKE ?1 ESCAPE '\'
            ORDER BY name, sku
            LIMIT ?2 OFFSET ?3
            "#
        ))
        .bind(pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Applies a partial update.
    ///
    /// ## Returns
    /// * `Ok(Product)` - the product after the update
    /// * `Err(DbError::NotFound)` - product doesn't exist
    /// * `Err(DbError::UniqueViolation)` - new SKU already taken
    pub async fn update(&self, id: &str, update: &ProductUpdate) -> DbResult<Product> {
        validate_product_update(update)?;

        debug!(id = %id, "Updating product");

        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| DbError::not_found("Product", id))?;

        if update.is_empty() {
            return Ok(current);
        }

        let mut next = update.apply_to(&current);
        validate_stock_levels(next.min_stock_level, next.max_stock_level)?;
        next.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE products SET
                sku = ?2,
                name = ?3,
                description = ?4,
                price_cents = ?5,
                cost_cents = ?6,
                category_id = ?7,
                brand = ?8,
                model = ?9,
                status = ?10,
                min_stock_level = ?11,
                max_stock_level = ?12,
                updated_at = ?13
            WHERE id = ?1
            "#,
        )
        .bind(&next.id)
        .bind(&next.sku)
        .bind(&next.name)
        .bind(&next.description)
        .bind(next.price_cents)
        .bind(next.cost_cents)
        .bind(&next.category_id)
        .bind(&next.brand)
        .bind(&next.model)
        .bind(next.status)
        .bind(next.min_stock_level)
        .bind(next.max_stock_level)
        .bind(next.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| sku_conflict(e, &next.sku))?;

        tx.commit().await?;

        Ok(next)
    }

    /// Deletes a product and its inventory row.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - product doesn't exist
    /// * `Err(DbError::ForeignKeyViolation)` - order or PO lines reference it
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM inventory WHERE product_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        tx.commit().await?;

        info!(id = %id, "Product deleted");
        Ok(())
    }

    /// Counts all products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Tags a SKU unique violation with the offending value.
fn sku_conflict(err: sqlx::Error, sku: &str) -> DbError {
    let err = DbError::from(err);
    if err.is_unique_violation_on("sku") {
        DbError::duplicate("sku", sku)
    } else {
        err
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{setup, stocked_product};
    use depot_core::{ErrorKind, NewOrder, NewOrderItem, ProductStatus};

    #[tokio::test]
    async fn test_create_and_fetch() {
        let db = setup().await;
        let created = db
            .products()
            .create(&NewProduct::new(" WIDGET-1 ", "Widget", 9999, 4500).with_category("tools"))
            .await
            .unwrap();

        assert_eq!(created.sku, "WIDGET-1");
        assert_eq!(created.min_stock_level, 0);
        assert_eq!(created.max_stock_level, 1000);

        let by_id = db.products().get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(by_id.sku, "WIDGET-1");
        assert_eq!(by_id.status, ProductStatus::Active);

        let by_sku = db.products().get_by_sku("WIDGET-1").await.unwrap().unwrap();
        assert_eq!(by_sku.id, created.id);
        assert_eq!(by_sku.category_id.as_deref(), Some("tools"));

        assert!(db.products().get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_sku() {
        let db = setup().await;
        db.products()
            .create(&NewProduct::new("DUP-1", "First", 100, 50))
            .await
            .unwrap();

        let err = db
            .products()
            .create(&NewProduct::new("DUP-1", "Second", 100, 50))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(matches!(err, DbError::UniqueViolation { ref value, .. } if value == "DUP-1"));
        assert_eq!(db.products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_product_rejected() {
        let db = setup().await;
        let err = db
            .products()
            .create(&NewProduct::new("BAD-1", "", 100, 50))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_and_search() {
        let db = setup().await;
        for (sku, name, category) in [
            ("BOLT-10", "Hex bolt 10mm", "fasteners"),
            ("NUT-10", "Hex nut 10mm", "fasteners"),
            ("SAW-1", "Hand saw", "tools"),
        ] {
            db.products()
                .create(&NewProduct::new(sku, name, 100, 50).with_category(category))
                .await
                .unwrap();
        }

        let fasteners = db.products().list(Some("fasteners"), 10, 0).await.unwrap();
        assert_eq!(fasteners.len(), 2);

        let page = db.products().list(None, 2, 2).await.unwrap();
        assert_eq!(page.len(), 1);

        let hex = db.products().search("hex", 10, 0).await.unwrap();
        assert_eq!(hex.len(), 2);

        let by_sku = db.products().search("saw-", 10, 0).await.unwrap();
        assert_eq!(by_sku.len(), 1);
        assert_eq!(by_sku[0].sku, "SAW-1");

        let wildcard = db.products().search("%", 10, 0).await.unwrap();
        assert!(wildcard.is_empty());

        let everything = db.products().search("  ", 10, 0).await.unwrap();
        assert_eq!(everything.len(), 3);
    }

    #[tokio::test]
    async fn test_update() {
        let db = setup().await;
        let product = db
            .products()
            .create(&NewProduct::new("UPD-1", "Old", 100, 50))
            .await
            .unwrap();

        let updated = db
            .products()
            .update(
                &product.id,
                &ProductUpdate {
                    name: Some("New".to_string()),
                    price_cents: Some(250),
                    status: Some(ProductStatus::Discontinued),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "New");
        assert_eq!(updated.price().cents(), 250);

        let stored = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ProductStatus::Discontinued);

        let err = db
            .products()
            .update(
                &product.id,
                &ProductUpdate {
                    min_stock_level: Some(5000),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = db
            .products()
            .update("missing", &ProductUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_removes_inventory() {
        let db = setup().await;
        let product = stocked_product(&db, "DEL-1", 5).await;

        db.products().delete(&product.id).await.unwrap();

        assert!(db.products().get_by_id(&product.id).await.unwrap().is_none());
        assert!(db.inventory().find(&product.id).await.unwrap().is_none());
        assert_eq!(db.ledger().count_transactions(&product.id).await.unwrap(), 1);

        let err = db.products().delete(&product.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete_referenced_product_conflicts() {
        let db = setup().await;
        let product = stocked_product(&db, "DEL-2", 5).await;
        db.orders()
            .create_order(
                "user-1",
                &NewOrder {
                    customer_id: "c-1".to_string(),
                    notes: None,
                    items: vec![NewOrderItem::new(&product.id, 1, 100)],
                },
            )
            .await
            .unwrap();

        let err = db.products().delete(&product.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(db.inventory().find(&product.id).await.unwrap().is_some());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("plain"), "plain");
    }
}
