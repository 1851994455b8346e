//! # Product Repository
//!
//! Product CRUD and search.
//!
//! ## Quantity Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create()          quantity := opening, + PURCHASE row (same tx)       │
//! │  update()          name, unit, prices, category   (NEVER quantity)     │
//! │  set_image_url()   object-storage URL                                  │
//! │  soft_delete()     is_active := 0, ledger rows keep pointing here      │
//! │                                                                         │
//! │  Every later quantity change goes through crate::service::stock        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::WriteGate;
use crate::repository::ledger::{self, LedgerEntry};
use stockbook_core::validation::{
    validate_image_url, validate_new_product, validate_product_update, validate_search_query,
};
use stockbook_core::{CoreError, NewProduct, Product, ProductUpdate, TenantId, TransactionKind};

pub(crate) const SELECT_PRODUCT: &str = r#"
    SELECT id, tenant_id, name, unit, quantity, sale_price_cents, purchase_price_cents,
           category_id, image_url, is_active, created_at, updated_at
    FROM products
"#;

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    gate: WriteGate,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool, gate: WriteGate) -> Self {
        ProductRepository { pool, gate }
    }

    /// Creates a product, recording any opening stock as a PURCHASE.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The stored product
    /// * `Err(DbError::Rejected)` - Invalid input or unknown category
    pub async fn create(&self, tenant: &TenantId, new: &NewProduct) -> DbResult<Product> {
        validate_new_product(new)?;

        let _guard = self.gate.acquire().await;
        let mut tx = self.pool.begin().await?;

        if let Some(category_id) = &new.category_id {
            ensure_category(&mut *tx, tenant, category_id).await?;
        }

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant.as_str().to_string(),
            name: new.name.trim().to_string(),
            unit: new.unit.trim().to_string(),
            quantity: new.opening_quantity,
            sale_price_cents: new.sale_price_cents,
            purchase_price_cents: new.purchase_price_cents,
            category_id: new.category_id.clone(),
            image_url: new.image_url.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, name, unit, quantity, sale_price_cents, purchase_price_cents,
                category_id, image_url, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.name)
        .bind(&product.unit)
        .bind(product.quantity)
        .bind(product.sale_price_cents)
        .bind(product.purchase_price_cents)
        .bind(&product.category_id)
        .bind(&product.image_url)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await?;

        if product.quantity > 0 {
            ledger::append(
                &mut *tx,
                tenant,
                LedgerEntry {
                    product_id: &product.id,
                    kind: TransactionKind::Purchase,
                    quantity: product.quantity,
                    unit_price: product.purchase_price(),
                    destination_id: None,
                    invoice_id: None,
                    note: Some("Opening stock"),
                },
            )
            .await?;
        }

        tx.commit().await?;

        info!(
            tenant_id = %tenant,
            product_id = %product.id,
            opening_quantity = product.quantity,
            "Product created"
        );
        Ok(product)
    }

    /// Gets a product by ID, including soft-deleted ones.
    pub async fn get(&self, tenant: &TenantId, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("{SELECT_PRODUCT} WHERE id = ?1 AND tenant_id = ?2");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(tenant.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Gets an active product or fails with `ProductNotFound`.
    pub async fn require(&self, tenant: &TenantId, id: &str) -> DbResult<Product> {
        match self.get(tenant, id).await? {
            Some(p) if p.is_active => Ok(p),
            _ => Err(CoreError::ProductNotFound(id.to_string()).into()),
        }
    }

    /// Lists active products by name.
    pub async fn list(&self, tenant: &TenantId) -> DbResult<Vec<Product>> {
        let sql = format!("{SELECT_PRODUCT} WHERE tenant_id = ?1 AND is_active = 1 ORDER BY name COLLATE NOCASE");
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(tenant.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    /// Case-insensitive substring search on active product names.
    ///
    /// An empty query returns the first `limit` products by name.
    pub async fn search(&self, tenant: &TenantId, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query)?;
        debug!(query = %query, limit = limit, "Searching products");

        let pattern = format!("%{}%", escape_like(&query));
        let sql = format!(
            "{SELECT_PRODUCT} WHERE tenant_id = ?1 AND is_active = 1 \
             AND name LIKE ?2 ESCAPE '\\' \
             ORDER BY name COLLATE NOCASE LIMIT ?3"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(tenant.as_str())
            .bind(pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    /// Updates descriptive fields and prices. Quantity is untouched.
    pub async fn update(&self, tenant: &TenantId, id: &str, update: &ProductUpdate) -> DbResult<Product> {
        validate_product_update(update)?;

        let _guard = self.gate.acquire().await;
        let mut tx = self.pool.begin().await?;

        if let Some(category_id) = &update.category_id {
            ensure_category(&mut *tx, tenant, category_id).await?;
        }

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?3, unit = ?4, sale_price_cents = ?5, purchase_price_cents = ?6,
                category_id = ?7, updated_at = ?8
            WHERE id = ?1 AND tenant_id = ?2 AND is_active = 1
            "#,
        )
        .bind(id)
        .bind(tenant.as_str())
        .bind(update.name.trim())
        .bind(update.unit.trim())
        .bind(update.sale_price_cents)
        .bind(update.purchase_price_cents)
        .bind(&update.category_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        tx.commit().await?;
        drop(_guard);

        info!(tenant_id = %tenant, product_id = %id, "Product updated");
        self.require(tenant, id).await
    }

    /// Sets or clears the product image URL.
    pub async fn set_image_url(&self, tenant: &TenantId, id: &str, url: Option<&str>) -> DbResult<Product> {
        if let Some(url) = url {
            validate_image_url(url)?;
        }

        {
            let _guard = self.gate.acquire().await;
            let result = sqlx::query(
                "UPDATE products SET image_url = ?3, updated_at = ?4 \
                 WHERE id = ?1 AND tenant_id = ?2 AND is_active = 1",
            )
            .bind(id)
            .bind(tenant.as_str())
            .bind(url.map(str::trim))
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(CoreError::ProductNotFound(id.to_string()).into());
            }
        }

        self.require(tenant, id).await
    }

    /// Soft-deletes a product. Its ledger rows are kept.
    pub async fn soft_delete(&self, tenant: &TenantId, id: &str) -> DbResult<()> {
        let _guard = self.gate.acquire().await;

        let result = sqlx::query(
            "UPDATE products SET is_active = 0, updated_at = ?3 \
             WHERE id = ?1 AND tenant_id = ?2 AND is_active = 1",
        )
        .bind(id)
        .bind(tenant.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        info!(tenant_id = %tenant, product_id = %id, "Product deactivated");
        Ok(())
    }

    /// Counts active products.
    pub async fn count(&self, tenant: &TenantId) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE tenant_id = ?1 AND is_active = 1")
                .bind(tenant.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Reads the given products inside the caller's transaction.
///
/// Missing ids are simply absent from the map; the stock planner reports them.
pub(crate) async fn load_snapshot(
    conn: &mut SqliteConnection,
    tenant: &TenantId,
    ids: &[&str],
) -> DbResult<HashMap<String, Product>> {
    let sql = format!("{SELECT_PRODUCT} WHERE id = ?1 AND tenant_id = ?2");
    let mut products = HashMap::new();

    for &id in ids {
        if products.contains_key(id) {
            continue;
        }
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(tenant.as_str())
            .fetch_optional(&mut *conn)
            .await?;
        if let Some(product) = product {
            products.insert(product.id.clone(), product);
        }
    }

    Ok(products)
}

/// `quantity -= amount`, only if enough stock remains.
///
/// Returns `false` when the guard refused the update.
pub(crate) async fn decrement_quantity(
    conn: &mut SqliteConnection,
    tenant: &TenantId,
    product_id: &str,
    amount: i64,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE products SET quantity = quantity - ?3, updated_at = ?4
        WHERE id = ?1 AND tenant_id = ?2 AND is_active = 1 AND quantity >= ?3
        "#,
    )
    .bind(product_id)
    .bind(tenant.as_str())
    .bind(amount)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// `quantity += amount`, optionally setting a new purchase price.
pub(crate) async fn increment_quantity(
    conn: &mut SqliteConnection,
    tenant: &TenantId,
    product_id: &str,
    amount: i64,
    new_purchase_price_cents: Option<i64>,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        UPDATE products SET
            quantity = quantity + ?3,
            purchase_price_cents = COALESCE(?4, purchase_price_cents),
            updated_at = ?5
        WHERE id = ?1 AND tenant_id = ?2 AND is_active = 1
        "#,
    )
    .bind(product_id)
    .bind(tenant.as_str())
    .bind(amount)
    .bind(new_purchase_price_cents)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

async fn ensure_category(conn: &mut SqliteConnection, tenant: &TenantId, category_id: &str) -> DbResult<()> {
    let exists: Option<String> =
        sqlx::query_scalar("SELECT id FROM categories WHERE id = ?1 AND tenant_id = ?2")
            .bind(category_id)
            .bind(tenant.as_str())
            .fetch_optional(&mut *conn)
            .await?;

    match exists {
        Some(_) => Ok(()),
        None => Err(DbError::Rejected(CoreError::CategoryNotFound(category_id.to_string()))),
    }
}

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
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
