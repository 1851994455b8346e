//! # Category Repository
//!
//! Two-level product categories: a category with a `parent_id` is a
//! sub-category. Deleting a category un-files its products and children
//! (`ON DELETE SET NULL`).

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::DbResult;
use crate::pool::WriteGate;
use stockbook_core::validation::validate_new_category;
use stockbook_core::{Category, CoreError, NewCategory, TenantId};

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
    gate: WriteGate,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool, gate: WriteGate) -> Self {
        CategoryRepository { pool, gate }
    }

    pub async fn create(&self, tenant: &TenantId, new: &NewCategory) -> DbResult<Category> {
        validate_new_category(new)?;

        let _guard = self.gate.acquire().await;
        let mut tx = self.pool.begin().await?;

        if let Some(parent_id) = &new.parent_id {
            let parent: Option<String> =
                sqlx::query_scalar("SELECT id FROM categories WHERE id = ?1 AND tenant_id = ?2")
                    .bind(parent_id)
                    .bind(tenant.as_str())
                    .fetch_optional(&mut *tx)
                    .await?;
            if parent.is_none() {
                return Err(CoreError::CategoryNotFound(parent_id.clone()).into());
            }
        }

        let category = Category {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant.as_str().to_string(),
            name: new.name.trim().to_string(),
            parent_id: new.parent_id.clone(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO categories (id, tenant_id, name, parent_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&category.id)
        .bind(&category.tenant_id)
        .bind(&category.name)
        .bind(&category.parent_id)
        .bind(category.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(tenant_id = %tenant, category_id = %category.id, "Category created");
        Ok(category)
    }

    /// All categories, parents before their children.
    pub async fn list(&self, tenant: &TenantId) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, tenant_id, name, parent_id, created_at
            FROM categories
            WHERE tenant_id = ?1
            ORDER BY parent_id IS NOT NULL, name COLLATE NOCASE
            "#,
        )
        .bind(tenant.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    pub async fn delete(&self, tenant: &TenantId, id: &str) -> DbResult<()> {
        let _guard = self.gate.acquire().await;

        let result = sqlx::query("DELETE FROM categories WHERE id = ?1 AND tenant_id = ?2")
            .bind(id)
            .bind(tenant.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::CategoryNotFound(id.to_string()).into());
        }

        info!(tenant_id = %tenant, category_id = %id, "Category deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup;
    use stockbook_core::NewProduct;

    #[tokio::test]
    async fn test_subcategory_requires_existing_parent() {
        let (db, tenant) = setup().await;

        let parent = db
            .categories()
            .create(&tenant, &NewCategory { name: "Medicines".into(), parent_id: None })
            .await
            .unwrap();
        let child = db
            .categories()
            .create(
                &tenant,
                &NewCategory { name: "Analgesics".into(), parent_id: Some(parent.id.clone()) },
            )
            .await
            .unwrap();
        assert_eq!(child.parent_id.as_deref(), Some(parent.id.as_str()));

        let orphan = db
            .categories()
            .create(
                &tenant,
                &NewCategory { name: "Lost".into(), parent_id: Some(Uuid::new_v4().to_string()) },
            )
            .await;
        assert!(orphan.is_err());

        let names: Vec<_> = db
            .categories()
            .list(&tenant)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Medicines", "Analgesics"]);
    }

    #[tokio::test]
    async fn test_delete_unfiles_products() {
        let (db, tenant) = setup().await;
        let category = db
            .categories()
            .create(&tenant, &NewCategory { name: "Dressings".into(), parent_id: None })
            .await
            .unwrap();

        let product = db
            .products()
            .create(
                &tenant,
                &NewProduct {
                    name: "Gauze".into(),
                    unit: "roll".into(),
                    opening_quantity: 0,
                    sale_price_cents: 100,
                    purchase_price_cents: 50,
                    category_id: Some(category.id.clone()),
                    image_url: None,
                },
            )
            .await
            .unwrap();

        db.categories().delete(&tenant, &category.id).await.unwrap();

        let stored = db.products().require(&tenant, &product.id).await.unwrap();
        assert!(stored.category_id.is_none());
        assert!(db.categories().delete(&tenant, &category.id).await.is_err());
    }
}
