//! # Product Actions
//!
//! Catalogue maintenance. Quantity is never edited here: stock only changes
//! through [`stock`](super::stock) and invoices.

use std::time::Instant;
use tracing::{debug, info};

use crate::actions::clamp_limit;
use crate::context::RequestContext;
use crate::error::ApiError;
use crate::AppState;
use stockbook_core::{Category, NewCategory, NewProduct, Product, ProductUpdate};

/// Creates a product, recording any opening stock as a PURCHASE.
pub async fn create_product(state: &AppState, ctx: &RequestContext, req: NewProduct) -> Result<Product, ApiError> {
    let product = state.db().products().create(ctx.tenant(), &req).await?;
    info!(product_id = %product.id, opening = req.opening_quantity, "create_product action");
    Ok(product)
}

pub async fn get_product(state: &AppState, ctx: &RequestContext, id: &str) -> Result<Product, ApiError> {
    Ok(state.db().products().require(ctx.tenant(), id).await?)
}

pub async fn list_products(state: &AppState, ctx: &RequestContext) -> Result<Vec<Product>, ApiError> {
    Ok(state.db().products().list(ctx.tenant()).await?)
}

/// Searches active products by name.
///
/// ## Arguments
/// * `query` - Substring of the name, case-insensitive; empty lists all
/// * `limit` - Maximum results (default: 20, max: 100)
pub async fn search_products(
    state: &AppState,
    ctx: &RequestContext,
    query: &str,
    limit: Option<u32>,
) -> Result<Vec<Product>, ApiError> {
    let start = Instant::now();
    let limit = clamp_limit(limit);

    let products = state.db().products().search(ctx.tenant(), query, limit).await?;

    debug!(
        query = %query.trim(),
        results = products.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "search_products action"
    );
    Ok(products)
}

pub async fn update_product(
    state: &AppState,
    ctx: &RequestContext,
    id: &str,
    update: ProductUpdate,
) -> Result<Product, ApiError> {
    Ok(state.db().products().update(ctx.tenant(), id, &update).await?)
}

/// Stores the URL of an image already uploaded to object storage, or
/// clears it with `None`.
pub async fn set_product_image(
    state: &AppState,
    ctx: &RequestContext,
    id: &str,
    image_url: Option<String>,
) -> Result<Product, ApiError> {
    let url = image_url.as_deref().map(str::trim).filter(|u| !u.is_empty());
    Ok(state.db().products().set_image_url(ctx.tenant(), id, url).await?)
}

/// Hides a product from the catalogue; its history stays in the ledger.
pub async fn delete_product(state: &AppState, ctx: &RequestContext, id: &str) -> Result<(), ApiError> {
    state.db().products().soft_delete(ctx.tenant(), id).await?;
    Ok(())
}

// =============================================================================
// Categories
// =============================================================================

pub async fn create_category(state: &AppState, ctx: &RequestContext, req: NewCategory) -> Result<Category, ApiError> {
    Ok(state.db().categories().create(ctx.tenant(), &req).await?)
}

pub async fn list_categories(state: &AppState, ctx: &RequestContext) -> Result<Vec<Category>, ApiError> {
    Ok(state.db().categories().list(ctx.tenant()).await?)
}

pub async fn delete_category(state: &AppState, ctx: &RequestContext, id: &str) -> Result<(), ApiError> {
    state.db().categories().delete(ctx.tenant(), id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support::signed_in;

    fn aspirin() -> NewProduct {
        NewProduct {
            name: "Aspirin".into(),
            unit: "box".into(),
            opening_quantity: 12,
            sale_price_cents: 450,
            purchase_price_cents: 300,
            category_id: None,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_product_lifecycle() {
        let (state, ctx) = signed_in().await;

        let created = create_product(&state, &ctx, aspirin()).await.unwrap();
        assert_eq!(created.quantity, 12);

        let found = search_products(&state, &ctx, "asp", None).await.unwrap();
        assert_eq!(found.len(), 1);

        let with_image = set_product_image(
            &state,
            &ctx,
            &created.id,
            Some("https://cdn.example/aspirin.png".into()),
        )
        .await
        .unwrap();
        assert!(with_image.image_url.is_some());

        let cleared = set_product_image(&state, &ctx, &created.id, Some("  ".into())).await.unwrap();
        assert!(cleared.image_url.is_none());

        delete_product(&state, &ctx, &created.id).await.unwrap();
        assert!(list_products(&state, &ctx).await.unwrap().is_empty());

        let err = get_product(&state, &ctx, &created.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_invalid_product_is_a_validation_error() {
        let (state, ctx) = signed_in().await;

        let mut req = aspirin();
        req.sale_price_cents = -1;
        let err = create_product(&state, &ctx, req).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_categories() {
        let (state, ctx) = signed_in().await;

        let parent = create_category(&state, &ctx, NewCategory { name: "Medicines".into(), parent_id: None })
            .await
            .unwrap();
        let mut req = aspirin();
        req.category_id = Some(parent.id.clone());
        create_product(&state, &ctx, req).await.unwrap();

        assert_eq!(list_categories(&state, &ctx).await.unwrap().len(), 1);
        delete_category(&state, &ctx, &parent.id).await.unwrap();
        assert!(list_categories(&state, &ctx).await.unwrap().is_empty());
    }
}
