//! # Dashboard Actions

use std::time::Instant;
use tracing::debug;

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::AppState;
use stockbook_core::analytics::StockSummary;
use stockbook_db::{Dashboard, DashboardQuery};

/// Everything the dashboard page shows.
///
/// Without a query the last 30 days are shown, with the configured
/// low-stock threshold.
pub async fn dashboard(
    state: &AppState,
    ctx: &RequestContext,
    query: Option<DashboardQuery>,
) -> Result<Dashboard, ApiError> {
    let start = Instant::now();
    let query = query.unwrap_or_else(|| DashboardQuery {
        low_threshold: state.config().low_stock_threshold,
        ..DashboardQuery::default()
    });

    if query.from > query.to {
        return Err(ApiError::validation("from must not be after to"));
    }

    let dashboard = state.db().analytics().dashboard(ctx.tenant(), &query).await?;

    debug!(
        tenant_id = %ctx.tenant(),
        days = dashboard.daily.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "dashboard action"
    );
    Ok(dashboard)
}

/// Stock level buckets for the low-stock widget.
pub async fn stock_summary(state: &AppState, ctx: &RequestContext) -> Result<StockSummary, ApiError> {
    let threshold = state.config().low_stock_threshold;
    Ok(state.db().analytics().stock_summary(ctx.tenant(), threshold).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::product::create_product;
    use crate::error::ErrorCode;
    use crate::test_support::signed_in;
    use chrono::Utc;
    use stockbook_core::NewProduct;

    #[tokio::test]
    async fn test_dashboard_uses_configured_threshold() {
        let (state, ctx) = signed_in().await;
        create_product(
            &state,
            &ctx,
            NewProduct {
                name: "Lip Balm".into(),
                unit: "unit".into(),
                opening_quantity: 15,
                sale_price_cents: 199,
                purchase_price_cents: 80,
                category_id: None,
                image_url: None,
            },
        )
        .await
        .unwrap();

        let board = dashboard(&state, &ctx, None).await.unwrap();
        assert_eq!(board.stock.low_stock, 1);
        assert_eq!(board.stock.low_threshold, 20);
        assert_eq!(board.daily.len(), 30);

        let summary = stock_summary(&state, &ctx).await.unwrap();
        assert_eq!(summary.total_products, 1);

        let json = serde_json::to_value(&board).unwrap();
        assert!(json.get("invoices").is_some());
    }

    #[tokio::test]
    async fn test_inverted_range_rejected() {
        let (state, ctx) = signed_in().await;
        let today = Utc::now().date_naive();
        let query = DashboardQuery {
            from: today.succ_opt().unwrap(),
            to: today,
            ..DashboardQuery::default()
        };

        let err = dashboard(&state, &ctx, Some(query)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
