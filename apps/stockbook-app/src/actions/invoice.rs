//! # Invoice Actions
//!
//! Creating an invoice also takes its lines out of stock, in the same
//! database transaction. Totals are always computed server-side.

use tracing::info;

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::AppState;
use stockbook_core::invoice::InvoiceDocument;
use stockbook_core::{Invoice, InvoiceStatus, NewInvoice, Transaction};
use stockbook_db::InvoiceFilter;

/// Creates an invoice and deducts its lines from stock.
///
/// ## Arguments
/// * `req.invoice_number` - Leave empty to take the next `INV-000123`
/// * `req.lines` - Product, quantity and optional unit price override
/// * `req.tax_rate_bps` / `req.tax_enabled` - Tax applied once to the subtotal
///
/// ## Returns
/// * `INSUFFICIENT_STOCK` with every short product when stock cannot cover it
/// * `CONFLICT` when a caller-chosen number is already used
pub async fn create_invoice(state: &AppState, ctx: &RequestContext, req: NewInvoice) -> Result<Invoice, ApiError> {
    let invoice = state.db().invoicing().create_invoice(ctx.tenant(), &req).await?;
    info!(
        invoice_id = %invoice.id,
        invoice_number = %invoice.invoice_number,
        total = %state.config().format_currency(invoice.total_cents),
        "create_invoice action"
    );
    Ok(invoice)
}

/// Reserves a number for the form to display before submission.
pub async fn generate_invoice_number(state: &AppState, ctx: &RequestContext) -> Result<String, ApiError> {
    Ok(state.db().invoicing().generate_invoice_number(ctx.tenant()).await?)
}

pub async fn get_invoice(state: &AppState, ctx: &RequestContext, id: &str) -> Result<Invoice, ApiError> {
    Ok(state.db().invoices().require(ctx.tenant(), id).await?)
}

pub async fn list_invoices(
    state: &AppState,
    ctx: &RequestContext,
    filter: InvoiceFilter,
) -> Result<Vec<Invoice>, ApiError> {
    Ok(state.db().invoices().list(ctx.tenant(), &filter).await?)
}

/// SALE rows written for an invoice.
pub async fn invoice_movements(
    state: &AppState,
    ctx: &RequestContext,
    id: &str,
) -> Result<Vec<Transaction>, ApiError> {
    Ok(state.db().ledger().list_by_invoice(ctx.tenant(), id).await?)
}

pub async fn update_invoice_status(
    state: &AppState,
    ctx: &RequestContext,
    id: &str,
    status: InvoiceStatus,
) -> Result<Invoice, ApiError> {
    Ok(state.db().invoicing().update_invoice_status(ctx.tenant(), id, status).await?)
}

/// Deletes the invoice header. Stock is not given back.
pub async fn delete_invoice(state: &AppState, ctx: &RequestContext, id: &str) -> Result<(), ApiError> {
    state.db().invoicing().delete_invoice(ctx.tenant(), id).await?;
    Ok(())
}

/// Data for the PDF renderer.
pub async fn invoice_document(state: &AppState, ctx: &RequestContext, id: &str) -> Result<InvoiceDocument, ApiError> {
    Ok(state.db().invoicing().invoice_document(ctx.tenant(), id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::client::create_client;
    use crate::actions::product::{create_product, get_product};
    use crate::error::ErrorCode;
    use crate::test_support::signed_in;
    use stockbook_core::{InvoiceLine, NewClient, NewProduct};

    async fn fixture(state: &AppState, ctx: &RequestContext) -> (String, String) {
        let client = create_client(
            state,
            ctx,
            NewClient {
                name: "Harbour Clinic".into(),
                email: Some("accounts@harbour.example".into()),
                phone: None,
                address: "14 Quay Street".into(),
            },
        )
        .await
        .unwrap();
        let product = create_product(
            state,
            ctx,
            NewProduct {
                name: "Thermometer".into(),
                unit: "unit".into(),
                opening_quantity: 3,
                sale_price_cents: 1599,
                purchase_price_cents: 900,
                category_id: None,
                image_url: None,
            },
        )
        .await
        .unwrap();
        (client.id, product.id)
    }

    fn request(client_id: &str, product_id: &str, quantity: i64) -> NewInvoice {
        NewInvoice {
            invoice_number: None,
            client_id: client_id.to_string(),
            lines: vec![InvoiceLine::new(product_id, quantity)],
            tax_rate_bps: 2000,
            tax_enabled: true,
            status: InvoiceStatus::Unpaid,
            destination_id: None,
        }
    }

    #[tokio::test]
    async fn test_invoice_round_trip() {
        let (state, ctx) = signed_in().await;
        let (client_id, product_id) = fixture(&state, &ctx).await;

        let invoice = create_invoice(&state, &ctx, request(&client_id, &product_id, 2)).await.unwrap();
        assert_eq!(invoice.subtotal_cents, 3198);
        assert_eq!(invoice.tax_cents, 640);
        assert_eq!(invoice.total_cents, 3838);
        assert_eq!(get_product(&state, &ctx, &product_id).await.unwrap().quantity, 1);

        let unpaid = list_invoices(&state, &ctx, InvoiceFilter::status(InvoiceStatus::Unpaid))
            .await
            .unwrap();
        assert_eq!(unpaid.len(), 1);

        let paid = update_invoice_status(&state, &ctx, &invoice.id, InvoiceStatus::Paid).await.unwrap();
        assert_eq!(paid.status, InvoiceStatus::Paid);

        let err = update_invoice_status(&state, &ctx, &invoice.id, InvoiceStatus::Pending)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);

        let doc = invoice_document(&state, &ctx, &invoice.id).await.unwrap();
        assert_eq!(doc.lines[0].product_name, "Thermometer");
        assert_eq!(invoice_movements(&state, &ctx, &invoice.id).await.unwrap().len(), 1);

        delete_invoice(&state, &ctx, &invoice.id).await.unwrap();
        let err = get_invoice(&state, &ctx, &invoice.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_insufficient_stock_creates_nothing() {
        let (state, ctx) = signed_in().await;
        let (client_id, product_id) = fixture(&state, &ctx).await;

        let err = create_invoice(&state, &ctx, request(&client_id, &product_id, 4)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(list_invoices(&state, &ctx, InvoiceFilter::default()).await.unwrap().is_empty());
        assert_eq!(get_product(&state, &ctx, &product_id).await.unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn test_tenants_cannot_see_each_other() {
        let (state, ctx) = signed_in().await;
        let (client_id, product_id) = fixture(&state, &ctx).await;
        let invoice = create_invoice(&state, &ctx, request(&client_id, &product_id, 1)).await.unwrap();

        let intruder = RequestContext::resolve(&state, Some("other@shop.example")).await.unwrap();
        let err = get_invoice(&state, &intruder, &invoice.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = create_invoice(&state, &intruder, request(&client_id, &product_id, 1))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_generated_numbers_increase() {
        let (state, ctx) = signed_in().await;
        let first = generate_invoice_number(&state, &ctx).await.unwrap();
        let second = generate_invoice_number(&state, &ctx).await.unwrap();
        assert_eq!(first, "INV-000001");
        assert_eq!(second, "INV-000002");
    }
}
