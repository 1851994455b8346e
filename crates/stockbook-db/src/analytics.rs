//! # Dashboard Read Model
//!
//! Loads what the dashboard needs and hands it to the pure aggregations in
//! `stockbook_core::analytics`. Nothing here writes.
//!
//! ```text
//! products ─────┬──► stock_summary
//!               ├──► stock_valuation
//! categories ───┴──► category_distribution
//! invoices ─────┬──► invoice_stats
//! clients ──────┴──► client_stats
//! transactions ─────► daily_rollups (UTC days, zero-filled)
//! ```

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::client::SELECT_CLIENT;
use crate::repository::invoice::SELECT_INVOICE;
use crate::repository::ledger::LedgerRepository;
use crate::repository::product::SELECT_PRODUCT;
use stockbook_core::analytics::{
    category_distribution, client_stats, daily_rollups, invoice_stats, stock_summary,
    stock_valuation, CategoryShare, ClientStats, DailyRollup, InvoiceStats, StockSummary,
    StockValuation,
};
use stockbook_core::{
    Category, Client, Invoice, Product, TenantId, Transaction, DEFAULT_LOW_STOCK_THRESHOLD,
};

const DEFAULT_WINDOW_DAYS: u64 = 30;
const DEFAULT_TOP_N: usize = 5;
const RECENT_ACTIVITY: u32 = 10;

/// Dashboard parameters. Dates are inclusive UTC calendar days.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub low_threshold: i64,
    pub top_n: usize,
}

impl Default for DashboardQuery {
    /// The last 30 days, today included.
    fn default() -> Self {
        let to = Utc::now().date_naive();
        let from = to
            .checked_sub_days(Days::new(DEFAULT_WINDOW_DAYS - 1))
            .unwrap_or(to);

        DashboardQuery {
            from,
            to,
            low_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            top_n: DEFAULT_TOP_N,
        }
    }
}

/// Everything the dashboard page shows.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub stock: StockSummary,
    pub valuation: StockValuation,
    pub categories: Vec<CategoryShare>,
    pub invoices: InvoiceStats,
    pub clients: ClientStats,
    pub daily: Vec<DailyRollup>,
    pub recent_activity: Vec<Transaction>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AnalyticsReader {
    pool: SqlitePool,
}

impl AnalyticsReader {
    pub fn new(pool: SqlitePool) -> Self {
        AnalyticsReader { pool }
    }

    /// Builds the whole dashboard from one load of each table.
    pub async fn dashboard(&self, tenant: &TenantId, query: &DashboardQuery) -> DbResult<Dashboard> {
        debug!(tenant_id = %tenant, from = %query.from, to = %query.to, "Building dashboard");

        let products = self.active_products(tenant).await?;
        let categories = self.categories(tenant).await?;
        let invoices = self.invoices(tenant).await?;
        let clients = self.clients(tenant).await?;
        let daily = self.daily_rollups(tenant, query.from, query.to).await?;
        let recent_activity = LedgerRepository::new(self.pool.clone())
            .recent(tenant, RECENT_ACTIVITY)
            .await?;

        Ok(Dashboard {
            stock: stock_summary(&products, query.low_threshold),
            valuation: stock_valuation(&products),
            categories: category_distribution(&products, &categories, query.top_n),
            invoices: invoice_stats(&invoices),
            clients: client_stats(&clients, &invoices, query.top_n),
            daily,
            recent_activity,
            generated_at: Utc::now(),
        })
    }

    pub async fn stock_summary(&self, tenant: &TenantId, low_threshold: i64) -> DbResult<StockSummary> {
        let products = self.active_products(tenant).await?;
        Ok(stock_summary(&products, low_threshold))
    }

    pub async fn stock_valuation(&self, tenant: &TenantId) -> DbResult<StockValuation> {
        let products = self.active_products(tenant).await?;
        Ok(stock_valuation(&products))
    }

    pub async fn category_distribution(&self, tenant: &TenantId, top_n: usize) -> DbResult<Vec<CategoryShare>> {
        let products = self.active_products(tenant).await?;
        let categories = self.categories(tenant).await?;
        Ok(category_distribution(&products, &categories, top_n))
    }

    pub async fn invoice_stats(&self, tenant: &TenantId) -> DbResult<InvoiceStats> {
        let invoices = self.invoices(tenant).await?;
        Ok(invoice_stats(&invoices))
    }

    pub async fn client_stats(&self, tenant: &TenantId, top_n: usize) -> DbResult<ClientStats> {
        let clients = self.clients(tenant).await?;
        let invoices = self.invoices(tenant).await?;
        Ok(client_stats(&clients, &invoices, top_n))
    }

    /// Per-day sales, purchases and returns for `from..=to`.
    pub async fn daily_rollups(&self, tenant: &TenantId, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<DailyRollup>> {
        if from > to {
            return Ok(Vec::new());
        }

        let start = start_of_day(from);
        let end = to.succ_opt().map(start_of_day).unwrap_or(DateTime::<Utc>::MAX_UTC);
        let transactions = LedgerRepository::new(self.pool.clone())
            .list_between(tenant, start, end)
            .await?;

        Ok(daily_rollups(&transactions, from, to))
    }

    // -------------------------------------------------------------------------
    // Loaders
    // -------------------------------------------------------------------------

    async fn active_products(&self, tenant: &TenantId) -> DbResult<Vec<Product>> {
        let sql = format!("{SELECT_PRODUCT} WHERE tenant_id = ?1 AND is_active = 1");
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(tenant.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    async fn categories(&self, tenant: &TenantId) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, tenant_id, name, parent_id, created_at FROM categories WHERE tenant_id = ?1",
        )
        .bind(tenant.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn invoices(&self, tenant: &TenantId) -> DbResult<Vec<Invoice>> {
        let sql = format!("{SELECT_INVOICE} WHERE tenant_id = ?1");
        let invoices = sqlx::query_as::<_, Invoice>(&sql)
            .bind(tenant.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(invoices)
    }

    async fn clients(&self, tenant: &TenantId) -> DbResult<Vec<Client>> {
        let sql = format!("{SELECT_CLIENT} WHERE tenant_id = ?1");
        let clients = sqlx::query_as::<_, Client>(&sql)
            .bind(tenant.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(clients)
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{client, destination, product, setup};
    use stockbook_core::{
        DeductRequest, InvoiceLine, InvoiceStatus, NewCategory, NewInvoice, ReplenishRequest,
        StockLine, TransactionKind,
    };

    #[tokio::test]
    async fn test_stock_summary_buckets() {
        let (db, tenant) = setup().await;
        product(&db, &tenant, "Aspirin", 100, 100).await;
        product(&db, &tenant, "Gauze", 20, 100).await;
        product(&db, &tenant, "Iodine", 3, 100).await;
        product(&db, &tenant, "Syringe", 0, 100).await;

        let summary = db.analytics().stock_summary(&tenant, 20).await.unwrap();
        assert_eq!(summary.total_products, 4);
        assert_eq!(summary.in_stock, 1);
        assert_eq!(summary.low_stock, 2);
        assert_eq!(summary.out_of_stock, 1);
        assert_eq!(summary.critical.len(), 3);
    }

    #[tokio::test]
    async fn test_valuation_ignores_deleted_products() {
        let (db, tenant) = setup().await;
        product(&db, &tenant, "Aspirin", 10, 200).await;
        let gone = product(&db, &tenant, "Gauze", 10, 1000).await;
        db.products().soft_delete(&tenant, &gone.id).await.unwrap();

        let valuation = db.analytics().stock_valuation(&tenant).await.unwrap();
        assert_eq!(valuation.units, 10);
        assert_eq!(valuation.at_sale_price.cents(), 2000);
        assert_eq!(valuation.at_cost.cents(), 1000);
    }

    #[tokio::test]
    async fn test_category_distribution_includes_uncategorized() {
        let (db, tenant) = setup().await;
        let meds = db
            .categories()
            .create(&tenant, &NewCategory { name: "Medicines".into(), parent_id: None })
            .await
            .unwrap();
        let p = product(&db, &tenant, "Aspirin", 1, 100).await;
        product(&db, &tenant, "Gauze", 1, 100).await;
        product(&db, &tenant, "Tape", 1, 100).await;
        db.products()
            .update(
                &tenant,
                &p.id,
                &stockbook_core::ProductUpdate {
                    name: p.name.clone(),
                    unit: p.unit.clone(),
                    sale_price_cents: p.sale_price_cents,
                    purchase_price_cents: p.purchase_price_cents,
                    category_id: Some(meds.id.clone()),
                },
            )
            .await
            .unwrap();

        let shares = db.analytics().category_distribution(&tenant, 5).await.unwrap();
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].category_id, None);
        assert_eq!(shares[0].product_count, 2);
        assert_eq!(shares[1].name, "Medicines");
    }

    #[tokio::test]
    async fn test_dashboard_reflects_activity() {
        let (db, tenant) = setup().await;
        let c = client(&db, &tenant, "Clinic").await;
        let d = destination(&db, &tenant, "Ward A").await;
        let p = product(&db, &tenant, "Aspirin", 10, 500).await;

        let invoice = db
            .invoicing()
            .create_invoice(
                &tenant,
                &NewInvoice {
                    invoice_number: None,
                    client_id: c.id.clone(),
                    lines: vec![InvoiceLine::new(&p.id, 2)],
                    tax_rate_bps: 0,
                    tax_enabled: false,
                    status: InvoiceStatus::Paid,
                    destination_id: None,
                },
            )
            .await
            .unwrap();
        db.stock()
            .deduct_stock(
                &tenant,
                &DeductRequest {
                    items: vec![StockLine::new(&p.id, 1)],
                    destination_id: Some(d.id.clone()),
                    kind: TransactionKind::Return,
                    note: None,
                },
            )
            .await
            .unwrap();
        db.stock()
            .replenish_stock(
                &tenant,
                &ReplenishRequest {
                    product_id: p.id.clone(),
                    quantity: 4,
                    new_unit_cost_cents: Some(200),
                    note: None,
                },
            )
            .await
            .unwrap();

        let dashboard = db.analytics().dashboard(&tenant, &DashboardQuery::default()).await.unwrap();

        assert_eq!(dashboard.invoices.total, 1);
        assert_eq!(dashboard.invoices.revenue.cents(), invoice.total_cents);
        assert_eq!(dashboard.clients.with_invoices, 1);
        assert_eq!(dashboard.daily.len(), 30);
        assert_eq!(dashboard.recent_activity.len(), 4);

        let today = dashboard.daily.last().unwrap();
        assert_eq!(today.date, Utc::now().date_naive());
        assert_eq!(today.sales.cents(), 1000);
        assert_eq!(today.returns.cents(), 250);
        // Opening stock 10 × 250 plus the replenishment 4 × 200
        assert_eq!(today.purchases.cents(), 3300);
        assert_eq!(today.net.cents(), 1000 - 3300);
    }

    #[tokio::test]
    async fn test_inverted_range_is_empty() {
        let (db, tenant) = setup().await;
        let to = Utc::now().date_naive();
        let from = to.succ_opt().unwrap();
        assert!(db.analytics().daily_rollups(&tenant, from, to).await.unwrap().is_empty());
    }
}
