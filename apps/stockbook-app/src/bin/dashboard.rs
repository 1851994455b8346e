//! # Dashboard CLI
//!
//! Prints one tenant's dashboard as JSON, using the same configuration,
//! logging and actions as the web back-end.
//!
//! ## Usage
//! ```bash
//! # Last 30 days for an owner
//! cargo run -p stockbook-app --bin stockbook-dashboard -- --email owner@demo.example
//!
//! # Custom window, another database
//! STOCKBOOK_DATABASE_PATH=./stockbook_dev.db \
//!   cargo run -p stockbook-app --bin stockbook-dashboard -- -e owner@demo.example --days 7
//! ```

use anyhow::{bail, Context};
use chrono::{Days, Utc};
use std::env;
use tracing::info;

use stockbook_app::actions::analytics::dashboard;
use stockbook_app::telemetry::init_tracing;
use stockbook_app::{AppConfig, AppState, RequestContext};
use stockbook_db::DashboardQuery;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut email: Option<String> = None;
    let mut days: u64 = 30;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--email" | "-e" => {
                email = args.get(i + 1).cloned();
                i += 1;
            }
            "--days" | "-d" => {
                let value = args.get(i + 1).context("--days needs a value")?;
                days = value.parse().with_context(|| format!("invalid --days: {}", value))?;
                i += 1;
            }
            "--help" | "-h" => {
                println!("Usage: stockbook-dashboard --email <EMAIL> [--days <N>]");
                return Ok(());
            }
            other => bail!("unknown argument: {}", other),
        }
        i += 1;
    }

    if days == 0 {
        bail!("--days must be at least 1");
    }

    let config = AppConfig::load().context("loading configuration")?;
    let state = AppState::init(config).await.context("opening database")?;

    let ctx = RequestContext::resolve(&state, email.as_deref())
        .await
        .context("resolving tenant (pass --email)")?;
    info!(tenant = %ctx.tenant_name, days, "Building dashboard");

    let to = Utc::now().date_naive();
    let query = DashboardQuery {
        from: to.checked_sub_days(Days::new(days - 1)).unwrap_or(to),
        to,
        low_threshold: state.config().low_stock_threshold,
        ..DashboardQuery::default()
    };

    let board = dashboard(&state, &ctx, Some(query)).await?;
    println!("{}", serde_json::to_string_pretty(&board)?);

    state.db().close().await;
    Ok(())
}
