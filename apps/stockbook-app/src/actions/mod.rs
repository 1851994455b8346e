//! # Server Actions
//!
//! One async function per dashboard form or page. Every action:
//! - takes the shared [`AppState`](crate::AppState) and the caller's
//!   [`RequestContext`](crate::RequestContext)
//! - scopes all data to `ctx.tenant()`
//! - returns `Result<T, ApiError>`, where `T` serialises straight to the UI
//!
//! ## Module Organization
//! - [`product`] - Products and categories
//! - [`stock`] - Stock exits, replenishment, movement history
//! - [`invoice`] - Invoices, numbering, status, printable document
//! - [`client`] - Customers that invoices are billed to
//! - [`destination`] - Where outgoing stock goes
//! - [`analytics`] - Dashboard aggregates

pub mod analytics;
pub mod client;
pub mod destination;
pub mod invoice;
pub mod product;
pub mod stock;

/// Default page size for searches.
pub const DEFAULT_LIMIT: u32 = 20;

/// Largest page size an action will return.
pub const MAX_LIMIT: u32 = 100;

pub(crate) fn clamp_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}
