//! Fixtures shared by the repository and service tests.

use stockbook_core::{
    Client, Destination, NewClient, NewDestination, NewProduct, Product, TenantId,
};

use crate::{Database, DbConfig};

/// Fresh in-memory database with one tenant.
pub async fn setup() -> (Database, TenantId) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let tenant = db
        .tenants()
        .resolve_or_create("owner@pharmacy.example")
        .await
        .unwrap();
    (db, tenant.tenant_id())
}

pub async fn product(db: &Database, tenant: &TenantId, name: &str, quantity: i64, price: i64) -> Product {
    db.products()
        .create(
            tenant,
            &NewProduct {
                name: name.to_string(),
                unit: "box".to_string(),
                opening_quantity: quantity,
                sale_price_cents: price,
                purchase_price_cents: price / 2,
                category_id: None,
                image_url: None,
            },
        )
        .await
        .unwrap()
}

pub async fn client(db: &Database, tenant: &TenantId, name: &str) -> Client {
    db.clients()
        .create(
            tenant,
            &NewClient {
                name: name.to_string(),
                email: None,
                phone: None,
                address: "12 Harbour Rd".to_string(),
            },
        )
        .await
        .unwrap()
}

pub async fn destination(db: &Database, tenant: &TenantId, name: &str) -> Destination {
    db.destinations()
        .create(
            tenant,
            &NewDestination {
                name: name.to_string(),
                description: None,
            },
        )
        .await
        .unwrap()
}
