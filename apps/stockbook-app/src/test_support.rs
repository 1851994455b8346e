//! Fixtures for action tests.

use stockbook_db::{Database, DbConfig};

use crate::{AppConfig, AppState, RequestContext};

pub async fn state() -> AppState {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    AppState::new(db, AppConfig::default())
}

/// In-memory state with one signed-in owner.
pub async fn signed_in() -> (AppState, RequestContext) {
    let state = state().await;
    let ctx = RequestContext::resolve(&state, Some("owner@pharmacy.example"))
        .await
        .unwrap();
    (state, ctx)
}
