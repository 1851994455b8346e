//! # Client Actions

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::AppState;
use stockbook_core::{Client, NewClient};

pub async fn create_client(state: &AppState, ctx: &RequestContext, req: NewClient) -> Result<Client, ApiError> {
    Ok(state.db().clients().create(ctx.tenant(), &req).await?)
}

pub async fn get_client(state: &AppState, ctx: &RequestContext, id: &str) -> Result<Client, ApiError> {
    Ok(state.db().clients().require(ctx.tenant(), id).await?)
}

pub async fn list_clients(state: &AppState, ctx: &RequestContext) -> Result<Vec<Client>, ApiError> {
    Ok(state.db().clients().list(ctx.tenant()).await?)
}

pub async fn update_client(
    state: &AppState,
    ctx: &RequestContext,
    id: &str,
    details: NewClient,
) -> Result<Client, ApiError> {
    Ok(state.db().clients().update(ctx.tenant(), id, &details).await?)
}

/// Deletes a client that has never been invoiced.
pub async fn delete_client(state: &AppState, ctx: &RequestContext, id: &str) -> Result<(), ApiError> {
    state.db().clients().delete(ctx.tenant(), id).await?;
    Ok(())
}
