//! # Destination Actions

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::AppState;
use stockbook_core::{Destination, NewDestination};

pub async fn create_destination(
    state: &AppState,
    ctx: &RequestContext,
    req: NewDestination,
) -> Result<Destination, ApiError> {
    Ok(state.db().destinations().create(ctx.tenant(), &req).await?)
}

pub async fn list_destinations(state: &AppState, ctx: &RequestContext) -> Result<Vec<Destination>, ApiError> {
    Ok(state.db().destinations().list(ctx.tenant()).await?)
}

/// Refused with `CONFLICT` once any stock movement points at it.
pub async fn delete_destination(state: &AppState, ctx: &RequestContext, id: &str) -> Result<(), ApiError> {
    state.db().destinations().delete(ctx.tenant(), id).await?;
    Ok(())
}
