//! # Request Context
//!
//! The identity provider hands each request the signed-in owner's email.
//! It is resolved to a tenant exactly once, here, and every action below
//! works with the [`TenantId`] only.
//!
//! ```text
//! principal email ──► normalise ──► tenants.owner_email ──► TenantId
//!                                   (created on first sign-in)
//! ```

use serde::Serialize;
use stockbook_core::TenantId;
use tracing::debug;

use crate::error::ApiError;
use crate::AppState;

/// Per-request data shared by every action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub tenant_id: TenantId,
    pub tenant_name: String,
}

impl RequestContext {
    /// Resolves the principal to its tenant, creating it on first sign-in.
    ///
    /// ## Returns
    /// * `Err(ApiError)` with `UNAUTHENTICATED` when no principal is present
    /// * `Err(ApiError)` with `VALIDATION_ERROR` when the email is malformed
    pub async fn resolve(state: &AppState, principal_email: Option<&str>) -> Result<Self, ApiError> {
        let email = principal_email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(ApiError::unauthenticated)?;

        let tenant = state.db().tenants().resolve_or_create(email).await?;
        debug!(tenant_id = %tenant.id, "Request context resolved");

        Ok(RequestContext {
            tenant_id: tenant.tenant_id(),
            tenant_name: tenant.name,
        })
    }

    pub fn tenant(&self) -> &TenantId {
        &self.tenant_id
    }
}
