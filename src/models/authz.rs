use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of an authorization check as sent by callers.
///
/// `requested_permission` is the raw bit value: Read=1, Write=2, Create=4,
/// Delete=8, Admin=16, OR-combined for multi-capability checks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct PermissionRequestBody {
    #[schema(example = 5)]
    pub user_id: i64,
    #[schema(example = 42)]
    pub resource_id: i64,
    #[schema(example = 3)]
    pub requested_permission: u8,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct AuthorizationResponse {
    pub authorized: bool,
}

/// Outcome of the claims pre-check in the shape callers report upstream.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClaimsValidation {
    pub valid: bool,
    #[schema(example = 200)]
    pub status_hint: u16,
    pub message: String,
}
