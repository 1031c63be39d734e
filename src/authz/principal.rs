use axum::http::StatusCode;

use crate::models::authz::{ClaimsValidation, PermissionRequestBody};

use super::mask::PermissionFlags;

/// A validated authorization question: may `user_id` exercise `requested` on `resource_id`?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PermissionRequest {
    pub user_id: i64,
    pub resource_id: i64,
    pub requested: PermissionFlags,
}

impl PermissionRequest {
    pub fn new(user_id: i64, resource_id: i64, requested: PermissionFlags) -> Self {
        Self {
            user_id,
            resource_id,
            requested,
        }
    }

    /// Same user and capability against another resource.
    pub fn for_resource(&self, resource_id: i64) -> Self {
        Self {
            resource_id,
            ..*self
        }
    }
}

impl TryFrom<&PermissionRequestBody> for PermissionRequest {
    type Error = ClaimsRejection;

    fn try_from(body: &PermissionRequestBody) -> Result<Self, Self::Error> {
        let requested = PermissionFlags::from_bits(body.requested_permission)
            .ok_or(ClaimsRejection::UnknownPermissionBits(body.requested_permission))?;
        Ok(Self::new(body.user_id, body.resource_id, requested))
    }
}

/// Identity presented by the caller, as decoded from the bearer token.
///
/// The user id claim is kept raw; numeric validation is part of claims validation.
#[derive(Debug, Clone, Default)]
pub struct CallerIdentity {
    pub user_id_claim: Option<String>,
}

impl CallerIdentity {
    pub fn new(user_id_claim: Option<String>) -> Self {
        Self { user_id_claim }
    }

    pub fn for_user(user_id: i64) -> Self {
        Self::new(Some(user_id.to_string()))
    }

    /// Numeric user id, if the claim is present and parses.
    pub fn user_id(&self) -> Result<i64, ClaimsRejection> {
        let claim = self
            .user_id_claim
            .as_deref()
            .map(str::trim)
            .filter(|claim| !claim.is_empty())
            .ok_or(ClaimsRejection::MissingUserClaim)?;

        claim
            .parse::<i64>()
            .map_err(|_| ClaimsRejection::InvalidUserClaim(claim.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClaimsRejection {
    #[error("permission request is required")]
    MissingRequest,
    #[error("unknown permission bits: {0:#07b}")]
    UnknownPermissionBits(u8),
    #[error("caller identity has no user id claim")]
    MissingUserClaim,
    #[error("user id claim is not a valid integer: {0}")]
    InvalidUserClaim(String),
    #[error("caller {caller} may not check permissions for user {requested}")]
    UserMismatch { caller: i64, requested: i64 },
}

impl ClaimsRejection {
    pub fn status_hint(&self) -> StatusCode {
        match self {
            ClaimsRejection::MissingRequest | ClaimsRejection::UnknownPermissionBits(_) => {
                StatusCode::BAD_REQUEST
            }
            ClaimsRejection::MissingUserClaim | ClaimsRejection::InvalidUserClaim(_) => {
                StatusCode::UNAUTHORIZED
            }
            ClaimsRejection::UserMismatch { .. } => StatusCode::FORBIDDEN,
        }
    }
}

/// Pre-check run before the engine: the request must be present and well formed,
/// the caller must carry a numeric user id, and that id must be the one asked about.
pub fn validate_claims(
    body: Option<&PermissionRequestBody>,
    identity: &CallerIdentity,
) -> Result<PermissionRequest, ClaimsRejection> {
    let body = body.ok_or(ClaimsRejection::MissingRequest)?;
    let caller = identity.user_id()?;

    if caller != body.user_id {
        return Err(ClaimsRejection::UserMismatch {
            caller,
            requested: body.user_id,
        });
    }

    PermissionRequest::try_from(body)
}

impl From<&Result<PermissionRequest, ClaimsRejection>> for ClaimsValidation {
    fn from(result: &Result<PermissionRequest, ClaimsRejection>) -> Self {
        match result {
            Ok(_) => ClaimsValidation {
                valid: true,
                status_hint: StatusCode::OK.as_u16(),
                message: "Valid request".to_string(),
            },
            Err(rejection) => ClaimsValidation {
                valid: false,
                status_hint: rejection.status_hint().as_u16(),
                message: rejection.to_string(),
            },
        }
    }
}
