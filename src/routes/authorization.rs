//! Authorization check endpoints.
//!
//! Every check runs claims validation first; a caller may only ask about itself.
//! Denials carry no reason.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::authz::{validate_claims, CallerIdentity};
use crate::errors::{AppError, AppResult};
use crate::models::authz::{AuthorizationResponse, ClaimsValidation, PermissionRequestBody};

/// Check a permission with ancestor fallback
#[utoipa::path(
    post,
    path = "/authorization/check",
    tag = "Authorization",
    request_body = PermissionRequestBody,
    responses(
        (status = 200, description = "Authorization decision", body = AuthorizationResponse),
        (status = 400, description = "Missing or malformed request"),
        (status = 401, description = "Missing or non-numeric user id claim"),
        (status = 403, description = "Caller asked about another user"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn check(
    State(state): State<AppState>,
    identity: CallerIdentity,
    body: Option<Json<PermissionRequestBody>>,
) -> AppResult<Json<AuthorizationResponse>> {
    let request = validate_claims(body.as_ref().map(|Json(body)| body), &identity)?;
    let authorized = state.authz.is_authorized(&request).await;

    Ok(Json(AuthorizationResponse { authorized }))
}

/// Check a permission attached directly to the resource
#[utoipa::path(
    post,
    path = "/authorization/direct",
    tag = "Authorization",
    request_body = PermissionRequestBody,
    responses(
        (status = 200, description = "Authorization decision", body = AuthorizationResponse),
        (status = 400, description = "Missing or malformed request"),
        (status = 401, description = "Missing or non-numeric user id claim"),
        (status = 403, description = "Caller asked about another user"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn check_direct(
    State(state): State<AppState>,
    identity: CallerIdentity,
    body: Option<Json<PermissionRequestBody>>,
) -> AppResult<Json<AuthorizationResponse>> {
    let request = validate_claims(body.as_ref().map(|Json(body)| body), &identity)?;
    let authorized = state.authz.has_direct_permission(&request).await;

    Ok(Json(AuthorizationResponse { authorized }))
}

/// Run claims validation only
#[utoipa::path(
    post,
    path = "/authorization/validate",
    tag = "Authorization",
    request_body = PermissionRequestBody,
    responses(
        (status = 200, description = "Claims are valid", body = ClaimsValidation),
        (status = 400, description = "Missing or malformed request", body = ClaimsValidation),
        (status = 401, description = "Missing or non-numeric user id claim", body = ClaimsValidation),
        (status = 403, description = "Caller asked about another user", body = ClaimsValidation),
    ),
    security(("bearerAuth" = []))
)]
pub async fn validate(
    identity: Result<CallerIdentity, AppError>,
    body: Option<Json<PermissionRequestBody>>,
) -> (StatusCode, Json<ClaimsValidation>) {
    let validation = match identity {
        Ok(identity) => {
            let result = validate_claims(body.as_ref().map(|Json(body)| body), &identity);
            ClaimsValidation::from(&result)
        }
        // Token missing or undecodable: same shape as every other rejection.
        Err(err) => ClaimsValidation {
            valid: false,
            status_hint: err.status().as_u16(),
            message: err.to_string(),
        },
    };
    let status = StatusCode::from_u16(validation.status_hint).unwrap_or(StatusCode::BAD_REQUEST);

    (status, Json(validation))
}

/// Drop every cached decision
#[utoipa::path(
    delete,
    path = "/authorization/cache",
    tag = "Authorization",
    responses(
        (status = 204, description = "Cache cleared"),
        (status = 403, description = "Caller is not an administrator"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn clear_cache(State(state): State<AppState>, identity: CallerIdentity) -> AppResult<StatusCode> {
    let user_id = identity.user_id()?;

    if !state.authz.is_admin(user_id).await {
        return Err(AppError::forbidden("administrator role required"));
    }

    state.authz.clear_cache();
    tracing::info!(user_id, "decision cache cleared by administrator");

    Ok(StatusCode::NO_CONTENT)
}
