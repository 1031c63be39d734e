use super::mask::MaskError;

/// Failures raised while evaluating an authorization request.
///
/// None of these reach the caller of `is_authorized`: they are logged and folded
/// into a deny. `check` returns them so tests and diagnostics can tell a missing
/// grant apart from a fault.
#[derive(thiserror::Error, Debug)]
pub enum AuthzError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("invalid permission mask on permission {permission_id}: {source}")]
    InvalidMask {
        permission_id: i64,
        #[source]
        source: MaskError,
    },
    #[error("corrupt work item hierarchy at {id}: {reason}")]
    CorruptHierarchy { id: i64, reason: String },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("lookup failed: {0}")]
    Lookup(String),
}

impl AuthzError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn corrupt(id: i64, reason: impl Into<String>) -> Self {
        Self::CorruptHierarchy {
            id,
            reason: reason.into(),
        }
    }

    pub fn lookup(message: impl Into<String>) -> Self {
        Self::Lookup(message.into())
    }

    /// Missing records are an ordinary "no grant"; everything else is a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AuthzError::NotFound { .. })
    }
}
