//! Authorization module - hierarchical permission engine
//!
//! This module decides whether a user may exercise a capability on a work item:
//! - 5-bit permission masks (Admin, Delete, Create, Write, Read)
//! - Role-granted permissions attached to specific work items
//! - Ancestor inheritance (Task -> Project -> Program)
//! - Admin role bypass
//! - Short-lived, process-local decision cache

mod cache;
mod engine;
mod error;
mod hierarchy;
pub mod mask;
mod principal;
mod store;

#[cfg(test)]
pub(crate) mod fixtures;

pub use cache::{DecisionCache, DecisionKey, DEFAULT_DECISION_TTL_SECS};
pub use engine::AuthorizationEngine;
pub use error::AuthzError;
pub use hierarchy::{WorkItemHierarchyResolver, DEFAULT_MAX_ANCESTOR_DEPTH};
pub use mask::{MaskError, PermissionFlags};
pub use principal::{validate_claims, CallerIdentity, ClaimsRejection, PermissionRequest};
pub use store::{Clock, ResourceGrantLookup, RoleMembershipLookup, SystemClock, WorkItemLookup};

use std::str::FromStr;

use chrono::Duration;

use crate::errors::AppError;
use crate::utils::env_or;

/// What to do when the first permission attached to a resource does not cover the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsufficientGrantPolicy {
    /// Keep looking on the ancestor chain.
    #[default]
    FallbackToAncestor,
    /// Deny immediately.
    Deny,
}

impl FromStr for InsufficientGrantPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fallback" | "ancestor" => Ok(Self::FallbackToAncestor),
            "deny" => Ok(Self::Deny),
            other => Err(AppError::configuration(format!(
                "AUTHZ_INSUFFICIENT_GRANT must be 'fallback' or 'deny', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthzConfig {
    pub cache_ttl: Duration,
    pub insufficient_grant: InsufficientGrantPolicy,
    pub max_ancestor_depth: usize,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::seconds(DEFAULT_DECISION_TTL_SECS),
            insufficient_grant: InsufficientGrantPolicy::default(),
            max_ancestor_depth: DEFAULT_MAX_ANCESTOR_DEPTH,
        }
    }
}

impl AuthzConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let ttl_secs: i64 = env_or("AUTHZ_CACHE_TTL_SECS", DEFAULT_DECISION_TTL_SECS)?;

        let insufficient_grant = match std::env::var("AUTHZ_INSUFFICIENT_GRANT") {
            Ok(value) => value.parse()?,
            Err(_) => InsufficientGrantPolicy::default(),
        };

        let max_ancestor_depth = env_or("AUTHZ_MAX_ANCESTOR_DEPTH", DEFAULT_MAX_ANCESTOR_DEPTH)?;

        Self {
            cache_ttl: Duration::seconds(ttl_secs),
            insufficient_grant,
            max_ancestor_depth,
        }
        .validated()
    }

    /// Rejects values that would make every check fail.
    pub fn validated(self) -> Result<Self, AppError> {
        if self.cache_ttl < Duration::zero() {
            return Err(AppError::configuration("AUTHZ_CACHE_TTL_SECS must not be negative"));
        }
        // Task -> Project -> Program takes two hops.
        if self.max_ancestor_depth < MIN_ANCESTOR_DEPTH {
            return Err(AppError::configuration(format!(
                "AUTHZ_MAX_ANCESTOR_DEPTH must be at least {}, got {}",
                MIN_ANCESTOR_DEPTH, self.max_ancestor_depth
            )));
        }
        Ok(self)
    }
}

/// Smallest walk depth that still reaches a Program from a Task.
pub const MIN_ANCESTOR_DEPTH: usize = 2;

/// Well-known role names
pub mod roles {
    /// Members bypass every permission check. Matched exactly, case-sensitive.
    pub const ADMIN: &str = "Admin";
}
