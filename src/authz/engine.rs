use std::sync::Arc;

use chrono::Duration;

use crate::models::rbac::Role;

use super::cache::{DecisionCache, DecisionKey};
use super::error::AuthzError;
use super::hierarchy::WorkItemHierarchyResolver;
use super::mask;
use super::principal::PermissionRequest;
use super::store::{Clock, ResourceGrantLookup, RoleMembershipLookup, WorkItemLookup};
use super::{AuthzConfig, InsufficientGrantPolicy};

/// Result of scanning a user's role permissions against one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectGrant {
    /// The first attached permission covers every requested bit.
    Granted { permission_id: i64 },
    /// The first attached permission is missing some requested bits.
    Insufficient { permission_id: i64 },
    /// No role permission is attached to the resource.
    NoAttachment,
}

/// Decides whether a user may exercise a capability on a work item.
///
/// Evaluation order:
/// 1. cached decision for (user, resource, requested) -> return it
/// 2. `Admin` role member -> allow
/// 3. first role permission attached to the resource -> allow if its mask covers the request
/// 4. no attached permission -> repeat on the direct ancestor (Task -> Project -> Program)
/// 5. no ancestor -> deny
///
/// Every key visited on the way up receives the final decision.
pub struct AuthorizationEngine {
    roles: Arc<dyn RoleMembershipLookup>,
    grants: Arc<dyn ResourceGrantLookup>,
    hierarchy: WorkItemHierarchyResolver,
    cache: Arc<DecisionCache>,
    insufficient_grant: InsufficientGrantPolicy,
}

impl AuthorizationEngine {
    /// Engine over a single store implementing every lookup.
    pub fn new<S>(store: Arc<S>, config: &AuthzConfig, clock: Arc<dyn Clock>) -> Self
    where
        S: RoleMembershipLookup + ResourceGrantLookup + WorkItemLookup + 'static,
    {
        let cache = Arc::new(DecisionCache::new(config.cache_ttl, clock));
        Self::from_parts(store.clone(), store.clone(), store, cache, config)
    }

    pub fn from_parts(
        roles: Arc<dyn RoleMembershipLookup>,
        grants: Arc<dyn ResourceGrantLookup>,
        items: Arc<dyn WorkItemLookup>,
        cache: Arc<DecisionCache>,
        config: &AuthzConfig,
    ) -> Self {
        Self {
            roles,
            grants,
            hierarchy: WorkItemHierarchyResolver::new(items).with_max_depth(config.max_ancestor_depth),
            cache,
            insufficient_grant: config.insufficient_grant,
        }
    }

    pub fn cache(&self) -> &Arc<DecisionCache> {
        &self.cache
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache.ttl()
    }

    /// Fail-closed decision: any error is logged and reported as a deny.
    pub async fn is_authorized(&self, request: &PermissionRequest) -> bool {
        match self.check(request).await {
            Ok(authorized) => authorized,
            Err(err) => {
                log_denial(request, &err);
                false
            }
        }
    }

    /// Typed decision. Errors are never cached.
    pub async fn check(&self, request: &PermissionRequest) -> Result<bool, AuthzError> {
        let key = DecisionKey::from(request);
        if let Some(cached) = self.cache.lookup(&key) {
            tracing::debug!(
                user_id = request.user_id,
                resource_id = request.resource_id,
                requested = %request.requested,
                authorized = cached,
                "decision from cache"
            );
            return Ok(cached);
        }

        let roles = self.roles.roles_for_user(request.user_id).await?;
        if roles.iter().any(Role::is_admin) {
            tracing::debug!(user_id = request.user_id, "admin role bypass");
            self.cache.store(key, true);
            return Ok(true);
        }

        let mut walked = vec![key];
        let mut resource_id = request.resource_id;

        let authorized = loop {
            match self.scan(&roles, request.for_resource(resource_id)).await? {
                DirectGrant::Granted { permission_id } => {
                    tracing::debug!(
                        user_id = request.user_id,
                        resource_id,
                        permission_id,
                        "resource-attached permission grants request"
                    );
                    break true;
                }
                DirectGrant::Insufficient { permission_id } => {
                    tracing::debug!(
                        user_id = request.user_id,
                        resource_id,
                        permission_id,
                        policy = ?self.insufficient_grant,
                        "resource-attached permission does not cover request"
                    );
                    if self.insufficient_grant == InsufficientGrantPolicy::Deny {
                        break false;
                    }
                }
                DirectGrant::NoAttachment => {}
            }

            let Some(ancestor) = self.hierarchy.direct_ancestor(resource_id).await? else {
                break false;
            };

            let ancestor_key = key.for_resource(ancestor.id);
            if walked.contains(&ancestor_key) {
                return Err(AuthzError::corrupt(ancestor.id, "ancestor revisited during evaluation"));
            }
            if let Some(cached) = self.cache.lookup(&ancestor_key) {
                break cached;
            }

            walked.push(ancestor_key);
            resource_id = ancestor.id;
        };

        for visited in walked {
            self.cache.store(visited, authorized);
        }

        tracing::debug!(
            user_id = request.user_id,
            resource_id = request.resource_id,
            requested = %request.requested,
            decided_at = resource_id,
            authorized,
            "authorization evaluated"
        );

        Ok(authorized)
    }

    /// Role-granted, resource-attached permissions only: no ancestor fallback, no cache.
    pub async fn has_direct_permission(&self, request: &PermissionRequest) -> bool {
        match self.check_direct(request).await {
            Ok(authorized) => authorized,
            Err(err) => {
                log_denial(request, &err);
                false
            }
        }
    }

    pub async fn check_direct(&self, request: &PermissionRequest) -> Result<bool, AuthzError> {
        let roles = self.roles.roles_for_user(request.user_id).await?;
        if roles.iter().any(Role::is_admin) {
            return Ok(true);
        }

        for permission in roles.iter().flat_map(|role| role.permissions.iter()) {
            let attached = self.grants.grant(permission.id, request.resource_id).await?;
            if attached.is_some() && grants(permission.id, &permission.mask, request)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// True if the user holds the `Admin` role. Lookup failures count as not admin.
    pub async fn is_admin(&self, user_id: i64) -> bool {
        match self.roles.roles_for_user(user_id).await {
            Ok(roles) => roles.iter().any(Role::is_admin),
            Err(err) => {
                tracing::warn!(user_id, error = %err, "role lookup failed");
                false
            }
        }
    }

    pub fn clear_cache(&self) {
        let dropped = self.cache.len();
        self.cache.clear();
        tracing::info!(dropped, "authorization decision cache cleared");
    }

    /// Stops at the first permission attached to the resource.
    async fn scan(&self, roles: &[Role], request: PermissionRequest) -> Result<DirectGrant, AuthzError> {
        for permission in roles.iter().flat_map(|role| role.permissions.iter()) {
            if self.grants.grant(permission.id, request.resource_id).await?.is_none() {
                continue;
            }

            return Ok(if grants(permission.id, &permission.mask, &request)? {
                DirectGrant::Granted {
                    permission_id: permission.id,
                }
            } else {
                DirectGrant::Insufficient {
                    permission_id: permission.id,
                }
            });
        }

        Ok(DirectGrant::NoAttachment)
    }
}

fn grants(permission_id: i64, permission_mask: &str, request: &PermissionRequest) -> Result<bool, AuthzError> {
    mask::grants(permission_mask, request.requested)
        .map_err(|source| AuthzError::InvalidMask { permission_id, source })
}

fn log_denial(request: &PermissionRequest, err: &AuthzError) {
    if err.is_not_found() {
        tracing::debug!(
            user_id = request.user_id,
            resource_id = request.resource_id,
            error = %err,
            "authorization denied: record not found"
        );
    } else {
        tracing::warn!(
            user_id = request.user_id,
            resource_id = request.resource_id,
            requested = %request.requested,
            error = %err,
            "authorization failed closed"
        );
    }
}

impl std::fmt::Debug for AuthorizationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationEngine")
            .field("cache", &self.cache)
            .field("insufficient_grant", &self.insufficient_grant)
            .finish()
    }
}
