use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::rbac::{PermissionWorkItem, Role};
use crate::models::work_item::{WorkItem, WorkItemType};
use crate::utils::utc_now;

use super::error::AuthzError;

/// Roles held by a user, each carrying the permissions granted to it.
#[async_trait]
pub trait RoleMembershipLookup: Send + Sync {
    async fn roles_for_user(&self, user_id: i64) -> Result<Vec<Role>, AuthzError>;
}

/// Resource-specific attachments of permissions to work items.
#[async_trait]
pub trait ResourceGrantLookup: Send + Sync {
    async fn grant(
        &self,
        permission_id: i64,
        resource_id: i64,
    ) -> Result<Option<PermissionWorkItem>, AuthzError>;
}

/// Work item type and parent resolution.
#[async_trait]
pub trait WorkItemLookup: Send + Sync {
    /// Fails with `AuthzError::NotFound` for missing or soft-deleted items.
    async fn work_item_type(&self, id: i64) -> Result<WorkItemType, AuthzError>;

    /// Direct parent, `None` for roots and for items whose parent is unset.
    async fn parent(&self, id: i64) -> Result<Option<WorkItem>, AuthzError>;
}

/// Time source for cache expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        utc_now()
    }
}
