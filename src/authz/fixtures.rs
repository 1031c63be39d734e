//! In-memory collaborators for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

use crate::models::rbac::{PermissionWorkItem, Role};
use crate::models::work_item::{WorkItem, WorkItemType};

use super::error::AuthzError;
use super::store::{Clock, ResourceGrantLookup, RoleMembershipLookup, WorkItemLookup};

#[derive(Debug, Default)]
pub struct CallCounts {
    pub roles: AtomicUsize,
    pub grants: AtomicUsize,
    pub types: AtomicUsize,
    pub parents: AtomicUsize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.roles.load(Ordering::SeqCst)
            + self.grants.load(Ordering::SeqCst)
            + self.types.load(Ordering::SeqCst)
            + self.parents.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    roles: HashMap<i64, Vec<Role>>,
    grants: HashSet<(i64, i64)>,
    items: HashMap<i64, WorkItem>,
    failing_users: HashSet<i64>,
    pub calls: Arc<CallCounts>,
}

impl MemoryStore {
    pub fn with_roles(mut self, user_id: i64, roles: Vec<Role>) -> Self {
        self.roles.insert(user_id, roles);
        self
    }

    pub fn with_grant(mut self, permission_id: i64, work_item_id: i64) -> Self {
        self.grants.insert((permission_id, work_item_id));
        self
    }

    pub fn with_item(mut self, item: WorkItem) -> Self {
        self.items.insert(item.id, item);
        self
    }

    /// Role lookups for this user fail as if the database were unavailable.
    pub fn failing_for(mut self, user_id: i64) -> Self {
        self.failing_users.insert(user_id);
        self
    }
}

#[async_trait]
impl RoleMembershipLookup for MemoryStore {
    async fn roles_for_user(&self, user_id: i64) -> Result<Vec<Role>, AuthzError> {
        self.calls.roles.fetch_add(1, Ordering::SeqCst);
        if self.failing_users.contains(&user_id) {
            return Err(AuthzError::lookup("connection reset"));
        }
        Ok(self.roles.get(&user_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl ResourceGrantLookup for MemoryStore {
    async fn grant(
        &self,
        permission_id: i64,
        resource_id: i64,
    ) -> Result<Option<PermissionWorkItem>, AuthzError> {
        self.calls.grants.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .grants
            .contains(&(permission_id, resource_id))
            .then_some(PermissionWorkItem {
                permission_id,
                work_item_id: resource_id,
            }))
    }
}

#[async_trait]
impl WorkItemLookup for MemoryStore {
    async fn work_item_type(&self, id: i64) -> Result<WorkItemType, AuthzError> {
        self.calls.types.fetch_add(1, Ordering::SeqCst);
        self.items
            .get(&id)
            .map(WorkItem::item_type)
            .ok_or_else(|| AuthzError::not_found("work item", id))
    }

    async fn parent(&self, id: i64) -> Result<Option<WorkItem>, AuthzError> {
        self.calls.parents.fetch_add(1, Ordering::SeqCst);
        let item = self
            .items
            .get(&id)
            .ok_or_else(|| AuthzError::not_found("work item", id))?;
        Ok(item.parent_id().and_then(|parent| self.items.get(&parent).cloned()))
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        let start = Utc
            .with_ymd_and_hms(2025, 1, 1, 9, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Self {
            now: Mutex::new(start),
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}
