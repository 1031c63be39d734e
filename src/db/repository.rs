//! SQLite-backed lookups for the authorization engine.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::authz::{AuthzError, ResourceGrantLookup, RoleMembershipLookup, WorkItemLookup};
use crate::models::rbac::{DbRole, DbRolePermission, Permission, PermissionWorkItem, Role};
use crate::models::work_item::{DbWorkItem, WorkItem, WorkItemType};

const WORK_ITEM_COLUMNS: &str = "id, name, item_type, program_id, project_id";

#[derive(Debug, Clone)]
pub struct SqliteAuthzStore {
    pool: SqlitePool,
}

impl SqliteAuthzStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Live (not soft-deleted) work item by id.
    pub async fn fetch_work_item(&self, id: i64) -> Result<Option<WorkItem>, AuthzError> {
        let sql = format!(
            "SELECT {} FROM work_items WHERE id = ? AND deleted = 0",
            WORK_ITEM_COLUMNS
        );

        let row = sqlx::query_as::<_, DbWorkItem>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(WorkItem::try_from)
            .transpose()
            .map_err(|err| AuthzError::lookup(err.to_string()))
    }
}

#[async_trait]
impl RoleMembershipLookup for SqliteAuthzStore {
    async fn roles_for_user(&self, user_id: i64) -> Result<Vec<Role>, AuthzError> {
        let roles = sqlx::query_as::<_, DbRole>(
            "SELECT r.id, r.name FROM roles r \
             JOIN user_roles ur ON ur.role_id = r.id \
             JOIN users u ON u.id = ur.user_id \
             WHERE ur.user_id = ? AND u.deleted = 0 \
             ORDER BY r.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        if roles.is_empty() {
            return Ok(Vec::new());
        }

        let grants = sqlx::query_as::<_, DbRolePermission>(
            "SELECT rp.role_id, p.id AS permission_id, p.name AS permission_name, p.mask \
             FROM role_permissions rp \
             JOIN permissions p ON p.id = rp.permission_id \
             JOIN user_roles ur ON ur.role_id = rp.role_id \
             WHERE ur.user_id = ? \
             ORDER BY rp.role_id, p.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_role: HashMap<i64, Vec<Permission>> = HashMap::new();
        for grant in grants {
            by_role.entry(grant.role_id).or_default().push(grant.into());
        }

        Ok(roles
            .into_iter()
            .map(|db| {
                let permissions = by_role.remove(&db.id).unwrap_or_default();
                Role::from(db).with_permissions(permissions)
            })
            .collect())
    }
}

#[async_trait]
impl ResourceGrantLookup for SqliteAuthzStore {
    async fn grant(
        &self,
        permission_id: i64,
        resource_id: i64,
    ) -> Result<Option<PermissionWorkItem>, AuthzError> {
        let grant = sqlx::query_as::<_, PermissionWorkItem>(
            "SELECT pw.permission_id, pw.work_item_id FROM permission_work_items pw \
             JOIN work_items w ON w.id = pw.work_item_id \
             WHERE pw.permission_id = ? AND pw.work_item_id = ? AND w.deleted = 0",
        )
        .bind(permission_id)
        .bind(resource_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(grant)
    }
}

#[async_trait]
impl WorkItemLookup for SqliteAuthzStore {
    async fn work_item_type(&self, id: i64) -> Result<WorkItemType, AuthzError> {
        self.fetch_work_item(id)
            .await?
            .map(|item| item.item_type())
            .ok_or_else(|| AuthzError::not_found("work item", id))
    }

    async fn parent(&self, id: i64) -> Result<Option<WorkItem>, AuthzError> {
        let item = self
            .fetch_work_item(id)
            .await?
            .ok_or_else(|| AuthzError::not_found("work item", id))?;

        match item.parent_id() {
            Some(parent_id) => self.fetch_work_item(parent_id).await,
            None => Ok(None),
        }
    }
}
