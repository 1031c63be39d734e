use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::authz::roles;

// =============================================================================
// ROLE
// =============================================================================

/// A named group of users together with the permissions granted to it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Role {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl Role {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            permissions: Vec::new(),
        }
    }

    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions = permissions.into_iter().collect();
        self
    }

    /// Exact, case-sensitive match against the reserved admin role name.
    pub fn is_admin(&self) -> bool {
        self.name == roles::ADMIN
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbRole {
    pub id: i64,
    pub name: String,
}

impl From<DbRole> for Role {
    fn from(db: DbRole) -> Self {
        Role::new(db.id, db.name)
    }
}

// =============================================================================
// PERMISSION
// =============================================================================

/// A capability template. `mask` is the 5-character binary string
/// (Admin, Delete, Create, Write, Read from most to least significant bit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Permission {
    pub id: i64,
    pub name: String,
    #[schema(example = "00011")]
    pub mask: String,
}

impl Permission {
    pub fn new(id: i64, name: impl Into<String>, mask: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            mask: mask.into(),
        }
    }
}

/// One row of the role -> permission join as read from the database.
#[derive(Debug, Clone, FromRow)]
pub struct DbRolePermission {
    pub role_id: i64,
    pub permission_id: i64,
    pub permission_name: String,
    pub mask: String,
}

impl From<DbRolePermission> for Permission {
    fn from(db: DbRolePermission) -> Self {
        Permission::new(db.permission_id, db.permission_name, db.mask)
    }
}

// =============================================================================
// PERMISSION-WORK ITEM ATTACHMENT
// =============================================================================

/// A resource-specific grant: the permission applies to this work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PermissionWorkItem {
    pub permission_id: i64,
    pub work_item_id: i64,
}
