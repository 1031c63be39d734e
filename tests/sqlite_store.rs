use std::sync::Arc;

use anyhow::Result;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};

use workgrid::authz::{
    AuthorizationEngine, AuthzConfig, PermissionFlags, PermissionRequest, ResourceGrantLookup,
    RoleMembershipLookup, SystemClock, WorkItemLookup,
};
use workgrid::db::SqliteAuthzStore;
use workgrid::models::work_item::WorkItemType;

const SEED: &[&str] = &[
    "INSERT INTO users (id, username, deleted) VALUES (1, 'alice', 0), (2, 'gone', 1)",
    "INSERT INTO roles (id, name) VALUES (1, 'Editor'), (2, 'Reviewer')",
    "INSERT INTO user_roles (user_id, role_id) VALUES (1, 1), (1, 2), (2, 1)",
    "INSERT INTO permissions (id, name, mask) VALUES (1, 'edit', '00011'), (2, 'review', '00001'), (3, 'plan', '00101')",
    "INSERT INTO role_permissions (role_id, permission_id) VALUES (1, 1), (1, 3), (2, 2)",
    "INSERT INTO work_items (id, name, item_type) VALUES (10, 'Platform', 'Program')",
    "INSERT INTO work_items (id, name, item_type, program_id) VALUES (20, 'Billing', 'Project', 10)",
    "INSERT INTO work_items (id, name, item_type, project_id) VALUES (30, 'Invoices', 'Task', 20)",
    "INSERT INTO work_items (id, name, item_type) VALUES (40, 'Loose end', 'Task')",
    "INSERT INTO work_items (id, name, item_type, program_id, deleted) VALUES (50, 'Retired', 'Project', 10, 1)",
    "INSERT INTO work_items (id, name, item_type, project_id) VALUES (51, 'Under retired', 'Task', 50)",
    "INSERT INTO permission_work_items (permission_id, work_item_id) VALUES (1, 10), (2, 30), (3, 50)",
];

async fn setup() -> Result<(TempDir, SqlitePool)> {
    let dir = tempdir()?;
    let db_path = dir.path().join("test.db");

    use sqlx::sqlite::SqliteConnectOptions;
    let opts = SqliteConnectOptions::new()
        .filename(db_path.as_path())
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")).await?;
    migrator.run(&pool).await?;

    for statement in SEED {
        sqlx::query(statement).execute(&pool).await?;
    }

    Ok((dir, pool))
}

fn engine(pool: &SqlitePool) -> AuthorizationEngine {
    let store = Arc::new(SqliteAuthzStore::new(pool.clone()));
    AuthorizationEngine::new(store, &AuthzConfig::default(), Arc::new(SystemClock))
}

#[tokio::test]
async fn roles_come_back_with_their_permissions() -> Result<()> {
    let (_dir, pool) = setup().await?;
    let store = SqliteAuthzStore::new(pool);

    let roles = store.roles_for_user(1).await?;
    let names: Vec<_> = roles.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Editor", "Reviewer"]);

    let editor: Vec<_> = roles[0].permissions.iter().map(|p| (p.id, p.mask.as_str())).collect();
    assert_eq!(editor, [(1, "00011"), (3, "00101")]);
    assert_eq!(roles[1].permissions.len(), 1);

    assert!(store.roles_for_user(2).await?.is_empty(), "deleted user has no roles");
    assert!(store.roles_for_user(99).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn grants_skip_deleted_work_items() -> Result<()> {
    let (_dir, pool) = setup().await?;
    let store = SqliteAuthzStore::new(pool);

    assert!(store.grant(1, 10).await?.is_some());
    assert!(store.grant(1, 20).await?.is_none());
    assert!(store.grant(3, 50).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn hierarchy_lookups_follow_parent_columns() -> Result<()> {
    let (_dir, pool) = setup().await?;
    let store = SqliteAuthzStore::new(pool);

    assert_eq!(store.work_item_type(30).await?, WorkItemType::Task);
    assert_eq!(store.parent(30).await?.map(|p| p.id), Some(20));
    assert_eq!(store.parent(20).await?.map(|p| p.id), Some(10));
    assert!(store.parent(10).await?.is_none());
    assert!(store.parent(40).await?.is_none(), "orphan task");
    assert!(store.parent(51).await?.is_none(), "deleted parent is not returned");

    let err = store.work_item_type(999).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(store.parent(50).await.unwrap_err().is_not_found());

    Ok(())
}

#[tokio::test]
async fn engine_walks_the_stored_hierarchy() -> Result<()> {
    let (_dir, pool) = setup().await?;
    let engine = engine(&pool);

    let write = PermissionFlags::READ | PermissionFlags::WRITE;
    assert!(engine.is_authorized(&PermissionRequest::new(1, 30, PermissionFlags::READ)).await);
    assert!(engine.is_authorized(&PermissionRequest::new(1, 30, write)).await, "insufficient task grant falls back to program");
    assert!(!engine.is_authorized(&PermissionRequest::new(1, 30, PermissionFlags::CREATE)).await);
    assert!(!engine.is_authorized(&PermissionRequest::new(1, 40, PermissionFlags::READ)).await, "orphan task");
    assert!(!engine.is_authorized(&PermissionRequest::new(1, 51, PermissionFlags::READ)).await, "deleted project cuts the chain");
    assert!(!engine.is_authorized(&PermissionRequest::new(2, 10, PermissionFlags::READ)).await, "deleted user");

    Ok(())
}

#[tokio::test]
async fn cached_decision_outlives_revoked_grant_until_cleared() -> Result<()> {
    let (_dir, pool) = setup().await?;
    let engine = engine(&pool);
    let request = PermissionRequest::new(1, 20, PermissionFlags::WRITE);

    assert!(engine.is_authorized(&request).await);

    sqlx::query("DELETE FROM permission_work_items WHERE permission_id = 1 AND work_item_id = 10")
        .execute(&pool)
        .await?;

    assert!(engine.is_authorized(&request).await, "served from cache");
    assert!(!engine.has_direct_permission(&PermissionRequest::new(1, 10, PermissionFlags::WRITE)).await);

    engine.clear_cache();
    assert!(!engine.is_authorized(&request).await);

    Ok(())
}
