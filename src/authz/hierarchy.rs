use std::collections::HashSet;
use std::sync::Arc;

use crate::models::work_item::{WorkItem, WorkItemType};

use super::error::AuthzError;
use super::store::WorkItemLookup;

/// Default bound on parent hops before a walk is considered corrupt.
pub const DEFAULT_MAX_ANCESTOR_DEPTH: usize = 4;

/// Resolves work item types and ancestors over the fixed
/// Program -> Project -> Task hierarchy.
#[derive(Clone)]
pub struct WorkItemHierarchyResolver {
    items: Arc<dyn WorkItemLookup>,
    max_depth: usize,
}

impl WorkItemHierarchyResolver {
    pub fn new(items: Arc<dyn WorkItemLookup>) -> Self {
        Self {
            items,
            max_depth: DEFAULT_MAX_ANCESTOR_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub async fn work_item_type(&self, id: i64) -> Result<WorkItemType, AuthzError> {
        self.items.work_item_type(id).await
    }

    /// Nearest strict ancestor of `id` whose type is `target`.
    ///
    /// `Ok(None)` when the pair (source type, target) has no place in the hierarchy
    /// or when a link in the chain is unset.
    pub async fn nearest_ancestor(
        &self,
        id: i64,
        target: WorkItemType,
    ) -> Result<Option<WorkItem>, AuthzError> {
        let source = self.items.work_item_type(id).await?;
        self.walk(id, source, target).await
    }

    /// Ancestor one level up the hierarchy: a Task's Project, a Project's Program.
    pub async fn direct_ancestor(&self, id: i64) -> Result<Option<WorkItem>, AuthzError> {
        let source = self.items.work_item_type(id).await?;
        match source.parent_type() {
            Some(target) => self.walk(id, source, target).await,
            None => Ok(None),
        }
    }

    async fn walk(
        &self,
        id: i64,
        source: WorkItemType,
        target: WorkItemType,
    ) -> Result<Option<WorkItem>, AuthzError> {
        if !source.has_ancestor_type(target) {
            return Ok(None);
        }

        let mut visited = HashSet::from([id]);
        let mut current = (id, source);

        for _ in 0..self.max_depth {
            let (child_id, child_type) = current;
            let Some(parent) = self.items.parent(child_id).await? else {
                return Ok(None);
            };

            let parent_type = parent.item_type();
            if parent_type.depth() >= child_type.depth() {
                return Err(AuthzError::corrupt(
                    child_id,
                    format!("{} {} has {} parent {}", child_type, child_id, parent_type, parent.id),
                ));
            }
            if !visited.insert(parent.id) {
                return Err(AuthzError::corrupt(
                    parent.id,
                    format!("cycle through work item {}", parent.id),
                ));
            }

            if parent_type == target {
                return Ok(Some(parent));
            }
            if !parent_type.has_ancestor_type(target) {
                return Ok(None);
            }

            current = (parent.id, parent_type);
        }

        Err(AuthzError::corrupt(
            id,
            format!("ancestor walk exceeded {} levels", self.max_depth),
        ))
    }
}
