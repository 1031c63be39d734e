use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::errors::AppError;

/// Discriminator for the fixed Program -> Project -> Task hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum WorkItemType {
    Program,
    Project,
    Task,
}

impl WorkItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkItemType::Program => "Program",
            WorkItemType::Project => "Project",
            WorkItemType::Task => "Task",
        }
    }

    /// Type of the direct parent in the hierarchy, `None` for the root.
    pub fn parent_type(&self) -> Option<WorkItemType> {
        match self {
            WorkItemType::Program => None,
            WorkItemType::Project => Some(WorkItemType::Program),
            WorkItemType::Task => Some(WorkItemType::Project),
        }
    }

    /// Distance from the hierarchy root.
    pub fn depth(&self) -> u8 {
        match self {
            WorkItemType::Program => 0,
            WorkItemType::Project => 1,
            WorkItemType::Task => 2,
        }
    }

    /// True if `other` can appear somewhere above `self`.
    pub fn has_ancestor_type(&self, other: WorkItemType) -> bool {
        other.depth() < self.depth()
    }
}

impl fmt::Display for WorkItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkItemType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Program" => Ok(WorkItemType::Program),
            "Project" => Ok(WorkItemType::Project),
            "Task" => Ok(WorkItemType::Task),
            other => Err(AppError::internal(format!("unknown work item type: {}", other))),
        }
    }
}

/// Type-specific parent reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkItemKind {
    Program,
    Project { program_id: Option<i64> },
    Task { project_id: Option<i64> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: i64,
    pub name: String,
    #[serde(flatten)]
    pub kind: WorkItemKind,
}

impl WorkItem {
    pub fn program(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: WorkItemKind::Program,
        }
    }

    pub fn project(id: i64, name: impl Into<String>, program_id: Option<i64>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: WorkItemKind::Project { program_id },
        }
    }

    pub fn task(id: i64, name: impl Into<String>, project_id: Option<i64>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: WorkItemKind::Task { project_id },
        }
    }

    pub fn item_type(&self) -> WorkItemType {
        match self.kind {
            WorkItemKind::Program => WorkItemType::Program,
            WorkItemKind::Project { .. } => WorkItemType::Project,
            WorkItemKind::Task { .. } => WorkItemType::Task,
        }
    }

    pub fn parent_id(&self) -> Option<i64> {
        match self.kind {
            WorkItemKind::Program => None,
            WorkItemKind::Project { program_id } => program_id,
            WorkItemKind::Task { project_id } => project_id,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbWorkItem {
    pub id: i64,
    pub name: String,
    pub item_type: String,
    pub program_id: Option<i64>,
    pub project_id: Option<i64>,
}

impl TryFrom<DbWorkItem> for WorkItem {
    type Error = AppError;

    fn try_from(value: DbWorkItem) -> Result<Self, Self::Error> {
        let item_type: WorkItemType = value.item_type.parse()?;
        let kind = match item_type {
            WorkItemType::Program => WorkItemKind::Program,
            WorkItemType::Project => WorkItemKind::Project {
                program_id: value.program_id,
            },
            WorkItemType::Task => WorkItemKind::Task {
                project_id: value.project_id,
            },
        };

        Ok(WorkItem {
            id: value.id,
            name: value.name,
            kind,
        })
    }
}
