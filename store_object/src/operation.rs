//! Operation descriptors
//!
//! Model operations carry the client's camelCase names; those names are also
//! the operation component of cache keys.

use cache_system::RAW_QUERY_OPERATION;
use std::fmt;

pub const RAW_EXECUTE_OPERATION: &str = "$executeRaw";

/// Per-model client operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelOperation {
    Create,
    CreateMany,
    FindMany,
    FindFirst,
    FindUnique,
    Update,
    UpdateMany,
    Delete,
    DeleteMany,
    Upsert,
    Count,
}

impl ModelOperation {
    pub const ALL: [ModelOperation; 11] = [
        ModelOperation::Create,
        ModelOperation::CreateMany,
        ModelOperation::FindMany,
        ModelOperation::FindFirst,
        ModelOperation::FindUnique,
        ModelOperation::Update,
        ModelOperation::UpdateMany,
        ModelOperation::Delete,
        ModelOperation::DeleteMany,
        ModelOperation::Upsert,
        ModelOperation::Count,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModelOperation::Create => "create",
            ModelOperation::CreateMany => "createMany",
            ModelOperation::FindMany => "findMany",
            ModelOperation::FindFirst => "findFirst",
            ModelOperation::FindUnique => "findUnique",
            ModelOperation::Update => "update",
            ModelOperation::UpdateMany => "updateMany",
            ModelOperation::Delete => "delete",
            ModelOperation::DeleteMany => "deleteMany",
            ModelOperation::Upsert => "upsert",
            ModelOperation::Count => "count",
        }
    }

    /// Reads are cached, everything else invalidates
    pub fn is_read(&self) -> bool {
        matches!(
            self,
            ModelOperation::FindMany
                | ModelOperation::FindFirst
                | ModelOperation::FindUnique
                | ModelOperation::Count
        )
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }
}

impl fmt::Display for ModelOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Anything that can flow through a repository's decorator chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Model(ModelOperation),
    QueryRaw,
    ExecuteRaw,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Model(op) => op.name(),
            Operation::QueryRaw => RAW_QUERY_OPERATION,
            Operation::ExecuteRaw => RAW_EXECUTE_OPERATION,
        }
    }

    pub fn is_read(&self) -> bool {
        match self {
            Operation::Model(op) => op.is_read(),
            Operation::QueryRaw => true,
            Operation::ExecuteRaw => false,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<ModelOperation> for Operation {
    fn from(op: ModelOperation) -> Self {
        Operation::Model(op)
    }
}
