//! Soft delete support
//!
//! With soft delete enabled, `delete` and `delete_many` are rewritten into
//! updates that stamp [`SOFT_DELETE_FIELD`]. Reads are not filtered; callers
//! add `deletedAt: null` to their `where` when they want live rows only.

use super::core::Repository;
use crate::errors::{RepositoryError, RepositoryResult};
use crate::operation::ModelOperation;
use chrono::Utc;
use serde_json::{Map, Value, json};

pub const SOFT_DELETE_FIELD: &str = "deletedAt";

impl Repository {
    pub fn soft_delete_enabled(&self) -> bool {
        self.config.soft_delete
    }

    pub(crate) fn soft_delete_rewrite(
        &self,
        operation: ModelOperation,
        args: Value,
    ) -> RepositoryResult<(ModelOperation, Value)> {
        if !self.config.soft_delete {
            return Ok((operation, args));
        }

        let rewritten = match operation {
            ModelOperation::Delete => ModelOperation::Update,
            ModelOperation::DeleteMany => ModelOperation::UpdateMany,
            _ => return Ok((operation, args)),
        };

        let filter = match args.get("where") {
            Some(filter) => filter.clone(),
            None if operation == ModelOperation::DeleteMany => json!({}),
            None => {
                return Err(RepositoryError::Validation(format!(
                    "{}.delete requires where",
                    self.model
                )));
            }
        };

        let mut update = Map::new();
        update.insert("where".to_string(), filter);
        update.insert(
            "data".to_string(),
            json!({ SOFT_DELETE_FIELD: Utc::now().to_rfc3339() }),
        );
        if let Some(select) = args.get("select") {
            if operation == ModelOperation::Delete {
                update.insert("select".to_string(), select.clone());
            }
        }

        cache_system::debug_log!("Soft delete on {}: {} -> {}", self.model, operation, rewritten);
        Ok((rewritten, Value::Object(update)))
    }

    /// Clear the soft delete marker of a record, optionally applying `data` as well
    pub async fn restore_by_id(&self, id: Value, data: Option<Value>) -> RepositoryResult<Value> {
        if !self.config.soft_delete {
            return Err(RepositoryError::SoftDeleteDisabled(self.model.clone()));
        }

        let mut fields = match data {
            Some(Value::Object(fields)) => fields,
            Some(Value::Null) | None => Map::new(),
            Some(other) => {
                return Err(RepositoryError::Validation(format!(
                    "restore data must be an object, got {}",
                    other
                )));
            }
        };
        fields.insert(SOFT_DELETE_FIELD.to_string(), Value::Null);

        self.update(json!({
            "where": { "id": id },
            "data": fields,
        }))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_client::MemoryDataClient;
    use crate::repository::RepositoryBuilder;
    use std::sync::Arc;

    async fn repository(soft_delete: bool) -> (MemoryDataClient, Repository) {
        let client = MemoryDataClient::new();
        client
            .seed("user", vec![json!({"id": 1, "email": "a@x.com"}), json!({"id": 2, "email": "b@x.com"})])
            .await;
        let repo = RepositoryBuilder::new(Arc::new(client.clone()), "user")
            .with_soft_delete(soft_delete)
            .build()
            .unwrap();
        (client, repo)
    }

    #[tokio::test]
    async fn test_delete_becomes_update() {
        let (client, repo) = repository(true).await;

        let deleted = repo.delete(json!({"where": {"id": 1}})).await.unwrap();

        assert!(deleted[SOFT_DELETE_FIELD].is_string());
        assert_eq!(client.records("user").await.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_many_becomes_update_many() {
        let (client, repo) = repository(true).await;

        let batch = repo.delete_many(json!({})).await.unwrap();

        assert_eq!(batch.count, 2);
        assert!(client
            .records("user")
            .await
            .iter()
            .all(|r| r[SOFT_DELETE_FIELD].is_string()));
    }

    #[tokio::test]
    async fn test_delete_without_where_rejected() {
        let (_, repo) = repository(true).await;
        let err = repo.delete(json!({})).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Validation(_)));
    }

    #[tokio::test]
    async fn test_hard_delete_when_disabled() {
        let (client, repo) = repository(false).await;
        repo.delete(json!({"where": {"id": 1}})).await.unwrap();
        assert_eq!(client.records("user").await.len(), 1);
    }

    #[tokio::test]
    async fn test_restore_clears_marker_and_applies_data() {
        let (_, repo) = repository(true).await;
        repo.delete(json!({"where": {"id": 2}})).await.unwrap();

        let restored = repo
            .restore_by_id(json!(2), Some(json!({"email": "b2@x.com"})))
            .await
            .unwrap();

        assert!(restored[SOFT_DELETE_FIELD].is_null());
        assert_eq!(restored["email"], "b2@x.com");
    }

    #[tokio::test]
    async fn test_restore_requires_soft_delete() {
        let (_, repo) = repository(false).await;
        let err = repo.restore_by_id(json!(1), None).await.unwrap_err();
        assert!(matches!(err, RepositoryError::SoftDeleteDisabled(model) if model == "user"));
    }
}
