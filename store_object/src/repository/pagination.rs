use super::core::Repository;
use crate::errors::{RepositoryError, RepositoryResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Arguments for [`Repository::find_many_with_pagination`]. Pages start at 1.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationArgs {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    #[serde(rename = "where")]
    pub filter: Option<Value>,
    pub order_by: Option<Value>,
    pub select: Option<Value>,
    pub include: Option<Value>,
}

impl PaginationArgs {
    pub fn new(page: u64, page_size: u64) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
            ..Self::default()
        }
    }

    pub fn with_filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_order_by(mut self, order_by: Value) -> Self {
        self.order_by = Some(order_by);
        self
    }

    pub fn with_select(mut self, select: Value) -> Self {
        self.select = Some(select);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl PaginationMeta {
    pub fn new(page: u64, page_size: u64, total: u64) -> Self {
        let total_pages = total.div_ceil(page_size);
        Self {
            page,
            page_size,
            total,
            total_pages,
            has_next_page: page < total_pages,
            has_previous_page: page > 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult {
    pub items: Vec<Value>,
    pub meta: PaginationMeta,
}

impl Repository {
    /// Fetch one page together with the total count. Both queries run concurrently.
    pub async fn find_many_with_pagination(&self, args: PaginationArgs) -> RepositoryResult<PaginatedResult> {
        let page = args.page.filter(|p| *p > 0).unwrap_or(1);
        let page_size = args.page_size.filter(|s| *s > 0).unwrap_or(DEFAULT_PAGE_SIZE);
        let skip = (page - 1).checked_mul(page_size).ok_or_else(|| {
            RepositoryError::Validation(format!("page {page} with page size {page_size} is out of range"))
        })?;

        let mut count_args = Map::new();
        let mut find_args = Map::new();
        if let Some(filter) = args.filter {
            count_args.insert("where".to_string(), filter.clone());
            find_args.insert("where".to_string(), filter);
        }
        for (key, value) in [
            ("orderBy", args.order_by),
            ("select", args.select),
            ("include", args.include),
        ] {
            if let Some(value) = value {
                find_args.insert(key.to_string(), value);
            }
        }
        find_args.insert("skip".to_string(), json!(skip));
        find_args.insert("take".to_string(), json!(page_size));

        let (total, items) = futures::try_join!(
            self.count(Value::Object(count_args)),
            self.find_many(Value::Object(find_args))
        )?;

        Ok(PaginatedResult {
            items,
            meta: PaginationMeta::new(page, page_size, total),
        })
    }

    /// Whether any record matches `filter`. Selects only `id` unless `select` is given.
    pub async fn exists(&self, filter: Value, select: Option<Value>) -> RepositoryResult<bool> {
        let select = select.unwrap_or_else(|| json!({ "id": true }));
        let found = self
            .find_first(json!({ "where": filter, "select": select }))
            .await?;
        Ok(found.is_some())
    }
}
