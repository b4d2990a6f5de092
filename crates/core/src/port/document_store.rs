// Document Store Port (Interface)

use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Collection names shared by the catalog and the migration engine
pub mod collections {
    pub const PATIENTS: &str = "patients";
    pub const DOCTORS: &str = "doctors";
    pub const CLINICS: &str = "clinics";
    pub const APPOINTMENTS: &str = "appointments";

    pub const ALL: [&str; 4] = [PATIENTS, DOCTORS, CLINICS, APPOINTMENTS];
}

/// Top-level fields of a document
pub type DocumentData = serde_json::Map<String, Value>;

/// A stored document together with its id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: DocumentData,
}

impl Document {
    pub fn new(id: impl Into<String>, data: DocumentData) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Resolve a dotted field path (`"patient.name"`)
    pub fn field(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        parts.try_fold(self.data.get(first)?, |value, part| value.get(part))
    }

    pub fn str_field(&self, path: &str) -> Option<&str> {
        self.field(path).and_then(Value::as_str)
    }

    /// Data annotated with its id under `_id`
    pub fn to_json(&self) -> Value {
        let mut data = self.data.clone();
        data.insert("_id".to_string(), Value::String(self.id.clone()));
        Value::Object(data)
    }
}

/// Filter comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOp {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    ArrayContains,
    ArrayContainsAny,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "==",
            FilterOp::NotEq => "!=",
            FilterOp::Lt => "<",
            FilterOp::Le => "<=",
            FilterOp::Gt => ">",
            FilterOp::Ge => ">=",
            FilterOp::In => "in",
            FilterOp::NotIn => "not-in",
            FilterOp::ArrayContains => "array-contains",
            FilterOp::ArrayContainsAny => "array-contains-any",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOp {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "==" | "=" => Ok(FilterOp::Eq),
            "!=" | "<>" => Ok(FilterOp::NotEq),
            "<" => Ok(FilterOp::Lt),
            "<=" => Ok(FilterOp::Le),
            ">" => Ok(FilterOp::Gt),
            ">=" => Ok(FilterOp::Ge),
            "in" => Ok(FilterOp::In),
            "not-in" => Ok(FilterOp::NotIn),
            "array-contains" => Ok(FilterOp::ArrayContains),
            "array-contains-any" => Ok(FilterOp::ArrayContainsAny),
            other => Err(AppError::Validation(format!(
                "Unknown filter operator: {}",
                other
            ))),
        }
    }
}

/// One `(field, operator, value)` condition; a query ANDs all of them
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Collection-scoped document persistence
///
/// Independent of the relational side. One shared instance per process;
/// `connect` is idempotent.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Open the store; a no-op when already connected
    async fn connect(&self) -> Result<()>;

    async fn is_connected(&self) -> bool;

    async fn close(&self);

    /// Write a document at `id`, overwriting any existing one
    async fn create(&self, collection: &str, id: &str, data: DocumentData) -> Result<()>;

    /// Write a document under a generated id and return it
    async fn create_auto_id(&self, collection: &str, data: DocumentData) -> Result<String>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    async fn list(&self, collection: &str, limit: Option<usize>) -> Result<Vec<Document>>;

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        order_by: Option<&OrderBy>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>>;

    /// `merge = true` shallow-merges into an existing document;
    /// `merge = false` replaces it
    async fn update(&self, collection: &str, id: &str, data: DocumentData, merge: bool)
        -> Result<()>;

    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Query then delete each match; returns how many were deleted
    async fn delete_by_query(&self, collection: &str, filters: &[Filter]) -> Result<usize> {
        let docs = self.query(collection, filters, None, None).await?;
        for doc in &docs {
            self.delete(collection, &doc.id).await?;
        }
        tracing::info!(collection, deleted = docs.len(), "Documents deleted by query");
        Ok(docs.len())
    }

    async fn count(&self, collection: &str) -> Result<usize>;

    async fn collection_exists(&self, collection: &str) -> Result<bool> {
        Ok(!self.list(collection, Some(1)).await?.is_empty())
    }
}
