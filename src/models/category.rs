// src/models/category.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Parent id used by top-level categories.
pub const ROOT_PARENT_ID: i64 = 0;

/// Represents the 'categories' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,

    pub name: String,

    /// 0 for root categories.
    pub parent_id: i64,

    /// Display order among siblings, ascending.
    pub sort: i32,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Question count. Own count in flat listings, own + descendants in the tree.
    /// Never persisted.
    #[sqlx(skip)]
    #[serde(default)]
    pub count: i64,

    #[sqlx(skip)]
    #[serde(default)]
    pub children: Vec<Category>,
}

impl Category {
    pub fn is_root(&self) -> bool {
        self.parent_id == ROOT_PARENT_ID
    }
}

/// DTO for creating a category.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 50, message = "Category name must be between 1 and 50 chars"))]
    pub name: String,
    #[validate(range(min = 0))]
    pub parent_id: i64,
    #[serde(default)]
    pub sort: i32,
}

/// DTO for renaming / reordering a category. The parent is fixed.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 50, message = "Category name must be between 1 and 50 chars"))]
    pub name: String,
    pub sort: Option<i32>,
}
