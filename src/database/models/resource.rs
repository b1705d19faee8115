use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Resource {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub subcategory: Option<Uuid>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
    pub file_url: Option<String>,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Resource row joined with its category's display fields for listings
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResourceWithCategory {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub resource: Resource,
    pub category_name: Option<String>,
    pub category_color: Option<String>,
    pub category_icon: Option<String>,
}
