use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectInvite {
    pub id: Uuid,
    pub project_id: Uuid,
    pub inviter_id: Uuid,
    pub email: String,
    pub role: String,
    #[serde(skip_serializing)]
    pub token: String,
    pub status: String,
    pub expires_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub inserted_at: DateTime<Utc>,
}
