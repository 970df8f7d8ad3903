//! Borrow history (audit trail) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Borrowed,
    Returned,
}

/// Append-only audit entry mirroring a borrow record's lifecycle.
///
/// Written once at borrow time with status `borrowed`, updated exactly once
/// when the matching return succeeds. Never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub borrow_id: Uuid,
    pub book_id: Uuid,
    pub book_title: String,
    pub user_id: String,
    pub user_email: String,
    pub user_name: String,
    pub status: LoanStatus,
    pub issued_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
}
