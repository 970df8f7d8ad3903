//! Reservation model and status handling

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Persisted reservation status.
///
/// `expired` is intentionally absent: expiry is a derived display state
/// computed against "today", never written by any transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Active,
    Collected,
    Cancelled,
}

/// Display status, including derived expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReservationDisplayStatus {
    Active,
    Collected,
    Cancelled,
    Expired,
}

/// A claim on a not-yet-available copy of a low-stock title
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Reservation {
    pub id: Uuid,
    pub book_id: Uuid,
    pub book_title: String,
    pub user_id: String,
    pub reserved_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub status: ReservationStatus,
}

impl Reservation {
    /// Status as shown to callers: an active reservation past its deadline
    /// displays as expired without any stored transition.
    pub fn display_status(&self, today: DateTime<Utc>) -> ReservationDisplayStatus {
        match self.status {
            ReservationStatus::Active if today > self.deadline => {
                ReservationDisplayStatus::Expired
            }
            ReservationStatus::Active => ReservationDisplayStatus::Active,
            ReservationStatus::Collected => ReservationDisplayStatus::Collected,
            ReservationStatus::Cancelled => ReservationDisplayStatus::Cancelled,
        }
    }

    pub fn view(&self, today: DateTime<Utc>) -> ReservationView {
        ReservationView {
            id: self.id,
            book_id: self.book_id,
            book_title: self.book_title.clone(),
            user_id: self.user_id.clone(),
            reserved_at: self.reserved_at,
            deadline: self.deadline,
            status: self.display_status(today),
        }
    }
}

/// Reservation as rendered for callers, with the derived display status
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReservationView {
    pub id: Uuid,
    pub book_id: Uuid,
    pub book_title: String,
    pub user_id: String,
    pub reserved_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub status: ReservationDisplayStatus,
}
