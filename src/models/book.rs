//! Book (catalog entry) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// One active loan of one copy.
///
/// Created by a successful borrow transaction, removed by a successful
/// return; never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowRecord {
    /// Unique borrow identifier, generated at borrow time
    pub borrow_id: Uuid,
    /// Borrower account identifier
    pub user_id: String,
    /// Traceability serial printed on the issue slip
    pub serial: String,
    pub issued_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
}

/// Catalog entry owning the per-title inventory ledger.
///
/// `available_copies` is a maintained denormalization of
/// `total_copies - borrow_records.len()`; every mutating transaction keeps it
/// in step, it is never recomputed lazily from the record list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    /// Rack/location label inside the library
    pub rack: Option<String>,
    pub total_copies: u32,
    pub available_copies: u32,
    pub borrow_records: Vec<BorrowRecord>,
    pub created_at: DateTime<Utc>,
}

impl Book {
    /// Create a new catalog entry with all copies available
    pub fn new(request: CreateBook, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: request.title,
            author: request.author,
            genre: request.genre,
            rack: request.rack,
            total_copies: request.total_copies,
            available_copies: request.total_copies,
            borrow_records: Vec::new(),
            created_at: now,
        }
    }

    pub fn summary(&self) -> BookSummary {
        BookSummary {
            id: self.id,
            title: self.title.clone(),
            author: self.author.clone(),
            genre: self.genre.clone(),
            rack: self.rack.clone(),
            total_copies: self.total_copies,
            available_copies: self.available_copies,
        }
    }
}

/// Short book representation for lists.
///
/// Carries the cached `available_copies` so list views never need to load
/// the borrow record collection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookSummary {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub rack: Option<String>,
    pub total_copies: u32,
    pub available_copies: u32,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author must not be empty"))]
    pub author: String,
    pub genre: Option<String>,
    pub rack: Option<String>,
    pub total_copies: u32,
}

/// Update book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title must not be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Author must not be empty"))]
    pub author: Option<String>,
    pub genre: Option<String>,
    pub rack: Option<String>,
    /// New total copy count; rejected below the current active loan count
    pub total_copies: Option<u32>,
}
