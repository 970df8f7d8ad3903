//! Document-store contract.
//!
//! The rules engine treats persistence as an external collaborator: these
//! traits are the whole contract, and the bundled [`memory::MemoryStore`]
//! backend honors it with per-book serialized access. Any backend must give
//! [`BookStore::with_book`] read-modify-write atomicity per book: two
//! concurrent mutations of the same book serialize so that neither observes
//! the other's intermediate state. The reservation-affecting operations
//! ([`BookStore::with_book_and_reservation`],
//! [`ReservationStore::create_for_book`]) extend that unit across the book
//! and its reservation, so backends need a multi-document transaction for
//! those two.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::book::Book;
use crate::models::history::HistoryRecord;
use crate::models::reservation::{Reservation, ReservationStatus};
use crate::models::user::{Role, User};

/// Mutation applied to a book under serialized access. Returning an error
/// aborts the transaction with no partial write.
pub type BookMutation = Box<dyn FnOnce(&mut Book) -> AppResult<()> + Send>;

/// Read-only precondition check run against a freshly-read book under its
/// serialized access.
pub type BookGuard = Box<dyn FnOnce(&Book) -> AppResult<()> + Send>;

/// Mutation over a book and its active reservation (if any) as one unit.
/// Both commit or neither does.
pub type BookReservationMutation =
    Box<dyn FnOnce(&mut Book, Option<&mut Reservation>) -> AppResult<()> + Send>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn get(&self, id: Uuid) -> AppResult<Book>;
    async fn list(&self) -> AppResult<Vec<Book>>;
    async fn insert(&self, book: Book) -> AppResult<()>;
    async fn remove(&self, id: Uuid) -> AppResult<()>;
    /// Atomic read-modify-write against one book. The ledger invariants are
    /// validated before commit; a violation aborts without writing.
    async fn with_book(&self, id: Uuid, mutation: BookMutation) -> AppResult<Book>;
    /// Atomic read-modify-write against one book and its active reservation.
    /// The mutation sees the earliest active reservation on the book, and
    /// changes to both documents commit together or not at all. Hosted
    /// backends must supply a multi-document transaction here.
    async fn with_book_and_reservation(
        &self,
        id: Uuid,
        mutation: BookReservationMutation,
    ) -> AppResult<Book>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, record: HistoryRecord) -> AppResult<()>;
    /// Mark the entry matching (borrow_id, user_id) with status `borrowed`
    /// as returned at `returned_at`
    async fn mark_returned(
        &self,
        borrow_id: Uuid,
        user_id: &str,
        returned_at: DateTime<Utc>,
    ) -> AppResult<()>;
    async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<HistoryRecord>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn get(&self, id: Uuid) -> AppResult<Reservation>;
    async fn set_status(&self, id: Uuid, status: ReservationStatus) -> AppResult<Reservation>;
    /// Create a reservation under the book's serialized access. `guard` runs
    /// against the freshly-read book and aborts the creation on error, so the
    /// stock preconditions hold at the instant the reservation is written.
    /// At most one active reservation per (book, user) pair; a duplicate is
    /// rejected as a conflict. Hosted backends must supply a multi-document
    /// transaction here.
    async fn create_for_book(
        &self,
        reservation: Reservation,
        guard: BookGuard,
    ) -> AppResult<Reservation>;
    async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<Reservation>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, id: &str) -> AppResult<User>;
    async fn insert(&self, user: User) -> AppResult<()>;
    async fn set_role(&self, id: &str, role: Role) -> AppResult<User>;
    async fn list(&self) -> AppResult<Vec<User>>;
}

/// Container handing each service the stores it needs
#[derive(Clone)]
pub struct Store {
    pub books: Arc<dyn BookStore>,
    pub history: Arc<dyn HistoryStore>,
    pub reservations: Arc<dyn ReservationStore>,
    pub users: Arc<dyn UserStore>,
}

impl Store {
    /// Store backed by the bundled in-memory backend
    pub fn in_memory() -> Self {
        let backend = Arc::new(memory::MemoryStore::new());
        Self {
            books: backend.clone(),
            history: backend.clone(),
            reservations: backend.clone(),
            users: backend,
        }
    }
}
