//! In-memory store backend.
//!
//! Serialized access is a per-book async mutex: the availability check and
//! the counter mutation always happen under the same lock, so two racing
//! borrows of the last copy commit in some order and the loser sees the
//! post-commit state. Collection-level maps are guarded separately; the
//! book's own lock is the consistency unit.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::{AppError, AppResult, ReasonCode};
use crate::models::book::Book;
use crate::models::history::{HistoryRecord, LoanStatus};
use crate::models::reservation::{Reservation, ReservationStatus};
use crate::models::user::{Role, User};
use crate::policy::ledger;

use super::{
    BookGuard, BookMutation, BookReservationMutation, BookStore, HistoryStore, ReservationStore,
    UserStore,
};

#[derive(Default)]
pub struct MemoryStore {
    books: RwLock<HashMap<Uuid, Arc<Mutex<Book>>>>,
    history: RwLock<HashMap<Uuid, HistoryRecord>>,
    reservations: RwLock<HashMap<Uuid, Reservation>>,
    users: RwLock<HashMap<String, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn book_not_found() -> AppError {
        AppError::not_found(ReasonCode::NoSuchBook, "Book not found.")
    }

    async fn book_slot(&self, id: Uuid) -> AppResult<Arc<Mutex<Book>>> {
        let books = self.books.read().await;
        books.get(&id).cloned().ok_or_else(Self::book_not_found)
    }
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn get(&self, id: Uuid) -> AppResult<Book> {
        let slot = self.book_slot(id).await?;
        let book = slot.lock().await;
        Ok(book.clone())
    }

    async fn list(&self) -> AppResult<Vec<Book>> {
        let slots: Vec<Arc<Mutex<Book>>> = {
            let books = self.books.read().await;
            books.values().cloned().collect()
        };
        let mut result = Vec::with_capacity(slots.len());
        for slot in slots {
            result.push(slot.lock().await.clone());
        }
        result.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(result)
    }

    async fn insert(&self, book: Book) -> AppResult<()> {
        let mut books = self.books.write().await;
        if books.contains_key(&book.id) {
            return Err(AppError::Conflict(format!(
                "Book {} already exists",
                book.id
            )));
        }
        books.insert(book.id, Arc::new(Mutex::new(book)));
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> AppResult<()> {
        let mut books = self.books.write().await;
        books.remove(&id).ok_or_else(Self::book_not_found)?;
        Ok(())
    }

    async fn with_book(&self, id: Uuid, mutation: BookMutation) -> AppResult<Book> {
        let slot = self.book_slot(id).await?;
        let mut book = slot.lock().await;

        // Mutate a draft so a failed precondition leaves no partial write.
        let mut draft = book.clone();
        mutation(&mut draft)?;
        ledger::check_invariants(&draft)?;
        *book = draft.clone();
        Ok(draft)
    }

    // Lock order everywhere: book mutex first, then the reservations map.
    async fn with_book_and_reservation(
        &self,
        id: Uuid,
        mutation: BookReservationMutation,
    ) -> AppResult<Book> {
        let slot = self.book_slot(id).await?;
        let mut book = slot.lock().await;
        let mut reservations = self.reservations.write().await;

        let active = reservations
            .values()
            .filter(|r| r.book_id == id && r.status == ReservationStatus::Active)
            .min_by_key(|r| r.reserved_at)
            .map(|r| r.id);

        let mut book_draft = book.clone();
        let mut reservation_draft = active.and_then(|rid| reservations.get(&rid).cloned());
        mutation(&mut book_draft, reservation_draft.as_mut())?;
        ledger::check_invariants(&book_draft)?;

        *book = book_draft.clone();
        if let Some(updated) = reservation_draft {
            reservations.insert(updated.id, updated);
        }
        Ok(book_draft)
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn append(&self, record: HistoryRecord) -> AppResult<()> {
        let mut history = self.history.write().await;
        history.insert(record.id, record);
        Ok(())
    }

    async fn mark_returned(
        &self,
        borrow_id: Uuid,
        user_id: &str,
        returned_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut history = self.history.write().await;
        let entry = history
            .values_mut()
            .find(|r| {
                r.borrow_id == borrow_id
                    && r.user_id == user_id
                    && r.status == LoanStatus::Borrowed
            })
            .ok_or_else(|| {
                AppError::not_found(ReasonCode::NoSuchRecord, "History entry not found.")
            })?;
        entry.status = LoanStatus::Returned;
        entry.returned_at = Some(returned_at);
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<HistoryRecord>> {
        let history = self.history.read().await;
        let mut result: Vec<HistoryRecord> = history
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(result)
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn get(&self, id: Uuid) -> AppResult<Reservation> {
        let reservations = self.reservations.read().await;
        reservations.get(&id).cloned().ok_or_else(|| {
            AppError::not_found(ReasonCode::NoSuchReservation, "Reservation not found.")
        })
    }

    async fn set_status(&self, id: Uuid, status: ReservationStatus) -> AppResult<Reservation> {
        let mut reservations = self.reservations.write().await;
        let reservation = reservations.get_mut(&id).ok_or_else(|| {
            AppError::not_found(ReasonCode::NoSuchReservation, "Reservation not found.")
        })?;
        reservation.status = status;
        Ok(reservation.clone())
    }

    async fn create_for_book(
        &self,
        reservation: Reservation,
        guard: BookGuard,
    ) -> AppResult<Reservation> {
        let slot = self.book_slot(reservation.book_id).await?;
        let book = slot.lock().await;
        guard(&*book)?;

        // The book lock stays held across the insert, so the guard's verdict
        // is still true at the instant the reservation is written.
        let mut reservations = self.reservations.write().await;
        let duplicate = reservations.values().any(|r| {
            r.book_id == reservation.book_id
                && r.user_id == reservation.user_id
                && r.status == ReservationStatus::Active
        });
        if duplicate {
            return Err(AppError::Conflict(
                "You have already reserved this book.".to_string(),
            ));
        }
        reservations.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn list_for_user(&self, user_id: &str) -> AppResult<Vec<Reservation>> {
        let reservations = self.reservations.read().await;
        let mut result: Vec<Reservation> = reservations
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.reserved_at.cmp(&a.reserved_at));
        Ok(result)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get(&self, id: &str) -> AppResult<User> {
        let users = self.users.read().await;
        users
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::not_found(ReasonCode::NoSuchUser, "User not found."))
    }

    async fn insert(&self, user: User) -> AppResult<()> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.id) {
            return Err(AppError::Conflict(format!(
                "A user with id {} already exists",
                user.id
            )));
        }
        users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn set_role(&self, id: &str, role: Role) -> AppResult<User> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(ReasonCode::NoSuchUser, "User not found."))?;
        user.role = role;
        Ok(user.clone())
    }

    async fn list(&self) -> AppResult<Vec<User>> {
        let users = self.users.read().await;
        let mut result: Vec<User> = users.values().cloned().collect();
        result.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(result)
    }
}
