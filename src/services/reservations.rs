//! Reservation service

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, ReasonCode},
    models::{
        reservation::{Reservation, ReservationStatus, ReservationView},
        user::Session,
    },
    policy::{
        calendar, ledger,
        permissions::{self, Action},
        LOW_STOCK_THRESHOLD,
    },
    store::Store,
};

#[derive(Clone)]
pub struct ReservationsService {
    store: Store,
}

impl ReservationsService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Reserve a low-stock title for the calling reader.
    ///
    /// Only titles with strictly between zero and the low-stock threshold
    /// available copies are reservable. No copy is decremented: a
    /// reservation is a claim, not a loan. The stock preconditions are
    /// re-checked against the freshly-read book inside the store's
    /// serialized unit, so a racing borrow or return cannot slip an active
    /// reservation onto an out-of-stock or plentiful title.
    pub async fn reserve(&self, session: &Session, book_id: Uuid) -> AppResult<Reservation> {
        permissions::authorize(session, Action::Reserve)?;

        // Read once for the title; the guard below sees the current state.
        let book = self.store.books.get(book_id).await?;

        let now = Utc::now();
        let reservation = Reservation {
            id: Uuid::new_v4(),
            book_id,
            book_title: book.title.clone(),
            user_id: session.sub.clone(),
            reserved_at: now,
            deadline: calendar::reservation_deadline(now),
            status: ReservationStatus::Active,
        };
        let created = self
            .store
            .reservations
            .create_for_book(
                reservation,
                Box::new(|book| {
                    let available = ledger::available_count(book);
                    if available == 0 {
                        return Err(AppError::precondition(
                            ReasonCode::OutOfStock,
                            "This book is out of stock.",
                        ));
                    }
                    if available >= LOW_STOCK_THRESHOLD {
                        return Err(AppError::precondition(
                            ReasonCode::NotLowStock,
                            "This book is not low in stock.",
                        ));
                    }
                    Ok(())
                }),
            )
            .await?;

        tracing::info!(
            book_id = %book_id,
            user_id = %session.sub,
            reservation_id = %created.id,
            deadline = %created.deadline,
            "book reserved"
        );
        Ok(created)
    }

    /// Cancel one's own reservation. No inventory side effect: no copy was
    /// ever decremented for it.
    pub async fn cancel(&self, session: &Session, reservation_id: Uuid) -> AppResult<()> {
        permissions::authorize(session, Action::CancelReservation)?;

        let reservation = self.store.reservations.get(reservation_id).await?;
        if reservation.user_id != session.user_id() {
            return Err(AppError::not_found(
                ReasonCode::NoSuchReservation,
                "Reservation not found or does not belong to you.",
            ));
        }
        if reservation.status != ReservationStatus::Active {
            return Err(AppError::Conflict(
                "This reservation is no longer active.".to_string(),
            ));
        }
        self.store
            .reservations
            .set_status(reservation_id, ReservationStatus::Cancelled)
            .await?;

        tracing::info!(reservation_id = %reservation_id, user_id = %session.sub, "reservation cancelled");
        Ok(())
    }

    /// Reservations of the calling user, with derived display status
    pub async fn my_reservations(&self, session: &Session) -> AppResult<Vec<ReservationView>> {
        let now = Utc::now();
        let reservations = self
            .store
            .reservations
            .list_for_user(session.user_id())
            .await?;
        Ok(reservations.iter().map(|r| r.view(now)).collect())
    }
}
