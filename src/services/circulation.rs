//! Borrow/return transaction protocol.
//!
//! Every mutation of a book's ledger goes through `BookStore::with_book`, so
//! the precondition checks and the counter delta commit as one atomic unit.
//! The history trail is a secondary write outside that unit: a failure there
//! is logged and does not roll back the ledger (the ledger alone is
//! authoritative; history can be reconciled from it).

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, ReasonCode},
    models::{
        book::{Book, BorrowRecord},
        history::{HistoryRecord, LoanStatus},
        reservation::ReservationStatus,
        user::Session,
    },
    policy::{
        calendar, fines, ledger,
        permissions::{self, Action},
        LOW_STOCK_THRESHOLD,
    },
    store::Store,
};

/// An active loan as shown to its borrower, with the current display fine
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActiveLoan {
    pub book_id: Uuid,
    pub book_title: String,
    pub borrow_id: Uuid,
    pub serial: String,
    pub issued_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    /// Accrued overdue fine at fixed daily rate, open days only
    pub overdue_fine: Decimal,
}

/// One line of the staff overdue report
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OverdueLoan {
    pub book_id: Uuid,
    pub book_title: String,
    pub user_id: String,
    pub borrow_id: Uuid,
    pub due_at: DateTime<Utc>,
    pub fine: Decimal,
}

#[derive(Clone)]
pub struct CirculationService {
    store: Store,
}

impl CirculationService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Borrow a copy for the calling reader
    pub async fn borrow(&self, session: &Session, book_id: Uuid) -> AppResult<BorrowRecord> {
        permissions::authorize(session, Action::Borrow)?;

        let now = Utc::now();
        let record = new_record(session.user_id(), now);
        let staged = record.clone();
        let borrower = session.sub.clone();

        let updated = self
            .store
            .books
            .with_book(
                book_id,
                Box::new(move |book| {
                    if ledger::is_borrowed_by(book, &borrower) {
                        return Err(AppError::precondition(
                            ReasonCode::AlreadyBorrowed,
                            "You have already borrowed this book.",
                        ));
                    }
                    if ledger::available_count(book) == 0 {
                        return Err(AppError::precondition(
                            ReasonCode::NoCopiesAvailable,
                            "No copies available.",
                        ));
                    }
                    book.borrow_records.push(staged);
                    book.available_copies -= 1;
                    Ok(())
                }),
            )
            .await?;

        tracing::info!(
            book_id = %book_id,
            user_id = %session.sub,
            borrow_id = %record.borrow_id,
            "copy borrowed"
        );
        self.append_history(&updated, &record, &session.email, &session.name)
            .await;
        Ok(record)
    }

    /// Issue a copy to `user_id` on behalf of staff.
    ///
    /// Same protocol as [`Self::borrow`], plus the low-stock reservation
    /// check: a title below the threshold with an active reservation may
    /// only be issued to the reserving user, whose reservation is then
    /// collected. Both the check and the `collected` transition happen in
    /// the same atomic unit as the ledger mutation, so a reservation created
    /// or consumed concurrently is never missed.
    pub async fn manual_issue(
        &self,
        session: &Session,
        book_id: Uuid,
        user_id: &str,
    ) -> AppResult<BorrowRecord> {
        permissions::authorize(session, Action::ManualCirculation)?;

        let user = self.store.users.get(user_id).await?;

        let now = Utc::now();
        let record = new_record(&user.id, now);
        let staged = record.clone();
        let borrower = user.id.clone();

        let updated = self
            .store
            .books
            .with_book_and_reservation(
                book_id,
                Box::new(move |book, reservation| {
                    if ledger::is_borrowed_by(book, &borrower) {
                        return Err(AppError::precondition(
                            ReasonCode::AlreadyBorrowed,
                            "You have already borrowed this book.",
                        ));
                    }
                    if ledger::available_count(book) == 0 {
                        return Err(AppError::precondition(
                            ReasonCode::NoCopiesAvailable,
                            "No copies available.",
                        ));
                    }
                    if ledger::available_count(book) < LOW_STOCK_THRESHOLD {
                        if let Some(held) = reservation {
                            if held.user_id != borrower {
                                return Err(AppError::precondition(
                                    ReasonCode::ReservedByAnotherUser,
                                    format!("This book is reserved by {}.", held.user_id),
                                ));
                            }
                            held.status = ReservationStatus::Collected;
                        }
                    }
                    book.borrow_records.push(staged);
                    book.available_copies -= 1;
                    Ok(())
                }),
            )
            .await?;

        tracing::info!(
            book_id = %book_id,
            user_id = %user.id,
            issuer = %session.sub,
            borrow_id = %record.borrow_id,
            "copy issued manually"
        );

        self.append_history(&updated, &record, &user.email, &user.display_name)
            .await;
        Ok(record)
    }

    /// Return a borrowed copy.
    ///
    /// Readers return their own copies; staff accept returns for any user by
    /// passing `for_user`. Late returns are rejected outright, never fined
    /// here: assessment of late copies is an in-person process.
    pub async fn return_book(
        &self,
        session: &Session,
        book_id: Uuid,
        borrow_id: Uuid,
        for_user: Option<&str>,
    ) -> AppResult<Book> {
        let target = match for_user {
            Some(uid) if uid != session.user_id() => {
                permissions::authorize(session, Action::ManualCirculation)?;
                uid.to_string()
            }
            _ => {
                permissions::authorize(session, Action::Return)?;
                session.sub.clone()
            }
        };

        let now = Utc::now();
        let holder = target.clone();

        let updated = self
            .store
            .books
            .with_book(
                book_id,
                Box::new(move |book| {
                    let index = book
                        .borrow_records
                        .iter()
                        .position(|r| r.borrow_id == borrow_id && r.user_id == holder)
                        .ok_or_else(|| {
                            AppError::not_found(
                                ReasonCode::NoSuchRecord,
                                "Borrow record not found or does not belong to you.",
                            )
                        })?;
                    let due_at = book.borrow_records[index].due_at;
                    if fines::is_late_return(due_at, now) {
                        return Err(AppError::precondition(
                            ReasonCode::LateReturn,
                            format!(
                                "This copy was due on {} and can no longer be returned here. \
                                 Please see a librarian.",
                                due_at.format("%Y-%m-%d")
                            ),
                        ));
                    }
                    book.borrow_records.remove(index);
                    book.available_copies += 1;
                    Ok(())
                }),
            )
            .await?;

        tracing::info!(book_id = %book_id, user_id = %target, borrow_id = %borrow_id, "copy returned");

        if let Err(e) = self
            .store
            .history
            .mark_returned(borrow_id, &target, now)
            .await
        {
            tracing::error!(borrow_id = %borrow_id, "failed to update borrow history: {}", e);
        }
        Ok(updated)
    }

    /// Active loans of the calling user, with display fines
    pub async fn my_loans(&self, session: &Session) -> AppResult<Vec<ActiveLoan>> {
        self.loans_of(session.user_id()).await
    }

    /// Active loans on one book (staff view)
    pub async fn book_loans(&self, session: &Session, book_id: Uuid) -> AppResult<Vec<BorrowRecord>> {
        permissions::authorize(session, Action::ViewReports)?;
        let book = self.store.books.get(book_id).await?;
        Ok(book.borrow_records)
    }

    /// All active loans past their due date, with accrued fines (staff view)
    pub async fn overdue_report(&self, session: &Session) -> AppResult<Vec<OverdueLoan>> {
        permissions::authorize(session, Action::ViewReports)?;
        let now = Utc::now();
        let mut report = Vec::new();
        for book in self.store.books.list().await? {
            for record in &book.borrow_records {
                let fine = fines::overdue_fine(record.due_at, now);
                if fine > Decimal::ZERO {
                    report.push(OverdueLoan {
                        book_id: book.id,
                        book_title: book.title.clone(),
                        user_id: record.user_id.clone(),
                        borrow_id: record.borrow_id,
                        due_at: record.due_at,
                        fine,
                    });
                }
            }
        }
        report.sort_by(|a, b| a.due_at.cmp(&b.due_at));
        Ok(report)
    }

    /// Borrow history of a user: one's own, or any user for staff
    pub async fn history_for_user(
        &self,
        session: &Session,
        user_id: &str,
    ) -> AppResult<Vec<HistoryRecord>> {
        if user_id != session.user_id() {
            permissions::authorize(session, Action::ViewUsers)?;
        }
        self.store.history.list_for_user(user_id).await
    }

    async fn loans_of(&self, user_id: &str) -> AppResult<Vec<ActiveLoan>> {
        let now = Utc::now();
        let mut loans = Vec::new();
        for book in self.store.books.list().await? {
            for record in book.borrow_records.iter().filter(|r| r.user_id == user_id) {
                loans.push(ActiveLoan {
                    book_id: book.id,
                    book_title: book.title.clone(),
                    borrow_id: record.borrow_id,
                    serial: record.serial.clone(),
                    issued_at: record.issued_at,
                    due_at: record.due_at,
                    overdue_fine: fines::overdue_fine(record.due_at, now),
                });
            }
        }
        loans.sort_by(|a, b| a.due_at.cmp(&b.due_at));
        Ok(loans)
    }

    async fn append_history(
        &self,
        book: &Book,
        record: &BorrowRecord,
        email: &str,
        display_name: &str,
    ) {
        let entry = HistoryRecord {
            id: Uuid::new_v4(),
            borrow_id: record.borrow_id,
            book_id: book.id,
            book_title: book.title.clone(),
            user_id: record.user_id.clone(),
            user_email: email.to_string(),
            user_name: display_name.to_string(),
            status: LoanStatus::Borrowed,
            issued_at: record.issued_at,
            due_at: record.due_at,
            returned_at: None,
        };
        if let Err(e) = self.store.history.append(entry).await {
            tracing::error!(borrow_id = %record.borrow_id, "failed to append borrow history: {}", e);
        }
    }
}

fn new_record(user_id: &str, now: DateTime<Utc>) -> BorrowRecord {
    BorrowRecord {
        borrow_id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        serial: new_serial(),
        issued_at: now,
        due_at: calendar::due_date(now),
    }
}

/// Cosmetic traceability serial printed on the issue slip
fn new_serial() -> String {
    let tail: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("SN-{}", tail.to_uppercase())
}
