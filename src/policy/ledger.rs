//! Read-only projections over a book's inventory ledger.
//!
//! The ledger is the per-book available/total counters plus the active
//! borrow record set, treated as one consistency unit. These projections
//! hold no state of their own and must always agree with the book's cached
//! `available_copies` field.

use crate::error::{AppError, AppResult};
use crate::models::book::Book;

pub fn available_count(book: &Book) -> u32 {
    book.available_copies
}

pub fn active_borrow_count(book: &Book) -> u32 {
    book.borrow_records.len() as u32
}

/// Whether `user_id` currently holds a copy of this title
pub fn is_borrowed_by(book: &Book, user_id: &str) -> bool {
    book.borrow_records.iter().any(|r| r.user_id == user_id)
}

/// Validate the ledger invariants after a mutation.
///
/// `0 <= available <= total` and `available == total - |records|`. A failure
/// here is a programmer error in the transaction protocol, not a caller
/// mistake.
pub fn check_invariants(book: &Book) -> AppResult<()> {
    if book.available_copies > book.total_copies {
        return Err(AppError::Invariant(format!(
            "book {}: available {} exceeds total {}",
            book.id, book.available_copies, book.total_copies
        )));
    }
    let expected = book
        .total_copies
        .checked_sub(active_borrow_count(book))
        .ok_or_else(|| {
            AppError::Invariant(format!(
                "book {}: {} active records exceed total {}",
                book.id,
                book.borrow_records.len(),
                book.total_copies
            ))
        })?;
    if book.available_copies != expected {
        return Err(AppError::Invariant(format!(
            "book {}: available {} out of step with total {} minus {} active records",
            book.id,
            book.available_copies,
            book.total_copies,
            book.borrow_records.len()
        )));
    }
    Ok(())
}
