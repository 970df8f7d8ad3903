//! Catalog management service

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult, ReasonCode},
    models::{
        book::{Book, BookSummary, CreateBook, UpdateBook},
        user::Session,
    },
    policy::{
        ledger,
        permissions::{self, Action},
    },
    store::Store,
};

#[derive(Clone)]
pub struct CatalogService {
    store: Store,
}

impl CatalogService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Browse the catalog. Summaries carry the cached availability counter
    /// so no record list is loaded for display.
    pub async fn list_books(&self) -> AppResult<Vec<BookSummary>> {
        let books = self.store.books.list().await?;
        Ok(books.iter().map(Book::summary).collect())
    }

    pub async fn get_book(&self, id: Uuid) -> AppResult<Book> {
        self.store.books.get(id).await
    }

    /// Add a catalog entry (staff only)
    pub async fn create_book(&self, session: &Session, request: CreateBook) -> AppResult<Book> {
        permissions::authorize(session, Action::ManageBooks)?;
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let book = Book::new(request, Utc::now());
        self.store.books.insert(book.clone()).await?;

        tracing::info!(book_id = %book.id, title = %book.title, "book created");
        Ok(book)
    }

    /// Update a catalog entry (staff only).
    ///
    /// Changing the total copy count re-derives the available counter and is
    /// rejected below the active loan count, so the ledger invariant holds.
    pub async fn update_book(
        &self,
        session: &Session,
        id: Uuid,
        request: UpdateBook,
    ) -> AppResult<Book> {
        permissions::authorize(session, Action::ManageBooks)?;
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let updated = self
            .store
            .books
            .with_book(
                id,
                Box::new(move |book| {
                    if let Some(title) = request.title {
                        book.title = title;
                    }
                    if let Some(author) = request.author {
                        book.author = author;
                    }
                    if let Some(genre) = request.genre {
                        book.genre = Some(genre);
                    }
                    if let Some(rack) = request.rack {
                        book.rack = Some(rack);
                    }
                    if let Some(total) = request.total_copies {
                        let active = ledger::active_borrow_count(book);
                        if total < active {
                            return Err(AppError::precondition(
                                ReasonCode::BookHasActiveLoans,
                                format!(
                                    "Cannot reduce total copies below the {} currently on loan.",
                                    active
                                ),
                            ));
                        }
                        book.total_copies = total;
                        book.available_copies = total - active;
                    }
                    Ok(())
                }),
            )
            .await?;

        tracing::info!(book_id = %id, "book updated");
        Ok(updated)
    }

    /// Delete a catalog entry (staff only); rejected while copies are on loan
    pub async fn delete_book(&self, session: &Session, id: Uuid) -> AppResult<()> {
        permissions::authorize(session, Action::ManageBooks)?;

        let book = self.store.books.get(id).await?;
        if ledger::active_borrow_count(&book) > 0 {
            return Err(AppError::precondition(
                ReasonCode::BookHasActiveLoans,
                "Cannot delete a book while copies are on loan.",
            ));
        }
        self.store.books.remove(id).await?;

        tracing::info!(book_id = %id, "book deleted");
        Ok(())
    }
}
