//! End-to-end circulation tests over the in-memory store

use chrono::{Duration, Utc};
use uuid::Uuid;

use athenaeum_server::{
    error::{AppError, ReasonCode},
    models::{
        book::{Book, BorrowRecord, CreateBook},
        history::LoanStatus,
        reservation::ReservationDisplayStatus,
        user::{CreateUser, Role, Session},
    },
    services::Services,
    store::Store,
};

fn session(id: &str, role: Role) -> Session {
    Session {
        sub: id.to_string(),
        name: format!("{} Test", id),
        email: format!("{}@example.com", id),
        role,
        exp: 0,
        iat: 0,
    }
}

fn admin() -> Session {
    session("admin-1", Role::Admin)
}

fn librarian() -> Session {
    session("lib-1", Role::Librarian)
}

fn setup() -> (Services, Store) {
    let store = Store::in_memory();
    (Services::new(store.clone()), store)
}

async fn add_book(services: &Services, title: &str, copies: u32) -> Book {
    services
        .catalog
        .create_book(
            &admin(),
            CreateBook {
                title: title.to_string(),
                author: "Test Author".to_string(),
                genre: None,
                rack: None,
                total_copies: copies,
            },
        )
        .await
        .expect("book creation failed")
}

async fn add_reader(services: &Services, id: &str) -> Session {
    services
        .users
        .create_user(
            &admin(),
            CreateUser {
                id: id.to_string(),
                email: format!("{}@example.com", id),
                display_name: format!("{} Test", id),
                role: Role::Reader,
            },
        )
        .await
        .expect("user creation failed");
    session(id, Role::Reader)
}

#[tokio::test]
async fn borrow_decrements_and_sets_a_future_due_date() {
    let (services, _) = setup();
    let book = add_book(&services, "Dune", 3).await;
    let reader = add_reader(&services, "reader-1").await;

    let record = services.circulation.borrow(&reader, book.id).await.unwrap();
    assert!(record.due_at > record.issued_at);

    let after = services.catalog.get_book(book.id).await.unwrap();
    assert_eq!(after.available_copies, 2);
    assert_eq!(after.total_copies, 3);
    assert_eq!(after.borrow_records.len(), 1);
}

#[tokio::test]
async fn a_user_cannot_hold_two_copies_of_one_title() {
    let (services, _) = setup();
    let book = add_book(&services, "Dune", 3).await;
    let reader = add_reader(&services, "reader-1").await;

    services.circulation.borrow(&reader, book.id).await.unwrap();
    let err = services
        .circulation
        .borrow(&reader, book.id)
        .await
        .unwrap_err();
    assert_eq!(err.reason_code(), ReasonCode::AlreadyBorrowed);

    let after = services.catalog.get_book(book.id).await.unwrap();
    assert_eq!(after.available_copies, 2);
    assert_eq!(after.borrow_records.len(), 1);
}

#[tokio::test]
async fn borrowing_with_no_copies_fails_and_changes_nothing() {
    let (services, _) = setup();
    let book = add_book(&services, "Dune", 1).await;
    let first = add_reader(&services, "reader-1").await;
    let second = add_reader(&services, "reader-2").await;

    services.circulation.borrow(&first, book.id).await.unwrap();
    let err = services
        .circulation
        .borrow(&second, book.id)
        .await
        .unwrap_err();
    assert_eq!(err.reason_code(), ReasonCode::NoCopiesAvailable);
    assert_eq!(err.to_string(), "No copies available.");

    let after = services.catalog.get_book(book.id).await.unwrap();
    assert_eq!(after.available_copies, 0);
    assert_eq!(after.borrow_records.len(), 1);
}

#[tokio::test]
async fn concurrent_borrows_of_the_last_copy_have_exactly_one_winner() {
    let (services, _) = setup();
    let book = add_book(&services, "Dune", 1).await;
    let first = add_reader(&services, "reader-1").await;
    let second = add_reader(&services, "reader-2").await;

    let (a, b) = tokio::join!(
        services.circulation.borrow(&first, book.id),
        services.circulation.borrow(&second, book.id),
    );

    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert_eq!(loser.reason_code(), ReasonCode::NoCopiesAvailable);

    let after = services.catalog.get_book(book.id).await.unwrap();
    assert_eq!(after.available_copies, 0);
    assert_eq!(after.borrow_records.len(), 1);
}

#[tokio::test]
async fn a_returned_copy_can_be_borrowed_again() {
    let (services, _) = setup();
    let book = add_book(&services, "Dune", 1).await;
    let first = add_reader(&services, "reader-1").await;
    let second = add_reader(&services, "reader-2").await;

    let record = services.circulation.borrow(&first, book.id).await.unwrap();
    services
        .circulation
        .return_book(&first, book.id, record.borrow_id, None)
        .await
        .unwrap();

    let between = services.catalog.get_book(book.id).await.unwrap();
    assert_eq!(between.available_copies, 1);

    services.circulation.borrow(&second, book.id).await.unwrap();
    let after = services.catalog.get_book(book.id).await.unwrap();
    assert_eq!(after.available_copies, 0);
}

#[tokio::test]
async fn returning_an_unknown_record_is_rejected() {
    let (services, _) = setup();
    let book = add_book(&services, "Dune", 1).await;
    let reader = add_reader(&services, "reader-1").await;

    let err = services
        .circulation
        .return_book(&reader, book.id, Uuid::new_v4(), None)
        .await
        .unwrap_err();
    assert_eq!(err.reason_code(), ReasonCode::NoSuchRecord);
}

#[tokio::test]
async fn returning_someone_elses_copy_is_rejected() {
    let (services, _) = setup();
    let book = add_book(&services, "Dune", 2).await;
    let first = add_reader(&services, "reader-1").await;
    let second = add_reader(&services, "reader-2").await;

    let record = services.circulation.borrow(&first, book.id).await.unwrap();
    let err = services
        .circulation
        .return_book(&second, book.id, record.borrow_id, None)
        .await
        .unwrap_err();
    assert_eq!(err.reason_code(), ReasonCode::NoSuchRecord);
}

#[tokio::test]
async fn late_returns_are_rejected_outright() {
    let (services, store) = setup();
    let book = add_book(&services, "Dune", 2).await;
    let reader = add_reader(&services, "reader-1").await;

    // Seed a loan whose due date is long past the grace cutoff.
    let borrow_id = Uuid::new_v4();
    let issued_at = Utc::now() - Duration::days(44);
    let due_at = Utc::now() - Duration::days(30);
    store
        .books
        .with_book(
            book.id,
            Box::new(move |b| {
                b.borrow_records.push(BorrowRecord {
                    borrow_id,
                    user_id: "reader-1".to_string(),
                    serial: "SN-OLDLOAN".to_string(),
                    issued_at,
                    due_at,
                });
                b.available_copies -= 1;
                Ok(())
            }),
        )
        .await
        .unwrap();

    let err = services
        .circulation
        .return_book(&reader, book.id, borrow_id, None)
        .await
        .unwrap_err();
    assert_eq!(err.reason_code(), ReasonCode::LateReturn);
    assert!(err.to_string().contains(&due_at.format("%Y-%m-%d").to_string()));

    // The rejected return left the ledger untouched.
    let after = services.catalog.get_book(book.id).await.unwrap();
    assert_eq!(after.available_copies, 1);
    assert_eq!(after.borrow_records.len(), 1);
}

#[tokio::test]
async fn staff_accept_returns_on_behalf_of_readers() {
    let (services, _) = setup();
    let book = add_book(&services, "Dune", 1).await;
    let reader = add_reader(&services, "reader-1").await;

    let record = services.circulation.borrow(&reader, book.id).await.unwrap();
    services
        .circulation
        .return_book(&librarian(), book.id, record.borrow_id, Some("reader-1"))
        .await
        .unwrap();

    let after = services.catalog.get_book(book.id).await.unwrap();
    assert_eq!(after.available_copies, 1);
}

#[tokio::test]
async fn history_follows_the_loan_lifecycle() {
    let (services, _) = setup();
    let book = add_book(&services, "Dune", 1).await;
    let reader = add_reader(&services, "reader-1").await;

    let record = services.circulation.borrow(&reader, book.id).await.unwrap();
    let history = services
        .circulation
        .history_for_user(&reader, "reader-1")
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, LoanStatus::Borrowed);
    assert_eq!(history[0].borrow_id, record.borrow_id);
    assert_eq!(history[0].book_title, "Dune");

    services
        .circulation
        .return_book(&reader, book.id, record.borrow_id, None)
        .await
        .unwrap();
    let history = services
        .circulation
        .history_for_user(&reader, "reader-1")
        .await
        .unwrap();
    assert_eq!(history[0].status, LoanStatus::Returned);
    assert!(history[0].returned_at.is_some());
}

#[tokio::test]
async fn reservations_require_low_stock() {
    let (services, _) = setup();
    let reader = add_reader(&services, "reader-1").await;

    let plentiful = add_book(&services, "Dune", 10).await;
    let err = services
        .reservations
        .reserve(&reader, plentiful.id)
        .await
        .unwrap_err();
    assert_eq!(err.reason_code(), ReasonCode::NotLowStock);

    let scarce = add_book(&services, "Hyperion", 1).await;
    let other = add_reader(&services, "reader-2").await;
    services.circulation.borrow(&other, scarce.id).await.unwrap();
    let err = services
        .reservations
        .reserve(&reader, scarce.id)
        .await
        .unwrap_err();
    assert_eq!(err.reason_code(), ReasonCode::OutOfStock);

    let low = add_book(&services, "Solaris", 3).await;
    let reservation = services.reservations.reserve(&reader, low.id).await.unwrap();
    assert!(reservation.deadline > reservation.reserved_at);
}

#[tokio::test]
async fn a_book_cannot_be_reserved_twice_by_the_same_user() {
    let (services, _) = setup();
    let reader = add_reader(&services, "reader-1").await;
    let book = add_book(&services, "Solaris", 3).await;

    services.reservations.reserve(&reader, book.id).await.unwrap();
    let err = services
        .reservations
        .reserve(&reader, book.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn manual_issue_honors_an_active_reservation() {
    let (services, _) = setup();
    let book = add_book(&services, "Solaris", 3).await;
    let holder = add_reader(&services, "reader-1").await;
    add_reader(&services, "reader-2").await;

    services.reservations.reserve(&holder, book.id).await.unwrap();

    // Issuing the low-stock title to someone else is rejected, and the
    // rejection leaves both the ledger and the reservation untouched.
    let err = services
        .circulation
        .manual_issue(&librarian(), book.id, "reader-2")
        .await
        .unwrap_err();
    assert_eq!(err.reason_code(), ReasonCode::ReservedByAnotherUser);
    let after = services.catalog.get_book(book.id).await.unwrap();
    assert_eq!(after.available_copies, 3);
    assert!(after.borrow_records.is_empty());
    let held = services.reservations.my_reservations(&holder).await.unwrap();
    assert_eq!(held[0].status, ReservationDisplayStatus::Active);

    // Issuing it to the reserving user collects the reservation.
    services
        .circulation
        .manual_issue(&librarian(), book.id, "reader-1")
        .await
        .unwrap();
    let reservations = services.reservations.my_reservations(&holder).await.unwrap();
    assert_eq!(reservations.len(), 1);
    assert_eq!(reservations[0].status, ReservationDisplayStatus::Collected);
}

#[tokio::test]
async fn cancelling_a_reservation_requires_ownership() {
    let (services, _) = setup();
    let book = add_book(&services, "Solaris", 3).await;
    let owner = add_reader(&services, "reader-1").await;
    let other = add_reader(&services, "reader-2").await;

    let reservation = services.reservations.reserve(&owner, book.id).await.unwrap();

    let err = services
        .reservations
        .cancel(&other, reservation.id)
        .await
        .unwrap_err();
    assert_eq!(err.reason_code(), ReasonCode::NoSuchReservation);

    services.reservations.cancel(&owner, reservation.id).await.unwrap();
    let mine = services.reservations.my_reservations(&owner).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].status, ReservationDisplayStatus::Cancelled);

    // Cancellation frees the slot, so the title can be reserved again.
    services.reservations.reserve(&owner, book.id).await.unwrap();
}

#[tokio::test]
async fn reservation_views_serialize_in_the_wire_format() {
    let (services, _) = setup();
    let book = add_book(&services, "Solaris", 3).await;
    let reader = add_reader(&services, "reader-1").await;
    services.reservations.reserve(&reader, book.id).await.unwrap();

    let mine = services.reservations.my_reservations(&reader).await.unwrap();
    let value = serde_json::to_value(&mine[0]).unwrap();
    assert_eq!(value["status"], "active");
    assert_eq!(value["book_title"], "Solaris");
    assert_eq!(value["user_id"], "reader-1");
}

#[tokio::test]
async fn staff_do_not_self_borrow_and_readers_do_not_manage() {
    let (services, _) = setup();
    let book = add_book(&services, "Dune", 3).await;

    let err = services
        .circulation
        .borrow(&librarian(), book.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));

    let reader = add_reader(&services, "reader-1").await;
    let err = services
        .catalog
        .create_book(
            &reader,
            CreateBook {
                title: "Sneaky".to_string(),
                author: "Nobody".to_string(),
                genre: None,
                rack: None,
                total_copies: 1,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));
}

#[tokio::test]
async fn librarians_cannot_create_staff_accounts() {
    let (services, _) = setup();

    let err = services
        .users
        .create_user(
            &librarian(),
            CreateUser {
                id: "new-admin".to_string(),
                email: "new-admin@example.com".to_string(),
                display_name: "New Admin".to_string(),
                role: Role::Admin,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authorization(_)));

    // Readers are fine.
    services
        .users
        .create_user(
            &librarian(),
            CreateUser {
                id: "new-reader".to_string(),
                email: "new-reader@example.com".to_string(),
                display_name: "New Reader".to_string(),
                role: Role::Reader,
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn admins_cannot_change_their_own_role() {
    let (services, _) = setup();
    services
        .users
        .create_user(
            &admin(),
            CreateUser {
                id: "admin-1".to_string(),
                email: "admin-1@example.com".to_string(),
                display_name: "Admin One".to_string(),
                role: Role::Admin,
            },
        )
        .await
        .unwrap();

    let err = services
        .users
        .change_role(&admin(), "admin-1", Role::Reader)
        .await
        .unwrap_err();
    assert_eq!(err.reason_code(), ReasonCode::SelfRoleChange);
}

#[tokio::test]
async fn total_copies_cannot_drop_below_active_loans() {
    let (services, _) = setup();
    let book = add_book(&services, "Dune", 2).await;
    let first = add_reader(&services, "reader-1").await;
    let second = add_reader(&services, "reader-2").await;
    services.circulation.borrow(&first, book.id).await.unwrap();
    services.circulation.borrow(&second, book.id).await.unwrap();

    let err = services
        .catalog
        .update_book(
            &admin(),
            book.id,
            athenaeum_server::models::book::UpdateBook {
                title: None,
                author: None,
                genre: None,
                rack: None,
                total_copies: Some(1),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.reason_code(), ReasonCode::BookHasActiveLoans);

    // Raising it re-derives availability.
    let updated = services
        .catalog
        .update_book(
            &admin(),
            book.id,
            athenaeum_server::models::book::UpdateBook {
                title: None,
                author: None,
                genre: None,
                rack: None,
                total_copies: Some(5),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.total_copies, 5);
    assert_eq!(updated.available_copies, 3);
}

#[tokio::test]
async fn books_on_loan_cannot_be_deleted() {
    let (services, _) = setup();
    let book = add_book(&services, "Dune", 1).await;
    let reader = add_reader(&services, "reader-1").await;
    let record = services.circulation.borrow(&reader, book.id).await.unwrap();

    let err = services.catalog.delete_book(&admin(), book.id).await.unwrap_err();
    assert_eq!(err.reason_code(), ReasonCode::BookHasActiveLoans);

    services
        .circulation
        .return_book(&reader, book.id, record.borrow_id, None)
        .await
        .unwrap();
    services.catalog.delete_book(&admin(), book.id).await.unwrap();

    let err = services.catalog.get_book(book.id).await.unwrap_err();
    assert_eq!(err.reason_code(), ReasonCode::NoSuchBook);
}

#[tokio::test]
async fn overdue_report_lists_late_loans_with_fines() {
    let (services, store) = setup();
    let book = add_book(&services, "Dune", 2).await;
    add_reader(&services, "reader-1").await;

    let borrow_id = Uuid::new_v4();
    let due_at = Utc::now() - Duration::days(10);
    store
        .books
        .with_book(
            book.id,
            Box::new(move |b| {
                b.borrow_records.push(BorrowRecord {
                    borrow_id,
                    user_id: "reader-1".to_string(),
                    serial: "SN-OVERDUE".to_string(),
                    issued_at: due_at - Duration::days(14),
                    due_at,
                });
                b.available_copies -= 1;
                Ok(())
            }),
        )
        .await
        .unwrap();

    let report = services.circulation.overdue_report(&librarian()).await.unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].user_id, "reader-1");
    assert!(report[0].fine > rust_decimal::Decimal::ZERO);

    // Readers may not see the report.
    let reader = session("reader-1", Role::Reader);
    assert!(services.circulation.overdue_report(&reader).await.is_err());
}
