//! Domain models

pub mod book;
pub mod history;
pub mod reservation;
pub mod user;

pub use book::{Book, BookSummary, BorrowRecord, CreateBook, UpdateBook};
pub use history::{HistoryRecord, LoanStatus};
pub use reservation::{Reservation, ReservationDisplayStatus, ReservationStatus, ReservationView};
pub use user::{CreateUser, Role, Session, UpdateRole, User};
