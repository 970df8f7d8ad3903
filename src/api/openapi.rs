//! OpenAPI documentation

use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{books, circulation, health, reservations, users};
use crate::error::ErrorResponse;
use crate::models::{
    book::{Book, BookSummary, BorrowRecord, CreateBook, UpdateBook},
    history::{HistoryRecord, LoanStatus},
    reservation::{Reservation, ReservationDisplayStatus, ReservationStatus, ReservationView},
    user::{CreateUser, Role, UpdateRole, User},
};
use crate::services::circulation::{ActiveLoan, OverdueLoan};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Athenaeum API",
        version = "0.3.0",
        description = "Library circulation rules engine REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Circulation
        circulation::borrow_book,
        circulation::manual_issue,
        circulation::return_book,
        circulation::my_loans,
        circulation::book_loans,
        circulation::overdue_report,
        circulation::user_history,
        // Reservations
        reservations::reserve_book,
        reservations::cancel_reservation,
        reservations::my_reservations,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_role,
    ),
    components(
        schemas(
            ErrorResponse,
            health::HealthResponse,
            Book,
            BookSummary,
            BorrowRecord,
            CreateBook,
            UpdateBook,
            HistoryRecord,
            LoanStatus,
            Reservation,
            ReservationStatus,
            ReservationDisplayStatus,
            ReservationView,
            User,
            CreateUser,
            UpdateRole,
            Role,
            ActiveLoan,
            OverdueLoan,
            circulation::ManualIssueRequest,
            circulation::ReturnRequest,
            circulation::BorrowResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Service health"),
        (name = "books", description = "Catalog management"),
        (name = "circulation", description = "Borrow and return transactions"),
        (name = "reservations", description = "Low-stock reservations"),
        (name = "users", description = "Account management")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Router serving the Swagger UI and the OpenAPI document
pub fn create_openapi_router() -> Router {
    Router::new().merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
