//! Borrow/return endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{book::BorrowRecord, history::HistoryRecord},
    services::circulation::{ActiveLoan, OverdueLoan},
};

use super::AuthenticatedUser;

/// Manual issue request (staff on behalf of a user)
#[derive(Deserialize, ToSchema)]
pub struct ManualIssueRequest {
    /// Account to issue the copy to
    pub user_id: String,
}

/// Return request
#[derive(Deserialize, ToSchema)]
pub struct ReturnRequest {
    pub borrow_id: Uuid,
    /// Set by staff when accepting a return for another user
    pub user_id: Option<String>,
}

/// Borrow response with the issued record
#[derive(Serialize, ToSchema)]
pub struct BorrowResponse {
    pub record: BorrowRecord,
    pub message: String,
}

/// Borrow a copy of a book for oneself
#[utoipa::path(
    post,
    path = "/books/{id}/borrow",
    tag = "circulation",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Book ID")
    ),
    responses(
        (status = 201, description = "Copy borrowed", body = BorrowResponse),
        (status = 404, description = "Book not found"),
        (status = 422, description = "Already borrowed or no copies available")
    )
)]
pub async fn borrow_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<BorrowResponse>)> {
    let record = state.services.circulation.borrow(&session, id).await?;
    Ok((
        StatusCode::CREATED,
        Json(BorrowResponse {
            message: format!("Book borrowed, due {}", record.due_at.format("%Y-%m-%d")),
            record,
        }),
    ))
}

/// Issue a copy to a user on their behalf (staff)
#[utoipa::path(
    post,
    path = "/books/{id}/issue",
    tag = "circulation",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Book ID")
    ),
    request_body = ManualIssueRequest,
    responses(
        (status = 201, description = "Copy issued", body = BorrowResponse),
        (status = 404, description = "Book or user not found"),
        (status = 422, description = "Reserved by another user, already borrowed or out of copies")
    )
)]
pub async fn manual_issue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ManualIssueRequest>,
) -> AppResult<(StatusCode, Json<BorrowResponse>)> {
    let record = state
        .services
        .circulation
        .manual_issue(&session, id, &request.user_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(BorrowResponse {
            message: format!("Book issued, due {}", record.due_at.format("%Y-%m-%d")),
            record,
        }),
    ))
}

/// Return a borrowed copy
#[utoipa::path(
    post,
    path = "/books/{id}/return",
    tag = "circulation",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Book ID")
    ),
    request_body = ReturnRequest,
    responses(
        (status = 200, description = "Copy returned"),
        (status = 404, description = "Book or borrow record not found"),
        (status = 422, description = "Return past the grace cutoff")
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(request): Json<ReturnRequest>,
) -> AppResult<StatusCode> {
    state
        .services
        .circulation
        .return_book(&session, id, request.borrow_id, request.user_id.as_deref())
        .await?;
    Ok(StatusCode::OK)
}

/// Active loans of the calling user
#[utoipa::path(
    get,
    path = "/loans/mine",
    tag = "circulation",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active loans with display fines", body = Vec<ActiveLoan>)
    )
)]
pub async fn my_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
) -> AppResult<Json<Vec<ActiveLoan>>> {
    let loans = state.services.circulation.my_loans(&session).await?;
    Ok(Json(loans))
}

/// Active loans on a book (staff)
#[utoipa::path(
    get,
    path = "/books/{id}/loans",
    tag = "circulation",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Active borrow records", body = Vec<BorrowRecord>),
        (status = 404, description = "Book not found")
    )
)]
pub async fn book_loans(
    State(state): State<crate::AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<BorrowRecord>>> {
    let records = state.services.circulation.book_loans(&session, id).await?;
    Ok(Json(records))
}

/// Overdue loans across the library, with accrued fines (staff)
#[utoipa::path(
    get,
    path = "/loans/overdue",
    tag = "circulation",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Overdue report", body = Vec<OverdueLoan>)
    )
)]
pub async fn overdue_report(
    State(state): State<crate::AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
) -> AppResult<Json<Vec<OverdueLoan>>> {
    let report = state.services.circulation.overdue_report(&session).await?;
    Ok(Json(report))
}

/// Borrow history for a user
#[utoipa::path(
    get,
    path = "/users/{id}/history",
    tag = "circulation",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Borrow history", body = Vec<HistoryRecord>)
    )
)]
pub async fn user_history(
    State(state): State<crate::AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<HistoryRecord>>> {
    let history = state
        .services
        .circulation
        .history_for_user(&session, &user_id)
        .await?;
    Ok(Json(history))
}
