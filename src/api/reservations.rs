//! Reservation endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::reservation::{Reservation, ReservationView},
};

use super::AuthenticatedUser;

/// Reserve a low-stock book for oneself
#[utoipa::path(
    post,
    path = "/books/{id}/reserve",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Book ID")
    ),
    responses(
        (status = 201, description = "Reservation created", body = Reservation),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Already reserved by you"),
        (status = 422, description = "Not low in stock or out of stock")
    )
)]
pub async fn reserve_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    let reservation = state.services.reservations.reserve(&session, id).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Cancel one's own reservation
#[utoipa::path(
    delete,
    path = "/reservations/{id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Reservation ID")
    ),
    responses(
        (status = 204, description = "Reservation cancelled"),
        (status = 404, description = "Reservation not found or not yours")
    )
)]
pub async fn cancel_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.reservations.cancel(&session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reservations of the calling user, with derived display status
#[utoipa::path(
    get,
    path = "/reservations/mine",
    tag = "reservations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Reservations", body = Vec<ReservationView>)
    )
)]
pub async fn my_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
) -> AppResult<Json<Vec<ReservationView>>> {
    let reservations = state.services.reservations.my_reservations(&session).await?;
    Ok(Json(reservations))
}
