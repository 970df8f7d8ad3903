//! Business logic services

pub mod catalog;
pub mod circulation;
pub mod reservations;
pub mod users;

use crate::store::Store;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub circulation: circulation::CirculationService,
    pub reservations: reservations::ReservationsService,
    pub users: users::UsersService,
}

impl Services {
    /// Create all services over the given store
    pub fn new(store: Store) -> Self {
        Self {
            catalog: catalog::CatalogService::new(store.clone()),
            circulation: circulation::CirculationService::new(store.clone()),
            reservations: reservations::ReservationsService::new(store.clone()),
            users: users::UsersService::new(store),
        }
    }
}
