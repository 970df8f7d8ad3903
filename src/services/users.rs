//! User account service.
//!
//! Credentials live with the external authentication collaborator; this
//! service only manages the account documents the permission gate consults.

use chrono::Utc;
use validator::Validate;

use crate::{
    error::{AppError, AppResult, ReasonCode},
    models::user::{CreateUser, Role, Session, User},
    policy::permissions::{self, Action},
    store::Store,
};

#[derive(Clone)]
pub struct UsersService {
    store: Store,
}

impl UsersService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Create an account document.
    ///
    /// Staff may create reader accounts; only admins may create librarian or
    /// admin accounts.
    pub async fn create_user(&self, session: &Session, request: CreateUser) -> AppResult<User> {
        let action = match request.role {
            Role::Reader => Action::CreateReader,
            Role::Librarian | Role::Admin => Action::CreateStaff,
        };
        permissions::authorize(session, action)?;
        request
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let user = User {
            id: request.id,
            email: request.email,
            display_name: request.display_name,
            role: request.role,
            created_at: Utc::now(),
        };
        self.store.users.insert(user.clone()).await?;

        tracing::info!(user_id = %user.id, role = %user.role, created_by = %session.sub, "user created");
        Ok(user)
    }

    /// Change a user's role (admin only, never one's own account)
    pub async fn change_role(
        &self,
        session: &Session,
        user_id: &str,
        role: Role,
    ) -> AppResult<User> {
        permissions::authorize(session, Action::ChangeRole)?;
        if user_id == session.user_id() {
            return Err(AppError::precondition(
                ReasonCode::SelfRoleChange,
                "You cannot change your own role.",
            ));
        }

        let user = self.store.users.set_role(user_id, role).await?;
        tracing::info!(user_id = %user_id, role = %role, changed_by = %session.sub, "role changed");
        Ok(user)
    }

    /// Fetch an account: one's own, or any account for staff
    pub async fn get_user(&self, session: &Session, user_id: &str) -> AppResult<User> {
        if user_id != session.user_id() {
            permissions::authorize(session, Action::ViewUsers)?;
        }
        self.store.users.get(user_id).await
    }

    /// Browse accounts (staff only)
    pub async fn list_users(&self, session: &Session) -> AppResult<Vec<User>> {
        permissions::authorize(session, Action::ViewUsers)?;
        self.store.users.list().await
    }
}
