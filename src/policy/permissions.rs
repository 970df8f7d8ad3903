//! Role/permission gate.
//!
//! The single enforcement boundary for every transaction: services re-check
//! this table with the caller's session at invocation time, independent of
//! whatever the client already filtered.

use crate::error::{AppError, AppResult};
use crate::models::user::{Role, Session};

/// Gated operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Borrow a copy for oneself
    Borrow,
    /// Return one's own copy
    Return,
    /// Reserve a low-stock title for oneself
    Reserve,
    /// Cancel one's own reservation
    CancelReservation,
    /// Issue or accept a return on behalf of any user
    ManualCirculation,
    /// Add, update or delete catalog entries
    ManageBooks,
    /// Create a reader account
    CreateReader,
    /// Create a librarian or admin account
    CreateStaff,
    /// Change another user's role
    ChangeRole,
    /// Browse user accounts
    ViewUsers,
    /// Staff overdue/fine reports
    ViewReports,
}

impl Action {
    fn label(&self) -> &'static str {
        match self {
            Action::Borrow => "borrow books",
            Action::Return => "return books",
            Action::Reserve => "reserve books",
            Action::CancelReservation => "cancel reservations",
            Action::ManualCirculation => "issue or accept returns for other users",
            Action::ManageBooks => "manage the catalog",
            Action::CreateReader => "create reader accounts",
            Action::CreateStaff => "create staff accounts",
            Action::ChangeRole => "change user roles",
            Action::ViewUsers => "browse user accounts",
            Action::ViewReports => "view circulation reports",
        }
    }
}

/// The authorization table. Exhaustive on both axes so a new role or action
/// cannot silently fall through.
pub fn is_authorized(action: Action, role: Role) -> bool {
    match action {
        Action::Borrow | Action::Return | Action::Reserve | Action::CancelReservation => {
            match role {
                Role::Reader => true,
                Role::Librarian | Role::Admin => false,
            }
        }
        Action::ManualCirculation
        | Action::ManageBooks
        | Action::CreateReader
        | Action::ViewUsers
        | Action::ViewReports => match role {
            Role::Reader => false,
            Role::Librarian | Role::Admin => true,
        },
        Action::CreateStaff | Action::ChangeRole => match role {
            Role::Reader | Role::Librarian => false,
            Role::Admin => true,
        },
    }
}

/// Gate an operation for the calling session
pub fn authorize(session: &Session, action: Action) -> AppResult<()> {
    if is_authorized(action, session.role) {
        Ok(())
    } else {
        Err(AppError::Authorization(format!(
            "A {} is not allowed to {}",
            session.role,
            action.label()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readers_borrow_but_do_not_manage() {
        assert!(is_authorized(Action::Borrow, Role::Reader));
        assert!(is_authorized(Action::Reserve, Role::Reader));
        assert!(!is_authorized(Action::ManageBooks, Role::Reader));
        assert!(!is_authorized(Action::ManualCirculation, Role::Reader));
    }

    #[test]
    fn staff_circulate_for_others_but_do_not_self_borrow() {
        for role in [Role::Librarian, Role::Admin] {
            assert!(!is_authorized(Action::Borrow, role));
            assert!(!is_authorized(Action::Return, role));
            assert!(is_authorized(Action::ManualCirculation, role));
            assert!(is_authorized(Action::ManageBooks, role));
            assert!(is_authorized(Action::CreateReader, role));
        }
    }

    #[test]
    fn only_admins_create_staff_or_change_roles() {
        assert!(!is_authorized(Action::CreateStaff, Role::Librarian));
        assert!(!is_authorized(Action::ChangeRole, Role::Librarian));
        assert!(is_authorized(Action::CreateStaff, Role::Admin));
        assert!(is_authorized(Action::ChangeRole, Role::Admin));
    }
}
