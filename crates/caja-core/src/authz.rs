//! # Authorization Guard
//!
//! Role checks evaluated at the start of every engine operation.
//!
//! ## Permission Matrix
//! ```text
//! ┌──────────────────┬───────┬───────┬────────────┬─────────┐
//! │ Action           │ OWNER │ ADMIN │ SUPERVISOR │ CASHIER │
//! ├──────────────────┼───────┼───────┼────────────┼─────────┤
//! │ Sell             │   ✓   │   ✓   │     ✓      │    ✓    │
//! │ OpenShift        │   ✓   │   ✓   │     ✓      │    ✓    │
//! │ CloseShift       │   ✓   │   ✓   │     ✓      │    ✓    │
//! │ VoidSale         │   ✓   │   ✓   │     ✓      │         │
//! │ ManageInventory  │   ✓   │   ✓   │     ✓      │         │
//! │ ViewReports      │   ✓   │   ✓   │     ✓      │         │
//! │ ManageStaff      │   ✓   │   ✓   │            │         │
//! │ ManageSettings   │   ✓   │       │            │         │
//! └──────────────────┴───────┴───────┴────────────┴─────────┘
//! ```
//! Inactive staff are denied everything.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::Staff;

/// Role of a staff member inside a tenant.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Dueño.
    Owner,
    /// Administrador.
    Admin,
    /// Supervisor.
    Supervisor,
    /// Cajero.
    Cashier,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "OWNER",
            Role::Admin => "ADMIN",
            Role::Supervisor => "SUPERVISOR",
            Role::Cashier => "CASHIER",
        }
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin)
    }

    #[inline]
    pub fn is_supervisor_or_above(&self) -> bool {
        matches!(self, Role::Owner | Role::Admin | Role::Supervisor)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something a staff member may try to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Action {
    Sell,
    OpenShift,
    CloseShift,
    VoidSale,
    ManageInventory,
    ViewReports,
    ManageStaff,
    ManageSettings,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Sell => "sell",
            Action::OpenShift => "open a shift",
            Action::CloseShift => "close a shift",
            Action::VoidSale => "void a sale",
            Action::ManageInventory => "manage inventory",
            Action::ViewReports => "view reports",
            Action::ManageStaff => "manage staff",
            Action::ManageSettings => "manage settings",
        }
    }

    /// Whether `role` may perform this action.
    pub fn permits(&self, role: Role) -> bool {
        match self {
            Action::Sell | Action::OpenShift | Action::CloseShift => true,
            Action::VoidSale | Action::ManageInventory | Action::ViewReports => {
                role.is_supervisor_or_above()
            }
            Action::ManageStaff => role.is_admin(),
            Action::ManageSettings => role == Role::Owner,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`authorize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    #[inline]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Maps a deny to [`CoreError::Forbidden`].
    pub fn into_result(self, staff: &Staff, action: Action) -> CoreResult<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(_) => Err(CoreError::Forbidden {
                role: staff.role.to_string(),
                action: action.to_string(),
            }),
        }
    }
}

/// Decides whether `staff` may perform `action`.
pub fn authorize(staff: &Staff, action: Action) -> Decision {
    if !staff.is_active {
        return Decision::Deny(format!("{} is inactive", staff.display_name()));
    }
    if action.permits(staff.role) {
        Decision::Allow
    } else {
        Decision::Deny(format!("role {} cannot {}", staff.role, action))
    }
}

/// [`authorize`] followed by [`Decision::into_result`].
pub fn ensure(staff: &Staff, action: Action) -> CoreResult<()> {
    authorize(staff, action).into_result(staff, action)
}
