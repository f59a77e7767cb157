// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Order Lifecycle
//!
//! The order state machine and the lab-scoped visibility rules.
//!
//! ```text
//! CREATED ──assign──▶ ASSIGNED ──start──▶ IN_PROGRESS ──finish──▶ FINISHED
//!                        ▲  │                  │
//!                        └──┴──────assign──────┘
//! ```
//!
//! `assign` is accepted from every state but `FINISHED`, so an order can be
//! re-targeted to another lab while in flight. `FINISHED` is terminal.
//!
//! Everything here is pure: callers run these functions inside the store
//! transaction that loaded the order.

use chrono::{DateTime, Utc};

use crate::auth::AuthenticatedUser;
use crate::models::OrderStatus;
use crate::storage::{OrderFilter, StoredLaboratory, StoredOrder};

/// An illegal transition. The message names the state that was required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("Cannot assign a FINISHED order")]
    AssignFinished,

    #[error("Only ASSIGNED orders can move to IN_PROGRESS")]
    StartRequiresAssigned { current: OrderStatus },

    #[error("Only IN_PROGRESS orders can move to FINISHED")]
    FinishRequiresInProgress { current: OrderStatus },
}

/// Point the order at `lab` and mark it `ASSIGNED`.
///
/// `assigned_at` is overwritten on every assignment.
pub fn assign(
    order: &mut StoredOrder,
    lab: &StoredLaboratory,
    now: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    if order.status == OrderStatus::Finished {
        return Err(LifecycleError::AssignFinished);
    }
    order.laboratory_id = Some(lab.id);
    order.status = OrderStatus::Assigned;
    order.assigned_at = Some(now);
    Ok(())
}

/// `ASSIGNED → IN_PROGRESS`.
pub fn start(order: &mut StoredOrder) -> Result<(), LifecycleError> {
    if order.status != OrderStatus::Assigned {
        return Err(LifecycleError::StartRequiresAssigned { current: order.status });
    }
    order.status = OrderStatus::InProgress;
    Ok(())
}

/// `IN_PROGRESS → FINISHED`.
pub fn finish(order: &mut StoredOrder) -> Result<(), LifecycleError> {
    if order.status != OrderStatus::InProgress {
        return Err(LifecycleError::FinishRequiresInProgress { current: order.status });
    }
    order.status = OrderStatus::Finished;
    Ok(())
}

// =============================================================================
// Visibility
// =============================================================================

/// Why a principal may not see an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("Missing labCode in token")]
    MissingLabCode,

    #[error("Order does not belong to your lab")]
    OtherLab,
}

/// The orders a principal is allowed to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderScope {
    /// ADMIN: every order.
    All,
    /// LAB_TECH: only orders assigned to this lab code.
    Lab(String),
}

impl OrderScope {
    /// Derive the scope from the request principal.
    ///
    /// ADMIN wins over LAB_TECH. Any other principal is scoped by the lab
    /// code in its token and is rejected when the token carries none.
    pub fn for_principal(user: &AuthenticatedUser) -> Result<Self, ScopeError> {
        if user.is_admin() {
            return Ok(OrderScope::All);
        }
        user.lab_scope()
            .map(|code| OrderScope::Lab(code.to_string()))
            .ok_or(ScopeError::MissingLabCode)
    }

    /// Check one order, identified by the code of its lab (if any).
    ///
    /// An unassigned order belongs to no lab and is hidden from lab scopes.
    pub fn check(&self, order_lab: Option<&str>) -> Result<(), ScopeError> {
        match self {
            OrderScope::All => Ok(()),
            OrderScope::Lab(code) if order_lab == Some(code.as_str()) => Ok(()),
            OrderScope::Lab(_) => Err(ScopeError::OtherLab),
        }
    }

    /// Force the scope's lab onto a list filter, whatever the caller asked.
    pub fn narrow(&self, mut filter: OrderFilter) -> OrderFilter {
        if let OrderScope::Lab(code) = self {
            filter.lab_code = Some(code.clone());
        }
        filter
    }
}
