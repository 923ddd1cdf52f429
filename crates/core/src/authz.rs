// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authorisation kernel (C11): three composable predicates applied
//! uniformly across REST, realtime, and background paths so no endpoint
//! re-implements its own ownership check (spec §4.11).

use crate::model::{ExamSession, Id, Role};

/// The authenticated caller, resolved once by the Token Service and passed
/// down to every predicate — never re-derived from request state.
#[derive(Debug, Clone, Copy)]
pub struct Principal {
    pub user_id: Id,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        is_admin(self)
    }
}

/// `isAdmin(principal)`.
pub fn is_admin(principal: &Principal) -> bool {
    matches!(principal.role, Role::Admin)
}

/// `isOwner(principal, session)` — the session's own student, an admin, or
/// a proctor assigned to the session's exam.
///
/// `proctor_assigned` must already reflect whether `principal` has an
/// `ExamProctor` row for `session.exam_id`; this function does not query
/// the store itself so it stays a pure predicate.
pub fn is_owner(principal: &Principal, session: &ExamSession, proctor_assigned: bool) -> bool {
    if is_admin(principal) {
        return true;
    }
    if principal.user_id == session.user_id && matches!(principal.role, Role::Student) {
        return true;
    }
    matches!(principal.role, Role::Proctor) && proctor_assigned
}

/// `isAssignedProctor(principal, exam)` — admin, or has an `ExamProctor`
/// row for `exam`. `proctor_assigned` is resolved by the caller via the
/// store gateway's `ExamProctor` lookup.
pub fn is_assigned_proctor(principal: &Principal, proctor_assigned: bool) -> bool {
    is_admin(principal) || (matches!(principal.role, Role::Proctor) && proctor_assigned)
}

#[cfg(test)]
#[path = "authz_tests.rs"]
mod tests;
