// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::Utc;
use uuid::Uuid;

use super::*;
use crate::model::ExamSession;

fn session_for(user_id: Id) -> ExamSession {
    ExamSession {
        id: Uuid::new_v4(),
        enrollment_id: Uuid::new_v4(),
        exam_id: Uuid::new_v4(),
        user_id,
        started_at: Utc::now(),
        submitted_at: None,
        last_heartbeat_at: Utc::now(),
        identity_verified: false,
        is_suspended: false,
        suspension_reason: None,
        suspended_at: None,
        extended_end_at: None,
        ip_address: None,
        user_agent: None,
        score: None,
        is_passed: None,
        version: 0,
    }
}

#[test]
fn student_owns_their_own_session() {
    let student = Uuid::new_v4();
    let principal = Principal { user_id: student, role: Role::Student };
    let session = session_for(student);
    assert!(is_owner(&principal, &session, false));
}

#[test]
fn student_does_not_own_another_students_session() {
    let principal = Principal { user_id: Uuid::new_v4(), role: Role::Student };
    let session = session_for(Uuid::new_v4());
    assert!(!is_owner(&principal, &session, false));
}

#[test]
fn admin_owns_every_session() {
    let principal = Principal { user_id: Uuid::new_v4(), role: Role::Admin };
    let session = session_for(Uuid::new_v4());
    assert!(is_owner(&principal, &session, false));
}

#[test]
fn assigned_proctor_owns_the_session() {
    let principal = Principal { user_id: Uuid::new_v4(), role: Role::Proctor };
    let session = session_for(Uuid::new_v4());
    assert!(is_owner(&principal, &session, true));
    assert!(!is_owner(&principal, &session, false));
}

#[test]
fn assigned_proctor_predicate() {
    let admin = Principal { user_id: Uuid::new_v4(), role: Role::Admin };
    assert!(is_assigned_proctor(&admin, false));

    let proctor = Principal { user_id: Uuid::new_v4(), role: Role::Proctor };
    assert!(is_assigned_proctor(&proctor, true));
    assert!(!is_assigned_proctor(&proctor, false));

    let student = Principal { user_id: Uuid::new_v4(), role: Role::Student };
    assert!(!is_assigned_proctor(&student, true));
}
