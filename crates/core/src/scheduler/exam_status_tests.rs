// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::TimeZone;
use uuid::Uuid;

use super::*;

fn exam(status: ExamStatus, start_offset_mins: i64, end_offset_mins: i64) -> Exam {
    let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
    Exam {
        id: Uuid::new_v4(),
        title: "T".into(),
        subject: "S".into(),
        start_time: now + chrono::Duration::minutes(start_offset_mins),
        end_time: now + chrono::Duration::minutes(end_offset_mins),
        duration_minutes: 60,
        total_marks: 10.0,
        passing_marks: 5.0,
        shuffle_questions: false,
        shuffle_options: false,
        allow_late_entry: false,
        status,
        is_deleted: false,
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
}

#[test]
fn published_exam_moves_to_ongoing_once_start_time_has_passed() {
    let e = exam(ExamStatus::Published, -1, 59);
    assert_eq!(due_transition(&e, now()), Some(ExamStatus::Ongoing));
}

#[test]
fn published_exam_does_not_transition_before_start_time() {
    let e = exam(ExamStatus::Published, 1, 61);
    assert_eq!(due_transition(&e, now()), None);
}

#[test]
fn ongoing_exam_moves_to_completed_once_end_time_has_passed() {
    let e = exam(ExamStatus::Ongoing, -60, -1);
    assert_eq!(due_transition(&e, now()), Some(ExamStatus::Completed));
}

#[test]
fn draft_and_completed_exams_never_transition_automatically() {
    let draft = exam(ExamStatus::Draft, -1, 59);
    let completed = exam(ExamStatus::Completed, -60, -1);
    assert_eq!(due_transition(&draft, now()), None);
    assert_eq!(due_transition(&completed, now()), None);
}
