// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scoring (spec §4.7.1): MCQs grade immediately on answer; short answers
//! stay ungraded until a proctor/admin scores them. Final score only ever
//! sums what has a `marks_awarded` value, so an ungraded short answer
//! contributes zero rather than blocking submission.

use crate::model::{Answer, McqOption, Question, QuestionType};

/// Marks for one MCQ answer: full `marks` on an exact key match, negative
/// `negative_marks` on a wrong pick, zero if left blank.
pub fn grade_mcq(question: &Question, selected_answer: Option<&str>) -> Option<f64> {
    if question.question_type != QuestionType::Mcq {
        return None;
    }
    let selected = selected_answer?;
    let correct = question.correct_answer.as_deref();
    Some(if correct == Some(selected) { question.marks } else { -question.negative_marks })
}

/// Sum of `marks_awarded` across every answer that has one; answers not yet
/// graded (short answers awaiting a proctor) are excluded rather than
/// counted as zero-and-final. Floored at zero (negative marking never
/// drags the overall score below zero) and rounded half-up to two decimals.
pub fn total_score(answers: &[Answer]) -> f64 {
    let raw = answers.iter().filter_map(|a| a.marks_awarded).sum::<f64>().max(0.0);
    (raw * 100.0).round() / 100.0
}

pub fn is_passed(score: f64, passing_marks: f64) -> bool {
    score >= passing_marks
}

/// Whether every question in the exam has a corresponding graded answer,
/// used to decide if a session's score is final or provisional.
pub fn fully_graded(questions: &[Question], answers: &[Answer]) -> bool {
    questions.iter().all(|q| {
        answers
            .iter()
            .any(|a| a.question_id == q.id && a.marks_awarded.is_some())
    })
}

pub fn option_by_key<'a>(options: &'a [McqOption], key: &str) -> Option<&'a McqOption> {
    options.iter().find(|o| o.key == key)
}

#[cfg(test)]
#[path = "scoring_tests.rs"]
mod tests;
