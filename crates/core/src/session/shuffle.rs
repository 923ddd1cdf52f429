// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shuffled question delivery (spec §4.7.2). A student's question order and
//! per-question option order are derived once from a seed mixing the exam
//! and student id, so the same student reloading the exam page sees the
//! same arrangement without anything being persisted up front — only the
//! question *order* is written to the cache, as a set-if-absent, so a
//! concurrent duplicate `startSession` call can't reshuffle mid-attempt.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::model::{Id, McqOption, Question};

fn seed_from(exam_id: Id, user_id: Id) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    use std::hash::{Hash, Hasher};
    exam_id.hash(&mut hasher);
    user_id.hash(&mut hasher);
    hasher.finish()
}

/// Question delivery order for `(exam_id, user_id)`. Returns the exam's
/// natural `order_index` order unshuffled when `shuffle_questions` is off.
pub fn question_order(exam_id: Id, user_id: Id, questions: &[Question], shuffle_questions: bool) -> Vec<Id> {
    let mut ordered: Vec<Id> = {
        let mut qs = questions.to_vec();
        qs.sort_by_key(|q| q.order_index);
        qs.into_iter().map(|q| q.id).collect()
    };
    if shuffle_questions {
        let mut rng = StdRng::seed_from_u64(seed_from(exam_id, user_id));
        ordered.shuffle(&mut rng);
    }
    ordered
}

/// Per-question option order, seeded by `(exam_id, user_id, question_id)` so
/// it is stable across requests within the same attempt without being
/// cached separately from the question order.
pub fn option_order(exam_id: Id, user_id: Id, question: &Question, shuffle_options: bool) -> Vec<McqOption> {
    if !shuffle_options || question.options.is_empty() {
        return question.options.clone();
    }
    let mut rng = StdRng::seed_from_u64(seed_from(exam_id, user_id) ^ seed_from(question.id, question.id));
    let mut options = question.options.clone();
    options.shuffle(&mut rng);
    options
}

#[cfg(test)]
#[path = "shuffle_tests.rs"]
mod tests;
