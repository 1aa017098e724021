//! Redistributes the position of the correct choice across a generated set.
//!
//! Generators tend to park the right answer in the same slot. Balancing walks
//! the set once, keeps a usage counter per choice index and places each
//! question's correct choice on one of the least-used indices, capped at
//! `ceil(questions / choices)` per index. Incorrect choices are shuffled into
//! the remaining slots.

use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

use crate::model::{ChoiceDraft, QuestionDraft};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BalanceError {
    #[error("question set is empty")]
    NoQuestions,

    #[error("question {question} has no choices")]
    NoChoices { question: usize },

    #[error("question {question} must have exactly one correct choice (found {found})")]
    CorrectChoiceCount { question: usize, found: usize },

    #[error("question {question} has {found} choices, expected {expected}")]
    RaggedChoices {
        question: usize,
        expected: usize,
        found: usize,
    },
}

/// Check the preconditions for balancing and return the shared choice count.
///
/// # Errors
///
/// Returns `BalanceError` for empty sets, empty choice lists, anything other
/// than one correct choice per question, or mixed choice counts.
pub fn validate_for_balance(questions: &[QuestionDraft]) -> Result<usize, BalanceError> {
    let num_choices = questions
        .iter()
        .map(|q| q.choices.len())
        .max()
        .ok_or(BalanceError::NoQuestions)?;

    for (idx, question) in questions.iter().enumerate() {
        if question.choices.is_empty() {
            return Err(BalanceError::NoChoices { question: idx });
        }
        let found = question.correct_count();
        if found != 1 {
            return Err(BalanceError::CorrectChoiceCount { question: idx, found });
        }
        if question.choices.len() != num_choices {
            return Err(BalanceError::RaggedChoices {
                question: idx,
                expected: num_choices,
                found: question.choices.len(),
            });
        }
    }

    Ok(num_choices)
}

/// Reorder every question's choices so correct answers spread evenly over positions.
///
/// Nothing is mutated when validation fails.
///
/// # Errors
///
/// See [`validate_for_balance`].
pub fn balance_choices<R: Rng + ?Sized>(
    questions: &mut [QuestionDraft],
    rng: &mut R,
) -> Result<(), BalanceError> {
    let num_choices = validate_for_balance(questions)?;
    let max_per_index = questions.len().div_ceil(num_choices);
    let mut usage = vec![0_usize; num_choices];

    for question in questions.iter_mut() {
        let (mut correct, mut incorrect): (Vec<ChoiceDraft>, Vec<ChoiceDraft>) =
            std::mem::take(&mut question.choices)
                .into_iter()
                .partition(|c| c.is_correct);

        let min_usage = usage.iter().copied().min().unwrap_or(0);
        // Fewer than `questions.len()` placements so far, so the least-used
        // index is below the cap and `candidates` holds at least one index.
        let candidates: Vec<usize> = (0..num_choices)
            .filter(|&i| usage[i] == min_usage)
            .collect();
        let target = candidates[rng.random_range(0..candidates.len())];
        debug_assert!(usage[target] < max_per_index);
        usage[target] += 1;

        incorrect.shuffle(rng);
        let mut rest = incorrect.into_iter();
        let mut ordered = Vec::with_capacity(num_choices);
        for slot in 0..num_choices {
            let next = if slot == target { correct.pop() } else { rest.next() };
            if let Some(choice) = next {
                ordered.push(choice);
            }
        }
        question.choices = ordered;
    }

    Ok(())
}

/// Number of questions whose correct choice sits at each index.
#[must_use]
pub fn correct_index_histogram(questions: &[QuestionDraft]) -> Vec<usize> {
    let width = questions.iter().map(|q| q.choices.len()).max().unwrap_or(0);
    let mut counts = vec![0; width];
    for idx in questions.iter().filter_map(QuestionDraft::correct_index) {
        counts[idx] += 1;
    }
    counts
}
