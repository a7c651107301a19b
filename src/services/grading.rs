//! Pure scoring rules. Everything here is a function of its arguments,
//! so the whole module is testable without a database.

use std::collections::HashSet;

use crate::db::models::{Question, QuestionOption};
use crate::db::types::QuestionType;

/// A submitted answer, already resolved against the question's declared
/// type. The variant is chosen by the validator from the question type,
/// never guessed from the payload shape.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Answer {
    Choice(i64),
    Choices(Vec<i64>),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Grade {
    pub(crate) is_correct: bool,
    pub(crate) points: i32,
}

impl Grade {
    pub(crate) const ZERO: Grade = Grade {
        is_correct: false,
        points: 0,
    };
}

/// Checks one answer against one question.
///
/// Single choice is set membership: a question may declare several
/// correct options and any one of them earns the points. Multi choice
/// is all-or-nothing set equality after dropping duplicates. Text is an
/// exact match after trimming and lowercasing both sides. An answer
/// whose shape does not fit the question type is never correct.
pub(crate) fn check_answer(
    question: &Question,
    correct_option_ids: &HashSet<i64>,
    answer: &Answer,
) -> Grade {
    let is_correct = match (question.question_type, answer) {
        (QuestionType::SingleChoice, Answer::Choice(id)) => correct_option_ids.contains(id),
        (QuestionType::MultiChoice, Answer::Choices(ids)) => {
            let submitted: HashSet<i64> = ids.iter().copied().collect();
            !correct_option_ids.is_empty() && submitted == *correct_option_ids
        }
        (QuestionType::ShortText | QuestionType::LongText, Answer::Text(text)) => {
            match question.correct_answer.as_deref() {
                Some(expected) if !expected.trim().is_empty() => {
                    normalize(expected) == normalize(text)
                }
                _ => false,
            }
        }
        _ => false,
    };

    Grade {
        is_correct,
        points: if is_correct { question.points } else { 0 },
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// A survey is a quiz as soon as any question carries grading data:
/// a non-empty expected text answer or at least one correct option.
pub(crate) fn is_quiz(questions: &[Question], options: &[QuestionOption]) -> bool {
    questions
        .iter()
        .any(|q| matches!(q.correct_answer.as_deref(), Some(a) if !a.trim().is_empty()))
        || options.iter().any(|o| o.is_correct)
}

/// Maximum attainable score: the sum over ALL questions, not just the
/// answered ones.
pub(crate) fn max_score(questions: &[Question]) -> i32 {
    questions.iter().map(|q| q.points).sum()
}

/// Score as a percentage, rounded to one decimal place.
pub(crate) fn percentage(total_score: i32, max_score: i32) -> f64 {
    if max_score <= 0 {
        return 0.0;
    }
    let raw = f64::from(total_score) / f64::from(max_score) * 100.0;
    (raw * 10.0).round() / 10.0
}
