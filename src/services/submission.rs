//! The submission pipeline: load, validate, grade, persist. Persistence
//! happens inside one transaction so a failure never leaves a partial
//! response behind.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use sqlx::PgPool;

use crate::db::models::Question;
use crate::repositories::{answers, options, questions, responses, retakes, surveys};
use crate::services::grading::{self, Answer, Grade};
use crate::services::validation;

#[derive(Debug, thiserror::Error)]
pub(crate) enum SubmitError {
    #[error("validation failed")]
    Invalid(Vec<String>),
    #[error("survey not found")]
    SurveyNotFound,
    #[error("survey is not accepting responses")]
    SurveyInactive,
    #[error("survey already completed")]
    AlreadyResponded,
    #[error("failed to save response")]
    Persistence(#[source] sqlx::Error),
}

#[derive(Debug)]
pub(crate) struct SubmissionOutcome {
    pub(crate) response_id: i64,
    pub(crate) total_score: i32,
    pub(crate) max_score: i32,
    pub(crate) is_quiz: bool,
    pub(crate) percentage: f64,
    pub(crate) message: String,
}

/// Records one submission end to end.
///
/// `actor` is the authenticated user, if any; anonymous submissions are
/// allowed and never duplicate-checked. The raw answers map is keyed by
/// question id.
pub(crate) async fn submit(
    pool: &PgPool,
    survey_id: i64,
    actor: Option<i64>,
    ip: Option<String>,
    raw_answers: &HashMap<String, Value>,
) -> Result<SubmissionOutcome, SubmitError> {
    if survey_id <= 0 {
        return Err(SubmitError::Invalid(vec![
            "survey id must be positive".to_owned(),
        ]));
    }

    let survey = surveys::find_by_id(pool, survey_id)
        .await
        .map_err(|e| persistence(survey_id, e))?
        .ok_or(SubmitError::SurveyNotFound)?;
    if !survey.is_active {
        return Err(SubmitError::SurveyInactive);
    }

    // Cheap pre-check outside the transaction; re-checked under the
    // advisory lock before any write.
    if let Some(user_id) = actor {
        let responded = responses::user_has_responded(pool, survey_id, user_id)
            .await
            .map_err(|e| persistence(survey_id, e))?;
        if responded && !retakes::has_active(pool, survey_id, user_id)
            .await
            .map_err(|e| persistence(survey_id, e))?
        {
            return Err(SubmitError::AlreadyResponded);
        }
    }

    let question_list = questions::list_by_survey(pool, survey_id)
        .await
        .map_err(|e| persistence(survey_id, e))?;
    if question_list.is_empty() {
        return Err(SubmitError::Invalid(vec![
            "survey has no questions".to_owned(),
        ]));
    }

    let resolved = validate_answers(&question_list, raw_answers)?;

    let option_list = options::list_by_survey(pool, survey_id)
        .await
        .map_err(|e| persistence(survey_id, e))?;
    let mut correct_by_question: HashMap<i64, HashSet<i64>> = HashMap::new();
    for option in &option_list {
        if option.is_correct {
            correct_by_question
                .entry(option.question_id)
                .or_default()
                .insert(option.id);
        }
    }

    let is_quiz = grading::is_quiz(&question_list, &option_list);
    let max_score = grading::max_score(&question_list);

    let (response_id, total_score) = record(
        pool,
        survey_id,
        actor,
        ip.as_deref(),
        &question_list,
        &correct_by_question,
        &resolved,
        is_quiz,
        max_score,
    )
    .await?;

    let percentage = if is_quiz {
        grading::percentage(total_score, max_score)
    } else {
        0.0
    };
    let message = if is_quiz {
        format!("{total_score}/{max_score} points ({percentage:.1}%)")
    } else {
        "Thank you for completing the survey!".to_owned()
    };

    Ok(SubmissionOutcome {
        response_id,
        total_score,
        max_score: if is_quiz { max_score } else { 0 },
        is_quiz,
        percentage,
        message,
    })
}

fn validate_answers(
    questions: &[Question],
    raw: &HashMap<String, Value>,
) -> Result<HashMap<i64, Answer>, SubmitError> {
    validation::validate_answers(questions, raw).map_err(SubmitError::Invalid)
}

/// The transactional tail of the pipeline. For authenticated submitters
/// an advisory lock on (survey, user) serializes concurrent attempts,
/// the duplicate check is repeated under it, and a retake grant is
/// consumed with a compare-and-swap before the response is written.
#[allow(clippy::too_many_arguments)]
async fn record(
    pool: &PgPool,
    survey_id: i64,
    actor: Option<i64>,
    ip: Option<&str>,
    questions: &[Question],
    correct_by_question: &HashMap<i64, HashSet<i64>>,
    resolved: &HashMap<i64, Answer>,
    is_quiz: bool,
    max_score: i32,
) -> Result<(i64, i32), SubmitError> {
    let mut tx = pool.begin().await.map_err(|e| persistence(survey_id, e))?;

    if let Some(user_id) = actor {
        responses::lock_submission(&mut tx, survey_id, user_id)
            .await
            .map_err(|e| persistence(survey_id, e))?;
        let responded = responses::user_has_responded(&mut *tx, survey_id, user_id)
            .await
            .map_err(|e| persistence(survey_id, e))?;
        // An active grant is consumed together with the response it
        // permits, so it can never be spent without one.
        let consumed = retakes::consume_active(&mut tx, survey_id, user_id)
            .await
            .map_err(|e| persistence(survey_id, e))?;
        if responded && !consumed {
            return Err(SubmitError::AlreadyResponded);
        }
    }

    let response_id = responses::insert_shell(&mut tx, survey_id, actor, ip)
        .await
        .map_err(|e| persistence(survey_id, e))?;

    let mut rows = Vec::new();
    let mut total_score = 0;
    let empty = HashSet::new();
    for question in questions {
        let Some(answer) = resolved.get(&question.id) else {
            continue;
        };
        let correct_ids = correct_by_question.get(&question.id).unwrap_or(&empty);
        let grade = if is_quiz {
            grading::check_answer(question, correct_ids, answer)
        } else {
            Grade::ZERO
        };
        total_score += grade.points;

        match answer {
            Answer::Choice(option_id) => rows.push(answers::NewAnswer {
                question_id: question.id,
                option_id: Some(*option_id),
                answer_text: None,
                is_correct: grade.is_correct,
                points_earned: grade.points,
            }),
            // One row per distinct selected option, all sharing the
            // question grade.
            Answer::Choices(option_ids) => {
                let mut seen = HashSet::new();
                for option_id in option_ids {
                    if seen.insert(*option_id) {
                        rows.push(answers::NewAnswer {
                            question_id: question.id,
                            option_id: Some(*option_id),
                            answer_text: None,
                            is_correct: grade.is_correct,
                            points_earned: grade.points,
                        });
                    }
                }
            }
            Answer::Text(text) => rows.push(answers::NewAnswer {
                question_id: question.id,
                option_id: None,
                answer_text: Some(text.clone()),
                is_correct: grade.is_correct,
                points_earned: grade.points,
            }),
        }
    }

    answers::insert_batch(&mut tx, response_id, &rows)
        .await
        .map_err(|e| persistence(survey_id, e))?;

    if is_quiz {
        responses::update_score(&mut tx, response_id, total_score, max_score)
            .await
            .map_err(|e| persistence(survey_id, e))?;
    }

    tx.commit().await.map_err(|e| persistence(survey_id, e))?;

    Ok((response_id, total_score))
}

fn persistence(survey_id: i64, err: sqlx::Error) -> SubmitError {
    tracing::error!(survey_id, error = %err, "Failed to persist survey submission");
    SubmitError::Persistence(err)
}
