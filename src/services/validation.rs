//! Turns the raw JSON answers payload into typed [`Answer`]s, collecting
//! every format and required-field problem instead of failing on the
//! first one. Correctness is never consulted here.

use std::collections::HashMap;

use serde_json::Value;

use crate::db::models::Question;
use crate::db::types::QuestionType;
use crate::services::grading::Answer;

/// Validates a submission against the survey's questions.
///
/// The payload is keyed by question id (JSON object keys, so strings).
/// The variant of each resolved [`Answer`] comes from the question's
/// declared type; the payload shape only has to fit it. Answers for
/// unknown question ids are ignored. On any error the full list is
/// returned and nothing is resolved.
pub(crate) fn validate_answers(
    questions: &[Question],
    raw: &HashMap<String, Value>,
) -> Result<HashMap<i64, Answer>, Vec<String>> {
    let mut resolved = HashMap::new();
    let mut errors = Vec::new();

    for question in questions {
        let value = raw.get(&question.id.to_string()).filter(|v| !is_empty(v));

        let Some(value) = value else {
            if question.is_required {
                errors.push(format!("question {} is required", question.id));
            }
            continue;
        };

        match parse_answer(question.question_type, value) {
            Some(answer) => {
                resolved.insert(question.id, answer);
            }
            None => errors.push(format_error(question)),
        }
    }

    if errors.is_empty() {
        Ok(resolved)
    } else {
        Err(errors)
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn parse_answer(question_type: QuestionType, value: &Value) -> Option<Answer> {
    match question_type {
        QuestionType::SingleChoice => parse_option_id(value).map(Answer::Choice),
        QuestionType::MultiChoice => {
            let items = value.as_array()?;
            let ids: Vec<i64> = items.iter().filter_map(parse_option_id).collect();
            if ids.is_empty() {
                None
            } else {
                Some(Answer::Choices(ids))
            }
        }
        QuestionType::ShortText | QuestionType::LongText => {
            let text = value.as_str()?;
            if text.trim().is_empty() {
                None
            } else {
                Some(Answer::Text(text.to_owned()))
            }
        }
    }
}

/// Option ids arrive as JSON numbers or, from form-driven clients, as
/// numeric strings. Anything non-positive is rejected.
fn parse_option_id(value: &Value) -> Option<i64> {
    let id = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    (id > 0).then_some(id)
}

fn format_error(question: &Question) -> String {
    match question.question_type {
        QuestionType::SingleChoice => {
            format!("question {}: expected an option id", question.id)
        }
        QuestionType::MultiChoice => {
            format!("question {}: expected a list of option ids", question.id)
        }
        QuestionType::ShortText | QuestionType::LongText => {
            format!("question {}: answer text must not be empty", question.id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn question(id: i64, question_type: QuestionType, is_required: bool) -> Question {
        Question {
            id,
            survey_id: 1,
            question_text: "q".into(),
            question_type,
            is_required,
            order_index: id as i32,
            points: 1,
            correct_answer: None,
        }
    }

    fn payload(entries: &[(&str, Value)]) -> HashMap<String, Value> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    #[test]
    fn resolves_each_type_from_the_declared_kind() {
        let questions = [
            question(1, QuestionType::SingleChoice, true),
            question(2, QuestionType::MultiChoice, true),
            question(3, QuestionType::ShortText, true),
        ];
        let raw = payload(&[
            ("1", json!(10)),
            ("2", json!([20, 21])),
            ("3", json!("hello")),
        ]);

        let resolved = validate_answers(&questions, &raw).unwrap();
        assert_eq!(resolved[&1], Answer::Choice(10));
        assert_eq!(resolved[&2], Answer::Choices(vec![20, 21]));
        assert_eq!(resolved[&3], Answer::Text("hello".into()));
    }

    #[test]
    fn collects_all_errors_in_question_order() {
        let questions = [
            question(1, QuestionType::SingleChoice, true),
            question(2, QuestionType::MultiChoice, true),
            question(3, QuestionType::ShortText, true),
        ];
        let raw = payload(&[("2", json!("not a list")), ("3", json!("   "))]);

        let errors = validate_answers(&questions, &raw).unwrap_err();
        assert_eq!(
            errors,
            vec![
                "question 1 is required",
                "question 2: expected a list of option ids",
                "question 3: answer text must not be empty",
            ]
        );
    }

    #[test]
    fn empty_multi_choice_on_required_question_is_an_error() {
        let questions = [question(5, QuestionType::MultiChoice, true)];
        let raw = payload(&[("5", json!([]))]);
        let errors = validate_answers(&questions, &raw).unwrap_err();
        assert_eq!(errors, vec!["question 5 is required"]);
    }

    #[test]
    fn optional_questions_may_be_omitted_but_not_malformed() {
        let questions = [question(7, QuestionType::SingleChoice, false)];

        assert!(validate_answers(&questions, &HashMap::new())
            .unwrap()
            .is_empty());

        let raw = payload(&[("7", json!("abc"))]);
        let errors = validate_answers(&questions, &raw).unwrap_err();
        assert_eq!(errors, vec!["question 7: expected an option id"]);
    }

    #[test]
    fn numeric_strings_are_accepted_as_option_ids() {
        let questions = [
            question(1, QuestionType::SingleChoice, true),
            question(2, QuestionType::MultiChoice, true),
        ];
        let raw = payload(&[("1", json!("10")), ("2", json!(["3", 4]))]);
        let resolved = validate_answers(&questions, &raw).unwrap();
        assert_eq!(resolved[&1], Answer::Choice(10));
        assert_eq!(resolved[&2], Answer::Choices(vec![3, 4]));
    }

    #[test]
    fn non_positive_option_ids_are_rejected() {
        let questions = [question(1, QuestionType::SingleChoice, true)];
        let raw = payload(&[("1", json!(0))]);
        assert!(validate_answers(&questions, &raw).is_err());

        let raw = payload(&[("1", json!(-4))]);
        assert!(validate_answers(&questions, &raw).is_err());
    }

    #[test]
    fn answers_for_unknown_questions_are_ignored() {
        let questions = [question(1, QuestionType::ShortText, false)];
        let raw = payload(&[("999", json!("stray"))]);
        assert!(validate_answers(&questions, &raw).unwrap().is_empty());
    }
}
