use axum::http::{Method, StatusCode};
use serde_json::json;
use sqlx::PgPool;
use tower::ServiceExt;

use crate::db::models::{Question, QuestionOption, Survey, User};
use crate::db::types::QuestionType;
use crate::repositories;
use crate::test_support::{self, TestContext};

struct QuizFixture {
    survey: Survey,
    single: Question,
    correct_option: QuestionOption,
    wrong_option: QuestionOption,
    text: Question,
}

/// Two-question quiz worth 2 points: one single-choice, one short-text
/// with expected answer "Paris".
async fn build_quiz(pool: &PgPool, owner: &User) -> QuizFixture {
    let survey = test_support::insert_survey(pool, "Capitals quiz", owner.id, true).await;
    let single =
        test_support::insert_question(pool, survey.id, QuestionType::SingleChoice, true, 0, 1, None)
            .await;
    let correct_option = test_support::insert_option(pool, single.id, "Rome", 0, true).await;
    let wrong_option = test_support::insert_option(pool, single.id, "Milan", 1, false).await;
    let text = test_support::insert_question(
        pool,
        survey.id,
        QuestionType::ShortText,
        true,
        1,
        1,
        Some("Paris"),
    )
    .await;

    QuizFixture { survey, single, correct_option, wrong_option, text }
}

async fn submit(
    ctx: &TestContext,
    survey_id: i64,
    token: Option<&str>,
    answers: serde_json::Value,
) -> axum::response::Response {
    ctx.app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/surveys/{survey_id}/submit"),
            token,
            Some(json!({ "answers": answers })),
        ))
        .await
        .expect("submit request")
}

#[tokio::test]
async fn quiz_submission_scores_and_reports_percentage() {
    let ctx = test_support::setup_test_context().await;
    let owner = test_support::insert_user(ctx.state.db(), "owner", "Owner", "pw").await;
    let quiz = build_quiz(ctx.state.db(), &owner).await;

    let response = submit(
        &ctx,
        quiz.survey.id,
        None,
        json!({
            quiz.single.id.to_string(): quiz.correct_option.id,
            quiz.text.id.to_string(): "london",
        }),
    )
    .await;

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "1/2 points (50.0%)");
    assert_eq!(body["data"]["total_score"], 1);
    assert_eq!(body["data"]["max_score"], 2);
    assert_eq!(body["data"]["is_quiz"], true);
    assert_eq!(body["data"]["percentage"], 50.0);

    let response_id = body["data"]["response_id"].as_i64().expect("response id");
    let stored = repositories::responses::find_by_id(ctx.state.db(), response_id)
        .await
        .expect("load response")
        .expect("response row");
    assert_eq!(stored.total_score, 1);
    assert_eq!(stored.max_score, 2);

    let answers = repositories::answers::list_by_response(ctx.state.db(), response_id)
        .await
        .expect("load answers");
    assert_eq!(answers.len(), 2);
    let choice = answers.iter().find(|a| a.question_id == quiz.single.id).expect("choice row");
    assert!(choice.is_correct);
    assert_eq!(choice.points_earned, 1);
    let text = answers.iter().find(|a| a.question_id == quiz.text.id).expect("text row");
    assert!(!text.is_correct);
    assert_eq!(text.points_earned, 0);
}

#[tokio::test]
async fn text_grading_ignores_case_and_surrounding_whitespace() {
    let ctx = test_support::setup_test_context().await;
    let owner = test_support::insert_user(ctx.state.db(), "owner", "Owner", "pw").await;
    let quiz = build_quiz(ctx.state.db(), &owner).await;

    let response = submit(
        &ctx,
        quiz.survey.id,
        None,
        json!({
            quiz.single.id.to_string(): quiz.wrong_option.id,
            quiz.text.id.to_string(): "  PARIS ",
        }),
    )
    .await;

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["data"]["total_score"], 1);
    assert_eq!(body["message"], "1/2 points (50.0%)");
}

#[tokio::test]
async fn plain_survey_records_answers_without_grading() {
    let ctx = test_support::setup_test_context().await;
    let owner = test_support::insert_user(ctx.state.db(), "owner", "Owner", "pw").await;
    let survey = test_support::insert_survey(ctx.state.db(), "Feedback", owner.id, true).await;
    let question = test_support::insert_question(
        ctx.state.db(),
        survey.id,
        QuestionType::LongText,
        true,
        0,
        1,
        None,
    )
    .await;

    let response = submit(
        &ctx,
        survey.id,
        None,
        json!({ question.id.to_string(): "great course" }),
    )
    .await;

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["data"]["is_quiz"], false);
    assert_eq!(body["data"]["total_score"], 0);
    assert_eq!(body["data"]["max_score"], 0);
    assert_eq!(body["message"], "Thank you for completing the survey!");

    let response_id = body["data"]["response_id"].as_i64().expect("response id");
    let answers = repositories::answers::list_by_response(ctx.state.db(), response_id)
        .await
        .expect("load answers");
    assert_eq!(answers.len(), 1);
    assert!(!answers[0].is_correct);
    assert_eq!(answers[0].points_earned, 0);
    assert_eq!(answers[0].answer_text.as_deref(), Some("great course"));
}

#[tokio::test]
async fn duplicate_submission_is_rejected_without_a_new_row() {
    let ctx = test_support::setup_test_context().await;
    let owner = test_support::insert_user(ctx.state.db(), "owner", "Owner", "pw").await;
    let respondent = test_support::insert_user(ctx.state.db(), "student", "Student", "pw").await;
    let quiz = build_quiz(ctx.state.db(), &owner).await;
    let token = test_support::bearer_token(&ctx.state, &respondent);

    let answers = json!({
        quiz.single.id.to_string(): quiz.correct_option.id,
        quiz.text.id.to_string(): "paris",
    });

    let first = submit(&ctx, quiz.survey.id, Some(&token), answers.clone()).await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = submit(&ctx, quiz.survey.id, Some(&token), answers).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);

    let count = repositories::responses::count_by_survey(ctx.state.db(), quiz.survey.id)
        .await
        .expect("count responses");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn retake_grant_allows_exactly_one_more_submission() {
    let ctx = test_support::setup_test_context().await;
    let owner = test_support::insert_user(ctx.state.db(), "owner", "Owner", "pw").await;
    let respondent = test_support::insert_user(ctx.state.db(), "student", "Student", "pw").await;
    let quiz = build_quiz(ctx.state.db(), &owner).await;
    let owner_token = test_support::bearer_token(&ctx.state, &owner);
    let token = test_support::bearer_token(&ctx.state, &respondent);

    let answers = json!({
        quiz.single.id.to_string(): quiz.correct_option.id,
        quiz.text.id.to_string(): "paris",
    });

    let first = submit(&ctx, quiz.survey.id, Some(&token), answers.clone()).await;
    assert_eq!(first.status(), StatusCode::CREATED);

    let grant = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/surveys/{}/retakes", quiz.survey.id),
            Some(&owner_token),
            Some(json!({ "user_id": respondent.id })),
        ))
        .await
        .expect("grant request");
    assert_eq!(grant.status(), StatusCode::CREATED);

    let second = submit(&ctx, quiz.survey.id, Some(&token), answers.clone()).await;
    assert_eq!(second.status(), StatusCode::CREATED);

    // the grant is single-use
    let third = submit(&ctx, quiz.survey.id, Some(&token), answers).await;
    assert_eq!(third.status(), StatusCode::CONFLICT);

    let grants = repositories::retakes::list_by_survey(ctx.state.db(), quiz.survey.id)
        .await
        .expect("list retakes");
    assert_eq!(grants.len(), 1);
    assert!(grants[0].used_at.is_some());

    let count = repositories::responses::count_by_survey(ctx.state.db(), quiz.survey.id)
        .await
        .expect("count responses");
    assert_eq!(count, 2);
}

#[tokio::test]
async fn duplicate_active_grant_is_rejected() {
    let ctx = test_support::setup_test_context().await;
    let owner = test_support::insert_user(ctx.state.db(), "owner", "Owner", "pw").await;
    let respondent = test_support::insert_user(ctx.state.db(), "student", "Student", "pw").await;
    let quiz = build_quiz(ctx.state.db(), &owner).await;
    let owner_token = test_support::bearer_token(&ctx.state, &owner);

    for expected in [StatusCode::CREATED, StatusCode::CONFLICT] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/surveys/{}/retakes", quiz.survey.id),
                Some(&owner_token),
                Some(json!({ "user_id": respondent.id })),
            ))
            .await
            .expect("grant request");
        assert_eq!(response.status(), expected);
    }
}

#[tokio::test]
async fn retake_management_requires_survey_ownership() {
    let ctx = test_support::setup_test_context().await;
    let owner = test_support::insert_user(ctx.state.db(), "owner", "Owner", "pw").await;
    let outsider = test_support::insert_user(ctx.state.db(), "other", "Other", "pw").await;
    let respondent = test_support::insert_user(ctx.state.db(), "student", "Student", "pw").await;
    let quiz = build_quiz(ctx.state.db(), &owner).await;
    let outsider_token = test_support::bearer_token(&ctx.state, &outsider);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/surveys/{}/retakes", quiz.survey.id),
            Some(&outsider_token),
            Some(json!({ "user_id": respondent.id })),
        ))
        .await
        .expect("grant request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let admin = test_support::insert_admin(ctx.state.db(), "admin", "Admin", "pw").await;
    let admin_token = test_support::bearer_token(&ctx.state, &admin);
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/surveys/{}/retakes", quiz.survey.id),
            Some(&admin_token),
            Some(json!({ "user_id": respondent.id })),
        ))
        .await
        .expect("grant request");
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn granting_a_retake_to_an_unknown_user_is_not_found() {
    let ctx = test_support::setup_test_context().await;
    let owner = test_support::insert_user(ctx.state.db(), "owner", "Owner", "pw").await;
    let quiz = build_quiz(ctx.state.db(), &owner).await;
    let owner_token = test_support::bearer_token(&ctx.state, &owner);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/surveys/{}/retakes", quiz.survey.id),
            Some(&owner_token),
            Some(json!({ "user_id": 424242 })),
        ))
        .await
        .expect("grant request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn revoking_an_unused_grant_removes_it() {
    let ctx = test_support::setup_test_context().await;
    let owner = test_support::insert_user(ctx.state.db(), "owner", "Owner", "pw").await;
    let respondent = test_support::insert_user(ctx.state.db(), "student", "Student", "pw").await;
    let quiz = build_quiz(ctx.state.db(), &owner).await;
    let owner_token = test_support::bearer_token(&ctx.state, &owner);

    repositories::retakes::grant(ctx.state.db(), quiz.survey.id, respondent.id, owner.id)
        .await
        .expect("grant")
        .expect("fresh grant");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/surveys/{}/retakes/{}", quiz.survey.id, respondent.id),
            Some(&owner_token),
            None,
        ))
        .await
        .expect("revoke request");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // a second revoke finds nothing
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::DELETE,
            &format!("/api/v1/surveys/{}/retakes/{}", quiz.survey.id, respondent.id),
            Some(&owner_token),
            None,
        ))
        .await
        .expect("revoke request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_required_answers_fail_validation_and_persist_nothing() {
    let ctx = test_support::setup_test_context().await;
    let owner = test_support::insert_user(ctx.state.db(), "owner", "Owner", "pw").await;
    let survey = test_support::insert_survey(ctx.state.db(), "Multi", owner.id, true).await;
    let question = test_support::insert_question(
        ctx.state.db(),
        survey.id,
        QuestionType::MultiChoice,
        true,
        0,
        1,
        None,
    )
    .await;
    test_support::insert_option(ctx.state.db(), question.id, "A", 0, true).await;

    let response = submit(&ctx, survey.id, None, json!({ question.id.to_string(): [] })).await;

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "response: {body}");
    assert_eq!(body["detail"][0], format!("question {} is required", question.id));

    let count = repositories::responses::count_by_survey(ctx.state.db(), survey.id)
        .await
        .expect("count responses");
    assert_eq!(count, 0);
}

#[tokio::test]
async fn inactive_and_missing_surveys_are_rejected() {
    let ctx = test_support::setup_test_context().await;
    let owner = test_support::insert_user(ctx.state.db(), "owner", "Owner", "pw").await;
    let inactive = test_support::insert_survey(ctx.state.db(), "Closed", owner.id, false).await;

    let response = submit(&ctx, inactive.id, None, json!({})).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = submit(&ctx, 424242, None, json!({})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn survey_view_strips_the_answer_key() {
    let ctx = test_support::setup_test_context().await;
    let owner = test_support::insert_user(ctx.state.db(), "owner", "Owner", "pw").await;
    let quiz = build_quiz(ctx.state.db(), &owner).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/surveys/{}", quiz.survey.id),
            None,
            None,
        ))
        .await
        .expect("get survey");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["questions"].as_array().expect("questions").len(), 2);
    let rendered = body.to_string();
    assert!(!rendered.contains("is_correct"));
    assert!(!rendered.contains("correct_answer"));
    assert!(!rendered.contains("Paris"));
}

#[tokio::test]
async fn results_aggregate_counts_and_scores_for_the_owner() {
    let ctx = test_support::setup_test_context().await;
    let owner = test_support::insert_user(ctx.state.db(), "owner", "Owner", "pw").await;
    let respondent = test_support::insert_user(ctx.state.db(), "student", "Student", "pw").await;
    let quiz = build_quiz(ctx.state.db(), &owner).await;
    let owner_token = test_support::bearer_token(&ctx.state, &owner);
    let token = test_support::bearer_token(&ctx.state, &respondent);

    let response = submit(
        &ctx,
        quiz.survey.id,
        Some(&token),
        json!({
            quiz.single.id.to_string(): quiz.correct_option.id,
            quiz.text.id.to_string(): "paris",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/surveys/{}/results", quiz.survey.id),
            Some(&owner_token),
            None,
        ))
        .await
        .expect("results request");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["response_count"], 1);
    assert_eq!(body["is_quiz"], true);
    assert_eq!(body["average_score"], 2.0);
    assert_eq!(body["max_score"], 2);

    let questions = body["questions"].as_array().expect("question stats");
    let single = questions
        .iter()
        .find(|q| q["question_id"] == quiz.single.id)
        .expect("single stats");
    let picked = single["options"]
        .as_array()
        .expect("options")
        .iter()
        .find(|o| o["option_id"] == quiz.correct_option.id)
        .expect("picked option");
    assert_eq!(picked["count"], 1);

    let text = questions.iter().find(|q| q["question_id"] == quiz.text.id).expect("text stats");
    assert_eq!(text["text_answers"][0], "paris");

    // respondents cannot read results
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/surveys/{}/results", quiz.survey.id),
            Some(&token),
            None,
        ))
        .await
        .expect("results request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_option_id_is_recorded_and_graded_incorrect() {
    let ctx = test_support::setup_test_context().await;
    let owner = test_support::insert_user(ctx.state.db(), "owner", "Owner", "pw").await;
    let survey = test_support::insert_survey(ctx.state.db(), "Two singles", owner.id, true).await;
    let q1 = test_support::insert_question(
        ctx.state.db(),
        survey.id,
        QuestionType::SingleChoice,
        true,
        0,
        1,
        None,
    )
    .await;
    let q1_correct = test_support::insert_option(ctx.state.db(), q1.id, "right", 0, true).await;
    let q2 = test_support::insert_question(
        ctx.state.db(),
        survey.id,
        QuestionType::SingleChoice,
        true,
        1,
        1,
        None,
    )
    .await;
    test_support::insert_option(ctx.state.db(), q2.id, "right", 0, true).await;

    // q2 gets an id that matches no stored option at all
    let response = submit(
        &ctx,
        survey.id,
        None,
        json!({
            q1.id.to_string(): q1_correct.id,
            q2.id.to_string(): 424299,
        }),
    )
    .await;

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["data"]["total_score"], 1);
    assert_eq!(body["data"]["max_score"], 2);
    assert_eq!(body["data"]["percentage"], 50.0);
    assert_eq!(body["message"], "1/2 points (50.0%)");

    let response_id = body["data"]["response_id"].as_i64().expect("response id");
    let answers = repositories::answers::list_by_response(ctx.state.db(), response_id)
        .await
        .expect("load answers");
    let stray = answers.iter().find(|a| a.question_id == q2.id).expect("recorded answer");
    assert_eq!(stray.option_id, Some(424299));
    assert!(!stray.is_correct);
    assert_eq!(stray.points_earned, 0);
}

#[tokio::test]
async fn concurrent_retake_submissions_consume_the_grant_once() {
    let ctx = test_support::setup_test_context().await;
    let owner = test_support::insert_user(ctx.state.db(), "owner", "Owner", "pw").await;
    let respondent = test_support::insert_user(ctx.state.db(), "student", "Student", "pw").await;
    let quiz = build_quiz(ctx.state.db(), &owner).await;
    let token = test_support::bearer_token(&ctx.state, &respondent);

    let answers = json!({
        quiz.single.id.to_string(): quiz.correct_option.id,
        quiz.text.id.to_string(): "paris",
    });

    let first = submit(&ctx, quiz.survey.id, Some(&token), answers.clone()).await;
    assert_eq!(first.status(), StatusCode::CREATED);

    repositories::retakes::grant(ctx.state.db(), quiz.survey.id, respondent.id, owner.id)
        .await
        .expect("grant")
        .expect("fresh grant");

    let (left, right) = tokio::join!(
        submit(&ctx, quiz.survey.id, Some(&token), answers.clone()),
        submit(&ctx, quiz.survey.id, Some(&token), answers.clone()),
    );

    let mut statuses = [left.status(), right.status()];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);

    let grants = repositories::retakes::list_by_survey(ctx.state.db(), quiz.survey.id)
        .await
        .expect("list retakes");
    assert_eq!(grants.len(), 1);
    assert!(grants[0].used_at.is_some());

    let count = repositories::responses::count_by_survey(ctx.state.db(), quiz.survey.id)
        .await
        .expect("count responses");
    assert_eq!(count, 2);
}

#[tokio::test]
async fn failed_answer_insert_leaves_no_response_behind() {
    let ctx = test_support::setup_test_context().await;
    let owner = test_support::insert_user(ctx.state.db(), "owner", "Owner", "pw").await;
    let quiz = build_quiz(ctx.state.db(), &owner).await;

    let mut tx = ctx.state.db().begin().await.expect("begin");
    repositories::responses::lock_submission(&mut tx, quiz.survey.id, owner.id)
        .await
        .expect("lock");
    let response_id =
        repositories::responses::insert_shell(&mut tx, quiz.survey.id, Some(owner.id), None)
            .await
            .expect("shell");

    // second row violates the one-of-option-or-text check
    let rows = [
        repositories::answers::NewAnswer {
            question_id: quiz.single.id,
            option_id: Some(quiz.correct_option.id),
            answer_text: None,
            is_correct: true,
            points_earned: 1,
        },
        repositories::answers::NewAnswer {
            question_id: quiz.text.id,
            option_id: None,
            answer_text: None,
            is_correct: false,
            points_earned: 0,
        },
    ];
    let result = repositories::answers::insert_batch(&mut tx, response_id, &rows).await;
    assert!(result.is_err(), "malformed answer row must fail");
    tx.rollback().await.expect("rollback");

    let count = repositories::responses::count_by_survey(ctx.state.db(), quiz.survey.id)
        .await
        .expect("count responses");
    assert_eq!(count, 0, "rolled-back shell must not survive");
}

#[tokio::test]
async fn multi_choice_scoring_is_all_or_nothing_end_to_end() {
    let ctx = test_support::setup_test_context().await;
    let owner = test_support::insert_user(ctx.state.db(), "owner", "Owner", "pw").await;
    let survey = test_support::insert_survey(ctx.state.db(), "Sets", owner.id, true).await;
    let question = test_support::insert_question(
        ctx.state.db(),
        survey.id,
        QuestionType::MultiChoice,
        true,
        0,
        2,
        None,
    )
    .await;
    let a = test_support::insert_option(ctx.state.db(), question.id, "A", 0, true).await;
    let b = test_support::insert_option(ctx.state.db(), question.id, "B", 1, true).await;
    let c = test_support::insert_option(ctx.state.db(), question.id, "C", 2, false).await;

    let response =
        submit(&ctx, survey.id, None, json!({ question.id.to_string(): [a.id, c.id] })).await;
    let body = test_support::read_json(response).await;
    assert_eq!(body["data"]["total_score"], 0, "partial match: {body}");

    let response =
        submit(&ctx, survey.id, None, json!({ question.id.to_string(): [b.id, a.id] })).await;
    let body = test_support::read_json(response).await;
    assert_eq!(body["data"]["total_score"], 2, "exact set: {body}");
    assert_eq!(body["message"], "2/2 points (100.0%)");
}
