// tests/generator_tests.rs

mod common;

use common::{add_category, envelope, spawn_app_with_replies};
use exam_bank::{
    error::AppError,
    models::{category::ROOT_PARENT_ID, generation::GenerateRequest},
};

const GENERATED: &str = r#"Sure, here are the questions.
```json
{
  "questions": [
    {
      "title": "Which joint needs no nails?",
      "type": "CHOICE",
      "multi": false,
      "difficulty": "EASY",
      "score": 5,
      "choices": [
        {"content": "Mortise and tenon", "isCorrect": true, "sort": 0},
        {"content": "Butt joint", "isCorrect": false, "sort": 1},
        {"content": "Lap joint", "isCorrect": false, "sort": 2}
      ],
      "answer": "",
      "analysis": "The tenon locks into the mortise."
    },
    {
      "title": "Glazed tiles were reserved for imperial buildings.",
      "type": "JUDGE",
      "multi": false,
      "difficulty": "MEDIUM",
      "score": 2,
      "choices": [],
      "answer": "TRUE",
      "analysis": "Yellow glazed tiles were imperial."
    }
  ]
}
```"#;

fn request(types: &[&str], count: u32) -> GenerateRequest {
    GenerateRequest {
        topic: "Traditional joinery".to_string(),
        count,
        types: types.iter().map(|t| t.to_string()).collect(),
        include_multiple: false,
        difficulty: Some("EASY".to_string()),
        requirements: Some("Avoid trick questions".to_string()),
        category_id: 12,
    }
}

#[tokio::test]
async fn succeeds_on_third_attempt() {
    // Arrange
    let app = spawn_app_with_replies(vec![
        Err(AppError::Upstream("connection reset".to_string())),
        Err(AppError::Upstream("502 Bad Gateway".to_string())),
        Ok(envelope(GENERATED)),
    ]);

    // Act
    let records = app
        .state
        .generator
        .generate(&request(&["CHOICE", "JUDGE"], 2))
        .await
        .unwrap();

    // Assert
    assert_eq!(app.client.calls(), 3);
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.category_id == 12));
    assert_eq!(records[0].choices.len(), 3);
    assert_eq!(records[1].answer.as_deref(), Some("TRUE"));
}

#[tokio::test]
async fn non_json_replies_exhaust_retries() {
    // Arrange
    let app = spawn_app_with_replies(vec![
        Ok("<html>gateway timeout</html>".to_string()),
        Ok("not json".to_string()),
        Ok("still not json".to_string()),
    ]);

    // Act
    let result = app.state.generator.generate(&request(&["TEXT"], 1)).await;

    // Assert
    assert_eq!(app.client.calls(), 3);
    match result {
        Err(AppError::AiUnavailable { attempts, last }) => {
            assert_eq!(attempts, 3);
            match *last {
                AppError::MalformedAiResponse { content, .. } => {
                    assert_eq!(content, "still not json")
                }
                other => panic!("expected MalformedAiResponse as last error, got {:?}", other),
            }
        }
        other => panic!("expected AiUnavailable, got {:?}", other),
    }
}

#[tokio::test]
async fn error_envelope_and_empty_content_are_retried() {
    let app = spawn_app_with_replies(vec![
        Ok(r#"{"error": {"message": "rate limited", "type": "rate_limit"}}"#.to_string()),
        Ok(envelope("   ")),
        Ok(envelope(GENERATED)),
    ]);

    let records = app
        .state
        .generator
        .generate(&request(&["CHOICE", "JUDGE"], 2))
        .await
        .unwrap();

    assert_eq!(app.client.calls(), 3);
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn missing_fence_is_malformed_without_retry() {
    let app = spawn_app_with_replies(vec![Ok(envelope("{\"questions\": []}"))]);

    let result = app.state.generator.generate(&request(&["TEXT"], 1)).await;

    assert_eq!(app.client.calls(), 1);
    match result {
        Err(AppError::MalformedAiResponse { content, .. }) => {
            assert_eq!(content, "{\"questions\": []}")
        }
        other => panic!("expected MalformedAiResponse, got {:?}", other),
    }
}

#[tokio::test]
async fn judge_only_prompt_requests_balanced_split() {
    let app = spawn_app_with_replies(vec![Ok(envelope(GENERATED))]);

    app.state
        .generator
        .generate(&request(&["JUDGE"], 4))
        .await
        .unwrap();

    let prompts = app.client.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("2 TRUE and 2 FALSE"));
    assert!(prompts[0].contains("Traditional joinery"));
    assert!(prompts[0].contains("Avoid trick questions"));
}

#[tokio::test]
async fn invalid_requests_never_reach_the_client() {
    let app = spawn_app_with_replies(Vec::new());

    let zero = app.state.generator.generate(&request(&["TEXT"], 0)).await;
    let unknown_type = app.state.generator.generate(&request(&["ESSAY"], 2)).await;

    assert!(matches!(zero, Err(AppError::BadRequest(_))));
    assert!(matches!(unknown_type, Err(AppError::BadRequest(_))));
    assert_eq!(app.client.calls(), 0);
}

#[tokio::test]
async fn generated_records_import_into_the_bank() {
    // Arrange
    let app = spawn_app_with_replies(vec![Ok(envelope(GENERATED))]);
    let category = add_category(&app, "Joinery", ROOT_PARENT_ID).await;
    let mut req = request(&["CHOICE", "JUDGE"], 2);
    req.category_id = category.id;

    // Act
    let records = app.state.generator.generate(&req).await.unwrap();
    let summary = app.state.questions.import_records(records).await.unwrap();

    // Assert
    assert_eq!(summary.imported, 2, "failures: {:?}", summary.failures);
    let tree = app.state.categories.build_tree().await.unwrap();
    assert_eq!(tree[0].count, 2);
}
