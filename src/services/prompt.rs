// src/services/prompt.rs

//! Prompt text for AI question generation.

use std::fmt::Write;

use crate::models::{generation::GenerateRequest, question::QuestionType};

/// Opening marker of the JSON block the model must return.
pub const JSON_START_MARKER: &str = "```json";
/// Closing marker of the JSON block.
pub const JSON_END_MARKER: &str = "```";

const OUTPUT_SCHEMA: &str = r#"{
  "questions": [
    {
      "title": "question text",
      "type": "CHOICE",
      "multi": false,
      "difficulty": "MEDIUM",
      "score": 5,
      "choices": [
        {"content": "option text", "isCorrect": true, "sort": 0},
        {"content": "option text", "isCorrect": false, "sort": 1}
      ],
      "answer": "",
      "analysis": "why the answer is correct"
    }
  ]
}"#;

/// Known types in request order, without duplicates.
pub fn requested_types(req: &GenerateRequest) -> Vec<QuestionType> {
    let mut types = Vec::new();
    for raw in &req.types {
        let kind = QuestionType::parse(raw);
        if kind != QuestionType::Other && !types.contains(&kind) {
            types.push(kind);
        }
    }
    types
}

/// Builds the full prompt. The same request always yields the same text.
pub fn build_prompt(req: &GenerateRequest) -> String {
    let types = requested_types(req);
    let type_list = types.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ");

    let mut prompt = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(
        prompt,
        "You are an experienced exam author. Write {} questions about the topic \"{}\".",
        req.count,
        req.topic.trim()
    );
    prompt.push('\n');
    prompt.push_str("Requirements:\n");
    let _ = writeln!(prompt, "1. Question types: {}.", type_list);
    for kind in &types {
        let _ = writeln!(prompt, "   - {}: {}", kind.as_str(), type_guidance(*kind));
    }
    let _ = writeln!(prompt, "2. Difficulty: {}.", difficulty_wording(req.difficulty.as_deref()));
    prompt.push_str("3. Every question must be accurate, unambiguous and come with a short analysis.\n");
    prompt.push_str("4. Do not repeat questions.\n");

    if types.contains(&QuestionType::Choice) {
        if req.include_multiple {
            prompt.push_str(
                "5. Mix single-answer and multi-answer choice questions; set \"multi\" to true \
                 for multi-answer ones.\n",
            );
        } else {
            prompt.push_str("5. All choice questions are single-answer; set \"multi\" to false.\n");
        }
    }

    if let Some(extra) = req.requirements.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        let _ = writeln!(prompt, "\nAdditional requirements: {}", extra);
    }

    if types.contains(&QuestionType::Judge) {
        prompt.push_str("\nJudge questions:\n");
        prompt.push_str("- The answer must be exactly TRUE or FALSE.\n");
        prompt.push_str(
            "- Keep TRUE and FALSE answers balanced; do not make all answers the same.\n",
        );
        if types.len() == 1 && req.count > 1 {
            let _ = writeln!(prompt, "- {}", judge_split(req.count));
        }
    }

    prompt.push_str("\nOutput format:\n");
    prompt.push_str("Return only one JSON block, wrapped exactly like this:\n");
    prompt.push_str(JSON_START_MARKER);
    prompt.push('\n');
    prompt.push_str(OUTPUT_SCHEMA);
    prompt.push('\n');
    prompt.push_str(JSON_END_MARKER);
    prompt.push('\n');
    prompt.push_str("\nField rules:\n");
    prompt.push_str("- \"type\" is one of CHOICE, JUDGE, TEXT.\n");
    prompt.push_str("- \"difficulty\" is one of EASY, MEDIUM, HARD.\n");
    prompt.push_str(
        "- CHOICE: 4 choices with \"sort\" starting at 0, at least one with \"isCorrect\": true; \
         \"answer\" may be empty.\n",
    );
    prompt.push_str("- JUDGE: \"choices\" is an empty array and \"answer\" is TRUE or FALSE.\n");
    prompt.push_str("- TEXT: \"choices\" is an empty array and \"answer\" is the reference answer.\n");

    prompt
}

fn type_guidance(kind: QuestionType) -> &'static str {
    match kind {
        QuestionType::Choice => "multiple choice with 4 options",
        QuestionType::Judge => "a statement to be judged true or false",
        QuestionType::Text => "open question answered in a few sentences",
        QuestionType::Other => "",
    }
}

fn difficulty_wording(raw: Option<&str>) -> &'static str {
    match raw.map(|d| d.trim().to_ascii_uppercase()).as_deref() {
        Some("EASY") => "EASY, basic concepts and direct recall",
        Some("HARD") => "HARD, analysis and application across several concepts",
        _ => "MEDIUM, understanding and simple application",
    }
}

/// Numeric TRUE/FALSE split for judge-only batches.
fn judge_split(count: u32) -> String {
    let half = count / 2;
    if count % 2 == 0 {
        format!("Make exactly {} TRUE and {} FALSE answers.", half, half)
    } else {
        format!(
            "Make about {}-{} TRUE and about {}-{} FALSE answers.",
            half,
            half + 1,
            half,
            half + 1
        )
    }
}
