
use quizgen::clients::{MockCall, MockResponse};
use quizgen::config::{GeneratorConfig, KeyCheck, ParseFailure, SYSTEM_INSTRUCTION};
use quizgen::error::{AIError, GenerationError};
use quizgen::QuizItem;
use serde_json::json;

use crate::test_utils::{answering, auth_error, mock_generator, mock_generator_with_config, quota_error, CAPITALS_RESPONSE};

#[tokio::test]
async fn first_working_key_wins_and_keys_are_tried_in_order() {
    let (generator, handle) = mock_generator(&["k1", "k2", "k3", "k4"]);
    handle.set_response("k1", MockResponse::Fail(auth_error()));
    handle.set_response("k2", MockResponse::Fail(quota_error()));
    handle.set_response("k3", MockResponse::text("[]"));
    handle.set_response("k4", MockResponse::text("[]"));

    let items = generator.generate("anything").await.unwrap();

    assert!(items.is_empty());
    assert_eq!(handle.generate_keys(), vec!["k1", "k2", "k3"]);
    assert!(handle.probed_keys().is_empty());
}

#[tokio::test]
async fn exhausted_pool_reports_last_error() {
    let (generator, handle) = mock_generator(&["a", "b", "c"]);
    handle.set_response("a", MockResponse::Fail(quota_error()));
    handle.set_response("b", MockResponse::Fail(AIError::Mock("network down".into())));
    handle.set_response("c", MockResponse::Fail(auth_error()));

    let err = generator.generate("anything").await.unwrap_err();

    match &err {
        GenerationError::Exhausted { attempts, last } => {
            assert_eq!(*attempts, 3);
            assert_eq!(last, &auth_error());
        }
        other => panic!("expected Exhausted, got {:?}", other),
    }
    assert_eq!(err.last_error(), Some(&auth_error()));
    assert!(err.to_string().starts_with("No valid GENAI_KEYS found. Last error:"));
    assert_eq!(handle.generate_keys(), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn empty_pool_fails_without_calls() {
    let (generator, handle) = mock_generator(&[]);
    let err = generator.generate("anything").await.unwrap_err();
    assert!(matches!(err, GenerationError::NoCredentials));
    assert!(handle.calls().is_empty());
}

#[tokio::test]
async fn probe_policy_skips_keys_that_fail_the_probe() {
    let config = GeneratorConfig::default().with_key_check(KeyCheck::Probe);
    let (generator, handle) = mock_generator_with_config(&["bad", "good"], config);
    handle.set_response("bad", MockResponse::text("[]"));
    handle.fail_probe("bad", auth_error());
    handle.set_response("good", MockResponse::text(CAPITALS_RESPONSE));

    let items = generator.generate("capitals").await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(handle.probed_keys(), vec!["bad", "good"]);
    assert_eq!(handle.generate_keys(), vec!["good"]);
}

#[tokio::test]
async fn probe_success_then_generation_failure_falls_through() {
    let config = GeneratorConfig::default().with_key_check(KeyCheck::Probe);
    let (generator, handle) = mock_generator_with_config(&["flaky", "good"], config);
    handle.set_response("flaky", MockResponse::Fail(quota_error()));
    handle.set_response("good", MockResponse::text("[]"));

    generator.generate("x").await.unwrap();

    assert_eq!(handle.generate_keys(), vec!["flaky", "good"]);
}

#[tokio::test]
async fn request_carries_prompt_instruction_and_ceiling() {
    let config = GeneratorConfig::default().with_model("gemini-test").with_max_output_tokens(1000);
    let (generator, handle) = mock_generator_with_config(&["k"], config);
    handle.set_response("k", MockResponse::text("[]"));

    generator.generate("capitals of Europe").await.unwrap();

    match &handle.calls()[0] {
        MockCall::Generate { key, request } => {
            assert_eq!(key, "k");
            assert_eq!(request.prompt, "capitals of Europe");
            assert_eq!(request.model, "gemini-test");
            assert_eq!(request.max_output_tokens, 1000);
            assert_eq!(request.system_instruction, SYSTEM_INSTRUCTION);
        }
        other => panic!("expected a generation call, got {:?}", other),
    }
}

#[tokio::test]
async fn capitals_scenario_strips_fences() {
    let (generator, _) = answering(CAPITALS_RESPONSE);

    let items = generator.generate("capitals of Europe").await.unwrap();

    assert_eq!(
        items,
        vec![QuizItem::new("Capital of France?", ["Paris", "Lyon", "Nice", "Marseille", "Lille"], 0)]
    );
    assert_eq!(items[0].correct_answer, 0);
}

#[tokio::test]
async fn fenced_and_unfenced_arrays_parse_the_same() {
    let value = json!([
        {"question": "2 + 2?", "answers": ["3", "4", "5"], "correctAnswer": 1},
        {"question": "Largest planet?", "answers": ["Mars", "Jupiter"], "correctAnswer": 1, "extra": true}
    ]);
    let raw = value.to_string();
    let expected: Vec<QuizItem> = serde_json::from_value(value).unwrap();

    for text in [raw.clone(), format!("```json\n{}\n```", raw), format!("```\n{}\n```", raw), format!("  ```JSON\n{}\n```  \n", raw)] {
        let (generator, _) = answering(&text);
        assert_eq!(generator.generate("q").await.unwrap(), expected, "input: {}", text);
    }
}

#[tokio::test]
async fn out_of_range_correct_answer_passes_through() {
    let (generator, _) = answering(r#"[{"question":"q","answers":["a","b"],"correctAnswer":7}]"#);
    let items = generator.generate("q").await.unwrap();
    assert_eq!(items[0].correct_answer, 7);
}

#[tokio::test]
async fn unparseable_response_becomes_empty_list() {
    for text in ["Sure! Here is your quiz:", "```json\n[{\"question\": \"cut off", "{\"question\":\"not an array\"}", ""] {
        let (generator, handle) = answering(text);
        let items = generator.generate("q").await.unwrap();
        assert!(items.is_empty(), "input: {}", text);
        assert_eq!(handle.generate_keys(), vec!["good"]);
    }
}

#[tokio::test]
async fn parse_failure_does_not_try_the_next_key() {
    let (generator, handle) = mock_generator(&["first", "second"]);
    handle.set_response("first", MockResponse::text("garbage"));
    handle.set_response("second", MockResponse::text(CAPITALS_RESPONSE));

    assert!(generator.generate("q").await.unwrap().is_empty());
    assert_eq!(handle.generate_keys(), vec!["first"]);
}

#[tokio::test]
async fn error_policy_surfaces_parse_failures() {
    let config = GeneratorConfig::default().with_parse_failure(ParseFailure::Error);
    let (generator, handle) = mock_generator_with_config(&["k"], config);
    handle.set_response("k", MockResponse::text("not json"));

    match generator.generate("q").await {
        Err(GenerationError::Parse(_, raw)) => assert_eq!(raw, "not json"),
        other => panic!("expected a parse error, got {:?}", other),
    }
}
