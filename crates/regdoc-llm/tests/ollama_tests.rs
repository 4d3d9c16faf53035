use serde_json::json;

use regdoc_core::config::LlmSettings;
use regdoc_llm::providers::ollama::{build_request_body, parse_generate_response};
use regdoc_llm::{LanguageModel, LlmError, OllamaModel};

#[test]
fn request_body_carries_sampling_options() {
    let settings = LlmSettings::default();
    let body = build_request_body(&settings, "What is academic probation?");
    assert_eq!(body["model"], "llama3.1");
    assert_eq!(body["prompt"], "What is academic probation?");
    assert_eq!(body["stream"], false);
    assert_eq!(body["options"]["num_ctx"], 4096);
    assert!((body["options"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    assert!((body["options"]["top_p"].as_f64().unwrap() - 0.9).abs() < 1e-6);
    assert!((body["options"]["repeat_penalty"].as_f64().unwrap() - 1.1).abs() < 1e-6);
}

#[test]
fn parses_response_field() {
    let text = parse_generate_response(&json!({"model": "llama3.1", "response": "  Answer.\n", "done": true})).unwrap();
    assert_eq!(text, "Answer.");
}

#[test]
fn missing_response_is_parse_error() {
    let err = parse_generate_response(&json!({"done": true})).unwrap_err();
    assert!(matches!(err, LlmError::ParseError(_)));

    let err = parse_generate_response(&json!({"error": "model 'x' not found"})).unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
fn model_id_names_backend_and_model() {
    let m = OllamaModel::new(&LlmSettings { model: "mistral".into(), ..Default::default() }).unwrap();
    assert_eq!(m.model_id(), "ollama:mistral");
}

#[test]
fn empty_model_is_not_configured() {
    let err = OllamaModel::new(&LlmSettings { model: " ".into(), ..Default::default() }).err().unwrap();
    assert!(matches!(err, LlmError::NotConfigured(_)));
}
