use std::fs;

use regdoc_core::config::{LlmSettings, PromptSettings};
use regdoc_core::error::Error;
use regdoc_core::types::{CaseFields, Chunk, Document, RetrievedChunk};
use regdoc_rag::case::{NOT_SPECIFIED, STANDARD_ANALYSIS};
use regdoc_rag::{compose_case_question, estimate_tokens, PromptComposer, Template};

fn retrieved(source: &str, page: Option<usize>, text: &str) -> RetrievedChunk {
    let doc = Document { text: text.to_string(), source: source.to_string(), page };
    RetrievedChunk { chunk: Chunk::new(&doc, text.to_string(), 0), similarity: 0.8, mmr_score: 0.5 }
}

fn small_composer(budget: usize, annotate: bool) -> PromptComposer {
    PromptComposer::new(Template::parse("CTX:{context}\nQ:{question}").unwrap(), budget, annotate)
}

#[test]
fn token_estimate_rounds_up() {
    assert_eq!(estimate_tokens(0), 0);
    assert_eq!(estimate_tokens(1), 1);
    assert_eq!(estimate_tokens(4), 1);
    assert_eq!(estimate_tokens(5), 2);
}

#[test]
fn question_is_always_a_contiguous_substring() {
    let composer = PromptComposer::new(Template::builtin().unwrap(), 3072, true);
    let question = "Can a student retake {an exam} a\nfourth time?";
    let chunks = vec![retrieved("reg.pdf", Some(2), "Article 12. Students may retake a course twice.")];
    let p = composer.compose(&chunks, question);
    assert!(p.text.contains(question));
    assert_eq!(p.included, 1);
    assert_eq!(p.dropped, 0);
}

#[test]
fn whole_chunks_are_dropped_from_the_end() {
    let a = "a".repeat(40);
    let b = "b".repeat(40);
    let c = "c".repeat(40);
    let chunks = vec![
        retrieved("1.txt", None, &a),
        retrieved("2.txt", None, &b),
        retrieved("3.txt", None, &c),
        retrieved("4.txt", None, "x"),
    ];
    // 7 fixed chars + 4 question chars; budget is 120 chars.
    let p = small_composer(30, false).compose(&chunks, "why?");
    assert_eq!(p.included, 2);
    assert_eq!(p.dropped, 2, "the small chunk after the first misfit is dropped too");
    assert_eq!(p.text, format!("CTX:{a}\n\n{b}\nQ:why?"));
    assert!(p.estimated_tokens <= 30);
}

#[test]
fn oversized_template_keeps_question_and_drops_all_context() {
    let chunks = vec![retrieved("1.txt", None, "some context")];
    let p = small_composer(2, false).compose(&chunks, "a long question that alone exceeds the budget");
    assert_eq!(p.included, 0);
    assert_eq!(p.dropped, 1);
    assert!(p.text.contains("a long question that alone exceeds the budget"));
}

#[test]
fn context_entries_are_annotated_with_source_and_page() {
    let chunks = vec![retrieved("reg.pdf", Some(3), "paged text"), retrieved("notes.txt", None, "plain text")];
    let p = small_composer(1000, true).compose(&chunks, "q");
    assert!(p.text.contains("[Source 1] reg.pdf (page 3)\npaged text"));
    assert!(p.text.contains("[Source 2] notes.txt\nplain text"));
}

#[test]
fn template_file_overrides_builtin() {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("t.txt"), "Docs:\n{context}\nAsk: {question}").unwrap();
    let prompt = PromptSettings { template_file: Some("t.txt".into()), annotate_sources: false, ..Default::default() };
    let composer = PromptComposer::from_settings(&prompt, &LlmSettings::default(), tmp.path()).unwrap();
    assert_eq!(composer.budget_tokens(), 4096 - 1024);
    let p = composer.compose(&[retrieved("x.txt", None, "body")], "hello");
    assert_eq!(p.text, "Docs:\nbody\nAsk: hello");
}

#[test]
fn missing_or_invalid_template_file_is_config_error() {
    let tmp = tempfile::tempdir().unwrap();
    let prompt = PromptSettings { template_file: Some("absent.txt".into()), ..Default::default() };
    let err = PromptComposer::from_settings(&prompt, &LlmSettings::default(), tmp.path()).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));

    fs::write(tmp.path().join("bad.txt"), "{question} {context}").unwrap();
    let prompt = PromptSettings { template_file: Some("bad.txt".into()), ..Default::default() };
    assert!(PromptComposer::from_settings(&prompt, &LlmSettings::default(), tmp.path()).is_err());
}

#[test]
fn case_question_lists_every_section() {
    let case = CaseFields {
        context: Some("Undergraduate program".into()),
        actors: Some("Student, course instructor".into()),
        situation: Some("Failed the same course three times".into()),
        specific_question: Some("Can the student enroll a fourth time?".into()),
        additional_aspects: Some("The student has a documented illness".into()),
    };
    let q = compose_case_question(&case);
    for expected in [
        "**CONTEXT:**\nUndergraduate program",
        "**ACTORS INVOLVED:**\nStudent, course instructor",
        "**SPECIFIC SITUATION:**\nFailed the same course three times",
        "**SPECIFIC QUESTION:**\nCan the student enroll a fourth time?",
        "**ASPECTS TO CONSIDER:**\nThe student has a documented illness",
    ] {
        assert!(q.contains(expected), "missing {expected:?}");
    }
}

#[test]
fn case_question_fills_placeholders() {
    let case = CaseFields {
        context: Some("Graduate school".into()),
        actors: Some("   ".into()),
        situation: None,
        specific_question: Some("Is the thesis deadline extendable?".into()),
        additional_aspects: None,
    };
    let q = compose_case_question(&case);
    assert!(q.contains(&format!("**ACTORS INVOLVED:**\n{NOT_SPECIFIED}")));
    assert!(q.contains(&format!("**SPECIFIC SITUATION:**\n{NOT_SPECIFIED}")));
    assert!(q.contains(&format!("**ASPECTS TO CONSIDER:**\n{STANDARD_ANALYSIS}")));
}
