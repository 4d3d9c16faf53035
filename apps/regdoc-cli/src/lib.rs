//! Shared setup and output helpers for the `regdoc` binaries.
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use regdoc_core::config::{Config, Settings};
use regdoc_core::types::{Answer, CaseFields};
use regdoc_embed::get_default_embedder;
use regdoc_llm::OllamaModel;
use regdoc_rag::{BuildReport, QueryOrchestrator};

pub const EXCERPT_CHARS: usize = 400;

/// Log to stderr, `info` unless `RUST_LOG` says otherwise.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// Settings from `config.toml` and `APP_*` overrides; relative paths resolve
/// against the working directory.
pub fn load_settings() -> anyhow::Result<(Settings, PathBuf)> {
    let config = Config::load().context("loading configuration")?;
    let settings = config.settings()?;
    let base = std::env::current_dir()?;
    Ok((settings, base))
}

pub fn build_orchestrator(settings: Settings, base: PathBuf) -> anyhow::Result<QueryOrchestrator> {
    let embedder = get_default_embedder(&settings.embedding, &base)?;
    let llm = Arc::new(OllamaModel::new(&settings.llm)?);
    Ok(QueryOrchestrator::new(settings, base, embedder, llm)?)
}

/// First `max` characters of `text`, with an ellipsis when cut.
pub fn excerpt(text: &str, max: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", head.trim_end())
    } else {
        head
    }
}

/// A canned case shown in the console and runnable with `regdoc example <n>`.
#[derive(Debug, Clone)]
pub struct ExampleCase {
    pub title: &'static str,
    pub case: CaseFields,
}

fn case(context: &str, actors: &str, situation: &str, question: &str) -> CaseFields {
    CaseFields {
        context: Some(context.to_string()),
        actors: Some(actors.to_string()),
        situation: Some(situation.to_string()),
        specific_question: Some(question.to_string()),
        additional_aspects: None,
    }
}

pub fn example_cases() -> Vec<ExampleCase> {
    vec![
        ExampleCase {
            title: "Student with repeated failures",
            case: case(
                "Undergraduate academic regulations",
                "A student enrolled in Calculus I",
                "The student has failed Calculus I three consecutive times.",
                "What does the academic regulation establish for this situation, \
                 and what options does the student have to continue their studies?",
            ),
        },
        ExampleCase {
            title: "Academic plagiarism",
            case: case(
                "Student discipline",
                "A teacher and a student",
                "The teacher found that most of the student's research paper was copied \
                 from the internet without citing its sources.",
                "What sanctions does the regulation provide, and what disciplinary process must be followed?",
            ),
        },
        ExampleCase {
            title: "Exam retake",
            case: case(
                "Evaluation and exams",
                "A student",
                "The student could not attend the final exam because of a documented medical emergency.",
                "Is the student entitled to a retake, and what is the procedure?",
            ),
        },
    ]
}

/// 1-based lookup into [`example_cases`].
pub fn example_case(number: usize) -> Option<ExampleCase> {
    number.checked_sub(1).and_then(|i| example_cases().into_iter().nth(i))
}

pub fn print_build_report(report: &BuildReport) {
    println!(
        "Indexed {} document(s) into {} chunk(s) from {} file(s) in {:.1?}",
        report.documents, report.chunks, report.files_seen, report.elapsed
    );
    if report.skipped_unsupported > 0 {
        println!("Skipped {} file(s) with unsupported extensions", report.skipped_unsupported);
    }
    for failure in &report.failures {
        println!("  failed: {}", failure);
    }
    if let Some(snap) = &report.snapshot {
        println!("Snapshot: {} rows, embedder {}, fingerprint {}", snap.rows, snap.embedder, snap.fingerprint);
    }
    if let Some(err) = &report.persist_error {
        println!("Snapshot not written: {}", err);
    }
}

pub fn print_answer(answer: &Answer, full: bool) {
    println!("{}", answer.text);
    if let Some(overflow) = answer.truncation {
        println!("\n(note: {} retrieved passage(s) left out to fit the model's context)", overflow.dropped_chunks);
    }
    if !full {
        return;
    }
    println!("\nSources consulted: {}", answer.source_count);
    for (i, s) in answer.sources.iter().enumerate() {
        match s.page {
            Some(page) => println!("\n[{}] {} (page {})", i + 1, s.document, page),
            None => println!("\n[{}] {}", i + 1, s.document),
        }
        println!("    relevance: {} ({:.3})", s.relevance, s.similarity);
        println!("    {}", excerpt(&s.excerpt, EXCERPT_CHARS).replace('\n', "\n    "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_keeps_short_text() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("exactly", 7), "exactly");
    }

    #[test]
    fn excerpt_cuts_on_char_boundary() {
        assert_eq!(excerpt("ñandú ñandú", 5), "ñandú...");
        assert_eq!(excerpt("abc def", 4), "abc...");
    }

    #[test]
    fn example_cases_are_complete_and_one_based() {
        let cases = example_cases();
        assert_eq!(cases.len(), 3);
        for c in &cases {
            assert!(!c.title.is_empty());
            assert!(c.case.specific_question.as_deref().is_some_and(|q| q.ends_with('?')));
            assert!(c.case.situation.is_some());
        }
        assert_eq!(example_case(1).map(|c| c.title), Some("Student with repeated failures"));
        assert_eq!(example_case(3).map(|c| c.title), Some("Exam retake"));
        assert!(example_case(0).is_none());
        assert!(example_case(4).is_none());
    }
}
