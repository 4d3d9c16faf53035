//! `regdoc`: ask questions or analyze cases against the regulatory corpus.
use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand};
use regdoc_core::types::CaseFields;
use regdoc_rag::QueryOrchestrator;
use regdoc_cli::{
    build_orchestrator, example_case, example_cases, init_tracing, load_settings, print_answer, print_build_report,
};

#[derive(Parser, Debug)]
#[command(name = "regdoc", version, about = "Answers questions about institutional regulations")]
struct Cli {
    /// Print consulted sources with excerpts.
    #[arg(long, global = true)]
    full: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask a single question.
    Ask { question: String },
    /// Analyze a structured case.
    Case {
        #[arg(long)]
        context: String,
        #[arg(long)]
        actors: String,
        #[arg(long)]
        situation: String,
        #[arg(long)]
        question: String,
        #[arg(long)]
        aspects: Option<String>,
    },
    /// Run one of the built-in example cases (1-based; omit to list them).
    Example { number: Option<usize> },
    /// Interactive menu.
    Console,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    if let Command::Example { number: None } = cli.command {
        list_examples();
        return Ok(());
    }
    let (settings, base) = load_settings()?;
    let orch = build_orchestrator(settings, base)?;
    let report = orch.initialize().await?;

    match cli.command {
        Command::Ask { question } => {
            let answer = orch.query(&question).await?;
            print_answer(&answer, cli.full);
        }
        Command::Case { context, actors, situation, question, aspects } => {
            let case = CaseFields {
                context: Some(context),
                actors: Some(actors),
                situation: Some(situation),
                specific_question: Some(question),
                additional_aspects: aspects,
            };
            let answer = orch.analyze_case(&case).await?;
            print_answer(&answer, cli.full);
        }
        Command::Example { number: Some(n) } => {
            let example = example_case(n)
                .ok_or_else(|| anyhow::anyhow!("no example case {} (there are {})", n, example_cases().len()))?;
            let answer = orch.analyze_case(&example.case).await?;
            print_answer(&answer, cli.full);
        }
        Command::Example { number: None } => list_examples(),
        Command::Console => {
            print_build_report(&report);
            console(&orch, cli.full).await?;
        }
    }
    Ok(())
}

fn list_examples() {
    for (i, example) in example_cases().iter().enumerate() {
        println!("{}. {}", i + 1, example.title);
    }
}

fn prompt_line(label: &str) -> io::Result<Option<String>> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

async fn console(orch: &QueryOrchestrator, full: bool) -> anyhow::Result<()> {
    loop {
        println!("\n1) Simple query\n2) Case analysis\n3) Example cases\n4) Exit");
        let Some(choice) = prompt_line("> ")? else { return Ok(()) };
        let result = match choice.as_str() {
            "1" => {
                let Some(question) = optional(prompt_line("Question: ")?) else { continue };
                orch.query(&question).await
            }
            "2" => {
                let case = CaseFields {
                    context: optional(prompt_line("Context: ")?),
                    actors: optional(prompt_line("Actors involved: ")?),
                    situation: optional(prompt_line("Situation: ")?),
                    specific_question: optional(prompt_line("Specific question: ")?),
                    additional_aspects: optional(prompt_line("Aspects to consider (optional): ")?),
                };
                orch.analyze_case(&case).await
            }
            "3" => {
                list_examples();
                let Some(pick) = optional(prompt_line("Case number (empty to go back): ")?) else { continue };
                let Some(example) = pick.parse().ok().and_then(example_case) else {
                    println!("Unknown case '{}'", pick);
                    continue;
                };
                println!("\nAnalyzing: {}", example.title);
                orch.analyze_case(&example.case).await
            }
            "4" | "q" | "exit" => return Ok(()),
            other => {
                println!("Unknown option '{}'", other);
                continue;
            }
        };
        match result {
            Ok(answer) => print_answer(&answer, full),
            Err(e) => eprintln!("Error: {}", e),
        }
    }
}
