//! `regdoc-index`: build the index from the corpus and write its snapshot.
use clap::Parser;
use tracing::info;

use regdoc_cli::{init_tracing, load_settings, print_build_report};
use regdoc_core::loader::DocumentLoader;
use regdoc_embed::get_default_embedder;
use regdoc_rag::build_index;
use regdoc_vector::save_snapshot;

#[derive(Parser, Debug)]
#[command(name = "regdoc-index", version, about = "Builds and persists the document index")]
struct Cli {
    /// Corpus directory; defaults to `corpus.dir`.
    corpus: Option<String>,

    /// Snapshot directory; defaults to `index.persist_dir`, then `./data/index`.
    #[arg(long)]
    persist_dir: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let (mut settings, base) = load_settings()?;
    if let Some(dir) = cli.corpus {
        settings.corpus.dir = dir;
    }
    if let Some(dir) = cli.persist_dir {
        settings.index.persist_dir = Some(dir);
    }
    let persist_dir = settings
        .persist_dir(&base)
        .unwrap_or_else(|| base.join("data").join("index"));

    let embedder = get_default_embedder(&settings.embedding, &base)?;
    let (index, mut report) = build_index(&settings, &base, &DocumentLoader::new(), embedder.as_ref())?;

    info!(dir = %persist_dir.display(), table = %settings.index.table, "writing snapshot");
    report.snapshot = Some(save_snapshot(&index, &persist_dir, &settings.index.table).await?);
    print_build_report(&report);
    Ok(())
}
