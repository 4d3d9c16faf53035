//! `regdoc-status`: describe the persisted index snapshot.
use std::collections::BTreeSet;

use clap::Parser;

use regdoc_cli::{init_tracing, load_settings};
use regdoc_vector::{load_snapshot, read_snapshot_info};

#[derive(Parser, Debug)]
#[command(name = "regdoc-status", version, about = "Prints statistics of the persisted index")]
struct Cli {
    /// Snapshot directory; defaults to `index.persist_dir`, then `./data/index`.
    #[arg(long)]
    persist_dir: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let (settings, base) = load_settings()?;
    let dir = match cli.persist_dir {
        Some(d) => regdoc_core::resolve_with_base(&base, d),
        None => settings.persist_dir(&base).unwrap_or_else(|| base.join("data").join("index")),
    };
    let table = &settings.index.table;

    let Some(info) = read_snapshot_info(&dir, table).await? else {
        println!("No snapshot '{}' under {}. Run regdoc-index first.", table, dir.display());
        return Ok(());
    };
    let index = load_snapshot(&dir, table, None).await?;
    let documents: BTreeSet<&str> = index.entries().iter().map(|e| e.chunk.source.as_str()).collect();
    let paged = index.entries().iter().filter(|e| e.chunk.page.is_some()).count();

    println!("Snapshot:     {}", dir.join(format!("{}.lance", table)).display());
    println!("Built at:     {}", info.built_at);
    println!("Embedder:     {} (dim {})", info.embedder, info.dim);
    println!("Chunks:       {}", info.rows);
    println!("Documents:    {}", documents.len());
    println!("Paged chunks: {}", paged);
    println!("Fingerprint:  {}", info.fingerprint);
    println!("Integrity:    {}", if index.fingerprint() == info.fingerprint { "ok" } else { "fingerprint mismatch" });
    Ok(())
}
