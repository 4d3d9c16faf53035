use anyhow::{anyhow, bail, Result};
use arrow_array::cast::AsArray;
use arrow_array::{Array, FixedSizeListArray, Int32Array, RecordBatch, StringArray};
use futures::TryStreamExt;
use lancedb::query::ExecutableQuery;
use std::path::Path;
use tracing::info;

use regdoc_core::types::Chunk;

use crate::index::{EmbeddingIndex, IndexEntry};
use crate::table::{open_db, table_exists, MetaTable};
use crate::writer::SnapshotInfo;

/// Read the metadata of a snapshot without loading its rows.
pub async fn read_snapshot_info(dir: &Path, table: &str) -> Result<Option<SnapshotInfo>> {
    if !dir.exists() {
        return Ok(None);
    }
    let db = open_db(dir).await?;
    let meta = MetaTable::for_snapshot(&db, table);
    let mut pairs = meta.read_all().await?;
    let Some(embedder) = pairs.remove("embedder") else {
        return Ok(None);
    };
    let mut num = |key: &str| -> Result<usize> {
        pairs
            .remove(key)
            .ok_or_else(|| anyhow!("{} is missing '{}'", meta.name(), key))?
            .parse::<usize>()
            .map_err(|e| anyhow!("{} '{}' is not a number: {}", meta.name(), key, e))
    };
    let dim = num("dim")?;
    let rows = num("rows")?;
    Ok(Some(SnapshotInfo {
        embedder,
        dim,
        rows,
        built_at: pairs.remove("built_at").unwrap_or_default(),
        fingerprint: pairs.remove("fingerprint").unwrap_or_default(),
    }))
}

/// Load a snapshot back into memory. When `expected_embedder` is given, a snapshot
/// produced by a different embedder is refused since its vectors are not comparable.
pub async fn load_snapshot(dir: &Path, table: &str, expected_embedder: Option<&str>) -> Result<EmbeddingIndex> {
    let info = read_snapshot_info(dir, table)
        .await?
        .ok_or_else(|| anyhow!("no snapshot '{}' under {}", table, dir.display()))?;
    if let Some(expected) = expected_embedder {
        if expected != info.embedder {
            bail!("snapshot was built with embedder '{}', not '{}'", info.embedder, expected);
        }
    }

    let db = open_db(dir).await?;
    let mut rows: Vec<(i32, IndexEntry)> = Vec::with_capacity(info.rows);
    if table_exists(&db, table).await? {
        let t = db.open_table(table).execute().await?;
        let mut stream = t.query().execute().await?;
        while let Some(batch) = stream.try_next().await? {
            rows.extend(batch_to_entries(&batch)?);
        }
    }
    if rows.len() != info.rows {
        bail!("snapshot has {} rows, metadata says {}", rows.len(), info.rows);
    }
    rows.sort_by_key(|(pos, _)| *pos);
    let entries = rows.into_iter().map(|(_, e)| e).collect();
    let index = EmbeddingIndex::from_entries(info.embedder, info.dim, entries)?;
    info!(rows = index.len(), dir = %dir.display(), "index snapshot loaded");
    Ok(index)
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| anyhow!("snapshot column '{}' missing or mistyped", name))
}

fn batch_to_entries(batch: &RecordBatch) -> Result<Vec<(i32, IndexEntry)>> {
    let positions = column::<Int32Array>(batch, "position")?;
    let ids = column::<StringArray>(batch, "id")?;
    let sources = column::<StringArray>(batch, "source")?;
    let pages = column::<Int32Array>(batch, "page")?;
    let offsets = column::<Int32Array>(batch, "start_offset")?;
    let contents = column::<StringArray>(batch, "content")?;
    let vectors = column::<FixedSizeListArray>(batch, "vector")?;

    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let list = vectors.value(i);
        let vector = list.as_primitive::<arrow_array::types::Float32Type>().values().to_vec();
        let chunk = Chunk {
            id: ids.value(i).to_string(),
            text: contents.value(i).to_string(),
            source: sources.value(i).to_string(),
            page: if pages.is_null(i) { None } else { Some(pages.value(i) as usize) },
            start_offset: offsets.value(i) as usize,
        };
        out.push((positions.value(i), IndexEntry { chunk, vector }));
    }
    Ok(out)
}
