use anyhow::Result;
use arrow_array::{FixedSizeListArray, Int32Array, RecordBatch, RecordBatchIterator, StringArray};
use chrono::Utc;
use lancedb::Connection;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::index::{EmbeddingIndex, IndexEntry};
use crate::schema::build_entries_schema;
use crate::table::{open_db, table_exists, MetaTable};

const INSERT_BATCH: usize = 1000;

/// Summary stored next to a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotInfo {
    pub embedder: String,
    pub dim: usize,
    pub rows: usize,
    pub built_at: String,
    pub fingerprint: String,
}

/// Write `index` to `<dir>/<table>.lance`, replacing any previous snapshot of that table.
pub async fn save_snapshot(index: &EmbeddingIndex, dir: &Path, table: &str) -> Result<SnapshotInfo> {
    std::fs::create_dir_all(dir)?;
    let stale = dir.join(format!("{}.lance", table));
    if stale.exists() {
        std::fs::remove_dir_all(&stale)?;
    }
    let db = open_db(dir).await?;

    let dim = index.dim() as i32;
    for (batch_no, batch) in index.entries().chunks(INSERT_BATCH).enumerate() {
        let rb = entries_to_record_batch(batch, batch_no * INSERT_BATCH, dim)?;
        insert_batch(&db, table, rb).await?;
    }

    let info = SnapshotInfo {
        embedder: index.embedder().to_string(),
        dim: index.dim(),
        rows: index.len(),
        built_at: Utc::now().to_rfc3339(),
        fingerprint: index.fingerprint(),
    };
    MetaTable::for_snapshot(&db, table)
        .write(&[
            ("embedder", info.embedder.clone()),
            ("dim", info.dim.to_string()),
            ("rows", info.rows.to_string()),
            ("built_at", info.built_at.clone()),
            ("fingerprint", info.fingerprint.clone()),
        ])
        .await?;
    info!(rows = info.rows, dir = %dir.display(), table, "index snapshot written");
    Ok(info)
}

async fn insert_batch(db: &Connection, table: &str, rb: RecordBatch) -> Result<()> {
    let schema = rb.schema();
    let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), schema));
    if table_exists(db, table).await? {
        db.open_table(table).execute().await?.add(reader).execute().await?;
    } else {
        db.create_table(table, reader).execute().await?;
    }
    Ok(())
}

fn entries_to_record_batch(entries: &[IndexEntry], first_position: usize, dim: i32) -> Result<RecordBatch> {
    let mut positions = Vec::with_capacity(entries.len());
    let mut ids = Vec::with_capacity(entries.len());
    let mut sources = Vec::with_capacity(entries.len());
    let mut pages: Vec<Option<i32>> = Vec::with_capacity(entries.len());
    let mut offsets = Vec::with_capacity(entries.len());
    let mut contents = Vec::with_capacity(entries.len());
    let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(entries.len());
    for (i, e) in entries.iter().enumerate() {
        positions.push((first_position + i) as i32);
        ids.push(e.chunk.id.clone());
        sources.push(e.chunk.source.clone());
        pages.push(e.chunk.page.map(|p| p as i32));
        offsets.push(e.chunk.start_offset as i32);
        contents.push(e.chunk.text.clone());
        vectors.push(Some(e.vector.iter().map(|&x| Some(x)).collect()));
    }
    let record_batch = RecordBatch::try_new(
        build_entries_schema(dim),
        vec![
            Arc::new(Int32Array::from(positions)),
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(sources)),
            Arc::new(Int32Array::from(pages)),
            Arc::new(Int32Array::from(offsets)),
            Arc::new(StringArray::from(contents)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(
                vectors.into_iter(),
                dim,
            )),
        ],
    )?;
    Ok(record_batch)
}
