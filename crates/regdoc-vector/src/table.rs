//! LanceDB connection helpers and the key/value table kept next to each snapshot.
use anyhow::{anyhow, Result};
use arrow_array::{RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::ExecutableQuery;
use lancedb::{connect, Connection};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::schema::build_meta_schema;

pub async fn open_db(dir: &Path) -> Result<Connection> {
    Ok(connect(dir.to_string_lossy().as_ref()).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let names = conn.table_names().execute().await?;
    Ok(names.iter().any(|n| n == name))
}

/// `<table>_meta`: one row per key, upserted on write.
pub struct MetaTable<'a> {
    conn: &'a Connection,
    name: String,
}

impl<'a> MetaTable<'a> {
    pub fn for_snapshot(conn: &'a Connection, table: &str) -> Self {
        Self { conn, name: format!("{}_meta", table) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Upsert all pairs in a single commit.
    pub async fn write(&self, pairs: &[(&str, String)]) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        let rb = RecordBatch::try_new(
            build_meta_schema(),
            vec![
                Arc::new(StringArray::from_iter_values(pairs.iter().map(|(k, _)| *k))),
                Arc::new(StringArray::from_iter_values(pairs.iter().map(|(_, v)| v.as_str()))),
                Arc::new(TimestampMillisecondArray::from(vec![now; pairs.len()])),
            ],
        )?;
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), build_meta_schema()));
        if table_exists(self.conn, &self.name).await? {
            let t = self.conn.open_table(&self.name).execute().await?;
            let mut merge = t.merge_insert(&["key"]);
            merge.when_matched_update_all(None).when_not_matched_insert_all();
            merge.execute(reader).await?;
        } else {
            self.conn.create_table(&self.name, reader).execute().await?;
        }
        Ok(())
    }

    /// Every stored pair; empty when the table does not exist.
    pub async fn read_all(&self) -> Result<BTreeMap<String, String>> {
        let mut out = BTreeMap::new();
        if !table_exists(self.conn, &self.name).await? {
            return Ok(out);
        }
        let t = self.conn.open_table(&self.name).execute().await?;
        let mut stream = t.query().execute().await?;
        while let Some(batch) = stream.try_next().await? {
            let column = |name: &str| {
                batch
                    .column_by_name(name)
                    .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                    .ok_or_else(|| anyhow!("{}.{} column missing", self.name, name))
            };
            let (keys, values) = (column("key")?, column("value")?);
            for i in 0..batch.num_rows() {
                out.insert(keys.value(i).to_string(), values.value(i).to_string());
            }
        }
        Ok(out)
    }
}
