//! Arrow schemas for the snapshot tables.
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

/// One row per index entry. `position` preserves build order.
pub fn build_entries_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("position", DataType::Int32, false),
        Field::new("id", DataType::Utf8, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("page", DataType::Int32, true),
        Field::new("start_offset", DataType::Int32, false),
        Field::new("content", DataType::Utf8, false),
        Field::new("vector", DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
    ]))
}

pub fn build_meta_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("key", DataType::Utf8, false),
        Field::new("value", DataType::Utf8, false),
        Field::new("updated_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
    ]))
}
