//! Vector side of the pipeline: the in-memory [`EmbeddingIndex`], MMR retrieval
//! and LanceDB snapshots of a built index.

pub mod index;
pub mod mmr;
pub mod reader;
pub mod schema;
pub mod similarity;
pub mod table;
pub mod writer;

pub use index::{EmbeddingIndex, IndexEntry, Neighbor};
pub use mmr::{select, MmrParams};
pub use reader::{load_snapshot, read_snapshot_info};
pub use writer::{save_snapshot, SnapshotInfo};
