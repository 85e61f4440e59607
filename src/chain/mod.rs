//! Chain ingestion: block cache, checkpoint, head tracking and the polling indexer

pub mod block_cache;
pub mod checkpoint;
pub mod client;
pub mod handlers;
pub mod head;
pub mod indexer;

pub use block_cache::*;
pub use checkpoint::*;
pub use client::*;
pub use handlers::*;
pub use head::*;
pub use indexer::*;
