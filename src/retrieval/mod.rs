//! Document retrieval for the retrieval-augmented responder.
//!
//! ## Design
//! - Corpus files are split with a recursive character splitter
//!   (500 characters, 100 overlap by default)
//! - Chunks and their embeddings live in a single SQLite file
//! - Search embeds the query and ranks every chunk by cosine similarity;
//!   corpora here are small enough that a linear scan is fine

pub mod index;
pub mod ingest;
pub mod splitter;
pub mod store;

#[allow(unused_imports)]
pub use index::{cosine_similarity, DocumentIndex, SqliteVectorIndex};
#[allow(unused_imports)]
pub use ingest::{build_index, discover_documents, IngestReport};
pub use splitter::TextSplitter;
#[allow(unused_imports)]
pub use store::{ChunkStore, IndexStats};
