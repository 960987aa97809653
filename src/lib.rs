//! A picture diary with memory.
//!
//! Each diary entry is text plus a mood and an art style, optionally with an
//! illustration. Entries are indexed by embedding so that, when a new scene
//! is illustrated, the most relevant and most recent past entries can be fed
//! back into the image prompt.
//!
//! # Architecture
//!
//! - **Storage**: SQLite with [sqlite-vec](https://github.com/asg017/sqlite-vec)
//!   for vector search; images as plain files under a date-partitioned folder
//! - **Embeddings**: Local ONNX Runtime with all-MiniLM-L6-v2 (384 dimensions)
//! - **Retrieval**: cosine distance cutoff, then `alpha * similarity + (1 - alpha) * recency`
//! - **Prompting**: any OpenAI-compatible completions endpoint, with bounded retries
//!
//! # Modules
//!
//! - [`config`]: TOML file plus environment overrides
//! - [`db`]: connection setup, schema, migrations, health checks
//! - [`diary`]: the diary store, its index and artifact storage, and ranking
//! - [`embedding`]: text-to-vector pipeline
//! - [`generation`]: scene-to-prompt pipeline and picture generation

pub mod config;
pub mod db;
pub mod diary;
pub mod embedding;
pub mod generation;
