pub mod artifact;
pub mod error;
pub mod index;
pub mod ranking;
pub mod store;
pub mod types;

pub use error::{DiaryError, DiaryResult};
pub use store::DiaryStore;
pub use types::{ArtStyle, DiaryMetadata, DiaryRecord, ImageData, ImageFormat, Mood, SimilarEntry};
