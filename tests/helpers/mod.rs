#![allow(dead_code)]

use anyhow::Result;
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use pictolog::db;
use pictolog::diary::artifact::{ArtifactStorage, FsArtifactStorage};
use pictolog::diary::index::{DiaryIndex, IndexFilter, ScoredRecord, SqliteDiaryIndex};
use pictolog::diary::{DiaryRecord, DiaryStore, ImageData};
use pictolog::embedding::{l2_normalize, EmbeddingProvider, EMBEDDING_DIM};
use pictolog::generation::{ImageModel, TextModel};

/// Each keyword owns one dimension.
const KEYWORDS: &[&str] = &[
    "sunny", "beach", "coffee", "office", "cat", "park", "exam", "kite",
];

/// Pulls against a keyword's dimension: "gloomy" is the opposite of "sunny".
const OPPOSITES: &[(&str, usize)] = &[("gloomy", 0)];

/// Deterministic bag-of-keywords embedding. Text with no keywords lands on
/// the last dimension, so two keyword-free texts are identical.
pub struct KeywordEmbedding;

impl EmbeddingProvider for KeywordEmbedding {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; EMBEDDING_DIM];
        for word in text.split(|c: char| !c.is_alphanumeric()) {
            let word = word.to_lowercase();
            if let Some(i) = KEYWORDS.iter().position(|k| *k == word) {
                v[i] += 1.0;
            }
            if let Some((_, i)) = OPPOSITES.iter().find(|(k, _)| *k == word) {
                v[*i] -= 1.0;
            }
        }
        if v.iter().all(|x| *x == 0.0) {
            v[EMBEDDING_DIM - 1] = 1.0;
        }
        Ok(l2_normalize(&v))
    }
}

pub fn test_index() -> SqliteDiaryIndex {
    let conn = db::open_memory_database().unwrap();
    SqliteDiaryIndex::new(conn, Arc::new(KeywordEmbedding))
}

/// In-memory index, images on the real filesystem under `image_dir`.
pub fn test_store(image_dir: &Path) -> DiaryStore {
    store_with(test_index(), FsArtifactStorage, image_dir)
}

pub fn store_with(
    index: impl DiaryIndex + 'static,
    artifacts: impl ArtifactStorage + 'static,
    image_dir: &Path,
) -> DiaryStore {
    DiaryStore::new(Box::new(index), Box::new(artifacts), image_dir)
}

pub fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

/// Smallest byte string recognized as PNG.
pub const PNG_BYTES: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D', b'R',
];

pub fn png() -> ImageData {
    ImageData::from_bytes(PNG_BYTES.to_vec()).unwrap()
}

/// Smallest byte string recognized as JPEG.
pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

/// Replays canned completions in order and records every request.
#[derive(Default)]
pub struct ScriptedText {
    pub replies: Mutex<VecDeque<Result<String, String>>>,
    pub requests: Mutex<Vec<String>>,
}

impl ScriptedText {
    pub fn new(replies: Vec<Result<&str, &str>>) -> Self {
        Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl TextModel for &ScriptedText {
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send {
        self.requests.lock().unwrap().push(prompt.to_string());
        let reply = self.replies.lock().unwrap().pop_front();
        async move {
            match reply {
                Some(Ok(text)) => Ok(text),
                Some(Err(e)) => Err(anyhow::anyhow!(e)),
                None => Err(anyhow::anyhow!("script exhausted")),
            }
        }
    }
}

/// Paints the requested number of pictures, alternating PNG and JPEG.
#[derive(Default)]
pub struct ScriptedPainter {
    pub calls: Mutex<Vec<(String, usize)>>,
}

impl ImageModel for ScriptedPainter {
    fn generate(
        &self,
        prompt: &str,
        count: usize,
    ) -> impl Future<Output = Result<Vec<ImageData>>> + Send {
        self.calls.lock().unwrap().push((prompt.to_string(), count));
        async move {
            (0..count)
                .map(|i| {
                    let bytes = if i % 2 == 0 { PNG_BYTES } else { JPEG_BYTES };
                    ImageData::from_bytes(bytes.to_vec()).map_err(anyhow::Error::from)
                })
                .collect()
        }
    }
}

/// All regular files below `dir`.
pub fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return found;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            found.extend(files_under(&path));
        } else {
            found.push(path);
        }
    }
    found
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageOp {
    Write(PathBuf),
    Remove(PathBuf),
}

/// Filesystem storage that records every mutating call.
#[derive(Clone, Default)]
pub struct RecordingStorage {
    pub ops: Arc<Mutex<Vec<StorageOp>>>,
}

impl ArtifactStorage for RecordingStorage {
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        self.ops.lock().unwrap().push(StorageOp::Write(path.to_path_buf()));
        FsArtifactStorage.write(path, bytes)
    }

    fn exists(&self, path: &Path) -> bool {
        FsArtifactStorage.exists(path)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        self.ops.lock().unwrap().push(StorageOp::Remove(path.to_path_buf()));
        FsArtifactStorage.remove(path)
    }
}

/// Every write fails as if the disk were full.
pub struct FailingWrites;

impl ArtifactStorage for FailingWrites {
    fn write(&self, _path: &Path, _bytes: &[u8]) -> io::Result<()> {
        Err(io::Error::other("no space left on device"))
    }

    fn exists(&self, _path: &Path) -> bool {
        false
    }

    fn remove(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }
}

/// Writes succeed; removals are refused.
pub struct StuckRemovals;

impl ArtifactStorage for StuckRemovals {
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        FsArtifactStorage.write(path, bytes)
    }

    fn exists(&self, path: &Path) -> bool {
        FsArtifactStorage.exists(path)
    }

    fn remove(&self, _path: &Path) -> io::Result<()> {
        Err(io::Error::from(io::ErrorKind::PermissionDenied))
    }
}

/// SQLite index whose inserts always fail.
pub struct RejectingIndex(pub SqliteDiaryIndex);

impl DiaryIndex for RejectingIndex {
    fn insert(&mut self, _record: &DiaryRecord) -> Result<()> {
        anyhow::bail!("database is locked")
    }

    fn get(&self, id: &str) -> Result<Option<DiaryRecord>> {
        self.0.get(id)
    }

    fn query_by_filter(&self, filter: &IndexFilter) -> Result<Vec<DiaryRecord>> {
        self.0.query_by_filter(filter)
    }

    fn query_by_similarity(
        &self,
        text: &str,
        limit: usize,
        filter: &IndexFilter,
    ) -> Result<Vec<ScoredRecord>> {
        self.0.query_by_similarity(text, limit, filter)
    }

    fn delete_by_id(&mut self, id: &str) -> Result<()> {
        self.0.delete_by_id(id)
    }

    fn count(&self) -> Result<usize> {
        self.0.count()
    }

    fn references_image(&self, path: &Path) -> Result<bool> {
        self.0.references_image(path)
    }
}
