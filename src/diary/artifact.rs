//! Image artifact storage.
//!
//! Each saved image lives at `<image_dir>/<date>/<HH-MM-SS>.<ext>` and is owned
//! by exactly one diary record.

use chrono::{NaiveDate, NaiveDateTime};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use super::types::ImageFormat;

/// Where image bytes are persisted. `remove` must succeed when the target is already gone.
pub trait ArtifactStorage: Send {
    /// Write `bytes` to `path`, creating parent directories as needed.
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Plain filesystem storage.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsArtifactStorage;

impl ArtifactStorage for FsArtifactStorage {
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Readers never observe a half-written image.
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, path).inspect_err(|_| {
            let _ = std::fs::remove_file(&tmp);
        })
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        match std::fs::remove_file(path) {
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

/// Pick a fresh path for an image saved at local time `now` on logical day `date`.
///
/// Two saves in the same second would share `<HH-MM-SS>`, so a `-1`, `-2`, …
/// suffix is appended until `is_taken` reports the path free. A path counts as
/// taken while a record still claims it, even if the file itself is gone.
pub fn artifact_path<E>(
    image_dir: &Path,
    date: NaiveDate,
    now: NaiveDateTime,
    format: ImageFormat,
    mut is_taken: impl FnMut(&Path) -> Result<bool, E>,
) -> Result<PathBuf, E> {
    let folder = image_dir.join(date.to_string());
    let stem = now.format("%H-%M-%S").to_string();
    let ext = format.extension();

    let mut candidate = folder.join(format!("{stem}.{ext}"));
    let mut n = 1;
    while is_taken(&candidate)? {
        candidate = folder.join(format!("{stem}-{n}.{ext}"));
        n += 1;
    }
    Ok(candidate)
}
