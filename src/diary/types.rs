//! Diary record types.
//!
//! [`ArtStyle`] and [`Mood`] are the closed enumerations a user picks from,
//! [`DiaryRecord`] is the persisted unit, and [`ImageData`] is an image handed
//! to the store for safekeeping.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::error::DiaryError;

/// Art style applied to an entry's generated illustration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtStyle {
    Cyberpunk,
    WaterColor,
    Realistic,
    #[serde(rename = "Pixel Art")]
    PixelArt,
    Sketch,
}

impl ArtStyle {
    pub const ALL: [ArtStyle; 5] = [
        Self::Cyberpunk,
        Self::WaterColor,
        Self::Realistic,
        Self::PixelArt,
        Self::Sketch,
    ];

    /// Display label, also the stored form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cyberpunk => "Cyberpunk",
            Self::WaterColor => "WaterColor",
            Self::Realistic => "Realistic",
            Self::PixelArt => "Pixel Art",
            Self::Sketch => "Sketch",
        }
    }
}

impl std::fmt::Display for ArtStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ArtStyle {
    type Err = String;

    /// Accepts the display label or a snake/kebab-case spelling, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize_label(s);
        Self::ALL
            .into_iter()
            .find(|style| normalize_label(style.as_str()) == key)
            .ok_or_else(|| format!("unknown art style: {s}"))
    }
}

/// How the writer felt about the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mood {
    Happy,
    Neutral,
    Sad,
    Excited,
    Anxious,
}

impl Mood {
    pub const ALL: [Mood; 5] = [
        Self::Happy,
        Self::Neutral,
        Self::Sad,
        Self::Excited,
        Self::Anxious,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Happy => "Happy",
            Self::Neutral => "Neutral",
            Self::Sad => "Sad",
            Self::Excited => "Excited",
            Self::Anxious => "Anxious",
        }
    }
}

impl std::fmt::Display for Mood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize_label(s);
        Self::ALL
            .into_iter()
            .find(|mood| normalize_label(mood.as_str()) == key)
            .ok_or_else(|| format!("unknown mood: {s}"))
    }
}

fn normalize_label(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Attributes stored alongside an entry's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryMetadata {
    /// The diary's logical day, independent of when it was saved.
    pub date: NaiveDate,
    /// Local wall-clock creation time, `HH:MM`.
    pub time: String,
    /// UTC creation timestamp (`...T..:..:..ffffffZ`); the ordering key for
    /// entries on the same date. Empty when unknown, which sorts first.
    #[serde(default)]
    pub created_at: String,
    pub style: ArtStyle,
    pub mood: Mood,
    /// Image artifact owned by this entry, if one was attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<PathBuf>,
}

/// A persisted diary entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryRecord {
    /// `<date>_<8 hex>`, assigned at save time.
    pub id: String,
    pub text: String,
    pub metadata: DiaryMetadata,
}

/// A past entry surfaced by similarity retrieval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarEntry {
    pub id: String,
    pub text: String,
    pub metadata: DiaryMetadata,
}

impl From<DiaryRecord> for SimilarEntry {
    fn from(record: DiaryRecord) -> Self {
        Self {
            id: record.id,
            text: record.text,
            metadata: record.metadata,
        }
    }
}

/// Image encodings the store accepts, recognized by their magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Webp,
    Gif,
}

impl ImageFormat {
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(Self::Png),
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::Webp),
            [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
            Self::Gif => "gif",
        }
    }
}

/// Encoded image bytes whose format has been recognized.
#[derive(Debug, Clone)]
pub struct ImageData {
    bytes: Vec<u8>,
    format: ImageFormat,
}

impl ImageData {
    /// Wrap encoded bytes, refusing anything that is not a known image format.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, DiaryError> {
        match ImageFormat::detect(&bytes) {
            Some(format) => Ok(Self { bytes, format }),
            None => Err(DiaryError::Validation(
                "not a renderable image (unrecognized format)".into(),
            )),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }
}
