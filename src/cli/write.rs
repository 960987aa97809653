use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::io::Read;
use std::path::Path;

use pictolog::config::PictologConfig;
use pictolog::diary::{ArtStyle, ImageData, Mood};

/// Save a diary entry. Reads the text from stdin when none is given.
pub fn write(
    config: &PictologConfig,
    text: Option<String>,
    date: NaiveDate,
    style: ArtStyle,
    mood: Mood,
    image: Option<&Path>,
) -> Result<()> {
    let text = match text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read diary text from stdin")?;
            buf
        }
    };

    let image = image
        .map(|path| {
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read image {}", path.display()))?;
            ImageData::from_bytes(bytes)
                .with_context(|| format!("cannot attach {}", path.display()))
        })
        .transpose()?;

    let mut store = super::open_store(config)?;
    let earlier = store.load_by_date(date)?.len();
    let id = store.save(&text, date, style, mood, image.as_ref())?;

    println!("Saved {id}");
    if earlier > 0 {
        println!("({earlier} earlier entr{} on {date})", if earlier == 1 { "y" } else { "ies" });
    }
    Ok(())
}
