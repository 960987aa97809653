use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use pictolog::config::PictologConfig;
use pictolog::diary::{ArtStyle, ImageData, Mood};
use pictolog::generation::{choose, illustrate, HttpImageModel, HttpTextModel, PromptPipeline};

/// Write an entry and illustrate it: generate candidates, pick one, save both.
#[allow(clippy::too_many_arguments)]
pub async fn draw(
    config: &PictologConfig,
    scene: &str,
    date: NaiveDate,
    style: ArtStyle,
    mood: Mood,
    count: Option<usize>,
    pick: Option<usize>,
    k: Option<usize>,
) -> Result<()> {
    let store = super::open_store(config)?;
    let k = k.unwrap_or(config.retrieval.default_k);
    let (mut store, memories) =
        super::recall::retrieve(store, scene.to_string(), k, Some(mood)).await?;

    let pipeline = PromptPipeline::new(
        HttpTextModel::from_config(&config.generation)?,
        config.generation.max_retries,
    );
    let painter = HttpImageModel::from_config(&config.image)?;
    let count = count.unwrap_or(config.image.count);

    let illustration =
        illustrate(&pipeline, &painter, scene, mood, style, &memories, count).await?;
    println!("Prompt: {}", illustration.prompt);

    let preview_dir = std::env::temp_dir().join(format!("pictolog-{}", uuid::Uuid::new_v4()));
    let previews = write_previews(&preview_dir, &illustration.images)?;
    for (i, path) in previews.iter().enumerate() {
        println!("  {}. {}", i + 1, path.display());
    }

    let pick = match pick {
        Some(n) => n,
        None if previews.len() == 1 => 1,
        None => ask_pick(previews.len())?,
    };
    let image = choose(illustration.images, pick)?;

    let text = scene.to_string();
    let id = tokio::task::spawn_blocking(move || {
        store.save(&text, date, style, mood, Some(&image))
    })
    .await??;

    if let Err(e) = std::fs::remove_dir_all(&preview_dir) {
        tracing::warn!(dir = %preview_dir.display(), error = %e, "failed to remove previews");
    }

    println!("Saved {id} with picture {pick}");
    Ok(())
}

fn write_previews(dir: &Path, images: &[ImageData]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    images
        .iter()
        .enumerate()
        .map(|(i, image)| {
            let path = dir.join(format!("candidate-{}.{}", i + 1, image.format().extension()));
            std::fs::write(&path, image.bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
            Ok(path)
        })
        .collect()
}

fn ask_pick(count: usize) -> Result<usize> {
    let stdin = std::io::stdin();
    loop {
        eprint!("Keep which picture? [1-{count}]: ");
        std::io::stderr().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            anyhow::bail!("no picture chosen");
        }
        match line.trim().parse::<usize>() {
            Ok(n) if (1..=count).contains(&n) => return Ok(n),
            _ => eprintln!("Enter a number from 1 to {count}."),
        }
    }
}
