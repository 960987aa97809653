use anyhow::Result;

use pictolog::config::PictologConfig;
use pictolog::diary::{DiaryError, DiaryStore, Mood, SimilarEntry};

/// Retrieve on a blocking thread; embedding is CPU-bound. The store is handed back.
pub async fn retrieve(
    store: DiaryStore,
    query: String,
    k: usize,
    mood: Option<Mood>,
) -> Result<(DiaryStore, Vec<SimilarEntry>)> {
    let found = tokio::task::spawn_blocking(move || {
        let memories = store.retrieve_similar(&query, k, mood)?;
        Ok::<_, DiaryError>((store, memories))
    })
    .await??;
    Ok(found)
}

/// Print the past entries most relevant to `query`.
pub async fn recall(
    config: &PictologConfig,
    query: &str,
    k: Option<usize>,
    mood: Option<Mood>,
) -> Result<()> {
    let store = super::open_store(config)?;
    let k = k.unwrap_or(config.retrieval.default_k);
    let (_, memories) = retrieve(store, query.to_string(), k, mood).await?;

    if memories.is_empty() {
        println!("No related memories.");
        return Ok(());
    }

    for (i, entry) in memories.iter().enumerate() {
        let preview = entry.text.split_whitespace().collect::<Vec<_>>().join(" ");
        let preview = match preview.char_indices().nth(120) {
            Some((cut, _)) => format!("{}...", &preview[..cut]),
            None => preview,
        };
        println!(
            "  {}. {} [{} / {}] {}",
            i + 1,
            entry.metadata.date,
            entry.metadata.mood,
            entry.metadata.style,
            entry.id
        );
        println!("     {preview}");
    }
    Ok(())
}
