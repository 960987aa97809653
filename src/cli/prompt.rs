use anyhow::Result;

use pictolog::config::PictologConfig;
use pictolog::diary::{ArtStyle, Mood};
use pictolog::generation::{HttpTextModel, PromptOutcome, PromptPipeline};

/// Turn a scene into a Stable Diffusion prompt informed by past entries of the same mood.
pub async fn prompt(
    config: &PictologConfig,
    scene: &str,
    style: ArtStyle,
    mood: Mood,
    k: Option<usize>,
) -> Result<()> {
    let store = super::open_store(config)?;
    let k = k.unwrap_or(config.retrieval.default_k);
    let (_, memories) =
        super::recall::retrieve(store, scene.to_string(), k, Some(mood)).await?;
    tracing::debug!(memories = memories.len(), "memories selected for prompt");

    let model = HttpTextModel::from_config(&config.generation)?;
    let pipeline = PromptPipeline::new(model, config.generation.max_retries);

    match pipeline.generate(scene, mood, style, &memories).await {
        PromptOutcome::Generated { prompt, .. } => {
            println!("{prompt}");
            Ok(())
        }
        PromptOutcome::Exhausted {
            attempts,
            last_error,
        } => anyhow::bail!("no usable prompt after {attempts} attempt(s): {last_error}"),
    }
}
