//! Prompt → candidate pictures. The diarist picks one of the candidates and
//! it is saved with the entry.

use anyhow::{bail, ensure, Result};
use std::future::Future;
use tracing::{info, warn};

use super::prompt::{PromptOutcome, PromptPipeline, TextModel};
use crate::diary::{ArtStyle, ImageData, Mood, SimilarEntry};

/// A text-to-image backend producing up to `count` encoded pictures per call.
pub trait ImageModel {
    fn generate(
        &self,
        prompt: &str,
        count: usize,
    ) -> impl Future<Output = Result<Vec<ImageData>>> + Send;
}

/// Generate `count` candidates for `prompt`.
///
/// Backends that return more than requested are cut down to `count`; fewer is
/// accepted as long as there is at least one.
pub async fn paint<M: ImageModel>(model: &M, prompt: &str, count: usize) -> Result<Vec<ImageData>> {
    ensure!(count > 0, "image count must be at least 1");
    ensure!(!prompt.trim().is_empty(), "image prompt must not be empty");

    let mut images = model.generate(prompt, count).await?;
    ensure!(!images.is_empty(), "image model returned no pictures");
    if images.len() < count {
        warn!(requested = count, got = images.len(), "image model returned fewer pictures");
    }
    images.truncate(count);

    info!(count = images.len(), "pictures generated");
    Ok(images)
}

/// A generated prompt and the pictures drawn from it.
#[derive(Debug)]
pub struct Illustration {
    pub prompt: String,
    pub images: Vec<ImageData>,
}

/// Scene → prompt → `count` candidate pictures.
pub async fn illustrate<T: TextModel, I: ImageModel>(
    pipeline: &PromptPipeline<T>,
    painter: &I,
    scene: &str,
    mood: Mood,
    style: ArtStyle,
    memories: &[SimilarEntry],
    count: usize,
) -> Result<Illustration> {
    let prompt = match pipeline.generate(scene, mood, style, memories).await {
        PromptOutcome::Generated { prompt, .. } => prompt,
        PromptOutcome::Exhausted {
            attempts,
            last_error,
        } => bail!("no usable prompt after {attempts} attempt(s): {last_error}"),
    };
    let images = paint(painter, &prompt, count).await?;
    Ok(Illustration { prompt, images })
}

/// Take the candidate numbered `pick`, counting from 1.
pub fn choose(mut images: Vec<ImageData>, pick: usize) -> Result<ImageData> {
    if pick == 0 || pick > images.len() {
        bail!("pick must be between 1 and {}, got {pick}", images.len());
    }
    Ok(images.swap_remove(pick - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diary::ImageFormat;
    use std::sync::Mutex;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10];

    /// Returns `produce` pictures regardless of the requested count.
    struct ScriptedPainter {
        produce: usize,
        calls: Mutex<Vec<(String, usize)>>,
    }

    impl ScriptedPainter {
        fn new(produce: usize) -> Self {
            Self {
                produce,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl ImageModel for ScriptedPainter {
        fn generate(
            &self,
            prompt: &str,
            count: usize,
        ) -> impl Future<Output = Result<Vec<ImageData>>> + Send {
            self.calls.lock().unwrap().push((prompt.to_string(), count));
            let produce = self.produce;
            async move {
                (0..produce)
                    .map(|i| {
                        let bytes = if i % 2 == 0 { PNG } else { JPEG };
                        ImageData::from_bytes(bytes.to_vec()).map_err(anyhow::Error::from)
                    })
                    .collect()
            }
        }
    }

    #[tokio::test]
    async fn passes_prompt_and_count_through() {
        let model = ScriptedPainter::new(2);
        let images = paint(&model, "watercolor cat on a windowsill", 2).await.unwrap();

        assert_eq!(images.len(), 2);
        assert_eq!(images[0].format(), ImageFormat::Png);
        assert_eq!(images[1].format(), ImageFormat::Jpeg);
        assert_eq!(
            *model.calls.lock().unwrap(),
            vec![("watercolor cat on a windowsill".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn extra_pictures_are_dropped() {
        let model = ScriptedPainter::new(5);
        let images = paint(&model, "kites", 3).await.unwrap();
        assert_eq!(images.len(), 3);
    }

    #[tokio::test]
    async fn empty_result_is_an_error() {
        let model = ScriptedPainter::new(0);
        let err = paint(&model, "kites", 2).await.unwrap_err();
        assert!(err.to_string().contains("no pictures"));
    }

    #[tokio::test]
    async fn zero_count_never_reaches_the_model() {
        let model = ScriptedPainter::new(2);
        assert!(paint(&model, "kites", 0).await.is_err());
        assert!(paint(&model, "   ", 2).await.is_err());
        assert!(model.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn choose_counts_from_one() {
        let images = vec![
            ImageData::from_bytes(PNG.to_vec()).unwrap(),
            ImageData::from_bytes(JPEG.to_vec()).unwrap(),
        ];
        assert_eq!(choose(images.clone(), 2).unwrap().format(), ImageFormat::Jpeg);
        assert!(choose(images.clone(), 0).is_err());
        assert!(choose(images, 3).is_err());
    }
}
