//! Scene → Stable Diffusion prompt, with a bounded retry loop.
//!
//! The model is asked to complete a template that ends in [`OUTPUT_MARKER`].
//! An attempt succeeds when the output contains the marker followed by at
//! least one non-empty line; that line is the prompt.

use anyhow::Result;
use std::future::Future;
use tracing::{info, warn};

use crate::diary::{ArtStyle, Mood, SimilarEntry};

pub const OUTPUT_MARKER: &str = "### Output:";

/// Longest memory excerpt placed in the template, in bytes.
const MEMORY_PREVIEW_CHARS: usize = 200;

/// A text-completion backend. The returned text must include the prompt it
/// was given, the way text-generation pipelines return full text.
pub trait TextModel {
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Result of [`PromptPipeline::generate`].
#[derive(Debug, Clone, PartialEq)]
pub enum PromptOutcome {
    Generated { prompt: String, attempts: u32 },
    Exhausted { attempts: u32, last_error: String },
}

impl PromptOutcome {
    pub fn prompt(&self) -> Option<&str> {
        match self {
            Self::Generated { prompt, .. } => Some(prompt),
            Self::Exhausted { .. } => None,
        }
    }
}

pub struct PromptPipeline<M> {
    model: M,
    max_retries: u32,
}

impl<M: TextModel> PromptPipeline<M> {
    pub fn new(model: M, max_retries: u32) -> Self {
        Self {
            model,
            max_retries: max_retries.max(1),
        }
    }

    pub async fn generate(
        &self,
        scene: &str,
        mood: Mood,
        style: ArtStyle,
        memories: &[SimilarEntry],
    ) -> PromptOutcome {
        let request = render_template(scene, mood, style, &format_memories(memories));
        let mut last_error = String::new();

        for attempt in 1..=self.max_retries {
            match self.model.complete(&request).await {
                Ok(raw) => match extract_prompt(&raw) {
                    Some(prompt) => {
                        info!(attempt, "prompt generated");
                        return PromptOutcome::Generated {
                            prompt,
                            attempts: attempt,
                        };
                    }
                    None => {
                        warn!(attempt, "model output had no prompt after the output marker");
                        last_error = format!("no line after {OUTPUT_MARKER:?} in model output");
                    }
                },
                Err(e) => {
                    warn!(attempt, error = %e, "text model call failed");
                    last_error = format!("{e:#}");
                }
            }
        }

        PromptOutcome::Exhausted {
            attempts: self.max_retries,
            last_error,
        }
    }
}

pub fn render_template(scene: &str, mood: Mood, style: ArtStyle, memories: &str) -> String {
    format!(
        "You write single-line Stable Diffusion image prompts.\n\
         \n\
         Instructions:\n\
         - Depict only the objects and actions listed in the scene; add nothing new.\n\
         - From the mood and style, choose the medium, texture, lighting, palette and emotional tone.\n\
         - Past memories may inform those visual choices but never add objects to the scene.\n\
         - Reply with the prompt line alone.\n\
         \n\
         ### Inputs:\n\
         Scene: {scene}\n\
         Mood: {mood}\n\
         Style: {style}\n\
         Past memories:\n\
         {memories}\n\
         \n\
         {OUTPUT_MARKER}\n"
    )
}

/// One line per retrieved entry, or `none`.
pub fn format_memories(memories: &[SimilarEntry]) -> String {
    if memories.is_empty() {
        return "none".into();
    }
    memories
        .iter()
        .map(|m| {
            let text = m.text.split_whitespace().collect::<Vec<_>>().join(" ");
            format!(
                "- [{}, {}, {}] {}",
                m.metadata.date,
                m.metadata.mood,
                m.metadata.style,
                truncate_preview(&text, MEMORY_PREVIEW_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The first non-empty line after the last output marker.
pub fn extract_prompt(raw: &str) -> Option<String> {
    let (_, after) = raw.rsplit_once(OUTPUT_MARKER)?;
    after
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Truncate to at most `max_chars` bytes on a char boundary, appending "..." if cut.
fn truncate_preview(content: &str, max_chars: usize) -> String {
    if content.len() <= max_chars {
        return content.to_string();
    }
    let end = content
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|&end| end <= max_chars)
        .last()
        .unwrap_or(0);
    format!("{}...", &content[..end])
}
