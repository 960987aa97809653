//! Stable Diffusion prompt and picture generation.
//!
//! [`PromptPipeline`] renders a scene, its mood and style, and a handful of
//! retrieved past entries into a template, then asks a [`TextModel`] to
//! complete it. [`HttpTextModel`] talks to any OpenAI-compatible
//! completions server. The resulting prompt goes to an [`ImageModel`]
//! through [`paint`]; [`HttpImageModel`] speaks the WebUI `txt2img` API.

pub mod http;
pub mod image;
pub mod prompt;

pub use http::{HttpImageModel, HttpTextModel};
pub use image::{choose, illustrate, paint, Illustration, ImageModel};
pub use prompt::{format_memories, PromptOutcome, PromptPipeline, TextModel};
