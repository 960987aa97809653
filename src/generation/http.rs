//! HTTP backends: an OpenAI-compatible `/v1/completions` client (llama.cpp
//! server, vLLM, TGI and friends) and a Stable Diffusion WebUI `txt2img` client.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use super::image::ImageModel;
use super::prompt::TextModel;
use crate::config::{GenerationConfig, ImageConfig};
use crate::diary::ImageData;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    text: String,
}

pub struct HttpTextModel {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl HttpTextModel {
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    async fn request(&self, prompt: &str) -> Result<String> {
        let body = CompletionRequest {
            model: &self.model,
            prompt,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("completion request to {} failed", self.endpoint))?;

        anyhow::ensure!(
            response.status().is_success(),
            "completion endpoint returned HTTP {}",
            response.status()
        );

        let parsed: CompletionResponse = response
            .json()
            .await
            .context("malformed completion response")?;
        let completion = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .context("completion response had no choices")?;

        Ok(full_text(prompt, &completion))
    }
}

impl TextModel for HttpTextModel {
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send {
        self.request(prompt)
    }
}

#[derive(Debug, Serialize)]
struct Txt2ImgRequest<'a> {
    prompt: &'a str,
    negative_prompt: &'a str,
    steps: u32,
    cfg_scale: f32,
    width: u32,
    height: u32,
    batch_size: usize,
    n_iter: u32,
}

#[derive(Debug, Deserialize)]
struct Txt2ImgResponse {
    #[serde(default)]
    images: Vec<String>,
}

pub struct HttpImageModel {
    client: reqwest::Client,
    config: ImageConfig,
}

impl HttpImageModel {
    pub fn from_config(config: &ImageConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    async fn request(&self, prompt: &str, count: usize) -> Result<Vec<ImageData>> {
        let body = Txt2ImgRequest {
            prompt,
            negative_prompt: &self.config.negative_prompt,
            steps: self.config.steps,
            cfg_scale: self.config.cfg_scale,
            width: self.config.width,
            height: self.config.height,
            batch_size: count,
            n_iter: 1,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("txt2img request to {} failed", self.config.endpoint))?;

        anyhow::ensure!(
            response.status().is_success(),
            "txt2img endpoint returned HTTP {}",
            response.status()
        );

        let parsed: Txt2ImgResponse = response
            .json()
            .await
            .context("malformed txt2img response")?;
        parsed
            .images
            .iter()
            .enumerate()
            .map(|(i, encoded)| decode_image(encoded).with_context(|| format!("picture {}", i + 1)))
            .collect()
    }
}

impl ImageModel for HttpImageModel {
    fn generate(
        &self,
        prompt: &str,
        count: usize,
    ) -> impl Future<Output = Result<Vec<ImageData>>> + Send {
        self.request(prompt, count)
    }
}

/// Base64 picture, optionally wrapped as a `data:` URL.
fn decode_image(encoded: &str) -> Result<ImageData> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => encoded,
    };
    let bytes = STANDARD
        .decode(payload.trim())
        .context("picture is not valid base64")?;
    Ok(ImageData::from_bytes(bytes)?)
}

/// Completion endpoints return only the continuation; prepend the prompt so the
/// output marker is present for extraction.
fn full_text(prompt: &str, completion: &str) -> String {
    format!("{prompt}{completion}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::prompt::extract_prompt;

    #[test]
    fn request_body_matches_completions_api() {
        let body = CompletionRequest {
            model: "tiny",
            prompt: "hello",
            max_tokens: 50,
            temperature: 0.5,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "tiny");
        assert_eq!(json["prompt"], "hello");
        assert_eq!(json["max_tokens"], 50);
        assert_eq!(json["temperature"], 0.5);
    }

    #[test]
    fn response_parses_first_choice() {
        let raw = r#"{"id":"cmpl-1","choices":[{"text":" a red kite","index":0}],"usage":{}}"#;
        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].text, " a red kite");
    }

    #[test]
    fn continuation_is_extractable_after_echo() {
        let text = full_text("Scene: kites\n\n### Output:\n", "pixel art kites over a hill\n");
        assert_eq!(extract_prompt(&text).as_deref(), Some("pixel art kites over a hill"));
    }

    #[test]
    fn txt2img_body_carries_count_and_settings() {
        let config = ImageConfig::default();
        let body = Txt2ImgRequest {
            prompt: "sketch of a lighthouse",
            negative_prompt: &config.negative_prompt,
            steps: config.steps,
            cfg_scale: config.cfg_scale,
            width: config.width,
            height: config.height,
            batch_size: 2,
            n_iter: 1,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["prompt"], "sketch of a lighthouse");
        assert_eq!(json["batch_size"], 2);
        assert_eq!(json["steps"], 20);
        assert_eq!(json["cfg_scale"], 7.5);
        assert!(json["negative_prompt"].as_str().unwrap().contains("blurry"));
    }

    #[test]
    fn txt2img_response_decodes_pictures() {
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
        let plain = STANDARD.encode(png);
        let raw = format!(
            r#"{{"images":["{plain}","data:image/png;base64,{plain}"],"parameters":{{}},"info":"{{}}"}}"#
        );
        let parsed: Txt2ImgResponse = serde_json::from_str(&raw).unwrap();
        let images: Vec<ImageData> = parsed
            .images
            .iter()
            .map(|s| decode_image(s).unwrap())
            .collect();
        assert_eq!(images.len(), 2);
        assert!(images.iter().all(|img| img.bytes() == png));
    }

    #[test]
    fn undecodable_pictures_are_rejected() {
        assert!(decode_image("not base64!").is_err());
        let text = STANDARD.encode("plain text, not a picture");
        let err = decode_image(&text).unwrap_err();
        assert!(format!("{err:#}").contains("image"), "{err:#}");
    }

    #[test]
    fn builds_from_default_config() {
        let model = HttpTextModel::from_config(&GenerationConfig::default()).unwrap();
        assert_eq!(model.max_tokens, 50);
        assert!(model.endpoint.ends_with("/v1/completions"));

        let painter = HttpImageModel::from_config(&ImageConfig::default()).unwrap();
        assert!(painter.config.endpoint.ends_with("/sdapi/v1/txt2img"));
    }
}
