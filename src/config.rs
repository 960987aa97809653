use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PictologConfig {
    pub general: GeneralConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub generation: GenerationConfig,
    pub image: ImageConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    pub image_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_k: usize,
    /// Weight of similarity against recency in the composite score.
    pub alpha: f64,
    /// Candidates farther than this cosine distance are dropped before ranking.
    pub max_distance: f64,
    pub candidate_multiplier: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

/// Stable Diffusion WebUI style `txt2img` backend.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ImageConfig {
    pub endpoint: String,
    /// Candidates generated per drawing.
    pub count: usize,
    pub negative_prompt: String,
    pub steps: u32,
    pub cfg_scale: f32,
    pub width: u32,
    pub height: u32,
    pub timeout_secs: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_pictolog_dir()
            .join("diary.db")
            .to_string_lossy()
            .into_owned();
        Self {
            db_path,
            image_dir: "images".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_pictolog_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: 3,
            alpha: 0.7,
            max_distance: 1.0,
            candidate_multiplier: 3,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/v1/completions".into(),
            model: "meta-llama/Llama-3.2-1B-Instruct".into(),
            max_tokens: 50,
            temperature: 0.5,
            max_retries: 3,
            timeout_secs: 60,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:7860/sdapi/v1/txt2img".into(),
            count: 2,
            negative_prompt: "blurry, low quality, distorted, extra limbs, text".into(),
            steps: 20,
            cfg_scale: 7.5,
            width: 512,
            height: 512,
            timeout_secs: 300,
        }
    }
}

/// Returns `~/.pictolog/`, or `./.pictolog` when no home directory is known.
pub fn default_pictolog_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pictolog")
}

/// Returns the default config file path: `~/.pictolog/config.toml`
pub fn default_config_path() -> PathBuf {
    default_pictolog_dir().join("config.toml")
}

impl PictologConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides and validate.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            PictologConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides (PICTOLOG_DB, PICTOLOG_IMAGE_DIR, PICTOLOG_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("PICTOLOG_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("PICTOLOG_IMAGE_DIR") {
            self.storage.image_dir = val;
        }
        if let Ok(val) = std::env::var("PICTOLOG_LOG_LEVEL") {
            self.general.log_level = val;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let r = &self.retrieval;
        ensure!(
            r.alpha > 0.0 && r.alpha < 1.0,
            "retrieval.alpha must be in (0, 1), got {}",
            r.alpha
        );
        ensure!(
            r.max_distance > 0.0,
            "retrieval.max_distance must be positive, got {}",
            r.max_distance
        );
        ensure!(
            r.candidate_multiplier > 0,
            "retrieval.candidate_multiplier must be at least 1"
        );
        ensure!(
            self.generation.max_retries > 0,
            "generation.max_retries must be at least 1"
        );
        ensure!(self.image.count > 0, "image.count must be at least 1");
        Ok(())
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    pub fn resolved_image_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.image_dir)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
