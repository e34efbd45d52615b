//! Data models and structures
//!
//! Defines the request/recipe types flowing through the pipeline and the
//! process-wide configuration loaded once at startup.

use serde::{Deserialize, Serialize};

pub const DEFAULT_CUISINE: &str = "Middle Eastern";

/// Response language carried by the request. Anything other than `ar` is
/// treated as English.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Arabic,
}

impl Language {
    pub fn from_code(code: &str) -> Self {
        if code.trim().eq_ignore_ascii_case("ar") {
            Language::Arabic
        } else {
            Language::English
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Arabic => "ar",
        }
    }

    /// Human-readable name used inside prompt text.
    pub fn name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Arabic => "Arabic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeMode {
    AnalyzeImage,
    FromIngredients,
}

/// Image payload as handed over by the caller: raw bytes from an upload or
/// data URL, or a URL the generation service can fetch itself.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Bytes { bytes: Vec<u8>, mime_type: String },
    Url(String),
}

/// Normalized form-field map produced by the ingestor.
///
/// Invariant (enforced in [`crate::ingest`]): exactly one of `image` /
/// non-empty `ingredients` is present.
#[derive(Debug, Clone)]
pub struct ParsedForm {
    pub image: Option<ImageSource>,
    pub language: Language,
    pub cuisine_type: String,
    pub ingredients: Vec<String>,
}

impl ParsedForm {
    pub fn mode(&self) -> RecipeMode {
        if self.image.is_some() {
            RecipeMode::AnalyzeImage
        } else {
            RecipeMode::FromIngredients
        }
    }
}

/// One generated recipe, the success payload of the whole pipeline.
///
/// `detected_ingredients` is populated only for image-mode requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub recipe_name: String,
    pub origin: String,
    pub cuisine_type: String,
    pub prep_time: String,
    pub cook_time: String,
    pub difficulty: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chef_tips: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_ingredients: Option<Vec<String>>,
}

/// How the image reaches the generation service: embedded base64 bytes or a
/// previously uploaded public URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageTransport {
    Inline,
    Reference,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint: String,
    pub bucket: String,
    pub base_url: String,
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub generation_timeout_secs: u64,
    pub structured_output: bool,
    pub image_transport: ImageTransport,
    pub image_edge_bound: u32,
    pub image_jpeg_quality: u8,
    pub max_body_bytes: usize,
    pub storage: Option<StorageConfig>,
}

impl Config {
    /// Load configuration once at process start. A missing generation
    /// credential is not an error here; requests are rejected per-call so
    /// the server can come up and report the condition.
    pub fn from_env() -> crate::Result<Self> {
        dotenvy::dotenv().ok();

        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let image_transport = match std::env::var("IMAGE_TRANSPORT") {
            Ok(raw) => match raw.to_ascii_lowercase().as_str() {
                "inline" => ImageTransport::Inline,
                "reference" => ImageTransport::Reference,
                other => {
                    return Err(crate::Error::Config(format!(
                        "IMAGE_TRANSPORT must be 'inline' or 'reference', got '{}'",
                        other
                    )))
                }
            },
            Err(_) => ImageTransport::Inline,
        };

        let storage = match (
            std::env::var("STORAGE_ACCESS_KEY_ID").ok(),
            std::env::var("STORAGE_SECRET_ACCESS_KEY").ok(),
        ) {
            (Some(access_key_id), Some(secret_access_key)) => Some(StorageConfig {
                access_key_id,
                secret_access_key,
                endpoint: std::env::var("STORAGE_ENDPOINT")
                    .unwrap_or_else(|_| "https://nyc3.digitaloceanspaces.com".to_string()),
                bucket: std::env::var("STORAGE_BUCKET")
                    .unwrap_or_else(|_| "matbakh-uploads".to_string()),
                base_url: std::env::var("STORAGE_BASE_URL")
                    .unwrap_or_else(|_| "https://cdn.matbakh.app".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            gemini_api_key,
            gemini_model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
            generation_timeout_secs: env_parse("GENERATION_TIMEOUT_SECS", 60)?,
            structured_output: env_flag("GENERATION_STRUCTURED_OUTPUT", true)?,
            image_transport,
            image_edge_bound: env_parse("IMAGE_EDGE_BOUND", 800)?,
            image_jpeg_quality: env_parse("IMAGE_JPEG_QUALITY", 82)?,
            max_body_bytes: env_parse("MAX_BODY_BYTES", 10 * 1024 * 1024)?,
            storage,
        })
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> crate::Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            crate::Error::Config(format!("{} must be a number, got '{}'", name, raw))
        }),
        Err(_) => Ok(default),
    }
}

fn env_flag(name: &str, default: bool) -> crate::Result<bool> {
    match std::env::var(name) {
        Ok(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            other => Err(crate::Error::Config(format!(
                "{} must be a boolean, got '{}'",
                name, other
            ))),
        },
        Err(_) => Ok(default),
    }
}
