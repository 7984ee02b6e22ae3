use anyhow::anyhow;
use assistant_flow::{PrescriptionImage, TextGenerator, VisionExtractor};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageFormat};
use reqwest::Client;
use rig::{agent::Agent, client::CompletionClient, completion::Prompt, providers::openrouter};
use serde_json::{Value, json};
use std::io::Cursor;
use std::sync::Arc;
use tracing::info;

use crate::config::AssistantConfig;

pub const EXTRACTION_PROMPT: &str = "Extract the patient name, doctor name, and a list of all medications with their dosages from this prescription.";

const VISION_MAX_TOKENS: u32 = 2000;

const MISSING_KEY: &str = "OPENROUTER_API_KEY environment variable not set";

/// Prescription OCR through an OpenRouter vision model.
#[derive(Clone)]
pub struct OpenRouterVision {
    http: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl OpenRouterVision {
    pub fn new(config: &AssistantConfig) -> Self {
        Self {
            http: Client::new(),
            api_key: config.openrouter_api_key.clone(),
            base_url: config.openrouter_base_url.trim_end_matches('/').to_string(),
            model: config.vision_model.clone(),
        }
    }
}

#[async_trait]
impl VisionExtractor for OpenRouterVision {
    async fn extract(&self, image: &PrescriptionImage) -> anyhow::Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| anyhow!(MISSING_KEY))?;

        let base64_image =
            encode_for_vision(image.bytes.clone(), image.media_type.clone()).await?;
        let content = vec![
            json!({
                "type": "text",
                "text": EXTRACTION_PROMPT
            }),
            json!({
                "type": "image_url",
                "image_url": {
                    "url": format!("data:image/png;base64,{}", base64_image)
                }
            }),
        ];

        let text = call_openrouter_api(
            &self.http,
            &self.base_url,
            api_key,
            &self.model,
            content,
            VISION_MAX_TOKENS,
        )
        .await?;

        info!(
            model = %self.model,
            chars = text.len(),
            "Vision OCR completed"
        );
        Ok(text)
    }
}

/// Decodes an upload, flattens it to RGB and re-encodes as base64 PNG.
///
/// A declared media type selects the decoder; without one the format is
/// guessed from the bytes.
pub async fn encode_for_vision(
    bytes: Vec<u8>,
    media_type: Option<String>,
) -> anyhow::Result<String> {
    let format = match media_type.as_deref() {
        Some(kind) => Some(
            ImageFormat::from_mime_type(kind)
                .ok_or_else(|| anyhow!("Unsupported media type: {}", kind))?,
        ),
        None => None,
    };

    tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
        let decoded = match format {
            Some(format) => image::load_from_memory_with_format(&bytes, format),
            None => image::load_from_memory(&bytes),
        }
        .map_err(|e| anyhow!("Failed to decode image: {}", e))?;
        let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());

        let mut buffer = Vec::new();
        rgb.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|e| anyhow!("Failed to encode image: {}", e))?;

        Ok(STANDARD.encode(&buffer))
    })
    .await?
}

/// Single-turn chat completion, content array in, message text out.
async fn call_openrouter_api(
    client: &Client,
    base_url: &str,
    api_key: &str,
    model: &str,
    content: Vec<Value>,
    max_tokens: u32,
) -> anyhow::Result<String> {
    let payload = json!({
        "model": model,
        "messages": [
            {
                "role": "user",
                "content": content
            }
        ],
        "max_tokens": max_tokens
    });

    let response = client
        .post(format!("{}/chat/completions", base_url))
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&payload)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(anyhow!("LLM API request failed: {}", response.status()));
    }

    let response_json: Value = response.json().await?;
    message_text(&response_json)
}

fn message_text(response_json: &Value) -> anyhow::Result<String> {
    response_json["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Invalid response format from LLM"))
}

/// Prescription chat through a rig OpenRouter agent.
///
/// The agent is built once with the configured sampling knobs and reused.
#[derive(Clone)]
pub struct OpenRouterChat {
    agent: Option<Arc<Agent<openrouter::CompletionModel>>>,
    model: String,
}

impl OpenRouterChat {
    pub fn new(config: &AssistantConfig) -> Self {
        let settings = &config.generation;
        let agent = config.openrouter_api_key.as_deref().map(|api_key| {
            let client = openrouter::Client::new(api_key);
            Arc::new(
                client
                    .agent(&config.chat_model)
                    .temperature(settings.temperature)
                    .max_tokens(settings.max_tokens)
                    .additional_params(json!({ "stop": [settings.stop_marker] }))
                    .build(),
            )
        });

        Self {
            agent,
            model: config.chat_model.clone(),
        }
    }
}

#[async_trait]
impl TextGenerator for OpenRouterChat {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let agent = self.agent.as_ref().ok_or_else(|| anyhow!(MISSING_KEY))?;

        info!(model = %self.model, "Requesting chat completion");
        let response = agent.prompt(prompt).await?;
        Ok(response)
    }
}
