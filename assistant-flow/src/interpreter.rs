use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    error::{AssistantError, Result},
    request::{PrescriptionImage, non_blank},
    safety::SafetyAnnotator,
};

const COMPONENT: &str = "PrescriptionInterpreter";

/// Turn-boundary marker the chat model emits when it is done answering.
pub const STOP_MARKER: &str = "<end_of_turn>";

pub const NO_CONTEXT_GUIDANCE: &str =
    "I need to analyze a prescription first before I can answer questions about it.";

pub const EMPTY_QUESTION_GUIDANCE: &str = "Please type a question.";

/// Reads text out of a prescription photo.
#[async_trait]
pub trait VisionExtractor: Send + Sync {
    async fn extract(&self, image: &PrescriptionImage) -> anyhow::Result<String>;
}

/// Produces a raw completion for a fully built prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Knobs for the chat model. Applied by the concrete generator when it is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub temperature: f64,
    pub max_tokens: u64,
    pub stop_marker: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 512,
            stop_marker: STOP_MARKER.to_string(),
        }
    }
}

/// Builds the single-turn user message: context first, then the question.
///
/// No turn markup is added; chat endpoints apply the model's own template and
/// the stop marker is only handed over as a stop sequence.
pub fn build_chat_prompt(question: &str, context: &str) -> String {
    format!(
        "Context:\n{}\n\nQuestion:\n{}",
        context.trim(),
        question.trim()
    )
}

/// Cuts a completion at the first stop marker and trims it.
pub fn truncate_at_marker<'a>(raw: &'a str, marker: &str) -> &'a str {
    let cut = if marker.is_empty() {
        raw
    } else {
        raw.split(marker).next().unwrap_or(raw)
    };
    cut.trim()
}

/// Prescription OCR and follow-up chat.
///
/// Both collaborators are handed in already initialised and are reused for
/// every call for the lifetime of the interpreter.
#[derive(Clone)]
pub struct PrescriptionInterpreter {
    extractor: Arc<dyn VisionExtractor>,
    generator: Arc<dyn TextGenerator>,
    annotator: SafetyAnnotator,
    stop_marker: String,
}

impl PrescriptionInterpreter {
    pub fn new(extractor: Arc<dyn VisionExtractor>, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            extractor,
            generator,
            annotator: SafetyAnnotator::default(),
            stop_marker: STOP_MARKER.to_string(),
        }
    }

    pub fn with_annotator(mut self, annotator: SafetyAnnotator) -> Self {
        self.annotator = annotator;
        self
    }

    pub fn with_stop_marker(mut self, marker: impl Into<String>) -> Self {
        self.stop_marker = marker.into();
        self
    }

    pub async fn extract_text(&self, image: &PrescriptionImage) -> Result<String> {
        info!(bytes = image.bytes.len(), "Delegating prescription image to OCR");

        if image.is_empty() {
            return Err(AssistantError::collaborator(
                COMPONENT,
                "OCR",
                "the uploaded image is empty",
            ));
        }

        let text = self
            .extractor
            .extract(image)
            .await
            .map_err(|e| AssistantError::collaborator(COMPONENT, "OCR", e.to_string()))?;

        if text.trim().is_empty() {
            warn!("OCR returned no text");
            return Err(AssistantError::collaborator(
                COMPONENT,
                "OCR",
                "no text could be extracted, the image might be too blurry",
            ));
        }

        info!(chars = text.len(), "Prescription text extracted");
        Ok(text)
    }

    pub async fn answer(&self, question: &str, context: &str) -> Result<String> {
        let Some(context) = non_blank(Some(context)) else {
            return Err(AssistantError::MissingInput(NO_CONTEXT_GUIDANCE.to_string()));
        };
        let Some(question) = non_blank(Some(question)) else {
            return Err(AssistantError::MissingInput(
                EMPTY_QUESTION_GUIDANCE.to_string(),
            ));
        };

        info!(question = %question, "Answering prescription question");
        let prompt = build_chat_prompt(question, context);

        let raw = self
            .generator
            .generate(&prompt)
            .await
            .map_err(|e| AssistantError::collaborator(COMPONENT, "Chat", e.to_string()))?;

        let answer = truncate_at_marker(&raw, &self.stop_marker);
        Ok(self.annotator.annotate(context, answer))
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns a canned OCR result and counts calls.
    pub struct FakeVision {
        pub reply: anyhow::Result<String>,
        pub calls: AtomicUsize,
    }

    impl FakeVision {
        pub fn ok(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                reply: Err(anyhow::anyhow!(message.to_string())),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VisionExtractor for FakeVision {
        async fn extract(&self, _image: &PrescriptionImage) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(anyhow::anyhow!(e.to_string())),
            }
        }
    }

    /// Returns a canned completion and records every prompt it receives.
    pub struct FakeGenerator {
        pub reply: anyhow::Result<String>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl FakeGenerator {
        pub fn ok(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                reply: Err(anyhow::anyhow!(message.to_string())),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextGenerator for FakeGenerator {
        async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(anyhow::anyhow!(e.to_string())),
            }
        }
    }
}
