use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

use crate::{
    error::{AssistantError, Result},
    intent::{Intent, IntentClassifier, KeywordClassifier},
    interpreter::{NO_CONTEXT_GUIDANCE, PrescriptionInterpreter},
    locator::ServiceLocator,
    request::{PrescriptionImage, Request},
    route::{Dispatch, Handler, RouteOutcome, RouteTable, RouteTableBuilder},
};

/// Route names, also reported back to callers.
pub mod routes {
    pub const EXTRACTION: &str = "prescription_extraction";
    pub const MEDICAL_CHAT: &str = "medical_chat";
    pub const LOCATION_SEARCH: &str = "location_search";
    pub const CHAT_WITHOUT_CONTEXT: &str = "chat_without_context";
    pub const CAPABILITY_SUMMARY: &str = "capability_summary";
}

pub const CAPABILITY_SUMMARY: &str = "I can help you analyze prescriptions or find nearby doctors. Please upload an image or ask 'Where is a hospital?'";

struct ExtractionHandler {
    interpreter: PrescriptionInterpreter,
}

#[async_trait]
impl Handler for ExtractionHandler {
    async fn handle(&self, dispatch: &Dispatch) -> Result<String> {
        let image = dispatch.image().ok_or_else(|| {
            AssistantError::MissingInput("Please upload a prescription image.".to_string())
        })?;
        self.interpreter.extract_text(image).await
    }
}

struct MedicalChatHandler {
    interpreter: PrescriptionInterpreter,
}

#[async_trait]
impl Handler for MedicalChatHandler {
    async fn handle(&self, dispatch: &Dispatch) -> Result<String> {
        self.interpreter
            .answer(
                dispatch.text().unwrap_or_default(),
                dispatch.prior_context().unwrap_or_default(),
            )
            .await
    }
}

struct LocationSearchHandler {
    locator: ServiceLocator,
}

#[async_trait]
impl Handler for LocationSearchHandler {
    async fn handle(&self, dispatch: &Dispatch) -> Result<String> {
        self.locator
            .find_services(dispatch.text().unwrap_or_default())
            .await
    }
}

/// Answers chat questions that arrive before any prescription was read.
struct ContextGuidanceHandler;

#[async_trait]
impl Handler for ContextGuidanceHandler {
    async fn handle(&self, _dispatch: &Dispatch) -> Result<String> {
        Err(AssistantError::MissingInput(NO_CONTEXT_GUIDANCE.to_string()))
    }
}

/// Sends each request to OCR, prescription chat or place search.
///
/// Priority, first match wins:
/// 1. an image always goes to OCR, whatever text came with it;
/// 2. chat intent with prescription context goes to the interpreter;
/// 3. location intent goes to the locator, context or not;
/// 4. chat intent without context gets a guidance message;
/// 5. anything else gets the capability summary.
///
/// Text is always classified, so blank text is chat intent: with context the
/// interpreter asks for a question, without it the guidance route answers.
///
/// Routing holds no state; the caller owns the prescription context and
/// passes it in on every call.
#[derive(Clone)]
pub struct RequestRouter {
    table: RouteTable,
    classifier: Arc<dyn IntentClassifier>,
}

impl RequestRouter {
    pub fn new(interpreter: PrescriptionInterpreter, locator: ServiceLocator) -> Self {
        let table = RouteTableBuilder::new()
            .add_route(
                routes::EXTRACTION,
                Arc::new(ExtractionHandler {
                    interpreter: interpreter.clone(),
                }),
                |d: &Dispatch| d.image().is_some(),
            )
            .add_route(
                routes::MEDICAL_CHAT,
                Arc::new(MedicalChatHandler { interpreter }),
                |d: &Dispatch| d.is_intent(Intent::MedicalChat) && d.prior_context().is_some(),
            )
            .add_route(
                routes::LOCATION_SEARCH,
                Arc::new(LocationSearchHandler { locator }),
                |d: &Dispatch| d.is_intent(Intent::LocationSearch),
            )
            .add_route(
                routes::CHAT_WITHOUT_CONTEXT,
                Arc::new(ContextGuidanceHandler),
                |d: &Dispatch| d.is_intent(Intent::MedicalChat),
            )
            .build();

        Self::from_table(table, Arc::new(KeywordClassifier::default()))
    }

    pub fn from_table(table: RouteTable, classifier: Arc<dyn IntentClassifier>) -> Self {
        Self { table, classifier }
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn IntentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn classify_intent(&self, text: &str) -> Intent {
        self.classifier.classify(text)
    }

    pub fn routes(&self) -> Vec<&str> {
        self.table.names()
    }

    pub async fn route(&self, request: Request) -> RouteOutcome {
        let intent = match &request {
            Request::Text(text) => Some(self.classify_intent(text.text.trim())),
            Request::Image(_) => None,
        };
        let dispatch = Dispatch { request, intent };

        let Some(route) = self.table.first_match(&dispatch) else {
            info!("No route matched, replying with capability summary");
            return RouteOutcome::new(
                routes::CAPABILITY_SUMMARY,
                Ok(CAPABILITY_SUMMARY.to_string()),
            );
        };

        info!(route = %route.name, intent = ?dispatch.intent, "Routing request");
        let result = route.handler.handle(&dispatch).await;

        if let Err(e) = &result {
            match e {
                AssistantError::CollaboratorFailure { .. } => {
                    error!(route = %route.name, error = %e, "Collaborator call failed")
                }
                _ => info!(route = %route.name, reason = %e, "Request answered with guidance"),
            }
        }

        RouteOutcome::new(route.name.clone(), result)
    }

    /// Single entry point for a presentation layer: loose inputs in, display
    /// text out.
    pub async fn respond(
        &self,
        image: Option<PrescriptionImage>,
        text: &str,
        prior_context: Option<&str>,
    ) -> String {
        let request = Request::from_parts(image, text, prior_context.map(str::to_string));
        self.route(request).await.into_reply()
    }
}
