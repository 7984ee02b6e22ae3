use assistant_flow::{
    ConversationRunner, InMemorySessionStorage, PrescriptionInterpreter, RequestRouter,
    ServiceLocator, SessionStorage,
};
use std::sync::Arc;

use crate::{
    config::AssistantConfig,
    providers::{NominatimSearch, OpenRouterChat, OpenRouterVision},
};

/// Wires the production collaborators into a router. Every client is built
/// here once and shared by all requests.
pub fn build_request_router(config: &AssistantConfig) -> RequestRouter {
    let interpreter = PrescriptionInterpreter::new(
        Arc::new(OpenRouterVision::new(config)),
        Arc::new(OpenRouterChat::new(config)),
    )
    .with_stop_marker(config.generation.stop_marker.clone());

    let locator = ServiceLocator::new(Arc::new(NominatimSearch::new(config)))
        .with_default_city(config.default_city.clone());

    RequestRouter::new(interpreter, locator)
}

pub fn create_conversation_runner(
    router: RequestRouter,
    session_storage: Arc<dyn SessionStorage>,
) -> ConversationRunner {
    ConversationRunner::new(Arc::new(router), session_storage)
}

pub fn create_session_storage() -> Arc<dyn SessionStorage> {
    Arc::new(InMemorySessionStorage::new())
}
