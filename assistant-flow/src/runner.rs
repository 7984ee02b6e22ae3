//! ConversationRunner – load a session, route one user action against it, and
//! save the session back.
//!
//! The router itself is stateless. The runner is the piece that owns the
//! per-conversation prescription context: a successful OCR replaces it, a chat
//! question reads it, and nothing else touches it. A failed request leaves the
//! stored context exactly as it was.
//!
//! Every load → route → save cycle holds that session's lock, so concurrent
//! calls on one conversation apply one after another instead of overwriting
//! each other's saves.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::{
    error::StorageError,
    request::{PrescriptionImage, Request},
    route::RouteOutcome,
    router::{RequestRouter, routes},
    storage::{Session, SessionStorage},
};

/// High-level helper that orchestrates the _load → route → save_ pattern.
#[derive(Clone)]
pub struct ConversationRunner {
    router: Arc<RequestRouter>,
    storage: Arc<dyn SessionStorage>,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl ConversationRunner {
    pub fn new(router: Arc<RequestRouter>, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            router,
            storage,
            locks: Arc::new(DashMap::new()),
        }
    }

    fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.locks.entry(session_id.to_string()).or_default().clone()
    }

    pub fn router(&self) -> &RequestRouter {
        &self.router
    }

    pub async fn start(&self) -> Result<Session, StorageError> {
        let session = Session::new();
        self.storage.save(session.clone()).await?;
        info!(session_id = %session.id, "Conversation started");
        Ok(session)
    }

    pub async fn session(&self, session_id: &str) -> Result<Session, StorageError> {
        match self.storage.get(session_id).await? {
            Some(session) => Ok(session),
            None => {
                self.locks.remove(session_id);
                Err(StorageError::SessionNotFound(session_id.to_string()))
            }
        }
    }

    /// Runs OCR on a new prescription image. On success the extracted text
    /// becomes the session context, replacing any previous one.
    pub async fn upload(
        &self,
        session_id: &str,
        image: PrescriptionImage,
    ) -> Result<RouteOutcome, StorageError> {
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;
        let mut session = self.session(session_id).await?;

        let outcome = self.router.route(Request::image(image)).await;

        if outcome.route == routes::EXTRACTION {
            if let Ok(text) = &outcome.result {
                session.set_context(text);
                info!(session_id = %session_id, chars = text.len(), "Prescription context replaced");
            }
        }

        self.storage.save(session).await?;
        Ok(outcome)
    }

    /// Routes a typed question with the session's current context and appends
    /// the exchange to the history.
    pub async fn ask(&self, session_id: &str, question: &str) -> Result<RouteOutcome, StorageError> {
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;
        let mut session = self.session(session_id).await?;

        let outcome = self
            .router
            .route(Request::text(question, session.prior_context.clone()))
            .await;

        session.record_exchange(question, &outcome.reply());
        self.storage.save(session).await?;
        Ok(outcome)
    }

    /// Replaces the context with user-edited text. Blank text clears it.
    pub async fn edit_context(&self, session_id: &str, text: &str) -> Result<Session, StorageError> {
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;
        let mut session = self.session(session_id).await?;
        session.set_context(text);
        self.storage.save(session.clone()).await?;
        Ok(session)
    }

    /// Removes the conversation and everything stored with it.
    pub async fn end(&self, session_id: &str) -> Result<(), StorageError> {
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;
        self.session(session_id).await?;
        self.storage.delete(session_id).await?;
        self.locks.remove(session_id);
        info!(session_id = %session_id, "Conversation ended");
        Ok(())
    }
}
