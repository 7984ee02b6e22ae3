use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    #[serde(rename = "AI")]
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// One user's conversation: the current prescription text and the chat so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub prior_context: Option<String>,
    pub history: Vec<ChatTurn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            prior_context: None,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the prescription text. Blank text clears it.
    pub fn set_context(&mut self, text: &str) {
        let trimmed = text.trim();
        self.prior_context = if trimmed.is_empty() {
            None
        } else {
            Some(text.to_string())
        };
        self.updated_at = Utc::now();
    }

    pub fn record_exchange(&mut self, question: &str, reply: &str) {
        let now = Utc::now();
        self.history.push(ChatTurn {
            role: Role::User,
            message: question.to_string(),
            at: now,
        });
        self.history.push(ChatTurn {
            role: Role::Assistant,
            message: reply.to_string(),
            at: now,
        });
        self.updated_at = now;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for storing and retrieving sessions
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn save(&self, session: Session) -> Result<(), StorageError>;
    async fn get(&self, id: &str) -> Result<Option<Session>, StorageError>;
    async fn delete(&self, id: &str) -> Result<(), StorageError>;
}

/// In-memory implementation of SessionStorage
#[derive(Clone, Default)]
pub struct InMemorySessionStorage {
    sessions: Arc<DashMap<String, Session>>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn save(&self, session: Session) -> Result<(), StorageError> {
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Session>, StorageError> {
        Ok(self.sessions.get(id).map(|entry| entry.clone()))
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        self.sessions.remove(id);
        Ok(())
    }
}
