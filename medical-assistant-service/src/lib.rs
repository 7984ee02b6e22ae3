pub mod assistant;
pub mod config;
pub mod models;
pub mod providers;
pub mod service;

pub use assistant::{build_request_router, create_conversation_runner, create_session_storage};
pub use config::{AssistantConfig, ConfigError};
pub use service::{AppState, build_router, create_app};
