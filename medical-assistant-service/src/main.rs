use medical_assistant_service::{AssistantConfig, create_app};
use tokio::net::TcpListener;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = AssistantConfig::from_env()?;

    if config.openrouter_api_key.is_none() {
        warn!("OPENROUTER_API_KEY is not set; prescription OCR and chat will reply with an error");
    }

    let app = create_app(&config);
    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    let addr = listener.local_addr()?;

    info!("Smart Medical Assistant starting on {}", addr);
    info!("API Documentation available at http://{}/", addr);
    info!("Health check endpoint: http://{}/health", addr);
    info!("Conversation endpoint: POST http://{}/assistant/sessions", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
