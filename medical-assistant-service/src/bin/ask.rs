use anyhow::{Context as _, Result};
use assistant_flow::PrescriptionImage;
use clap::Parser;
use medical_assistant_service::{AssistantConfig, build_request_router};
use std::path::PathBuf;
use tracing::info;

/// Route one request through the assistant and print the reply.
#[derive(Parser, Debug)]
#[command(name = "ask", version, about)]
struct Args {
    /// Prescription image to read; takes priority over the question
    #[arg(long)]
    image: Option<PathBuf>,

    /// File holding previously extracted prescription text
    #[arg(long)]
    context_file: Option<PathBuf>,

    /// The question, e.g. "Find a cardiologist in Chennai"
    text: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args = Args::parse();
    let config = AssistantConfig::from_env()?;
    let router = build_request_router(&config);

    let image = match &args.image {
        Some(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("reading image {}", path.display()))?;
            Some(PrescriptionImage::new(bytes))
        }
        None => None,
    };

    let context = match &args.context_file {
        Some(path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading context {}", path.display()))?,
        ),
        None => None,
    };

    let question = args.text.join(" ");
    info!(
        has_image = image.is_some(),
        has_context = context.is_some(),
        "Routing request"
    );

    let reply = router
        .respond(image, &question, context.as_deref())
        .await;

    println!("{}", reply);
    Ok(())
}
