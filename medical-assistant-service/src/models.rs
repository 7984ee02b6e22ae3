use assistant_flow::{ChatTurn, PrescriptionImage, RouteOutcome, Session};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct RouteRequest {
    #[serde(default)]
    pub text: String,
    pub image_base64: Option<String>,
    pub media_type: Option<String>,
    pub prior_context: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PrescriptionUpload {
    pub image_base64: String,
    pub media_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContextUpdate {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RouteResponse {
    pub route: String,
    pub reply: String,
    pub success: bool,
}

impl From<&RouteOutcome> for RouteResponse {
    fn from(outcome: &RouteOutcome) -> Self {
        Self {
            route: outcome.route.clone(),
            reply: outcome.reply(),
            success: outcome.is_success(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExchangeResponse {
    pub session_id: String,
    #[serde(flatten)]
    pub outcome: RouteResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub prior_context: Option<String>,
    pub history: Vec<ChatTurn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            session_id: session.id,
            prior_context: session.prior_context,
            history: session.history,
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

/// Decodes a base64 upload. A `data:<type>;base64,` prefix is accepted and
/// its media type is used when none was given separately.
pub fn decode_image(
    encoded: &str,
    media_type: Option<&str>,
) -> Result<PrescriptionImage, base64::DecodeError> {
    let encoded = encoded.trim();
    let (prefix_type, payload) = match encoded.strip_prefix("data:") {
        Some(rest) => match rest.split_once(";base64,") {
            Some((kind, payload)) => (Some(kind), payload),
            None => (None, encoded),
        },
        None => (None, encoded),
    };

    let bytes = STANDARD.decode(payload)?;
    let image = PrescriptionImage::new(bytes);
    Ok(match media_type.or(prefix_type) {
        Some(kind) => image.with_media_type(kind),
        None => image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_and_data_uri() {
        let plain = decode_image("aGVsbG8=", None).unwrap();
        assert_eq!(plain.bytes, b"hello");
        assert_eq!(plain.media_type, None);

        let uri = decode_image("data:image/jpeg;base64,aGVsbG8=", None).unwrap();
        assert_eq!(uri.bytes, b"hello");
        assert_eq!(uri.media_type.as_deref(), Some("image/jpeg"));

        let explicit = decode_image("data:image/jpeg;base64,aGVsbG8=", Some("image/png")).unwrap();
        assert_eq!(explicit.media_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn rejects_bad_base64() {
        assert!(decode_image("not base64!!", None).is_err());
    }
}
