use anyhow::anyhow;
use assistant_flow::{PlaceRecord, PlaceSearchProvider};
use async_trait::async_trait;
use reqwest::{Client, header::USER_AGENT};
use tracing::info;

use crate::config::AssistantConfig;

/// Free-text place search against OpenStreetMap Nominatim. No API key needed,
/// but the usage policy requires an identifying User-Agent.
#[derive(Clone)]
pub struct NominatimSearch {
    http: Client,
    base_url: String,
    user_agent: String,
}

impl NominatimSearch {
    pub fn new(config: &AssistantConfig) -> Self {
        Self {
            http: Client::new(),
            base_url: config.nominatim_url.clone(),
            user_agent: config.search_user_agent.clone(),
        }
    }
}

/// Extra tags carry phone and website details.
pub fn search_url(base_url: &str, query: &str, limit: usize) -> String {
    format!(
        "{}?q={}&format=json&addressdetails=1&limit={}&extratags=1",
        base_url,
        urlencoding::encode(query),
        limit
    )
}

#[async_trait]
impl PlaceSearchProvider for NominatimSearch {
    async fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<PlaceRecord>> {
        let url = search_url(&self.base_url, query, limit);
        info!(query = %query, "Connecting to OpenStreetMap");

        let response = self
            .http
            .get(&url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| anyhow!("Nominatim request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!("Nominatim returned {}", response.status()));
        }

        let places: Vec<PlaceRecord> = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse Nominatim response: {}", e))?;

        info!(query = %query, count = places.len(), "Nominatim search finished");
        Ok(places)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_encoded_query() {
        let url = search_url(
            "https://nominatim.openstreetmap.org/search",
            "Cardiologist in Coimbatore",
            5,
        );
        assert_eq!(
            url,
            "https://nominatim.openstreetmap.org/search?q=Cardiologist%20in%20Coimbatore&format=json&addressdetails=1&limit=5&extratags=1"
        );
    }

    #[test]
    fn parses_nominatim_payload() {
        let body = r#"[
            {
                "place_id": 1,
                "display_name": "PSG Hospitals, Avinashi Road, Coimbatore, Tamil Nadu, India",
                "lat": "11.0247",
                "lon": "77.0106",
                "extratags": {"phone": "+91 422 457 0170", "healthcare": "hospital"}
            },
            {
                "display_name": "Unnamed clinic",
                "lat": "11.0",
                "lon": "77.0",
                "extratags": null
            }
        ]"#;
        let places: Vec<PlaceRecord> = serde_json::from_str(body).unwrap();
        assert_eq!(places.len(), 2);
        assert_eq!(places[0].lat.as_deref(), Some("11.0247"));
        assert!(places[1].extratags.is_none());

        let result = assistant_flow::ServiceResult::from_record(&places[0]).unwrap();
        assert_eq!(result.display_name, "PSG Hospitals");
        assert_eq!(result.phone.as_deref(), Some("+91 422 457 0170"));
    }

    /// Usage: NOMINATIM_LIVE_TEST=1 cargo test test_live_nominatim
    #[tokio::test]
    async fn test_live_nominatim() -> anyhow::Result<()> {
        if std::env::var("NOMINATIM_LIVE_TEST").is_err() {
            println!("Skipping test - set NOMINATIM_LIVE_TEST environment variable");
            return Ok(());
        }

        let search = NominatimSearch::new(&AssistantConfig::default());
        let places = search.search("Hospitals in Coimbatore", 5).await?;
        println!("Found {} places", places.len());
        assert!(places.len() <= 5);
        Ok(())
    }
}
