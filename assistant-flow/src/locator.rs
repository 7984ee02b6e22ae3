use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{AssistantError, Result};

/// Upper bound on results shown per search.
pub const MAX_RESULTS: usize = 5;

pub const DEFAULT_CITY: &str = "Coimbatore";

pub const NOT_LISTED: &str = "Not Listed";

/// Specialties recognised in free text, checked in this order.
pub const SPECIALTIES: &[&str] = &[
    "cardiologist",
    "neurologist",
    "dentist",
    "dermatologist",
    "hospital",
    "pharmacy",
];

const PHONE_TAGS: &[&str] = &["phone", "contact:phone"];
const WEBSITE_TAGS: &[&str] = &["website", "contact:website"];

/// A raw place as returned by the search provider. Every field may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaceRecord {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub lat: Option<String>,
    #[serde(default)]
    pub lon: Option<String>,
    #[serde(default)]
    pub extratags: Option<HashMap<String, String>>,
}

/// External place search.
#[async_trait]
pub trait PlaceSearchProvider: Send + Sync {
    /// Runs one free-text query. Transport failures are errors, an empty list
    /// means the provider found nothing.
    async fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<PlaceRecord>>;
}

/// Coordinates keep the provider's text so links match what it returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceResult {
    pub display_name: String,
    pub latitude: String,
    pub longitude: String,
    pub phone: Option<String>,
    pub website: Option<String>,
}

impl ServiceResult {
    /// `None` when the record has no usable coordinates.
    pub fn from_record(record: &PlaceRecord) -> Option<Self> {
        let latitude = coordinate(record.lat.as_deref())?;
        let longitude = coordinate(record.lon.as_deref())?;

        let display_name = record
            .display_name
            .as_deref()
            .and_then(|name| name.split(',').next())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(NOT_LISTED)
            .to_string();

        Some(Self {
            display_name,
            latitude,
            longitude,
            phone: first_tag(record, PHONE_TAGS),
            website: first_tag(record, WEBSITE_TAGS),
        })
    }

    pub fn map_link(&self) -> String {
        map_link(&self.latitude, &self.longitude)
    }
}

fn coordinate(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    raw.parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some(raw.to_string())
}

pub fn map_link(latitude: &str, longitude: &str) -> String {
    format!(
        "https://www.google.com/maps/search/?api=1&query={},{}",
        latitude, longitude
    )
}

fn first_tag(record: &PlaceRecord, keys: &[&str]) -> Option<String> {
    let tags = record.extratags.as_ref()?;
    keys.iter()
        .filter_map(|key| tags.get(*key))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// City and specialty pulled out of a free-text location question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationQuery {
    pub city: String,
    pub specialty: Option<String>,
}

impl LocationQuery {
    /// "Find a cardiologist in Chennai" → (Chennai, Cardiologist).
    pub fn parse(text: &str, default_city: &str) -> Self {
        let words: Vec<&str> = text.split_whitespace().collect();
        let city = words
            .iter()
            .position(|w| w.eq_ignore_ascii_case("in"))
            .and_then(|idx| words.get(idx + 1))
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|w| !w.is_empty())
            .unwrap_or(default_city)
            .to_string();

        let lowered = text.to_lowercase();
        let specialty = SPECIALTIES
            .iter()
            .find(|s| lowered.contains(*s))
            .map(|s| capitalize(s));

        Self { city, specialty }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Nearby medical service lookup with a general-hospital fallback.
#[derive(Clone)]
pub struct ServiceLocator {
    provider: Arc<dyn PlaceSearchProvider>,
    default_city: String,
    limit: usize,
}

impl ServiceLocator {
    pub fn new(provider: Arc<dyn PlaceSearchProvider>) -> Self {
        Self {
            provider,
            default_city: DEFAULT_CITY.to_string(),
            limit: MAX_RESULTS,
        }
    }

    pub fn with_default_city(mut self, city: impl Into<String>) -> Self {
        self.default_city = city.into();
        self
    }

    pub fn default_city(&self) -> &str {
        &self.default_city
    }

    /// Specialty query first, then "Hospitals in {city}" if that came back
    /// empty. A failed query step counts as an empty one.
    pub async fn search(&self, city: &str, specialty: Option<&str>) -> Result<Vec<ServiceResult>> {
        let specialty = specialty.map(str::trim).filter(|s| !s.is_empty());
        let general = format!("Hospitals in {}", city);

        let primary = match specialty {
            Some(specialty) => format!("{} in {}", specialty, city),
            None => general.clone(),
        };

        let mut results = self.run_query(&primary).await;

        if results.is_empty() && specialty.is_some() {
            info!(query = %general, "No specialist results, falling back to general hospitals");
            results = self.run_query(&general).await;
        }

        if results.is_empty() {
            return Err(AssistantError::NotFound {
                city: city.to_string(),
            });
        }

        Ok(results)
    }

    /// Parses the question, searches and renders the results for display.
    pub async fn find_services(&self, text: &str) -> Result<String> {
        let query = LocationQuery::parse(text, &self.default_city);
        info!(
            city = %query.city,
            specialty = ?query.specialty,
            "Searching for medical services"
        );

        let results = self.search(&query.city, query.specialty.as_deref()).await?;
        Ok(render_results(
            &query.city,
            query.specialty.as_deref(),
            &results,
        ))
    }

    async fn run_query(&self, query: &str) -> Vec<ServiceResult> {
        info!(query = %query, "Querying place search");
        match self.provider.search(query, self.limit).await {
            Ok(records) => records
                .iter()
                .filter_map(ServiceResult::from_record)
                .take(self.limit)
                .collect(),
            Err(e) => {
                warn!(query = %query, error = %e, "Place search failed, treating as no results");
                Vec::new()
            }
        }
    }
}

pub fn render_results(city: &str, specialty: Option<&str>, results: &[ServiceResult]) -> String {
    let mut out = format!("### Recommended Medical Services in {}\n", city);
    if let Some(specialty) = specialty {
        let _ = writeln!(
            out,
            "*(Showing results for {} or General Hospitals)*",
            specialty
        );
    }

    for result in results {
        let _ = write!(
            out,
            "\n**{}**\n[Click to Navigate]({})\nPhone: {}\nWebsite: {}\n---",
            result.display_name,
            result.map_link(),
            result.phone.as_deref().unwrap_or(NOT_LISTED),
            result.website.as_deref().unwrap_or(NOT_LISTED),
        );
    }

    out
}


#[cfg(test)]
mod tests {
    use super::fakes::{SpyProvider, place};
    use super::*;

    fn locator(provider: Arc<SpyProvider>) -> ServiceLocator {
        ServiceLocator::new(provider)
    }

    #[tokio::test]
    async fn empty_specialty_search_falls_back_once() {
        let provider = Arc::new(SpyProvider::default());
        let locator = locator(provider.clone());

        let err = locator
            .search("Coimbatore", Some("Cardiologist"))
            .await
            .unwrap_err();

        assert!(matches!(err, AssistantError::NotFound { ref city } if city == "Coimbatore"));
        assert_eq!(
            provider.queries(),
            vec!["Cardiologist in Coimbatore", "Hospitals in Coimbatore"]
        );
    }

    #[tokio::test]
    async fn repeated_search_gives_same_outcome() {
        let provider = Arc::new(SpyProvider::default().with_results(
            "Hospitals in Coimbatore",
            vec![place("KG Hospital, Coimbatore, India", "11.0", "76.96")],
        ));
        let locator = locator(provider.clone());

        let first = locator.search("Coimbatore", Some("Cardiologist")).await.unwrap();
        let second = locator.search("Coimbatore", Some("Cardiologist")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0].display_name, "KG Hospital");
        assert_eq!(provider.queries().len(), 4);
    }

    #[tokio::test]
    async fn no_fallback_without_specialty() {
        let provider = Arc::new(SpyProvider::default());
        let err = locator(provider.clone())
            .search("Chennai", None)
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "No medical services found in Chennai. Please check the city name."
        );
        assert_eq!(provider.queries(), vec!["Hospitals in Chennai"]);
    }

    #[tokio::test]
    async fn primary_hit_skips_fallback() {
        let provider = Arc::new(SpyProvider::default().with_results(
            "Dentist in Madurai",
            vec![place("Smile Dental", "9.92", "78.12")],
        ));
        let results = locator(provider.clone())
            .search("Madurai", Some("Dentist"))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(provider.queries(), vec!["Dentist in Madurai"]);
    }

    #[tokio::test]
    async fn transport_failure_degrades_like_empty() {
        let provider = Arc::new(
            SpyProvider::default()
                .with_failure("Cardiologist in Pune", "503 Service Unavailable")
                .with_results("Hospitals in Pune", vec![place("Ruby Hall", "18.53", "73.87")]),
        );
        let results = locator(provider.clone())
            .search("Pune", Some("Cardiologist"))
            .await
            .unwrap();
        assert_eq!(results[0].display_name, "Ruby Hall");

        let failing = Arc::new(SpyProvider::default().with_failure("Hospitals in Pune", "timeout"));
        let err = locator(failing).search("Pune", None).await.unwrap_err();
        assert!(matches!(err, AssistantError::NotFound { .. }));
    }

    #[tokio::test]
    async fn results_are_capped() {
        let many = (0..8)
            .map(|i| place(&format!("Clinic {i}"), "10.0", "77.0"))
            .collect();
        let provider = Arc::new(SpyProvider::default().with_results("Hospitals in Salem", many));
        let results = locator(provider).search("Salem", None).await.unwrap();
        assert_eq!(results.len(), MAX_RESULTS);
        assert_eq!(results[4].display_name, "Clinic 4");
    }

    #[test]
    fn map_link_is_deterministic() {
        assert_eq!(
            map_link("11.0168", "76.9558"),
            "https://www.google.com/maps/search/?api=1&query=11.0168,76.9558"
        );
        assert_eq!(map_link("11.0168", "76.9558"), map_link("11.0168", "76.9558"));
    }

    #[test]
    fn links_keep_provider_coordinates() {
        let result = ServiceResult::from_record(&place("Ganga Hospital", " 11.0 ", "76.9600")).unwrap();
        assert_eq!(result.latitude, "11.0");
        assert_eq!(
            result.map_link(),
            "https://www.google.com/maps/search/?api=1&query=11.0,76.9600"
        );

        assert!(ServiceResult::from_record(&place("Nowhere", "north", "76.9")).is_none());
        assert!(ServiceResult::from_record(&place("Nowhere", "NaN", "76.9")).is_none());
    }

    #[test]
    fn missing_fields_use_placeholder_or_skip() {
        let mut record = place("", "12.9", "77.5");
        record.display_name = None;
        let result = ServiceResult::from_record(&record).unwrap();
        assert_eq!(result.display_name, NOT_LISTED);
        assert_eq!(result.phone, None);

        let no_coords = PlaceRecord {
            display_name: Some("Somewhere".to_string()),
            ..Default::default()
        };
        assert!(ServiceResult::from_record(&no_coords).is_none());
    }

    #[test]
    fn contact_tags_are_picked_up() {
        let mut record = place("City Clinic", "1.0", "2.0");
        record.extratags = Some(HashMap::from([
            ("contact:phone".to_string(), "+91 422 000 000".to_string()),
            ("website".to_string(), "https://cityclinic.example".to_string()),
        ]));
        let result = ServiceResult::from_record(&record).unwrap();
        assert_eq!(result.phone.as_deref(), Some("+91 422 000 000"));
        assert_eq!(result.website.as_deref(), Some("https://cityclinic.example"));
    }

    #[test]
    fn parses_city_and_specialty() {
        assert_eq!(
            LocationQuery::parse("Find a Cardiologist in Chennai?", DEFAULT_CITY),
            LocationQuery {
                city: "Chennai".to_string(),
                specialty: Some("Cardiologist".to_string()),
            }
        );
        assert_eq!(
            LocationQuery::parse("where is the nearest pharmacy", DEFAULT_CITY),
            LocationQuery {
                city: DEFAULT_CITY.to_string(),
                specialty: Some("Pharmacy".to_string()),
            }
        );
        assert_eq!(
            LocationQuery::parse("show me a map in", "Salem").city,
            "Salem"
        );
    }

    #[test]
    fn renders_results_with_placeholders() {
        let results = vec![ServiceResult {
            display_name: "KG Hospital".to_string(),
            latitude: "11.0".to_string(),
            longitude: "76.5".to_string(),
            phone: None,
            website: Some("https://kg.example".to_string()),
        }];
        let text = render_results("Coimbatore", Some("Cardiologist"), &results);

        assert!(text.starts_with("### Recommended Medical Services in Coimbatore\n"));
        assert!(text.contains("*(Showing results for Cardiologist or General Hospitals)*"));
        assert!(text.contains("**KG Hospital**"));
        assert!(text.contains("(https://www.google.com/maps/search/?api=1&query=11.0,76.5)"));
        assert!(text.contains("Phone: Not Listed"));
        assert!(text.contains("Website: https://kg.example"));
    }

    #[tokio::test]
    async fn find_services_uses_parsed_query() {
        let provider = Arc::new(SpyProvider::default().with_results(
            "Neurologist in Trichy",
            vec![place("Brain Care, Trichy", "10.8", "78.7")],
        ));
        let text = locator(provider.clone())
            .find_services("need a neurologist in Trichy")
            .await
            .unwrap();
        assert!(text.contains("**Brain Care**"));
        assert_eq!(provider.queries(), vec!["Neurologist in Trichy"]);
    }
}
