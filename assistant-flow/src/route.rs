use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    error::{AssistantError, Result},
    intent::Intent,
    request::{PrescriptionImage, Request, non_blank},
};

/// The request being routed, plus its intent. Text requests always carry one.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub request: Request,
    pub intent: Option<Intent>,
}

impl Dispatch {
    pub fn image(&self) -> Option<&PrescriptionImage> {
        match &self.request {
            Request::Image(image) => Some(image),
            Request::Text(_) => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.request {
            Request::Text(text) => non_blank(Some(text.text.as_str())),
            Request::Image(_) => None,
        }
    }

    /// Prior prescription text, ignoring blank strings.
    pub fn prior_context(&self) -> Option<&str> {
        match &self.request {
            Request::Text(text) => non_blank(text.prior_context.as_deref()),
            Request::Image(_) => None,
        }
    }

    pub fn is_intent(&self, intent: Intent) -> bool {
        self.intent == Some(intent)
    }
}

/// A destination for routed requests.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, dispatch: &Dispatch) -> Result<String>;
}

/// Type alias for route condition functions
pub type RouteCondition = Arc<dyn Fn(&Dispatch) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct Route {
    pub name: String,
    pub condition: RouteCondition,
    pub handler: Arc<dyn Handler>,
}

/// Routes checked in insertion order; the first whose condition holds wins.
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn first_match(&self, dispatch: &Dispatch) -> Option<&Route> {
        self.routes.iter().find(|route| (route.condition)(dispatch))
    }

    pub fn names(&self) -> Vec<&str> {
        self.routes.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Builder for creating route tables
#[derive(Default)]
pub struct RouteTableBuilder {
    table: RouteTable,
}

impl RouteTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_route<F>(
        mut self,
        name: impl Into<String>,
        handler: Arc<dyn Handler>,
        condition: F,
    ) -> Self
    where
        F: Fn(&Dispatch) -> bool + Send + Sync + 'static,
    {
        self.table.routes.push(Route {
            name: name.into(),
            condition: Arc::new(condition),
            handler,
        });
        self
    }

    pub fn build(self) -> RouteTable {
        self.table
    }
}

/// What routing produced: which route ran and its typed result.
#[derive(Debug)]
pub struct RouteOutcome {
    pub route: String,
    pub result: Result<String>,
}

impl RouteOutcome {
    pub fn new(route: impl Into<String>, result: Result<String>) -> Self {
        Self {
            route: route.into(),
            result,
        }
    }

    /// The display string. Errors render through their `Display` text, so a
    /// not-found search and a failed one read the same.
    pub fn reply(&self) -> String {
        match &self.result {
            Ok(text) => text.clone(),
            Err(e) => e.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&AssistantError> {
        self.result.as_ref().err()
    }

    pub fn into_reply(self) -> String {
        match self.result {
            Ok(text) => text,
            Err(e) => e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo(&'static str);

    #[async_trait]
    impl Handler for Echo {
        async fn handle(&self, _dispatch: &Dispatch) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn text_dispatch(text: &str, intent: Option<Intent>) -> Dispatch {
        Dispatch {
            request: Request::text(text, None),
            intent,
        }
    }

    #[tokio::test]
    async fn first_matching_route_wins() {
        let table = RouteTableBuilder::new()
            .add_route("never", Arc::new(Echo("never")), |_| false)
            .add_route("chat", Arc::new(Echo("chat")), |d| {
                d.is_intent(Intent::MedicalChat)
            })
            .add_route("any", Arc::new(Echo("any")), |_| true)
            .build();

        let dispatch = text_dispatch("dose?", Some(Intent::MedicalChat));
        let route = table.first_match(&dispatch).unwrap();
        assert_eq!(route.name, "chat");
        assert_eq!(route.handler.handle(&dispatch).await.unwrap(), "chat");
        assert_eq!(table.names(), vec!["never", "chat", "any"]);
    }

    #[test]
    fn no_match_returns_none() {
        let table = RouteTableBuilder::new()
            .add_route("image", Arc::new(Echo("image")), |d| d.image().is_some())
            .build();
        assert!(table.first_match(&text_dispatch("hi", None)).is_none());
    }

    #[test]
    fn blank_context_is_treated_as_absent() {
        let dispatch = Dispatch {
            request: Request::text("dose?", Some("  \n".to_string())),
            intent: Some(Intent::MedicalChat),
        };
        assert_eq!(dispatch.prior_context(), None);
        assert_eq!(dispatch.text(), Some("dose?"));
    }

    #[test]
    fn outcome_reply_renders_errors() {
        let outcome = RouteOutcome::new(
            "location_search",
            Err(AssistantError::NotFound {
                city: "Erode".to_string(),
            }),
        );
        assert!(!outcome.is_success());
        assert_eq!(
            outcome.reply(),
            "No medical services found in Erode. Please check the city name."
        );
    }
}
