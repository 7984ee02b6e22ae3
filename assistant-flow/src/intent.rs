use serde::{Deserialize, Serialize};

/// Routing decision derived from user text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    LocationSearch,
    MedicalChat,
}

/// Words that send a question to the place search.
pub const LOCATION_KEYWORDS: &[&str] = &[
    "find",
    "where",
    "location",
    "near",
    "nearby",
    "hospital",
    "clinic",
    "doctor",
    "cardiologist",
    "neurologist",
    "map",
];

/// Strategy that turns free text into an [`Intent`].
///
/// Implementations must always answer; there is no "unknown" intent.
pub trait IntentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Intent;
}

/// A keyword predicate: matches when any keyword occurs in the lowercased text.
#[derive(Debug, Clone)]
pub struct KeywordRule {
    pub intent: Intent,
    keywords: Vec<String>,
}

impl KeywordRule {
    pub fn new<I, S>(intent: Intent, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            intent,
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// `lowered` must already be lowercase.
    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }
}

/// Ordered keyword rules, first match wins, `MedicalChat` otherwise.
///
/// Matching is plain substring search, so "findings" counts as "find". That is
/// accepted: the classifier is meant to be cheap and explainable, and can be
/// swapped for another [`IntentClassifier`] without touching the router.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    rules: Vec<KeywordRule>,
    fallback: Intent,
}

impl KeywordClassifier {
    pub fn new(rules: Vec<KeywordRule>) -> Self {
        Self {
            rules,
            fallback: Intent::MedicalChat,
        }
    }

    /// Adds keywords to the first location rule, creating one if needed.
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extra = KeywordRule::new(Intent::LocationSearch, keywords);
        match self
            .rules
            .iter_mut()
            .find(|r| r.intent == Intent::LocationSearch)
        {
            Some(rule) => rule.keywords.extend(extra.keywords),
            None => self.rules.push(extra),
        }
        self
    }

    /// Appends a rule after the existing ones.
    pub fn with_rule(mut self, rule: KeywordRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(vec![KeywordRule::new(
            Intent::LocationSearch,
            LOCATION_KEYWORDS.iter().copied(),
        )])
    }
}

impl IntentClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Intent {
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map(|rule| rule.intent)
            .unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_keywords_route_to_search() {
        let classifier = KeywordClassifier::default();
        assert_eq!(
            classifier.classify("Where is a cardiologist?"),
            Intent::LocationSearch
        );
        assert_eq!(
            classifier.classify("FIND ME A CLINIC"),
            Intent::LocationSearch
        );
        for keyword in LOCATION_KEYWORDS {
            assert_eq!(
                classifier.classify(&format!("please {} thanks", keyword)),
                Intent::LocationSearch,
                "keyword {keyword}"
            );
        }
    }

    #[test]
    fn other_text_defaults_to_chat() {
        let classifier = KeywordClassifier::default();
        assert_eq!(
            classifier.classify("What is metformin for?"),
            Intent::MedicalChat
        );
        assert_eq!(classifier.classify(""), Intent::MedicalChat);
    }

    #[test]
    fn drug_question_with_location_keyword_is_location() {
        let classifier = KeywordClassifier::default();
        assert_eq!(
            classifier.classify("Which doctor can explain my aspirin dose?"),
            Intent::LocationSearch
        );
    }

    #[test]
    fn substring_matches_are_accepted() {
        // "findings" contains "find"
        let classifier = KeywordClassifier::default();
        assert_eq!(
            classifier.classify("explain these findings"),
            Intent::LocationSearch
        );
    }

    #[test]
    fn extra_keywords_extend_location_rule() {
        let classifier = KeywordClassifier::default().with_keywords(["Pharmacy"]);
        assert_eq!(
            classifier.classify("Is there a pharmacy open late?"),
            Intent::LocationSearch
        );
        assert_eq!(classifier.rules().len(), 1);
    }

    #[test]
    fn first_rule_wins() {
        let classifier = KeywordClassifier::new(vec![
            KeywordRule::new(Intent::MedicalChat, ["dose"]),
            KeywordRule::new(Intent::LocationSearch, ["where"]),
        ]);
        assert_eq!(
            classifier.classify("where do I check my dose"),
            Intent::MedicalChat
        );
    }
}
