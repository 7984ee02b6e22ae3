/// Appended to every generated answer.
pub const DISCLAIMER: &str = "\n\n---\n*Disclaimer: I am an AI assistant, not a doctor. This information is for educational purposes only. Always verify with a certified medical professional.*";

const DEFAULT_INTERACTIONS: &[(&str, &[&str])] = &[
    ("aspirin", &["warfarin", "ibuprofen", "blood thinners"]),
    ("amoxicillin", &["methotrexate", "birth control"]),
    ("metformin", &["alcohol", "contrast dye"]),
    ("ibuprofen", &["aspirin", "naproxen"]),
];

/// Static drug → interacting substances table. Not a clinical source.
///
/// Names are stored lowercase and iterated in insertion order.
#[derive(Debug, Clone)]
pub struct InteractionTable {
    entries: Vec<(String, Vec<String>)>,
}

impl InteractionTable {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn with_entry<I, S>(mut self, drug: &str, interactants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.entries.push((
            drug.to_lowercase(),
            interactants
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
        ));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(drug, others)| (drug.as_str(), others.as_slice()))
    }
}

impl Default for InteractionTable {
    fn default() -> Self {
        DEFAULT_INTERACTIONS
            .iter()
            .fold(Self::new(), |table, (drug, others)| {
                table.with_entry(drug, others.iter())
            })
    }
}

/// Adds interaction warnings and the disclaimer to a generated answer.
#[derive(Debug, Clone, Default)]
pub struct SafetyAnnotator {
    table: InteractionTable,
}

impl SafetyAnnotator {
    pub fn new(table: InteractionTable) -> Self {
        Self { table }
    }

    /// One line per (drug, interactant) pair found in `source_text`, in table
    /// order. Not deduplicated.
    pub fn warnings(&self, source_text: &str) -> Vec<String> {
        let lowered = source_text.to_lowercase();
        let mut warnings = Vec::new();

        for (drug, others) in self.table.iter() {
            if !lowered.contains(drug) {
                continue;
            }
            for other in others {
                if lowered.contains(other.as_str()) {
                    warnings.push(format!(
                        "**INTERACTION WARNING:** {} may interact with {}.",
                        title_case(drug),
                        title_case(other)
                    ));
                }
            }
        }

        warnings
    }

    pub fn annotate(&self, source_text: &str, candidate_answer: &str) -> String {
        let warnings = self.warnings(source_text);
        let body = format!("{}{}", candidate_answer, DISCLAIMER);

        if warnings.is_empty() {
            body
        } else {
            tracing::info!(count = warnings.len(), "Prepending interaction warnings");
            format!("{}\n\n{}", warnings.join("\n"), body)
        }
    }
}

/// Capitalises the first letter of every alphabetic run.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}
