use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::hypotheses::{AnalysisInput, Hypothesis, HypothesisResult};

/// What running one hypothesis produced.
///
/// Serialized untagged: a completed entry is its full metrics record, an
/// errored one is `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HypothesisOutcome {
    Completed(HypothesisResult),
    Errored { error: String },
}

impl HypothesisOutcome {
    pub fn completed(&self) -> Option<&HypothesisResult> {
        match self {
            Self::Completed(result) => Some(result),
            Self::Errored { .. } => None,
        }
    }
}

/// Outcomes keyed by hypothesis id, in catalog order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HypothesisResults {
    entries: Vec<(String, HypothesisOutcome)>,
}

impl HypothesisResults {
    pub fn insert(&mut self, id: impl Into<String>, outcome: HypothesisOutcome) {
        let id = id.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, slot)) => *slot = outcome,
            None => self.entries.push((id, outcome)),
        }
    }

    pub fn get(&self, id: &str) -> Option<&HypothesisOutcome> {
        self.entries.iter().find(|(existing, _)| existing == id).map(|(_, o)| o)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HypothesisOutcome)> {
        self.entries.iter().map(|(id, outcome)| (id.as_str(), outcome))
    }

    pub fn completed(&self) -> impl Iterator<Item = &HypothesisResult> {
        self.entries.iter().filter_map(|(_, outcome)| outcome.completed())
    }

    /// Entries in the catalog, errored ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn completed_count(&self) -> usize {
        self.completed().count()
    }

    pub fn supported_count(&self) -> usize {
        self.completed().filter(|r| r.supported).count()
    }
}

impl Serialize for HypothesisResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, outcome) in &self.entries {
            map.serialize_entry(id, outcome)?;
        }
        map.end()
    }
}

/// Evaluate every hypothesis in order. A failing entry is recorded as errored
/// and never stops the run.
pub fn run_catalog(catalog: &[Box<dyn Hypothesis>], input: &AnalysisInput<'_>) -> HypothesisResults {
    let mut results = HypothesisResults::default();
    for hypothesis in catalog {
        let outcome = match hypothesis.evaluate(input) {
            Ok(result) => {
                tracing::info!(
                    hypothesis = hypothesis.id(),
                    p = result.statistics.p_value(),
                    effect = result.effect.value,
                    verdict = if result.supported { "SUPPORTED" } else { "NOT SUPPORTED" },
                    "Hypothesis evaluated"
                );
                HypothesisOutcome::Completed(result)
            }
            Err(err) => {
                tracing::warn!(hypothesis = hypothesis.id(), error = %err, "Hypothesis errored");
                HypothesisOutcome::Errored {
                    error: err.to_string(),
                }
            }
        };
        results.insert(hypothesis.id(), outcome);
    }
    tracing::info!(
        supported = results.supported_count(),
        completed = results.completed_count(),
        total = results.len(),
        "Catalog finished"
    );
    results
}
