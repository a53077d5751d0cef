use std::collections::BTreeMap;

use corpus::{Label, RecordId};
use index::IndexError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::embed::EmbedError;

/// Verdict used when two or more labels accumulate exactly the same score.
///
/// This is a security policy, not a numerical detail: `FavorLegal` avoids
/// flagging legitimate input on a coin flip, `FavorIllegal` fails closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TiePolicy {
    /// The lower-risk label wins exact ties.
    #[default]
    FavorLegal,
    /// The malicious label wins exact ties (strict `legal > illegal` check).
    FavorIllegal,
}

impl TiePolicy {
    /// Pick the winner among labels that share the top score.
    ///
    /// `tied` is non-empty and ordered by label code.
    pub(crate) fn pick(self, tied: &[Label]) -> Label {
        let preferred = match self {
            TiePolicy::FavorLegal => tied.iter().find(|l| !l.is_malicious()),
            TiePolicy::FavorIllegal => tied.iter().find(|l| l.is_malicious()),
        };
        preferred.or(tied.first()).copied().unwrap_or(Label::Legal)
    }
}

/// Classifier configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Neighbors consulted per query when the caller does not pass `k`.
    pub k: usize,
    pub tie_policy: TiePolicy,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            k: 2,
            tie_policy: TiePolicy::default(),
        }
    }
}

impl ClassifierConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_tie_policy(mut self, tie_policy: TiePolicy) -> Self {
        self.tie_policy = tie_policy;
        self
    }

    pub fn validate(&self) -> Result<(), ClassifyError> {
        if self.k == 0 {
            return Err(ClassifyError::InvalidConfig(
                "k must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Accumulated similarity per label.
///
/// Always holds an entry for every label in [`Label::ALL`], including labels
/// that never appeared among the neighbors.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelScores(BTreeMap<Label, f32>);

impl Default for LabelScores {
    fn default() -> Self {
        Self(Label::ALL.iter().map(|&label| (label, 0.0)).collect())
    }
}

impl LabelScores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, label: Label, score: f32) {
        *self.0.entry(label).or_insert(0.0) += score;
    }

    pub fn get(&self, label: Label) -> f32 {
        self.0.get(&label).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Label, f32)> + '_ {
        self.0.iter().map(|(&label, &score)| (label, score))
    }

    /// Labels whose score equals the maximum, in code order.
    pub fn leaders(&self) -> Vec<Label> {
        let best = self.0.values().copied().fold(f32::NEG_INFINITY, f32::max);
        self.iter()
            .filter(|&(_, score)| score == best)
            .map(|(label, _)| label)
            .collect()
    }

    /// Strictly greatest label, or the tie policy's choice among the leaders.
    pub fn verdict(&self, policy: TiePolicy) -> Label {
        match self.leaders().as_slice() {
            [single] => *single,
            tied => policy.pick(tied),
        }
    }
}

impl Serialize for LabelScores {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, score) in &self.0 {
            map.serialize_entry(label.as_str(), score)?;
        }
        map.end()
    }
}

/// One neighbor as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchDetail {
    pub record_id: RecordId,
    pub label: Label,
    /// Cosine similarity between the query and the record.
    pub score: f32,
    /// Source text of the matched record.
    pub text: String,
}

/// Outcome of a single classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Raw query text, when the caller supplied it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_text: Option<String>,
    /// Number of neighbors requested.
    pub k: usize,
    pub verdict: Label,
    pub scores: LabelScores,
    /// Neighbors in search order (score descending, then record id).
    pub matches: Vec<MatchDetail>,
}

/// Errors produced by the classification layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifyError {
    #[error("invalid classifier config: {0}")]
    InvalidConfig(String),
    /// Normalization, search, or load failure, passed through unchanged.
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbedError),
}
