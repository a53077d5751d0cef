use std::collections::BTreeMap;

use serde::Serialize;

use crate::{CorpusError, Label, LabeledVector};

/// Dense, 0-based record identifier assigned in insertion order.
pub type RecordId = u32;

/// One labeled corpus entry. Immutable once inserted into a [`Corpus`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorRecord {
    id: RecordId,
    vector: Vec<f32>,
    label: Label,
    text: String,
}

impl VectorRecord {
    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    pub fn label(&self) -> Label {
        self.label
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

/// Ordered, append-only collection of [`VectorRecord`]s.
///
/// Record ids are positions: the `n`-th pushed record gets id `n`. Persisted
/// label and text arrays rely on this alignment, so there is no removal or
/// reordering API.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    records: Vec<VectorRecord>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
        }
    }

    /// Append a record and return the id assigned to it.
    ///
    /// Dimensions are not checked here; the similarity index validates them
    /// when it is built.
    pub fn push(
        &mut self,
        vector: Vec<f32>,
        label: Label,
        text: impl Into<String>,
    ) -> Result<RecordId, CorpusError> {
        let id = RecordId::try_from(self.records.len())
            .map_err(|_| CorpusError::Capacity(self.records.len()))?;
        self.records.push(VectorRecord {
            id,
            vector,
            label,
            text: text.into(),
        });
        Ok(id)
    }

    /// Build a corpus from ingested entries, preserving their order.
    pub fn from_entries<I>(entries: I) -> Result<Self, CorpusError>
    where
        I: IntoIterator<Item = LabeledVector>,
    {
        let entries = entries.into_iter();
        let mut corpus = Self::with_capacity(entries.size_hint().0);
        for entry in entries {
            corpus.push(entry.vector, entry.label, entry.text)?;
        }
        Ok(corpus)
    }

    pub fn get(&self, id: RecordId) -> Option<&VectorRecord> {
        self.records.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VectorRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[VectorRecord] {
        &self.records
    }

    /// Dimension of the first record, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.records.first().map(VectorRecord::dimension)
    }

    /// Number of records per label. Every known label is present, even at zero.
    pub fn label_counts(&self) -> BTreeMap<Label, usize> {
        let mut counts: BTreeMap<Label, usize> = Label::ALL.iter().map(|&l| (l, 0)).collect();
        for record in &self.records {
            *counts.entry(record.label).or_insert(0) += 1;
        }
        counts
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a VectorRecord;
    type IntoIter = std::slice::Iter<'a, VectorRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
