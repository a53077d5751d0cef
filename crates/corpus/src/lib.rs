//! # vectorguard corpus
//!
//! The labeled reference set a similarity index is built from.
//!
//! - [`Label`]: the closed label set (`Legal`, `Illegal`). Unknown codes are
//!   rejected instead of being carried through as free-form integers.
//! - [`VectorRecord`] / [`Corpus`]: append-only store of `(vector, label, text)`
//!   triples. Ids are dense and assigned in insertion order, which is the
//!   order persisted label/text arrays are aligned to.
//! - [`read_jsonl`] / [`load_jsonl`]: ingestion of pre-embedded entries. The
//!   corpus never embeds text itself; vectors arrive from an external encoder.
//!
//! ```
//! use corpus::{Corpus, Label};
//!
//! let mut corpus = Corpus::new();
//! let id = corpus.push(vec![1.0, 0.0], Label::Legal, "SELECT 1").unwrap();
//! assert_eq!(id, 0);
//! assert_eq!(corpus.get(id).unwrap().label(), Label::Legal);
//! ```

mod error;
mod ingest;
mod label;
mod record;

pub use crate::error::CorpusError;
pub use crate::ingest::{load_jsonl, read_jsonl, LabeledVector};
pub use crate::label::Label;
pub use crate::record::{Corpus, RecordId, VectorRecord};
