use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{CorpusError, Label};

/// A pre-embedded, labeled text as produced by the upstream encoder.
///
/// One JSON object per line:
///
/// ```json
/// {"text": "SELECT 1", "label": 0, "vector": [0.12, -0.03, 0.88]}
/// ```
///
/// The dataset column names `Sentence`, `Payload` and `Label` are accepted as
/// aliases, and labels may be codes or names (`"benign"`, `"malicious"`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledVector {
    #[serde(alias = "Sentence", alias = "Payload", alias = "payload", alias = "query")]
    pub text: String,
    #[serde(alias = "Label")]
    pub label: Label,
    #[serde(alias = "embedding")]
    pub vector: Vec<f32>,
}

/// Read JSON-lines entries from any buffered reader. Blank lines are skipped.
pub fn read_jsonl<R: BufRead>(reader: R) -> Result<Vec<LabeledVector>, CorpusError> {
    let mut entries = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let entry: LabeledVector =
            serde_json::from_str(trimmed).map_err(|e| CorpusError::Parse {
                line: line_no,
                message: e.to_string(),
            })?;
        if entry.text.trim().is_empty() {
            return Err(CorpusError::EmptyText { line: line_no });
        }
        entries.push(entry);
    }
    Ok(entries)
}

/// Read a JSON-lines file from disk.
pub fn load_jsonl<P: AsRef<Path>>(path: P) -> Result<Vec<LabeledVector>, CorpusError> {
    let path = path.as_ref();
    let start = Instant::now();
    debug!(path = %path.display(), "reading labeled vectors");

    let file = File::open(path)?;
    let entries = read_jsonl(BufReader::new(file))?;

    info!(
        path = %path.display(),
        entries = entries.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "labeled vectors loaded"
    );
    Ok(entries)
}
