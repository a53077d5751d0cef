use std::io;
use thiserror::Error;

/// Errors raised while assembling or ingesting a corpus.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// A label code or name outside the closed [`Label`](crate::Label) set.
    #[error("unknown label: {0}")]
    UnknownLabel(String),
    /// A JSON-lines entry could not be decoded.
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    /// The source text of an entry is empty after trimming.
    #[error("line {line}: entry text is empty")]
    EmptyText { line: usize },
    /// The corpus has reached the maximum number of addressable records.
    #[error("corpus is full ({0} records)")]
    Capacity(usize),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_mentions_line() {
        let err = CorpusError::Parse {
            line: 12,
            message: "missing field `vector`".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("line 12"));
        assert!(msg.contains("vector"));
    }

    #[test]
    fn io_error_converts() {
        let err: CorpusError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(err.to_string().starts_with("io error"));
    }
}
