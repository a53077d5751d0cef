//! `vectorguard` command line interface.
//!
//! Results are written to stdout as JSON; diagnostics go to stderr.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use vectorguard::{
    LegalityClassifier, QueryResult, StubEmbedder, VectorGuardConfig, build_classifier, evaluate,
    load_jsonl, logging, open_classifier,
};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "vectorguard")]
#[command(about = "Classify SQL and script payloads by embedding similarity to a labeled corpus")]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build an index from a JSON-lines corpus and save it
    Build {
        /// Corpus file, one `{"text", "label", "vector"}` object per line
        #[arg(long, value_name = "PATH")]
        corpus: PathBuf,
        /// Destination snapshot file
        #[arg(short, long, value_name = "PATH")]
        output: PathBuf,
    },
    /// Classify queries against a saved index
    Classify {
        #[arg(short, long, value_name = "PATH")]
        index: PathBuf,
        /// Neighbors to consult (defaults to classifier.k)
        #[arg(short)]
        k: Option<usize>,
        /// A single comma-separated query vector
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, conflicts_with_all = ["queries", "text"])]
        vector: Option<Vec<f32>>,
        /// JSON-lines file of `{"vector": [...], "text": "..."}` queries
        #[arg(long, value_name = "PATH", conflicts_with = "text")]
        queries: Option<PathBuf>,
        /// Raw text to embed; requires --stub-embedder
        #[arg(long, requires = "stub_embedder")]
        text: Option<String>,
        /// Embed --text with the built-in token-hashing encoder. Its vectors
        /// only match corpora embedded the same way; verdicts are for demos.
        #[arg(long, requires = "text")]
        stub_embedder: bool,
    },
    /// Measure accuracy on a labeled JSON-lines query set
    Evaluate {
        #[arg(short, long, value_name = "PATH")]
        index: PathBuf,
        #[arg(long, value_name = "PATH")]
        queries: PathBuf,
        #[arg(short)]
        k: Option<usize>,
    },
    /// Print size and label distribution of a saved index
    Inspect {
        #[arg(short, long, value_name = "PATH")]
        index: PathBuf,
    },
}

/// One line of a `classify --queries` file.
#[derive(Deserialize)]
struct QueryLine {
    #[serde(default, alias = "Sentence", alias = "Payload", alias = "payload", alias = "query")]
    text: Option<String>,
    #[serde(alias = "embedding")]
    vector: Vec<f32>,
}

#[derive(Serialize)]
struct Failure {
    position: usize,
    error: String,
}

/// A verdict produced from text embedded by [`StubEmbedder`].
#[derive(Serialize)]
struct StubVerdict {
    embedder: &'static str,
    warning: &'static str,
    #[serde(flatten)]
    result: QueryResult,
}

impl StubVerdict {
    fn new(result: QueryResult) -> Self {
        Self {
            embedder: STUB_EMBEDDER_NAME,
            warning: "query embedded with the token-hashing stub; verdict is not \
                      meaningful for corpora built with another encoder",
            result,
        }
    }
}

const STUB_EMBEDDER_NAME: &str = "stub";

#[derive(Serialize)]
struct IndexSummary {
    records: usize,
    dimension: usize,
    strategy: vectorguard::SearchStrategy,
    approximate: bool,
    labels: BTreeMap<&'static str, usize>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => VectorGuardConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => VectorGuardConfig::default(),
    };
    logging::init(&cfg.logging).map_err(|e| anyhow::anyhow!(e))?;

    match cli.command {
        Command::Build { corpus, output } => run_build(&cfg, &corpus, &output),
        Command::Classify {
            index,
            k,
            vector,
            queries,
            text,
            stub_embedder: _,
        } => {
            let classifier = open_classifier(&index, &cfg)?;
            let k = k.unwrap_or(cfg.classifier.k);
            match (vector, queries, text) {
                (Some(vector), None, None) => classify_vector(&classifier, &vector, k),
                (None, Some(path), None) => classify_file(&classifier, &path, k),
                (None, None, Some(text)) => classify_text(&classifier, &text, k),
                _ => bail!("pass exactly one of --vector, --queries or --text"),
            }
        }
        Command::Evaluate { index, queries, k } => {
            run_evaluate(&cfg, &index, &queries, k.unwrap_or(cfg.classifier.k))
        }
        Command::Inspect { index } => run_inspect(&cfg, &index),
    }
}

#[tracing::instrument(skip(cfg))]
fn run_build(cfg: &VectorGuardConfig, corpus: &Path, output: &Path) -> anyhow::Result<()> {
    let classifier = build_classifier(corpus, cfg)?;
    classifier
        .save(output)
        .with_context(|| format!("saving index to {}", output.display()))?;
    print_json(&summarize(&classifier))
}

#[tracing::instrument(skip(classifier, vector), fields(dimension = vector.len()))]
fn classify_vector(classifier: &LegalityClassifier, vector: &[f32], k: usize) -> anyhow::Result<()> {
    let result = classifier.classify(vector, k)?;
    print_json(&result)
}

#[tracing::instrument(skip(classifier))]
fn classify_text(classifier: &LegalityClassifier, text: &str, k: usize) -> anyhow::Result<()> {
    let embedder = StubEmbedder::new(classifier.index().dimension());
    let result = classifier.classify_text(&embedder, text, k)?;
    tracing::warn!(embedder = STUB_EMBEDDER_NAME, "verdict produced by the stub embedder");
    print_json(&StubVerdict::new(result))
}

#[tracing::instrument(skip(classifier))]
fn classify_file(classifier: &LegalityClassifier, path: &Path, k: usize) -> anyhow::Result<()> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut lines = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let query: QueryLine = serde_json::from_str(&line)
            .with_context(|| format!("{}: line {}", path.display(), idx + 1))?;
        lines.push(query);
    }

    let vectors: Vec<&[f32]> = lines.iter().map(|q| q.vector.as_slice()).collect();
    let results = classifier.classify_batch(&vectors, k);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (position, (query, result)) in lines.into_iter().zip(results).enumerate() {
        match result {
            Ok(mut result) => {
                result.query_text = query.text;
                serde_json::to_writer(&mut out, &result)?;
            }
            Err(e) => {
                let failure = Failure {
                    position,
                    error: e.to_string(),
                };
                serde_json::to_writer(&mut out, &failure)?;
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

#[tracing::instrument(skip(cfg))]
fn run_evaluate(cfg: &VectorGuardConfig, index: &Path, queries: &Path, k: usize) -> anyhow::Result<()> {
    let classifier = open_classifier(index, cfg)?;
    let queries = load_jsonl(queries)?;
    let evaluation = evaluate(&classifier, &queries, k)?;
    print_json(&evaluation)
}

#[tracing::instrument(skip(cfg))]
fn run_inspect(cfg: &VectorGuardConfig, index: &Path) -> anyhow::Result<()> {
    let classifier = open_classifier(index, cfg)?;
    print_json(&summarize(&classifier))
}

fn summarize(classifier: &LegalityClassifier) -> IndexSummary {
    IndexSummary {
        records: classifier.corpus().len(),
        dimension: classifier.index().dimension(),
        strategy: classifier.index().strategy(),
        approximate: classifier.index().is_approximate(),
        labels: classifier
            .corpus()
            .label_counts()
            .into_iter()
            .map(|(label, count)| (label.as_str(), count))
            .collect(),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}
