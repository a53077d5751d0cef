//! Snapshot persistence for a built index and its corpus.
//!
//! ## File layout
//!
//! | Bytes | Content |
//! |-------|---------|
//! | 0..4  | magic `VGIX` |
//! | 4..6  | snapshot version, little endian |
//! | 6     | codec tag (`0` = none, `1` = zstd) |
//! | 7..   | bincode-encoded snapshot, compressed with the tagged codec |
//!
//! The snapshot holds the normalized matrix (row-major), the label codes and
//! the source texts. All three are positionally aligned by record id, and
//! [`load`] refuses any file where their lengths disagree instead of
//! truncating to the shortest.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use corpus::{Corpus, Label};
use serde::{Deserialize, Serialize};
use zstd::encode_all;
use zstd::stream::Decoder;

use crate::normalize::l2_norm;
use crate::{IndexConfig, IndexError, SimilarityIndex};

/// Bump this value whenever the snapshot layout changes.
pub const SNAPSHOT_VERSION: u16 = 1;

const MAGIC: &[u8; 4] = b"VGIX";
const HEADER_LEN: usize = 7;
/// Stored rows must be unit-norm within this tolerance.
const UNIT_NORM_TOLERANCE: f32 = 1e-3;
/// Upper bound on the decompressed payload of a snapshot (8 GiB).
const MAX_DECODED_BYTES: u64 = 8 << 30;

/// Compression codec options for snapshots.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionCodec {
    /// No compression (useful for debugging).
    None,
    /// Zstd compression (default, good balance of speed and ratio).
    #[default]
    Zstd,
}

impl CompressionCodec {
    fn tag(self) -> u8 {
        match self {
            CompressionCodec::None => 0,
            CompressionCodec::Zstd => 1,
        }
    }

    fn from_tag(tag: u8) -> Result<Self, IndexError> {
        match tag {
            0 => Ok(CompressionCodec::None),
            1 => Ok(CompressionCodec::Zstd),
            other => Err(IndexError::CorruptIndex(format!(
                "unknown codec tag {other}"
            ))),
        }
    }
}

/// Compression behavior configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct CompressionConfig {
    /// The compression codec to use (None or Zstd).
    pub codec: CompressionCodec,
    /// Compression level (1-22 for Zstd, where higher = better compression but slower).
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            codec: CompressionCodec::default(),
            level: 3,
        }
    }
}

impl CompressionConfig {
    pub fn new(codec: CompressionCodec, level: i32) -> Self {
        Self { codec, level }
    }

    pub fn with_codec(mut self, codec: CompressionCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, IndexError> {
        match self.codec {
            CompressionCodec::None => Ok(data.to_vec()),
            CompressionCodec::Zstd => {
                encode_all(data, self.level).map_err(|e| IndexError::Compression(e.to_string()))
            }
        }
    }
}

fn decompress(codec: CompressionCodec, data: &[u8], limit: u64) -> Result<Vec<u8>, IndexError> {
    match codec {
        CompressionCodec::None => Ok(data.to_vec()),
        CompressionCodec::Zstd => {
            let decoder = Decoder::new(data).map_err(IndexError::corrupt)?;
            let mut out = Vec::new();
            decoder
                .take(limit.saturating_add(1))
                .read_to_end(&mut out)
                .map_err(IndexError::corrupt)?;
            if out.len() as u64 > limit {
                return Err(IndexError::CorruptIndex(format!(
                    "decompressed snapshot exceeds {limit} bytes"
                )));
            }
            Ok(out)
        }
    }
}

#[derive(Serialize, Deserialize)]
struct IndexSnapshot {
    dimension: u32,
    count: u64,
    vectors: Vec<f32>,
    labels: Vec<u8>,
    texts: Vec<String>,
}

impl IndexSnapshot {
    fn capture(index: &SimilarityIndex, corpus: &Corpus) -> Result<Self, IndexError> {
        if corpus.len() != index.len() {
            return Err(IndexError::Misaligned {
                records: corpus.len(),
                rows: index.len(),
            });
        }
        let dimension = u32::try_from(index.dimension())
            .map_err(|_| IndexError::Encode("dimension does not fit in u32".into()))?;

        Ok(Self {
            dimension,
            count: index.len() as u64,
            vectors: index.matrix().iter().copied().collect(),
            labels: corpus.iter().map(|r| r.label().code()).collect(),
            texts: corpus.iter().map(|r| r.text().to_string()).collect(),
        })
    }

    fn verify(&self) -> Result<(usize, usize), IndexError> {
        let dimension = self.dimension as usize;
        let count = usize::try_from(self.count).map_err(IndexError::corrupt)?;

        if dimension == 0 || count == 0 {
            return Err(IndexError::CorruptIndex(format!(
                "snapshot declares {count} rows of dimension {dimension}"
            )));
        }
        let expected = count.checked_mul(dimension).ok_or_else(|| {
            IndexError::CorruptIndex("declared matrix size overflows".into())
        })?;
        if self.vectors.len() != expected {
            return Err(IndexError::CorruptIndex(format!(
                "expected {expected} vector values for {count} rows, found {}",
                self.vectors.len()
            )));
        }
        if self.labels.len() != count {
            return Err(IndexError::CorruptIndex(format!(
                "{count} rows but {} labels",
                self.labels.len()
            )));
        }
        if self.texts.len() != count {
            return Err(IndexError::CorruptIndex(format!(
                "{count} rows but {} texts",
                self.texts.len()
            )));
        }
        for (id, row) in self.vectors.chunks_exact(dimension).enumerate() {
            let norm = l2_norm(row);
            if !norm.is_finite() || (norm - 1.0).abs() > UNIT_NORM_TOLERANCE {
                return Err(IndexError::CorruptIndex(format!(
                    "row {id} has norm {norm}, expected a unit vector"
                )));
            }
        }
        Ok((count, dimension))
    }
}

/// Encode `index` and the labels/texts of `corpus` into snapshot bytes.
///
/// `corpus` must be the corpus the index was built from.
pub fn to_bytes(
    index: &SimilarityIndex,
    corpus: &Corpus,
    compression: &CompressionConfig,
) -> Result<Vec<u8>, IndexError> {
    let snapshot = IndexSnapshot::capture(index, corpus)?;
    let encoded = encode_to_vec(&snapshot, standard()).map_err(|e| IndexError::Encode(e.to_string()))?;
    let payload = compression.compress(&encoded)?;

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
    out.push(compression.codec.tag());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decode snapshot bytes into an index (built with `cfg`) and its corpus.
///
/// The restored corpus carries the normalized vectors as record vectors.
pub fn from_bytes(bytes: &[u8], cfg: &IndexConfig) -> Result<(SimilarityIndex, Corpus), IndexError> {
    if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
        return Err(IndexError::CorruptIndex("missing snapshot header".into()));
    }
    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != SNAPSHOT_VERSION {
        return Err(IndexError::CorruptIndex(format!(
            "unsupported snapshot version {version}"
        )));
    }
    let codec = CompressionCodec::from_tag(bytes[6])?;
    let payload = decompress(codec, &bytes[HEADER_LEN..], MAX_DECODED_BYTES)?;

    let (snapshot, consumed): (IndexSnapshot, usize) =
        decode_from_slice(&payload, standard()).map_err(IndexError::corrupt)?;
    if consumed != payload.len() {
        return Err(IndexError::CorruptIndex(format!(
            "{} trailing bytes after snapshot",
            payload.len() - consumed
        )));
    }
    let (count, dimension) = snapshot.verify()?;

    let IndexSnapshot {
        vectors,
        labels,
        texts,
        ..
    } = snapshot;

    let mut corpus = Corpus::with_capacity(count);
    for ((row, code), text) in vectors.chunks_exact(dimension).zip(labels).zip(texts) {
        let label = Label::from_code(code).map_err(IndexError::corrupt)?;
        corpus.push(row.to_vec(), label, text).map_err(IndexError::corrupt)?;
    }

    let index = SimilarityIndex::from_unit_rows(dimension, vectors, cfg.clone())?;
    Ok((index, corpus))
}

/// Write a snapshot of `index` and `corpus` to `path`.
///
/// The bytes go to a sibling temporary file first and are renamed into place,
/// so readers never observe a half-written snapshot.
pub fn save<P: AsRef<Path>>(
    index: &SimilarityIndex,
    corpus: &Corpus,
    path: P,
) -> Result<(), IndexError> {
    let path = path.as_ref();
    let start = Instant::now();
    let bytes = to_bytes(index, corpus, &index.config().compression)?;

    write_atomically(path, &bytes)?;

    log::info!(
        "saved index snapshot to {}: {} rows, {} bytes in {:?}",
        path.display(),
        index.len(),
        bytes.len(),
        start.elapsed()
    );
    Ok(())
}

/// Read a snapshot written by [`save`].
pub fn load<P: AsRef<Path>>(
    path: P,
    cfg: &IndexConfig,
) -> Result<(SimilarityIndex, Corpus), IndexError> {
    let path = path.as_ref();
    let start = Instant::now();
    let bytes = fs::read(path)?;
    let loaded = from_bytes(&bytes, cfg)?;

    log::info!(
        "loaded index snapshot from {}: {} rows of dimension {} in {:?}",
        path.display(),
        loaded.0.len(),
        loaded.0.dimension(),
        start.elapsed()
    );
    Ok(loaded)
}

/// Write `bytes` to a sibling temp file and rename it over `path`. The temp
/// file is removed whenever either step fails.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), IndexError> {
    let tmp = tmp_path(path);
    if let Err(e) = fs::write(&tmp, bytes).and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
