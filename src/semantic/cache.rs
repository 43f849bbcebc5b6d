//! Approximate-match cache of past searches.
//!
//! File format: UTF-8 JSONL, one `CacheRecord` per line:
//!
//! ```text
//! {"query":"제주 자연","embedding":[0.01,...],"cards":[{...}]}
//! ```
//!
//! Lines that fail to parse are skipped on read. Writes are a full rewrite:
//! all records are read, the new one appended, the oldest dropped beyond
//! `max_items`, and the result written to a temp file renamed over the store
//! while holding an exclusive lock on `<store>.lock`.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::card::Card;
use crate::lock::{lock_path_for, FileLock};
use crate::semantic::cosine_similarity;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to replace store: {0}")]
    Persist(#[from] tempfile::PersistError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub query: String,
    pub embedding: Vec<f32>,
    pub cards: Vec<Card>,
}

/// A stored record and its similarity to the probe vector.
#[derive(Debug, Clone)]
pub struct CacheHit {
    pub similarity: f32,
    pub record: CacheRecord,
}

pub struct SimilarityCache {
    path: PathBuf,
    max_items: usize,
}

impl SimilarityCache {
    /// Opens the store at `path`, creating it (and its directory) empty if absent.
    pub fn open(path: PathBuf, max_items: usize) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        if !path.exists() {
            File::create(&path)?;
        }
        Ok(Self { path, max_items })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records ranked by descending cosine similarity to `vector`; equal scores
    /// keep storage order.
    pub fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<CacheHit>, CacheError> {
        let mut hits: Vec<CacheHit> = self
            .read_all()?
            .into_iter()
            // vectors from another embedding model are not comparable
            .filter(|record| record.embedding.len() == vector.len())
            .map(|record| CacheHit {
                similarity: cosine_similarity(vector, &record.embedding),
                record,
            })
            .collect();

        // stable sort: ties stay in storage order
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);

        Ok(hits)
    }

    /// Appends a record and rewrites the store, keeping the newest `max_items`.
    pub fn add(&self, query: &str, embedding: &[f32], cards: &[Card]) -> Result<(), CacheError> {
        let _lock = FileLock::acquire_blocking(&lock_path_for(&self.path))?;

        let mut records = self.read_all()?;
        records.push(CacheRecord {
            query: query.to_string(),
            embedding: embedding.to_vec(),
            cards: cards.to_vec(),
        });

        if records.len() > self.max_items {
            let excess = records.len() - self.max_items;
            records.drain(..excess);
            log::debug!("cache evicted {excess} oldest record(s)");
        }

        self.rewrite(&records)
    }

    pub fn len(&self) -> Result<usize, CacheError> {
        Ok(self.read_all()?.len())
    }

    /// Truncates the store to empty. Fails fast if a writer holds the lock.
    pub fn clear(&self) -> Result<(), CacheError> {
        let _lock = FileLock::try_acquire(&lock_path_for(&self.path))?;
        self.rewrite(&[])
    }

    fn read_all(&self) -> Result<Vec<CacheRecord>, CacheError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<CacheRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => log::debug!("cache skipping malformed line {}: {e}", lineno + 1),
            }
        }

        Ok(records)
    }

    fn rewrite(&self, records: &[CacheRecord]) -> Result<(), CacheError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        let temp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            for record in records {
                serde_json::to_writer(&mut writer, record)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path)?;

        Ok(())
    }
}
