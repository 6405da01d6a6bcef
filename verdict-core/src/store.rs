//! Flat-file review log.
//!
//! Reviews live in one CSV file (`id,timestamp,rating,review,ai_response`).
//! Every mutation rewrites the whole file through `<path>.tmp` and a rename,
//! so readers never see a half-written log. The store does no locking of its
//! own: callers sharing one file must serialize writers.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ReviewDraft, ReviewPatch, ReviewRecord, ReviewStats, TIMESTAMP_FORMAT};

const HEADER: [&str; 5] = ["id", "timestamp", "rating", "review", "ai_response"];

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Review not found: {0}")]
    NotFound(Uuid),

    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    #[error("Timestamp must look like 2026-01-31 18:05:00, got {0:?}")]
    InvalidTimestamp(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub fn validate_rating(rating: u8) -> Result<(), StoreError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(StoreError::InvalidRating(rating))
    }
}

/// Parse a caller-supplied timestamp and return it in the stored layout.
pub fn validate_timestamp(timestamp: &str) -> Result<String, StoreError> {
    NaiveDateTime::parse_from_str(timestamp.trim(), TIMESTAMP_FORMAT)
        .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
        .map_err(|_| StoreError::InvalidTimestamp(timestamp.to_string()))
}

#[derive(Debug, Clone)]
pub struct ReviewStore {
    path: PathBuf,
}

impl ReviewStore {
    /// Open a store at `path`. `~` and `$VARS` are expanded; the file itself
    /// is created lazily on first write.
    pub fn open(path: &str) -> Self {
        let expanded = shellexpand::full(path)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| path.to_string());
        Self {
            path: PathBuf::from(expanded),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All reviews in insertion order. A missing file is an empty log.
    pub fn list(&self) -> Result<Vec<ReviewRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut rdr = csv::Reader::from_path(&self.path)?;
        let mut records = Vec::new();
        for row in rdr.deserialize() {
            records.push(row?);
        }
        Ok(records)
    }

    pub fn get(&self, id: Uuid) -> Result<ReviewRecord, StoreError> {
        self.list()?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    pub fn add(&self, mut draft: ReviewDraft) -> Result<ReviewRecord, StoreError> {
        validate_rating(draft.rating)?;
        if let Some(ts) = draft.timestamp.take() {
            draft.timestamp = Some(validate_timestamp(&ts)?);
        }

        let mut records = self.list()?;
        let record = ReviewRecord::from_draft(draft);
        records.push(record.clone());
        self.write_all(&records)?;

        tracing::info!(id = %record.id, rating = record.rating, "Review stored");
        Ok(record)
    }

    pub fn update(&self, id: Uuid, patch: ReviewPatch) -> Result<ReviewRecord, StoreError> {
        if let Some(rating) = patch.rating {
            validate_rating(rating)?;
        }

        let mut records = self.list()?;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        record.apply(patch);
        let updated = record.clone();
        self.write_all(&records)?;

        tracing::info!(id = %id, "Review updated");
        Ok(updated)
    }

    pub fn delete(&self, id: Uuid) -> Result<ReviewRecord, StoreError> {
        let mut records = self.list()?;
        let idx = records
            .iter()
            .position(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        let removed = records.remove(idx);
        self.write_all(&records)?;

        tracing::info!(id = %id, "Review deleted");
        Ok(removed)
    }

    pub fn stats(&self) -> Result<ReviewStats, StoreError> {
        Ok(ReviewStats::from_records(&self.list()?))
    }

    fn write_all(&self, records: &[ReviewRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        {
            let mut wtr = csv::WriterBuilder::new()
                .has_headers(false)
                .from_path(&tmp)?;
            wtr.write_record(HEADER)?;
            for record in records {
                wtr.serialize(record)?;
            }
            wtr.flush()?;
        }

        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
