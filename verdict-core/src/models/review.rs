use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Timestamp layout used for stored reviews.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A persisted review row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: Uuid,
    pub timestamp: String,
    pub rating: u8,
    pub review: String,
    pub ai_response: String,
}

/// Payload for adding a review. `timestamp` defaults to now.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewDraft {
    pub rating: u8,
    #[serde(default)]
    pub review: String,
    #[serde(default)]
    pub ai_response: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewPatch {
    pub rating: Option<u8>,
    pub review: Option<String>,
    pub ai_response: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewStats {
    pub total: usize,
    pub average_rating: Option<f64>,
    pub latest_submission: Option<String>,
}

pub fn now_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

impl ReviewRecord {
    pub fn from_draft(draft: ReviewDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: draft.timestamp.unwrap_or_else(now_timestamp),
            rating: draft.rating,
            review: draft.review,
            ai_response: draft.ai_response,
        }
    }

    pub fn apply(&mut self, patch: ReviewPatch) {
        if let Some(rating) = patch.rating {
            self.rating = rating;
        }
        if let Some(review) = patch.review {
            self.review = review;
        }
        if let Some(ai_response) = patch.ai_response {
            self.ai_response = ai_response;
        }
    }
}

impl ReviewStats {
    pub fn from_records(records: &[ReviewRecord]) -> Self {
        let total = records.len();
        let average_rating = if total == 0 {
            None
        } else {
            let sum: u32 = records.iter().map(|r| u32::from(r.rating)).sum();
            Some(f64::from(sum) / total as f64)
        };
        // Rows whose timestamp does not parse never count as latest.
        let latest_submission = records
            .iter()
            .filter_map(|r| {
                NaiveDateTime::parse_from_str(&r.timestamp, TIMESTAMP_FORMAT)
                    .ok()
                    .map(|t| (t, &r.timestamp))
            })
            .max_by_key(|(t, _)| *t)
            .map(|(_, ts)| ts.clone());

        Self {
            total,
            average_rating,
            latest_submission,
        }
    }
}
