use serde::{Deserialize, Serialize};

/// One customer submission: a star rating and an optional free-text review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub rating: u8,
    #[serde(default)]
    pub review: String,
}

impl FeedbackRequest {
    pub fn new(rating: u8, review: impl Into<String>) -> Self {
        Self {
            rating,
            review: review.into(),
        }
    }
}

/// Normalized strict-mode output. Every field is always populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredFeedback {
    pub user_response: String,
    pub summary: String,
    pub actions: Vec<String>,
}

/// Section-mode output: two free-text blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub summary: String,
    pub actions: String,
}
