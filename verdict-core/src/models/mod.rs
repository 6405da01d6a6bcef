pub mod feedback;
pub mod review;

pub use feedback::{AnalysisReport, FeedbackRequest, StructuredFeedback};
pub use review::{ReviewDraft, ReviewPatch, ReviewRecord, ReviewStats, TIMESTAMP_FORMAT};
