pub mod config;
pub mod error;
pub mod feedback;
pub mod interpret;
pub mod llm;
pub mod models;
pub mod prompt;
pub mod sections;
pub mod store;

pub use config::VerdictConfig;
pub use error::VerdictError;
pub use feedback::{analyze_reviews, generate_feedback, generate_reply, FeedbackError};
pub use interpret::{extract_json_object, normalize, parse_and_normalize, InterpretError};
pub use llm::{
    create_backend, completion_text, HuggingFaceClient, HuggingFaceConfig, LlmError,
    ModelBackend, ScriptedBackend,
};
pub use models::{
    AnalysisReport, FeedbackRequest, ReviewDraft, ReviewPatch, ReviewRecord, ReviewStats,
    StructuredFeedback,
};
pub use prompt::build_prompt;
pub use sections::parse_sections;
pub use store::{ReviewStore, StoreError};
