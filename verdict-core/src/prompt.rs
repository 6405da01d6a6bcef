//! Prompt templates sent to the hosted model.
//!
//! All builders are pure. Review text is embedded literally: it is neither
//! escaped nor truncated, so the interpreters must cope with reviews that
//! contain braces or quotes of their own.

use crate::models::ReviewRecord;

/// Number of most recent reviews included in an aggregate analysis prompt.
pub const ANALYSIS_WINDOW: usize = 20;

const FEEDBACK_TEMPLATE_HEAD: &str = r#"You are an AI assistant helping a business understand customer feedback.

You will receive:
- A star rating (1 to 5)
- A short free-text review

Your tasks:
1. Write a short, warm, user-facing reply directly to the customer.
2. Summarise the essence of the review in <= 20 words.
3. Suggest 2-3 concrete next actions for the business.

Return ONLY a valid JSON object with these exact keys:
- "user_response": string
- "summary": string
- "actions": array of strings

Example of the required format:
{
  "user_response": "Thank you for your feedback...",
  "summary": "Customer loved the food but found service slow.",
  "actions": [
    "Train staff to reduce wait time",
    "Monitor peak hours and add staff"
  ]
}

Now generate the JSON."#;

/// Strict-mode prompt: asks for one JSON object with `user_response`,
/// `summary` and `actions`, and ends on a bare `JSON:` cue.
pub fn build_prompt(rating: i64, review: &str) -> String {
    format!(
        "{}\n\nRating: {}\nReview: \"\"\"{}\"\"\"\n\nJSON:",
        FEEDBACK_TEMPLATE_HEAD, rating, review
    )
}

/// Plain reply prompt, for callers that only want the customer-facing text.
pub fn build_reply_prompt(rating: i64, review: &str) -> String {
    format!(
        "You are a helpful customer service AI.\n\
         A user just left a {}-star review: \"{}\"\n\
         Write a short, polite, and personalized response to them.",
        rating, review
    )
}

/// Section-mode prompt over the most recent [`ANALYSIS_WINDOW`] reviews.
pub fn build_analysis_prompt(records: &[ReviewRecord]) -> String {
    let skip = records.len().saturating_sub(ANALYSIS_WINDOW);
    let recent: Vec<String> = records
        .iter()
        .skip(skip)
        .map(|r| format!("- {} stars: {}", r.rating, r.review))
        .collect();

    format!(
        "Analyze the following customer reviews:\n{}\n\n\
         Output Format:\n\
         1. SUMMARY: (A brief summary of the main sentiment and issues)\n\
         2. ACTIONS: (3 bullet points of recommended next actions for the admin)",
        recent.join("\n")
    )
}
