//! verdict-cli - terminal front end for the Verdict feedback service
//!
//! Talks to `verdict-server` over HTTP. Review curation commands fall back to
//! the local CSV log when the server cannot be reached, so an admin can keep
//! working while the service is down.
//!
//! # Subcommands
//! - `submit -r <rating> <review> [--json]`  - get an AI reply for a review
//! - `list [--json]`                          - show stored reviews
//! - `add -r <rating> <review> [--ai-response <text>]`
//! - `update <id> [-r <rating>] [--review <text>] [--ai-response <text>]`
//! - `delete <id>`
//! - `stats`                                  - total, average, latest
//! - `analyze`                                - summary + recommended actions
//! - `status`                                 - show server health

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use uuid::Uuid;
use verdict_core::{
    ReviewDraft, ReviewPatch, ReviewRecord, ReviewStats, ReviewStore, StructuredFeedback,
};

const DEFAULT_SERVER: &str = "http://127.0.0.1:8777";
const DEFAULT_DATA_FILE: &str = "data/feedback_log.csv";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "verdict-cli",
    version,
    about = "Verdict - AI-assisted customer feedback from the terminal"
)]
struct Cli {
    /// Verdict HTTP server URL (overrides VERDICT_HTTP_URL env var)
    #[arg(long, env = "VERDICT_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    /// Local review log used when the server is unreachable
    #[arg(long, env = "VERDICT_DATA_FILE", default_value = DEFAULT_DATA_FILE)]
    data_file: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Submit a rating and review and print the AI reply
    Submit {
        /// Star rating, 1 to 5
        #[arg(short, long)]
        rating: u8,

        /// Review text (may be empty)
        #[arg(default_value = "")]
        review: String,

        /// Print the structured feedback as JSON
        #[arg(long)]
        json: bool,
    },

    /// List stored reviews
    List {
        /// Output the records as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Add a review directly, bypassing the model
    Add {
        #[arg(short, long)]
        rating: u8,

        #[arg(default_value = "")]
        review: String,

        #[arg(long, default_value = "")]
        ai_response: String,
    },

    /// Edit fields of a stored review
    Update {
        id: Uuid,

        #[arg(short, long)]
        rating: Option<u8>,

        #[arg(long)]
        review: Option<String>,

        #[arg(long)]
        ai_response: Option<String>,
    },

    /// Delete a stored review
    Delete { id: Uuid },

    /// Show review metrics
    Stats,

    /// Summarise stored reviews and recommend actions
    Analyze,

    /// Show Verdict server status
    Status,
}

// ============================================================================
// Remote (HTTP) access
// ============================================================================

struct Remote {
    client: reqwest::blocking::Client,
    server: String,
}

impl Remote {
    fn new(server: &str, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            server: server.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server, path)
    }

    fn read<T: DeserializeOwned>(resp: reqwest::blocking::Response) -> anyhow::Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body: serde_json::Value = resp.json().unwrap_or_default();
            let msg = body["error"].as_str().unwrap_or("no details").to_string();
            anyhow::bail!("server returned {}: {}", status, msg);
        }
        Ok(resp.json()?)
    }

    fn submit(&self, rating: u8, review: &str) -> anyhow::Result<serde_json::Value> {
        let body = serde_json::json!({ "rating": rating, "review": review });
        Self::read(self.client.post(self.url("/feedback")).json(&body).send()?)
    }

    fn list(&self) -> anyhow::Result<Vec<ReviewRecord>> {
        Self::read(self.client.get(self.url("/reviews")).send()?)
    }

    fn add(&self, draft: &ReviewDraft) -> anyhow::Result<ReviewRecord> {
        Self::read(self.client.post(self.url("/reviews")).json(draft).send()?)
    }

    fn update(&self, id: Uuid, patch: &ReviewPatch) -> anyhow::Result<ReviewRecord> {
        let url = self.url(&format!("/reviews/{}", id));
        Self::read(self.client.put(url).json(patch).send()?)
    }

    fn delete(&self, id: Uuid) -> anyhow::Result<serde_json::Value> {
        let url = self.url(&format!("/reviews/{}", id));
        Self::read(self.client.delete(url).send()?)
    }

    fn stats(&self) -> anyhow::Result<ReviewStats> {
        Self::read(self.client.get(self.url("/stats")).send()?)
    }

    fn analyze(&self) -> anyhow::Result<serde_json::Value> {
        Self::read(self.client.post(self.url("/analyze")).send()?)
    }
}

/// True when the error means the server could not be reached at all.
/// HTTP error statuses are real answers and never trigger the fallback.
fn is_unreachable(e: &anyhow::Error) -> bool {
    e.downcast_ref::<reqwest::Error>()
        .map(|re| re.is_connect() || re.is_timeout())
        .unwrap_or(false)
}

/// Run `remote`; if the server is unreachable, run `local` against the CSV log.
fn with_fallback<T>(
    remote: impl FnOnce() -> anyhow::Result<T>,
    local: impl FnOnce() -> anyhow::Result<T>,
) -> anyhow::Result<T> {
    match remote() {
        Ok(v) => Ok(v),
        Err(e) if is_unreachable(&e) => {
            eprintln!("verdict-cli: server unreachable ({}), using local file", e);
            local()
        }
        Err(e) => Err(e),
    }
}

// ============================================================================
// Output formatting
// ============================================================================

/// One-line summary of a review for the human-readable listing.
pub fn format_review_line(r: &ReviewRecord) -> String {
    let stars = "★".repeat(usize::from(r.rating.min(5)));
    let review: String = r.review.replace('\n', " ").chars().take(60).collect();
    format!("{}  {}  {:<5}  {}", r.id, r.timestamp, stars, review)
}

pub fn format_feedback(fb: &StructuredFeedback) -> String {
    let mut out = format!("Reply:    {}\nSummary:  {}\nActions:", fb.user_response, fb.summary);
    if fb.actions.is_empty() {
        out.push_str("  (none)");
    }
    for action in &fb.actions {
        out.push_str(&format!("\n  - {}", action));
    }
    out
}

pub fn format_stats(stats: &ReviewStats) -> String {
    let average = stats
        .average_rating
        .map(|a| format!("{:.2}", a))
        .unwrap_or_else(|| "N/A".to_string());
    let latest = stats.latest_submission.as_deref().unwrap_or("N/A");
    format!(
        "Total reviews:      {}\nAverage rating:     {}\nLatest submission:  {}",
        stats.total, average, latest
    )
}

// ============================================================================
// Commands
// ============================================================================

fn do_submit(remote: &Remote, rating: u8, review: &str, json_output: bool) -> anyhow::Result<()> {
    let body = remote.submit(rating, review)?;
    let feedback: StructuredFeedback = serde_json::from_value(body["feedback"].clone())?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&feedback)?);
    } else {
        println!("{}", format_feedback(&feedback));
    }
    Ok(())
}

fn do_list(remote: &Remote, store: &ReviewStore, json_output: bool) -> anyhow::Result<()> {
    let records = with_fallback(|| remote.list(), || Ok(store.list()?))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        eprintln!("No reviews found yet.");
        return Ok(());
    }
    // Newest first, like the admin table.
    for r in records.iter().rev() {
        println!("{}", format_review_line(r));
    }
    Ok(())
}

fn do_status(remote: &Remote) -> anyhow::Result<()> {
    let url = remote.url("/health");
    match remote.client.get(&url).send() {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Verdict server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:        {}", body["version"].as_str().unwrap_or("?"));
            println!("Backend:        {}", body["backend"].as_str().unwrap_or("?"));
            println!("Review log:     {}", body["store"].as_str().unwrap_or("?"));
            println!("Reviews:        {}", body["reviews"]);
        }
        Ok(r) => {
            eprintln!("verdict-cli: server unhealthy (HTTP {})", r.status());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("verdict-cli: cannot reach {} - {}", url, e);
            std::process::exit(1);
        }
    }
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let server = cli.server.trim_end_matches('/').to_string();
    let store = ReviewStore::open(&cli.data_file);

    match cli.command {
        Commands::Submit { rating, review, json } => {
            // Model calls can be slow; match the server's own model timeout.
            let remote = Remote::new(&server, 90)?;
            do_submit(&remote, rating, &review, json)
        }
        Commands::List { json } => do_list(&Remote::new(&server, 5)?, &store, json),
        Commands::Add {
            rating,
            review,
            ai_response,
        } => {
            let remote = Remote::new(&server, 5)?;
            let draft = ReviewDraft {
                rating,
                review,
                ai_response,
                timestamp: None,
            };
            let record = with_fallback(|| remote.add(&draft), || Ok(store.add(draft.clone())?))?;
            println!("Added review {}", record.id);
            Ok(())
        }
        Commands::Update {
            id,
            rating,
            review,
            ai_response,
        } => {
            let remote = Remote::new(&server, 5)?;
            let patch = ReviewPatch {
                rating,
                review,
                ai_response,
            };
            let record =
                with_fallback(|| remote.update(id, &patch), || Ok(store.update(id, patch.clone())?))?;
            println!("Updated review {}", record.id);
            Ok(())
        }
        Commands::Delete { id } => {
            let remote = Remote::new(&server, 5)?;
            with_fallback(
                || remote.delete(id).map(|_| ()),
                || store.delete(id).map(|_| ()).map_err(Into::into),
            )?;
            println!("Deleted review {}", id);
            Ok(())
        }
        Commands::Stats => {
            let remote = Remote::new(&server, 5)?;
            let stats = with_fallback(|| remote.stats(), || Ok(store.stats()?))?;
            println!("{}", format_stats(&stats));
            Ok(())
        }
        Commands::Analyze => {
            let report = Remote::new(&server, 90)?.analyze()?;
            println!("Review Summary\n{}\n", report["summary"].as_str().unwrap_or(""));
            println!("Recommended Actions\n{}", report["actions"].as_str().unwrap_or(""));
            Ok(())
        }
        Commands::Status => do_status(&Remote::new(&server, 10)?),
    }
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("verdict-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
