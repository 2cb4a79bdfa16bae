//! History and usage statistics module.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 OutcomeSink (trait)                 │
//! │                                                     │
//! │  TranscriptionOutcome ──▶ HistoryStore              │
//! │                            - history.jsonl append   │
//! │                            - recent(limit)          │
//! │                            - daily_totals(days)     │
//! │                                                     │
//! │  recording is best-effort: failures are logged,     │
//! │  never surfaced to the pipeline                     │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use voxscribe::stats::HistoryStore;
//!
//! let store = HistoryStore::new();
//! for outcome in store.recent(50).unwrap() {
//!     println!("[{}] {}", outcome.language, outcome.display_text());
//! }
//! for day in store.daily_totals(7).unwrap() {
//!     println!("{}: {} transcriptions", day.date, day.transcriptions);
//! }
//! ```

pub mod history;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use history::{DayStats, HistoryStore, OutcomeSink, TranscriptionOutcome};

// test-only re-export so the pipeline test module can import MockSink
// without `use voxscribe::stats::history::MockSink`.
#[cfg(test)]
pub use history::MockSink;
