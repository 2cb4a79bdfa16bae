//! Transcription history persistence and daily usage aggregation.
//!
//! Every completed cycle is appended to `history.jsonl` as one JSON object
//! per line.  The append-only shape keeps recording cheap (one `writeln!`)
//! and makes the file greppable; readers parse the whole file, which stays
//! small at desktop-dictation volumes.

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use crate::config::AppPaths;

// ---------------------------------------------------------------------------
// TranscriptionOutcome
// ---------------------------------------------------------------------------

/// One finished transcription cycle, as handed to the history sink.
///
/// Immutable once built; the pipeline constructs it, hands it over and keeps
/// no reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionOutcome {
    /// Raw STT transcript, exactly as the service returned it.
    pub original_text: String,
    /// Text after LLM refinement, when a refinement was produced (this is
    /// also set on the fallback path, where it equals `original_text`).
    pub refined_text: Option<String>,
    /// Detected language code, or `"unknown"`.
    pub language: String,
    /// Captured clip length in seconds.
    pub duration_secs: f64,
    /// STT model that produced `original_text`.
    pub stt_model: String,
    /// Refinement model, only when a refinement actually took effect.
    pub refine_model: Option<String>,
    /// When the cycle completed.
    pub created_at: DateTime<Utc>,
}

impl TranscriptionOutcome {
    /// The text the user actually received: refined when present, otherwise
    /// the raw transcript.
    pub fn display_text(&self) -> &str {
        self.refined_text.as_deref().unwrap_or(&self.original_text)
    }
}

// ---------------------------------------------------------------------------
// DayStats
// ---------------------------------------------------------------------------

/// Aggregated usage for one calendar day (local time).
#[derive(Debug, Clone, PartialEq)]
pub struct DayStats {
    pub date: NaiveDate,
    /// Number of transcriptions recorded that day.
    pub transcriptions: usize,
    /// Sum of captured clip lengths, in seconds.
    pub total_duration_secs: f64,
    /// Sum of delivered-text lengths, in Unicode code points.
    pub characters: usize,
}

impl DayStats {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            transcriptions: 0,
            total_duration_secs: 0.0,
            characters: 0,
        }
    }

    fn add(&mut self, outcome: &TranscriptionOutcome) {
        self.transcriptions += 1;
        self.total_duration_secs += outcome.duration_secs;
        self.characters += outcome.display_text().chars().count();
    }
}

// ---------------------------------------------------------------------------
// OutcomeSink trait
// ---------------------------------------------------------------------------

/// Where finished cycles are recorded.
///
/// Recording is best-effort: implementations log failures and never surface
/// them, so persistence can never fail or stall a transcription cycle.
pub trait OutcomeSink: Send + Sync {
    fn record(&self, outcome: TranscriptionOutcome);
}

// Compile-time assertion: Box<dyn OutcomeSink> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn OutcomeSink>) {}
};

// ---------------------------------------------------------------------------
// HistoryStore
// ---------------------------------------------------------------------------

/// JSON-lines history file under the platform config directory.
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Store backed by the platform-appropriate `history.jsonl`.
    pub fn new() -> Self {
        Self::at(AppPaths::new().history_file)
    }

    /// Store backed by an explicit path (useful for tests).
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one outcome as a JSON line, creating the file and its parent
    /// directories as needed.
    pub fn append(&self, outcome: &TranscriptionOutcome) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let line = serde_json::to_string(outcome)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// The most recent outcomes, newest first, at most `limit`.
    pub fn recent(&self, limit: usize) -> Result<Vec<TranscriptionOutcome>> {
        let mut outcomes = self.load_all()?;
        outcomes.reverse();
        outcomes.truncate(limit);
        Ok(outcomes)
    }

    /// Per-day aggregates over the last `days` calendar days (local time,
    /// today included), oldest first.  Days with no activity are omitted.
    pub fn daily_totals(&self, days: u32) -> Result<Vec<DayStats>> {
        if days == 0 {
            return Ok(Vec::new());
        }
        let today = Local::now().date_naive();
        let first = today - chrono::Duration::days(i64::from(days) - 1);

        let mut buckets: BTreeMap<NaiveDate, DayStats> = BTreeMap::new();
        for outcome in self.load_all()? {
            let date = outcome.created_at.with_timezone(&Local).date_naive();
            if date < first || date > today {
                continue;
            }
            buckets
                .entry(date)
                .or_insert_with(|| DayStats::empty(date))
                .add(&outcome);
        }
        Ok(buckets.into_values().collect())
    }

    /// Today's aggregate (zeros when nothing has been recorded yet).
    pub fn today(&self) -> Result<DayStats> {
        let today = Local::now().date_naive();
        let totals = self.daily_totals(1)?;
        Ok(totals
            .into_iter()
            .next()
            .unwrap_or_else(|| DayStats::empty(today)))
    }

    /// All outcomes in file order (oldest first).  A missing file is an
    /// empty history; lines that fail to parse are skipped with a warning
    /// so one corrupt entry cannot take the whole history down.
    fn load_all(&self) -> Result<Vec<TranscriptionOutcome>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut outcomes = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<TranscriptionOutcome>(line) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    log::warn!(
                        "History: skipping unreadable entry at line {}: {e}",
                        index + 1
                    );
                }
            }
        }
        Ok(outcomes)
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OutcomeSink for HistoryStore {
    fn record(&self, outcome: TranscriptionOutcome) {
        match self.append(&outcome) {
            Ok(()) => log::debug!(
                "History: recorded {:.1}s cycle ({} chars)",
                outcome.duration_secs,
                outcome.display_text().chars().count()
            ),
            Err(e) => log::warn!("History: failed to record outcome: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// MockSink  (test-only)
// ---------------------------------------------------------------------------

/// Recording sink for pipeline tests.
#[cfg(test)]
pub struct MockSink {
    /// Every recorded outcome, in order.
    pub recorded: std::sync::Mutex<Vec<TranscriptionOutcome>>,
}

#[cfg(test)]
impl MockSink {
    pub fn new() -> Self {
        Self {
            recorded: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
impl OutcomeSink for MockSink {
    fn record(&self, outcome: TranscriptionOutcome) {
        self.recorded.lock().unwrap().push(outcome);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn outcome(text: &str, duration: f64, created_at: DateTime<Utc>) -> TranscriptionOutcome {
        TranscriptionOutcome {
            original_text: text.to_string(),
            refined_text: None,
            language: "zh".to_string(),
            duration_secs: duration,
            stt_model: "whisper-large-v3".to_string(),
            refine_model: None,
            created_at,
        }
    }

    // --- display text ---

    #[test]
    fn display_text_prefers_refined() {
        let mut o = outcome("raw", 1.0, Utc::now());
        assert_eq!(o.display_text(), "raw");

        o.refined_text = Some("polished".to_string());
        assert_eq!(o.display_text(), "polished");
    }

    // --- append / recent ---

    #[test]
    fn append_then_recent_round_trips() {
        let dir = tempdir().expect("temp dir");
        let store = HistoryStore::at(dir.path().join("history.jsonl"));

        let first = outcome("第一句", 1.5, Utc::now());
        let second = outcome("second one", 2.25, Utc::now());
        store.append(&first).expect("append");
        store.append(&second).expect("append");

        // Newest first.
        let recent = store.recent(10).expect("recent");
        assert_eq!(recent, vec![second, first]);
    }

    #[test]
    fn recent_respects_limit() {
        let dir = tempdir().expect("temp dir");
        let store = HistoryStore::at(dir.path().join("history.jsonl"));

        for i in 0..5 {
            store
                .append(&outcome(&format!("entry {i}"), 1.0, Utc::now()))
                .expect("append");
        }

        let recent = store.recent(2).expect("recent");
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].original_text, "entry 4");
        assert_eq!(recent[1].original_text, "entry 3");
    }

    #[test]
    fn missing_file_is_an_empty_history() {
        let dir = tempdir().expect("temp dir");
        let store = HistoryStore::at(dir.path().join("nope.jsonl"));

        assert!(store.recent(50).expect("recent").is_empty());
        assert!(store.daily_totals(7).expect("totals").is_empty());
    }

    #[test]
    fn corrupt_lines_are_skipped() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("history.jsonl");
        let store = HistoryStore::at(&path);

        store.append(&outcome("good one", 1.0, Utc::now())).expect("append");
        {
            let mut file = OpenOptions::new().append(true).open(&path).expect("open");
            writeln!(file, "{{not json").expect("write");
        }
        store.append(&outcome("good two", 1.0, Utc::now())).expect("append");

        let recent = store.recent(10).expect("recent");
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].original_text, "good two");
        assert_eq!(recent[1].original_text, "good one");
    }

    #[test]
    fn history_is_one_json_object_per_line() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("history.jsonl");
        let store = HistoryStore::at(&path);

        store.append(&outcome("a", 1.0, Utc::now())).expect("append");
        store.append(&outcome("b", 1.0, Utc::now())).expect("append");

        let content = fs::read_to_string(&path).expect("read");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            serde_json::from_str::<TranscriptionOutcome>(line).expect("parseable line");
        }
    }

    // --- daily aggregation ---

    #[test]
    fn daily_totals_buckets_by_local_day() {
        let dir = tempdir().expect("temp dir");
        let store = HistoryStore::at(dir.path().join("history.jsonl"));

        let now = Utc::now();
        let yesterday = now - chrono::Duration::days(1);

        let mut refined = outcome("abc", 2.0, now);
        refined.refined_text = Some("abcde".to_string());
        store.append(&refined).expect("append");
        store.append(&outcome("第二句話", 3.0, now)).expect("append");
        store.append(&outcome("old", 5.0, yesterday)).expect("append");

        let totals = store.daily_totals(7).expect("totals");
        assert_eq!(totals.len(), 2);

        // Oldest first.
        assert_eq!(totals[0].transcriptions, 1);
        assert_eq!(totals[0].total_duration_secs, 5.0);
        assert_eq!(totals[0].characters, 3);

        assert_eq!(totals[1].transcriptions, 2);
        assert_eq!(totals[1].total_duration_secs, 5.0);
        // "abcde" (refined wins) + 4 CJK code points.
        assert_eq!(totals[1].characters, 9);
        assert!(totals[0].date < totals[1].date);
    }

    #[test]
    fn daily_totals_ignores_entries_outside_the_window() {
        let dir = tempdir().expect("temp dir");
        let store = HistoryStore::at(dir.path().join("history.jsonl"));

        let ancient = Utc::now() - chrono::Duration::days(30);
        store.append(&outcome("ancient", 1.0, ancient)).expect("append");
        store.append(&outcome("fresh", 1.0, Utc::now())).expect("append");

        let totals = store.daily_totals(7).expect("totals");
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].transcriptions, 1);
    }

    #[test]
    fn today_is_zero_on_an_empty_history() {
        let dir = tempdir().expect("temp dir");
        let store = HistoryStore::at(dir.path().join("history.jsonl"));

        let today = store.today().expect("today");
        assert_eq!(today.transcriptions, 0);
        assert_eq!(today.total_duration_secs, 0.0);
        assert_eq!(today.characters, 0);
    }

    #[test]
    fn today_counts_only_todays_entries() {
        let dir = tempdir().expect("temp dir");
        let store = HistoryStore::at(dir.path().join("history.jsonl"));

        store.append(&outcome("now", 2.0, Utc::now())).expect("append");
        store
            .append(&outcome("old", 9.0, Utc::now() - chrono::Duration::days(2)))
            .expect("append");

        let today = store.today().expect("today");
        assert_eq!(today.transcriptions, 1);
        assert_eq!(today.total_duration_secs, 2.0);
    }

    // --- sink behaviour ---

    #[test]
    fn record_never_panics_on_an_unwritable_path() {
        let dir = tempdir().expect("temp dir");
        // A path whose parent is a file, so create_dir_all must fail.
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file").expect("write");

        let store = HistoryStore::at(blocker.join("history.jsonl"));
        store.record(outcome("lost", 1.0, Utc::now()));

        assert!(store.recent(10).is_err() || store.recent(10).expect("recent").is_empty());
    }

    #[test]
    fn mock_sink_records_in_order() {
        let sink = MockSink::new();
        sink.record(outcome("one", 1.0, Utc::now()));
        sink.record(outcome("two", 2.0, Utc::now()));

        let recorded = sink.recorded.lock().unwrap();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].original_text, "one");
        assert_eq!(recorded[1].original_text, "two");
    }
}
