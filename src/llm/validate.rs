//! Plausibility check for refinement candidates.
//!
//! Small chat models occasionally *answer* the transcript instead of
//! rewriting it ("好的，我會注意" in reply to a reminder, or an English
//! explanation of a Chinese sentence).  Such replies share almost no
//! characters with the original, so [`is_acceptable`] compares the sets of
//! distinct alphabetic characters and rejects candidates whose overlap with
//! the original falls below a threshold.  Rejected candidates make the
//! pipeline fall back to the raw transcript.
//!
//! The check is case-sensitive, order-independent and script-agnostic: it
//! works the same for CJK text, Latin text and mixes of both.

use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Originals at or below this many trimmed code points are always accepted;
/// a two-character transcript has too little signal to vote with.
const SHORT_INPUT_LIMIT: usize = 5;

/// Minimum share of the original's distinct letters that must survive into
/// the candidate.
const MIN_OVERLAP_RATIO: f32 = 0.30;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Decide whether `candidate` is plausibly a refinement of `original`.
///
/// Builds the set of distinct alphabetic characters (Unicode letters) for
/// both strings and accepts when at least [`MIN_OVERLAP_RATIO`] of the
/// original's letters appear in the candidate.  Originals that are very
/// short, or contain no letters at all (digits, punctuation), are accepted
/// unconditionally.
///
/// ```
/// use voxscribe::llm::is_acceptable;
///
/// assert!(is_acceptable("今天天氣很好我們去散步", "今天天氣很好,我們去散步。"));
/// assert!(!is_acceptable("今天天氣很好我們去散步", "Sure, happy to help!"));
/// ```
pub fn is_acceptable(original: &str, candidate: &str) -> bool {
    if original.trim().chars().count() <= SHORT_INPUT_LIMIT {
        return true;
    }

    let original_letters = letter_set(original);
    if original_letters.is_empty() {
        return true;
    }

    let candidate_letters = letter_set(candidate);
    let shared = original_letters
        .iter()
        .filter(|ch| candidate_letters.contains(*ch))
        .count();

    let ratio = shared as f32 / original_letters.len() as f32;
    ratio >= MIN_OVERLAP_RATIO
}

/// Distinct alphabetic characters of `text`.
fn letter_set(text: &str) -> HashSet<char> {
    text.chars().filter(|ch| ch.is_alphabetic()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
