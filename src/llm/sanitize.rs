//! Cleanup of raw LLM replies before they reach the user.
//!
//! Chat models often wrap the rewritten transcript in conversational filler
//! ("Sure, here is the text: …", "好的，以下是潤飾後的文字：…") or a layer of
//! quotation marks.  [`sanitize`] strips at most **one** leading preamble
//! phrase from a fixed catalogue and unwraps at most **one** full-span quote
//! layer, so a reply that is already clean passes through unchanged.
//!
//! The function is pure and total: every input maps to an output and no
//! input can make it fail.

// ---------------------------------------------------------------------------
// Preamble catalogue
// ---------------------------------------------------------------------------

/// Label phrases that carry their own delimiter.  Matched first; the label
/// itself is removed and everything after it is kept.
const LABELED_PREFIXES: &[&str] = &[
    "這是潤飾後的文字：",
    "這是潤飾後的文字:",
    "潤飾後的文字：",
    "潤飾後的文字:",
    "修正後的文字：",
    "修正後的文字:",
    "Here is the polished text:",
    "Here's the polished text:",
    "Here is the corrected text:",
    "Here's the corrected text:",
    "Polished text:",
    "Corrected text:",
];

/// Conversational openers.  The opener is removed; if a colon follows on the
/// same line within [`PREAMBLE_SCAN_CHARS`] characters, everything up to and
/// including the colon goes with it ("Sure, here is the text: …").
const CONVERSATIONAL_OPENERS: &[&str] = &[
    "好的，",
    "好的,",
    "沒問題，",
    "沒問題,",
    "當然，",
    "當然,",
    "Sure,",
    "Sure!",
    "Of course,",
    "Okay,",
    "OK,",
    "No problem,",
];

/// Lead-in fragments that only identify a preamble when a colon follows.
/// Without the colon the text is left untouched ("以下是我的看法" stays).
const LEADIN_OPENERS: &[&str] = &["以下是", "Here is", "Here's", "Below is"];

/// How far past an opener to look for the closing colon of a preamble.
/// Anything farther away is assumed to be part of the content itself.
const PREAMBLE_SCAN_CHARS: usize = 60;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Strip conversational wrapping from a raw LLM reply.
///
/// Steps, in order:
///
/// 1. trim surrounding whitespace;
/// 2. strip at most one leading preamble phrase from the catalogue
///    (first match in priority order wins);
/// 3. unwrap one quote layer spanning the entire string — CJK `「…」` or
///    ASCII `"…"`;
/// 4. trim again.
///
/// Already-clean text is returned unchanged, so applying the function twice
/// gives the same result as applying it once.
///
/// ```
/// use voxscribe::llm::sanitize;
///
/// assert_eq!(sanitize("Sure, here is the text: Hello world"), "Hello world");
/// assert_eq!(sanitize("「你好世界」"), "你好世界");
/// assert_eq!(sanitize("你好世界"), "你好世界");
/// ```
pub fn sanitize(raw: &str) -> String {
    let text = raw.trim();
    let text = strip_preamble(text).trim();
    let text = unwrap_quotes(text).trim();
    text.to_string()
}

// ---------------------------------------------------------------------------
// Preamble stripping
// ---------------------------------------------------------------------------

/// Remove at most one catalogued preamble from the start of `text`.
fn strip_preamble(text: &str) -> &str {
    for label in LABELED_PREFIXES {
        if let Some(rest) = strip_prefix_ignore_ascii_case(text, label) {
            return rest;
        }
    }

    for opener in CONVERSATIONAL_OPENERS {
        if let Some(rest) = strip_prefix_ignore_ascii_case(text, opener) {
            // "Sure, here is the text: Hello" carries its payload after the
            // colon; "Sure! 你好" carries it right after the opener.
            return match find_colon(rest) {
                Some(end) => &rest[end..],
                None => rest,
            };
        }
    }

    for leadin in LEADIN_OPENERS {
        if let Some(rest) = strip_prefix_ignore_ascii_case(text, leadin) {
            if let Some(end) = find_colon(rest) {
                return &rest[end..];
            }
            // No colon: this was not a preamble after all, keep looking.
        }
    }

    text
}

/// Case-insensitive (ASCII only) prefix strip.  Multibyte characters must
/// match exactly, which keeps the CJK catalogue entries precise.
fn strip_prefix_ignore_ascii_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.as_bytes().get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix.as_bytes()) {
        // Byte-wise match against valid UTF-8 guarantees a char boundary.
        Some(&text[prefix.len()..])
    } else {
        None
    }
}

/// Byte offset just past the first `:` or `：` on the current line, scanning
/// at most [`PREAMBLE_SCAN_CHARS`] characters.  `None` when no colon closes
/// the preamble.
fn find_colon(text: &str) -> Option<usize> {
    for (seen, (idx, ch)) in text.char_indices().enumerate() {
        if seen >= PREAMBLE_SCAN_CHARS || ch == '\n' {
            return None;
        }
        if ch == ':' || ch == '：' {
            return Some(idx + ch.len_utf8());
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Quote unwrapping
// ---------------------------------------------------------------------------

/// Quote pairs that may wrap an entire reply.
const QUOTE_PAIRS: &[(char, char)] = &[('「', '」'), ('"', '"')];

/// Remove one quote layer if it spans the whole string.
fn unwrap_quotes(text: &str) -> &str {
    for &(open, close) in QUOTE_PAIRS {
        if text.len() >= open.len_utf8() + close.len_utf8()
            && text.starts_with(open)
            && text.ends_with(close)
        {
            return &text[open.len_utf8()..text.len() - close.len_utf8()];
        }
    }
    text
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
