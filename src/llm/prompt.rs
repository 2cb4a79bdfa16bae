//! System-prompt builder for transcript refinement.
//!
//! Every provider receives the same system prompt: a base instruction that
//! asks for polished Traditional Chinese output, optionally followed by a
//! custom dictionary section (terms the STT service tends to mangle) and an
//! extra-rules section written by the user.  The raw transcript itself is
//! sent as the user message, untouched.

use crate::config::RefineConfig;

// ---------------------------------------------------------------------------
// Base instruction
// ---------------------------------------------------------------------------

/// Default refinement instruction — polish to Traditional Chinese (Taiwan
/// usage), fix mis-transcriptions, output the result only.
const REFINE_INSTRUCTION: &str =
    "請將以下語音轉錄文字潤飾為繁體中文（台灣用語），修正錯別字並調整語句通順度，直接輸出結果。";

/// Header introducing the custom dictionary section.
const GLOSSARY_HEADER: &str = "【自訂字典】";

/// Header introducing the user's extra rules section.
const RULES_HEADER: &str = "【額外規則】";

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Assembles the refinement system prompt from the configured glossary and
/// extra rules.
///
/// # Example
/// ```rust
/// use voxscribe::llm::PromptBuilder;
///
/// let builder = PromptBuilder::new(vec!["Kubernetes".into()], String::new());
/// let prompt = builder.build();
/// assert!(prompt.contains("【自訂字典】Kubernetes"));
/// ```
pub struct PromptBuilder {
    glossary: Vec<String>,
    extra_rules: String,
}

impl PromptBuilder {
    /// Create a builder from an explicit glossary and rules string.
    pub fn new(glossary: Vec<String>, extra_rules: String) -> Self {
        Self {
            glossary,
            extra_rules,
        }
    }

    /// Create a builder from the refinement section of the app config.
    pub fn from_config(config: &RefineConfig) -> Self {
        Self::new(config.glossary.clone(), config.extra_rules.clone())
    }

    /// Build the system prompt.
    ///
    /// Structure (in order):
    /// 1. Base instruction
    /// 2. `【自訂字典】` + glossary terms joined with `、` (omitted when the
    ///    glossary is empty)
    /// 3. `【額外規則】` + the user's rules (omitted when blank)
    pub fn build(&self) -> String {
        let mut prompt = String::with_capacity(256);
        prompt.push_str(REFINE_INSTRUCTION);

        let terms: Vec<&str> = self
            .glossary
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        if !terms.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(GLOSSARY_HEADER);
            prompt.push_str(&terms.join("、"));
        }

        if !self.extra_rules.trim().is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(RULES_HEADER);
            prompt.push_str(&self.extra_rules);
        }

        prompt
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
