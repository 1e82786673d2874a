/*!
 * Pronunciation overrides for narration text.
 *
 * A JSON object maps words to how they should be spoken, e.g.
 * `{"kubectl": "cube control"}`. Matching is case-insensitive and applied
 * longest key first so that overlapping keys behave predictably.
 */

use log::debug;
use regex::{NoExpand, Regex};
use std::collections::HashMap;
use std::path::Path;

use crate::errors::UsageError;

/// Compiled replacement rules
#[derive(Debug, Clone, Default)]
pub struct Pronunciations {
    rules: Vec<(Regex, String)>,
}

impl Pronunciations {
    /// Build rules from a word → spoken form map.
    ///
    /// Keys that begin and end with word characters only match whole words.
    pub fn from_map(map: HashMap<String, String>) -> Self {
        let mut entries: Vec<(String, String)> = map
            .into_iter()
            .filter(|(k, _)| !k.trim().is_empty())
            .collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        let rules = entries
            .into_iter()
            .filter_map(|(word, spoken)| {
                let escaped = regex::escape(&word);
                let starts_word = word.chars().next().is_some_and(is_word_char);
                let ends_word = word.chars().last().is_some_and(is_word_char);
                let pattern = format!(
                    "(?i){}{}{}",
                    if starts_word { r"\b" } else { "" },
                    escaped,
                    if ends_word { r"\b" } else { "" }
                );
                Regex::new(&pattern).ok().map(|re| (re, spoken))
            })
            .collect();

        Self { rules }
    }

    /// Load overrides from a JSON file
    pub fn load(path: &Path) -> Result<Self, UsageError> {
        if !path.is_file() {
            return Err(UsageError::PronunciationsNotFound(path.to_path_buf()));
        }

        let invalid = |message: String| UsageError::InvalidPronunciations {
            path: path.to_path_buf(),
            message,
        };
        let text = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let map: HashMap<String, String> =
            serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))?;

        let loaded = Self::from_map(map);
        debug!("Loaded {} pronunciation override(s) from {:?}", loaded.len(), path);
        Ok(loaded)
    }

    /// Apply every rule to `text`
    pub fn apply(&self, text: &str) -> String {
        self.rules
            .iter()
            .fold(text.to_string(), |acc, (re, spoken)| {
                re.replace_all(&acc, NoExpand(spoken.as_str())).into_owned()
            })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
