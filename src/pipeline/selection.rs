/*!
 * Slide selection expressions such as `"2,3,7"`.
 */

use std::fmt;
use std::str::FromStr;

use crate::errors::UsageError;

/// Ascending, duplicate-free set of 1-based slide indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideSelection {
    indices: Vec<usize>,
}

impl SlideSelection {
    /// Parse a comma-separated list of slide numbers.
    ///
    /// Tokens are trimmed; each must be a base-10 integer of at least 1.
    /// The result is sorted and deduplicated, so `"7,2,2,3"` and `"2,3,7,2"`
    /// both yield `[2, 3, 7]`.
    pub fn parse(expr: &str) -> Result<Self, UsageError> {
        if expr.trim().is_empty() {
            return Err(UsageError::EmptySelection);
        }

        let mut indices = expr
            .split(',')
            .map(|token| {
                let token = token.trim();
                match token.parse::<usize>() {
                    Ok(index) if index >= 1 => Ok(index),
                    _ => Err(UsageError::InvalidSlideNumber {
                        token: token.to_string(),
                    }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        indices.sort_unstable();
        indices.dedup();

        Ok(Self { indices })
    }

    /// Selected indices in ascending order
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Whether a slide index is selected
    pub fn contains(&self, index: usize) -> bool {
        self.indices.binary_search(&index).is_ok()
    }

    /// Check every index against a deck of `slide_count` slides
    pub fn validate_against(&self, slide_count: usize) -> Result<(), UsageError> {
        match self.indices.iter().find(|&&i| i > slide_count) {
            Some(&index) => Err(UsageError::SlideOutOfRange {
                index,
                count: slide_count,
            }),
            None => Ok(()),
        }
    }

    /// Number of selected slides
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Always false for a parsed selection
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

impl FromStr for SlideSelection {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SlideSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .indices
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{}", joined)
    }
}
