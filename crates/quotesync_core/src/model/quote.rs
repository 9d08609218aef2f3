//! Quote domain model.
//!
//! # Responsibility
//! - Define the canonical quote record shared by storage, sync and import.
//! - Own input validation for quote text/category.
//!
//! # Invariants
//! - `text` and `category` are never blank once a quote is accepted.
//! - `id == None` means the quote has not been registered remotely yet.
//! - Category comparison is case-insensitive everywhere.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// External identifier assigned by the remote source.
pub type QuoteId = i64;

/// Selector value that disables category filtering.
pub const ALL_CATEGORIES: &str = "all";

/// Canonical quote record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Remote id. Serialized as `null` until registration succeeds.
    #[serde(default)]
    pub id: Option<QuoteId>,
    pub text: String,
    pub category: String,
}

/// Validation failures for user-provided quote input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteValidationError {
    EmptyText,
    EmptyCategory,
}

impl Display for QuoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "quote text cannot be empty"),
            Self::EmptyCategory => write!(f, "quote category cannot be empty"),
        }
    }
}

impl Error for QuoteValidationError {}

impl Quote {
    /// Creates a local quote that is not yet known to the remote.
    pub fn new(text: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            category: category.into(),
        }
    }

    /// Creates a quote carrying a remote id.
    ///
    /// Used by sync paths where identity already exists externally.
    pub fn with_id(id: QuoteId, text: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            text: text.into(),
            category: category.into(),
        }
    }

    /// Builds a validated local quote from raw user input.
    ///
    /// Both fields are trimmed before validation and storage.
    pub fn parse_input(text: &str, category: &str) -> Result<Self, QuoteValidationError> {
        let quote = Self::new(text.trim(), category.trim());
        quote.validate()?;
        Ok(quote)
    }

    /// Checks the non-blank text/category invariant.
    pub fn validate(&self) -> Result<(), QuoteValidationError> {
        if self.text.trim().is_empty() {
            return Err(QuoteValidationError::EmptyText);
        }
        if self.category.trim().is_empty() {
            return Err(QuoteValidationError::EmptyCategory);
        }
        Ok(())
    }

    /// Returns whether this quote belongs to `selector`.
    ///
    /// `"all"` (any case) matches every quote.
    pub fn matches_category(&self, selector: &str) -> bool {
        is_all_selector(selector) || category_key(&self.category) == category_key(selector)
    }

    /// Returns whether text and category are identical, ignoring `id`.
    pub fn same_content(&self, other: &Quote) -> bool {
        self.text == other.text && self.category == other.category
    }

    /// Display line used by pickers: `"text" — category`.
    pub fn display_line(&self) -> String {
        format!("\"{}\" — {}", self.text, self.category)
    }
}

/// Returns whether a category selector means "no filter".
///
/// Only the exact `"all"` selector qualifies, so a user category spelled
/// `All` stays filterable on its own.
pub fn is_all_selector(selector: &str) -> bool {
    selector == ALL_CATEGORIES
}

/// Case-folded category used for filtering and grouping.
pub fn category_key(category: &str) -> String {
    category.trim().to_lowercase()
}

/// Initial store contents used when durable storage has no quotes yet.
pub fn seed_quotes() -> Vec<Quote> {
    vec![
        Quote::new(
            "The best way to get started is to quit talking and begin doing.",
            "Motivation",
        ),
        Quote::new(
            "Life is what happens when you're busy making other plans.",
            "Life",
        ),
        Quote::new("Don't let yesterday take up too much of today.", "Wisdom"),
    ]
}
