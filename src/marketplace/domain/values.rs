//! Validated scalar values shared by tasks and bids.

use super::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Positive monetary amount in minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Amount(u64);

impl Amount {
    /// Largest amount representable in the current `PostgreSQL` schema.
    const MAX_PERSISTED_VALUE: u64 = i64::MAX as u64;

    /// Creates a validated amount.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidAmount`] when the value is zero or
    /// exceeds `i64::MAX`.
    pub const fn new(value: u64) -> Result<Self, ValidationError> {
        if value == 0 || value > Self::MAX_PERSISTED_VALUE {
            return Err(ValidationError::InvalidAmount(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for Amount {
    type Error = ValidationError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for u64 {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trims `raw` and enforces a character limit, returning `None` for blank input.
fn bounded_text(
    raw: &str,
    max: usize,
    too_long: impl FnOnce(usize, usize) -> ValidationError,
) -> Result<Option<String>, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let actual = trimmed.chars().count();
    if actual > max {
        return Err(too_long(max, actual));
    }
    Ok(Some(trimmed.to_owned()))
}

/// Short human-readable task title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskTitle(String);

impl TaskTitle {
    /// Maximum title length in characters.
    pub const MAX_LEN: usize = 200;

    /// Creates a validated, trimmed title.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyTitle`] for blank input or
    /// [`ValidationError::TitleTooLong`] past [`Self::MAX_LEN`].
    pub fn new(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        bounded_text(value.as_ref(), Self::MAX_LEN, |max, actual| {
            ValidationError::TitleTooLong { max, actual }
        })?
        .map(Self)
        .ok_or(ValidationError::EmptyTitle)
    }

    /// Returns the title as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TaskTitle {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TaskTitle> for String {
    fn from(value: TaskTitle) -> Self {
        value.0
    }
}

impl fmt::Display for TaskTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Free-form task description.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskDescription(String);

impl TaskDescription {
    /// Maximum description length in characters.
    pub const MAX_LEN: usize = 5000;

    /// Creates a validated description; blank input yields `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DescriptionTooLong`] past [`Self::MAX_LEN`].
    pub fn parse(value: impl AsRef<str>) -> Result<Option<Self>, ValidationError> {
        Ok(bounded_text(value.as_ref(), Self::MAX_LEN, |max, actual| {
            ValidationError::DescriptionTooLong { max, actual }
        })?
        .map(Self))
    }

    /// Returns the description as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Optional note a bidder attaches to an offer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BidMessage(String);

impl BidMessage {
    /// Maximum message length in characters.
    pub const MAX_LEN: usize = 2000;

    /// Creates a validated message; blank input yields `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MessageTooLong`] past [`Self::MAX_LEN`].
    pub fn parse(value: impl AsRef<str>) -> Result<Option<Self>, ValidationError> {
        Ok(bounded_text(value.as_ref(), Self::MAX_LEN, |max, actual| {
            ValidationError::MessageTooLong { max, actual }
        })?
        .map(Self))
    }

    /// Returns the message as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TaskDescription {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)?.ok_or(ValidationError::BlankText)
    }
}

impl From<TaskDescription> for String {
    fn from(value: TaskDescription) -> Self {
        value.0
    }
}

impl TryFrom<String> for BidMessage {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)?.ok_or(ValidationError::BlankText)
    }
}

impl From<BidMessage> for String {
    fn from(value: BidMessage) -> Self {
        value.0
    }
}
