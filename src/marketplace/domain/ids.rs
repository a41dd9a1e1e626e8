//! Identifier types for the marketplace domain.

use super::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Longest opaque party identifier accepted from callers.
const MAX_PARTY_ID_LEN: usize = 128;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident, $invalid:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the wrapped UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl AsRef<Uuid> for $name {
            fn as_ref(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value.trim())
                    .map(Self)
                    .map_err(|_| ValidationError::$invalid(value.to_owned()))
            }
        }
    };
}

uuid_identifier!(
    /// Unique identifier for a posted task.
    TaskId,
    InvalidTaskId
);

uuid_identifier!(
    /// Unique identifier for a bid.
    BidId,
    InvalidBidId
);

fn is_valid_party_id(value: &str) -> bool {
    !value.is_empty()
        && value.chars().count() <= MAX_PARTY_ID_LEN
        && !value.chars().any(char::is_whitespace)
}

/// Opaque identifier of the client who posted a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientId(String);

impl ClientId {
    /// Creates a validated client identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidClientId`] when the trimmed value is
    /// empty, longer than 128 characters, or contains whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let normalized = raw.trim();
        if !is_valid_party_id(normalized) {
            return Err(ValidationError::InvalidClientId(raw));
        }
        Ok(Self(normalized.to_owned()))
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ClientId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ClientId> for String {
    fn from(value: ClientId) -> Self {
        value.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque identifier of a bidder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BidderId(String);

impl BidderId {
    /// Creates a validated bidder identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidBidderId`] when the trimmed value is
    /// empty, longer than 128 characters, or contains whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let normalized = raw.trim();
        if !is_valid_party_id(normalized) {
            return Err(ValidationError::InvalidBidderId(raw));
        }
        Ok(Self(normalized.to_owned()))
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BidderId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BidderId> for String {
    fn from(value: BidderId) -> Self {
        value.0
    }
}

impl fmt::Display for BidderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client-supplied token used to deduplicate retried bid submissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    const MAX_LEN: usize = 128;

    /// Creates a validated idempotency key.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidIdempotencyKey`] unless the value is
    /// 1-128 visible ASCII characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let is_valid = !raw.is_empty()
            && raw.len() <= Self::MAX_LEN
            && raw.chars().all(|ch| ch.is_ascii_graphic());
        if !is_valid {
            return Err(ValidationError::InvalidIdempotencyKey);
        }
        Ok(Self(raw))
    }

    /// Returns the key as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for IdempotencyKey {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<IdempotencyKey> for String {
    fn from(value: IdempotencyKey) -> Self {
        value.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
