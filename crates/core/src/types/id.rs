//! Identifier newtypes.
//!
//! Numeric identifiers (users, activities, comments) are generated by the
//! store and wrapped with [`define_id!`]. Request identifiers are opaque
//! strings minted by [`RequestId::generate`] at creation time.

use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Define a type-safe wrapper around a store-assigned `i32` key.
///
/// The generated type is `Copy`, hashes and orders like its inner value,
/// serializes transparently and (with the `postgres` feature) binds as
/// `INT4`.
///
/// # Example
///
/// ```rust
/// # use preconfig_core::define_id;
/// define_id!(UserId);
/// define_id!(CommentId);
///
/// let user = UserId::new(7);
/// assert_eq!(user.as_i32(), 7);
/// assert_eq!("7".parse::<UserId>().ok(), Some(user));
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Wrap a raw key.
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            /// The raw key.
            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i32>().map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <i32 as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Decode<::sqlx::Postgres>>::decode(value).map(Self)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <i32 as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

define_id!(UserId);
define_id!(ActivityId);
define_id!(CommentId);

/// Prefix carried by every generated request identifier.
pub const REQUEST_ID_PREFIX: &str = "REQ";

/// Maximum accepted length of a request identifier.
const REQUEST_ID_MAX_LENGTH: usize = 64;

/// Errors that can occur when parsing a [`RequestId`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestIdError {
    /// The input was empty or whitespace.
    #[error("request id cannot be empty")]
    Empty,
    /// The input exceeded the maximum length.
    #[error("request id must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contained characters outside `[A-Za-z0-9_-]`.
    #[error("request id contains invalid characters")]
    InvalidCharacters,
}

/// Opaque, immutable identifier of a request.
///
/// New identifiers are `REQ` followed by the 32 uppercase hex digits of a
/// random v4 UUID. Parsing accepts any short token of ASCII alphanumerics,
/// `-` and `_` so identifiers minted by earlier deployments remain valid.
///
/// ```
/// use preconfig_core::RequestId;
///
/// let id = RequestId::generate();
/// assert!(id.as_str().starts_with("REQ"));
/// assert_eq!(RequestId::parse(id.as_str()), Ok(id));
/// assert!(RequestId::parse("  ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestId(String);

impl RequestId {
    /// Mint a fresh, globally unique identifier.
    #[must_use]
    pub fn generate() -> Self {
        let hex = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
        Self(format!("{REQUEST_ID_PREFIX}{hex}"))
    }

    /// Parse an identifier supplied by a caller or read from storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, too long, or contains
    /// characters other than ASCII alphanumerics, `-` and `_`.
    pub fn parse(s: &str) -> Result<Self, RequestIdError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(RequestIdError::Empty);
        }
        if s.len() > REQUEST_ID_MAX_LENGTH {
            return Err(RequestIdError::TooLong {
                max: REQUEST_ID_MAX_LENGTH,
            });
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(RequestIdError::InvalidCharacters);
        }
        Ok(Self(s.to_owned()))
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RequestId {
    type Err = RequestIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RequestId {
    type Error = RequestIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RequestId> for String {
    fn from(id: RequestId) -> Self {
        id.0
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for RequestId {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for RequestId {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for RequestId {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_prefixed_and_distinct() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert!(a.as_str().starts_with(REQUEST_ID_PREFIX));
        assert_eq!(a.as_str().len(), REQUEST_ID_PREFIX.len() + 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_accepts_legacy_short_ids() {
        let id = RequestId::parse("REQ1A2B3C").unwrap();
        assert_eq!(id.as_str(), "REQ1A2B3C");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let id = RequestId::parse("  REQ42  ").unwrap();
        assert_eq!(id.as_str(), "REQ42");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(RequestId::parse(""), Err(RequestIdError::Empty));
        assert_eq!(
            RequestId::parse("REQ/../etc"),
            Err(RequestIdError::InvalidCharacters)
        );
        assert!(matches!(
            RequestId::parse(&"R".repeat(65)),
            Err(RequestIdError::TooLong { .. })
        ));
    }

    #[test]
    fn test_request_id_deserialize_validates() {
        let ok: RequestId = serde_json::from_str("\"REQABC\"").unwrap();
        assert_eq!(ok.as_str(), "REQABC");
        assert!(serde_json::from_str::<RequestId>("\"\"").is_err());
    }

    #[test]
    fn test_numeric_id_from_str() {
        assert_eq!("12".parse::<UserId>().unwrap(), UserId::new(12));
        assert!("abc".parse::<CommentId>().is_err());
    }
}
