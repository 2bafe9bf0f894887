//! Newtype IDs for type-safe catalog and visitor references.
//!
//! Use the `define_id!` macro to create type-safe string ID wrappers that
//! prevent accidentally mixing keys from different entity types.

use thiserror::Error;

/// Maximum length of a catalog or visitor identifier.
pub const MAX_ID_LENGTH: usize = 128;

/// Errors that can occur when parsing an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The input string is empty.
    #[error("identifier cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("identifier must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character outside `[A-Za-z0-9_-]`.
    #[error("identifier contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// Validate the syntax shared by every identifier type.
///
/// Identifiers double as document path segments, so only ASCII
/// alphanumerics, `-` and `_` are accepted.
///
/// # Errors
///
/// Returns an [`IdError`] describing the first violated rule.
pub fn validate_id(s: &str) -> Result<(), IdError> {
    if s.is_empty() {
        return Err(IdError::Empty);
    }
    if s.len() > MAX_ID_LENGTH {
        return Err(IdError::TooLong { max: MAX_ID_LENGTH });
    }
    if let Some(c) = s
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(IdError::InvalidCharacter(c));
    }
    Ok(())
}

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize` with `#[serde(transparent)]`, and a validating `Deserialize`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `parse()` (validating), `as_str()`, `into_inner()`
/// - `Display`, `FromStr` and `AsRef<str>` implementations
///
/// # Example
///
/// ```rust
/// # use viva_mais_core::define_id;
/// define_id!(TourId);
/// define_id!(GuideId);
///
/// let tour = TourId::parse("tour-1").unwrap();
/// let guide = GuideId::parse("tour-1").unwrap();
///
/// // These are different types, so this won't compile:
/// // let _: TourId = guide;
/// # let _ = (tour, guide);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, ::serde::Serialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Parse and validate an identifier.
            ///
            /// # Errors
            ///
            /// Returns an error if the input is empty, too long, or contains
            /// characters outside `[A-Za-z0-9_-]`.
            pub fn parse(s: &str) -> ::core::result::Result<Self, $crate::types::id::IdError> {
                $crate::types::id::validate_id(s)?;
                Ok(Self(s.to_owned()))
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier and returns its inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                // Delegate so width and alignment flags apply.
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::types::id::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl ::core::convert::AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                let s = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                Self::parse(&s).map_err(::serde::de::Error::custom)
            }
        }
    };
}

define_id!(ExperienceId);
define_id!(DestinationId);
define_id!(ArticleId);
define_id!(VisitorId);

impl VisitorId {
    /// Generate a random local identifier (UUID v4, hyphenated).
    ///
    /// Used when no identity provider is available.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert!(ExperienceId::parse("exp1").is_ok());
        assert!(ExperienceId::parse("exp_with-dash_2").is_ok());
        assert!(VisitorId::parse("Xy9aBc01").is_ok());
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(ExperienceId::parse(""), Err(IdError::Empty));
    }

    #[test]
    fn test_parse_too_long() {
        let long = "a".repeat(MAX_ID_LENGTH + 1);
        assert!(matches!(
            ExperienceId::parse(&long),
            Err(IdError::TooLong { .. })
        ));
        assert!(ExperienceId::parse(&"a".repeat(MAX_ID_LENGTH)).is_ok());
    }

    #[test]
    fn test_parse_rejects_path_separators() {
        assert_eq!(
            ExperienceId::parse("exp/1"),
            Err(IdError::InvalidCharacter('/'))
        );
        assert_eq!(
            ExperienceId::parse("exp 1"),
            Err(IdError::InvalidCharacter(' '))
        );
    }

    #[test]
    fn test_generated_visitor_id_is_valid() {
        let id = VisitorId::generate();
        assert!(!id.as_str().is_empty());
        assert!(VisitorId::parse(id.as_str()).is_ok());
        assert_ne!(id, VisitorId::generate());
    }

    #[test]
    fn test_serde_transparent() {
        let id = ExperienceId::parse("exp3").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"exp3\"");
        let parsed: ExperienceId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_deserialize_rejects_invalid() {
        let result: Result<ExperienceId, _> = serde_json::from_str("\"bad id\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_display_and_from_str() {
        let id: DestinationId = "dest4".parse().unwrap();
        assert_eq!(id.to_string(), "dest4");
        assert_eq!(id.as_ref(), "dest4");
    }
}
