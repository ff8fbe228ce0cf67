//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing a Telegram user ID with a catalog show ID.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i64` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `PartialOrd`, `Ord`, `Hash`
/// - Conversion methods: `new()`, `as_i64()`
/// - `From<i64>`, `Into<i64>` and `FromStr` implementations
///
/// Telegram user IDs exceed the `i32` range, so every ID is backed by `i64`.
///
/// # Example
///
/// ```rust
/// # use tvguide_core::define_id;
/// define_id!(ChatId);
/// define_id!(EpisodeId);
///
/// let chat_id = ChatId::new(1);
/// let episode_id = EpisodeId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: ChatId = episode_id;
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
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from an i64 value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying i64 value.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
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

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Telegram identities
define_id!(UserId);
define_id!(ChatId);

// TVMaze catalog identities
define_id!(ShowId);
define_id!(EpisodeId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_parse() {
        let id: ShowId = " 169 ".parse().expect("valid id");
        assert_eq!(id, ShowId::new(169));
        assert_eq!(id.to_string(), "169");
        assert!("abc".parse::<ShowId>().is_err());
    }

    #[test]
    fn test_id_serde_transparent() {
        let json = serde_json::to_string(&UserId::new(5_000_000_000)).expect("serialize");
        assert_eq!(json, "5000000000");

        let id: UserId = serde_json::from_str("42").expect("deserialize");
        assert_eq!(id.as_i64(), 42);
    }

    #[test]
    fn test_id_ordering() {
        let mut ids = vec![ShowId::new(3), ShowId::new(1), ShowId::new(2)];
        ids.sort();
        assert_eq!(ids, vec![ShowId::new(1), ShowId::new(2), ShowId::new(3)]);
    }
}
