//! Macro for implementing Display and FromStr for lowercase string enums
//!
//! Status-like enums are persisted and sent over the wire as lowercase
//! strings. The macro keeps Display and FromStr in sync from one mapping.
//!
//! # Example
//!
//! ```rust
//! use hubsync_domain::impl_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum SearchSource {
//!     Local,
//!     Merged,
//! }
//!
//! impl_status_conversions!(SearchSource {
//!     Local => "local",
//!     Merged => "merged",
//! });
//!
//! assert_eq!(SearchSource::Merged.to_string(), "merged");
//! assert_eq!("LOCAL".parse::<SearchSource>(), Ok(SearchSource::Local));
//! ```

/// Implements Display and case-insensitive FromStr for a fieldless enum.
#[macro_export]
macro_rules! impl_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical lowercase representation.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
