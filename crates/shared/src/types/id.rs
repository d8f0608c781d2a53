//! Typed identifiers for remote objects and staged blocks.
//!
//! Both identifiers are opaque strings on the wire. Wrapping them keeps a
//! `BlockId` from being passed where a `RemoteObjectId` is expected.

use rand::{Rng, distr::Alphanumeric};
use serde::{Deserialize, Serialize};

/// Length of the random suffix appended to a logical path.
pub const REMOTE_SUFFIX_LEN: usize = 8;

/// Length of a generated block id.
pub const BLOCK_ID_LEN: usize = 64;

/// Generates a random ASCII alphanumeric string of `len` characters.
#[must_use]
pub fn random_ascii(len: usize) -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Macro to generate typed string identifier wrappers.
macro_rules! typed_name {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps an existing name.
            #[must_use]
            pub fn from_string(name: impl Into<String>) -> Self {
                Self(name.into())
            }

            /// Returns the name as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(name: String) -> Self {
                Self(name)
            }
        }

        impl From<&str> for $name {
            fn from(name: &str) -> Self {
                Self(name.to_string())
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

typed_name!(RemoteObjectId, "Name of one object in the backend container.");
typed_name!(
    BlockId,
    "Name of one staged, uncommitted block within a single upload."
);

impl RemoteObjectId {
    /// Allocates a fresh id for a new object backing `logical_path`.
    ///
    /// Format: `{logical_path}_{8 random alphanumerics}`. The suffix makes
    /// collisions between concurrent writers to the same path unlikely; it
    /// is not a uniqueness guarantee.
    #[must_use]
    pub fn generate(logical_path: &str) -> Self {
        Self(format!(
            "{logical_path}_{}",
            random_ascii(REMOTE_SUFFIX_LEN)
        ))
    }
}

impl BlockId {
    /// Generates a fresh random block id.
    #[must_use]
    pub fn generate() -> Self {
        Self(random_ascii(BLOCK_ID_LEN))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
