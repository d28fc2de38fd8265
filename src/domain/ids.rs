//! Domain identifier types with validation
//!
//! Newtype wrappers for the identifiers that flow through the vault. The
//! vault's own ids (`VaultEntryId`, `VaultDocumentId`) share the 24-character
//! lower-case hex shape of a document-store object id, which is what the
//! token wire format embeds.

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of a vault object id in hex characters
pub const OBJECT_ID_LEN: usize = 24;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, rejecting blank input
            pub fn new(id: impl Into<String>) -> Result<Self, String> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(concat!($label, " cannot be empty").to_string());
                }
                Ok(Self(id))
            }

            /// Returns the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes self and returns the inner String
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of the dependent (the person a record is about)
    DependentId,
    "Dependent ID"
);

string_id!(
    /// Identifier of a clinical resource in the primary record store
    ResourceId,
    "Resource ID"
);

string_id!(
    /// Resource type name, e.g. `Encounter` or `Note`
    ResourceType,
    "Resource type"
);

fn validate_object_id(id: &str, label: &str) -> Result<(), String> {
    if id.len() != OBJECT_ID_LEN {
        return Err(format!(
            "{label} must be {OBJECT_ID_LEN} hex characters, got {} characters",
            id.len()
        ));
    }
    if !id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(format!("{label} must be lower-case hex: {id}"));
    }
    Ok(())
}

/// 4-byte seconds timestamp followed by 8 random bytes, hex encoded
fn generate_object_id() -> String {
    let secs = Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
    let random: u64 = rand::thread_rng().gen();
    format!("{secs:08x}{random:016x}")
}

macro_rules! object_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parses and validates an existing id
            pub fn new(id: impl Into<String>) -> Result<Self, String> {
                let id = id.into();
                validate_object_id(&id, $label)?;
                Ok(Self(id))
            }

            /// Generates a fresh id
            pub fn generate() -> Self {
                Self(generate_object_id())
            }

            /// Returns the id as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

object_id!(
    /// Id of one unstructured vault entry; embedded in vault tokens
    VaultEntryId,
    "Vault entry ID"
);

object_id!(
    /// Id of a structured (demographic) vault document
    VaultDocumentId,
    "Vault document ID"
);
